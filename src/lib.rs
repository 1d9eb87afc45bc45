//! glassbox - Black-box model distillation
//!
//! Distills an opaque classifier into interpretable surrogates and reports
//! how faithfully they reproduce its decisions:
//! - pseudo-labels derived from the black box's probabilities or labels
//! - logistic, shallow-tree and sparse integer risk-score surrogates
//! - a global feature ranking aggregated from LIME local explanations
//! - accuracy and fidelity metrics
//!
//! # Modules
//!
//! ## Core
//! - [`blackbox`] - Black-box capability interface and adapters
//! - [`labels`] - Pseudo-label generation
//! - [`surrogate`] - Surrogate models and training strategies
//! - [`explain`] - Local and global explanations
//! - [`evaluation`] - Accuracy, fidelity and the distillation report
//!
//! ## Data
//! - [`data`] - Named feature matrices and CSV I/O
//! - [`synthetic`] - Synthetic classification data
//!
//! ## Services
//! - [`cli`] - Command-line interface
//!
//! # Cargo features
//! - `risk-score` (default) - sparse integer risk-score surrogate
//! - `lime` (default) - LIME explainer behind the global ranking

// Core error handling
pub mod error;
pub mod config;

// Core pipeline
pub mod blackbox;
pub mod labels;
pub mod surrogate;
pub mod explain;
pub mod evaluation;

// Data
pub mod data;
pub mod synthetic;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{GlassboxError, Result};
pub use evaluation::{evaluate_accuracy, evaluate_fidelity};
pub use explain::compute_global_importance;
pub use labels::generate_pseudo_labels;
pub use surrogate::train_surrogate;

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{GlassboxError, Result};

    // Configuration
    pub use crate::config::{DistillConfig, ExplainConfig};

    // Black boxes
    pub use crate::blackbox::{BlackBoxModel, Capabilities, LabelFn, ProbabilityFn, RandomForest};

    // Data
    pub use crate::data::{DataLoader, FeatureMatrix};

    // Pipeline
    pub use crate::labels::generate_pseudo_labels;
    pub use crate::surrogate::{
        train_surrogate, Classifier, Criterion, SurrogateModel, SurrogateStrategy, TreeRenderOptions,
    };
    pub use crate::explain::{compute_global_importance, DegradedReason, GlobalImportance};
    pub use crate::evaluation::{
        evaluate_accuracy, evaluate_fidelity, DistillationReport, Distiller, FidelityLevel,
    };

    // Synthetic data
    pub use crate::synthetic::make_classification;
}
