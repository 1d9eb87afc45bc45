//! Model-agnostic explanations
//!
//! - [`LimeTabularExplainer`] - local per-instance attributions
//! - [`compute_global_importance`] - averages absolute local attributions
//!   over sampled rows into one ranking
//!
//! The local explainer is behind the `lime` cargo feature. Without it the
//! global ranking comes back empty and flagged as degraded.

#[cfg(feature = "lime")]
mod discretizer;
mod global;
#[cfg(feature = "lime")]
mod lime;

#[cfg(feature = "lime")]
pub use discretizer::{FeatureBins, QuartileDiscretizer};
pub use global::{compute_global_importance, DegradedReason, GlobalImportance};
#[cfg(feature = "lime")]
pub use lime::{FeatureWeight, LimeTabularExplainer, LocalExplanation};
