//! Utility functions shared by the surrogate and explanation modules

pub mod linalg;

pub use linalg::{argmax, cholesky_solve, weighted_ridge, RidgeFit, Standardizer};
