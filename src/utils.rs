//! Numeric helpers shared by the estimators.

pub mod consensus;
pub mod safe_cast;
