//! Application CRD Definitions
//!
//! Kubernetes Custom Resource Definition for the `Application` workload
//! abstraction, together with the defaulting accessors every reconciliation
//! pass reads through.

pub mod accessors;
pub mod application;
pub mod error;
pub mod specification;

pub use application::*;
pub use error::CrdError;
pub use specification::Specification;
