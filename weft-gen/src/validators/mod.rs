//! Static validation of generated pattern code
//!
//! Model output is untrusted text. Before any generated artifact is
//! accepted it runs through a rule-based validator covering structure,
//! musical safety limits, and known-bad constructs.

pub mod content_validator;
pub mod policy;

pub use content_validator::{structural_check, validate, ValidationResult};
pub use policy::ValidationPolicy;
