//! Structural linting of Dockerfiles

mod report;
pub mod rules;
pub mod validator;

pub use report::{Diagnostic, Report, Severity};
pub use rules::ValidationRule;
pub use validator::Validator;
