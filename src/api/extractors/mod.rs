//! Request extractors with validation.

mod validated_form;
mod validated_json;
mod validated_query;

pub use validated_form::ValidatedForm;
pub use validated_json::{format_validation_errors, ValidatedJson};
pub use validated_query::ValidatedQuery;
