//! Required-field validation for directive data.

use crate::directive::field;
use serde_json::{Map, Value};

/// A required field: the data-map key plus the human-readable label used to
/// prompt the user for it.
#[derive(Debug, Clone, Copy)]
pub struct RequiredField {
    pub key: &'static str,
    pub label: &'static str,
}

/// Return the label of the first missing field in declaration order, or
/// `None` when all required fields are present. A field is missing when the
/// key is absent or its value is blank after trimming.
pub fn first_missing<'a>(
    data: &Map<String, Value>,
    required: &'a [RequiredField],
) -> Option<&'a str> {
    required
        .iter()
        .find(|f| field(data, f.key).is_none())
        .map(|f| f.label)
}
