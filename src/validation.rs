//! Shared helpers for `validator` derives.
//!
//! Forms report problems as plain messages, in the order the fields appear
//! on screen, so the derived `ValidationErrors` are flattened here.

use validator::{ValidationError, ValidationErrors};

/// Rejects empty and whitespace-only text.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// First message of each failing field, following `order`. Fields not named
/// in `order` come last, sorted by name.
pub(crate) fn messages(result: Result<(), ValidationErrors>, order: &[&str]) -> Vec<String> {
    let Err(errors) = result else {
        return Vec::new();
    };
    let fields = errors.field_errors();
    let mut names: Vec<&str> = order
        .iter()
        .copied()
        .filter(|name| fields.contains_key(*name))
        .collect();
    let mut rest: Vec<&str> = fields
        .keys()
        .map(|name| &**name)
        .filter(|name| !order.contains(name))
        .collect();
    rest.sort_unstable();
    names.extend(rest);

    names
        .into_iter()
        .filter_map(|name| {
            let error = fields.get(name)?.first()?;
            Some(match &error.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", name),
            })
        })
        .collect()
}
