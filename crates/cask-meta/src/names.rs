//! Property-name normalization.
//!
//! Metadata properties are addressed by normalized identifiers so that
//! `"File Name"`, `"file-name"`, and `"file_name"` all resolve to the same
//! history. Normalization lowercases the input and collapses every run of
//! characters outside `[a-z0-9_]` into a single underscore; separators that
//! would land at the start or end are dropped, while underscores the caller
//! wrote survive.

use crate::error::{MetaError, MetaResult};

/// Maximum length of a normalized property identifier.
pub const MAX_PROPERTY_LEN: usize = 128;

/// Normalize and validate a property name.
///
/// # Examples
///
/// ```
/// use cask_meta::normalize_property_name;
///
/// assert_eq!(normalize_property_name("Hello  World!").unwrap(), "hello_world");
/// assert_eq!(normalize_property_name("file-name").unwrap(), "file_name");
/// assert_eq!(normalize_property_name("_private_4").unwrap(), "_private_4");
/// assert!(normalize_property_name("!!!").is_err());
/// ```
pub fn normalize_property_name(name: &str) -> MetaResult<String> {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if out.is_empty() {
        return Err(MetaError::InvalidProperty {
            name: name.to_string(),
            reason: "empty after normalization".to_string(),
        });
    }
    if out.len() > MAX_PROPERTY_LEN {
        return Err(MetaError::InvalidProperty {
            name: name.to_string(),
            reason: format!("longer than {MAX_PROPERTY_LEN} characters"),
        });
    }
    Ok(out)
}
