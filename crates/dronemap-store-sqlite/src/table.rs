//! Identifier-to-table-name resolution.
//!
//! The table-per-entity schema means table names are assembled from
//! caller-supplied identifiers. Identifiers are
//! therefore validated against a strict allow-list before any SQL is built:
//! non-empty, at most 64 characters, ASCII alphanumeric with a leading ASCII
//! letter. Anything else is rejected up front.

use dronemap_core::{Error, Result};

const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate `id` against the allow-list, returning it unchanged on success.
pub fn validate_identifier(id: &str) -> Result<&str> {
  let mut chars = id.chars();
  let valid = match chars.next() {
    Some(first) => {
      first.is_ascii_alphabetic()
        && id.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_alphanumeric())
    }
    None => false,
  };

  if valid {
    Ok(id)
  } else {
    Err(Error::InvalidIdentifier(id.to_owned()))
  }
}

/// `{id}_trajectory` — per-object position samples.
pub fn trajectory_table(object_id: &str) -> Result<String> {
  Ok(format!("{}_trajectory", validate_identifier(object_id)?))
}

/// `{id}_data` — the single per-object constants row.
pub fn constants_table(object_id: &str) -> Result<String> {
  Ok(format!("{}_data", validate_identifier(object_id)?))
}

/// Section tables are named by the section identifier itself.
pub fn section_table(section_id: &str) -> Result<String> {
  Ok(validate_identifier(section_id)?.to_owned())
}
