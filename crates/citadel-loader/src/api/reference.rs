//! Reference URL parsing.
//!
//! Records point at each other with URLs such as
//! `https://rickandmortyapi.com/api/episode/28`. The referenced id is the
//! final path segment and the segment before it names the resource.

use super::Resource;
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("empty reference")]
    Empty,

    #[error("malformed reference '{reference}': {reason}")]
    Malformed { reference: String, reason: String },

    #[error("reference '{reference}' points at '{found}', expected '{expected}'")]
    WrongResource {
        reference: String,
        expected: Resource,
        found: String,
    },

    #[error("reference '{reference}' has non-numeric id '{segment}'")]
    InvalidId { reference: String, segment: String },
}

/// Extract the numeric id of an `expected` resource from a reference URL.
///
/// Absolute URLs and bare paths (`/api/episode/3/`) are both accepted;
/// query strings, fragments and a trailing slash are ignored.
pub fn parse_reference(reference: &str, expected: Resource) -> Result<i64, ReferenceError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(ReferenceError::Empty);
    }

    let path = if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|e| ReferenceError::Malformed {
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;
        url.path().to_string()
    } else {
        trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string()
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (resource_segment, id_segment) = match segments.as_slice() {
        [.., resource, id] => (*resource, *id),
        _ => {
            return Err(ReferenceError::Malformed {
                reference: reference.to_string(),
                reason: "expected a path ending in /{resource}/{id}".to_string(),
            })
        }
    };

    if resource_segment != expected.as_str() {
        return Err(ReferenceError::WrongResource {
            reference: reference.to_string(),
            expected,
            found: resource_segment.to_string(),
        });
    }

    let invalid_id = || ReferenceError::InvalidId {
        reference: reference.to_string(),
        segment: id_segment.to_string(),
    };
    if !id_segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid_id());
    }
    id_segment.parse::<i64>().map_err(|_| invalid_id())
}
