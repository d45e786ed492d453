//! Column validators. Each runs before the write is issued; the first
//! failure aborts the operation.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::{StoreError, StoreResult};

const EMAIL_PATTERN: &str = concat!(
    r"^[^\s@]+@",
    r"[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?",
    r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
);

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));

const URL_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Reject a missing (null) column value.
pub fn required<'a, T: ?Sized>(
    entity: &str,
    field: &str,
    value: Option<&'a T>,
) -> StoreResult<&'a T> {
    value.ok_or_else(|| {
        StoreError::validation(field, format!("{}.{} cannot be null", entity, field))
    })
}

pub fn email(field: &str, value: &str) -> StoreResult<()> {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(StoreError::validation(field, format!("Validation isEmail on {} failed", field)))
    }
}

/// Accepts absolute http/https/ftp URLs with a dotted host (or localhost).
/// A bare `host/path` is treated as http.
pub fn url(field: &str, value: &str) -> StoreResult<()> {
    let invalid = || StoreError::validation(field, format!("Validation isUrl on {} failed", field));

    if value.trim() != value || value.is_empty() {
        return Err(invalid());
    }

    let parsed = match Url::parse(value) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("http://{}", value)).map_err(|_| invalid())?
        }
        Err(_) => return Err(invalid()),
    };

    if !URL_SCHEMES.contains(&parsed.scheme()) {
        return Err(invalid());
    }

    match parsed.host_str() {
        Some(host) if host == "localhost" || (host.contains('.') && !host.ends_with('.')) => Ok(()),
        _ => Err(invalid()),
    }
}

pub fn min_len(field: &str, value: &str, min: usize) -> StoreResult<()> {
    if value.chars().count() >= min {
        Ok(())
    } else {
        Err(StoreError::validation(field, format!("Validation len on {} failed", field)))
    }
}
