//! Domain validators applied after extraction
//!
//! Each validator takes the argument name so the resulting [`ArgError`] can
//! point at the offending parameter.

use url::Url;

use crate::{ArgError, Result};

/// HTTP methods accepted by the API proxy tools
pub const ALLOWED_HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD"];

/// Number of fields in a standard cron expression
pub const CRON_FIELD_COUNT: usize = 5;

/// Reject strings that are empty after trimming
pub fn non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ArgError::invalid(name, "must not be empty"));
    }
    Ok(())
}

/// Reject IDs that are zero or negative
pub fn positive(name: &str, value: i64) -> Result<i64> {
    if value <= 0 {
        return Err(ArgError::invalid(
            name,
            format!("must be a positive integer, got {value}"),
        ));
    }
    Ok(value)
}

/// [`positive`] applied to every element
pub fn all_positive(name: &str, values: &[i64]) -> Result<()> {
    for value in values {
        positive(name, *value)?;
    }
    Ok(())
}

/// Require membership in a fixed set of string values
pub fn one_of(name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ArgError::invalid(
        name,
        format!("must be one of: {} (got '{value}')", allowed.join(", ")),
    ))
}

/// Require an integer within an inclusive range
pub fn int_in_range(name: &str, value: i64, min: i64, max: i64) -> Result<i64> {
    if (min..=max).contains(&value) {
        return Ok(value);
    }
    Err(ArgError::invalid(
        name,
        format!("must be between {min} and {max}, got {value}"),
    ))
}

/// Require a parseable absolute URL
pub fn url(name: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| ArgError::invalid(name, format!("must be a valid URL: {e}")))
}

/// Require a 5-field cron expression
///
/// Only the field count is checked; field contents are left to the backend.
pub fn cron_expression(name: &str, value: &str) -> Result<()> {
    let fields = value.split_whitespace().count();
    if fields != CRON_FIELD_COUNT {
        return Err(ArgError::invalid(
            name,
            format!("cron expression must have exactly {CRON_FIELD_COUNT} fields, got {fields}"),
        ));
    }
    Ok(())
}

/// Require an API path rooted at `/` without `.` or `..` segments.
///
/// URL parsers resolve dot segments, so a path such as `/../users` would
/// leave the prefix it is appended to. Percent-encoded dots and separators
/// are decoded before the check.
pub fn api_path(name: &str, value: &str) -> Result<()> {
    if !value.starts_with('/') {
        return Err(ArgError::invalid(name, "must start with '/'"));
    }
    let decoded = value
        .to_ascii_lowercase()
        .replace("%2e", ".")
        .replace("%2f", "/")
        .replace("%5c", "\\");
    if decoded
        .split(['/', '\\'])
        .any(|segment| segment == "." || segment == "..")
    {
        return Err(ArgError::invalid(name, "must not contain '.' or '..' segments"));
    }
    Ok(())
}

/// Require one of [`ALLOWED_HTTP_METHODS`]
pub fn http_method(name: &str, value: &str) -> Result<()> {
    one_of(name, value, ALLOWED_HTTP_METHODS)
}
