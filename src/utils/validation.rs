use crate::utils::error::{RenewalError, Result};
use url::Url;

/// 重試間隔上限；批次逐一處理合約，過長的等待會拖住整批
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid_value(field_name: &str, value: impl ToString, reason: impl Into<String>) -> RenewalError {
    RenewalError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid_value(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid_value(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(invalid_value(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            ))
        }
    }
    // 商機服務的路徑會接在端點之後
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid_value(
            field_name,
            url_str,
            "Endpoint must not carry a query or fragment",
        ));
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid_value(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid_value(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| RenewalError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid_value(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// Tenant and contract ids are matched verbatim against the snapshot, so
/// surrounding whitespace or control characters always miss.
pub fn validate_entity_id(field_name: &str, id: &str) -> Result<()> {
    validate_non_empty_string(field_name, id)?;
    if id.trim() != id {
        return Err(invalid_value(field_name, id, "Id has leading or trailing whitespace"));
    }
    if id.chars().any(char::is_control) {
        return Err(invalid_value(field_name, id.escape_debug(), "Id contains control characters"));
    }
    Ok(())
}

pub fn validate_retry_delay_ms(field_name: &str, delay_ms: u64) -> Result<()> {
    if delay_ms > MAX_RETRY_DELAY_MS {
        return Err(invalid_value(
            field_name,
            delay_ms,
            format!("Retry delay must be at most {} ms", MAX_RETRY_DELAY_MS),
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid_value(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}
