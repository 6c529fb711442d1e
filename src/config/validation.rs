//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check origin and redirect target shapes before they reach the router
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: CollectorConfig -> Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system, at startup and on
//!   every hot reload

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::CollectorConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `listener.bind_address` is not host:port.
    #[error("listener.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    /// TLS enabled with a blank certificate or key path.
    #[error("listener.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),

    /// Zero timeout would reject every request.
    #[error("http.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    /// Zero body limit would reject every request with a body.
    #[error("http.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    /// Append log destination is blank.
    #[error("log.path must not be empty")]
    EmptyLogPath,

    /// Backoff window is inverted.
    #[error("log.retry.base_delay_ms must not exceed log.retry.max_delay_ms")]
    InvertedRetryDelays,

    /// Origin entry is neither `*` nor a bare http(s) origin.
    #[error("cors.allowed_origins entry `{0}` is not `*` or an http(s) origin")]
    InvalidOrigin(String),

    /// Redirect target is neither an absolute URL nor an absolute path.
    #[error("contact.redirect_url `{0}` is neither an absolute URL nor an absolute path")]
    InvalidRedirectUrl(String),

    /// `observability.metrics_address` is not host:port.
    #[error("observability.metrics_address `{0}` is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &CollectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.log.path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyLogPath);
    }
    if config.log.retry.base_delay_ms > config.log.retry.max_delay_ms {
        errors.push(ValidationError::InvertedRetryDelays);
    }

    for origin in &config.cors.allowed_origins {
        if !is_valid_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if !is_valid_redirect_target(&config.contact.redirect_url) {
        errors.push(ValidationError::InvalidRedirectUrl(
            config.contact.redirect_url.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `*`, or a scheme://host[:port] origin with no path, query or fragment.
fn is_valid_origin(origin: &str) -> bool {
    if origin == "*" {
        return true;
    }
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
                && url.fragment().is_none()
                && !origin.ends_with('/')
        }
        Err(_) => false,
    }
}

/// Absolute http(s) URL, or an absolute path on this host.
fn is_valid_redirect_target(target: &str) -> bool {
    if target.starts_with('/') {
        return true;
    }
    matches!(Url::parse(target), Ok(url) if matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CollectorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_multiple_errors() {
        let mut config = CollectorConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.http.request_timeout_secs = 0;
        config.log.retry.base_delay_ms = 1000;
        config.log.retry.max_delay_ms = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroRequestTimeout));
        assert!(errors.contains(&ValidationError::InvertedRetryDelays));
    }

    #[test]
    fn test_blank_tls_paths_rejected() {
        let mut config = CollectorConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: String::new(),
            key_path: "/etc/ssl/apm.key".to_string(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyTlsPath("cert_path")]);
    }

    #[test]
    fn test_origin_shapes() {
        assert!(is_valid_origin("*"));
        assert!(is_valid_origin("https://app.example.com"));
        assert!(is_valid_origin("http://localhost:3000"));
        assert!(!is_valid_origin("app.example.com"));
        assert!(!is_valid_origin("https://app.example.com/path"));
        assert!(!is_valid_origin("https://app.example.com/"));
        assert!(!is_valid_origin("ftp://files.example.com"));
    }

    #[test]
    fn test_redirect_targets() {
        assert!(is_valid_redirect_target("/thanks.html"));
        assert!(is_valid_redirect_target("https://example.com/thanks"));
        assert!(!is_valid_redirect_target("thanks.html"));
        assert!(!is_valid_redirect_target("javascript:alert(1)"));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = CollectorConfig::default();
        config.observability.metrics_address = "bogus".to_string();
        assert!(validate_config(&config).is_err());

        config.observability.metrics_enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
