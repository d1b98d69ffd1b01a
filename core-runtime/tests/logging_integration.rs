//! Integration tests for logging system

use core_runtime::logging::{
    init_logging, redact_bearer, redact_if_sensitive, LogFormat, LogLevel, LoggingConfig,
};

// The global subscriber can be installed once per process, so every
// initialization check lives in this single test.
#[test]
fn test_logging_initialization_is_idempotent() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).unwrap());
    assert!(!init_logging(config).unwrap());

    tracing::info!(token = %redact_bearer("Bearer abc"), "logging initialized");
}

#[test]
fn test_invalid_filter_is_reported() {
    let config = LoggingConfig::default().with_filter("core_call=loud");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_redaction_helpers() {
    assert_eq!(redact_bearer("Bearer sensitive"), "Bearer [REDACTED]");
    assert_eq!(redact_if_sensitive("access_token", "t0k3n"), "[REDACTED]");

    let email = redact_if_sensitive("email", "user@example.com");
    assert!(!email.contains("example.com"));
}
