use dbretry::error::ErrorKind;
use dbretry::timeouts::TimeoutOverrides;
use dbretry::validation::{validate_backoff_cap, validate_timeouts, ConfigValidator};

#[test]
fn test_valid_timeout_values() {
    let validator = ConfigValidator::new();

    assert!(validator.validate_timeout_ms(1));
    assert!(validator.validate_timeout_ms(2_500));
    assert!(validator.validate_timeout_ms(75_000));
}

#[test]
fn test_invalid_timeout_values() {
    let validator = ConfigValidator::new();

    assert!(!validator.validate_timeout_ms(0));
    assert!(!validator.validate_timeout_ms(u64::MAX));
}

#[test]
fn test_unusual_timeouts() {
    let validator = ConfigValidator::new();

    assert!(validator.is_unusual(3_600_001));
    assert!(!validator.is_unusual(3_600_000));
    assert!(!validator.is_unusual(75_000));
}

#[test]
fn test_validate_timeouts_function() {
    assert!(validate_timeouts(&TimeoutOverrides::default()).is_ok());

    let ok = TimeoutOverrides {
        key_value_timeout_ms: Some(10),
        search_timeout_ms: Some(86_400_000), // accepted, only logged
        ..Default::default()
    };
    assert!(validate_timeouts(&ok).is_ok());

    let bad = TimeoutOverrides {
        collection_management_timeout_ms: Some(0),
        ..Default::default()
    };
    let err = validate_timeouts(&bad).unwrap_err();
    assert!(err.to_string().contains("collection_management_timeout_ms"));
}

#[test]
fn test_validate_backoff_cap_function() {
    assert!(validate_backoff_cap(50).is_ok());
    assert!(matches!(validate_backoff_cap(0), Err(ErrorKind::InvalidArgument(_))));
}
