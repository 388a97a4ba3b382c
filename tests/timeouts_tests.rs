use anyhow::Result;
use dbretry::error::ErrorKind;
use dbretry::request::{Request, Service};
use dbretry::timeouts::{duration_to_millis, TimeoutOverrides, Timeouts};
use std::collections::HashSet;
use std::time::Duration;

const NAMED_SERVICES: [Service; 6] = [
    Service::KeyValue,
    Service::View,
    Service::Query,
    Service::Analytics,
    Service::Search,
    Service::Management,
];

#[test]
fn test_defaults_are_distinct_per_service() {
    let timeouts = Timeouts::from_configuration(&TimeoutOverrides::default());

    let distinct: HashSet<Duration> = NAMED_SERVICES
        .iter()
        .map(|s| timeouts.timeout_for_service(*s))
        .collect();
    assert_eq!(distinct.len(), NAMED_SERVICES.len());

    assert_eq!(timeouts.timeout_for_service(Service::KeyValue), Duration::from_millis(2_500));
    assert_eq!(timeouts.timeout_for_service(Service::Query), Duration::from_secs(75));
}

#[test]
fn test_each_override_is_independent() {
    let defaults = Timeouts::default();

    for target in NAMED_SERVICES {
        let mut overrides = TimeoutOverrides::default();
        let value = Some(123_456);
        match target {
            Service::KeyValue => overrides.key_value_timeout_ms = value,
            Service::View => overrides.view_timeout_ms = value,
            Service::Query => overrides.query_timeout_ms = value,
            Service::Analytics => overrides.analytics_timeout_ms = value,
            Service::Search => overrides.search_timeout_ms = value,
            Service::Management => overrides.management_timeout_ms = value,
            _ => unreachable!(),
        }
        let timeouts = Timeouts::from_configuration(&overrides);

        for service in NAMED_SERVICES {
            let expected = if service == target {
                Duration::from_millis(123_456)
            } else {
                defaults.timeout_for_service(service)
            };
            assert_eq!(timeouts.timeout_for_service(service), expected, "{} after overriding {}", service, target);
        }
    }
}

#[test]
fn test_admin_services_fall_back_to_management() {
    let timeouts = Timeouts::from_configuration(&TimeoutOverrides {
        management_timeout_ms: Some(42_000),
        ..Default::default()
    });
    assert_eq!(timeouts.timeout_for_service(Service::BucketManagement), Duration::from_secs(42));
    assert_eq!(timeouts.timeout_for_service(Service::CollectionManagement), Duration::from_secs(42));

    let timeouts = Timeouts::from_configuration(&TimeoutOverrides {
        bucket_management_timeout_ms: Some(5_000),
        ..Default::default()
    });
    assert_eq!(timeouts.timeout_for_service(Service::BucketManagement), Duration::from_secs(5));
    assert_eq!(timeouts.timeout_for_service(Service::CollectionManagement), Duration::from_secs(60));
}

#[test]
fn test_lookup_by_name() -> Result<()> {
    let timeouts = Timeouts::default();
    assert_eq!(timeouts.timeout_for_service_name("kv")?, Duration::from_millis(2_500));
    assert_eq!(timeouts.timeout_for_service_name("analytics")?, Duration::from_secs(80));
    assert_eq!(timeouts.timeout_for_service_name("collection-management")?, Duration::from_secs(60));
    Ok(())
}

#[test]
fn test_unknown_service_is_invalid_argument() {
    let err = Timeouts::default().timeout_for_service_name("eventing").unwrap_err();
    assert!(matches!(err, ErrorKind::InvalidArgument(_)));
}

#[test]
fn test_overrides_deserialize_from_json() -> Result<()> {
    let overrides: TimeoutOverrides =
        serde_json::from_str(r#"{"query_timeout_ms": 30000, "search_timeout_ms": 1000}"#)?;
    let timeouts = Timeouts::from_configuration(&overrides);

    assert_eq!(timeouts.query, Duration::from_secs(30));
    assert_eq!(timeouts.search, Duration::from_secs(1));
    assert_eq!(timeouts.view, Duration::from_secs(70));

    assert!(serde_json::from_str::<TimeoutOverrides>(r#"{"eventing_timeout_ms": 1}"#).is_err());
    Ok(())
}

#[test]
fn test_request_timeout_resolution() {
    let timeouts = Timeouts::from_configuration(&TimeoutOverrides {
        key_value_durable_timeout_ms: Some(15_000),
        ..Default::default()
    });

    let get = Request::builder(Service::KeyValue, "get").build(&timeouts);
    assert_eq!(get.timeout(), Duration::from_millis(2_500));

    let durable = Request::builder(Service::KeyValue, "upsert").durable(true).build(&timeouts);
    assert_eq!(durable.timeout(), Duration::from_secs(15));

    let explicit = Request::builder(Service::Search, "search")
        .timeout(Duration::from_millis(750))
        .build(&timeouts);
    assert_eq!(explicit.timeout(), Duration::from_millis(750));

    // Durability only applies to key-value operations
    let query = Request::builder(Service::Query, "insert").durable(true).build(&timeouts);
    assert_eq!(query.timeout(), Duration::from_secs(75));
}

#[test]
fn test_duration_to_millis_saturates() {
    assert_eq!(duration_to_millis(Duration::from_millis(2_500)), 2_500);
    assert_eq!(duration_to_millis(Duration::MAX), u64::MAX);
}
