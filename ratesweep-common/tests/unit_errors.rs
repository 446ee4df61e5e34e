use std::time::Duration;
use ratesweep_common::{
    AggregationError, ConfigError, SchedulingError, SweepError, WorkloadError,
};

#[test]
fn test_workload_error_display() {
    let err = WorkloadError::NetworkError("connection refused".to_string());
    assert_eq!(err.to_string(), "Network error: connection refused");
}

#[test]
fn test_http_error_5xx() {
    let err = WorkloadError::HttpError(503, "Service Unavailable".to_string());
    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
}

#[test]
fn test_workload_error_equality() {
    let a = WorkloadError::Failed("boom".to_string());
    let b = WorkloadError::Failed("boom".to_string());
    let c = WorkloadError::Failed("bang".to_string());
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_timed_out_mentions_limit() {
    let err = WorkloadError::TimedOut(Duration::from_millis(250));
    assert_eq!(err.to_string(), "Call did not complete within 250ms");
}

#[test]
fn test_scheduling_error_display() {
    assert_eq!(
        SchedulingError::NonPositiveRate(0.0).to_string(),
        "rate must be positive, got 0"
    );
    assert_eq!(SchedulingError::ZeroDuration.to_string(), "duration must be non-zero");
}

#[test]
fn test_aggregation_error_names_rate() {
    let err = AggregationError::EmptyPass { rate: 0.2 };
    assert_eq!(
        err.to_string(),
        "rate level 0.2 ops/s completed no calls; latency statistics are undefined"
    );
}

#[test]
fn test_sweep_error_is_rate_scoped() {
    let err = SweepError::Scheduling { rate: -5.0, source: SchedulingError::NonPositiveRate(-5.0) };
    assert_eq!(err.to_string(), "rate level -5 ops/s: rate must be positive, got -5");

    let err = SweepError::Aggregation { rate: 0.2, source: AggregationError::EmptyPass { rate: 0.2 } };
    assert!(err.to_string().starts_with("rate level 0.2 ops/s aborted the sweep"));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::UnknownWorkload("get_nothing".to_string());
    assert_eq!(err.to_string(), "Unknown workload: get_nothing");

    let err = ConfigError::MissingArgument {
        workload: "get_ss_secret".to_string(),
        argument: "col_uid".to_string(),
    };
    assert_eq!(err.to_string(), "Workload get_ss_secret requires argument: col_uid");
}

#[test]
fn test_workload_error_roundtrip_json() {
    let err = WorkloadError::HttpError(404, "Not Found".to_string());
    let json = serde_json::to_string(&err).unwrap();
    let decoded: WorkloadError = serde_json::from_str(&json).unwrap();
    assert_eq!(err, decoded);
}
