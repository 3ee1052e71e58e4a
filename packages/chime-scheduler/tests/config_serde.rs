use chime_scheduler::{SchedulerBuilder, SchedulerConfig};

#[test]
fn test_missing_fields_fall_back_to_defaults() {
    let config: SchedulerConfig = serde_json::from_str(r#"{ "start_time": 250 }"#).unwrap();

    assert_eq!(config.start_time, 250);
    assert!(config.log_task_errors);
    assert!(config.collect_errors);
    assert!(!config.silence_task_panics);
}

#[test]
fn test_config_from_json_drives_the_scheduler() {
    let config: SchedulerConfig = serde_json::from_str(
        r#"{ "start_time": 1000, "log_task_errors": false, "silence_task_panics": true }"#,
    )
    .unwrap();
    let scheduler = SchedulerBuilder::from_config(config).build();
    scheduler.schedule_timer(5, || panic!("configured")).unwrap();

    let report = scheduler.run().unwrap();

    assert_eq!(report.ended_at, 1005);
    assert_eq!(report.errors[0].message, "configured");
}

#[test]
fn test_config_round_trips_through_json() {
    let config = SchedulerConfig {
        start_time: 42,
        collect_errors: false,
        ..SchedulerConfig::default()
    };

    let json = serde_json::to_string(&config).unwrap();
    let back: SchedulerConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(back, config);
}
