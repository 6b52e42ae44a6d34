use anyhow::Result;
use carrier_enrich::testing::*;
use carrier_enrich::*;

#[test]
fn missing_fields_take_defaults() -> Result<()> {
    let path = write_temp("json", r#"{ "workers": 3, "layout": "insert" }"#)?;
    let cfg = EnrichConfig::from_json_file(&path)?;

    assert_eq!(cfg.workers, Some(3));
    assert_eq!(cfg.layout, ColumnLayout::Insert);
    assert_eq!(cfg.queue_capacity, 1000);
    assert_eq!(cfg.key_length, 7);
    assert_eq!(cfg.labels, HeaderLabels::default());
    Ok(())
}

#[test]
fn partial_labels_keep_remaining_defaults() -> Result<()> {
    let path = write_temp("json", r#"{ "labels": { "subject": "手机号" } }"#)?;
    let cfg = EnrichConfig::from_json_file(&path)?;
    assert_eq!(cfg.labels.subject, "手机号");
    assert_eq!(cfg.labels.carrier, "carrier");
    Ok(())
}

#[test]
fn invalid_values_fail_validation() -> Result<()> {
    let path = write_temp("json", r#"{ "result_capacity": 0 }"#)?;
    assert!(matches!(
        EnrichConfig::from_json_file(&path),
        Err(ConfigError::Zero {
            field: "result_capacity"
        })
    ));

    let path = write_temp("json", r#"{ "labels": { "city": "" } }"#)?;
    assert!(matches!(
        EnrichConfig::from_json_file(&path),
        Err(ConfigError::EmptyLabel("city"))
    ));
    Ok(())
}

#[test]
fn unreadable_files_are_reported() -> Result<()> {
    let path = write_temp("json", "{ not json")?;
    assert!(matches!(
        EnrichConfig::from_json_file(&path),
        Err(ConfigError::Parse { .. })
    ));

    let missing = std::env::temp_dir().join("carrier-enrich-missing-config.json");
    assert!(matches!(
        EnrichConfig::from_json_file(missing),
        Err(ConfigError::Read { .. })
    ));
    Ok(())
}

#[test]
fn worker_count_falls_back_to_available_cpus() {
    let cfg = EnrichConfig::default();
    assert!(cfg.worker_count() >= 1);
    let cfg = EnrichConfig {
        workers: Some(5),
        ..cfg
    };
    assert_eq!(cfg.worker_count(), 5);
}
