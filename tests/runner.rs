use anyhow::Result;
use carrier_enrich::testing::*;
use carrier_enrich::*;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FailingStore;

impl ReferenceStore for FailingStore {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }
}

#[derive(Default)]
struct CountingStore {
    reads: AtomicUsize,
}

impl ReferenceStore for CountingStore {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(sample_entries())
    }
}

#[test]
fn storage_failure_ends_the_batch_before_decoding() {
    // The input is empty, so reaching the decoder would give MissingHeader instead.
    let err = enrich_table(b"", &FailingStore, &EnrichConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        EnrichError::Storage(StorageError::Unavailable(_))
    ));
}

#[test]
fn store_is_read_exactly_once_per_batch() -> Result<()> {
    let store = CountingStore::default();
    enrich_table(&generated_table(3_000), &store, &EnrichConfig::default())?;
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn boxed_stores_work_through_the_trait() -> Result<()> {
    let store: Box<dyn ReferenceStore> = Box::new(sample_store());
    let out = enrich_table(b"phone\n13800138000\n", &store, &EnrichConfig::default())?;
    assert_table_eq(
        &out.bytes,
        "phone,province,city,carrier\n13800138000,Guangdong,Shenzhen,China Mobile\n",
    );
    Ok(())
}

#[test]
fn cancelled_token_fails_parallel_batch() -> Result<()> {
    let token = CancelToken::new();
    let runner = Runner::new(EnrichConfig {
        workers: Some(4),
        ..EnrichConfig::default()
    })?
    .with_cancel_token(token.clone());

    token.cancel();
    let err = runner
        .run(&generated_table(1_000), &sample_snapshot())
        .unwrap_err();
    assert!(matches!(err, EnrichError::Cancelled));
    Ok(())
}

#[test]
fn cancelled_token_fails_sequential_batch() -> Result<()> {
    let runner = Runner::sequential(EnrichConfig::default())?;
    runner.cancel_token().cancel();
    let err = runner.run(b"phone\n", &sample_snapshot()).unwrap_err();
    assert!(matches!(err, EnrichError::Cancelled));
    Ok(())
}

#[test]
fn cancelling_mid_batch_never_returns_partial_output() -> Result<()> {
    let runner = Runner::new(EnrichConfig {
        workers: Some(2),
        queue_capacity: 4,
        result_capacity: 4,
        ..EnrichConfig::default()
    })?;
    let token = runner.cancel_token();
    let input = generated_table(50_000);
    let snapshot = sample_snapshot();

    let result = std::thread::scope(|s| {
        let handle = s.spawn(|| runner.run(&input, &snapshot));
        token.cancel();
        handle.join()
    });
    match result {
        Ok(Err(EnrichError::Cancelled)) => {}
        // The batch may win the race; then it must be complete.
        Ok(Ok(out)) => assert_eq!(parse_table(&out.bytes).len(), 50_001),
        Ok(Err(other)) => panic!("unexpected error: {other}"),
        Err(_) => panic!("runner thread panicked"),
    }
    Ok(())
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cases = [
        EnrichConfig {
            workers: Some(0),
            ..EnrichConfig::default()
        },
        EnrichConfig {
            queue_capacity: 0,
            ..EnrichConfig::default()
        },
        EnrichConfig {
            key_length: 0,
            ..EnrichConfig::default()
        },
        EnrichConfig {
            delimiter: '；',
            ..EnrichConfig::default()
        },
    ];
    for cfg in cases {
        let err = enrich_table(b"phone\n", &sample_store(), &cfg).unwrap_err();
        assert!(matches!(err, EnrichError::Config(_)), "{cfg:?} accepted");
    }
}

#[test]
fn runner_reports_its_mode() -> Result<()> {
    let runner = Runner::new(EnrichConfig {
        workers: Some(3),
        ..EnrichConfig::default()
    })?;
    assert_eq!(runner.mode(), ExecMode::Parallel { workers: 3 });
    assert_eq!(
        Runner::sequential(EnrichConfig::default())?.mode(),
        ExecMode::Sequential
    );
    Ok(())
}

#[test]
fn report_round_trips_through_a_metrics_file() -> Result<()> {
    let out = enrich_table(&generated_table(300), &sample_store(), &EnrichConfig::default())?;
    let path = write_temp("json", b"")?;
    out.report.save_to_file(&path)?;

    let saved: BatchReport = serde_json::from_slice(&read_bytes(&path)?)?;
    assert_eq!(saved, out.report);
    Ok(())
}
