use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use coffer::{
    DatabaseError, PrimaryKey, StoreConfig, Value, WritePolicy,
    utils::mock::{TempStore, dog, dog_schema},
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_fail_fast_reports_write_conflict() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("conc_fail_fast").unwrap();
    let store = temp.open_with(
        StoreConfig::default()
            .with_sync_on_commit(false)
            .with_write_policy(WritePolicy::FailFast),
    )?;
    store.define_type(dog_schema()?)?;

    let mut txn = store.begin_write()?;
    txn.write("Dog", dog(1, "Rex", 3), false)?;

    assert!(matches!(store.begin_write(), Err(DatabaseError::WriteConflict)));
    assert!(matches!(
        store.write("Dog", dog(2, "Fido", 1), false),
        Err(DatabaseError::WriteConflict)
    ));
    assert!(DatabaseError::WriteConflict.is_recoverable());

    // Readers are never blocked by the writer
    assert_eq!(store.count("Dog")?, 0);

    txn.commit()?;
    store.write("Dog", dog(2, "Fido", 1), false)?;
    assert_eq!(store.count("Dog")?, 2);
    Ok(())
}

#[test]
fn test_blocking_writers_serialize() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("conc_block").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = &store;
                scope.spawn(move || -> Result<(), DatabaseError> {
                    for i in 0..25 {
                        let id = worker * 100 + i;
                        store.write("Dog", dog(id, "Rex", worker), false)?;
                    }
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    });

    assert_eq!(store.count("Dog")?, 100);
    assert_eq!(store.version()?, 101);
    Ok(())
}

#[test]
fn test_readers_never_see_partial_commits() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("conc_readers").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;
    store.write_batch(|txn| {
        for id in 0..40 {
            txn.write("Dog", dog(id, "Rex", 0), false)?;
        }
        Ok(())
    })?;

    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        let writer = scope.spawn(|| -> Result<(), DatabaseError> {
            for round in 1..=30 {
                store.write_batch(|txn| {
                    for id in 0..40 {
                        txn.update_fields(
                            "Dog",
                            &PrimaryKey::from(id),
                            &[("age", Value::Integer(round))],
                            false,
                        )?;
                    }
                    Ok(())
                })?;
            }
            done.store(true, Ordering::SeqCst);
            Ok(())
        });

        let readers: Vec<_> = (0..3)
            .map(|_| {
                scope.spawn(|| -> Result<usize, DatabaseError> {
                    let mut checks = 0;
                    loop {
                        let finished = done.load(Ordering::SeqCst);
                        let txn = store.begin_read()?;
                        let records = txn.fetch("Dog", None)?.collect::<Result<Vec<_>, _>>()?;
                        assert_eq!(records.len(), 40);
                        let first_age = records[0].values[2].clone();
                        assert!(
                            records.iter().all(|record| record.values[2] == first_age),
                            "snapshot at version {} mixes two commits",
                            txn.version()
                        );
                        checks += 1;
                        if finished {
                            return Ok(checks);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap().unwrap();
        for reader in readers {
            assert!(reader.join().unwrap().unwrap() > 0);
        }
    });

    let final_ages: Vec<Value> = store
        .fetch("Dog", None)?
        .into_iter()
        .map(|record| record.values[2].clone())
        .collect();
    assert!(final_ages.iter().all(|age| *age == Value::Integer(30)));
    Ok(())
}

#[test]
fn test_page_reuse_waits_for_readers() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("conc_reuse").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;
    for id in 0..20 {
        store.write("Dog", dog(id, "Rex", 1), false)?;
    }
    let steady = temp.file_size().unwrap();

    let reader = store.begin_read()?;
    assert_eq!(store.live_readers()?, 1);
    for round in 0..10 {
        store.write("Dog", dog(round, "Fido", 2), true)?;
    }
    // Pages the reader can reach were not handed out again
    let grown = temp.file_size().unwrap();
    assert!(grown > steady);
    let seen = reader.fetch("Dog", None)?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(seen, (0..20).map(|id| dog(id, "Rex", 1)).collect::<Vec<_>>());
    drop(reader);
    assert_eq!(store.live_readers()?, 0);

    // One commit promotes what the reader was holding back; after that the file stops growing
    store.write("Dog", dog(0, "Spot", 3), true)?;
    let settled = temp.file_size().unwrap();
    for round in 0..10 {
        store.write("Dog", dog(round, "Spot", 3), true)?;
    }
    assert_eq!(temp.file_size().unwrap(), settled);
    assert!(settled <= grown);
    Ok(())
}
