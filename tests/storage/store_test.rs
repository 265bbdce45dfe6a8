use coffer::{
    ColumnSchema, DataType, DatabaseError, PrimaryKey, Record, StoreConfig, TableSchema, Value,
    utils::mock::{TempStore, dog, dog_schema},
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tag_schema() -> TableSchema {
    TableSchema::new(
        "Tag",
        vec![
            ColumnSchema::new("label", DataType::Text, 0).primary_key(),
            ColumnSchema::new("uses", DataType::Integer, 1).with_default(Value::Integer(0)),
        ],
    )
    .unwrap()
}

#[test]
fn test_define_type() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_define").unwrap();
    let store = temp.open()?;

    assert!(store.type_names()?.is_empty());
    assert!(store.define_type(dog_schema()?)?);
    // Same schema again is a no-op
    assert!(!store.define_type(dog_schema()?)?);
    assert_eq!(store.type_names()?, vec!["Dog".to_string()]);
    assert_eq!(store.schema("Dog")?, dog_schema()?);

    let conflicting = TableSchema::new(
        "Dog",
        vec![ColumnSchema::new("id", DataType::Integer, 0).primary_key()],
    )?;
    assert!(matches!(
        store.define_type(conflicting),
        Err(DatabaseError::SchemaViolation { .. })
    ));

    assert!(matches!(
        store.schema("Cat"),
        Err(DatabaseError::TypeNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_invalid_schemas() {
    assert!(TableSchema::new("", vec![ColumnSchema::new("id", DataType::Integer, 0).primary_key()]).is_err());
    assert!(TableSchema::new("Empty", Vec::new()).is_err());
    assert!(
        TableSchema::new("NoKey", vec![ColumnSchema::new("id", DataType::Integer, 0)]).is_err()
    );
    assert!(
        TableSchema::new(
            "RealKey",
            vec![ColumnSchema::new("id", DataType::Real, 0).primary_key()]
        )
        .is_err()
    );
    assert!(
        TableSchema::new(
            "Gap",
            vec![
                ColumnSchema::new("id", DataType::Integer, 0).primary_key(),
                ColumnSchema::new("name", DataType::Text, 2),
            ]
        )
        .is_err()
    );
    assert!(matches!(
        TableSchema::new(
            "BadDefault",
            vec![
                ColumnSchema::new("id", DataType::Integer, 0).primary_key(),
                ColumnSchema::new("name", DataType::Text, 1).with_default(Value::Integer(1)),
            ]
        ),
        Err(DatabaseError::TypeMismatch { .. })
    ));
}

#[test]
fn test_write_and_get() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_write").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;

    store.write("Dog", dog(1, "Rex", 3), false)?;
    store.write("Dog", dog(2, "Fido", 5), false)?;

    assert_eq!(store.count("Dog")?, 2);
    assert_eq!(store.get("Dog", &PrimaryKey::from(1))?, Some(dog(1, "Rex", 3)));
    assert_eq!(store.get("Dog", &PrimaryKey::from(9))?, None);

    assert!(matches!(
        store.write("Dog", dog(1, "Other", 1), false),
        Err(DatabaseError::UniquenessViolation { .. })
    ));
    assert_eq!(store.get("Dog", &PrimaryKey::from(1))?, Some(dog(1, "Rex", 3)));

    // Upsert replaces the whole record
    store.write("Dog", dog(1, "Rex", 4), true)?;
    assert_eq!(store.count("Dog")?, 2);
    assert_eq!(store.get("Dog", &PrimaryKey::from(1))?, Some(dog(1, "Rex", 4)));
    Ok(())
}

#[test]
fn test_write_validates_against_schema() -> Result<(), DatabaseError> {
    let temp = TempStore::with_prefix("store_validate").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;

    let wrong_type = Record::new(vec![
        Value::Integer(1),
        Value::Integer(5),
        Value::Null,
        Value::Null,
    ]);
    assert!(matches!(
        store.write("Dog", wrong_type, false),
        Err(DatabaseError::TypeMismatch { .. })
    ));

    let missing_name = Record::new(vec![Value::Integer(1), Value::Null]);
    assert!(matches!(
        store.write("Dog", missing_name, false),
        Err(DatabaseError::SchemaViolation { .. })
    ));

    let too_many = Record::new(vec![
        Value::Integer(1),
        Value::from("Rex"),
        Value::Null,
        Value::Null,
        Value::Null,
    ]);
    assert!(matches!(
        store.write("Dog", too_many, false),
        Err(DatabaseError::SchemaViolation { .. })
    ));

    assert!(matches!(
        store.write("Cat", dog(1, "Tom", 2), false),
        Err(DatabaseError::TypeNotFound { .. })
    ));

    // Short records are padded and defaults filled in
    let short = Record::new(vec![Value::Integer(7), Value::from("Lassie")]);
    store.write("Dog", short, false)?;
    assert_eq!(
        store.get("Dog", &PrimaryKey::from(7))?,
        Some(Record::new(vec![
            Value::Integer(7),
            Value::from("Lassie"),
            Value::Null,
            Value::Boolean(true),
        ]))
    );
    assert_eq!(store.count("Dog")?, 1);
    Ok(())
}

#[test]
fn test_update_fields() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_update").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;
    store.write("Dog", dog(1, "Rex", 3), false)?;

    let updated = store.update_fields(
        "Dog",
        &PrimaryKey::from(1),
        &[("age", Value::Integer(4)), ("good", Value::Boolean(false))],
        false,
    )?;
    let expected = Record::new(vec![
        Value::Integer(1),
        Value::from("Rex"),
        Value::Integer(4),
        Value::Boolean(false),
    ]);
    assert_eq!(updated, expected);
    assert_eq!(store.get("Dog", &PrimaryKey::from(1))?, Some(expected));

    assert!(matches!(
        store.update_fields("Dog", &PrimaryKey::from(1), &[("colour", Value::from("red"))], false),
        Err(DatabaseError::SchemaViolation { .. })
    ));
    assert!(matches!(
        store.update_fields("Dog", &PrimaryKey::from(1), &[("age", Value::from("old"))], false),
        Err(DatabaseError::TypeMismatch { .. })
    ));
    assert!(matches!(
        store.update_fields("Dog", &PrimaryKey::from(1), &[("id", Value::Integer(2))], false),
        Err(DatabaseError::SchemaViolation { .. })
    ));
    assert!(matches!(
        store.update_fields("Dog", &PrimaryKey::from(8), &[("age", Value::Integer(1))], false),
        Err(DatabaseError::RecordNotFound { .. })
    ));
    assert_eq!(store.count("Dog")?, 1);
    Ok(())
}

#[test]
fn test_update_fields_upsert_creates_record() -> Result<(), DatabaseError> {
    let temp = TempStore::with_prefix("store_update_upsert").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;

    let created = store.update_fields(
        "Dog",
        &PrimaryKey::from(5),
        &[("name", Value::from("Spot"))],
        true,
    )?;
    assert_eq!(
        created,
        Record::new(vec![
            Value::Integer(5),
            Value::from("Spot"),
            Value::Null,
            Value::Boolean(true),
        ])
    );

    // A required field without a default must be supplied
    assert!(matches!(
        store.update_fields("Dog", &PrimaryKey::from(6), &[("age", Value::Integer(2))], true),
        Err(DatabaseError::SchemaViolation { .. })
    ));
    assert_eq!(store.count("Dog")?, 1);
    Ok(())
}

#[test]
fn test_next_primary_key() -> Result<(), DatabaseError> {
    let temp = TempStore::with_prefix("store_next_key").unwrap();
    let store = temp.open()?;

    assert_eq!(store.next_primary_key("Dog")?, 0);
    store.define_type(dog_schema()?)?;
    assert_eq!(store.next_primary_key("Dog")?, 0);

    for id in [0, 3, 7] {
        store.write("Dog", dog(id, "Rex", 1), false)?;
    }
    assert_eq!(store.next_primary_key("Dog")?, 8);

    store.delete_by_key("Dog", &PrimaryKey::from(7))?;
    assert_eq!(store.next_primary_key("Dog")?, 4);

    store.write("Dog", dog(-20, "Neg", 1), false)?;
    store.delete_all(Some("Dog"))?;
    store.write("Dog", dog(-20, "Neg", 1), false)?;
    assert_eq!(store.next_primary_key("Dog")?, -19);

    store.define_type(tag_schema())?;
    assert!(matches!(
        store.next_primary_key("Tag"),
        Err(DatabaseError::SchemaViolation { .. })
    ));
    Ok(())
}

#[test]
fn test_text_primary_keys() -> Result<(), DatabaseError> {
    let temp = TempStore::with_prefix("store_text_keys").unwrap();
    let store = temp.open()?;
    store.define_type(tag_schema())?;

    for label in ["rust", "go", "zig"] {
        store.write("Tag", Record::new(vec![Value::from(label)]), false)?;
    }
    let labels: Vec<Value> = store
        .fetch("Tag", None)?
        .into_iter()
        .map(|record| record.values[0].clone())
        .collect();
    assert_eq!(labels, vec![Value::from("go"), Value::from("rust"), Value::from("zig")]);
    assert_eq!(
        store.get("Tag", &PrimaryKey::from("go"))?,
        Some(Record::new(vec![Value::from("go"), Value::Integer(0)]))
    );
    Ok(())
}

#[test]
fn test_delete() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_delete").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;
    for id in 0..10 {
        store.write("Dog", dog(id, "Rex", id), false)?;
    }

    assert!(store.delete("Dog", &dog(3, "ignored", 0))?);
    assert!(!store.delete("Dog", &dog(3, "ignored", 0))?);
    assert!(store.delete_by_key("Dog", &PrimaryKey::from(0))?);
    assert!(!store.delete_by_key("Dog", &PrimaryKey::from(42))?);

    assert_eq!(store.count("Dog")?, 8);
    assert_eq!(store.get("Dog", &PrimaryKey::from(3))?, None);
    // Records after the deleted ones are still reachable
    for id in [1, 2, 4, 9] {
        assert_eq!(store.get("Dog", &PrimaryKey::from(id))?, Some(dog(id, "Rex", id)));
    }
    Ok(())
}

#[test]
fn test_delete_all_reuses_pages() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_delete_all").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;
    store.define_type(tag_schema())?;
    for id in 0..20 {
        store.write("Dog", dog(id, "Rex", id), false)?;
    }
    store.write("Tag", Record::new(vec![Value::from("x")]), false)?;

    let size_before = temp.file_size().unwrap();
    assert_eq!(store.delete_all(Some("Dog"))?, 20);
    assert_eq!(temp.file_size().unwrap(), size_before);

    assert_eq!(store.count("Dog")?, 0);
    assert_eq!(store.count("Tag")?, 1);
    assert_eq!(store.schema("Dog")?, dog_schema()?);

    // Writing again fills freed pages first
    for id in 0..20 {
        store.write("Dog", dog(id, "Rex", id), false)?;
    }
    assert_eq!(temp.file_size().unwrap(), size_before);

    assert_eq!(store.delete_all(None)?, 21);
    assert_eq!(store.count("Tag")?, 0);
    assert_eq!(store.type_names()?.len(), 2);

    assert!(matches!(
        store.delete_all(Some("Cat")),
        Err(DatabaseError::TypeNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_reopen_preserves_state() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_reopen").unwrap();
    let version = {
        let store = temp.open()?;
        store.define_type(dog_schema()?)?;
        store.define_type(tag_schema())?;
        for id in 0..300 {
            store.write("Dog", dog(id, &format!("dog-{}", id), id % 15), false)?;
        }
        store.write("Tag", Record::new(vec![Value::from("loyal")]), false)?;
        store.delete_by_key("Dog", &PrimaryKey::from(150))?;
        let version = store.version()?;
        store.close()?;
        version
    };

    let store = temp.open()?;
    assert_eq!(store.version()?, version);
    assert_eq!(store.type_names()?, vec!["Dog".to_string(), "Tag".to_string()]);
    assert_eq!(store.schema("Dog")?, dog_schema()?);
    assert_eq!(store.count("Dog")?, 299);
    assert_eq!(store.get("Dog", &PrimaryKey::from(150))?, None);
    assert_eq!(
        store.get("Dog", &PrimaryKey::from(299))?,
        Some(dog(299, "dog-299", 299 % 15))
    );
    assert_eq!(store.next_primary_key("Dog")?, 300);

    let all = store.fetch("Dog", None)?;
    assert_eq!(all.len(), 299);
    assert!(all.windows(2).all(|pair| pair[0].values[0].sort_cmp(&pair[1].values[0]).is_lt()));

    // Still writable after reopening
    store.write("Dog", dog(300, "late", 1), false)?;
    assert_eq!(store.count("Dog")?, 300);
    Ok(())
}

#[test]
fn test_reopen_without_close() -> Result<(), DatabaseError> {
    let temp = TempStore::with_prefix("store_no_close").unwrap();
    {
        let store = temp.open()?;
        store.define_type(dog_schema()?)?;
        store.write("Dog", dog(1, "Rex", 3), false)?;
    }
    let store = temp.open()?;
    assert_eq!(store.get("Dog", &PrimaryKey::from(1))?, Some(dog(1, "Rex", 3)));
    Ok(())
}

#[test]
fn test_record_too_large() -> Result<(), DatabaseError> {
    let temp = TempStore::with_prefix("store_too_large").unwrap();
    let store = temp.open()?;
    store.define_type(dog_schema()?)?;
    store.write("Dog", dog(1, "Rex", 3), false)?;

    let huge = dog(1, &"x".repeat(5000), 3);
    assert!(matches!(
        store.write("Dog", huge.clone(), true),
        Err(DatabaseError::RecordTooLarge { .. })
    ));
    assert!(matches!(
        store.update_fields("Dog", &PrimaryKey::from(1), &[("name", huge.values[1].clone())], false),
        Err(DatabaseError::RecordTooLarge { .. })
    ));
    assert_eq!(store.get("Dog", &PrimaryKey::from(1))?, Some(dog(1, "Rex", 3)));

    // Large records that still fit get a page each
    store.write("Dog", dog(2, &"y".repeat(3000), 3), false)?;
    store.write("Dog", dog(3, &"z".repeat(3000), 3), false)?;
    assert_eq!(store.count("Dog")?, 3);
    Ok(())
}

#[test]
fn test_storage_full() -> Result<(), DatabaseError> {
    init_logging();
    let temp = TempStore::with_prefix("store_full").unwrap();
    let config = StoreConfig::default()
        .with_sync_on_commit(false)
        .with_max_pages(12);
    let store = temp.open_with(config)?;
    store.define_type(dog_schema()?)?;

    let mut written = 0;
    let error = loop {
        match store.write("Dog", dog(written, &"x".repeat(3000), 1), false) {
            Ok(()) => written += 1,
            Err(e) => break e,
        }
        assert!(written < 100, "max_pages was never enforced");
    };
    assert!(matches!(error, DatabaseError::StorageFull { max_pages: 12 }));
    assert!(written > 0);

    // The failed commit left nothing behind and the store is still usable
    assert_eq!(store.count("Dog")? as i64, written);
    assert!(store.delete_by_key("Dog", &PrimaryKey::from(0))?);
    assert_eq!(store.count("Dog")? as i64, written - 1);
    Ok(())
}
