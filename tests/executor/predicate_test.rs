use coffer::{
    ColumnSchema, DataType, DatabaseError, Predicate, PredicateBuilder, Record, TableSchema, Value,
    executor::predicate::like_match,
};

fn create_test_schema() -> TableSchema {
    TableSchema::new(
        "Person",
        vec![
            ColumnSchema::new("id", DataType::Integer, 0).primary_key(),
            ColumnSchema::new("name", DataType::Text, 1),
            ColumnSchema::new("age", DataType::Integer, 2),
            ColumnSchema::new("salary", DataType::Real, 3),
            ColumnSchema::new("active", DataType::Boolean, 4),
        ],
    )
    .unwrap()
}

fn create_test_record(
    id: i64,
    name: Option<&str>,
    age: Option<i64>,
    salary: Option<f64>,
    active: Option<bool>,
) -> Record {
    Record::new(vec![
        Value::Integer(id),
        name.map(Value::from).unwrap_or(Value::Null),
        age.map(Value::Integer).unwrap_or(Value::Null),
        salary.map(Value::Real).unwrap_or(Value::Null),
        active.map(Value::Boolean).unwrap_or(Value::Null),
    ])
}

#[test]
fn test_simple_comparisons() -> Result<(), DatabaseError> {
    let schema = create_test_schema();
    let record = create_test_record(1, Some("Alice"), Some(25), Some(50000.0), Some(true));

    assert!(Predicate::eq("age", Value::Integer(25)).evaluate(&record, &schema)?);
    assert!(!Predicate::eq("age", Value::Integer(30)).evaluate(&record, &schema)?);
    assert!(Predicate::ne("age", Value::Integer(30)).evaluate(&record, &schema)?);
    assert!(Predicate::lt("age", Value::Integer(30)).evaluate(&record, &schema)?);
    assert!(Predicate::le("age", Value::Integer(25)).evaluate(&record, &schema)?);
    assert!(Predicate::gt("salary", 40000.0).evaluate(&record, &schema)?);
    assert!(Predicate::ge("salary", 50000.0).evaluate(&record, &schema)?);
    assert!(Predicate::eq("name", "Alice").evaluate(&record, &schema)?);
    assert!(Predicate::eq("active", true).evaluate(&record, &schema)?);
    Ok(())
}

#[test]
fn test_numeric_comparisons_across_kinds() -> Result<(), DatabaseError> {
    let schema = create_test_schema();
    let record = create_test_record(1, Some("Alice"), Some(25), Some(50000.0), None);

    assert!(Predicate::eq("age", 25.0).evaluate(&record, &schema)?);
    assert!(Predicate::lt("age", 25.5).evaluate(&record, &schema)?);
    assert!(Predicate::eq("salary", Value::Integer(50000)).evaluate(&record, &schema)?);

    // Text never orders against numbers
    assert!(!Predicate::lt("name", Value::Integer(5)).evaluate(&record, &schema)?);
    assert!(!Predicate::gt("name", Value::Integer(5)).evaluate(&record, &schema)?);
    Ok(())
}

#[test]
fn test_null_handling() -> Result<(), DatabaseError> {
    let schema = create_test_schema();
    let record = create_test_record(1, None, None, None, None);

    assert!(Predicate::is_null("name").evaluate(&record, &schema)?);
    assert!(!Predicate::is_not_null("age").evaluate(&record, &schema)?);

    // Comparisons against NULL are false either way
    assert!(!Predicate::eq("age", Value::Integer(25)).evaluate(&record, &schema)?);
    assert!(!Predicate::lt("age", Value::Integer(25)).evaluate(&record, &schema)?);
    assert!(!Predicate::ge("age", Value::Integer(25)).evaluate(&record, &schema)?);
    assert!(!Predicate::eq("age", Value::Null).evaluate(&record, &schema)?);
    assert!(!Predicate::like("name", "%").evaluate(&record, &schema)?);
    Ok(())
}

#[test]
fn test_logical_operators() -> Result<(), DatabaseError> {
    let schema = create_test_schema();
    let record = create_test_record(1, Some("Alice"), Some(25), Some(50000.0), Some(true));

    let both = Predicate::and(Predicate::gt("age", Value::Integer(20)), Predicate::lt("age", Value::Integer(30)));
    assert!(both.evaluate(&record, &schema)?);

    let either = Predicate::or(Predicate::eq("name", "Bob"), Predicate::eq("age", Value::Integer(25)));
    assert!(either.evaluate(&record, &schema)?);

    let neither = Predicate::and(Predicate::eq("name", "Bob"), Predicate::eq("age", Value::Integer(25)));
    assert!(!neither.evaluate(&record, &schema)?);

    assert!(Predicate::not(Predicate::eq("name", "Bob")).evaluate(&record, &schema)?);
    assert!(Predicate::True.evaluate(&record, &schema)?);
    assert!(!Predicate::False.evaluate(&record, &schema)?);
    Ok(())
}

#[test]
fn test_in_list() -> Result<(), DatabaseError> {
    let schema = create_test_schema();
    let record = create_test_record(1, Some("Alice"), Some(25), None, None);

    let names = vec![Value::from("Alice"), Value::from("Bob")];
    assert!(Predicate::in_list("name", names.clone()).evaluate(&record, &schema)?);
    assert!(!Predicate::not_in_list("name", names).evaluate(&record, &schema)?);
    assert!(!Predicate::in_list("age", vec![Value::Integer(1), Value::Integer(2)])
        .evaluate(&record, &schema)?);
    assert!(!Predicate::in_list("salary", vec![Value::Null]).evaluate(&record, &schema)?);
    Ok(())
}

#[test]
fn test_like_patterns() -> Result<(), DatabaseError> {
    assert!(like_match("Rex", "Rex"));
    assert!(like_match("Rex", "R%"));
    assert!(like_match("Rex", "%x"));
    assert!(like_match("Rex", "%e%"));
    assert!(like_match("Rex", "R_x"));
    assert!(like_match("", "%"));
    assert!(like_match("Rover the dog", "R%the%g"));
    assert!(like_match("aaab", "%a%b"));
    assert!(!like_match("Rex", "r%"));
    assert!(!like_match("Rex", "R_"));
    assert!(!like_match("Rex", "%z%"));
    assert!(!like_match("", "_"));

    let schema = create_test_schema();
    let record = create_test_record(1, Some("Alice"), None, None, None);
    assert!(Predicate::like("name", "Al%").evaluate(&record, &schema)?);
    assert!(Predicate::not_like("name", "B%").evaluate(&record, &schema)?);
    // LIKE only applies to text
    assert!(!Predicate::like("id", "1").evaluate(&record, &schema)?);
    Ok(())
}

#[test]
fn test_predicate_builder() -> Result<(), DatabaseError> {
    let schema = create_test_schema();
    let young = create_test_record(1, Some("Alice"), Some(25), Some(50000.0), Some(true));
    let old = create_test_record(2, Some("Bob"), Some(61), Some(70000.0), Some(true));

    let predicate = PredicateBuilder::new()
        .ge("age", Value::Integer(18))
        .le("age", Value::Integer(40))
        .is_not_null("salary")
        .build();
    assert!(predicate.evaluate(&young, &schema)?);
    assert!(!predicate.evaluate(&old, &schema)?);

    let with_or = PredicateBuilder::new()
        .like("name", "A%")
        .or(Predicate::gt("age", Value::Integer(60)))
        .build();
    assert!(with_or.evaluate(&young, &schema)?);
    assert!(with_or.evaluate(&old, &schema)?);

    assert!(PredicateBuilder::new().build().evaluate(&young, &schema)?);
    Ok(())
}

#[test]
fn test_schema_validation() {
    let schema = create_test_schema();

    let valid = Predicate::and(Predicate::eq("name", "Alice"), Predicate::gt("age", Value::Integer(3)));
    assert!(valid.validate_against_schema(&schema).is_ok());
    assert_eq!(
        valid.get_referenced_columns(),
        vec!["age".to_string(), "name".to_string()]
    );

    let invalid = Predicate::or(Predicate::eq("name", "Alice"), Predicate::eq("owner", "Bob"));
    match invalid.validate_against_schema(&schema) {
        Err(DatabaseError::ColumnNotFound { name, type_name }) => {
            assert_eq!(name, "owner");
            assert_eq!(type_name, "Person");
        }
        other => panic!("expected ColumnNotFound, got {:?}", other),
    }

    let record = create_test_record(1, Some("Alice"), None, None, None);
    assert!(matches!(
        Predicate::eq("owner", "Bob").evaluate(&record, &schema),
        Err(DatabaseError::ColumnNotFound { .. })
    ));
}
