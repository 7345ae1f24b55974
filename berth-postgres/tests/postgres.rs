use berth_core::{
    ColumnDescriptor, ColumnType, Condition, Criteria, Order, Record, SqlBuffer, SqlWriter,
    TableDescriptor, TableSchema, Value, WhereClause,
};
use berth_postgres::{PostgresConnection, PostgresSqlWriter};
use log::LevelFilter;
use std::env;

fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

fn foo_bar() -> TableSchema {
    TableSchema::new(
        TableDescriptor::new("foo_bar")
            .column(ColumnDescriptor::new("id", ColumnType::Text).primary_key())
            .column(ColumnDescriptor::new("name", ColumnType::Text))
            .column(ColumnDescriptor::new("payload", ColumnType::Json))
            .column(ColumnDescriptor::new("tags", ColumnType::Array))
            .column(ColumnDescriptor::new("age", ColumnType::Integer)),
    )
}

#[test]
fn find_selects_every_column_and_numbers_from_one() {
    let schema = foo_bar();
    let criteria = Criteria::new().filter(
        WhereClause::new().compare("id", Condition::Equals(Value::from("abc"))),
    );
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}
        .write_find(&mut out, &schema, &criteria)
        .unwrap();
    let query = out.into_query();
    assert_eq!(
        query.sql,
        "SELECT \"foo_bar\".\"id\", \"foo_bar\".\"name\", \"foo_bar\".\"payload\", \
         \"foo_bar\".\"tags\", \"foo_bar\".\"age\" FROM \"foo_bar\" AS \"foo_bar\" \
         WHERE \"foo_bar\".\"id\" = $1",
    );
    // The primary key comparison does not fold case even on a text column
    assert_eq!(query.values, vec![Value::from("abc")]);
}

#[test]
fn placeholders_number_across_set_and_where() {
    let schema = foo_bar();
    let criteria = Criteria::new().filter(
        WhereClause::new().compare("name", Condition::Equals(Value::from("Old"))),
    );
    let changes = Record::new().set("name", "New").set("age", 31_i64);
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}
        .write_update(&mut out, &schema, &criteria, &changes)
        .unwrap();
    let query = out.into_query();
    assert_eq!(
        query.sql,
        "UPDATE \"foo_bar\" SET \"name\" = $1, \"age\" = $2 \
         WHERE LOWER(\"name\") = $3 RETURNING *",
    );
    assert_eq!(
        query.values,
        vec![Value::from("New"), Value::from(31_i64), Value::from("old")],
    );
}

#[test]
fn json_bound_strings_are_cast() {
    let schema = foo_bar();
    let record = Record::new()
        .set("id", "a1")
        .set("payload", r#"{"likes":12}"#);
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}.write_insert(&mut out, &schema, &record);
    let query = out.into_query();
    assert_eq!(
        query.sql,
        "INSERT INTO \"foo_bar\" (\"id\", \"payload\") \
         VALUES ($1, CAST($2 AS json)) RETURNING *",
    );
    assert_eq!(query.values.len(), 2);
}

#[test]
fn folded_patterns_use_ilike() {
    let schema = foo_bar();
    let criteria = Criteria::new().filter(
        WhereClause::new().compare("name", Condition::Contains("Ga".into())),
    );
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}
        .write_find(&mut out, &schema, &criteria)
        .unwrap();
    let query = out.into_query();
    assert!(query.sql.ends_with("WHERE \"foo_bar\".\"name\" ILIKE $1"));
    // ILIKE folds natively, the pattern keeps its case
    assert_eq!(query.values, vec![Value::from("%Ga%")]);
}

#[test]
fn sensitive_patterns_keep_like() {
    let schema = foo_bar();
    let criteria = Criteria::new()
        .filter(WhereClause::new().compare("name", Condition::StartsWith("Ga".into())))
        .case_sensitive(true);
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}
        .write_find(&mut out, &schema, &criteria)
        .unwrap();
    let query = out.into_query();
    assert!(query.sql.ends_with("WHERE \"foo_bar\".\"name\" LIKE $1"));
    assert_eq!(query.values, vec![Value::from("Ga%")]);
}

#[test]
fn negated_membership_extracts_nulls() {
    let schema = foo_bar();
    let criteria = Criteria::new().filter(WhereClause::new().compare(
        "name",
        Condition::NotIn(vec![Value::Null, Value::from("")]),
    ));
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}
        .write_find(&mut out, &schema, &criteria)
        .unwrap();
    let query = out.into_query();
    assert!(query.sql.ends_with(
        "WHERE \"foo_bar\".\"name\" IS NOT NULL \
         AND LOWER(\"foo_bar\".\"name\") NOT IN ($1)",
    ));
    // Only the non-null entry binds
    assert_eq!(query.values, vec![Value::from("")]);
}

#[test]
fn count_aliases_the_aggregate() {
    let schema = foo_bar();
    let criteria = Criteria::new()
        .filter(WhereClause::new().compare("age", Condition::GreaterThan(Value::from(18_i64))))
        .sort("name", Order::ASC)
        .limit(5);
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}
        .write_count(&mut out, &schema, &criteria)
        .unwrap();
    let query = out.into_query();
    // Ordering and pagination do not apply to the aggregate
    assert_eq!(
        query.sql,
        "SELECT COUNT(*) AS \"count\" FROM \"foo_bar\" AS \"foo_bar\" \
         WHERE \"foo_bar\".\"age\" > $1",
    );
    assert_eq!(query.values, vec![Value::from(18_i64)]);
}

#[test]
fn empty_record_inserts_defaults() {
    let schema = foo_bar();
    let mut out = SqlBuffer::new();
    PostgresSqlWriter {}.write_insert(&mut out, &schema, &Record::new());
    assert_eq!(
        out.into_query().sql,
        "INSERT INTO \"foo_bar\" DEFAULT VALUES RETURNING *",
    );
}

#[tokio::test]
async fn connect_refuses_foreign_schemes() {
    use berth_core::Connection;
    init_logs();
    let error = PostgresConnection::connect("mysql://localhost/app".into())
        .await
        .unwrap_err();
    assert!(format!("{error:#}").contains("must start with `postgres://`"));
}
