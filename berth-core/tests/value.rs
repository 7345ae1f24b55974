#[cfg(test)]
mod tests {
    use berth_core::Value;
    use rust_decimal::Decimal;
    use serde_json::json;
    use time::macros::{date, datetime};

    #[test]
    fn typed_nulls_count_as_null() {
        assert!(Value::Null.is_null());
        assert!(Value::Varchar(None).is_null());
        assert!(Value::List(None).is_null());
        assert!(!Value::Varchar(Some("".into())).is_null());
        assert!(!Value::Boolean(Some(false)).is_null());
    }

    #[test]
    fn json_scalars_map_to_the_closest_type() {
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
        assert_eq!(Value::from_json(&json!(true)), Value::Boolean(Some(true)));
        assert_eq!(Value::from_json(&json!(7)), Value::Int64(Some(7)));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Float64(Some(2.5)));
        assert_eq!(
            Value::from_json(&json!("ana")),
            Value::Varchar(Some("ana".into())),
        );
    }

    #[test]
    fn json_arrays_nest_and_objects_stay_whole() {
        assert_eq!(
            Value::from_json(&json!(["a", 1, [true]])),
            Value::List(Some(vec![
                Value::from("a"),
                Value::from(1_i64),
                Value::List(Some(vec![Value::from(true)])),
            ])),
        );
        assert_eq!(
            Value::from_json(&json!({ "a": 1 })),
            Value::Json(Some(json!({ "a": 1 }))),
        );
    }

    #[test]
    fn integer_views_widen_and_parse() {
        assert_eq!(Value::Int16(Some(3)).as_i64(), Some(3));
        assert_eq!(Value::Int64(Some(-9)).as_i64(), Some(-9));
        assert_eq!(Value::Decimal(Some(Decimal::new(42, 0))).as_i64(), Some(42));
        assert_eq!(Value::from("42").as_i64(), Some(42));
        assert_eq!(Value::from("wat").as_i64(), None);
        assert_eq!(Value::Float64(Some(1.0)).as_i64(), None);
    }

    #[test]
    fn json_projection_serializes_temporals_and_lists() {
        assert_eq!(Value::from(date!(2023 - 07 - 09)).to_json(), json!("2023-07-09"));
        assert_eq!(
            Value::from(datetime!(2023-07-09 08:05:01)).to_json(),
            json!("2023-07-09 08:05:01"),
        );
        assert_eq!(
            Value::List(Some(vec![Value::from("a"), Value::from(1_i64)])).to_json(),
            json!(["a", 1]),
        );
        assert_eq!(Value::Varchar(None).to_json(), json!(null));
        assert_eq!(
            Value::Blob(Some(vec![0x0C_u8, 0x22].into())).to_json(),
            json!("0c22"),
        );
    }
}
