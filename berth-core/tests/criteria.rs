#[cfg(test)]
mod tests {
    use berth_core::{
        AdapterError, Condition, Criteria, Order, Result, Value, WhereClause, WhereTerm,
    };
    use indoc::indoc;

    fn parse(input: &str) -> Result<Criteria> {
        Criteria::from_json(&serde_json::from_str(input)?)
    }

    fn invalid(input: &str) -> String {
        let error = parse(input).unwrap_err();
        match AdapterError::of(&error) {
            Some(AdapterError::InvalidCriteria(message)) => message.clone(),
            other => panic!("expected invalid criteria, got {:?}", other),
        }
    }

    #[test]
    fn null_selects_everything() {
        let criteria = parse("null").unwrap();
        assert_eq!(criteria, Criteria::new());
    }

    #[test]
    fn bare_object_is_taken_as_the_filter() {
        let criteria = parse(indoc! {r#"
            {
                "name": "finn",
                "age": { ">": 21, "<=": 65 },
                "role": ["admin", "editor"]
            }
        "#})
        .unwrap();
        // serde_json maps iterate in key order, `<=` sorts before `>`
        assert_eq!(
            criteria.where_clause,
            Some(
                WhereClause::new()
                    .compare("age", Condition::LessThanOrEqual(Value::from(65_i64)))
                    .compare("age", Condition::GreaterThan(Value::from(21_i64)))
                    .compare("name", Condition::Equals(Value::from("finn")))
                    .compare(
                        "role",
                        Condition::In(vec![Value::from("admin"), Value::from("editor")]),
                    ),
            ),
        );
        assert_eq!(criteria.limit, None);
        assert_eq!(criteria.select, None);
    }

    #[test]
    fn modifier_keys_split_the_object() {
        let criteria = parse(indoc! {r#"
            {
                "where": { "done": false },
                "select": ["id", "title"],
                "limit": 10,
                "skip": 20,
                "sort": { "createdAt": -1, "id": "ASC" },
                "caseSensitive": true
            }
        "#})
        .unwrap();
        assert_eq!(
            criteria.where_clause,
            Some(WhereClause::new().compare("done", Condition::Equals(Value::from(false)))),
        );
        assert_eq!(
            criteria.select,
            Some(vec!["id".to_string(), "title".to_string()]),
        );
        assert_eq!(criteria.limit, Some(10));
        assert_eq!(criteria.offset, Some(20));
        assert_eq!(criteria.sort.len(), 2);
        assert_eq!(criteria.sort[0].attribute, "createdAt");
        assert_eq!(criteria.sort[0].order, Order::DESC);
        assert_eq!(criteria.sort[1].order, Order::ASC);
        assert!(criteria.case_sensitive);
    }

    #[test]
    fn empty_where_matches_everything() {
        let criteria = parse(r#"{ "where": {}, "limit": 1 }"#).unwrap();
        assert_eq!(criteria.where_clause, None);
        let criteria = parse(r#"{ "where": null, "limit": 1 }"#).unwrap();
        assert_eq!(criteria.where_clause, None);
    }

    #[test]
    fn empty_combinator_arrays_parse_as_vacuous_terms() {
        let criteria = parse(r#"{ "where": { "id": 7, "or": [] } }"#).unwrap();
        let clause = criteria.where_clause.as_ref().unwrap();
        assert_eq!(clause.terms.len(), 2);
        assert!(matches!(&clause.terms[1], WhereTerm::Or(branches) if branches.is_empty()));
        assert!(clause.terms[1].is_empty());
        assert!(criteria.filter_clause().is_some());

        // Nested combinators with nothing inside leave no filter at all
        let criteria = parse(r#"{ "where": { "or": [{ "and": [] }] } }"#).unwrap();
        assert!(criteria.where_clause.as_ref().unwrap().is_empty());
        assert!(criteria.filter_clause().is_none());
    }

    #[test]
    fn negation_follows_the_argument_shape() {
        let criteria = parse(r#"{ "name": { "!": ["ana", null] } }"#).unwrap();
        assert_eq!(
            criteria.where_clause,
            Some(WhereClause::new().compare(
                "name",
                Condition::NotIn(vec![Value::from("ana"), Value::Null]),
            )),
        );
        let criteria = parse(r#"{ "name": { "not": "ana" } }"#).unwrap();
        assert_eq!(
            criteria.where_clause,
            Some(WhereClause::new().compare("name", Condition::NotEquals(Value::from("ana")))),
        );
    }

    #[test]
    fn pattern_operators_require_strings() {
        let criteria = parse(r#"{ "name": { "contains": "an" } }"#).unwrap();
        assert_eq!(
            criteria.where_clause,
            Some(WhereClause::new().compare("name", Condition::Contains("an".into()))),
        );
        let message = invalid(r#"{ "name": { "startsWith": 5 } }"#);
        assert!(message.contains("startsWith"));
    }

    #[test]
    fn combinators_nest() {
        let criteria = parse(indoc! {r#"
            {
                "or": [
                    { "name": "ana" },
                    { "and": [ { "age": { ">": 30 } }, { "done": true } ] }
                ]
            }
        "#})
        .unwrap();
        let clause = criteria.where_clause.unwrap();
        assert_eq!(clause.terms.len(), 1);
        let WhereTerm::Or(branches) = &clause.terms[0] else {
            panic!("expected an or combinator");
        };
        assert_eq!(branches.len(), 2);
        assert!(matches!(&branches[1].terms[0], WhereTerm::And(inner) if inner.len() == 2));
    }

    #[test]
    fn object_without_operators_is_a_hydrated_record() {
        let criteria = parse(r#"{ "owner": { "id": 7, "name": "ana" } }"#).unwrap();
        assert_eq!(
            criteria.where_clause,
            Some(WhereClause::new().compare(
                "owner",
                Condition::Reference(vec![
                    ("id".into(), Value::from(7_i64)),
                    ("name".into(), Value::from("ana")),
                ]),
            )),
        );
    }

    #[test]
    fn mixing_operators_with_attributes_is_refused() {
        let message = invalid(r#"{ "owner": { "id": 7, ">": 3 } }"#);
        assert!(message.contains("owner"));
    }

    #[test]
    fn stray_keys_next_to_modifiers_are_refused() {
        let message = invalid(r#"{ "limit": 5, "name": "ana" }"#);
        assert!(message.contains("name"));
        assert!(message.contains("where"));
    }

    #[test]
    fn pagination_accepts_integral_numbers_only() {
        assert_eq!(parse(r#"{ "limit": 5.0 }"#).unwrap().limit, Some(5));
        let message = invalid(r#"{ "limit": 2.5 }"#);
        assert!(message.contains("limit"));
        let message = invalid(r#"{ "skip": -1 }"#);
        assert!(message.contains("skip"));
    }

    #[test]
    fn sort_directions_parse_both_spellings() {
        let criteria = parse(r#"{ "sort": { "a": 1, "b": "desc" } }"#).unwrap();
        assert_eq!(criteria.sort[0].order, Order::ASC);
        assert_eq!(criteria.sort[1].order, Order::DESC);
        let message = invalid(r#"{ "sort": { "a": "sideways" } }"#);
        assert!(message.contains("sideways"));
    }
}
