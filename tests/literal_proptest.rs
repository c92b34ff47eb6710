//! Property tests for the record literal parser: rendered values parse back
//! unchanged, and arbitrary input never panics the lexer or parser.

use indexmap::IndexMap;
use proptest::prelude::*;
use recsys_prep::{parse_literal, Value};

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // Finite non-zero floats; zero folds its sign and NaN has no literal
        // spelling, so neither belongs in a round-trip corpus.
        prop::num::f64::NORMAL.prop_map(Value::Float),
        "[a-zA-Z0-9 _.!?'\"\\\\-]{0,12}".prop_map(Value::from),
        "\\PC{0,8}".prop_map(Value::from),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec(("[a-z_]{1,8}", inner), 0..6).prop_map(|entries| {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    map.insert(key, value);
                }
                Value::Map(map)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn test_repr_round_trips(value in value_strategy()) {
        let rendered = value.repr();
        let parsed = parse_literal(&rendered);
        prop_assert!(parsed.is_ok(), "failed to parse {rendered:?}: {parsed:?}");
        prop_assert_eq!(parsed.unwrap(), value);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored(value in value_strategy()) {
        let padded = format!("  \t{} \t ", value.repr());
        prop_assert_eq!(parse_literal(&padded).unwrap(), value);
    }

    #[test]
    fn test_parser_never_panics(input in "\\PC{0,40}") {
        let _ = parse_literal(&input);
    }

    #[test]
    fn test_parser_never_panics_on_bracket_soup(input in "[\\[\\]{}(),:'\"0-9a-z \\\\.+-]{0,30}") {
        let _ = parse_literal(&input);
    }

    #[test]
    fn test_parsing_is_deterministic(input in "\\PC{0,30}") {
        let first = parse_literal(&input);
        let second = parse_literal(&input);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "diverging outcomes: {a:?} vs {b:?}"),
        }
    }

    #[test]
    fn test_integers_round_trip_through_text(n in any::<i64>()) {
        prop_assert_eq!(parse_literal(&n.to_string()).unwrap(), Value::Int(n));
    }
}
