//! # Property-Based Tests
//!
//! Identity map invariants checked with proptest: idempotent load,
//! one instance per identity, index consistency, one-shot removal, and
//! agreement between `Value::loose_eq` and `Key`.

use marshal_core::{EntityType, Key, Row, TypeConfig, Value};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// STRATEGIES
// =============================================================================

fn rows_from(pairs: &[(i64, i64)]) -> Vec<Row> {
    pairs
        .iter()
        .map(|(id, author)| {
            let mut row = Row::new();
            row.insert("id".to_string(), Value::from(*id));
            row.insert("author_id".to_string(), Value::from(*author));
            row
        })
        .collect()
}

fn posts_type() -> EntityType {
    let config = TypeConfig::new("id").with_index_fields(["author_id"]);
    EntityType::new("posts", &config).expect("type")
}

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-20i64..20).prop_map(Value::Int),
        (-20i64..20).prop_map(|i| Value::String(i.to_string())),
        (-20i32..20).prop_map(|i| Value::Float(f64::from(i))),
        prop::sample::select(vec![0.5, -1.25, 2.75]).prop_map(Value::Float),
        // Around 2^53, where neighbouring integers share a float.
        (9_007_199_254_740_988i64..9_007_199_254_740_998).prop_map(Value::Int),
        (9_007_199_254_740_988i64..9_007_199_254_740_998).prop_map(|i| Value::Float(i as f64)),
        (9_007_199_254_740_988i64..9_007_199_254_740_998)
            .prop_map(|i| Value::String(i.to_string())),
        prop::sample::select(vec!["", "a", "0.5", "007", "1e1", " 3 "])
            .prop_map(Value::from),
    ]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Loading the same rows twice leaves count and indexes unchanged.
    #[test]
    fn load_is_idempotent(pairs in vec((0i64..50, 0i64..5), 1..60)) {
        let mut posts = posts_type();
        let first = posts.load(rows_from(&pairs)).expect("load");
        let count = posts.count();
        let index_len = posts.index("author_id").map(|i| i.len());

        let second = posts.load(rows_from(&pairs)).expect("reload");

        prop_assert_eq!(second, 0);
        prop_assert_eq!(first, count);
        prop_assert_eq!(posts.count(), count);
        prop_assert_eq!(posts.index("author_id").map(|i| i.len()), index_len);
    }

    /// At most one entity per identity, and lookups return that instance.
    #[test]
    fn one_instance_per_identity(pairs in vec((0i64..50, 0i64..5), 1..60)) {
        let mut posts = posts_type();
        posts.load(rows_from(&pairs)).expect("load");

        let distinct: BTreeSet<i64> = pairs.iter().map(|(id, _)| *id).collect();
        prop_assert_eq!(posts.count(), distinct.len());

        for id in &distinct {
            let a = posts.get_entity(*id).expect("present");
            let b = posts.get_entity(id.to_string()).expect("present");
            prop_assert!(a.ptr_eq(&b));
        }
    }

    /// Every entity is reachable through the index under its field value.
    #[test]
    fn index_matches_identity_map(pairs in vec((0i64..50, 0i64..5), 1..60)) {
        let mut posts = posts_type();
        posts.load(rows_from(&pairs)).expect("load");

        for id in posts.get_identity_values() {
            let entity = posts.get_entity(id).expect("present");
            let author = entity.value("author_id");
            let bucket = posts.get_collection_by_field("author_id", author);
            prop_assert!(bucket.contains(&entity));
        }

        let indexed: usize = posts
            .index("author_id")
            .expect("index")
            .buckets()
            .map(|(_, ids)| ids.len())
            .sum();
        prop_assert_eq!(indexed, posts.count());
    }

    /// Removal succeeds once and leaves no trace in the index.
    #[test]
    fn removal_is_one_shot(
        pairs in vec((0i64..30, 0i64..5), 1..40),
        victims in vec(0i64..30, 1..20),
    ) {
        let mut posts = posts_type();
        posts.load(rows_from(&pairs)).expect("load");
        let loaded: BTreeSet<i64> = pairs.iter().map(|(id, _)| *id).collect();

        let mut removed = BTreeSet::new();
        for victim in victims {
            let expected = loaded.contains(&victim) && removed.insert(victim);
            prop_assert_eq!(posts.remove_entity(victim), expected);
            prop_assert!(posts.get_entity(victim).is_none());
            let index = posts.index("author_id").expect("index");
            prop_assert!(!index.contains(&Key::Int(victim)));
        }

        prop_assert_eq!(posts.count() + posts.get_removed_entities().len(), loaded.len());
    }

    /// `loose_eq` is symmetric and agrees with key normalization.
    #[test]
    fn key_agrees_with_loose_eq(a in any_value(), b in any_value()) {
        let loose = a.loose_eq(&b);
        prop_assert_eq!(loose, b.loose_eq(&a));
        prop_assert_eq!(loose, Key::from(&a) == Key::from(&b));
    }
}
