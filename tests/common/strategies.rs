use proptest::prelude::*;

/// Strategy for per-branch handler delays in milliseconds
pub fn branch_delays_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..200, 1..16)
}

/// Strategy for admission gate capacities (bounded only)
pub fn gate_capacity_strategy() -> impl Strategy<Value = usize> {
    1usize..8
}

/// Strategy for an expected signal count and how many of them actually arrive
pub fn barrier_signals_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..24).prop_flat_map(|expected| (Just(expected), 0..=expected))
}

/// Strategy for arbitrary derivation inputs, including empty and JSON-shaped text
pub fn derivation_input_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z0-9 _-]{0,32}",
        "[a-z]{1,8}".prop_map(|id| format!(r#"{{"id": "{id}"}}"#)),
        Just(r#"{"id": null}"#.to_string()),
    ]
}
