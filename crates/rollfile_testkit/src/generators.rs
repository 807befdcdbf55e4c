//! Property-based test generators using proptest.
//!
//! Provides strategies for write sequences, rotation points and
//! configuration values.

use proptest::prelude::*;
use rollfile::WriterMode;

/// Strategy for a single write payload (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for a sequence of writes.
pub fn write_sequence_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), 1..64)
}

/// Strategy for a write sequence plus the index the rotation happens before.
pub fn split_sequence_strategy() -> impl Strategy<Value = (Vec<Vec<u8>>, usize)> {
    write_sequence_strategy().prop_flat_map(|writes| {
        let len = writes.len();
        (Just(writes), 0..=len)
    })
}

/// Strategy for any write strategy.
pub fn writer_mode_strategy() -> impl Strategy<Value = WriterMode> {
    prop_oneof![
        Just(WriterMode::None),
        Just(WriterMode::Lock),
        Just(WriterMode::Async),
        Just(WriterMode::Buffer),
    ]
}

/// Strategy for buffer thresholds, from tiny to the default.
pub fn buffer_threshold_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![1usize..64, 64usize..=8192]
}

/// Strategy for a size string with unit, paired with its value in bytes.
pub fn size_string_strategy() -> impl Strategy<Value = (String, u64)> {
    (
        0u64..1_000_000,
        prop_oneof![
            Just(("", 1u64)),
            Just(("b", 1)),
            Just(("KB", 1024)),
            Just(("kb", 1024)),
            Just(("M", 1024 * 1024)),
            Just(("MB", 1024 * 1024)),
            Just(("GB", 1024 * 1024 * 1024)),
        ],
    )
        .prop_map(|(value, (unit, multiplier))| (format!("{value}{unit}"), value * multiplier))
}
