//! Debug assertion macros for the sequencing protocol.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay
//! nothing for them.

// =============================================================================
// Publication order
// =============================================================================

/// Assert that a writer publishes immediately after its predecessor.
///
/// **Invariant**: `cursor == sequence - 1` at the moment `cursor` is set to `sequence`
///
/// Used in: `AtomicRingBuffer::add()` after the publication spin
macro_rules! debug_assert_publish_order {
    ($cursor:expr, $seq:expr) => {
        debug_assert!(
            $cursor == $seq - 1,
            "publication out of order: cursor {} while publishing sequence {}",
            $cursor,
            $seq
        )
    };
}

// =============================================================================
// Monotonic progress
// =============================================================================

/// Assert that a sequence only moves forward, one step at a time.
///
/// **Invariant**: `new == old + 1`
///
/// Used in: `AtomicRingBuffer::add()` for the cursor, `Reader::read()` for position
macro_rules! debug_assert_single_step {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new == $old + 1,
            "{} did not advance by exactly one: {} -> {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// No wrap-around
// =============================================================================

/// Assert that a reserved sequence has not overflowed `i64`.
///
/// At one item per nanosecond, overflow takes ~292 years. This catches
/// arithmetic bugs, not real overflow.
///
/// Used in: `AtomicRingBuffer::add()` after reservation
macro_rules! debug_assert_no_wrap {
    ($seq:expr) => {
        debug_assert!(
            $seq >= 0 && $seq < i64::MAX,
            "sequence space exhausted: reserved {}",
            $seq
        )
    };
}

// =============================================================================
// Readers never run ahead of publication
// =============================================================================

/// Assert that a consumer only reads published sequences.
///
/// **Invariant**: `want <= cursor`
///
/// Used in: `Reader::read()` before fetching the slot
macro_rules! debug_assert_published {
    ($want:expr, $cursor:expr) => {
        debug_assert!(
            $want <= $cursor,
            "reading sequence {} beyond published cursor {}",
            $want,
            $cursor
        )
    };
}

pub(crate) use debug_assert_no_wrap;
pub(crate) use debug_assert_publish_order;
pub(crate) use debug_assert_published;
pub(crate) use debug_assert_single_step;
