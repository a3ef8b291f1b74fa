//! Property-based tests for queue ordering and backoff arithmetic

use super::request::Priority;
use super::scheduler::{insertion_index, QueueConfig};
use proptest::prelude::*;
use std::time::Duration;

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Normal),
        Just(Priority::Low),
    ]
}

proptest! {
    /// Any sequence of insertions keeps the queue priority-ordered with
    /// FIFO ordering inside each priority class.
    #[test]
    fn insertion_keeps_priority_order_and_fifo(
        priorities in proptest::collection::vec(arb_priority(), 0..64)
    ) {
        let mut queue: Vec<(Priority, usize)> = Vec::new();
        for (seq, priority) in priorities.into_iter().enumerate() {
            let idx = insertion_index(queue.iter().map(|(p, _)| *p), priority)
                .unwrap_or(queue.len());
            queue.insert(idx, (priority, seq));
        }

        // Ranks never decrease front to back.
        for pair in queue.windows(2) {
            prop_assert!(pair[0].0.rank() <= pair[1].0.rank());
        }
        // Within a priority class, enqueue order is preserved.
        for pair in queue.windows(2) {
            if pair[0].0 == pair[1].0 {
                prop_assert!(pair[0].1 < pair[1].1);
            }
        }
    }

    /// Backoff delays stay within `[2^n * base, 2^n * base + jitter]`.
    #[test]
    fn backoff_delay_within_bounds(
        base in 1u64..500,
        jitter in 0u64..200,
        attempt in 1u32..6
    ) {
        let config = QueueConfig {
            retry_base_delay_ms: base,
            retry_jitter_ms: jitter,
            ..QueueConfig::default()
        };
        let delay = config.backoff_delay(attempt);
        let floor = Duration::from_millis(base * (1 << attempt));
        let ceiling = floor + Duration::from_millis(jitter);
        prop_assert!(delay >= floor);
        prop_assert!(delay <= ceiling);
    }
}
