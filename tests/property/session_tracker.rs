use std::collections::HashSet;
use std::sync::Arc;

use appsight::session::{ActivityOutcome, SessionHistory, SessionTracker};
use proptest::prelude::*;

proptest! {
    /// A new session starts exactly when the gap to the previous activity reaches the threshold.
    #[test]
    fn sessions_renew_exactly_on_idle_gaps(
        gaps in prop::collection::vec(0u64..3_000, 1..40),
        threshold in 1u64..2_000,
    ) {
        let tracker = SessionTracker::new(Arc::new(SessionHistory::new(64)), threshold);
        let mut now = 0u64;
        let mut ids = HashSet::new();

        let first = tracker.on_activity(now).unwrap();
        prop_assert!(matches!(first, ActivityOutcome::Started(_)));
        let mut expected_sessions = 1;

        for gap in gaps {
            now += gap;
            let outcome = tracker.on_activity(now).unwrap();
            if gap >= threshold {
                expected_sessions += 1;
                prop_assert!(matches!(outcome, ActivityOutcome::Started(_)));
            } else {
                prop_assert!(matches!(outcome, ActivityOutcome::Continued(_)));
            }
        }

        for record in tracker.history().snapshot() {
            prop_assert!(ids.insert(record.session_id));
        }
        prop_assert_eq!(tracker.history().len(), expected_sessions.min(64));
    }
}
