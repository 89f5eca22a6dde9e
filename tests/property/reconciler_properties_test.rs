//! Property-based tests for the `Reconciler`.
//!
//! For arbitrary interleavings of snapshots and feed events these verify
//! idempotence under duplicate delivery, the live-takeover guard, owner
//! filtering and the newest-first ordering invariant.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use smartmarks::managers::reconciler::Reconciler;
use smartmarks::types::bookmark::Bookmark;

const USER: &str = "user-1";

#[derive(Debug, Clone)]
enum Op {
    Seed(Vec<(u8, i64)>),
    Insert(u8, i64),
    Delete(u8),
}

fn make(id: u8, minutes: i64, owner: &str) -> Bookmark {
    Bookmark {
        id: format!("b{}", id),
        url: format!("https://site{}.com", id),
        title: format!("Site {}", id),
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
        user_id: owner.to_string(),
    }
}

/// Small id and time ranges so that duplicates and timestamp ties are common.
fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => proptest::collection::vec((0u8..8, 0i64..4), 0..6).prop_map(Op::Seed),
        4 => (0u8..8, 0i64..4).prop_map(|(id, m)| Op::Insert(id, m)),
        3 => (0u8..8).prop_map(Op::Delete),
    ]
}

fn apply(r: &mut Reconciler, op: &Op) {
    match op {
        Op::Seed(rows) => {
            r.seed(rows.iter().map(|(id, m)| make(*id, *m, USER)).collect());
        }
        Op::Insert(id, m) => {
            r.apply_insert(make(*id, *m, USER));
        }
        Op::Delete(id) => {
            r.apply_delete(&format!("b{}", id));
        }
    }
}

fn run(ops: &[Op]) -> Reconciler {
    let mut r = Reconciler::new(USER);
    for op in ops {
        apply(&mut r, op);
    }
    r
}

fn assert_invariants(r: &Reconciler) -> Result<(), TestCaseError> {
    let rows = r.bookmarks();
    for pair in rows.windows(2) {
        prop_assert!(
            pair[0].created_at >= pair[1].created_at,
            "list must be newest first: {:?}",
            rows.iter().map(|b| (&b.id, b.created_at)).collect::<Vec<_>>()
        );
    }
    let unique: HashSet<&str> = rows.iter().map(|b| b.id.as_str()).collect();
    prop_assert_eq!(unique.len(), rows.len(), "ids must be unique");
    prop_assert!(rows.iter().all(|b| b.user_id == USER));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Delivering every feed event twice ends in the same state as delivering it once.
    #[test]
    fn duplicate_delivery_is_idempotent(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let once = run(&ops);

        let mut twice = Reconciler::new(USER);
        for op in &ops {
            apply(&mut twice, op);
            if !matches!(op, Op::Seed(_)) {
                apply(&mut twice, op);
            }
        }

        prop_assert_eq!(once.bookmarks(), twice.bookmarks());
        prop_assert_eq!(once.is_live(), twice.is_live());
    }

    #[test]
    fn invariants_hold_after_any_sequence(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut r = Reconciler::new(USER);
        for op in &ops {
            apply(&mut r, op);
            assert_invariants(&r)?;
        }
    }

    #[test]
    fn seed_is_noop_once_live(
        ops in proptest::collection::vec(arb_op(), 0..20),
        first_event in (0u8..8, 0i64..4),
        snapshot in proptest::collection::vec((0u8..8, 0i64..4), 0..8),
    ) {
        let mut r = run(&ops);
        r.apply_insert(make(first_event.0, first_event.1, USER));
        prop_assert!(r.is_live());

        let before = r.bookmarks().to_vec();
        prop_assert!(!r.seed(snapshot.iter().map(|(id, m)| make(*id, *m, USER)).collect()));
        prop_assert_eq!(r.bookmarks(), before.as_slice());
    }

    #[test]
    fn foreign_inserts_never_change_state(
        ops in proptest::collection::vec(arb_op(), 0..20),
        foreign in (0u8..8, 0i64..4),
    ) {
        let mut r = run(&ops);
        let before = r.bookmarks().to_vec();
        let was_live = r.is_live();

        prop_assert!(!r.apply_insert(make(foreign.0, foreign.1, "intruder")));
        prop_assert_eq!(r.bookmarks(), before.as_slice());
        prop_assert_eq!(r.is_live(), was_live);
    }
}
