//! Property-Based Tests for relation reconciliation
//!
//! Uses proptest against the in-memory backend:
//! 1. Write count equals the size of the symmetric difference
//! 2. A second run with the same desired state writes nothing
//! 3. Per relation type, removals precede additions
//! 4. Failures never stop sibling writes

mod common;

use common::{FakeCatalogApi, Write};
use filminis_relations::*;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

const MOVIE: EntityId = 1;

// ============================================================================
// Strategies
// ============================================================================

/// Small id universe so current and desired overlap often.
fn id_set_strategy() -> impl Strategy<Value = BTreeSet<EntityId>> {
    prop::collection::btree_set(1u64..12, 0..6)
}

fn snapshot_strategy() -> impl Strategy<Value = Vec<BTreeSet<EntityId>>> {
    prop::collection::vec(id_set_strategy(), 6)
}

fn to_snapshot(sets: &[BTreeSet<EntityId>]) -> RelationsSnapshot {
    RelationType::ALL
        .into_iter()
        .zip(sets)
        .fold(RelationsSnapshot::empty(), |snapshot, (t, ids)| {
            snapshot.with(t, ids.iter().copied())
        })
}

fn seeded_api(current: &[BTreeSet<EntityId>]) -> Arc<FakeCatalogApi> {
    let api = RelationType::ALL
        .into_iter()
        .zip(current)
        .fold(FakeCatalogApi::new(), |api, (t, ids)| {
            let ids: Vec<EntityId> = ids.iter().copied().collect();
            api.with_relations(MOVIE, t, &ids)
        });
    Arc::new(api)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn relation_of(write: &Write) -> RelationType {
    match write {
        Write::Add(t, _) | Write::Remove(t, _) => *t,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn diff_is_minimal(current in snapshot_strategy(), desired in snapshot_strategy()) {
        let api = seeded_api(&current);
        let catalog = Catalog::new(api.clone(), RelationSchema::filminis());

        let report = block_on(catalog.sync_relations(MOVIE, &to_snapshot(&desired)));

        let expected: usize = current
            .iter()
            .zip(&desired)
            .map(|(c, d)| c.symmetric_difference(d).count())
            .sum();
        prop_assert_eq!(api.writes().len(), expected);
        prop_assert_eq!(report.total_operations(), expected);

        // Ids on both sides never appear in a write.
        for write in api.writes() {
            let t = relation_of(&write);
            let id = match write {
                Write::Add(_, id) | Write::Remove(_, id) => id,
            };
            let both = current[t.index()].contains(&id) && desired[t.index()].contains(&id);
            prop_assert!(!both, "unchanged association {}:{} was written", t, id);
        }
    }

    #[test]
    fn sync_converges_and_is_idempotent(
        current in snapshot_strategy(),
        desired in snapshot_strategy(),
    ) {
        let api = seeded_api(&current);
        let catalog = Catalog::new(api.clone(), RelationSchema::filminis());
        let desired = to_snapshot(&desired);

        block_on(catalog.sync_relations(MOVIE, &desired));
        for t in RelationType::ALL {
            prop_assert_eq!(api.stored(MOVIE, t), desired.get(t).to_vec());
        }

        api.clear_calls();
        let second = block_on(catalog.sync_relations(MOVIE, &desired));
        prop_assert!(api.writes().is_empty());
        prop_assert_eq!(second.total_operations(), 0);
    }

    #[test]
    fn removals_precede_additions(current in snapshot_strategy(), desired in snapshot_strategy()) {
        let api = seeded_api(&current);
        let catalog = Catalog::new(api.clone(), RelationSchema::filminis());

        block_on(catalog.sync_relations(MOVIE, &to_snapshot(&desired)));

        let writes = api.writes();
        for t in RelationType::ALL {
            let mut seen_add = false;
            for write in writes.iter().filter(|w| relation_of(w) == t) {
                match write {
                    Write::Add(..) => seen_add = true,
                    Write::Remove(..) => {
                        prop_assert!(!seen_add, "{} removal after addition", t);
                    }
                }
            }
        }

        // Types are processed one after another, never interleaved.
        let order: Vec<usize> = writes.iter().map(|w| relation_of(w).index()).collect();
        prop_assert!(order.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn failures_do_not_stop_siblings(
        current in snapshot_strategy(),
        desired in snapshot_strategy(),
        failing_type in 0usize..6,
        failing_id in 1u64..12,
    ) {
        let api = seeded_api(&current);
        let failing = RelationType::ALL[failing_type];
        api.fail_writes(failing, failing_id);
        let catalog = Catalog::new(api.clone(), RelationSchema::filminis());

        let report = block_on(catalog.sync_relations(MOVIE, &to_snapshot(&desired)));

        let expected: usize = current
            .iter()
            .zip(&desired)
            .map(|(c, d)| c.symmetric_difference(d).count())
            .sum();
        prop_assert_eq!(api.writes().len(), expected);
        prop_assert_eq!(report.total_operations(), expected);

        let touched = current[failing_type].symmetric_difference(&desired[failing_type])
            .any(|id| *id == failing_id);
        prop_assert_eq!(report.total_failures(), usize::from(touched));
        prop_assert_eq!(report.is_fully_synced(), !touched);
    }
}
