//! Relation Reconciler: converges a movie's associations to a desired state.
//!
//! The backend has no bulk or transactional endpoint, so reconciliation is a
//! best-effort sequence of single-row writes:
//!
//! ```text
//!   desired ──┐
//!             ├──► Diff per type ──► removals ──► additions ──► SyncReport
//!   current ──┘    (fresh read)       (one at a time, failures recorded)
//! ```
//!
//! Within a type every removal is issued before any addition. A failed write
//! is recorded in the report and processing continues; nothing is rolled back.

use crate::reader::RelationReader;
use crate::relation_type::{EntityId, RelationType};
use crate::snapshot::{Diff, RelationsSnapshot};
use crate::transport::TransportError;
use crate::writer::RelationWriter;
use serde::{Deserialize, Serialize};

// ============================================================================
// Outcomes
// ============================================================================

/// A single write that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedOperation {
    pub entity_id: EntityId,
    pub error: String,
}

/// What happened to one relation type during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationOutcome {
    pub relation: RelationType,
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    pub failed_adds: Vec<FailedOperation>,
    pub failed_removes: Vec<FailedOperation>,
}

impl RelationOutcome {
    pub fn new(relation: RelationType) -> Self {
        Self {
            relation,
            added: Vec::new(),
            removed: Vec::new(),
            failed_adds: Vec::new(),
            failed_removes: Vec::new(),
        }
    }

    /// True when every attempted write succeeded (including "nothing to do").
    pub fn is_success(&self) -> bool {
        self.failed_adds.is_empty() && self.failed_removes.is_empty()
    }

    /// True when no write was attempted for this type.
    pub fn is_noop(&self) -> bool {
        self.operation_count() == 0
    }

    /// Writes attempted, successful or not.
    pub fn operation_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.failure_count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_adds.len() + self.failed_removes.len()
    }

    /// The writes that still have to happen for this type.
    pub fn pending(&self) -> Diff {
        Diff {
            relation: self.relation,
            to_remove: self.failed_removes.iter().map(|f| f.entity_id).collect(),
            to_add: self.failed_adds.iter().map(|f| f.entity_id).collect(),
        }
    }

    fn record_remove(&mut self, entity_id: EntityId, result: Result<(), TransportError>) {
        match result {
            Ok(()) => self.removed.push(entity_id),
            Err(e) => self.failed_removes.push(failure(self.relation, entity_id, "remove", e)),
        }
    }

    fn record_add(&mut self, entity_id: EntityId, result: Result<(), TransportError>) {
        match result {
            Ok(()) => self.added.push(entity_id),
            Err(e) => self.failed_adds.push(failure(self.relation, entity_id, "add", e)),
        }
    }
}

fn failure(
    relation: RelationType,
    entity_id: EntityId,
    op: &str,
    error: TransportError,
) -> FailedOperation {
    tracing::warn!(%relation, entity_id, op, error = %error, "relation write failed");
    FailedOperation {
        entity_id,
        error: error.to_string(),
    }
}

/// Result of one reconciliation run: one outcome per relation type, in
/// [`RelationType::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub central_id: EntityId,
    pub outcomes: Vec<RelationOutcome>,
}

impl SyncReport {
    pub fn outcome(&self, relation: RelationType) -> Option<&RelationOutcome> {
        self.outcomes.iter().find(|o| o.relation == relation)
    }

    pub fn is_fully_synced(&self) -> bool {
        self.outcomes.iter().all(RelationOutcome::is_success)
    }

    pub fn failed_types(&self) -> Vec<RelationType> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.relation)
            .collect()
    }

    pub fn total_operations(&self) -> usize {
        self.outcomes.iter().map(RelationOutcome::operation_count).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.outcomes.iter().map(RelationOutcome::failure_count).sum()
    }

    /// The failed writes of this report, as diffs ready to be re-applied.
    pub fn pending(&self) -> Vec<Diff> {
        self.outcomes.iter().map(RelationOutcome::pending).collect()
    }
}

// ============================================================================
// Reconciler
// ============================================================================

pub struct RelationReconciler<'a> {
    reader: RelationReader<'a>,
    writer: RelationWriter<'a>,
}

impl<'a> RelationReconciler<'a> {
    pub fn new(reader: RelationReader<'a>, writer: RelationWriter<'a>) -> Self {
        Self { reader, writer }
    }

    /// Reads the current associations and computes the per-type diffs without
    /// writing anything.
    pub async fn plan(&self, central_id: EntityId, desired: &RelationsSnapshot) -> Vec<Diff> {
        let current = self.reader.get_relations(central_id).await;
        Diff::all(&current, desired)
    }

    /// Converges the associations of `central_id` to `desired`.
    ///
    /// A type missing or empty in `desired` has all its associations removed.
    /// Individual write failures end up in the report; this never fails.
    pub async fn sync_relations(
        &self,
        central_id: EntityId,
        desired: &RelationsSnapshot,
    ) -> SyncReport {
        let diffs = self.plan(central_id, desired).await;
        let planned: usize = diffs.iter().map(Diff::operation_count).sum();
        tracing::info!(central_id, planned, "reconciling relations");

        let report = self.apply(central_id, diffs).await;
        log_report(&report);
        report
    }

    /// Re-issues only the failed writes of `previous`, without re-reading.
    pub async fn retry_failed(&self, previous: &SyncReport) -> SyncReport {
        let central_id = previous.central_id;
        tracing::info!(
            central_id,
            failures = previous.total_failures(),
            "retrying failed relation writes"
        );
        let report = self.apply(central_id, previous.pending()).await;
        log_report(&report);
        report
    }

    /// Applies diffs strictly in order: per type, removals then additions.
    pub async fn apply(&self, central_id: EntityId, diffs: Vec<Diff>) -> SyncReport {
        let mut outcomes = Vec::with_capacity(diffs.len());

        for diff in diffs {
            let mut outcome = RelationOutcome::new(diff.relation);

            for entity_id in diff.to_remove {
                let result = self
                    .writer
                    .remove_relation(central_id, diff.relation, entity_id)
                    .await;
                outcome.record_remove(entity_id, result);
            }
            for entity_id in diff.to_add {
                let result = self
                    .writer
                    .add_relation(central_id, diff.relation, entity_id)
                    .await;
                outcome.record_add(entity_id, result);
            }

            outcomes.push(outcome);
        }

        SyncReport {
            central_id,
            outcomes,
        }
    }
}

fn log_report(report: &SyncReport) {
    if report.is_fully_synced() {
        tracing::info!(
            central_id = report.central_id,
            operations = report.total_operations(),
            "relations in sync"
        );
    } else {
        tracing::warn!(
            central_id = report.central_id,
            operations = report.total_operations(),
            failures = report.total_failures(),
            failed_types = ?report.failed_types(),
            "relations partially synced"
        );
    }
}
