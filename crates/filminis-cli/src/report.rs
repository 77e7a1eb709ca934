//! Terminal rendering of snapshots, plans and sync reports.

use colored::Colorize;
use filminis_relations::{Diff, EntityId, EntityKind, EntityStore, RelationsSnapshot, SyncReport};
use serde_json::Value;

fn join_ids(ids: impl IntoIterator<Item = EntityId>) -> String {
    let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    if ids.is_empty() {
        "-".dimmed().to_string()
    } else {
        ids.join(", ")
    }
}

pub fn print_snapshot(movie_id: EntityId, snapshot: &RelationsSnapshot) {
    println!("{} {}", "Movie".bold(), movie_id.to_string().bold());
    for (relation, ids) in snapshot.iter() {
        println!("  {:<10} {}", relation.to_string().cyan(), join_ids(ids.iter()));
    }
}

pub fn print_plan(movie_id: EntityId, diffs: &[Diff]) {
    let total: usize = diffs.iter().map(Diff::operation_count).sum();
    println!(
        "{} movie {}: {} write(s) planned",
        "plan".yellow().bold(),
        movie_id,
        total
    );
    for diff in diffs.iter().filter(|d| !d.is_empty()) {
        println!("  {}", diff.relation.to_string().cyan());
        for id in &diff.to_remove {
            println!("    {} {}", "-".red(), id);
        }
        for id in &diff.to_add {
            println!("    {} {}", "+".green(), id);
        }
    }
}

pub fn print_report(report: &SyncReport) {
    for outcome in report.outcomes.iter().filter(|o| !o.is_noop()) {
        let marker = if outcome.is_success() {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {} {:<10} +[{}] -[{}]",
            marker,
            outcome.relation.to_string().cyan(),
            join_ids(outcome.added.iter().copied()),
            join_ids(outcome.removed.iter().copied())
        );
        for failed in &outcome.failed_removes {
            println!("      {} remove {}: {}", "failed".red(), failed.entity_id, failed.error);
        }
        for failed in &outcome.failed_adds {
            println!("      {} add {}: {}", "failed".red(), failed.entity_id, failed.error);
        }
    }

    if report.is_fully_synced() {
        println!(
            "{} movie {} in sync ({} write(s))",
            "ok".green().bold(),
            report.central_id,
            report.total_operations()
        );
    } else {
        let failed: Vec<String> = report.failed_types().iter().map(|t| t.to_string()).collect();
        println!(
            "{} movie {}: {} of {} write(s) failed ({})",
            "partial".yellow().bold(),
            report.central_id,
            report.total_failures(),
            report.total_operations(),
            failed.join(", ")
        );
    }
}

/// One line per row: the id, then the remaining fields.
pub fn print_rows(store: &EntityStore<'_>, kind: EntityKind, rows: &[Value]) {
    println!("{} {} row(s)", kind.to_string().bold(), rows.len());
    let id_field = store.id_field(kind);
    for row in rows {
        let id = store
            .id_of(kind, row)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string());
        let fields: Vec<String> = row
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(k, _)| **k != id_field)
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect()
            })
            .unwrap_or_default();
        println!("  {:>5}  {}", id.bold(), fields.join("  "));
    }
}
