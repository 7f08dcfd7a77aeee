//! Plain-text rendering for terminal output.

use chrono::{DateTime, Utc};

use crate::naming::SnapshotKind;
use crate::reconcile::{SyncReport, VerifyReport};
use crate::service::{CleanupReport, ForgetOutcome, RestoreOutcome};
use crate::store::SnapshotRecord;
use crate::util::format_bytes;

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn kind_label(kind: SnapshotKind) -> &'static str {
    match kind {
        SnapshotKind::Regular => "regular",
        SnapshotKind::PreRestoreSafety => "safety",
    }
}

pub fn render_records(records: &[SnapshotRecord]) -> String {
    if records.is_empty() {
        return String::from("No snapshots found. Run 'snapkeep create' to make one.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<36}  {:<20}  {:>10}  {:<8}  {}\n",
        "ID", "Created", "Size", "Kind", "File"
    ));
    output.push_str(&"-".repeat(110));
    output.push('\n');

    for record in records {
        output.push_str(&format!(
            "{:<36}  {:<20}  {:>10}  {:<8}  {}\n",
            record.id,
            format_time(&record.created_at),
            format_bytes(record.size_bytes),
            kind_label(record.kind),
            record.filename
        ));
    }

    output
}

pub fn render_created(record: &SnapshotRecord) -> String {
    format!(
        "created {} ({})\nid: {}\n",
        record.filename,
        format_bytes(record.size_bytes),
        record.id
    )
}

pub fn render_restore(outcome: &RestoreOutcome) -> String {
    let mut output = format!(
        "restored from {} at {}\n",
        outcome.restored_from,
        format_time(&outcome.restored_at)
    );

    match &outcome.safety_snapshot {
        Some(safety) => output.push_str(&format!("safety snapshot: {} (id {})\n", safety.filename, safety.id)),
        None => output.push_str("safety snapshot: none\n"),
    }

    for warning in &outcome.warnings {
        output.push_str(&format!("warning: {warning}\n"));
    }

    if outcome.requires_reload {
        output.push_str("applications holding the live store open must reconnect\n");
    }

    output
}

pub fn render_cleanup(report: &CleanupReport) -> String {
    let mut output = format!("{}\n", report.message);

    if report.deleted_count > 0 {
        output.push_str(&format!(
            "removed: {} record(s), freed {:.2} MB\n",
            report.deleted_count, report.bytes_freed_mb
        ));
    }

    if !report.already_absent.is_empty() {
        output.push_str("\nfiles already missing (records dropped):\n");
        for filename in &report.already_absent {
            output.push_str(&format!("  {filename}\n"));
        }
    }

    if !report.errors.is_empty() {
        output.push_str("\nerrors encountered:\n");
        for failure in &report.errors {
            output.push_str(&format!("  {}: {}\n", failure.filename, failure.reason));
        }
    }

    output
}

pub fn render_verify(report: &VerifyReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("files on disk:    {}\n", report.file_count));
    output.push_str(&format!("catalog records:  {}\n", report.record_count));

    if !report.orphan_files.is_empty() {
        output.push_str(&format!("\norphan files ({}):\n", report.orphan_files.len()));
        for filename in &report.orphan_files {
            output.push_str(&format!("  {filename}\n"));
        }
    }

    if !report.orphan_records.is_empty() {
        output.push_str(&format!("\norphan records ({}):\n", report.orphan_records.len()));
        for orphan in &report.orphan_records {
            output.push_str(&format!("  {} (id {})\n", orphan.filename, orphan.id));
        }
    }

    output.push_str(&format!(
        "\nregular: {}, safety: {}, total size: {}\n",
        report.regular_count,
        report.safety_count,
        format_bytes(report.total_bytes)
    ));

    if let (Some(oldest), Some(newest)) = (&report.oldest, &report.newest) {
        output.push_str(&format!(
            "oldest: {} ({})\nnewest: {} ({})\n",
            oldest.filename,
            format_time(&oldest.created_at),
            newest.filename,
            format_time(&newest.created_at)
        ));
    }

    if report.is_consistent() {
        output.push_str("\nsnapshot directory and catalog are consistent\n");
    } else {
        if !report.orphan_files.is_empty() {
            output.push_str("\nrun 'snapkeep sync' to register orphan files\n");
        }
        if !report.orphan_records.is_empty() {
            output.push_str("run 'snapkeep forget <id>' to drop orphan records\n");
        }
    }

    output
}

pub fn render_sync(report: &SyncReport) -> String {
    if report.registered.is_empty() && report.failed.is_empty() {
        return String::from("all snapshot files are registered\n");
    }

    let mut output = String::new();
    for filename in &report.registered {
        output.push_str(&format!("registered: {filename}\n"));
    }
    for failure in &report.failed {
        output.push_str(&format!("failed: {}: {}\n", failure.filename, failure.reason));
    }
    output
}

pub fn render_forget(outcome: &ForgetOutcome) -> String {
    if outcome.file_removed {
        format!("forgot {} and deleted its file\n", outcome.filename)
    } else {
        format!("forgot {} (file was already gone)\n", outcome.filename)
    }
}
