//! Reporting
//!
//! Turns an assembled run into console lines, CSV and a JSON audit file.
//! Invalid entries never show a score in the console or compact views; the
//! full CSV and the JSON export carry every score so exclusions can be
//! rechecked.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::assembler::RaffleRun;
use crate::entry::{RaffleEntry, Validity};
use crate::error::RaffleResult;
use crate::types::format_timestamp;

pub const CSV_HEADER: &str =
    "sequence,user_id,invalidation_reason,entry_hash,sortable_hash,post_link,post_date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvView {
    /// Every column for every entry
    #[default]
    Full,
    /// Scores of invalid entries blanked
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOptions {
    pub view: CsvView,
    /// Compact view only: keep the entry hash of invalid entries
    pub show_invalid_identity: bool,
}

/// Human-readable invalidation reason, `None` for valid entries
pub fn reason_text(validity: &Validity) -> Option<String> {
    match validity {
        Validity::Valid => None,
        Validity::DuplicateContent => {
            Some("Duplicate of an earlier post by user. Already in raffle".to_string())
        }
        Validity::AlreadyEntered { ordinal } => {
            Some(format!("Post number {ordinal} by user. Already in raffle"))
        }
    }
}

/// One console line per entry
pub fn console_line(entry: &RaffleEntry<'_>) -> String {
    match reason_text(&entry.validity) {
        Some(reason) => format!("User: {:4}, {:>10}: {}", entry.user_id(), "Invalid", reason),
        None => format!(
            "User: {:4}, {:>10}: {}",
            entry.user_id(),
            "SortHash",
            hex::encode(entry.score)
        ),
    }
}

pub fn run_header(run: &RaffleRun<'_>) -> String {
    format!(
        "Chain: {}\nSalt: {}\nRun at: {}\nEntries: {} ({} valid, {} participants)",
        run.meta.chain_id,
        run.meta.salt.to_hex(),
        run.meta.run_at.format("%Y-%m-%d %H:%M:%S UTC"),
        run.entries.len(),
        run.valid_count(),
        run.participant_count()
    )
}

pub fn write_console<W: Write>(run: &RaffleRun<'_>, out: &mut W) -> RaffleResult<()> {
    writeln!(out, "{}", run_header(run))?;
    for entry in &run.entries {
        writeln!(out, "{}", console_line(entry))?;
    }
    Ok(())
}

/// Quote a CSV field when it needs it (RFC 4180)
fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(entry: &RaffleEntry<'_>, options: &ReportOptions) -> String {
    let reason = reason_text(&entry.validity).unwrap_or_default();
    let hide_invalid = options.view == CsvView::Compact && !entry.is_valid();

    let entry_hash = if hide_invalid && !options.show_invalid_identity {
        String::new()
    } else {
        hex::encode(entry.post.entry_hash)
    };
    let score = if hide_invalid {
        String::new()
    } else {
        hex::encode(entry.score)
    };

    [
        entry.sequence().to_string(),
        entry.user_id().to_string(),
        csv_field(&reason),
        entry_hash,
        score,
        csv_field(&entry.post.post_link),
        format_timestamp(entry.post.post_date),
    ]
    .join(",")
}

pub fn write_csv<W: Write>(
    run: &RaffleRun<'_>,
    options: &ReportOptions,
    out: &mut W,
) -> RaffleResult<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for entry in &run.entries {
        writeln!(out, "{}", csv_row(entry, options))?;
    }
    Ok(())
}

pub fn export_csv(run: &RaffleRun<'_>, options: &ReportOptions, path: &Path) -> RaffleResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_csv(run, options, &mut out)?;
    out.flush()?;
    info!("wrote {:?} csv to {}", options.view, path.display());
    Ok(())
}

// ============================================================================
// JSON AUDIT EXPORT
// ============================================================================

#[derive(Debug, Serialize)]
struct AuditExport<'a> {
    chain_id: String,
    salt: String,
    run_at: String,
    duplicate_key: String,
    entries: Vec<AuditEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    sequence: u64,
    user_id: u64,
    valid: bool,
    invalidation_reason: Option<String>,
    entry_hash: String,
    sortable_hash: String,
    message_sha512: String,
    title_sha512: String,
    thread_id: u64,
    node_id: u64,
    post_date: i64,
    entry_date: i64,
    post_link: &'a str,
}

fn audit_export<'a>(run: &'a RaffleRun<'_>) -> AuditExport<'a> {
    AuditExport {
        chain_id: run.meta.chain_id.to_hex(),
        salt: run.meta.salt.to_hex(),
        run_at: run.meta.run_at.to_rfc3339(),
        duplicate_key: run.meta.duplicate_key.to_string(),
        entries: run
            .entries
            .iter()
            .map(|e| AuditEntry {
                sequence: e.sequence(),
                user_id: e.user_id(),
                valid: e.is_valid(),
                invalidation_reason: reason_text(&e.validity),
                entry_hash: hex::encode(e.post.entry_hash),
                sortable_hash: hex::encode(e.score),
                message_sha512: hex::encode(&e.post.message_digest),
                title_sha512: hex::encode(&e.post.title_digest),
                thread_id: e.post.thread_id,
                node_id: e.post.node_id,
                post_date: e.post.post_date,
                entry_date: e.post.entry_date,
                post_link: &e.post.post_link,
            })
            .collect(),
    }
}

pub fn write_json<W: Write>(run: &RaffleRun<'_>, out: &mut W) -> RaffleResult<()> {
    serde_json::to_writer_pretty(&mut *out, &audit_export(run))?;
    writeln!(out)?;
    Ok(())
}

pub fn export_json(run: &RaffleRun<'_>, path: &Path) -> RaffleResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_json(run, &mut out)?;
    out.flush()?;
    info!("wrote audit json to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_text() {
        assert_eq!(reason_text(&Validity::Valid), None);
        assert_eq!(
            reason_text(&Validity::AlreadyEntered { ordinal: 3 }).unwrap(),
            "Post number 3 by user. Already in raffle"
        );
        assert!(reason_text(&Validity::DuplicateContent).unwrap().starts_with("Duplicate"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
