//! Output renderers and formatting helpers for CLI commands.
//!
//! Each `format_*` function returns the text a `render_*` call prints, so the
//! layouts can be tested without capturing stdout.

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::Serialize;
use serde_json::{Value, json};
use trowel_crud::{ActionOutcome, MessageType, Record, display_id, record_uuid};
use trowel_rest::{OrcidRecord, UploadResponse};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const SUMMARY_FIELDS: [&str; 4] = ["title", "name", "label", "description"];

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn summary(record: &Record) -> &str {
    SUMMARY_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .unwrap_or("-")
}

const fn severity(message_type: MessageType) -> &'static str {
    match message_type {
        MessageType::Success => "success",
        MessageType::Info => "info",
        MessageType::Error => "error",
    }
}

pub(crate) fn format_record(record: &Record, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(record),
        OutputFormat::Table => {
            let width = record.keys().map(String::len).max().unwrap_or_default();
            let lines: Vec<String> = record
                .iter()
                .map(|(key, value)| format!("{key:<width$}  {}", cell(value)))
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

pub(crate) fn format_records(records: &[Record], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(records),
        OutputFormat::Table => {
            let mut lines = vec![format!("{:<36} {:<16} SUMMARY", "UUID", "ID")];
            for record in records {
                lines.push(format!(
                    "{:<36} {:<16} {}",
                    record_uuid(record).unwrap_or("-"),
                    display_id(record).unwrap_or("-"),
                    summary(record)
                ));
            }
            lines.push(format!("{} row(s)", records.len()));
            Ok(lines.join("\n"))
        }
    }
}

pub(crate) fn format_lookups(
    lookups: &BTreeMap<String, Value>,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(lookups),
        OutputFormat::Table => Ok(lookups
            .iter()
            .map(|(name, value)| {
                let rows = value.as_array().map_or(1, Vec::len);
                format!("{name}: {rows} row(s)")
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Outcome of an action together with the record the screen holds afterwards.
pub(crate) fn format_outcome(
    outcome: &ActionOutcome,
    current: Option<&Record>,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "notification": outcome.notification,
            "navigation": outcome.navigation.as_ref().map(|target| json!({
                "target": target,
                "path": target.path(),
            })),
            "record": current,
        })),
        OutputFormat::Table => {
            let notification = &outcome.notification;
            let mut text = format!(
                "[{}] {}: {}",
                severity(notification.message_type),
                notification.action_type,
                notification.message_text
            );
            if let Some(target) = &outcome.navigation {
                text.push_str(&format!("\nnavigate: {}", target.path()));
            }
            if let Some(record) = current {
                text.push_str("\n\n");
                text.push_str(&format_record(record, format)?);
            }
            Ok(text)
        }
    }
}

pub(crate) fn format_upload(response: &UploadResponse, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(response),
        OutputFormat::Table => {
            let mut text = response.summary();
            if let Some(path) = &response.file_path {
                text.push_str(&format!("\npath: {path}"));
            }
            Ok(text)
        }
    }
}

pub(crate) fn format_orcid(
    orcid: &str,
    record: &OrcidRecord,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(record),
        OutputFormat::Table => Ok(format!(
            "orcid: {orcid}\nname: {}\nwebsite: {}",
            record.display_name.as_deref().unwrap_or("-"),
            record.first_website().unwrap_or("-")
        )),
    }
}

pub(crate) fn render(text: &str) {
    println!("{text}");
}
