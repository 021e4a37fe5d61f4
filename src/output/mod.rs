//! Output formatters for analysis results.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::config::OutputFormat;
use crate::core::Result;
use crate::report::{format_path, format_signature, Finding, FindingKind, Report, Severity};

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    Markdown,
    #[default]
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

impl Format {
    pub fn format_value<W: Write>(&self, value: &Value, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => format_json(value, writer),
            Format::Markdown => format_value_as_markdown(value, writer, 0),
            Format::Text => format_value_as_text(value, writer, 0),
        }
    }

    pub fn format<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.format_value(&value, writer)
    }

    /// Render an analysis report. `color` only affects text output.
    pub fn write_report<W: Write>(&self, report: &Report, writer: &mut W, color: bool) -> Result<()> {
        match self {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, report)?;
                writeln!(writer)?;
                Ok(())
            }
            Format::Markdown => report_markdown(report, writer),
            Format::Text => report_text(report, writer, color),
        }
    }
}

fn format_json<W: Write>(value: &Value, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn format_value_as_markdown<W: Write>(value: &Value, writer: &mut W, depth: usize) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let header_level = "#".repeat((depth + 1).min(6));
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{} {}\n", header_level, format_key(key))?;
                        format_value_as_markdown(val, writer, depth + 1)?;
                    }
                    _ => {
                        writeln!(writer, "**{}**: {}\n", format_key(key), format_scalar(val))?;
                    }
                }
            }
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                writeln!(writer, "_No items_\n")?;
            } else if is_table_compatible(arr) {
                format_as_table(arr, writer)?;
            } else {
                for item in arr {
                    writeln!(writer, "---\n")?;
                    format_value_as_markdown(item, writer, depth)?;
                }
            }
        }
        _ => {
            writeln!(writer, "{}\n", format_scalar(value))?;
        }
    }
    Ok(())
}

fn format_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "Yes" } else { "No" }.to_string(),
        Value::Null => "-".to_string(),
        _ => value.to_string(),
    }
}

fn is_table_compatible(arr: &[Value]) -> bool {
    if arr.is_empty() {
        return false;
    }
    arr.iter().all(|v| {
        if let Value::Object(map) = v {
            map.values()
                .all(|v| !matches!(v, Value::Object(_) | Value::Array(_)))
        } else {
            false
        }
    })
}

fn format_as_table<W: Write>(arr: &[Value], writer: &mut W) -> Result<()> {
    let headers: Vec<&str> = match arr.first() {
        Some(Value::Object(map)) => map.keys().map(|s| s.as_str()).collect(),
        _ => return Ok(()),
    };

    let header_cells: Vec<String> = headers.iter().map(|h| format_key(h)).collect();
    write_table_row(writer, &header_cells)?;
    write_table_separator(writer, headers.len())?;

    for item in arr {
        if let Value::Object(map) = item {
            let cells: Vec<String> = headers
                .iter()
                .map(|h| format_scalar(map.get(*h).unwrap_or(&Value::Null)))
                .collect();
            write_table_row(writer, &cells)?;
        }
    }

    writeln!(writer)?;
    Ok(())
}

fn write_table_row<W: Write>(writer: &mut W, cells: &[String]) -> Result<()> {
    write!(writer, "|")?;
    for cell in cells {
        write!(writer, " {} |", cell.replace('|', "\\|"))?;
    }
    writeln!(writer)?;
    Ok(())
}

fn write_table_separator<W: Write>(writer: &mut W, columns: usize) -> Result<()> {
    write!(writer, "|")?;
    for _ in 0..columns {
        write!(writer, " --- |")?;
    }
    writeln!(writer)?;
    Ok(())
}

fn format_value_as_text<W: Write>(value: &Value, writer: &mut W, indent: usize) -> Result<()> {
    let prefix = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{}{}:", prefix, format_key(key))?;
                        format_value_as_text(val, writer, indent + 1)?;
                    }
                    _ => {
                        writeln!(
                            writer,
                            "{}{}: {}",
                            prefix,
                            format_key(key),
                            format_scalar(val)
                        )?;
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                writeln!(writer, "{}[{}]", prefix, i)?;
                format_value_as_text(item, writer, indent + 1)?;
            }
        }
        _ => {
            writeln!(writer, "{}{}", prefix, format_scalar(value))?;
        }
    }
    Ok(())
}

/// Path rendering for a finding; loops are shown closed.
fn finding_path(finding: &Finding) -> String {
    let closed = matches!(
        finding.kind,
        FindingKind::Loop | FindingKind::SelfLoop | FindingKind::CrossInstanceLoop
    );
    match finding.kind {
        FindingKind::Loop
        | FindingKind::SelfLoop
        | FindingKind::CrossInstanceLoop
        | FindingKind::RemoteToVirtual
        | FindingKind::LongChain
        | FindingKind::RemoteChain => format_path(&finding.repositories, closed),
        _ => finding
            .repositories
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn severity_label(severity: Severity, color: bool) -> String {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    if !color {
        return label;
    }
    match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::High => label.red().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.cyan().to_string(),
    }
}

fn report_text<W: Write>(report: &Report, writer: &mut W, color: bool) -> Result<()> {
    let title = "Repository topology report";
    if color {
        writeln!(writer, "{}", title.bold())?;
    } else {
        writeln!(writer, "{}", title)?;
    }
    writeln!(writer)?;

    let summary = serde_json::to_value(&report.summary)?;
    format_value_as_text(&summary, writer, 1)?;
    writeln!(writer)?;

    if report.is_clean() {
        let clean = "No issues found.";
        if color {
            writeln!(writer, "{}", clean.green())?;
        } else {
            writeln!(writer, "{}", clean)?;
        }
        return Ok(());
    }

    for group in &report.groups {
        let heading = format!("{} ({})", group.title, group.findings.len());
        if color {
            writeln!(writer, "{}", heading.bold())?;
        } else {
            writeln!(writer, "{}", heading)?;
        }
        for finding in &group.findings {
            writeln!(
                writer,
                "  {} {}",
                severity_label(finding.severity, color),
                finding.message
            )?;
            if !finding.repositories.is_empty() {
                writeln!(writer, "      path: {}", finding_path(finding))?;
            }
            if let Some(signature) = &finding.details.type_signature {
                writeln!(writer, "      types: {}", format_signature(signature))?;
            }
            writeln!(writer, "      fix: {}", finding.recommendation)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn report_markdown<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    writeln!(writer, "# Repository Topology Report\n")?;
    writeln!(writer, "## Summary\n")?;

    let summary = serde_json::to_value(&report.summary)?;
    if let Value::Object(map) = &summary {
        write_table_row(writer, &["Metric".to_string(), "Value".to_string()])?;
        write_table_separator(writer, 2)?;
        for (key, val) in map {
            write_table_row(writer, &[format_key(key), format_scalar(val)])?;
        }
        writeln!(writer)?;
    }

    if report.is_clean() {
        writeln!(writer, "_No issues found._")?;
        return Ok(());
    }

    for group in &report.groups {
        writeln!(writer, "## {} ({})\n", group.title, group.findings.len())?;
        write_table_row(
            writer,
            &[
                "Severity".to_string(),
                "Repositories".to_string(),
                "Message".to_string(),
                "Recommendation".to_string(),
            ],
        )?;
        write_table_separator(writer, 4)?;
        for finding in &group.findings {
            write_table_row(
                writer,
                &[
                    finding.severity.to_string(),
                    finding_path(finding),
                    finding.message.clone(),
                    finding.recommendation.clone(),
                ],
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
