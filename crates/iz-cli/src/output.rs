//! Output renderers and formatting helpers for CLI commands.

use std::io::{self, IsTerminal};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use iz_config::{ColorMode, OutputFormat};
use serde::Serialize;
use tracing::debug;

use crate::client::{CliError, CliResult};

const BOLD: &str = "\u{1b}[1m";
const YELLOW: &str = "\u{1b}[33m";
const RESET: &str = "\u{1b}[0m";
const MASK: &str = "********";

/// Renders tables or JSON according to the effective settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Renderer {
    pub(crate) format: OutputFormat,
    color: bool,
}

impl Renderer {
    pub(crate) fn new(format: OutputFormat, color: ColorMode) -> Self {
        Self {
            format,
            color: use_color(color, io::stdout().is_terminal()),
        }
    }

    pub(crate) const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub(crate) fn json<T: Serialize + ?Sized>(self, value: &T) -> CliResult<()> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
        println!("{text}");
        Ok(())
    }

    /// Print rows as aligned columns under a header.
    pub(crate) fn table(self, headers: &[&str], rows: &[Vec<String>]) {
        for line in format_table(headers, rows, self.color) {
            println!("{line}");
        }
    }

    /// Print `key: value` lines with aligned values.
    pub(crate) fn fields(self, fields: &[(&str, String)]) {
        let width = fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in fields {
            println!("{key:<width$}  {value}");
        }
    }
}

const fn use_color(mode: ColorMode, terminal: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => terminal,
    }
}

pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>], color: bool) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.len()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    let header = render_row(headers.iter().copied(), &widths);
    lines.push(if color {
        format!("{BOLD}{header}{RESET}")
    } else {
        header
    });
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str), &widths));
    }
    lines
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Print non-fatal warnings to stderr without changing the exit code.
pub(crate) fn print_warnings(warnings: &[String]) {
    let color = io::stderr().is_terminal();
    for message in warnings {
        debug!(warning = %message, "reporting warning");
        if color {
            eprintln!("{YELLOW}warning:{RESET} {message}");
        } else {
            eprintln!("warning: {message}");
        }
    }
}

/// Hide a secret unless explicitly requested.
pub(crate) fn mask(value: &str, show: bool) -> String {
    if show { value.to_string() } else { MASK.to_string() }
}

/// Coarse age of a timestamp for listings.
pub(crate) fn format_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m", elapsed.num_minutes())
    } else {
        "just now".to_string()
    }
}

pub(crate) fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
