//! Table and error formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};
use soldexer_core::PipeError;

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Parse a size string like "500m", "10g", "1t" into bytes.
///
/// Supported suffixes (case-insensitive): `b`, `k`/`kb`, `m`/`mb`, `g`/`gb`, `t`/`tb`.
/// No suffix assumes bytes.
pub fn parse_size_bytes(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("empty size value".to_string());
    }

    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("tb") {
        (n, TB)
    } else if let Some(n) = s.strip_suffix('t') {
        (n, TB)
    } else if let Some(n) = s.strip_suffix("gb") {
        (n, GB)
    } else if let Some(n) = s.strip_suffix('g') {
        (n, GB)
    } else if let Some(n) = s.strip_suffix("mb") {
        (n, MB)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, MB)
    } else if let Some(n) = s.strip_suffix("kb") {
        (n, KB)
    } else if let Some(n) = s.strip_suffix('k') {
        (n, KB)
    } else if let Some(n) = s.strip_suffix('b') {
        (n, 1u64)
    } else {
        // Assume bytes if no suffix
        (s.as_str(), 1u64)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid size value: {s}"))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size value too large: {s}"))
}

/// Text printed to stderr when a command fails.
///
/// The message comes first, then any captured tool output, then the hint.
pub fn error_report(err: &PipeError) -> String {
    let mut lines = vec![match err {
        PipeError::PackageNotFound { name, version } => {
            format!("✗ Package not found: {name}:{version}")
        }
        _ => format!("Error: {err}"),
    }];
    if let Some(output) = err.tool_output() {
        lines.push(output.trim_end().to_string());
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("\n{hint}"));
    }
    lines.join("\n")
}
