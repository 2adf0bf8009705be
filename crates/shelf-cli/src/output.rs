//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde_json::Value;
use shelf_core::{ArtifactSummary, NotFound, SaveOutcome, VersionRecord};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the catalog listing
    pub fn print_summaries(&self, summaries: &[ArtifactSummary]) {
        match self.format {
            OutputFormat::Human => {
                if summaries.is_empty() {
                    println!("No artifacts found.");
                    return;
                }
                println!(
                    "{:>5} | {:<20} | {:<24} | {:<8} | {:>8} | Saved",
                    "ID", "Topic", "Name", "Type", "Versions"
                );
                for s in summaries {
                    println!(
                        "{:>5} | {:<20} | {:<24} | {:<8} | {:>8} | {}",
                        s.identity,
                        truncate(&s.topic, 20),
                        truncate(&s.name, 24),
                        truncate(&s.type_tag, 8),
                        s.version_count,
                        s.last_saved.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                println!("\n{} artifact(s)", summaries.len());
            }
            OutputFormat::Json => print_json(&summaries),
            OutputFormat::Quiet => {
                for s in summaries {
                    println!("{}", s.identity);
                }
            }
        }
    }

    /// Print every version of one artifact
    pub fn print_versions(&self, records: &[VersionRecord]) {
        match self.format {
            OutputFormat::Human => {
                if let Some(first) = records.first() {
                    println!("Artifact: {}", first.identity);
                    println!("Topic:    {}", display_or_dash(&first.topic));
                    println!("Name:     {}", first.name);
                    println!();
                }
                for r in records {
                    println!(
                        "v{:<4} {}  {:<8} {:<4} {}",
                        r.version,
                        r.saved_at.format("%Y-%m-%d %H:%M:%S"),
                        truncate(&r.type_tag, 8),
                        r.codec,
                        truncate_line(&r.comment, 50)
                    );
                }
                println!("\n{} version(s)", records.len());
            }
            OutputFormat::Json => print_json(&records),
            OutputFormat::Quiet => {
                for r in records {
                    println!("{}", r.version);
                }
            }
        }
    }

    /// Print a loaded payload
    pub fn print_value(&self, record: &VersionRecord, value: &Value) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "# artifact {} v{} ({}/{}, {})",
                    record.identity,
                    record.version,
                    display_or_dash(&record.topic),
                    record.name,
                    record.type_tag
                );
                print_json(value);
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "record": record,
                "value": value,
            })),
            OutputFormat::Quiet => {
                println!("{}", value);
            }
        }
    }

    /// Print the result of a save
    pub fn print_saved(&self, outcome: &SaveOutcome) {
        let record = &outcome.record;
        match self.format {
            OutputFormat::Human => {
                let action = match outcome.replaced {
                    Some(v) => format!("Replaced v{} with", v),
                    None if outcome.created => "Created".to_string(),
                    None => "Saved".to_string(),
                };
                println!(
                    "✓ {} artifact {} v{} ({}/{})",
                    action,
                    record.identity,
                    record.version,
                    display_or_dash(&record.topic),
                    record.name
                );
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "record": record,
                "replaced": outcome.replaced,
                "created": outcome.created,
            })),
            OutputFormat::Quiet => {
                println!("{} {}", record.identity, record.version);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Report a lookup that matched nothing
    ///
    /// Goes to stderr in every format so scripts reading stdout see an
    /// empty result.
    pub fn not_found(&self, reason: &NotFound) {
        if let Some(line) = self.not_found_line(reason) {
            eprintln!("{}", line);
        }
    }

    fn not_found_line(&self, reason: &NotFound) -> Option<String> {
        match self.format {
            OutputFormat::Human => Some(format!("⚠ {}", reason)),
            OutputFormat::Json => Some(
                serde_json::json!({"status": "not_found", "message": reason.to_string()})
                    .to_string(),
            ),
            OutputFormat::Quiet => None,
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to format output: {}", e),
    }
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
