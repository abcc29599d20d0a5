//! Terminal output helpers.
//!
//! Status lines are colored; JSON goes to stdout untouched so it can be piped.

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print an API response on one line.
pub fn json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print an API response indented.
pub fn json_pretty(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
