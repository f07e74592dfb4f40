//! Colored status output for the terminal.

use colored::{ColoredString, Colorize};

fn status(symbol: ColoredString, msg: &str) {
    println!("{symbol} {msg}");
}

pub fn info(msg: &str) {
    status("ℹ".blue(), msg);
}

/// A job or check that went through.
pub fn success(msg: &str) {
    status("✓".green(), msg);
}

/// Warnings go to stderr so piped job listings stay clean.
pub fn warn(msg: &str) {
    eprintln!("{} {msg}", "⚠".yellow());
}

pub fn error(msg: &str) {
    eprintln!("{} {msg}", "✗".red().bold());
}

/// Indented secondary line, e.g. advice under an error.
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

pub fn header(title: &str) {
    let rule = "─".repeat(title.chars().count());
    println!("\n{}\n{}", title.bold(), rule.dimmed());
}

pub fn kv(key: &str, value: &str) {
    println!("  {:>10}  {value}", key.dimmed());
}

/// `[n/total] msg`, with `n` starting at 1.
pub fn step(num: usize, total: usize, msg: &str) {
    let counter = format!("[{num}/{total}]");
    println!("{} {msg}", counter.cyan().bold());
}
