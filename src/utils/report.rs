// src/utils/report.rs

//! Console report formatting for command output.
//!
//! Diagnostics go through the `log` facade; this module prints the
//! operator-facing report (headers, steps, summaries) on stdout with a
//! consistent `[timestamp] [INFO]` prefix.

use chrono::Local;

const WIDTH: usize = 60;

/// Format a report line with timestamp and level.
fn format_line(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [INFO] {}", timestamp, message)
}

/// Print a plain report line.
pub fn info(message: &str) {
    println!("{}", format_line(message));
}

/// Print a step in a process.
pub fn step(step_num: usize, total: usize, message: &str) {
    info(&format!("[STEP {}/{}] {}", step_num, total, message));
}

/// Print a separator line.
pub fn separator() {
    info(&"─".repeat(WIDTH));
}

/// Print a boxed header.
pub fn header(title: &str) {
    let border = "═".repeat(WIDTH);
    info(&border);
    info(&format!("  {}", title));
    info(&border);
}

/// Print an indented sub-item.
pub fn sub_item(message: &str) {
    info(&format!("    {}", message));
}

/// Print a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    println!();
    info(&format!("[SUMMARY] {}", title));
    for (key, value) in items {
        sub_item(&format!("{}: {}", key, value));
    }
}
