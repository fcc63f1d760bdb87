// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use colored::{ColoredString, Colorize};

use crate::pipeline::StepStatus;

/// Colored label for a step status
pub fn status_label(status: StepStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        StepStatus::Ok => label.green(),
        StepStatus::Ko => label.red().bold(),
        StepStatus::Outdated => label.yellow(),
        StepStatus::Running => label.blue(),
        StepStatus::None => label.dimmed(),
    }
}

/// Check if colors should be disabled
pub fn should_use_colors() -> bool {
    // Respect NO_COLOR environment variable
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    std::env::var("TERM").is_ok()
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print an info item
pub fn print_info(msg: &str) {
    println!("  {} {}", "→".blue(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label_text() {
        colored::control::set_override(false);
        assert_eq!(status_label(StepStatus::Ok).to_string(), "OK");
        assert_eq!(status_label(StepStatus::Outdated).to_string(), "outdated");
    }
}
