// ABOUTME: Centralized CLI output utilities for consistent user-facing messages
// ABOUTME: Prefixes errors, warnings, hints and successes on stderr, colored when allowed

use owo_colors::{AnsiColors, OwoColorize};

pub struct CliOutput {
    use_color: bool,
}

impl CliOutput {
    /// Create CLI output utility with explicit color setting
    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line("error:", AnsiColors::Red, message));
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{}", self.line("warning:", AnsiColors::Yellow, message));
    }

    /// Follow-up advice printed after an error
    pub fn hint(&self, message: &str) {
        eprintln!("{}", self.line("hint:", AnsiColors::Blue, message));
    }

    pub fn success(&self, message: &str) {
        eprintln!("{}", self.line("success:", AnsiColors::Green, message));
    }

    fn line(&self, label: &str, color: AnsiColors, message: &str) -> String {
        if self.use_color {
            format!("{} {}", label.color(color).bold(), message)
        } else {
            format!("{} {}", label, message)
        }
    }
}
