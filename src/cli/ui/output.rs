use std::fmt::Display;

use console::style;

/// Width of the label column in `field` lines
const LABEL_WIDTH: usize = 18;

/// Styled terminal output for command results. Logs go to stderr through
/// tracing; this writes the human-readable report to stdout.
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: impl Display) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: impl Display) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: impl Display) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: impl Display) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, title: impl Display) {
        println!("\n{}", style(title).bold().underlined());
    }

    pub fn section(&self, title: impl Display) {
        println!("\n{}", style(title).bold());
        println!("{}", "─".repeat(40));
    }

    /// `label: value` with aligned values
    pub fn field(&self, label: &str, value: impl Display) {
        let label = format!("{}:", label);
        println!("  {:<width$} {}", label, value, width = LABEL_WIDTH);
    }

    pub fn item(&self, message: impl Display) {
        println!("  • {}", message);
    }

    /// Secondary line under an item
    pub fn detail(&self, message: impl Display) {
        println!("      {}", style(message).dim());
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
