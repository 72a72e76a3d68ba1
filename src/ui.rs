//! Terminal output helpers.
//!
//! - `Table` - box-drawn table sized to the terminal, used by `govend scan`
//! - `progress_bar` - the worker pool's progress bar
//! - `print_summary` - end-of-run report
//!
//! ```text
//!   ┌──────────────────┬─────────┐
//!   │ Import           │ Kind    │
//!   ├──────────────────┼─────────┤
//!   │ github.com/x/lib │ external│
//!   └──────────────────┴─────────┘
//! ```

use crate::deps::VendorReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Narrowest a column is squeezed to when the terminal is too small.
const MIN_COLUMN: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn print(&self) {
        let (_, cols) = console::Term::stdout().size();
        print!("{}", self.render(cols as usize));
    }

    /// Lay the table out to fit in `max_width` columns where possible.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);

        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let text = console::truncate_str(&flatten(cell), width, "...").to_string();
                let pad = width.saturating_sub(console::measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                out.push_str(&format!(" {}{} │", text, " ".repeat(pad)));
            }
            out.push('\n');
            out
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|h| console::measure_text_width(h))
            .collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(console::measure_text_width(&flatten(cell)));
            }
        }

        // Indent, outer borders and " x │" padding per column.
        let overhead = 3 + 3 * widths.len();
        let budget = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > budget {
            let Some(widest) = widths.iter_mut().filter(|w| **w > MIN_COLUMN).max() else {
                break;
            };
            *widest -= 1;
        }
        widths
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

pub fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_summary(report: &VendorReport) {
    let vendored = report.vendored().count();
    let builtin: Vec<&str> = report.builtin().collect();

    println!(
        "{} Vendored {} packages ({} files).",
        "✓".green(),
        vendored,
        report.files_copied()
    );
    if !builtin.is_empty() {
        println!(
            "   {} {} assumed builtin: {}",
            "ℹ".blue(),
            builtin.len(),
            builtin.join(", ").dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    #[test]
    fn test_render_layout() {
        let mut table = Table::new(&["Import", "Kind"]);
        table.add_row(vec!["github.com/x/lib".to_string(), "external".to_string()]);
        let out = plain(&table.render(120));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("  ┌"));
        assert!(lines[1].contains("Import"));
        assert!(lines[3].contains("github.com/x/lib"));
        assert!(lines[4].starts_with("  └"));
        let widths: Vec<usize> = lines.iter().map(|l| console::measure_text_width(l)).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_render_shrinks_to_width() {
        let mut table = Table::new(&["Import"]);
        table.add_row(vec!["x".repeat(100)]);
        let out = plain(&table.render(40));
        assert!(out.lines().all(|l| console::measure_text_width(l) <= 40));
        assert!(out.contains("..."));
    }

    #[test]
    fn test_mismatched_rows_are_dropped() {
        let mut table = Table::new(&["A", "B"]);
        table.add_row(vec!["only one".to_string()]);
        assert_eq!(plain(&table.render(80)).lines().count(), 4);
    }

    #[test]
    fn test_flatten_control_whitespace() {
        assert_eq!(flatten("a\nb\tc"), "a b c");
    }
}
