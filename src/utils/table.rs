//! Table rendering utilities for CLI outputs.

use crate::utils::colors::RESET;

pub struct Cell {
    text: String,
    color: Option<&'static str>,
}

impl Cell {
    pub fn colored(text: impl Into<String>, color: &'static str) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, color: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        text.to_string().into()
    }
}

pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column widths are measured on the visible text, so colours never
    /// break the alignment.
    pub fn render(&self, separator: &str) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.text.chars().count());
            }
        }

        let mut out = String::new();

        // Header
        for (h, w) in self.headers.iter().zip(&widths) {
            out.push_str(&format!("{:<w$} ", h, w = *w));
        }
        out.push('\n');

        let total: usize = widths.iter().map(|w| w + 1).sum();
        let sep = separator.chars().next().unwrap_or('-');
        out.push_str(&sep.to_string().repeat(total.saturating_sub(1)));
        out.push('\n');

        // Rows
        for row in &self.rows {
            for (cell, w) in row.iter().zip(&widths) {
                let padded = format!("{:<w$}", cell.text, w = *w);
                match cell.color {
                    Some(c) => out.push_str(&format!("{c}{padded}{RESET} ")),
                    None => out.push_str(&format!("{padded} ")),
                }
            }
            out.push('\n');
        }

        out
    }
}
