//! Textual progress bar for batch generation

use std::io::{self, Write};

/// Number of cells in the rendered bar
pub const BAR_WIDTH: usize = 50;

/// Tracks completed-of-total and draws a fixed-width bar
///
/// Not synchronized: the batch collection loop is the only caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBar {
    total: usize,
    current: usize,
}

impl ProgressBar {
    /// Create a bar for `total` units of work
    ///
    /// Returns `None` for an empty total, which has no meaningful percentage.
    pub fn new(total: usize) -> Option<Self> {
        (total > 0).then_some(Self { total, current: 0 })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn increment(&mut self) {
        self.increment_by(1);
    }

    pub fn increment_by(&mut self, amount: usize) {
        self.current += amount;
    }

    /// Whole percentage complete, rounded toward zero
    pub fn percent(&self) -> usize {
        self.current * 100 / self.total
    }

    /// Filled cells out of [`BAR_WIDTH`], rounded toward zero
    pub fn filled_cells(&self) -> usize {
        self.current * BAR_WIDTH / self.total
    }

    /// The bar line without carriage return
    pub fn render(&self) -> String {
        format!(
            "Progress: [{:<width$}] {}%",
            "=".repeat(self.filled_cells()),
            self.percent(),
            width = BAR_WIDTH
        )
    }

    /// Redraw the bar in place on a terminal line
    pub fn display(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "\r{}", self.render())?;
        out.flush()
    }

    /// Zero the counter and end the bar's line
    pub fn reset(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.current = 0;
        writeln!(out)
    }
}
