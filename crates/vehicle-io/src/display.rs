//! Two-line character display buffer

use crate::capability::TextDisplay;
use crate::error::IoError;
use tracing::debug;

/// Number of display rows
pub const DISPLAY_ROWS: usize = 2;
/// Number of characters per row
pub const DISPLAY_COLS: usize = 16;

/// In-memory 2x16 character display.
///
/// Text is written at the cursor and clipped at the right edge. Characters
/// outside ASCII are shown as `?`, as the real module has no glyphs for them.
#[derive(Debug, Clone)]
pub struct LineDisplay {
    cells: [[u8; DISPLAY_COLS]; DISPLAY_ROWS],
    row: usize,
    col: usize,
}

impl LineDisplay {
    /// Create a blank display
    pub fn new() -> Self {
        Self {
            cells: [[b' '; DISPLAY_COLS]; DISPLAY_ROWS],
            row: 0,
            col: 0,
        }
    }

    /// Contents of one row, padded with spaces
    pub fn row(&self, row: usize) -> Option<String> {
        self.cells
            .get(row)
            .map(|cells| cells.iter().map(|&b| b as char).collect())
    }

    /// Contents of one row without trailing padding
    pub fn row_text(&self, row: usize) -> Option<String> {
        self.row(row).map(|text| text.trim_end().to_string())
    }
}

impl Default for LineDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDisplay for LineDisplay {
    fn locate(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
    }

    fn print(&mut self, text: &str) -> Result<(), IoError> {
        if self.row >= DISPLAY_ROWS || self.col > DISPLAY_COLS {
            return Err(IoError::DisplayOutOfRange {
                row: self.row,
                col: self.col,
            });
        }

        for ch in text.chars() {
            if self.col >= DISPLAY_COLS {
                break;
            }
            self.cells[self.row][self.col] = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.col += 1;
        }

        debug!("display[{}] = {:?}", self.row, self.row_text(self.row));
        Ok(())
    }

    fn clear(&mut self) {
        self.cells = [[b' '; DISPLAY_COLS]; DISPLAY_ROWS];
        self.row = 0;
        self.col = 0;
    }
}
