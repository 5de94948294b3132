//! Text layout for the front-panel display.
//!
//! The panel is a 20x4 character display. The top row holds a fixed banner, the third row lists the controller number
//! of each fader and the fourth row lists the values being sent. Each reading sits in its own right-aligned,
//! three-digit cell so the figures line up under the faders.
//!
//! Writing to the display is slow (every character costs several bus transfers), so once a full frame is up only the
//! cells whose figures changed are rewritten.

use core::fmt::Write;
use heapless::String;

/// Width of the display in characters.
pub const COLUMNS: usize = 20;

/// Row on which the banner is printed at power-up.
pub const BANNER_ROW: u8 = 0;
/// Row listing the controller number of each fader.
pub const CC_NUMBER_ROW: u8 = 2;
/// Row listing the value of each fader.
pub const VALUE_ROW: u8 = 3;

/// Power-up banner: "Faders" on the left and "フェーダー" on the right, using the display's katakana character ROM.
pub const BANNER: [u8; COLUMNS] = *b"Faders        \xcc\xaa\xb0\xc0\xde\xb0";

/// Number of cells per row, one per fader.
pub const CELLS: usize = 4;
/// Width of a cell in characters.
pub const CELL_WIDTH: usize = 3;

/// One full row of text.
pub type Row = String<COLUMNS>;

/// Text of a single cell.
pub type Cell = String<CELL_WIDTH>;

/// A character display which can be addressed by row and column.
///
/// Text is handed over as raw bytes in the display's own character set, which for ASCII is the same as UTF-8.
pub trait CharacterDisplay {
    /// Error reported by the underlying bus.
    type Error;

    /// Erases the whole display and homes the cursor.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Moves the cursor to `column` on `row`, both counted from 0.
    fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), Self::Error>;

    /// Prints `bytes` starting at the cursor.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Prints `row` from the first column of row number `row_index`.
    fn write_row(&mut self, row_index: u8, row: &str) -> Result<(), Self::Error> {
        self.set_cursor(0, row_index)?;
        self.write_bytes(row.as_bytes())
    }
}

/// Lays out four readings as `" %3d  %3d  %3d  %3d "`.
pub fn format_row(readings: [u8; CELLS]) -> Row {
    let mut row = Row::new();
    let [a, b, c, d] = readings;
    let written = write!(row, " {a:3}  {b:3}  {c:3}  {d:3} ");
    // 4 cells of at most 3 digits plus 8 spaces is exactly 20 characters
    debug_assert!(written.is_ok(), "row overflowed the display width");
    row
}

/// Lays out one reading as it appears inside its cell.
pub fn format_cell(reading: u8) -> Cell {
    let mut cell = Cell::new();
    let written = write!(cell, "{reading:3}");
    debug_assert!(written.is_ok(), "a u8 never takes more than 3 digits");
    cell
}

/// Display column at which cell `index` starts.
pub const fn cell_column(index: usize) -> u8 {
    (1 + index * (CELL_WIDTH + 2)) as u8
}

/// The figures on the two data rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readout {
    /// Shown on [`CC_NUMBER_ROW`].
    pub cc_numbers: [u8; CELLS],
    /// Shown on [`VALUE_ROW`].
    pub values: [u8; CELLS],
}

impl Readout {
    /// Puts this readout on the display.
    ///
    /// With no `previous` readout both rows are written in full. Otherwise only the cells that differ from `previous`
    /// are rewritten, which assumes `previous` is what the display currently shows.
    pub fn draw<D: CharacterDisplay>(&self, display: &mut D, previous: Option<&Readout>) -> Result<(), D::Error> {
        let rows = [
            (CC_NUMBER_ROW, self.cc_numbers, previous.map(|p| p.cc_numbers)),
            (VALUE_ROW, self.values, previous.map(|p| p.values)),
        ];
        for (row_index, readings, shown) in rows {
            match shown {
                None => display.write_row(row_index, &format_row(readings))?,
                Some(shown) => {
                    for (index, (&reading, _)) in readings
                        .iter()
                        .zip(shown.iter())
                        .enumerate()
                        .filter(|(_, (reading, shown))| reading != shown)
                    {
                        display.set_cursor(cell_column(index), row_index)?;
                        display.write_bytes(format_cell(reading).as_bytes())?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Clears the display and prints the banner.
pub fn show_banner<D: CharacterDisplay>(display: &mut D) -> Result<(), D::Error> {
    display.clear()?;
    display.set_cursor(0, BANNER_ROW)?;
    display.write_bytes(&BANNER)
}
