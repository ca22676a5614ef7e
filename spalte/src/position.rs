//! Physical and logical positions in delimited text.
use std::fmt;

use crate::Char;

/// A line and column in the raw input.
///
/// Both are zero-based and counted in characters of the parsed alphabet. CR, LF and CRLF each end
/// one line. Display follows the usual `line:column` convention where the first line and column
/// are `1`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct PhysicalPosition {
    /// The zero-based line.
    pub line: usize,
    /// The zero-based column within the line.
    pub column: usize,
}

impl PhysicalPosition {
    /// Creates a position from a zero-based line and column.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for PhysicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A record and field index in the decoded view of the input.
///
/// `record` counts the records completed so far, `field` counts the fields completed in the
/// current record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct LogicalPosition {
    /// Number of completed records.
    pub record: usize,
    /// Number of completed fields within the current record.
    pub field: usize,
}

impl LogicalPosition {
    /// Creates a logical position.
    pub fn new(record: usize, field: usize) -> Self {
        Self { record, field }
    }
}

impl fmt::Display for LogicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}, field {}", self.record, self.field)
    }
}

/// Tracks the physical position of consumed input.
///
/// Every consumed character is passed to [`advance`][Self::advance] exactly once. A CR at the end
/// of one call and an LF at the start of the next are still folded into a single line break.
#[derive(Clone, Debug, Default)]
pub struct PositionTracker {
    line: usize,
    column: usize,
    after_cr: bool,
    consumed: usize,
}

impl PositionTracker {
    /// Creates a tracker positioned at the start of the input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances over consumed characters.
    pub fn advance<C: Char>(&mut self, mut chars: &[C]) {
        self.consumed += chars.len();
        while let Some(index) = C::find_line_break(chars) {
            if index > 0 {
                self.after_cr = false;
            }
            if chars[index] == C::LF && self.after_cr {
                self.after_cr = false;
            } else {
                self.line += 1;
                self.after_cr = chars[index] == C::CR;
            }
            self.column = 0;
            chars = &chars[index + 1..];
        }
        if !chars.is_empty() {
            self.after_cr = false;
            self.column += chars.len();
        }
    }

    /// Returns the position of the next character to consume.
    pub fn physical(&self) -> PhysicalPosition {
        PhysicalPosition::new(self.line, self.column)
    }

    /// Returns the number of characters consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// A [`PositionTracker`] that follows the parser through one chunk at a time.
#[derive(Clone, Debug, Default)]
pub struct ChunkPosition {
    tracker: PositionTracker,
    scanned: usize,
}

impl ChunkPosition {
    /// Starts tracking a new chunk.
    pub fn begin_chunk(&mut self) {
        self.scanned = 0;
    }

    /// Passes the characters of `chunk` up to `upto` that were not yet seen to the tracker.
    #[inline]
    pub fn scan_to<C: Char>(&mut self, chunk: &[C], upto: usize) {
        if upto > self.scanned {
            self.tracker.advance(&chunk[self.scanned..upto]);
            self.scanned = upto;
        }
    }

    /// Returns the position after the scanned characters.
    pub fn physical(&self) -> PhysicalPosition {
        self.tracker.physical()
    }

    /// Returns the number of characters scanned over all chunks.
    pub fn consumed(&self) -> usize {
        self.tracker.consumed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(chunks: &[&str]) -> PositionTracker {
        let mut tracker = PositionTracker::new();
        for chunk in chunks {
            tracker.advance(chunk.as_bytes());
        }
        tracker
    }

    #[test]
    fn columns_on_first_line() {
        assert_eq!(track(&["col\"1"]).physical(), PhysicalPosition::new(0, 5));
        assert_eq!(track(&["co", "l"]).physical(), PhysicalPosition::new(0, 3));
    }

    #[test]
    fn line_terminators() {
        assert_eq!(track(&["a\nb"]).physical(), PhysicalPosition::new(1, 1));
        assert_eq!(track(&["a\rb"]).physical(), PhysicalPosition::new(1, 1));
        assert_eq!(track(&["a\r\nb"]).physical(), PhysicalPosition::new(1, 1));
        assert_eq!(track(&["a\n\rb"]).physical(), PhysicalPosition::new(2, 1));
        assert_eq!(track(&["\r\r\n"]).physical(), PhysicalPosition::new(2, 0));
    }

    #[test]
    fn crlf_split_across_chunks() {
        assert_eq!(track(&["a\r", "\nb"]).physical(), PhysicalPosition::new(1, 1));
        assert_eq!(track(&["a\r", "", "\n"]).physical(), PhysicalPosition::new(1, 0));
        assert_eq!(track(&["a\r", "x\n"]).physical(), PhysicalPosition::new(2, 0));
    }

    #[test]
    fn counts_consumed() {
        assert_eq!(track(&["ab\r", "\ncd"]).consumed(), 6);
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(PhysicalPosition::new(0, 5).to_string(), "1:6");
    }
}
