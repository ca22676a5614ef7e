//! Streaming parsers for comma and tab separated values.
//!
//! Spalte parses delimited text in fixed size chunks and reports what it finds to a [`Handler`]:
//! the start and end of each record and the contents of each field, possibly split into several
//! fragments when a field spans a buffer refill. It is meant for inputs that don't fit into memory
//! and for consumers that want to avoid copying field contents:
//!
//! * _Streaming_: Input is read through an [`Input`] adapter one buffer at a time. Only the current
//!   buffer is kept, independent of the size of the input or of individual records.
//!
//! * _Zero-copy_: Fragments point directly into the working buffer. Handlers that only read
//!   fragments can declare [`Handler::ZERO_COPY`], in which case input that already holds all of
//!   its text lends its storage and no copy is made at all. On writable buffers escaped quotes are
//!   removed in place, so a quoted field is still passed as a single fragment.
//!
//! * _Resumable_: A handler can suspend the parser after any event by returning [`Flow::Stop`].
//!   [`Pull`] builds on this to offer a cursor that moves from field to field.
//!
//! * _Error reporting_: Every error carries the line and column of the input where it occurred as
//!   well as the record and field being processed, including errors raised by handlers.
//!
//! The same parser works on narrow (`u8`) and wide (`u16`, `char`) text via the [`Char`] trait.
//!
//! ```
//! use spalte::{parse_csv, Config, Flow, Handler, Result, SliceInput};
//!
//! #[derive(Default)]
//! struct Widest {
//!     field: usize,
//!     widest: usize,
//! }
//!
//! impl Handler<u8> for Widest {
//!     fn start_record(&mut self) -> Result<Flow> {
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn update(&mut self, fragment: &[u8]) -> Result<Flow> {
//!         self.field += fragment.len();
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn finalize(&mut self, fragment: &[u8]) -> Result<Flow> {
//!         self.widest = self.widest.max(self.field + fragment.len());
//!         self.field = 0;
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn end_record(&mut self) -> Result<Flow> {
//!         Ok(Flow::Continue)
//!     }
//! }
//!
//! let mut widest = Widest::default();
//! parse_csv(SliceInput::from("a,\"b\"\"c\"\nde,f\n"), &mut widest, Config::default())?;
//! assert_eq!(widest.widest, 3);
//! # Ok::<(), spalte::Error>(())
//! ```

#![warn(missing_docs)]
mod alphabet;
mod error;
mod handler;
mod input;
pub mod machine;
mod parser;
mod position;
mod pull;
pub mod write;


pub use alphabet::{render_chars, Char, RENDER_LIMIT};
pub use error::{Column, Error, ErrorKind, Result, Sign};
pub use handler::{EmptyLineAware, Flow, Handler, WithBuffer};
pub use input::{Input, OwnedInput, ReaderInput, SliceInput};
pub use machine::{Csv, Tsv};
pub use parser::{parse_csv, parse_tsv, Config, ParseResult, Parser};
pub use position::{ChunkPosition, LogicalPosition, PhysicalPosition, PositionTracker};
pub use pull::{Pull, PullConfig, PullState};
pub use write::{Dialect, RecordWriter};
