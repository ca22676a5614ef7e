//! Stored tables of delimited text.
//!
//! A [`Table`] keeps whole CSV or TSV inputs in memory. All values live in the buffers of a
//! single [`Store`], each followed by a NUL, so a table needs few allocations independent of
//! the number of fields. Tables are filled by a [`TableBuilder`], which hands its own buffers to
//! the parser and keeps the fields it sees in place, and can be written back with [`write_csv`]
//! and [`write_tsv`].
//!
//! The [`RecordExtractor`] streams records whose key field matches a predicate to a writer without
//! storing them.
//!
//! ```
//! use spalte::{Config, SliceInput};
//! use spalte_table::read_csv;
//!
//! let table = read_csv(SliceInput::from("name,n\nfoo,1\n\"b,ar\",2\n"), Config::default())?;
//! assert_eq!(table.len(), 3);
//! assert_eq!(table.record(2).and_then(|record| record.get(0)).unwrap(), "b,ar");
//!
//! let mut out = vec![];
//! spalte_table::write_csv(&table, &mut out)?;
//! assert_eq!(out, b"name,n\r\nfoo,1\r\n\"b,ar\",2\r\n");
//! # Ok::<(), spalte::Error>(())
//! ```

#![warn(missing_docs)]
mod builder;
mod extract;
mod store;
mod table;
mod write;

use spalte::{parse_csv, parse_tsv, Char, Config, Input, Result};

pub use builder::TableBuilder;
pub use extract::{ExtractConfig, RecordExtractor};
pub use store::{Slot, Store};
pub use table::{Record, StoredValue, Table, Value};
pub use write::{write_csv, write_records, write_tsv};

/// Reads CSV input into a new table.
///
/// The configured buffer size is used for the buffers that become part of the table's store.
pub fn read_csv<C: Char>(input: impl Input<C>, config: Config) -> Result<Table<C>> {
    let mut builder = TableBuilder::new().with_buffer_size(config.buffer_size);
    parse_csv(input, &mut builder, config)?;
    Ok(builder.into_table())
}

/// Reads TSV input into a new table.
pub fn read_tsv<C: Char>(input: impl Input<C>, config: Config) -> Result<Table<C>> {
    let mut builder = TableBuilder::new().with_buffer_size(config.buffer_size);
    parse_tsv(input, &mut builder, config)?;
    Ok(builder.into_table())
}
