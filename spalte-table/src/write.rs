//! Writing tables as delimited text.
use std::io::{self, Write};

use spalte::{Char, Dialect, RecordWriter};

use crate::Table;

/// Writes all records of a table.
///
/// Errors are deferred as usual for a [`RecordWriter`].
pub fn write_records<C: Char>(table: &Table<C>, writer: &mut RecordWriter) {
    for record in table.records() {
        for value in record.iter() {
            writer.write_field(value.as_slice());
        }
        writer.end_record();
    }
}

/// Writes a table as CSV.
pub fn write_csv<C: Char>(table: &Table<C>, write: impl Write) -> io::Result<()> {
    write_dialect(table, write, Dialect::Csv)
}

/// Writes a table as TSV.
///
/// Fails for values containing tabs or line breaks and for records consisting of a single empty
/// value.
pub fn write_tsv<C: Char>(table: &Table<C>, write: impl Write) -> io::Result<()> {
    write_dialect(table, write, Dialect::Tsv)
}

fn write_dialect<C: Char>(table: &Table<C>, write: impl Write, dialect: Dialect) -> io::Result<()> {
    let mut writer = RecordWriter::from_write(write, dialect);
    write_records(table, &mut writer);
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(table: &Table<u8>, tsv: bool) -> io::Result<String> {
        let mut out = vec![];
        if tsv {
            write_tsv(table, &mut out)?;
        } else {
            write_csv(table, &mut out)?;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn quotes_as_needed() -> io::Result<()> {
        let mut table = Table::new();
        table.push_fields(["a", "b,c", "say \"hi\""].map(str::as_bytes));
        table.push_fields([""].map(str::as_bytes));
        table.push_record(vec![]);
        table.push_fields(["x\ny", ""].map(str::as_bytes));
        assert_eq!(
            written(&table, false)?,
            "a,\"b,c\",\"say \"\"hi\"\"\"\r\n\"\"\r\n\r\n\"x\ny\",\r\n"
        );
        Ok(())
    }

    #[test]
    fn tsv_rejects_tabs() -> io::Result<()> {
        let mut table = Table::new();
        table.push_fields(["a", "", "b"].map(str::as_bytes));
        assert_eq!(written(&table, true)?, "a\t\tb\r\n");

        table.push_fields(["c\td"].map(str::as_bytes));
        let err = written(&table, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn wide_values_are_encoded() -> io::Result<()> {
        let mut table = Table::<char>::new();
        table.push_fields([vec!['ä', ','], vec!['€']]);
        let mut out = vec![];
        write_csv(&table, &mut out)?;
        assert_eq!(out, "\"ä,\",€\r\n".as_bytes());
        Ok(())
    }
}
