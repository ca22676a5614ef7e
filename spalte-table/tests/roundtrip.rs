use proptest::prelude::*;
use spalte::{Config, SliceInput};
use spalte_table::{read_csv, read_tsv, write_csv, write_tsv, Table};

fn table_of(records: &[Vec<String>]) -> Table<u8> {
    let mut table = Table::new();
    for record in records {
        table.push_fields(record.iter().map(String::as_bytes));
    }
    table
}

fn strings(table: &Table<u8>) -> Vec<Vec<String>> {
    table
        .records()
        .map(|record| record.iter().map(|value| value.to_string()).collect())
        .collect()
}

fn nul_terminated(table: &Table<u8>) -> bool {
    table
        .records()
        .all(|record| record.iter().all(|value| value.with_nul().last() == Some(&0)))
}

#[test]
fn merged_tables_keep_their_values() -> spalte::Result<()> {
    let mut first = read_csv(SliceInput::from("a,b\nc,d\n"), Config::default().buffer_size(3))?;
    let second = read_tsv(SliceInput::from("e\tf\n"), Config::default())?;
    let address = second.record(0).and_then(|record| record.get(1)).map(|v| v.as_ptr());
    first += second;
    assert_eq!(strings(&first), [["a", "b"], ["c", "d"], ["e", "f"]]);
    let merged = first.record(2).and_then(|record| record.get(1)).map(|v| v.as_ptr());
    assert_eq!(merged, address);
    assert!(nul_terminated(&first));
    Ok(())
}

#[test]
fn shrinking_keeps_contents() -> spalte::Result<()> {
    let mut table = read_csv(SliceInput::from("x,\"y\"\"z\"\n\n1,22,333\n"), Config::default())?;
    let before = table.clone();
    table.shrink_to_fit();
    assert_eq!(table, before);
    assert!(table.store().capacity() < before.store().capacity());
    assert!(nul_terminated(&table));
    Ok(())
}

#[test]
fn tsv_round_trip() -> spalte::Result<()> {
    let text = "id\tname\r\n1\tfoo bar\r\n2\t\"quoted\"\r\n";
    let table = read_tsv(SliceInput::from(text), Config::default().buffer_size(4))?;
    let mut out = vec![];
    write_tsv(&table, &mut out)?;
    assert_eq!(out, text.as_bytes());
    Ok(())
}

proptest! {
    #[test]
    fn written_tables_read_back(
        records in prop::collection::vec(
            prop::collection::vec("[ab,\"\r\n ]{0,6}", 1..5),
            0..8,
        ),
        buffer_size in 1usize..16,
    ) {
        let table = table_of(&records);
        let mut text = vec![];
        write_csv(&table, &mut text).unwrap();

        let read = read_csv(SliceInput::new(&text[..]), Config::default().buffer_size(buffer_size))
            .unwrap();
        prop_assert!(nul_terminated(&read));
        prop_assert_eq!(strings(&read), records);
        prop_assert_eq!(read, table);
    }

    #[test]
    fn empty_records_read_back_as_empty_lines(
        records in prop::collection::vec(
            prop::collection::vec("[ab\"]{0,3}", 0..3),
            0..8,
        ),
        buffer_size in 1usize..8,
    ) {
        let table = table_of(&records);
        let mut text = vec![];
        write_csv(&table, &mut text).unwrap();

        let config = Config::default().buffer_size(buffer_size).empty_line_aware(true);
        let read = read_csv(SliceInput::new(&text[..]), config).unwrap();
        prop_assert_eq!(strings(&read), records);
    }
}
