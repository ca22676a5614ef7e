//! Tables of records whose values live in a [`Store`].
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{Add, AddAssign, Deref},
};

use spalte::Char;

use crate::Store;

/// A value stored in a [`Table`].
///
/// This is only a location within the table's store. Use [`Table::value`] to access the
/// characters.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StoredValue {
    pub(crate) buffer: usize,
    pub(crate) start: usize,
    pub(crate) len: usize,
    pub(crate) capacity: usize,
}

impl StoredValue {
    /// Returns the number of characters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for an empty value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the length the value can be rewritten to in place.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The characters of a stored value.
///
/// Values compare, order and hash as character sequences. They are always followed by a NUL in
/// the store, which [`with_nul`][Self::with_nul] includes.
#[derive(Copy, Clone)]
pub struct Value<'t, C> {
    with_nul: &'t [C],
}

impl<'t, C: Char> Value<'t, C> {
    /// Returns the characters.
    pub fn as_slice(&self) -> &'t [C] {
        &self.with_nul[..self.with_nul.len() - 1]
    }

    /// Returns the characters followed by the NUL terminator.
    pub fn with_nul(&self) -> &'t [C] {
        self.with_nul
    }

    /// Decodes the value, returning `None` for invalid sequences.
    pub fn decode(&self) -> Option<String> {
        C::decode(self.as_slice())
    }
}

impl<C: Char> Deref for Value<'_, C> {
    type Target = [C];

    fn deref(&self) -> &[C] {
        self.as_slice()
    }
}

impl<C: Char> PartialEq for Value<'_, C> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<C: Char> Eq for Value<'_, C> {}

impl<C: Char> PartialOrd for Value<'_, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C: Char> Ord for Value<'_, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<C: Char> Hash for Value<'_, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<C: Char> PartialEq<str> for Value<'_, C> {
    fn eq(&self, other: &str) -> bool {
        C::encode_str(other) == self.as_slice()
    }
}

impl<C: Char> PartialEq<&str> for Value<'_, C> {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl<C: Char> fmt::Display for Value<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        C::display(self.as_slice(), f)
    }
}

impl<C: Char> fmt::Debug for Value<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&C::render(self.as_slice()))
    }
}

/// A record of a [`Table`].
#[derive(Copy, Clone)]
pub struct Record<'t, C> {
    store: &'t Store<C>,
    values: &'t [StoredValue],
}

impl<'t, C: Char> Record<'t, C> {
    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a record without fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the field at `index`.
    pub fn get(&self, index: usize) -> Option<Value<'t, C>> {
        let (store, values) = (self.store, self.values);
        values.get(index).map(|&value| view(store, value))
    }

    /// Iterates over the fields.
    pub fn iter(&self) -> impl Iterator<Item = Value<'t, C>> + 't {
        let (store, values) = (self.store, self.values);
        values.iter().map(move |&value| view(store, value))
    }
}

impl<C: Char> fmt::Debug for Record<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

fn view<C: Char>(store: &Store<C>, value: StoredValue) -> Value<'_, C> {
    Value {
        with_nul: store.chars(value.buffer, value.start, value.len + 1),
    }
}

fn rewrite<C: Char>(store: &mut Store<C>, value: &mut StoredValue, chars: &[C]) {
    if chars.len() <= value.capacity {
        let dest = store.chars_mut(value.buffer, value.start, chars.len() + 1);
        dest[..chars.len()].copy_from_slice(chars);
        dest[chars.len()] = C::NUL;
        value.len = chars.len();
    } else {
        *value = import(store, &[chars]);
    }
}

fn import<C: Char>(store: &mut Store<C>, fragments: &[&[C]]) -> StoredValue {
    let len = fragments.iter().map(|fragment| fragment.len()).sum();
    let slot = store.allocate(len);
    let mut at = slot.start;
    for fragment in fragments {
        store
            .chars_mut(slot.buffer, at, fragment.len())
            .copy_from_slice(fragment);
        at += fragment.len();
    }
    StoredValue {
        buffer: slot.buffer,
        start: slot.start,
        len,
        capacity: len,
    }
}

/// Records of character values kept in a single [`Store`].
///
/// Cloning a table copies all of its buffers. Merging tables with `+=` moves the other table's
/// buffers, so values keep their addresses.
#[derive(Clone)]
pub struct Table<C> {
    store: Store<C>,
    records: Vec<Vec<StoredValue>>,
}

impl<C: Char> Default for Table<C> {
    fn default() -> Self {
        Self::with_store(Store::new())
    }
}

impl<C: Char> Table<C> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table using the buffers of `store`.
    pub fn with_store(mut store: Store<C>) -> Self {
        store.clear();
        Self {
            store,
            records: vec![],
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Store<C> {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut Store<C> {
        &mut self.store
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<Vec<StoredValue>> {
        &mut self.records
    }

    /// Copies characters into the store.
    pub fn import(&mut self, chars: &[C]) -> StoredValue {
        import(&mut self.store, &[chars])
    }

    /// Copies the concatenation of several fragments into the store.
    pub fn import_value(&mut self, fragments: &[&[C]]) -> StoredValue {
        import(&mut self.store, fragments)
    }

    /// Replaces the characters of a value.
    ///
    /// The value is updated in place if the new characters fit its capacity, otherwise they are
    /// imported and `value` is retargeted.
    pub fn rewrite_value(&mut self, value: &mut StoredValue, chars: &[C]) {
        rewrite(&mut self.store, value, chars)
    }

    /// Replaces the characters of a field, returning `false` if there is no such field.
    pub fn rewrite_field(&mut self, record: usize, field: usize, chars: &[C]) -> bool {
        match self.records.get_mut(record).and_then(|r| r.get_mut(field)) {
            Some(value) => {
                rewrite(&mut self.store, value, chars);
                true
            }
            None => false,
        }
    }

    /// Returns the characters of a value stored in this table.
    pub fn value(&self, value: StoredValue) -> Value<'_, C> {
        view(&self.store, value)
    }

    /// Appends a record of values stored in this table.
    pub fn push_record(&mut self, values: Vec<StoredValue>) {
        self.records.push(values)
    }

    /// Imports the given fields and appends them as record.
    pub fn push_fields<F: AsRef<[C]>>(&mut self, fields: impl IntoIterator<Item = F>) {
        let values = fields
            .into_iter()
            .map(|field| self.import(field.as_ref()))
            .collect();
        self.records.push(values)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record at `index`.
    pub fn record(&self, index: usize) -> Option<Record<'_, C>> {
        self.records.get(index).map(|values| Record {
            store: &self.store,
            values,
        })
    }

    /// Iterates over the records.
    pub fn records(&self) -> impl Iterator<Item = Record<'_, C>> + '_ {
        self.records.iter().map(|values| Record {
            store: &self.store,
            values,
        })
    }

    /// Removes all records, keeping the store's buffers for reuse.
    pub fn clear(&mut self) {
        self.records.clear();
        self.store.clear();
    }

    /// Releases unused memory.
    ///
    /// This moves values, so previously obtained addresses become invalid.
    pub fn shrink_to_fit(&mut self) {
        let remap = self.store.shrink_to_fit();
        for value in self.records.iter_mut().flatten() {
            if let Some(&Some(buffer)) = remap.get(value.buffer) {
                value.buffer = buffer;
            }
        }
        self.records.shrink_to_fit();
    }
}

impl<C: Char> AddAssign for Table<C> {
    fn add_assign(&mut self, other: Table<C>) {
        let offset = self.store.merge(other.store);
        self.records.extend(other.records.into_iter().map(|mut values| {
            for value in &mut values {
                value.buffer += offset;
            }
            values
        }));
    }
}

impl<C: Char> Add for Table<C> {
    type Output = Table<C>;

    fn add(mut self, other: Table<C>) -> Table<C> {
        self += other;
        self
    }
}

impl<C: Char> PartialEq for Table<C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .records()
                .zip(other.records())
                .all(|(a, b)| a.len() == b.len() && a.iter().eq(b.iter()))
    }
}

impl<C: Char> Eq for Table<C> {}

impl<C: Char> fmt::Debug for Table<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.records()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(records: &[&[&str]]) -> Table<u8> {
        let mut table = Table::new();
        for record in records {
            table.push_fields(record.iter().map(|field| field.as_bytes()));
        }
        table
    }

    fn addresses(table: &Table<u8>) -> Vec<usize> {
        table
            .records()
            .flat_map(|record| record.iter().map(|value| value.as_ptr() as usize).collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn values_are_nul_terminated() {
        let mut table = table(&[&["ab", "", "c\0d"], &["efg"]]);
        let mut value = table.import_value(&[&b"x"[..], &b"yz"[..]]);
        assert_eq!(table.value(value).with_nul(), b"xyz\0");
        table.rewrite_value(&mut value, b"q");
        assert_eq!(table.value(value).with_nul(), b"q\0");
        for record in table.records() {
            for value in record.iter() {
                assert_eq!(value.with_nul().last(), Some(&0));
            }
        }
        assert_eq!(table.record(0).and_then(|r| r.get(2)).map(|v| v.len()), Some(3));
    }

    #[test]
    fn rewrite_in_place_or_relocate() {
        let mut table = table(&[&["abcd"]]);
        let before = addresses(&table);
        assert!(table.rewrite_field(0, 0, b"xy"));
        assert_eq!(addresses(&table), before);
        assert!(table.rewrite_field(0, 0, b"wxyz"));
        assert_eq!(addresses(&table), before);
        assert!(table.rewrite_field(0, 0, b"longer"));
        assert_ne!(addresses(&table), before);
        assert_eq!(table.record(0).and_then(|r| r.get(0)).unwrap(), "longer");
        assert!(!table.rewrite_field(1, 0, b""));
    }

    #[test]
    fn merge_preserves_addresses() {
        let parts = || {
            (
                table(&[&["a", "b"]]),
                table(&[&["c"]]),
                table(&[&["d", "e"], &[]]),
            )
        };
        let (a, b, c) = parts();
        let expected = [addresses(&a), addresses(&b), addresses(&c)].concat();
        let left = (a + b) + c;
        assert_eq!(addresses(&left), expected);

        let (a, b, c) = parts();
        let expected = [addresses(&a), addresses(&b), addresses(&c)].concat();
        let right = a + (b + c);
        assert_eq!(addresses(&right), expected);

        assert_eq!(left, right);
        assert_eq!(left, table(&[&["a", "b"], &["c"], &["d", "e"], &[]]));
    }

    #[test]
    fn clone_copies() {
        let original = table(&[&["a", "bc"]]);
        let copy = original.clone();
        assert_eq!(copy, original);
        assert!(addresses(&copy)
            .iter()
            .all(|address| !addresses(&original).contains(address)));
    }

    #[test]
    fn clear_reuses_buffers() {
        let mut table = table(&[&["abc", "def"]]);
        let buffers = table.store().buffers();
        table.clear();
        assert!(table.is_empty());
        table.push_fields(["ghi"]);
        assert_eq!(table.store().buffers(), buffers);
        table.shrink_to_fit();
        assert_eq!(table.store().capacity(), 4);
        assert_eq!(table.record(0).and_then(|r| r.get(0)).unwrap(), "ghi");
    }

    #[test]
    fn values_order_and_display() {
        let table = table(&[&["b", "a", "a"]]);
        let record = table.record(0).unwrap();
        let mut values: Vec<_> = record.iter().collect();
        values.sort();
        assert_eq!(values, ["a", "a", "b"]);
        assert_eq!(record.get(0).unwrap().to_string(), "b");
        assert_eq!(format!("{table:?}"), "[[\"b\", \"a\", \"a\"]]");
    }
}
