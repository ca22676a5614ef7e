//! Destinations for scanned values.
use std::collections::VecDeque;

use spalte::{Error, Result};

/// Receives the values produced by a [`Translator`][crate::Translator].
pub trait Collect<T> {
    /// Stores one value.
    fn put(&mut self, value: T) -> Result<()>;
}

impl<T, K: Collect<T> + ?Sized> Collect<T> for &mut K {
    fn put(&mut self, value: T) -> Result<()> {
        (**self).put(value)
    }
}

/// Appends values.
impl<T> Collect<T> for Vec<T> {
    fn put(&mut self, value: T) -> Result<()> {
        self.push(value);
        Ok(())
    }
}

/// Appends values at the back.
impl<T> Collect<T> for VecDeque<T> {
    fn put(&mut self, value: T) -> Result<()> {
        self.push_back(value);
        Ok(())
    }
}

/// Keeps the most recent value.
impl<T> Collect<T> for Option<T> {
    fn put(&mut self, value: T) -> Result<()> {
        *self = Some(value);
        Ok(())
    }
}

/// Inserts values at the front of a [`VecDeque`].
#[derive(Debug)]
pub struct FrontInsert<'a, T>(pub &'a mut VecDeque<T>);

impl<T> Collect<T> for FrontInsert<'_, T> {
    fn put(&mut self, value: T) -> Result<()> {
        self.0.push_front(value);
        Ok(())
    }
}

/// Writes values into consecutive slots of a slice.
///
/// Putting more values than there are slots is an error.
#[derive(Debug)]
pub struct Indexed<'a, T> {
    slots: &'a mut [T],
    next: usize,
}

impl<'a, T> Indexed<'a, T> {
    /// Starts writing at the first slot.
    pub fn new(slots: &'a mut [T]) -> Self {
        Self { slots, next: 0 }
    }

    /// Returns the number of slots written.
    pub fn written(&self) -> usize {
        self.next
    }
}

impl<T> Collect<T> for Indexed<'_, T> {
    fn put(&mut self, value: T) -> Result<()> {
        let slot = self
            .slots
            .get_mut(self.next)
            .ok_or_else(|| Error::custom(format!("no slot left after {} values", self.next)))?;
        *slot = value;
        self.next += 1;
        Ok(())
    }
}

/// A collector calling a closure, created by [`from_fn`].
pub struct FnCollector<F>(F);

/// Creates a collector that passes every value to `f`.
pub fn from_fn<T, F: FnMut(T) -> Result<()>>(f: F) -> FnCollector<F> {
    FnCollector(f)
}

impl<T, F: FnMut(T) -> Result<()>> Collect<T> for FnCollector<F> {
    fn put(&mut self, value: T) -> Result<()> {
        (self.0)(value)
    }
}
