//! Arena storage for field values.
use std::mem;

use spalte::Char;
use tracing::trace;

#[derive(Clone, Debug)]
struct Slab<C> {
    data: Box<[C]>,
    used: usize,
}

impl<C> Slab<C> {
    fn free(&self) -> usize {
        self.data.len() - self.used
    }
}

/// The location of characters secured in a [`Store`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Slot {
    /// Index of the buffer.
    pub buffer: usize,
    /// Offset of the first character within the buffer.
    pub start: usize,
}

/// An append-only list of buffers holding NUL terminated character sequences.
///
/// Space is handed out from the end of a buffer's used part, never spanning two buffers. Only
/// [`shrink_to_fit`][Self::shrink_to_fit] moves buffers in memory, so data otherwise stays at the
/// same address as long as its buffer is owned by some store, including after
/// [`merge`][Self::merge].
#[derive(Clone, Debug)]
pub struct Store<C> {
    slabs: Vec<Slab<C>>,
    chunk_size: usize,
}

impl<C: Char> Default for Store<C> {
    fn default() -> Self {
        Self::with_chunk_size(Self::DEFAULT_CHUNK_SIZE)
    }
}

impl<C: Char> Store<C> {
    /// Size of the buffers [`allocate`][Self::allocate] adds by default.
    pub const DEFAULT_CHUNK_SIZE: usize = 16 << 10;

    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that grows by buffers of at least `chunk_size` characters.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            slabs: vec![],
            chunk_size: chunk_size.max(1),
        }
    }

    /// Secures space for `len` characters followed by a NUL, if any buffer has enough room left.
    ///
    /// Buffers are searched starting with the most recently added one. The NUL is written
    /// immediately, the characters are left for the caller to fill.
    pub fn secure(&mut self, len: usize) -> Option<Slot> {
        let buffer = self.slabs.iter().rposition(|slab| slab.free() > len)?;
        Some(self.take(buffer, len))
    }

    /// Secures space for `len` characters followed by a NUL, adding a buffer when necessary.
    pub fn allocate(&mut self, len: usize) -> Slot {
        if let Some(slot) = self.secure(len) {
            return slot;
        }
        let size = self.chunk_size.max(len + 1);
        trace!(size, "growing store");
        let buffer = self.add_buffer(vec![C::NUL; size].into_boxed_slice());
        self.take(buffer, len)
    }

    fn take(&mut self, buffer: usize, len: usize) -> Slot {
        let slab = &mut self.slabs[buffer];
        let start = slab.used;
        slab.data[start + len] = C::NUL;
        slab.used += len + 1;
        Slot { buffer, start }
    }

    /// Adopts an unused buffer, returning its index.
    pub fn add_buffer(&mut self, data: Box<[C]>) -> usize {
        self.adopt(data, 0)
    }

    /// Adopts a buffer whose first `used` characters are already in use, returning its index.
    pub fn adopt(&mut self, data: Box<[C]>, used: usize) -> usize {
        assert!(used <= data.len(), "used part exceeds the buffer");
        self.slabs.push(Slab { data, used });
        self.slabs.len() - 1
    }

    /// Moves all buffers of `other` into this store.
    ///
    /// Returns the index that `other`'s first buffer has in this store. Buffer indices of `other`
    /// are shifted by that amount.
    pub fn merge(&mut self, other: Store<C>) -> usize {
        let offset = self.slabs.len();
        self.slabs.extend(other.slabs);
        offset
    }

    /// Marks all buffers as unused, keeping them for reuse.
    pub fn clear(&mut self) {
        for slab in &mut self.slabs {
            slab.used = 0;
        }
    }

    /// Takes back all buffers of at least `min_len` characters from a cleared store.
    ///
    /// Returns nothing while any buffer is in use, as removing buffers changes indices.
    pub fn reclaim(&mut self, min_len: usize) -> Vec<Box<[C]>> {
        if self.slabs.iter().any(|slab| slab.used > 0) {
            return vec![];
        }
        let (taken, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.slabs)
            .into_iter()
            .partition(|slab| slab.data.len() >= min_len);
        self.slabs = kept;
        taken.into_iter().map(|slab| slab.data).collect()
    }

    /// Releases unused buffers and unused tails of buffers.
    ///
    /// Returns for each previous buffer index the new index, or `None` for buffers that were
    /// released.
    pub fn shrink_to_fit(&mut self) -> Vec<Option<usize>> {
        let mut remap = Vec::with_capacity(self.slabs.len());
        let mut kept = 0;
        self.slabs.retain_mut(|slab| {
            if slab.used == 0 {
                remap.push(None);
                return false;
            }
            if slab.used < slab.data.len() {
                slab.data = slab.data[..slab.used].into();
            }
            remap.push(Some(kept));
            kept += 1;
            true
        });
        remap
    }

    /// Returns the characters at `start..start + len` of a buffer.
    pub fn chars(&self, buffer: usize, start: usize, len: usize) -> &[C] {
        &self.slabs[buffer].data[start..start + len]
    }

    /// Returns the characters at `start..start + len` of a buffer for modification.
    pub fn chars_mut(&mut self, buffer: usize, start: usize, len: usize) -> &mut [C] {
        &mut self.slabs[buffer].data[start..start + len]
    }

    /// Returns the number of buffers.
    pub fn buffers(&self) -> usize {
        self.slabs.len()
    }

    /// Returns the total size of all buffers.
    pub fn capacity(&self) -> usize {
        self.slabs.iter().map(|slab| slab.data.len()).sum()
    }

    /// Returns the number of characters in use, including NUL terminators.
    pub fn used(&self) -> usize {
        self.slabs.iter().map(|slab| slab.used).sum()
    }
}
