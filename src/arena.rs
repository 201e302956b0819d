use core::cell::RefCell;

use crate::error::{Error, Result};

const MIN_CHUNK: usize = 4096;

/// Bump allocator whose allocations stay valid until the arena is dropped.
///
/// One reply's variable-length data (column names, messages, field text, auth
/// salts) is copied in here during decoding and borrowed back out, so the
/// decoded views remain usable after the cursor bytes they came from have been
/// consumed. There is no per-allocation free: dropping the arena releases
/// everything at once, which is why it must outlive the `Reply` it backs.
pub struct Arena {
    inner: RefCell<Inner>,
}

struct Inner {
    /// Retired chunks. Never written again, only dropped with the arena.
    full: Vec<Vec<u8>>,
    cur: Vec<u8>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                full: Vec::new(),
                cur: Vec::new(),
            }),
        }
    }

    /// Copy `src` into the arena and return a view of the copy.
    pub fn alloc_copy(&self, src: &[u8]) -> Result<&[u8]> {
        if src.is_empty() {
            return Ok(&[]);
        }
        let mut inner = self.inner.borrow_mut();
        if inner.cur.len() + src.len() > inner.cur.capacity() {
            inner.grow(src.len())?;
        }
        let start = inner.cur.len();
        inner.cur.extend_from_slice(src);
        let ptr = inner.cur.as_ptr();
        // SAFETY: the chunk buffer cannot reallocate (capacity was checked
        // above and retired chunks are never appended to), and no chunk is
        // freed before the arena itself drops. Each call hands out a region
        // disjoint from every earlier one, so the shared slice stays valid
        // and unaliased for the arena's lifetime.
        unsafe { Ok(core::slice::from_raw_parts(ptr.add(start), src.len())) }
    }

    /// Total bytes handed out so far.
    pub fn allocated(&self) -> usize {
        let inner = self.inner.borrow();
        inner.full.iter().map(Vec::len).sum::<usize>() + inner.cur.len()
    }
}

impl Inner {
    fn grow(&mut self, at_least: usize) -> Result<()> {
        let size = at_least.max(self.cur.capacity() * 2).max(MIN_CHUNK);
        let mut chunk = Vec::new();
        chunk.try_reserve_exact(size).map_err(|_| Error::OutOfMemory)?;
        let retired = core::mem::replace(&mut self.cur, chunk);
        if !retired.is_empty() {
            self.full.push(retired);
        }
        Ok(())
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Arena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("allocated", &self.allocated())
            .finish()
    }
}
