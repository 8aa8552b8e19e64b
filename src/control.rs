use std::{cell::Cell, fmt, num::NonZeroUsize, process, ptr::NonNull};

use log::trace;

use crate::{
    error::{try_box_with, AllocError, RawAlloc},
    registry::{Registry, RegistryRef},
};

/// Strong and weak counts of one managed object.
///
/// The block knows nothing about the object it counts for; the handles carry
/// the object pointer and decide when to drop it. Counters are plain `Cell`s,
/// which keeps every handle type `!Send + !Sync`.
pub(crate) struct ControlBlock
{
    strong: Cell<usize>,
    weak: Cell<usize>,
    registry: RegistryRef,
}

impl ControlBlock
{
    fn fresh(registry: &Registry) -> Self
    {
        Self {
            strong: Cell::new(1),
            weak: Cell::new(0),
            registry: registry.downgrade(),
        }
    }

    /// Allocate a block with one strong reference and register it.
    pub(crate) fn allocate(registry: &Registry) -> NonNull<Self>
    {
        let block = NonNull::from(Box::leak(Box::new(Self::fresh(registry))));
        registry.add(block);
        trace!("allocated control block {:?}", BlockId::of(block));
        block
    }

    /// Like `allocate`, drawing memory from `raw` and reporting its failure
    /// instead of aborting. Nothing is registered on failure.
    pub(crate) fn try_allocate(
        registry: &Registry,
        raw: RawAlloc,
    ) -> Result<NonNull<Self>, AllocError>
    {
        let block = NonNull::from(Box::leak(try_box_with(Self::fresh(registry), raw)?));
        registry.add(block);
        trace!("allocated control block {:?}", BlockId::of(block));
        Ok(block)
    }

    /// Deregister and deallocate.
    ///
    /// # Safety
    ///
    /// `block` came from `allocate` and no handle will touch it again.
    pub(crate) unsafe fn free(block: NonNull<Self>)
    {
        let it = Box::from_raw(block.as_ptr());
        it.registry.remove(block);
        trace!("freed control block {:?}", BlockId::of(block));
    }

    /// Give up one weak reference, freeing the block if it was the last
    /// reference of either kind.
    ///
    /// # Safety
    ///
    /// The caller owns one of the block's weak references.
    pub(crate) unsafe fn release_weak(block: NonNull<Self>)
    {
        let this = block.as_ref();
        if this.dec_weak() == 0 && this.strong() == 0 {
            Self::free(block)
        }
    }

    pub(crate) fn strong(&self) -> usize { self.strong.get() }

    pub(crate) fn weak(&self) -> usize { self.weak.get() }

    pub(crate) fn inc_strong(&self) { self.strong.set(incremented(self.strong.get())) }

    pub(crate) fn dec_strong(&self) -> usize
    {
        let n = self.strong.get();
        debug_assert!(n > 0, "strong count underflow");
        self.strong.set(n - 1);
        n - 1
    }

    pub(crate) fn inc_weak(&self) { self.weak.set(incremented(self.weak.get())) }

    pub(crate) fn dec_weak(&self) -> usize
    {
        let n = self.weak.get();
        debug_assert!(n > 0, "weak count underflow");
        self.weak.set(n - 1);
        n - 1
    }
}

// Wrapping a count around would free a live object.
fn incremented(n: usize) -> usize
{
    match n.checked_add(1) {
        Some(n) => n,
        None => process::abort(),
    }
}

impl fmt::Debug for ControlBlock
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ControlBlock")
            .field("strong", &self.strong())
            .field("weak", &self.weak())
            .finish()
    }
}

/// Identity of a control block, for inspecting a `Registry`.
///
/// Derived from the block's address, so an id may be reused by a later
/// allocation once its block has been freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(NonZeroUsize);

impl BlockId
{
    pub(crate) fn of(block: NonNull<ControlBlock>) -> Self
    {
        match NonZeroUsize::new(block.as_ptr() as usize) {
            Some(addr) => BlockId(addr),
            None => unreachable!("NonNull has a zero address"),
        }
    }

    /// Address of the block.
    pub fn addr(&self) -> NonZeroUsize { self.0 }
}
