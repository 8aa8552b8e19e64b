use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    ptr::NonNull,
    rc::{self, Rc},
};

use log::{debug, warn};

use crate::{
    control::{BlockId, ControlBlock},
    stats::{self, Stats},
};

/// Tracking context for control blocks.
///
/// Every control block is registered with exactly one registry from its
/// allocation until it is freed. The registry is a safety net and an
/// inspection point: the handles free their blocks themselves, and a block
/// still registered at teardown means a handle was leaked.
///
/// Cloning a `Registry` yields another handle on the same context. Blocks
/// only hold a non-owning reference to it, so a registry may be dropped
/// before its blocks; those are then counted as leaked and left alone.
#[derive(Clone)]
pub struct Registry(Rc<RefCell<Ledger>>);

thread_local! {
    static CURRENT: Registry = Registry::new();
}

#[allow(dead_code)]
impl Registry
{
    /// An empty registry.
    pub fn new() -> Self { Registry(Rc::new(RefCell::new(Ledger::default()))) }

    /// This thread's default registry, used by every constructor without an
    /// `_in` suffix.
    ///
    /// Once the thread is tearing down its thread-locals the default is gone,
    /// and handles created from then on are not tracked at all.
    pub fn current() -> Self
    {
        CURRENT
            .try_with(Registry::clone)
            .unwrap_or_else(|_| Registry::untracked())
    }

    /// A context that registers nothing, so nothing it hands out can be
    /// reported as leaked.
    pub(crate) fn untracked() -> Self
    {
        let mut ledger = Ledger::default();
        ledger.untracked = true;
        Registry(Rc::new(RefCell::new(ledger)))
    }

    /// Number of registered control blocks.
    pub fn len(&self) -> usize { self.0.borrow().blocks.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Whether `id` names a block allocated and not yet freed.
    pub fn contains(&self, id: BlockId) -> bool { self.0.borrow().blocks.contains_key(&id) }

    pub fn stats(&self) -> Stats { self.0.borrow().stats }

    /// Whether two handles refer to the same context.
    pub fn same(&self, other: &Registry) -> bool { Rc::ptr_eq(&self.0, &other.0) }

    /// Forcibly free every block still registered, returning how many there
    /// were.
    ///
    /// The managed objects of those blocks are not dropped; only the blocks
    /// are reclaimed.
    ///
    /// # Safety
    ///
    /// No live handle may refer to any of the remaining blocks, i.e. every
    /// one of them must belong to handles that were leaked with
    /// `mem::forget` or similar.
    pub unsafe fn teardown(&self) -> usize
    {
        let blocks: Vec<_> = {
            let mut ledger = self.0.borrow_mut();
            let blocks: Vec<_> = ledger.blocks.drain().map(|(_, b)| b).collect();
            ledger.stats.torn_down += blocks.len();
            blocks
        };
        if !blocks.is_empty() {
            debug!("tearing down {} leaked control blocks", blocks.len());
        }
        let n = blocks.len();
        for block in blocks {
            // Already deregistered, so dropping the box is all that is left.
            drop(Box::from_raw(block.as_ptr()));
        }
        n
    }

    pub(crate) fn add(&self, block: NonNull<ControlBlock>)
    {
        let mut ledger = self.0.borrow_mut();
        if ledger.untracked {
            return;
        }
        ledger.blocks.insert(BlockId::of(block), block);
        ledger.stats.allocated += 1;
    }

    pub(crate) fn remove(&self, block: NonNull<ControlBlock>) -> bool
    {
        self.0.borrow_mut().remove(block)
    }

    pub(crate) fn downgrade(&self) -> RegistryRef { RegistryRef(Rc::downgrade(&self.0)) }
}

impl Default for Registry
{
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Registry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let ledger = self.0.borrow();
        f.debug_struct("Registry")
            .field("blocks", &ledger.blocks.len())
            .field("stats", &ledger.stats)
            .finish()
    }
}

/// Non-owning reference from a control block back to its registry.
pub(crate) struct RegistryRef(rc::Weak<RefCell<Ledger>>);

impl RegistryRef
{
    /// Deregister `block`; a no-op if the registry is gone or the block is
    /// absent.
    pub(crate) fn remove(&self, block: NonNull<ControlBlock>) -> bool
    {
        match self.0.upgrade() {
            Some(ledger) => ledger.borrow_mut().remove(block),
            None => false,
        }
    }
}

#[derive(Default)]
pub(crate) struct Ledger
{
    blocks: HashMap<BlockId, NonNull<ControlBlock>>,
    stats: Stats,
    untracked: bool,
}

impl Ledger
{
    fn remove(&mut self, block: NonNull<ControlBlock>) -> bool
    {
        let present = self.blocks.remove(&BlockId::of(block)).is_some();
        if present {
            self.stats.freed += 1;
        }
        present
    }
}

impl Drop for Ledger
{
    fn drop(&mut self)
    {
        if !self.blocks.is_empty() {
            warn!(
                "{} control blocks outlived their registry",
                self.blocks.len()
            );
            self.stats.leaked += self.blocks.len();
        }
        stats::merge(self.stats);
    }
}
