use std::{
    alloc, fmt,
    marker::PhantomData,
    mem,
    ops::Deref,
    ptr::{self, NonNull},
};

use crate::{
    control::{BlockId, ControlBlock},
    error::{try_box_with, AllocError, RawAlloc},
    length::Length,
    registry::Registry,
    unique::Unique,
};

/// Object pointer and control block of a bound handle. Either both exist or
/// the handle is empty.
struct Binding<T>
{
    object: NonNull<T>,
    control: NonNull<ControlBlock>,
}

impl<T> Clone for Binding<T>
{
    fn clone(&self) -> Self { *self }
}
impl<T> Copy for Binding<T> {}

impl<T> Binding<T>
{
    fn adopt(it: Box<T>, registry: &Registry) -> Self
    {
        let control = ControlBlock::allocate(registry);
        Self {
            object: NonNull::from(Box::leak(it)),
            control,
        }
    }

    fn try_adopt(it: Box<T>, registry: &Registry, raw: RawAlloc) -> Result<Self, AllocError>
    {
        // On failure `it` is still owned here and gets dropped.
        let control = ControlBlock::try_allocate(registry, raw)?;
        Ok(Self {
            object: NonNull::from(Box::leak(it)),
            control,
        })
    }

    fn block(&self) -> &ControlBlock { unsafe { self.control.as_ref() } }

    /// Give up one strong reference, dropping the object on the last one.
    ///
    /// While the object's destructor runs the block holds an extra weak
    /// reference, so weak handles dropped by that destructor cannot free the
    /// block from under us.
    unsafe fn release_strong(self)
    {
        let block = self.block();
        if block.dec_strong() == 0 {
            block.inc_weak();
            drop(Box::from_raw(self.object.as_ptr()));
            ControlBlock::release_weak(self.control);
        }
    }

    /// Give up the last strong reference, handing back the object instead of
    /// dropping it.
    unsafe fn release_into_inner(self) -> T
    {
        let block = self.block();
        debug_assert_eq!(block.strong(), 1);
        block.dec_strong();
        let it = *Box::from_raw(self.object.as_ptr());
        if block.weak() == 0 {
            ControlBlock::free(self.control);
        }
        it
    }
}

/// Owning reference to a shared allocation.
///
/// Every `Shared` on the same object shares one control block. The object is
/// dropped when the last `Shared` goes away; the control block is freed once
/// the last `Weak` is gone as well.
///
/// Single-threaded: the counts are not atomic and the type is neither `Send`
/// nor `Sync`.
pub struct Shared<T>
{
    bound: Option<Binding<T>>,
    _owns: PhantomData<T>,
}

#[allow(dead_code)]
impl<T> Shared<T>
{
    fn bind(bound: Option<Binding<T>>) -> Self
    {
        Self {
            bound,
            _owns: PhantomData,
        }
    }

    /// Allocate `it` and share it, registering the control block with this
    /// thread's default registry.
    pub fn new(it: T) -> Self { Self::new_in(it, &Registry::current()) }

    pub fn new_in(it: T, registry: &Registry) -> Self { Self::from_box_in(Box::new(it), registry) }

    /// Like `new`, but returns allocation failure of either the object or its
    /// control block instead of aborting. Nothing is leaked on failure.
    pub fn try_new(it: T) -> Result<Self, AllocError> { Self::try_new_in(it, &Registry::current()) }

    pub fn try_new_in(it: T, registry: &Registry) -> Result<Self, AllocError>
    {
        Self::try_new_with(it, registry, alloc::alloc)
    }

    /// `try_new_in` over the given raw allocator.
    pub(crate) fn try_new_with(
        it: T,
        registry: &Registry,
        raw: RawAlloc,
    ) -> Result<Self, AllocError>
    {
        let it = try_box_with(it, raw)?;
        Ok(Self::bind(Some(Binding::try_adopt(it, registry, raw)?)))
    }

    /// Take over an existing allocation.
    pub fn from_box(it: Box<T>) -> Self { Self::from_box_in(it, &Registry::current()) }

    pub fn from_box_in(it: Box<T>, registry: &Registry) -> Self
    {
        Self::bind(Some(Binding::adopt(it, registry)))
    }

    /// Take over the value of a `Unique`. An empty `Unique` gives an empty
    /// `Shared`.
    pub fn from_unique(it: Unique<T>) -> Self
    {
        it.into_box().map_or_else(Self::default, Self::from_box)
    }

    /// Take ownership of a raw pointer. Null yields an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` (or `Unique::release`)
    /// and the caller must neither use nor free it afterwards.
    pub unsafe fn from_raw(ptr: *mut T) -> Self { Self::from_raw_in(ptr, &Registry::current()) }

    /// # Safety
    ///
    /// As for `from_raw`.
    pub unsafe fn from_raw_in(ptr: *mut T, registry: &Registry) -> Self
    {
        match NonNull::new(ptr) {
            Some(p) => Self::from_box_in(Box::from_raw(p.as_ptr()), registry),
            None => Self::default(),
        }
    }

    /// A weak reference to the same object. Empty if this handle is empty.
    pub fn downgrade(&self) -> Weak<T>
    {
        if let Some(b) = self.bound {
            b.block().inc_weak();
        }
        Weak::bind(self.bound)
    }

    /// Rebind to the object of `other`, releasing the current one.
    ///
    /// Assigning a handle on the object this one already refers to is a
    /// no-op, so the object can never be dropped on its way to being
    /// re-acquired.
    pub fn assign(&mut self, other: &Self)
    {
        if !self.ptr_eq(other) {
            *self = other.clone();
        }
    }

    /// Move the binding out into a new handle, leaving this one empty.
    pub fn take(&mut self) -> Self { mem::take(self) }

    /// Release the reference, leaving the handle empty.
    pub fn reset(&mut self)
    {
        if let Some(b) = self.bound.take() {
            unsafe { b.release_strong() }
        }
    }

    /// Release the reference, then take over `it` with a fresh control
    /// block.
    pub fn reset_to(&mut self, it: Box<T>) { self.reset_to_in(it, &Registry::current()) }

    pub fn reset_to_in(&mut self, it: Box<T>, registry: &Registry)
    {
        self.reset();
        self.bound = Some(Binding::adopt(it, registry));
    }

    /// Release the reference, then take ownership of `ptr`. Resetting to
    /// the pointer already held is a no-op.
    ///
    /// # Safety
    ///
    /// As for `from_raw`, unless `ptr` is the pointer this handle holds.
    pub unsafe fn reset_raw(&mut self, ptr: *mut T)
    {
        if !ptr.is_null() && ptr as *const T == self.as_ptr() {
            return;
        }
        self.reset();
        *self = Self::from_raw(ptr);
    }

    pub fn get(&self) -> Option<&T> { self.bound.map(|b| unsafe { &*b.object.as_ptr() }) }

    /// Mutable access, only when no other `Shared` or `Weak` can observe the
    /// object.
    pub fn get_mut(&mut self) -> Option<&mut T>
    {
        match self.bound {
            Some(b) if b.block().strong() == 1 && b.block().weak() == 0 => {
                Some(unsafe { &mut *b.object.as_ptr() })
            }
            _ => None,
        }
    }

    /// The object pointer, or null if empty. Ownership is kept.
    pub fn as_ptr(&self) -> *const T
    {
        self.bound
            .map_or(ptr::null(), |b| b.object.as_ptr() as *const T)
    }

    /// Take the value back if this is the only `Shared` on it. Outstanding
    /// `Weak`s expire.
    pub fn try_unwrap(mut self) -> Result<T, Self>
    {
        match self.bound.filter(|b| b.block().strong() == 1) {
            Some(b) => {
                self.bound = None;
                Ok(unsafe { b.release_into_inner() })
            }
            None => Err(self),
        }
    }

    /// Number of `Shared` handles on the object, 0 if empty.
    pub fn use_count(&self) -> usize { self.bound.map_or(0, |b| b.block().strong()) }

    /// Number of `Weak` handles on the object, 0 if empty.
    pub fn weak_count(&self) -> usize { self.bound.map_or(0, |b| b.block().weak()) }

    pub fn is_empty(&self) -> bool { self.bound.is_none() }

    /// Whether both handles share a control block, or both are empty.
    pub fn ptr_eq(&self, other: &Self) -> bool { self.block_id() == other.block_id() }

    pub fn block_id(&self) -> Option<BlockId> { self.bound.map(|b| BlockId::of(b.control)) }
}

impl<T: Length> Shared<T>
{
    /// Length of the shared value, 0 if empty.
    pub fn length(&self) -> usize { self.get().map_or(0, Length::length) }
}

impl<T> Clone for Shared<T>
{
    fn clone(&self) -> Self
    {
        if let Some(b) = self.bound {
            b.block().inc_strong();
        }
        Self::bind(self.bound)
    }

    fn clone_from(&mut self, source: &Self) { self.assign(source) }
}

impl<T> Drop for Shared<T>
{
    fn drop(&mut self) { self.reset() }
}

impl<T> Default for Shared<T>
{
    fn default() -> Self { Self::bind(None) }
}

impl<T> Deref for Shared<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.get() {
            Some(it) => it,
            None => panic!("dereferenced an empty Shared"),
        }
    }
}

impl<T> From<T> for Shared<T>
{
    fn from(it: T) -> Self { Self::new(it) }
}

impl<T> From<Box<T>> for Shared<T>
{
    fn from(it: Box<T>) -> Self { Self::from_box(it) }
}

impl<T> From<Unique<T>> for Shared<T>
{
    fn from(it: Unique<T>) -> Self { Self::from_unique(it) }
}

impl<T> fmt::Debug for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Shared")
            .field("ptr", &self.as_ptr())
            .field("use_count", &self.use_count())
            .finish()
    }
}

/// Non-owning reference to a shared allocation.
///
/// Keeps the control block alive but not the object. Check `expired` or
/// call `lock` to get at the object.
pub struct Weak<T>
{
    bound: Option<Binding<T>>,
}

#[allow(dead_code)]
impl<T> Weak<T>
{
    fn bind(bound: Option<Binding<T>>) -> Self { Self { bound } }

    /// An empty weak reference; always expired.
    pub fn new() -> Self { Self::bind(None) }

    /// Rebind to the object of `shared`, releasing the current binding.
    pub fn assign(&mut self, shared: &Shared<T>) { *self = shared.downgrade(); }

    /// Whether the object is gone, or the handle is empty.
    pub fn expired(&self) -> bool { self.use_count() == 0 }

    /// A new `Shared` on the object, or an empty one if it has expired.
    pub fn lock(&self) -> Shared<T>
    {
        match self.bound {
            Some(b) if b.block().strong() > 0 => {
                b.block().inc_strong();
                Shared::bind(Some(b))
            }
            _ => Shared::default(),
        }
    }

    /// Number of `Shared` handles on the object; 0 once expired.
    pub fn use_count(&self) -> usize { self.bound.map_or(0, |b| b.block().strong()) }

    /// Number of `Weak` handles on the object, 0 if empty.
    pub fn weak_count(&self) -> usize { self.bound.map_or(0, |b| b.block().weak()) }

    /// Release the reference, leaving the handle empty.
    pub fn reset(&mut self)
    {
        if let Some(b) = self.bound.take() {
            unsafe { ControlBlock::release_weak(b.control) }
        }
    }

    pub fn swap(&mut self, other: &mut Self) { mem::swap(&mut self.bound, &mut other.bound) }

    /// Move the binding out into a new handle, leaving this one empty.
    pub fn take(&mut self) -> Self { mem::take(self) }

    pub fn is_empty(&self) -> bool { self.bound.is_none() }

    /// Whether both handles share a control block, or both are empty.
    pub fn ptr_eq(&self, other: &Self) -> bool { self.block_id() == other.block_id() }

    pub fn block_id(&self) -> Option<BlockId> { self.bound.map(|b| BlockId::of(b.control)) }
}

impl<T> Clone for Weak<T>
{
    fn clone(&self) -> Self
    {
        if let Some(b) = self.bound {
            b.block().inc_weak();
        }
        Self::bind(self.bound)
    }

    fn clone_from(&mut self, source: &Self)
    {
        if !self.ptr_eq(source) {
            *self = source.clone();
        }
    }
}

impl<T> Drop for Weak<T>
{
    fn drop(&mut self) { self.reset() }
}

impl<T> Default for Weak<T>
{
    fn default() -> Self { Self::new() }
}

impl<T> From<&Shared<T>> for Weak<T>
{
    fn from(it: &Shared<T>) -> Self { it.downgrade() }
}

impl<T> fmt::Debug for Weak<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Weak")
            .field("block", &self.block_id())
            .field("expired", &self.expired())
            .finish()
    }
}
