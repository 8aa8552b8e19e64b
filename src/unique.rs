use std::{
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

use crate::{length::Length, pointers::Shared};

/// A move-only owning pointer.
///
/// No control block and no sharing; the value is dropped when the handle is
/// dropped or reset. Hand it to `Shared::from` (or call `share`) to turn sole
/// ownership into shared ownership without an aliasing raw pointer ever
/// existing.
///
/// Like the shared handles it stays on the thread that created it:
///
/// ```compile_fail
/// fn send<S: Send>(_: S) {}
/// send(sharedref::Unique::new(0u8));
/// ```
pub struct Unique<T>
{
    owned: Option<Box<T>>,
    _local: PhantomData<*const ()>,
}

#[allow(dead_code)]
impl<T> Unique<T>
{
    fn hold(owned: Option<Box<T>>) -> Self
    {
        Self {
            owned,
            _local: PhantomData,
        }
    }

    /// Allocate `it` on the heap.
    pub fn new(it: T) -> Self { Self::hold(Some(Box::new(it))) }

    pub fn from_box(it: Box<T>) -> Self { Self::hold(Some(it)) }

    /// Take ownership of a raw pointer. Null yields an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` (or `release`) and
    /// must not be used or freed by the caller afterwards.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    {
        Self::hold(NonNull::new(ptr).map(|p| Box::from_raw(p.as_ptr())))
    }

    /// Relinquish ownership, returning the raw pointer (null if empty).
    ///
    /// The caller becomes responsible for freeing it, e.g. through
    /// `Unique::from_raw` or `Box::from_raw`.
    pub fn release(&mut self) -> *mut T { self.owned.take().map_or(ptr::null_mut(), Box::into_raw) }

    pub fn into_box(mut self) -> Option<Box<T>> { self.owned.take() }

    /// Drop the value, leaving the handle empty.
    pub fn reset(&mut self) { self.owned = None; }

    /// Drop the value and take ownership of `it`.
    pub fn reset_to(&mut self, it: Box<T>)
    {
        self.owned = None;
        self.owned = Some(it);
    }

    /// Move the value out into a new handle, leaving this one empty.
    pub fn take(&mut self) -> Self { Self::hold(self.owned.take()) }

    pub fn get(&self) -> Option<&T> { self.owned.as_deref() }

    pub fn get_mut(&mut self) -> Option<&mut T> { self.owned.as_deref_mut() }

    /// The raw pointer, or null if empty. Ownership is kept.
    pub fn as_ptr(&self) -> *const T { self.get().map_or(ptr::null(), |it| it as *const T) }

    pub fn is_empty(&self) -> bool { self.owned.is_none() }

    /// Hand the value over to shared ownership.
    pub fn share(self) -> Shared<T> { Shared::from_unique(self) }
}

impl<T: Length> Unique<T>
{
    /// Length of the value, 0 if empty.
    pub fn length(&self) -> usize { self.get().map_or(0, Length::length) }
}

impl<T> Default for Unique<T>
{
    fn default() -> Self { Self::hold(None) }
}

impl<T> From<Box<T>> for Unique<T>
{
    fn from(it: Box<T>) -> Self { Self::from_box(it) }
}

impl<T> Deref for Unique<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.get() {
            Some(it) => it,
            None => panic!("dereferenced an empty Unique"),
        }
    }
}

impl<T> DerefMut for Unique<T>
{
    fn deref_mut(&mut self) -> &mut Self::Target
    {
        match self.get_mut() {
            Some(it) => it,
            None => panic!("dereferenced an empty Unique"),
        }
    }
}

impl<T> fmt::Debug for Unique<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Unique").field("ptr", &self.as_ptr()).finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn release_and_readopt()
    {
        let mut u = Unique::new(String::from("abc"));
        assert_eq!(u.length(), 3);

        let raw = u.release();
        assert!(u.is_empty());
        assert!(u.as_ptr().is_null());
        assert!(u.release().is_null());

        let v = unsafe { Unique::from_raw(raw) };
        assert_eq!(&*v, "abc");
        assert!(unsafe { Unique::<u8>::from_raw(ptr::null_mut()) }.is_empty());
    }

    #[test]
    fn reset_and_take()
    {
        let mut u = Unique::new(vec![1, 2]);
        u.push(3);
        assert_eq!(u.length(), 3);

        let w = u.take();
        assert!(u.is_empty());
        assert_eq!(u.length(), 0);
        assert_eq!(w.get(), Some(&vec![1, 2, 3]));

        u.reset_to(Box::new(vec![9]));
        assert_eq!(*u, vec![9]);
        u.reset();
        assert!(u.get().is_none());
    }

    #[test]
    #[should_panic(expected = "empty Unique")]
    fn deref_empty_panics()
    {
        let u = Unique::<u32>::default();
        let _v: u32 = *u;
    }
}
