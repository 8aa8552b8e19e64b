use std::{
    alloc::Layout,
    ptr::NonNull,
};

use thiserror::Error;

/// Returned by the fallible constructors when the global allocator refuses
/// a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation of {} bytes (align {}) failed", .layout.size(), .layout.align())]
pub struct AllocError
{
    /// The layout that could not be allocated.
    pub layout: Layout,
}

/// Raw allocation entry point of the fallible constructors. Memory it
/// returns is released through the global allocator, so anything other than
/// `alloc::alloc` must forward to it.
pub(crate) type RawAlloc = unsafe fn(Layout) -> *mut u8;

/// Fallible `Box::new` drawing memory from `raw`. On failure `it` is dropped.
pub(crate) fn try_box_with<T>(it: T, raw: RawAlloc) -> Result<Box<T>, AllocError>
{
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::new(it));
    }

    let ptr = unsafe { raw(layout) } as *mut T;
    match NonNull::new(ptr) {
        Some(ptr) => unsafe {
            ptr.as_ptr().write(it);
            Ok(Box::from_raw(ptr.as_ptr()))
        },
        None => Err(AllocError { layout }),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::alloc;

    #[test]
    fn boxed_value_is_kept()
    {
        let b = try_box_with(vec![1u8, 2, 3], alloc::alloc).unwrap();
        assert_eq!(*b, vec![1, 2, 3]);

        assert!(try_box_with((), alloc::alloc).is_ok());
    }

    #[test]
    fn refused_allocation_drops_value()
    {
        unsafe fn refuse(_: Layout) -> *mut u8 { std::ptr::null_mut() }

        let dropped = std::rc::Rc::new(());
        let err = try_box_with(dropped.clone(), refuse).unwrap_err();
        assert_eq!(err.layout, Layout::new::<std::rc::Rc<()>>());
        assert_eq!(std::rc::Rc::strong_count(&dropped), 1);

        // Zero-sized values never reach the allocator.
        assert!(try_box_with((), refuse).is_ok());
    }

    #[test]
    fn message_names_layout()
    {
        let err = AllocError {
            layout: Layout::from_size_align(8, 8).unwrap(),
        };
        assert_eq!(err.to_string(), "allocation of 8 bytes (align 8) failed");
    }
}
