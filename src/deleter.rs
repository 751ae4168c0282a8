// std::default_delete and friends

/// Releases one managed instance when its ownership group ends. Any
/// `FnOnce(*mut T) + Send + 'static` closure is a deleter.
pub trait Deleter<T>: Send + 'static {
    /// # Safety
    /// Called exactly once with the pointer the group was created with, after the last
    /// owner is gone. `ptr` may be null if the group was created from a null pointer.
    unsafe fn delete(self, ptr: *mut T);
}

/// Frees a pointer that came from `Box::into_raw`. Null is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T> Deleter<T> for DefaultDelete {
    unsafe fn delete(self, ptr: *mut T) {
        if !ptr.is_null() {
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

impl<T, F> Deleter<T> for F
where F: FnOnce(*mut T) + Send + 'static
{
    unsafe fn delete(self, ptr: *mut T) { self(ptr) }
}
