use allocator_api2::alloc::AllocError;
use crate::{
    access::{ Access, Const, Mutable },
    control_block::ControlBlock,
    deleter::{ DefaultDelete, Deleter }
};
use std::{
    fmt::{ self, Debug, Display },
    hash::{ Hash, Hasher },
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::Deref,
    ptr::{ self, NonNull }
};

// std::shared_ptr
//
// `_ptr` is kept next to `_rep` so reads don't have to go through the type-erased control
// block. Every SharedPtr in an ownership group points at the same `_rep`.
pub struct SharedPtr<T, M = Mutable>
where M: Access
{
    _ptr: *mut T,
    _rep: Option<NonNull<ControlBlock>>,
    _owns: PhantomData<T>,
    _access: PhantomData<M>
}

// std::shared_ptr<const T>
pub type ConstSharedPtr<T> = SharedPtr<T, Const>;

// The last owner can be on any thread, so the object has to be droppable from anywhere
unsafe impl<T, M> Send for SharedPtr<T, M> where T: Send + Sync, M: Access {}
unsafe impl<T, M> Sync for SharedPtr<T, M> where T: Send + Sync, M: Access {}

fn erase<T, D>(ptr: *mut T, deleter: D) -> impl FnOnce()
where D: Deleter<T>
{
    move || unsafe { deleter.delete(ptr) }
}

impl<T, M> SharedPtr<T, M>
where M: Access
{
    fn from_raw_parts(_ptr: *mut T, _rep: Option<NonNull<ControlBlock>>) -> Self {
        Self { _ptr, _rep, _owns: PhantomData, _access: PhantomData }
    }

    /// An empty pointer which doesn't own anything.
    pub const fn null() -> Self {
        Self {
            _ptr: ptr::null_mut(),
            _rep: None,
            _owns: PhantomData,
            _access: PhantomData
        }
    }

    /// Move out of this pointer, leaving it empty. The share count doesn't change.
    pub fn take(&mut self) -> Self { std::mem::replace(self, Self::null()) }

    /// Give up this pointer's share. If it was the last one, the object is destroyed before
    /// this returns.
    pub fn reset(&mut self) {
        let rep = self._rep.take();
        self._ptr = ptr::null_mut();
        if let Some(rep) = rep {
            unsafe { ControlBlock::release(rep); }
        }
    }

    /// Replace the managed object with `ptr`. Does nothing if `ptr` is already the managed
    /// object.
    ///
    /// # Safety
    /// Same as [`SharedPtr::from_raw`].
    pub unsafe fn assign_raw(&mut self, ptr: *mut T) -> Result<(), AllocError> {
        unsafe { self.assign_raw_with_deleter(ptr, DefaultDelete) }
    }

    /// Replace the managed object with `ptr`, freed through `deleter`. The new control block is
    /// allocated before the current share is released, so on error `self` is left as it was.
    /// Does nothing (and drops `deleter`) if `ptr` is already the managed object.
    ///
    /// # Safety
    /// Same as [`SharedPtr::from_raw_with_deleter`].
    pub unsafe fn assign_raw_with_deleter<D>(&mut self, ptr: *mut T, deleter: D) -> Result<(), AllocError>
    where D: Deleter<T>
    {
        if ptr == self._ptr {
            return Ok(());
        }
        let rep = ControlBlock::new(erase(ptr, deleter))?;
        let old = std::mem::replace(self, Self::from_raw_parts(ptr, Some(rep)));
        drop(old);
        Ok(())
    }

    /// Join `other`'s ownership group. Does nothing if both are already in the same one.
    pub fn assign(&mut self, other: &Self) {
        if !self.same_owner(other) {
            // clone joins the new group before the old share is released
            *self = other.clone();
        }
    }

    pub fn swap(&mut self, other: &mut Self) { std::mem::swap(self, other) }

    /// True if both share one control block (or both are empty).
    pub fn same_owner<N>(&self, other: &SharedPtr<T, N>) -> bool
    where N: Access
    {
        self._rep == other._rep
    }

    pub fn get(&self) -> Option<&T> { unsafe { self._ptr.as_ref() } }
    pub fn as_ptr(&self) -> *const T { self._ptr }

    pub fn use_count(&self) -> usize {
        match self._rep {
            Some(rep) => unsafe { rep.as_ref() }.count(),
            None => 0
        }
    }
    pub fn unique(&self) -> bool { self.use_count() == 1 }
    pub fn is_empty(&self) -> bool { self._rep.is_none() }
    pub fn is_null(&self) -> bool { self._ptr.is_null() }
}

impl<T> SharedPtr<T, Mutable> {
    /// Move `value` to the heap and start a new ownership group for it.
    pub fn new(value: T) -> Self { Self::from_box(Box::new(value)) }

    pub fn try_new(value: T) -> Result<Self, AllocError> {
        let raw = Box::into_raw(Box::new(value));
        unsafe { Self::try_from_raw_with_deleter(raw, DefaultDelete) }
            .inspect_err(|_| drop(unsafe { Box::from_raw(raw) }))
    }

    pub fn from_box(value: Box<T>) -> Self {
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }

    /// Take ownership of `ptr`, freeing it with [`DefaultDelete`] once the last owner is gone.
    ///
    /// # Safety
    /// `ptr` must be null or come from `Box::into_raw`, and nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        unsafe { Self::from_raw_with_deleter(ptr, DefaultDelete) }
    }

    /// Take ownership of `ptr`, handing it to `deleter` once the last owner is gone. A null
    /// `ptr` still creates an ownership group, `deleter` then receives null.
    ///
    /// # Safety
    /// `ptr` must stay valid until `deleter` runs, and nothing else may free it.
    pub unsafe fn from_raw_with_deleter<D>(ptr: *mut T, deleter: D) -> Self
    where D: Deleter<T>
    {
        Self::from_raw_parts(ptr, Some(ControlBlock::new_or_abort(erase(ptr, deleter))))
    }

    /// Like [`SharedPtr::from_raw_with_deleter`], but reports a failed control block
    /// allocation. On failure `deleter` is dropped without being called and the caller still
    /// owns `ptr`.
    ///
    /// # Safety
    /// Same as [`SharedPtr::from_raw_with_deleter`].
    pub unsafe fn try_from_raw_with_deleter<D>(ptr: *mut T, deleter: D) -> Result<Self, AllocError>
    where D: Deleter<T>
    {
        let rep = ControlBlock::new(erase(ptr, deleter))?;
        Ok(Self::from_raw_parts(ptr, Some(rep)))
    }

    pub fn as_mut_ptr(&self) -> *mut T { self._ptr }

    /// Mutable access, only handed out while this is the sole owner.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self.unique() {
            true => unsafe { self._ptr.as_mut() },
            false => None
        }
    }

    /// # Safety
    /// The pointer must be non-null and nothing else may access the object for as long as the
    /// returned reference is alive, including through other owners on other threads.
    pub unsafe fn get_mut_unchecked(&mut self) -> &mut T { unsafe { &mut *self._ptr } }

    /// Share the object read-only. Both pointers end up in the same ownership group.
    pub fn to_const(&self) -> ConstSharedPtr<T> { self.clone().into_const() }

    /// Turn this into a read-only pointer without touching the share count.
    pub fn into_const(self) -> ConstSharedPtr<T> {
        let this = ManuallyDrop::new(self);
        SharedPtr::from_raw_parts(this._ptr, this._rep)
    }
}

impl<T, M> Clone for SharedPtr<T, M>
where M: Access
{
    fn clone(&self) -> Self {
        if let Some(rep) = self._rep {
            unsafe { rep.as_ref() }.increment();
        }
        Self::from_raw_parts(self._ptr, self._rep)
    }

    fn clone_from(&mut self, source: &Self) { self.assign(source) }
}

impl<T, M> Drop for SharedPtr<T, M>
where M: Access
{
    fn drop(&mut self) { self.reset() }
}

impl<T, M> Default for SharedPtr<T, M>
where M: Access
{
    fn default() -> Self { Self::null() }
}

impl<T> From<SharedPtr<T, Mutable>> for SharedPtr<T, Const> {
    fn from(value: SharedPtr<T, Mutable>) -> Self { value.into_const() }
}

impl<T> From<&SharedPtr<T, Mutable>> for SharedPtr<T, Const> {
    fn from(value: &SharedPtr<T, Mutable>) -> Self { value.to_const() }
}

impl<T> From<Box<T>> for SharedPtr<T, Mutable> {
    fn from(value: Box<T>) -> Self { Self::from_box(value) }
}

impl<T, M> Deref for SharedPtr<T, M>
where M: Access
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        assert!(!self._ptr.is_null(), "Tried to dereference a null {}", M::NAME);
        unsafe { &*self._ptr }
    }
}

impl<T, M, N> PartialEq<SharedPtr<T, N>> for SharedPtr<T, M>
where M: Access,
      N: Access
{
    fn eq(&self, other: &SharedPtr<T, N>) -> bool { ptr::eq(self._ptr, other._ptr) }
}

impl<T, M> Eq for SharedPtr<T, M> where M: Access {}

impl<T, M> Hash for SharedPtr<T, M>
where M: Access
{
    fn hash<H>(&self, state: &mut H)
    where H: Hasher
    {
        ptr::hash(self._ptr, state)
    }
}

impl<T, M> Debug for SharedPtr<T, M>
where T: Debug,
      M: Access
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ data: {:?}, strong: {} }}", M::NAME, self.get(), self.use_count())
    }
}

impl<T, M> Display for SharedPtr<T, M>
where T: Display,
      M: Access
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "null")
        }
    }
}

impl<T, M> fmt::Pointer for SharedPtr<T, M>
where M: Access
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

pub fn swap<T, M>(lhs: &mut SharedPtr<T, M>, rhs: &mut SharedPtr<T, M>)
where M: Access
{
    lhs.swap(rhs)
}
