use allocator_api2::alloc::{ AllocError, Allocator, Global };
use log::trace;
use std::{
    alloc::Layout,
    mem::ManuallyDrop,
    ptr::NonNull,
    sync::atomic::{
        AtomicUsize,
        Ordering
    }
};

// Counts past this can only come from leaked owners, bail out before the counter wraps
const MAX_COUNT: usize = isize::MAX as usize;

// Shared bookkeeping for one ownership group. The header is the same for every managed
// type, the typed destruction action lives right behind it in the same allocation and is
// only reachable through `destroy`.
#[repr(C)]
pub struct ControlBlock {
    uses: AtomicUsize,
    destroy: unsafe fn(NonNull<ControlBlock>)
}

#[repr(C)]
struct ControlBlockWith<D> {
    header: ControlBlock,
    action: ManuallyDrop<D>
}

impl ControlBlock {
    fn get_layout<D>() -> Layout { Layout::new::<ControlBlockWith<D>>() }

    /// Allocate a fresh control block with a strong count of 1. `action` is invoked exactly
    /// once when the count drops back to zero.
    pub fn new<D>(action: D) -> Result<NonNull<Self>, AllocError>
    where D: FnOnce()
    {
        let block = Global.allocate(Self::get_layout::<D>())?.cast::<ControlBlockWith<D>>();
        unsafe {
            std::ptr::write(block.as_ptr(), ControlBlockWith {
                header: ControlBlock {
                    uses: AtomicUsize::new(1),
                    destroy: Self::destroy_erased::<D>
                },
                action: ManuallyDrop::new(action)
            });
        }
        trace!("control block {:p} created", block);
        Ok(block.cast())
    }

    /// Same as [`ControlBlock::new`], but allocation failure goes to `handle_alloc_error`.
    pub fn new_or_abort<D>(action: D) -> NonNull<Self>
    where D: FnOnce()
    {
        match Self::new(action) {
            Ok(block) => block,
            Err(_) => std::alloc::handle_alloc_error(Self::get_layout::<D>())
        }
    }

    unsafe fn destroy_erased<D>(this: NonNull<ControlBlock>)
    where D: FnOnce()
    {
        let block = this.cast::<ControlBlockWith<D>>();
        // free the block even if the action unwinds
        let _free = scopeguard::guard(block, |block| unsafe {
            Global.deallocate(block.cast(), Self::get_layout::<D>());
        });
        let action = unsafe { ManuallyDrop::take(&mut (*block.as_ptr()).action) };
        trace!("control block {:p} destroyed", this);
        action();
    }

    pub fn increment(&self) {
        let old = self.uses.fetch_add(1, Ordering::AcqRel);
        if old > MAX_COUNT {
            std::process::abort();
        }
    }

    /// Returns the count from before the decrement. Whoever sees 1 is the last owner and
    /// must call [`ControlBlock::destroy`].
    pub fn decrement_and_fetch_previous(&self) -> usize {
        self.uses.fetch_sub(1, Ordering::AcqRel)
    }

    pub fn count(&self) -> usize { self.uses.load(Ordering::Acquire) }

    /// Run the destruction action, then free the block.
    ///
    /// # Safety
    /// `this` must come from [`ControlBlock::new`], its count must have just dropped to zero
    /// and no one may touch it afterwards.
    pub unsafe fn destroy(this: NonNull<Self>) {
        unsafe {
            let destroy = (*this.as_ptr()).destroy;
            destroy(this)
        }
    }

    /// Give up one share of the group, destroying it if this was the last one. Returns true
    /// if the block was destroyed.
    ///
    /// # Safety
    /// The caller must own one share of `this` and must not use it after the call.
    pub unsafe fn release(this: NonNull<Self>) -> bool {
        let previous = unsafe { this.as_ref() }.decrement_and_fetch_previous();
        if previous == 1 {
            unsafe { Self::destroy(this) };
            true
        } else {
            false
        }
    }
}
