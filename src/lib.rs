//! Thread-safe, reference-counted shared ownership modelled on `std::shared_ptr`: one control
//! block per ownership group, type-erased deleters and read-only (`const T`) views that share
//! the same group.

pub mod access;
pub mod control_block;
pub mod deleter;
pub mod shared_ptr;

#[cfg(test)]
pub(crate) mod traced;

pub use access::{ Access, Const, Mutable };
pub use allocator_api2::alloc::AllocError;
pub use deleter::{ DefaultDelete, Deleter };
pub use shared_ptr::{ swap, ConstSharedPtr, SharedPtr };
