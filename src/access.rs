// Type-level stand-ins for `T` and `const T`. A SharedPtr<T, Const> shares the same control
// block as the SharedPtr<T, Mutable> it came from, it just can't hand out mutable access.

mod sealed {
    pub trait Sealed {}
}

pub trait Access: sealed::Sealed + 'static {
    const NAME: &'static str;
}

/// Read/write access to the managed object (`std::shared_ptr<T>`).
#[derive(Debug)]
pub enum Mutable {}

/// Read-only access to the managed object (`std::shared_ptr<const T>`).
#[derive(Debug)]
pub enum Const {}

impl sealed::Sealed for Mutable {}
impl sealed::Sealed for Const {}

impl Access for Mutable {
    const NAME: &'static str = "SharedPtr";
}
impl Access for Const {
    const NAME: &'static str = "ConstSharedPtr";
}
