use core::cell::{RefCell, RefMut};

/// Interior mutability for uniprocessor-only statics.
pub struct UPSafeCell<T> {
    inner: RefCell<T>,
}

unsafe impl<T> Sync for UPSafeCell<T> {}

impl<T> UPSafeCell<T> {
    /// Caller guarantees the cell is only ever touched from a single core.
    pub unsafe fn new(value: T) -> Self {
        UPSafeCell {
            inner: RefCell::new(value),
        }
    }

    /// Always hands out a mutable reference, so a second simultaneous
    /// borrow panics instead of aliasing.
    pub fn exclusive_access(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }
}
