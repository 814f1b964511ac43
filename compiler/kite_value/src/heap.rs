//! Shared heap storage for values.
//!
//! `Heap<T>` is a thin `Arc` wrapper with a crate-private constructor, so all
//! heap values are created through `Value` factory methods and the
//! collection constructors in this crate.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Reference-counted heap cell.
#[repr(transparent)]
pub struct Heap<T: ?Sized>(Arc<T>);

impl<T> Heap<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }
}

impl<T: ?Sized> Heap<T> {
    /// Whether two handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Address of the allocation, used as an identity key.
    #[inline]
    pub fn addr(this: &Self) -> usize {
        Arc::as_ptr(&this.0).cast::<()>() as usize
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_allocation() {
        let a = Heap::new(String::from("x"));
        let b = a.clone();
        assert!(Heap::ptr_eq(&a, &b));
        assert_eq!(Heap::addr(&a), Heap::addr(&b));
    }

    #[test]
    fn distinct_allocations_differ() {
        let a = Heap::new(1);
        let b = Heap::new(1);
        assert!(!Heap::ptr_eq(&a, &b));
    }
}
