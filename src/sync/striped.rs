//! Striped read/write locks

use crossbeam::utils::CachePadded;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of lock stripes. Table lengths are powers of two no smaller than
/// this, so a bucket index and the hash that routed to it share a stripe.
pub const STRIPES: usize = 256;

/// A fixed array of independent read/write locks selected by `hash & (STRIPES - 1)`
pub struct StripedLock {
    stripes: Box<[CachePadded<RwLock<()>>]>,
}

impl StripedLock {
    pub fn new() -> Self {
        let stripes = (0..STRIPES)
            .map(|_| CachePadded::new(RwLock::new(())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { stripes }
    }

    /// Stripe that owns `hash` (or a bucket index)
    #[inline]
    pub fn stripe_for(hash: u64) -> usize {
        (hash & (STRIPES as u64 - 1)) as usize
    }

    #[inline]
    pub fn read(&self, stripe: usize) -> RwLockReadGuard<'_, ()> {
        self.stripes[stripe].read()
    }

    #[inline]
    pub fn write(&self, stripe: usize) -> RwLockWriteGuard<'_, ()> {
        self.stripes[stripe].write()
    }

    /// Write-lock every stripe in ascending order
    pub fn write_all(&self) -> Vec<RwLockWriteGuard<'_, ()>> {
        self.stripes.iter().map(|stripe| stripe.write()).collect()
    }

    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }
}

impl Default for StripedLock {
    fn default() -> Self {
        Self::new()
    }
}
