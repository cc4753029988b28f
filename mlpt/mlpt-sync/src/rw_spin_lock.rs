use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering},
};

/// Set while a writer holds the lock.
const WRITER: usize = 1;

/// Set while a writer spins in [`RwSpinLock::write`].
const PENDING: usize = 2;

/// Added per active reader.
const READER: usize = 4;

/// Readers-writer spin lock.
///
/// Any number of readers, or exactly one writer. A writer spinning in
/// [`write`](Self::write) raises a pending flag that turns new readers away,
/// so continuous reads cannot starve it; readers already inside finish first.
pub struct RwSpinLock<T> {
    /// lock state
    /// * `0`: unlocked
    /// * `WRITER`: held exclusively
    /// * `n * READER`: held by `n` readers
    /// * `PENDING`: may be combined with either; a writer is waiting
    state: AtomicUsize,
    inner: UnsafeCell<T>,
}

// Safety: readers share &T across threads, the writer moves &mut T between them.
unsafe impl<T: Send + Sync> Sync for RwSpinLock<T> {}
unsafe impl<T: Send> Send for RwSpinLock<T> {}

impl<T> RwSpinLock<T> {
    #[must_use]
    pub const fn new(inner: T) -> Self {
        Self {
            state: AtomicUsize::new(0),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Try once to take the shared side.
    #[inline]
    #[must_use]
    pub fn try_read(&self) -> Option<RwSpinReadGuard<'_, T>> {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            if current & (WRITER | PENDING) != 0 {
                return None;
            }
            match self.state.compare_exchange_weak(
                current,
                current + READER,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(RwSpinReadGuard { lock: self }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Try once to take the exclusive side.
    ///
    /// Succeeds while nobody holds the lock, even if another writer is pending.
    #[inline]
    #[must_use]
    pub fn try_write(&self) -> Option<RwSpinWriteGuard<'_, T>> {
        let current = self.state.load(Ordering::Relaxed);
        if current & !PENDING != 0 {
            return None;
        }
        self.state
            .compare_exchange(current, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RwSpinWriteGuard { lock: self })
    }

    /// Spin until the shared side is acquired.
    #[inline]
    pub fn read(&self) -> RwSpinReadGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_read() {
                return guard;
            }
            while self.state.load(Ordering::Relaxed) & (WRITER | PENDING) != 0 {
                spin_loop();
            }
        }
    }

    /// Spin until the exclusive side is acquired.
    ///
    /// Announces the wait with the pending flag; acquiring clears it.
    #[inline]
    pub fn write(&self) -> RwSpinWriteGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_write() {
                return guard;
            }
            self.state.fetch_or(PENDING, Ordering::Relaxed);
            while self.state.load(Ordering::Relaxed) & !PENDING != 0 {
                spin_loop();
            }
        }
    }

    /// Closure convenience over [`read`](Self::read).
    #[inline]
    pub fn with_read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let g = self.read();
        f(&g)
    }

    /// Closure convenience over [`write`](Self::write).
    #[inline]
    pub fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.write();
        f(&mut g)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for RwSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[must_use = "dropping the guard releases the lock immediately"]
pub struct RwSpinReadGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> Drop for RwSpinReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(READER, Ordering::Release);
    }
}

#[must_use = "dropping the guard releases the lock immediately"]
pub struct RwSpinWriteGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for RwSpinWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for RwSpinWriteGuard<'_, T> {
    fn drop(&mut self) {
        // Keeps PENDING raised by writers that queued up meanwhile.
        self.lock.state.fetch_and(!WRITER, Ordering::Release);
    }
}
