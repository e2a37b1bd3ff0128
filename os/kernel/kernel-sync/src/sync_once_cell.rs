use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

/// 0 = UNINIT, 1 = INITING, 2 = READY
const UNINIT: u8 = 0;
const INITING: u8 = 1;
const READY: u8 = 2;

/// Failure of [`SyncOnceCell::try_init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OnceInitError<E> {
    /// The cell was already initialized, or is being initialized.
    #[error("the cell is already initialized")]
    AlreadyInitialized,
    /// The initializer failed; the cell stays empty.
    #[error("initialization failed: {0}")]
    Init(E),
}

/// A cell written at most once, safe to place in a `static`.
///
/// The value is never dropped; cells are meant for state that lives as long
/// as the kernel does.
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns `Some(&T)` if already initialized.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY guarantees the write is done
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// # Safety
    /// The state must be READY, or the caller must be the initializer that
    /// just wrote the value.
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        unsafe { &*(*self.value.get()).as_ptr() }
    }

    /// Run a fallible initializer, but only if nobody initialized the cell
    /// before.
    ///
    /// The initializer never runs against an already initialized cell, or
    /// while another caller is initializing it; it may rewrite memory the
    /// existing value points to. A failed initializer leaves the cell empty
    /// for a later attempt.
    pub fn try_init<E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, OnceInitError<E>> {
        if self
            .state
            .compare_exchange(UNINIT, INITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(OnceInitError::AlreadyInitialized);
        }

        match init() {
            Ok(v) => Ok(self.publish(v)),
            Err(e) => {
                self.state.store(UNINIT, Ordering::Release);
                Err(OnceInitError::Init(e))
            }
        }
    }

    /// Write the value and mark the cell READY. Caller must hold INITING.
    fn publish(&self, v: T) -> &T {
        unsafe {
            (*self.value.get()).write(v);
        }
        // Publish value before marking READY
        self.state.store(READY, Ordering::Release);
        // SAFETY: just wrote it
        unsafe { self.get_unchecked() }
    }
}

// Safety: shared after READY; initialization is single-writer.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
