//! # Kernel synchronization primitives
//!
//! The early memory code keeps exactly one piece of shared mutable state, the
//! frame allocator. It lives in a [`SyncOnceCell`] (constructed once during
//! boot) wrapping a [`SpinLock`] (one critical section per operation).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;
mod sync_once_cell;

pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::{OnceInitError, SyncOnceCell};
