//! # Kernel Frame Allocator
//!
//! The single allocator the kernel uses after boot, reachable from anywhere.
//!
//! [`init`] builds it once from the boot loader's ATAG chain and the end of
//! the kernel image. Every [`allocate_page`] and [`free_page`] call runs
//! under one [`SpinLock`] critical section covering the whole operation.

#![allow(unsafe_code)]

use crate::frame_alloc::{FrameAllocError, FrameAllocator, FrameStats};
use crate::phys_mapper::OffsetPhysMapper;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{OnceInitError, SpinLock, SyncOnceCell};

/// Global frame allocator state; empty until [`init`].
static FRAMES: SyncOnceCell<SpinLock<FrameAllocator<'static, OffsetPhysMapper>>> =
    SyncOnceCell::new();

/// Initialize the kernel frame allocator for identity-mapped physical memory.
///
/// Returns the frame counts right after initialization.
///
/// # Errors
/// - [`FrameAllocError::AlreadyInitialized`] on every call after the first
///   successful one; the allocator is left untouched.
/// - Construction errors of [`FrameAllocator::place_after_kernel`].
///
/// # Safety
/// See [`FrameAllocator::place_after_kernel`].
pub unsafe fn init(
    tags: *const u32,
    kernel_end: PhysicalAddress,
) -> Result<FrameStats, FrameAllocError> {
    // SAFETY: forwarded to the caller.
    unsafe { init_with_mapper(tags, kernel_end, OffsetPhysMapper::IDENTITY) }
}

/// [`init`] for physical memory visible through `mapper`.
///
/// # Errors
/// See [`init`].
///
/// # Safety
/// See [`FrameAllocator::place_after_kernel`].
pub unsafe fn init_with_mapper(
    tags: *const u32,
    kernel_end: PhysicalAddress,
    mapper: OffsetPhysMapper,
) -> Result<FrameStats, FrameAllocError> {
    let frames = FRAMES
        .try_init(|| {
            // SAFETY: forwarded to the caller.
            unsafe { FrameAllocator::place_after_kernel(tags, kernel_end, mapper) }
                .map(SpinLock::new)
        })
        .map_err(|e| match e {
            OnceInitError::AlreadyInitialized => FrameAllocError::AlreadyInitialized,
            OnceInitError::Init(e) => e,
        })?;
    Ok(frames.with_lock(|frames| frames.stats()))
}

/// Whether [`init`] succeeded.
#[must_use]
pub fn is_initialized() -> bool {
    FRAMES.is_initialized()
}

/// Allocate one zeroed 4 KiB frame.
///
/// # Errors
/// - [`FrameAllocError::Exhausted`] if no frame is free.
/// - [`FrameAllocError::NotInitialized`] before [`init`].
pub fn allocate_page() -> Result<PhysicalAddress, FrameAllocError> {
    FRAMES
        .get()
        .ok_or(FrameAllocError::NotInitialized)?
        .with_lock(FrameAllocator::allocate_page)
}

/// Return a frame obtained from [`allocate_page`].
///
/// # Safety
/// See [`FrameAllocator::free_page`]. Calling this before [`init`] is a
/// contract violation; debug builds assert, release builds ignore the call.
pub unsafe fn free_page(pa: PhysicalAddress) {
    let frames = FRAMES.get();
    debug_assert!(frames.is_some(), "freeing {pa} before frame allocator initialization");
    if let Some(frames) = frames {
        // SAFETY: forwarded to the caller.
        frames.with_lock(|frames| unsafe { frames.free_page(pa) });
    }
}

/// Current frame counts, `None` before [`init`].
#[must_use]
pub fn stats() -> Option<FrameStats> {
    FRAMES.get().map(|frames| frames.with_lock(|frames| frames.stats()))
}
