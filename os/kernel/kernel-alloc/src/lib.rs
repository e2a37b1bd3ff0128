//! # Kernel Physical Frame Allocation
//!
//! This crate bootstraps the kernel's usable memory: it learns the RAM size
//! from the boot loader's ATAG chain, reserves the frames occupied by the
//! kernel image, and manages every other 4 KiB page frame through a FIFO
//! free list.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Kernel Frame Allocator (boot)          │
//! │    • One global instance behind a spin lock         │
//! │    • init / allocate_page / free_page               │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Frame Allocator                  │
//! │    • Kernel footprint reservation                   │
//! │    • FIFO free list of page frames                  │
//! │    • Zeroing on allocation                          │
//! └───────┬─────────────────────────────────┬───────────┘
//!         │                                 │
//! ┌───────▼───────────────┐   ┌─────────────▼───────────┐
//! │      Frame Table      │   │     Physical Mapper     │
//! │ • one record / frame  │   │ • physical → pointer    │
//! │ • intrusive links     │   │ • identity or offset    │
//! └───────────────────────┘   └─────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Intrusive List ([`intrusive_list`])
//!
//! A doubly-linked list over records stored in a caller-owned slice. Records
//! embed their [`Links`](intrusive_list::Links); the list tracks membership
//! only and never owns or allocates memory.
//!
//! ### Frame Table ([`frame_table`])
//!
//! One [`PageFrame`](frame_table::PageFrame) per physical frame. A record's
//! position is its frame number, so `index * PAGE_SIZE` is the frame address.
//!
//! ### Physical Frame Allocator ([`frame_alloc`])
//!
//! Ties table and list together:
//! * **Initialization**: reserve `ceil(kernel_end / PAGE_SIZE)` frames for the
//!   kernel, append all others to the free list in ascending order
//! * **Allocation**: O(1) pop from the head, frame zeroed before it is returned
//! * **Release**: O(1) append to the tail, no zeroing
//! * **Exhaustion**: reported as
//!   [`FrameAllocError::Exhausted`](frame_alloc::FrameAllocError::Exhausted), never a panic
//!
//! ### Physical Mapper ([`phys_mapper`])
//!
//! Turns physical addresses into pointers of the current address space, for
//! placing the frame table and zeroing frames.
//!
//! ## Usage Example
//!
//! ```rust
//! use kernel_alloc::frame_alloc::FrameAllocator;
//! use kernel_alloc::frame_table::{FrameTable, PageFrame};
//! use kernel_alloc::phys_mapper::OffsetPhysMapper;
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! // 64 KiB of "RAM", the first 8 KiB taken by the kernel image.
//! let mut ram = vec![0u64; 64 * 1024 / 8];
//! let mapper = OffsetPhysMapper::new(ram.as_mut_ptr().expose_provenance() as u64);
//! let mut storage = [PageFrame::ZEROED; 16];
//!
//! let mut frames = unsafe {
//!     FrameAllocator::new(
//!         64 * 1024,
//!         PhysicalAddress::new(0x2000),
//!         FrameTable::new(&mut storage),
//!         mapper,
//!     )
//! }?;
//! assert_eq!(frames.free_frames(), 14);
//!
//! let page = frames.allocate_page()?;
//! assert_eq!(page, PhysicalAddress::new(0x2000));
//! unsafe { frames.free_page(page) };
//! # Ok::<(), kernel_alloc::frame_alloc::FrameAllocError>(())
//! ```
//!
//! ## Integration Points
//!
//! * **kernel-info**: ATAG parsing and the page size
//! * **kernel-memory-addresses**: typed physical and virtual addresses
//! * **kernel-sync**: the lock and once-cell holding the global allocator

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod boot;
pub mod frame_alloc;
pub mod frame_table;
pub mod intrusive_list;
pub mod phys_mapper;

pub use frame_alloc::{FrameAllocError, FrameAllocator, FrameStats};
pub use frame_table::{FrameFlags, FrameTable, PageFrame};
pub use phys_mapper::{OffsetPhysMapper, PhysMapper};
