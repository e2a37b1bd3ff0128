//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for the raw addresses handled by the early boot
//! memory code: physical addresses, the page frames that contain them, and the
//! identity-mapped virtual addresses the kernel runs at before paging exists.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw physical address (RAM or MMIO). |
//! | [`PhysicalPage<S>`] | The page-aligned base of a physical frame of size `S`. |
//! | [`VirtualAddress`] | An address in the current (identity-mapped) address space. |
//!
//! Frames are numbered from physical address zero: frame `n` of size `S`
//! starts at `n * S::SIZE`. This is the arithmetic the frame table relies on,
//! so it lives here rather than being repeated as raw divisions in callers.
//!
//! ## Page Sizes
//!
//! Only the 4 KiB base granularity is supported ([`Size4K`]). The
//! [`PageSize`] trait keeps the size at the type level so conversions stay
//! explicit.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x9042);
//! let frame = pa.page::<Size4K>();
//! assert_eq!(frame.number(), 9);
//! assert_eq!(frame.base().as_u64(), 0x9000);
//! assert_eq!(pa.checked_align_up::<Size4K>(), Some(PhysicalAddress::new(0xA000)));
//! assert_eq!(PhysicalPage::<Size4K>::from_number(9).base(), frame.base());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
