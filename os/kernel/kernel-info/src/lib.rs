//! # Kernel Boot Information
//!
//! This crate defines what the kernel learns from its boot loader before any
//! memory management exists: the ATAG record chain and the memory layout
//! constants derived from it.
//!
//! ## Overview
//!
//! On entry the boot loader passes a pointer to a chain of ATAG records
//! (register `r2` by convention). The chain is the only description of the
//! machine the kernel gets; the frame allocator needs exactly one fact from
//! it, the amount of RAM.
//!
//! ## Architecture
//!
//! ### Wire Format ([`boot`])
//! * **Record Header**: `tag_size` in 32-bit words plus a `tag` discriminant
//! * **Payloads**: `{ size, start }` regions for memory, initrd and command line
//! * **Decoded View**: [`BootTag`](boot::BootTag), one variant per record kind
//!
//! ### Chain Walking ([`atags`])
//! * **Iteration**: [`Atags`](atags::Atags) over a raw pointer or a word slice
//! * **RAM Discovery**: [`discover_memory_size`](atags::discover_memory_size),
//!   falling back to 1 GiB when no memory record exists
//! * **Summary**: [`BootSummary`](atags::BootSummary) for initrd and command line
//!
//! ### Memory Layout ([`memory`])
//! * **Page Size**: the single 4 KiB frame size
//! * **Fallback RAM Size**: used when the chain is silent
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS)             │
//! __end       ├─────────────────────────────────┤
//!             │       Frame Table               │
//!             ├─────────────────────────────────┤
//!             │    Available RAM                │
//!             │  (Managed by allocator)         │
//! RAM size    └─────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use kernel_info::atags::{Atags, BootSummary};
//! use kernel_info::boot::TagKind;
//!
//! let chain = [
//!     2, TagKind::Core.as_raw(),
//!     4, TagKind::Mem.as_raw(), 0x0100_0000, 0,
//!     4, TagKind::Cmdline.as_raw(), 64, 0x8000,
//!     0, TagKind::None.as_raw(),
//! ];
//! let summary = BootSummary::collect(Atags::from_words(&chain));
//! assert!(summary.has_core);
//! assert_eq!(summary.memory_size(), 16 * 1024 * 1024);
//! assert_eq!(summary.cmdline.map(|r| r.start), Some(0x8000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod atags;
pub mod boot;
pub mod memory;
