//! # Memory Layout

use kernel_memory_addresses::{PageSize, Size4K};

/// Size of one physical page frame in bytes.
///
/// Fixed at build time; the frame table, the free list and the boot
/// reservation all count in units of this size.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// RAM size assumed when the boot tag chain carries no memory record.
///
/// Some boot loaders omit `ATAG_MEM`; rather than refusing to boot, the
/// kernel manages 1 GiB starting at physical address zero.
pub const FALLBACK_MEMORY_SIZE: u64 = 1024 * 1024 * 1024;

const _: () = {
    assert!(PAGE_SIZE == 4096);
    assert!(FALLBACK_MEMORY_SIZE.is_multiple_of(PAGE_SIZE));
};
