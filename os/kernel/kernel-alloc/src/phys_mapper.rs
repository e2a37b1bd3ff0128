//! # Physical Memory Access
//!
//! The frame allocator has to touch physical memory twice: to lay out the
//! frame table right after the kernel image, and to zero every frame it hands
//! out. Code can only dereference addresses of the current address space, so
//! both go through a [`PhysMapper`].
//!
//! ## Mapping strategies
//! - **Pre-MMU kernel**: physical memory is identity mapped;
//!   [`OffsetPhysMapper::IDENTITY`] returns the physical address unchanged.
//! - **Direct map**: physical memory visible at a fixed offset (a higher-half
//!   direct map, or a host buffer standing in for RAM in tests);
//!   [`OffsetPhysMapper::new`] adds that offset.

use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::PhysicalAddress;

/// Converts physical addresses to pointers in the current address space.
pub trait PhysMapper {
    /// Pointer through which the bytes at `pa` can be accessed.
    ///
    /// Producing the pointer is safe; dereferencing it is only valid when
    /// `pa` is backed by memory mapped in the current address space.
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T;

    /// Fill the frame starting at `pa` with zeros.
    ///
    /// # Safety
    /// The [`PAGE_SIZE`] bytes starting at `pa` must be mapped, writable, and
    /// not referenced by anyone else.
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn zero_frame(&self, pa: PhysicalAddress) {
        let frame = self.phys_to_ptr::<u8>(pa);
        // SAFETY: forwarded to the caller.
        unsafe { core::ptr::write_bytes(frame, 0, PAGE_SIZE as usize) };
    }
}

/// [`PhysMapper`] for memory visible at `pa + offset`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OffsetPhysMapper {
    offset: u64,
}

impl OffsetPhysMapper {
    /// Identity mapping, as set up for the kernel before paging is enabled.
    pub const IDENTITY: Self = Self::new(0);

    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }
}

impl PhysMapper for OffsetPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let va = pa.as_u64().wrapping_add(self.offset);
        core::ptr::with_exposed_provenance_mut(va as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_address() {
        let p = OffsetPhysMapper::IDENTITY.phys_to_ptr::<u8>(PhysicalAddress::new(0x9000));
        assert_eq!(p.addr(), 0x9000);
    }

    #[test]
    fn offset_mapper_zeroes_backing_frame() {
        let mut ram = vec![0xAB_u8; 3 * PAGE_SIZE as usize];
        let base = ram.as_mut_ptr().expose_provenance() as u64;
        let mapper = OffsetPhysMapper::new(base);

        unsafe { mapper.zero_frame(PhysicalAddress::new(PAGE_SIZE)) };

        let page = PAGE_SIZE as usize;
        assert!(ram[..page].iter().all(|&b| b == 0xAB));
        assert!(ram[page..2 * page].iter().all(|&b| b == 0));
        assert!(ram[2 * page..].iter().all(|&b| b == 0xAB));
    }
}
