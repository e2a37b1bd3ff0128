use crate::PhysicalAddress;
use core::fmt;

/// Virtual memory address.
///
/// Before paging is enabled the kernel runs identity mapped, so the only
/// virtual addresses the frame table records are identity images of physical
/// ones. The type still keeps the two kinds apart.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    /// The identity-mapped virtual address of `pa` (`va == pa`).
    #[inline]
    #[must_use]
    pub const fn identity(pa: PhysicalAddress) -> Self {
        Self(pa.as_u64())
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}
