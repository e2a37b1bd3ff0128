use crate::{PageSize, PhysicalAddress};
use core::fmt;
use core::marker::PhantomData;

/// Physical page frame of size `S`.
///
/// A `PhysicalPage<S>` represents the **page-aligned base** of a physical
/// frame of `S::SIZE` bytes. Frames are numbered from physical address zero,
/// so the frame number doubles as the index into a table describing all of RAM.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero (page aligned).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pp = PhysicalPage::<Size4K>::from_number(3);
/// assert_eq!(pp.base().as_u64(), 0x3000);
/// assert_eq!(PhysicalAddress::new(0x3FFF).page::<Size4K>(), pp);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize> {
    base: u64,
    _size: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// The frame containing `p` (aligns down).
    #[inline]
    #[must_use]
    pub const fn from_addr(p: PhysicalAddress) -> Self {
        Self {
            base: p.as_u64() & !S::MASK,
            _size: PhantomData,
        }
    }

    /// Frame number `n`, i.e. the frame starting at `n * S::SIZE`.
    #[inline]
    #[must_use]
    pub const fn from_number(n: u64) -> Self {
        Self {
            base: n << S::SHIFT,
            _size: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    /// Frame number counted from physical address zero.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.base >> S::SHIFT
    }
}

impl<S> fmt::Display for PhysicalPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.base, S::NAME)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame#{}({:#X}/{})", self.number(), self.base, S::NAME)
    }
}
