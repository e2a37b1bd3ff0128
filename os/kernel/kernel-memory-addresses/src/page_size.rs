use core::fmt;

mod sealed {
    pub trait Sealed {}
}

/// Type-level frame size.
///
/// Sealed; the allocator manages a single frame size, [`Size4K`].
pub trait PageSize: sealed::Sealed + Copy + Eq + fmt::Debug {
    /// Frame size in bytes, a power of two.
    const SIZE: u64;
    /// `log2(SIZE)`: the number of address bits addressing bytes within a frame.
    const SHIFT: u32;
    /// Mask selecting the in-frame offset of an address.
    const MASK: u64 = Self::SIZE - 1;
    /// Short label used when printing frames, e.g. `4K`.
    const NAME: &'static str;
}

/// 4 KiB page frame.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;

impl sealed::Sealed for Size4K {}

impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;
    const NAME: &'static str = "4K";
}

const _: () = assert!(1 << Size4K::SHIFT == Size4K::SIZE);

impl fmt::Debug for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::NAME)
    }
}
