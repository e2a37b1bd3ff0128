//! # Frame Table
//!
//! One [`PageFrame`] record per physical page frame of RAM. The record for the
//! frame starting at physical address `n * PAGE_SIZE` is entry `n`; there is
//! no address stored per record, the position is the address.
//!
//! ```text
//!  index:     0        1        2              n
//!          ┌────────┬────────┬────────┬─────┬────────┐
//!  table:  │ frame  │ frame  │ frame  │ ... │ frame  │
//!          └────────┴────────┴────────┴─────┴────────┘
//!  RAM:    0x0000   0x1000   0x2000         n * 0x1000
//! ```

#![allow(unsafe_code)]

use crate::intrusive_list::{Linked, Links};
use crate::phys_mapper::PhysMapper;
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};

/// Allocation state of a frame.
///
/// Layout (LSB→MSB):
/// - bit 0: allocated
/// - bit 1: kernel owned
/// - bits 2..31: reserved
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct FrameFlags {
    /// Handed out or reserved; never on the free list while set.
    pub allocated: bool,
    /// Owned by the kernel (its image, or allocated on its behalf).
    pub kernel_owned: bool,
    #[bits(30)]
    __: u32,
}

impl FrameFlags {
    /// Flags of a frame reserved for or handed to the kernel.
    pub const KERNEL: Self = Self::new().with_allocated(true).with_kernel_owned(true);
}

/// Metadata of one physical page frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageFrame {
    /// Virtual address the frame is mapped at; the identity address for
    /// kernel-reserved frames, zero when unmapped.
    pub mapped_address: VirtualAddress,
    pub flags: FrameFlags,
    /// Free list membership.
    links: Links,
}

impl PageFrame {
    /// The all-zero record every entry starts from.
    pub const ZEROED: Self = Self {
        mapped_address: VirtualAddress::new(0),
        flags: FrameFlags::new(),
        links: Links::UNLINKED,
    };

    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.flags.allocated()
    }

    #[must_use]
    pub const fn is_kernel_owned(&self) -> bool {
        self.flags.kernel_owned()
    }

    /// Whether the record is currently a free list member.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.links.is_linked()
    }
}

impl Default for PageFrame {
    fn default() -> Self {
        Self::ZEROED
    }
}

impl Linked for PageFrame {
    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// The array of [`PageFrame`] records describing RAM.
pub struct FrameTable<'t> {
    frames: &'t mut [PageFrame],
    /// Physical address of entry 0 when the table lives in tracked RAM.
    base: Option<PhysicalAddress>,
}

impl<'t> FrameTable<'t> {
    /// Use `frames` as the table. The storage lives outside the RAM it
    /// describes (a static in the kernel image, or host memory in tests).
    #[must_use]
    pub const fn new(frames: &'t mut [PageFrame]) -> Self {
        Self { frames, base: None }
    }

    /// Bytes occupied by a table of `num_frames` records.
    #[must_use]
    pub const fn bytes_for(num_frames: usize) -> u64 {
        (num_frames * size_of::<PageFrame>()) as u64
    }

    /// First suitably aligned table address at or after `kernel_end`.
    #[must_use]
    pub const fn placement(kernel_end: PhysicalAddress) -> PhysicalAddress {
        kernel_end.align_up_to(align_of::<PageFrame>() as u64)
    }

    /// Lay out `num_frames` zeroed records at physical address `base`.
    ///
    /// # Safety
    /// - `base` must be aligned for [`PageFrame`] (see [`placement`](Self::placement)).
    /// - The [`bytes_for`](Self::bytes_for) bytes at `base` must be mapped
    ///   through `mapper`, writable, and used by nothing else for as long as
    ///   the table exists.
    #[must_use]
    pub unsafe fn place<M: PhysMapper>(
        mapper: &M,
        base: PhysicalAddress,
        num_frames: usize,
    ) -> FrameTable<'static> {
        debug_assert_eq!(
            base,
            Self::placement(base),
            "frame table base must be aligned"
        );
        let first = mapper.phys_to_ptr::<PageFrame>(base);
        for i in 0..num_frames {
            // SAFETY: inside the region the caller handed over.
            unsafe { first.add(i).write(PageFrame::ZEROED) };
        }
        // SAFETY: all records were just initialized.
        let frames = unsafe { core::slice::from_raw_parts_mut(first, num_frames) };
        FrameTable {
            frames,
            base: Some(base),
        }
    }

    /// Shrink to the first `num_frames` records; `None` if the table is shorter.
    #[must_use]
    pub fn truncate(self, num_frames: usize) -> Option<Self> {
        let Self { frames, base } = self;
        let frames = frames.get_mut(..num_frames)?;
        Some(Self { frames, base })
    }

    /// Reset every record to [`PageFrame::ZEROED`].
    pub fn reset(&mut self) {
        self.frames.fill(PageFrame::ZEROED);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub const fn base(&self) -> Option<PhysicalAddress> {
        self.base
    }

    #[must_use]
    pub fn frames(&self) -> &[PageFrame] {
        self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [PageFrame] {
        self.frames
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PageFrame> {
        self.frames.get(index)
    }

    /// Table index of the frame containing `pa` (floor division, no
    /// alignment requirement).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_of(pa: PhysicalAddress) -> usize {
        pa.page::<Size4K>().number() as usize
    }

    /// Physical address of the frame at `index`.
    #[must_use]
    pub const fn address_of(index: usize) -> PhysicalAddress {
        PhysicalPage::<Size4K>::from_number(index as u64).base()
    }

    /// [`index_of`](Self::index_of), restricted to frames this table describes.
    #[must_use]
    pub const fn checked_index_of(&self, pa: PhysicalAddress) -> Option<usize> {
        let index = Self::index_of(pa);
        if index < self.frames.len() {
            Some(index)
        } else {
            None
        }
    }
}
