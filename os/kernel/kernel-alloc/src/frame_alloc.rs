//! # Physical Frame Allocator
//!
//! Hands out and takes back 4 KiB physical page frames.
//!
//! At construction every frame below the end of the kernel footprint is
//! reserved for the kernel (identity mapped, never on the free list); all
//! remaining frames are appended to the free list in ascending order.
//!
//! ```text
//!  frame:  0       k-1  k                         n-1
//!         ┌─────────────┬────────────────────────────┐
//!         │ kernel      │ free list (FIFO)           │
//!         └─────────────┴────────────────────────────┘
//!                       ▲ head                ▲ tail
//! ```
//!
//! [`allocate_page`](FrameAllocator::allocate_page) pops the head and zeroes
//! the frame; [`free_page`](FrameAllocator::free_page) appends to the tail
//! without zeroing. Frames are therefore reused oldest-freed first.

#![allow(unsafe_code)]

use crate::frame_table::{FrameFlags, FrameTable, PageFrame};
use crate::intrusive_list::{IntrusiveList, ListError};
use crate::phys_mapper::PhysMapper;
use kernel_info::atags::discover_memory_size;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{PhysicalAddress, Size4K, VirtualAddress};
use log::{debug, info};

/// Failures of the frame allocator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameAllocError {
    /// Every frame is allocated or reserved.
    #[error("no free page frames left")]
    Exhausted,
    /// The caller-provided frame table cannot describe all of RAM.
    #[error("frame table holds {available} records, {needed} required")]
    TableTooSmall { needed: usize, available: usize },
    /// A frame table placed after the kernel would extend past the end of RAM.
    #[error("frame table ending at {table_end} does not fit into {memory_size} bytes of RAM")]
    NoRoomForTable {
        table_end: PhysicalAddress,
        memory_size: u64,
    },
    /// The process-wide allocator was initialized before.
    #[error("the frame allocator is already initialized")]
    AlreadyInitialized,
    /// The process-wide allocator was used before initialization.
    #[error("the frame allocator is not initialized")]
    NotInitialized,
    /// The free list refused an operation.
    #[error(transparent)]
    List(#[from] ListError),
}

/// Frame counts of an allocator. `total == free + kernel_reserved + allocated`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// Frames describing RAM.
    pub total: usize,
    /// Frames on the free list.
    pub free: usize,
    /// Frames reserved at construction for the kernel footprint.
    pub kernel_reserved: usize,
    /// Frames handed out by [`FrameAllocator::allocate_page`].
    pub allocated: usize,
}

/// Number of whole frames in `total_bytes` of RAM.
#[must_use]
pub fn frame_count(total_bytes: u64) -> usize {
    usize::try_from(total_bytes / PAGE_SIZE).unwrap_or(usize::MAX)
}

/// The frame table together with its free list.
pub struct FrameAllocator<'t, M: PhysMapper> {
    table: FrameTable<'t>,
    kernel_frames: usize,
    free: IntrusiveList<PageFrame>,
    mapper: M,
}

impl<'t, M: PhysMapper> FrameAllocator<'t, M> {
    /// Manage `total_bytes` of RAM starting at physical address zero, reserving
    /// every frame up to `kernel_end` (rounded up to a whole frame).
    ///
    /// `table` must hold at least one record per frame; extra records are
    /// ignored.
    ///
    /// # Safety
    /// Every frame at or after `kernel_end` and below `total_bytes` must be
    /// RAM reachable through `mapper` that nothing else uses. Allocation
    /// overwrites those frames.
    pub unsafe fn new(
        total_bytes: u64,
        kernel_end: PhysicalAddress,
        table: FrameTable<'t>,
        mapper: M,
    ) -> Result<Self, FrameAllocError> {
        let needed = frame_count(total_bytes);
        let available = table.len();
        let table = table
            .truncate(needed)
            .ok_or(FrameAllocError::TableTooSmall { needed, available })?;
        Self::build(table, kernel_end, mapper)
    }

    /// Like [`new`](Self::new), taking the RAM size from an ATAG chain.
    ///
    /// # Safety
    /// `tags` must satisfy [`discover_memory_size`]; RAM must satisfy
    /// [`new`](Self::new).
    pub unsafe fn from_atags(
        tags: *const u32,
        kernel_end: PhysicalAddress,
        table: FrameTable<'t>,
        mapper: M,
    ) -> Result<Self, FrameAllocError> {
        // SAFETY: forwarded to the caller.
        let total_bytes = unsafe { discover_memory_size(tags) };
        // SAFETY: forwarded to the caller.
        unsafe { Self::new(total_bytes, kernel_end, table, mapper) }
    }

    fn build(
        mut table: FrameTable<'t>,
        reserved_end: PhysicalAddress,
        mapper: M,
    ) -> Result<Self, FrameAllocError> {
        table.reset();
        let num_frames = table.len();
        let kernel_frames = reserved_end
            .checked_align_up::<Size4K>()
            .map_or(num_frames, |end| FrameTable::index_of(end).min(num_frames));

        let frames = table.frames_mut();
        for (index, frame) in frames.iter_mut().enumerate().take(kernel_frames) {
            frame.flags = FrameFlags::KERNEL;
            frame.mapped_address = VirtualAddress::identity(FrameTable::address_of(index));
        }

        let mut free = IntrusiveList::new();
        for index in kernel_frames..num_frames {
            free.append_back(frames, index)?;
        }

        debug!(
            "Reserved frames 0..{kernel_frames} for the kernel, up to {}",
            FrameTable::address_of(kernel_frames)
        );
        info!(
            "Frame allocator tracks {num_frames} frames, {} free",
            free.size()
        );

        Ok(Self {
            table,
            kernel_frames,
            free,
            mapper,
        })
    }

    /// Hand out the frame at the head of the free list, zeroed.
    ///
    /// On [`FrameAllocError::Exhausted`] nothing was changed.
    pub fn allocate_page(&mut self) -> Result<PhysicalAddress, FrameAllocError> {
        let index = match self.free.pop_front(self.table.frames_mut()) {
            Ok(index) => index,
            Err(ListError::Empty) => return Err(FrameAllocError::Exhausted),
            Err(e) => return Err(e.into()),
        };

        self.table.frames_mut()[index].flags = FrameFlags::KERNEL;
        let pa = FrameTable::address_of(index);
        // SAFETY: the frame was free, and free frames are unused RAM reachable
        // through the mapper (construction contract).
        unsafe { self.mapper.zero_frame(pa) };
        Ok(pa)
    }

    /// Return the frame at `pa` to the tail of the free list.
    ///
    /// The frame's memory is left as is; it is zeroed on its next allocation.
    ///
    /// # Safety
    /// `pa` must be an address returned by [`allocate_page`](Self::allocate_page)
    /// whose frame was not freed since. Debug builds assert this; release
    /// builds only check that `pa` lies within the table.
    ///
    /// # Panics
    /// Panics if `pa` lies beyond the last tracked frame.
    pub unsafe fn free_page(&mut self, pa: PhysicalAddress) {
        debug_assert!(pa.is_aligned::<Size4K>(), "{pa} is not frame aligned");
        let Some(index) = self.table.checked_index_of(pa) else {
            panic!("{pa} is outside tracked RAM");
        };

        let frames = self.table.frames_mut();
        debug_assert!(frames[index].is_allocated(), "{pa} is not allocated");
        frames[index].flags.set_allocated(false);

        let appended = self.free.append_back(frames, index);
        debug_assert!(appended.is_ok(), "{pa} is already on the free list");
    }

    /// Frames describing RAM.
    #[must_use]
    pub const fn num_frames(&self) -> usize {
        self.table.len()
    }

    /// Frames on the free list.
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free.size()
    }

    /// Frames reserved at construction.
    #[must_use]
    pub const fn kernel_frames(&self) -> usize {
        self.kernel_frames
    }

    /// Physical address of the frame table, if it lives in tracked RAM.
    #[must_use]
    pub const fn table_base(&self) -> Option<PhysicalAddress> {
        self.table.base()
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&PageFrame> {
        self.table.get(index)
    }

    /// Addresses of the free frames in the order they will be handed out.
    pub fn free_list(&self) -> impl Iterator<Item = PhysicalAddress> + '_ {
        self.free
            .iter(self.table.frames())
            .map(FrameTable::address_of)
    }

    #[must_use]
    pub const fn stats(&self) -> FrameStats {
        let total = self.num_frames();
        let free = self.free_frames();
        FrameStats {
            total,
            free,
            kernel_reserved: self.kernel_frames,
            // a kernel frame freed against the contract would underflow
            allocated: total
                .saturating_sub(free)
                .saturating_sub(self.kernel_frames),
        }
    }
}

impl<M: PhysMapper> FrameAllocator<'static, M> {
    /// Build the allocator with its frame table placed in RAM right after the
    /// kernel image.
    ///
    /// The table starts at the first [`PageFrame`]-aligned address at or after
    /// `kernel_end`. Its frames are reserved together with the kernel image,
    /// so the reservation ends at the end of the table.
    ///
    /// # Safety
    /// `tags` must satisfy [`discover_memory_size`]. All RAM from `kernel_end`
    /// to the reported size must be reachable through `mapper` and unused.
    pub unsafe fn place_after_kernel(
        tags: *const u32,
        kernel_end: PhysicalAddress,
        mapper: M,
    ) -> Result<Self, FrameAllocError> {
        // SAFETY: forwarded to the caller.
        let memory_size = unsafe { discover_memory_size(tags) };
        let num_frames = frame_count(memory_size);

        let base = FrameTable::placement(kernel_end);
        let table_end = base + FrameTable::bytes_for(num_frames);
        if table_end.as_u64() > memory_size {
            return Err(FrameAllocError::NoRoomForTable {
                table_end,
                memory_size,
            });
        }

        debug!("Placing frame table for {num_frames} frames at {base}..{table_end}");
        // SAFETY: the table range lies within RAM the caller handed over.
        let table = unsafe { FrameTable::place(&mapper, base, num_frames) };
        Self::build(table, table_end, mapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phys_mapper::OffsetPhysMapper;

    #[test]
    fn frame_count_floors() {
        assert_eq!(frame_count(0), 0);
        assert_eq!(frame_count(PAGE_SIZE - 1), 0);
        assert_eq!(frame_count(16 * 1024 * 1024), 4096);
        assert_eq!(frame_count(16 * 1024 * 1024 + 100), 4096);
    }

    #[test]
    fn undersized_table_is_refused() {
        let mut storage = [PageFrame::ZEROED; 3];
        let table = FrameTable::new(&mut storage);
        let result = unsafe {
            FrameAllocator::new(
                4 * PAGE_SIZE,
                PhysicalAddress::zero(),
                table,
                OffsetPhysMapper::IDENTITY,
            )
        };
        assert_eq!(
            result.err(),
            Some(FrameAllocError::TableTooSmall {
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn kernel_covering_all_ram_leaves_nothing_free() {
        let mut storage = [PageFrame::ZEROED; 4];
        let table = FrameTable::new(&mut storage);
        let mut alloc = unsafe {
            FrameAllocator::new(
                4 * PAGE_SIZE,
                PhysicalAddress::new(100 * PAGE_SIZE),
                table,
                OffsetPhysMapper::IDENTITY,
            )
        }
        .unwrap();

        assert_eq!(alloc.kernel_frames(), 4);
        assert_eq!(alloc.free_frames(), 0);
        assert_eq!(alloc.allocate_page(), Err(FrameAllocError::Exhausted));
    }

    #[test]
    fn reserved_frames_are_identity_mapped() {
        let mut storage = [PageFrame::ZEROED; 8];
        let table = FrameTable::new(&mut storage);
        let alloc = unsafe {
            FrameAllocator::new(
                8 * PAGE_SIZE,
                PhysicalAddress::new(3 * PAGE_SIZE),
                table,
                OffsetPhysMapper::IDENTITY,
            )
        }
        .unwrap();

        for index in 0..3 {
            let frame = alloc.frame(index).unwrap();
            assert!(frame.is_allocated() && frame.is_kernel_owned());
            assert!(!frame.is_linked());
            assert_eq!(frame.mapped_address.as_u64(), index as u64 * PAGE_SIZE);
        }
        for index in 3..8 {
            let frame = alloc.frame(index).unwrap();
            assert!(!frame.is_allocated());
            assert!(frame.is_linked());
        }
    }

    /// Four frames of host memory standing in for RAM at physical zero.
    fn four_frame_allocator(ram: &mut [u8]) -> FrameAllocator<'_, OffsetPhysMapper> {
        let mapper = OffsetPhysMapper::new(ram.as_mut_ptr().expose_provenance() as u64);
        let table = FrameTable::new(Box::leak(Box::new([PageFrame::ZEROED; 4])));
        unsafe {
            FrameAllocator::new(
                4 * PAGE_SIZE,
                PhysicalAddress::new(PAGE_SIZE),
                table,
                mapper,
            )
        }
        .unwrap()
    }

    #[test]
    #[should_panic(expected = "is outside tracked RAM")]
    fn freeing_beyond_the_table_panics() {
        let mut ram = vec![0_u8; 4 * PAGE_SIZE as usize];
        let mut alloc = four_frame_allocator(&mut ram);
        unsafe { alloc.free_page(PhysicalAddress::new(100 * PAGE_SIZE)) };
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not allocated")]
    fn double_free_panics() {
        let mut ram = vec![0_u8; 4 * PAGE_SIZE as usize];
        let mut alloc = four_frame_allocator(&mut ram);
        let page = alloc.allocate_page().unwrap();
        unsafe {
            alloc.free_page(page);
            alloc.free_page(page);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not frame aligned")]
    fn unaligned_free_panics() {
        let mut ram = vec![0_u8; 4 * PAGE_SIZE as usize];
        let mut alloc = four_frame_allocator(&mut ram);
        let page = alloc.allocate_page().unwrap();
        unsafe { alloc.free_page(page + 8) };
    }

    #[test]
    fn freed_kernel_frame_does_not_break_stats() {
        let mut ram = vec![0_u8; 4 * PAGE_SIZE as usize];
        let mut alloc = four_frame_allocator(&mut ram);
        assert_eq!(alloc.kernel_frames(), 1);

        unsafe { alloc.free_page(PhysicalAddress::zero()) };
        let stats = alloc.stats();
        assert_eq!(stats.free, 4);
        assert_eq!(stats.kernel_reserved, 1);
        assert_eq!(stats.allocated, 0);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            FrameAllocError::Exhausted.to_string(),
            "no free page frames left"
        );
        assert_eq!(
            FrameAllocError::from(ListError::Empty).to_string(),
            "the list is empty"
        );
    }
}
