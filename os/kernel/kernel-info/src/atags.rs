//! # ATAG Chain Walking
//!
//! Walks the record chain described in [`boot`](crate::boot) and extracts
//! what the early memory code needs, most importantly the RAM size.
//!
//! This runs before any allocator exists, so nothing here allocates. A chain
//! reached through a raw pointer is trusted completely: the walk advances by
//! each record's `tag_size` without knowing where valid memory ends. Callers
//! holding a copy of the chain can use the bounded [`Atags::from_words`]
//! instead.

#![allow(unsafe_code)]

use crate::boot::{BootTag, Region, TagHeader};
use crate::memory::FALLBACK_MEMORY_SIZE;
use core::marker::PhantomData;
use log::{debug, warn};

/// Iterator over the records of an ATAG chain.
///
/// Yields every record before the [`BootTag::None`] terminator. A record with
/// `tag_size == 0` is decoded as if it had its full payload and yielded, then
/// ends the walk, since it could never advance the cursor.
pub struct Atags<'a> {
    cursor: *const u32,
    /// Words left in the backing slice; `None` for an unbounded raw chain.
    remaining: Option<usize>,
    finished: bool,
    _chain: PhantomData<&'a [u32]>,
}

impl Atags<'static> {
    /// Walk a chain left in memory by the boot loader.
    ///
    /// # Safety
    /// `tags` must point to a readable, word-aligned, well-formed ATAG chain
    /// terminated by a `None` record. No bounds checks are performed; a
    /// malformed chain makes the walk read arbitrary memory.
    #[must_use]
    pub const unsafe fn from_ptr(tags: *const u32) -> Self {
        Self {
            cursor: tags,
            remaining: None,
            finished: false,
            _chain: PhantomData,
        }
    }
}

impl<'a> Atags<'a> {
    /// Walk a chain held in `words`. A record running past the end of the
    /// slice ends the walk.
    #[must_use]
    pub const fn from_words(words: &'a [u32]) -> Self {
        Self {
            cursor: words.as_ptr(),
            remaining: Some(words.len()),
            finished: false,
            _chain: PhantomData,
        }
    }

    fn finish(&mut self) -> Option<BootTag> {
        self.finished = true;
        None
    }
}

impl Iterator for Atags<'_> {
    type Item = BootTag;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.remaining.is_some_and(|words| words < TagHeader::WORDS) {
            return self.finish();
        }

        // SAFETY: bounded walks checked the header fits; unbounded walks rely
        // on the contract of `from_ptr`.
        let header = unsafe { self.cursor.cast::<TagHeader>().read() };
        let words = header.tag_size as usize;
        if self.remaining.is_some_and(|remaining| words > remaining) {
            debug!(
                "ATAG record {:#010x} of {words} words overruns the chain",
                header.tag
            );
            return self.finish();
        }

        let mut available = BootTag::payload_words(header);
        if let Some(remaining) = self.remaining {
            available = available.min(remaining - TagHeader::WORDS);
        }
        let mut payload = [0_u32; Region::WORDS];
        for (i, word) in payload.iter_mut().enumerate().take(available) {
            // SAFETY: within the record, or within the slice for bounded walks.
            *word = unsafe { self.cursor.add(TagHeader::WORDS + i).read() };
        }

        let tag = BootTag::decode(header, &payload[..available]);
        if tag == BootTag::None {
            return self.finish();
        }

        if words == 0 {
            debug!(
                "ATAG record {:#010x} has no size, ending the walk after it",
                header.tag
            );
            self.finished = true;
        } else {
            self.cursor = self.cursor.wrapping_add(words);
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= words;
            }
        }
        Some(tag)
    }
}

/// Total RAM size in bytes as reported by the first `Mem` record.
///
/// Falls back to [`FALLBACK_MEMORY_SIZE`] (1 GiB) when the chain has no `Mem`
/// record.
///
/// # Safety
/// Same contract as [`Atags::from_ptr`].
#[must_use]
pub unsafe fn discover_memory_size(tags: *const u32) -> u64 {
    // SAFETY: forwarded to the caller.
    memory_size_or_fallback(unsafe { Atags::from_ptr(tags) })
}

/// Bounded counterpart of [`discover_memory_size`] for a chain held in `words`.
///
/// ```rust
/// # use kernel_info::atags::discover_memory_size_in;
/// # use kernel_info::boot::TagKind;
/// let chain = [
///     2, TagKind::Core.as_raw(),
///     4, TagKind::Mem.as_raw(), 0x4000_0000, 0,
///     0, TagKind::None.as_raw(),
/// ];
/// assert_eq!(discover_memory_size_in(&chain), 0x4000_0000);
/// ```
#[must_use]
pub fn discover_memory_size_in(words: &[u32]) -> u64 {
    memory_size_or_fallback(Atags::from_words(words))
}

fn memory_size_or_fallback(mut tags: Atags<'_>) -> u64 {
    let size = tags.find_map(|tag| match tag {
        BootTag::Mem(region) => Some(u64::from(region.size)),
        _ => None,
    });

    size.unwrap_or_else(|| {
        warn!("No ATAG_MEM record found, assuming {FALLBACK_MEMORY_SIZE} bytes of RAM");
        FALLBACK_MEMORY_SIZE
    })
}

/// Everything the kernel reads from the chain, collected in one pass.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BootSummary {
    /// Whether the chain started with a `Core` record.
    pub has_core: bool,
    /// First memory region.
    pub memory: Option<Region>,
    /// Initial ramdisk location.
    pub initrd: Option<Region>,
    /// Command line location.
    pub cmdline: Option<Region>,
    /// Number of records walked, terminator excluded.
    pub records: usize,
}

impl BootSummary {
    /// Collect the first record of each interpreted kind.
    #[must_use]
    pub fn collect(tags: Atags<'_>) -> Self {
        let mut summary = Self::default();
        for tag in tags {
            summary.records += 1;
            match tag {
                BootTag::Core => summary.has_core = true,
                BootTag::Mem(r) => {
                    summary.memory.get_or_insert(r);
                }
                BootTag::Initrd2(r) => {
                    summary.initrd.get_or_insert(r);
                }
                BootTag::Cmdline(r) => {
                    summary.cmdline.get_or_insert(r);
                }
                BootTag::None | BootTag::Unknown { .. } => {}
            }
        }
        summary
    }

    /// RAM size in bytes, with the same fallback as [`discover_memory_size`].
    #[must_use]
    pub fn memory_size(&self) -> u64 {
        self.memory
            .map_or(FALLBACK_MEMORY_SIZE, |r| u64::from(r.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::TagKind;

    const CORE: u32 = TagKind::Core.as_raw();
    const MEM: u32 = TagKind::Mem.as_raw();
    const NONE: u32 = TagKind::None.as_raw();
    const INITRD2: u32 = TagKind::Initrd2.as_raw();
    const CMDLINE: u32 = TagKind::Cmdline.as_raw();
    /// ATAG_VIDEOTEXT, valid but not interpreted.
    const VIDEOTEXT: u32 = 0x5441_0003;

    #[test]
    fn iterates_until_terminator() {
        let chain = [2, CORE, 4, MEM, 0x100_0000, 0, 0, NONE, 2, CORE];
        let tags: Vec<_> = Atags::from_words(&chain).collect();
        assert_eq!(
            tags,
            [
                BootTag::Core,
                BootTag::Mem(Region {
                    size: 0x100_0000,
                    start: 0
                })
            ]
        );
    }

    #[test]
    fn advances_by_words_not_bytes() {
        // A 5-word core record (flags, page size, root device) must be
        // skipped as a whole before the memory record is seen.
        let chain = [5, CORE, 1, 4096, 0xff, 4, MEM, 0x800_0000, 0, 0, NONE];
        assert_eq!(discover_memory_size_in(&chain), 0x800_0000);
    }

    #[test]
    fn zero_sized_record_is_read_then_ends_walk() {
        let chain = [2, CORE, 0, MEM, 0x100_0000, 0, 2, CORE];
        let tags: Vec<_> = Atags::from_words(&chain).collect();
        assert_eq!(
            tags,
            [
                BootTag::Core,
                BootTag::Mem(Region {
                    size: 0x100_0000,
                    start: 0
                })
            ]
        );
        assert_eq!(discover_memory_size_in(&chain), 0x100_0000);
        assert_eq!(unsafe { discover_memory_size(chain.as_ptr()) }, 0x100_0000);
    }

    #[test]
    fn zero_sized_record_at_slice_end_reads_what_is_there() {
        let chain = [2, CORE, 0, MEM, 0x100_0000];
        assert_eq!(discover_memory_size_in(&chain), 0x100_0000);
    }

    #[test]
    fn three_word_mem_record_reports_its_size() {
        let chain = [2, CORE, 3, MEM, 0x100_0000, 0, NONE];
        assert_eq!(discover_memory_size_in(&chain), 0x100_0000);
        assert_eq!(unsafe { discover_memory_size(chain.as_ptr()) }, 0x100_0000);
        // the walk resumes right after the three words
        assert_eq!(Atags::from_words(&chain).count(), 2);
    }

    #[test]
    fn summary_reports_initrd_and_cmdline() {
        #[rustfmt::skip]
        let chain = [
            2, CORE,
            4, MEM, 0x800_0000, 0,
            4, INITRD2, 0x40_0000, 0x80_0000,
            2, VIDEOTEXT,
            4, CMDLINE, 64, 0x100,
            4, INITRD2, 0x10, 0x20,
            0, NONE,
        ];
        let summary = BootSummary::collect(Atags::from_words(&chain));
        assert!(summary.has_core);
        assert_eq!(summary.records, 6);
        assert_eq!(summary.memory_size(), 0x800_0000);
        assert_eq!(
            summary.initrd,
            Some(Region {
                size: 0x40_0000,
                start: 0x80_0000
            })
        );
        assert_eq!(
            summary.cmdline,
            Some(Region {
                size: 64,
                start: 0x100
            })
        );
    }

    #[test]
    fn summary_of_chain_without_payload_records() {
        let chain = [2, CORE, 3, INITRD2, 0x40_0000, 0, NONE];
        let summary = BootSummary::collect(Atags::from_words(&chain));
        assert_eq!(summary.records, 2);
        assert_eq!(summary.initrd, None);
        assert_eq!(summary.memory, None);
        assert_eq!(summary.memory_size(), FALLBACK_MEMORY_SIZE);
    }

    #[test]
    fn overrunning_record_ends_bounded_walk() {
        let chain = [2, CORE, 9, MEM, 0x100_0000, 0];
        assert_eq!(Atags::from_words(&chain).count(), 1);
    }

    #[test]
    fn missing_terminator_ends_bounded_walk() {
        let chain = [2, CORE, 4, MEM, 0x100_0000, 0];
        assert_eq!(Atags::from_words(&chain).count(), 2);
    }

    #[test]
    fn empty_chain_uses_fallback() {
        assert_eq!(discover_memory_size_in(&[]), FALLBACK_MEMORY_SIZE);
    }

    #[test]
    fn raw_pointer_walk_matches_bounded_walk() {
        let chain = [2, CORE, 4, MEM, 0x4000_0000, 0, 0, NONE];
        let size = unsafe { discover_memory_size(chain.as_ptr()) };
        assert_eq!(size, discover_memory_size_in(&chain));
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let chain = [2, CORE, 0, NONE];
        let mut tags = Atags::from_words(&chain);
        assert_eq!(tags.next(), Some(BootTag::Core));
        assert_eq!(tags.next(), None);
        assert_eq!(tags.next(), None);
    }
}
