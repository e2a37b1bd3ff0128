//! # ATAG Wire Format
//!
//! The boot loader leaves a chain of self-describing records in memory and
//! hands the kernel a pointer to the first one. Every record starts with a
//! [`TagHeader`]; its `tag_size` counts **32-bit words**, header included, so
//! the next record lives exactly `tag_size` words further on.
//!
//! ```text
//! +----------+----------+---------------------+
//! | tag_size | tag      | payload ...         |
//! +----------+----------+---------------------+
//! ^ record   ^ +1 word  ^ +2 words
//! ```
//!
//! The chain ends with a record whose `tag` is [`TagKind::None`].

/// Known ATAG discriminants.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TagKind {
    /// End of the chain.
    None = 0x0000_0000,
    /// First record of every chain.
    Core = 0x5441_0001,
    /// A physical memory region.
    Mem = 0x5442_0003,
    /// Physical location of a compressed initial ramdisk.
    Initrd2 = 0x5442_0005,
    /// Kernel command line.
    Cmdline = 0x5441_0009,
}

impl TagKind {
    /// Decode a raw discriminant; `None` for kinds this kernel does not interpret.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x0000_0000 => Some(Self::None),
            0x5441_0001 => Some(Self::Core),
            0x5442_0003 => Some(Self::Mem),
            0x5442_0005 => Some(Self::Initrd2),
            0x5441_0009 => Some(Self::Cmdline),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Header shared by all records. Keep this `#[repr(C)]`; it is read straight
/// out of boot loader memory.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TagHeader {
    /// Record length in 32-bit words, including this header.
    pub tag_size: u32,
    /// Raw [`TagKind`] discriminant.
    pub tag: u32,
}

impl TagHeader {
    /// Header length in words.
    pub const WORDS: usize = size_of::<Self>() / size_of::<u32>();
}

/// Payload of `Mem`, `Initrd2` and `Cmdline` records.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Region {
    /// Length of the region in bytes.
    pub size: u32,
    /// Physical start address of the region.
    pub start: u32,
}

impl Region {
    /// Payload length in words.
    pub const WORDS: usize = size_of::<Self>() / size_of::<u32>();
}

/// One decoded record of the chain.
///
/// Only the payload relevant to the record's kind is carried.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootTag {
    /// Chain terminator.
    None,
    /// The leading core record; its payload is not interpreted.
    Core,
    Mem(Region),
    Initrd2(Region),
    Cmdline(Region),
    /// A record that is skipped, either because its kind is not interpreted
    /// here or because it is too short to hold the payload its kind requires.
    Unknown {
        /// Raw discriminant.
        tag: u32,
        /// Record length in words.
        words: u32,
    },
}

impl BootTag {
    /// Number of payload words to read for a record with this header, at
    /// most [`Region::WORDS`].
    ///
    /// A record claiming `tag_size == 0` still has its payload read; it only
    /// cannot be stepped over.
    #[must_use]
    pub const fn payload_words(header: TagHeader) -> usize {
        if !matches!(
            TagKind::from_raw(header.tag),
            Some(TagKind::Mem | TagKind::Initrd2 | TagKind::Cmdline)
        ) {
            return 0;
        }
        let record = match header.tag_size {
            0 => TagHeader::WORDS + Region::WORDS,
            words => words as usize,
        };
        let payload = record.saturating_sub(TagHeader::WORDS);
        if payload < Region::WORDS {
            payload
        } else {
            Region::WORDS
        }
    }

    /// Decode a record from its header and the payload words that were read.
    ///
    /// `Mem` only needs its `size` word; a missing `start` reads as zero.
    /// `Initrd2` and `Cmdline` need the full [`Region`].
    #[must_use]
    pub const fn decode(header: TagHeader, payload: &[u32]) -> Self {
        match (TagKind::from_raw(header.tag), payload) {
            (Some(TagKind::None), _) => Self::None,
            (Some(TagKind::Core), _) => Self::Core,
            (Some(TagKind::Mem), [size, start, ..]) => Self::Mem(Region {
                size: *size,
                start: *start,
            }),
            (Some(TagKind::Mem), [size]) => Self::Mem(Region {
                size: *size,
                start: 0,
            }),
            (Some(TagKind::Initrd2), [size, start, ..]) => Self::Initrd2(Region {
                size: *size,
                start: *start,
            }),
            (Some(TagKind::Cmdline), [size, start, ..]) => Self::Cmdline(Region {
                size: *size,
                start: *start,
            }),
            _ => Self::Unknown {
                tag: header.tag,
                words: header.tag_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_roundtrip() {
        for kind in [
            TagKind::None,
            TagKind::Core,
            TagKind::Mem,
            TagKind::Initrd2,
            TagKind::Cmdline,
        ] {
            assert_eq!(TagKind::from_raw(kind.as_raw()), Some(kind));
        }
        // ATAG_VIDEOTEXT is valid but not interpreted.
        assert_eq!(TagKind::from_raw(0x5441_0003), None);
    }

    #[test]
    fn wire_layout() {
        assert_eq!(TagHeader::WORDS, 2);
        assert_eq!(Region::WORDS, 2);
        assert_eq!(size_of::<TagHeader>(), 8);
        assert_eq!(size_of::<Region>(), 8);
    }

    const fn header(tag_size: u32, kind: TagKind) -> TagHeader {
        TagHeader {
            tag_size,
            tag: kind.as_raw(),
        }
    }

    #[test]
    fn payload_words_follow_record_length() {
        assert_eq!(BootTag::payload_words(header(4, TagKind::Mem)), 2);
        assert_eq!(BootTag::payload_words(header(9, TagKind::Cmdline)), 2);
        assert_eq!(BootTag::payload_words(header(3, TagKind::Mem)), 1);
        assert_eq!(BootTag::payload_words(header(2, TagKind::Initrd2)), 0);
        assert_eq!(BootTag::payload_words(header(0, TagKind::Mem)), 2);
        assert_eq!(BootTag::payload_words(header(5, TagKind::Core)), 0);
    }

    #[test]
    fn mem_record_needs_only_its_size() {
        assert_eq!(
            BootTag::decode(header(3, TagKind::Mem), &[0x100_0000]),
            BootTag::Mem(Region {
                size: 0x100_0000,
                start: 0
            })
        );
        assert_eq!(
            BootTag::decode(header(4, TagKind::Mem), &[0x100_0000, 0x8000]),
            BootTag::Mem(Region {
                size: 0x100_0000,
                start: 0x8000
            })
        );
    }

    #[test]
    fn short_initrd_and_cmdline_records_are_unknown() {
        assert_eq!(
            BootTag::decode(header(3, TagKind::Initrd2), &[0x40_0000]),
            BootTag::Unknown {
                tag: TagKind::Initrd2.as_raw(),
                words: 3
            }
        );
        assert_eq!(
            BootTag::decode(header(2, TagKind::Cmdline), &[]),
            BootTag::Unknown {
                tag: TagKind::Cmdline.as_raw(),
                words: 2
            }
        );
    }
}
