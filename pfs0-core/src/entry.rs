//! The packed structs represent the on-disk format of PFS0
use bytemuck::{Pod, Zeroable};

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(packed, C)]
pub struct Entry {
    /// Offset of file data, relative to the end of the header
    pub offset: u64,
    /// Size in bytes of the file data in the payload region
    pub size: u64,
    /// Offset of the NUL-terminated name in the name table
    pub string_offset: u32,
    /// Always zero
    pub reserved: u32,
}

impl Entry {
    pub fn new(offset: u64, size: u64, string_offset: u32) -> Entry {
        Entry {
            offset: offset.to_le(),
            size: size.to_le(),
            string_offset: string_offset.to_le(),
            reserved: 0,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from_le(self.offset)
    }

    pub fn size(&self) -> u64 {
        u64::from_le(self.size)
    }

    pub fn string_offset(&self) -> u32 {
        u32::from_le(self.string_offset)
    }
}
