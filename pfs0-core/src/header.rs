//! The packed structs represent the on-disk format of PFS0

use bytemuck::{Pod, PodCastError, Zeroable};

use crate::{Entry, Error, ENTRY_SIZE, HEADER_SIZE, MAGIC};

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(packed, C)]
pub struct Header {
    /// Literal "PFS0"
    pub magic: [u8; 4],
    /// Count of Entry structs, which starts immediately after header struct
    pub count: u32,
    /// Size of the name table, including the alignment padding after it
    pub string_table_size: u32,
    /// Always zero
    pub reserved: u32,
}

impl Header {
    /// Build a prologue for `count` entries and a padded name table of
    /// `string_table_size` bytes
    pub fn from_counts(count: u32, string_table_size: u32) -> Header {
        Header {
            magic: MAGIC,
            count: count.to_le(),
            string_table_size: string_table_size.to_le(),
            reserved: 0,
        }
    }

    /// Parse header from raw archive data and check the magic
    pub fn new(data: &[u8]) -> Result<&Header, Error> {
        let prologue = data
            .get(..HEADER_SIZE)
            .ok_or(Error::Cast(PodCastError::SizeMismatch))?;
        let header: &Header = bytemuck::try_from_bytes(prologue)?;
        if header.magic != MAGIC {
            return Err(Error::InvalidMagic(header.magic));
        }
        Ok(header)
    }

    pub fn count(&self) -> u32 {
        u32::from_le(self.count)
    }

    pub fn string_table_size(&self) -> u32 {
        u32::from_le(self.string_table_size)
    }

    /// Retrieve the size of the entries
    pub fn entries_size(&self) -> Result<usize, Error> {
        usize::try_from(self.count())?
            .checked_mul(ENTRY_SIZE)
            .ok_or(Error::Overflow)
    }

    /// Retrieve the size of the Header, its entries and the padded name
    /// table. Entry data offsets are relative to this position.
    pub fn total_size(&self) -> Result<usize, Error> {
        self.entries_size()?
            .checked_add(HEADER_SIZE)
            .and_then(|size| size.checked_add(self.string_table_size() as usize))
            .ok_or(Error::Overflow)
    }

    /// Parse entries from raw archive data, starting at the beginning of the
    /// archive
    pub fn entries<'a>(&self, data: &'a [u8]) -> Result<&'a [Entry], Error> {
        let end = self
            .entries_size()?
            .checked_add(HEADER_SIZE)
            .ok_or(Error::Overflow)?;
        let entries_data = data
            .get(HEADER_SIZE..end)
            .ok_or(Error::Cast(PodCastError::SizeMismatch))?;
        Ok(bytemuck::try_cast_slice(entries_data)?)
    }

    /// Retrieve the name of `entry` from the name table in raw archive data,
    /// ending at the first NUL
    pub fn name<'a>(&self, data: &'a [u8], entry: &Entry) -> Result<&'a [u8], Error> {
        let table_start = HEADER_SIZE
            .checked_add(self.entries_size()?)
            .ok_or(Error::Overflow)?;
        let table_end = table_start
            .checked_add(self.string_table_size() as usize)
            .ok_or(Error::Overflow)?;
        let table = data
            .get(table_start..table_end)
            .ok_or(Error::Cast(PodCastError::SizeMismatch))?;
        let name = table
            .get(entry.string_offset() as usize..)
            .ok_or(Error::InvalidName)?;
        let end = name.iter().position(|&b| b == 0).ok_or(Error::InvalidName)?;
        Ok(&name[..end])
    }
}
