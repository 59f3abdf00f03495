//! Header layout: the sizes of the prologue, entry table and name table, and
//! the serialized header with every entry's offsets assigned.

use alloc::vec;
use alloc::vec::Vec;

use crate::{Entry, Error, Header, ALIGNMENT, ENTRY_SIZE, HEADER_SIZE};

/// An entry that can be placed into an archive header.
pub trait LayoutEntry {
    /// Name stored in the name table, without a NUL terminator
    fn name(&self) -> &[u8];

    /// Size in bytes of the file data
    fn size(&self) -> u64;

    /// Called once per entry by [`generate_header`] with the absolute offset
    /// of the entry's data in the archive and the offset of its name in the
    /// name table.
    fn set_offsets(&mut self, data_offset: u64, name_offset: u32);
}

/// Sizes of each header region for a given set of names
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    pub count: u32,
    /// Size of the entry table
    pub entries_size: usize,
    /// Size of the names with their terminators, without padding
    pub string_table_size: usize,
    /// Zero bytes after the name table up to the next 16 byte boundary
    pub padding: usize,
    /// Size of the whole header, which is where the payload region starts
    pub header_size: usize,
}

impl Layout {
    pub fn new<'a, I>(names: I) -> Result<Layout, Error>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut count: usize = 0;
        let mut string_table_size: usize = 0;
        for name in names {
            if name.contains(&0) {
                return Err(Error::InvalidName);
            }
            count += 1;
            string_table_size = string_table_size
                .checked_add(name.len())
                .and_then(|size| size.checked_add(1))
                .ok_or(Error::Overflow)?;
        }

        let entries_size = count.checked_mul(ENTRY_SIZE).ok_or(Error::Overflow)?;
        let unpadded = HEADER_SIZE
            .checked_add(entries_size)
            .and_then(|size| size.checked_add(string_table_size))
            .ok_or(Error::Overflow)?;
        let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
        let header_size = unpadded.checked_add(padding).ok_or(Error::Overflow)?;

        Ok(Layout {
            count: u32::try_from(count)?,
            entries_size,
            string_table_size,
            padding,
            header_size,
        })
    }

    /// Offset of the name table from the start of the archive
    pub fn string_table_offset(&self) -> usize {
        HEADER_SIZE + self.entries_size
    }

    /// The prologue; the declared name table size includes the padding
    pub fn header(&self) -> Result<Header, Error> {
        let declared = u32::try_from(self.string_table_size + self.padding)?;
        Ok(Header::from_counts(self.count, declared))
    }
}

/// Sort `entries` by name, assign their offsets and serialize the header.
///
/// The returned buffer is exactly [`Layout::header_size`] bytes. Names are
/// copied into a zero-filled buffer, which supplies their terminators along
/// with the reserved fields and padding.
pub fn generate_header<E: LayoutEntry>(entries: &mut [E]) -> Result<Vec<u8>, Error> {
    // Byte-wise name order, so the same inputs always produce the same archive
    entries.sort_by(|a, b| a.name().cmp(b.name()));

    let layout = Layout::new(entries.iter().map(|entry| entry.name()))?;
    let mut header = vec![0; layout.header_size];
    header[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&layout.header()?));

    let payload_start = layout.header_size as u64;
    let string_table_offset = layout.string_table_offset();
    let mut data_offset: u64 = 0;
    let mut name_offset: u32 = 0;

    for (i, entry) in entries.iter_mut().enumerate() {
        let record = Entry::new(data_offset, entry.size(), name_offset);
        let record_start = HEADER_SIZE + i * ENTRY_SIZE;
        header[record_start..record_start + ENTRY_SIZE]
            .copy_from_slice(bytemuck::bytes_of(&record));

        let name = entry.name();
        let name_len = name.len();
        let name_start = string_table_offset + name_offset as usize;
        header[name_start..name_start + name_len].copy_from_slice(name);

        let absolute = payload_start
            .checked_add(data_offset)
            .ok_or(Error::Overflow)?;
        entry.set_offsets(absolute, name_offset);

        data_offset = data_offset
            .checked_add(entry.size())
            .ok_or(Error::Overflow)?;
        name_offset = name_offset
            .checked_add(u32::try_from(name_len + 1)?)
            .ok_or(Error::Overflow)?;
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{generate_header, Layout, LayoutEntry};
    use crate::{Error, Header, ALIGNMENT, ENTRY_SIZE, HEADER_SIZE};

    struct Named {
        name: &'static [u8],
        size: u64,
        data_offset: u64,
        name_offset: u32,
    }

    impl Named {
        fn new(name: &'static [u8], size: u64) -> Named {
            Named {
                name,
                size,
                data_offset: 0,
                name_offset: 0,
            }
        }
    }

    impl LayoutEntry for Named {
        fn name(&self) -> &[u8] {
            self.name
        }

        fn size(&self) -> u64 {
            self.size
        }

        fn set_offsets(&mut self, data_offset: u64, name_offset: u32) {
            self.data_offset = data_offset;
            self.name_offset = name_offset;
        }
    }

    #[test]
    fn two_entries_padded() -> Result<(), Error> {
        let mut entries = [Named::new(b"b.bin", 3), Named::new(b"a.bin", 2)];
        let header_bytes = generate_header(&mut entries)?;

        assert_eq!(header_bytes.len(), 80);
        assert_eq!(entries[0].name, b"a.bin");
        assert_eq!((entries[0].data_offset, entries[0].name_offset), (80, 0));
        assert_eq!((entries[1].data_offset, entries[1].name_offset), (82, 6));

        let header = Header::new(&header_bytes)?;
        assert_eq!(header.count(), 2);
        assert_eq!(header.string_table_size(), 16);
        assert_eq!(header.total_size()?, 80);

        let records = header.entries(&header_bytes)?;
        assert_eq!((records[0].offset(), records[0].size()), (0, 2));
        assert_eq!((records[1].offset(), records[1].size()), (2, 3));
        assert_eq!(header.name(&header_bytes, &records[0])?, b"a.bin");
        assert_eq!(header.name(&header_bytes, &records[1])?, b"b.bin");

        // Padding after the name table
        assert_eq!(&header_bytes[76..], &[0u8; 4]);
        Ok(())
    }

    #[test]
    fn empty_is_bare_prologue() -> Result<(), Error> {
        let mut entries: [Named; 0] = [];
        let header_bytes = generate_header(&mut entries)?;

        assert_eq!(header_bytes.len(), HEADER_SIZE);
        assert_eq!(&header_bytes[..4], b"PFS0");
        assert_eq!(&header_bytes[4..], &[0u8; 12]);
        Ok(())
    }

    #[test]
    fn offsets_are_contiguous() -> Result<(), Error> {
        let mut entries = [
            Named::new(b"main", 1000),
            Named::new(b"control.nca", 17),
            Named::new(b"x", 0),
            Named::new(b"legal", 4096),
        ];
        let header_bytes = generate_header(&mut entries)?;
        let layout = Layout::new(entries.iter().map(|entry| entry.name))?;

        assert_eq!(header_bytes.len() % ALIGNMENT, 0);
        assert_eq!(entries[0].data_offset, header_bytes.len() as u64);

        let mut name_offset = 0;
        for pair in entries.windows(2) {
            assert!(pair[0].name < pair[1].name);
            assert_eq!(pair[1].data_offset, pair[0].data_offset + pair[0].size);
        }
        for entry in entries.iter() {
            assert_eq!(entry.name_offset, name_offset);
            name_offset += entry.name.len() as u32 + 1;
        }

        let header = Header::new(&header_bytes)?;
        assert_eq!(
            header.string_table_size() as usize,
            layout.string_table_size + layout.padding
        );
        assert_eq!(layout.string_table_size, name_offset as usize);
        assert_eq!(
            layout.header_size,
            HEADER_SIZE + 4 * ENTRY_SIZE + layout.string_table_size + layout.padding
        );
        Ok(())
    }

    #[test]
    fn layout_already_aligned() -> Result<(), Error> {
        // 16 + 24 + 8 = 48
        let layout = Layout::new([&b"1234567"[..]])?;
        assert_eq!(layout.padding, 0);
        assert_eq!(layout.header_size, 48);
        Ok(())
    }

    #[test]
    fn nul_in_name() {
        let names: Vec<&[u8]> = alloc::vec![&b"ok"[..], &b"bad\0name"[..]];
        assert!(matches!(Layout::new(names), Err(Error::InvalidName)));
    }
}
