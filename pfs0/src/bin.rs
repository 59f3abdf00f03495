use std::fs::File;
use std::io::Read;
use std::path::Path;

use pfs0_core::{Header, HEADER_SIZE};

use crate::{wrap_io_err, Error};

/// An entry as recorded in the header of an existing archive
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchiveEntry {
    pub name: Vec<u8>,
    /// Absolute position of the entry data in the archive
    pub offset: u64,
    pub size: u64,
}

/// Read only the header of an archive and return its entries in table order.
pub fn read_entries(archive_path: impl AsRef<Path>) -> Result<Vec<ArchiveEntry>, Error> {
    let archive_path = archive_path.as_ref();
    let mut archive_file =
        File::open(archive_path).map_err(wrap_io_err!(archive_path, "Open archive"))?;

    // Read the prologue first to find out how big the whole header is
    let mut head = vec![0; HEADER_SIZE];
    archive_file
        .read_exact(&mut head)
        .map_err(wrap_io_err!(archive_path, "Read header"))?;
    let total_size = Header::new(&head)?.total_size()?;

    // The prologue's counts are untrusted; check them against the file before
    // allocating the rest of the header
    let file_size = archive_file
        .metadata()
        .map_err(wrap_io_err!(archive_path, "Read metadata"))?
        .len();
    if total_size as u64 > file_size {
        return Err(Error::Truncated {
            path: archive_path.to_path_buf(),
            declared: total_size as u64,
            actual: file_size,
        });
    }

    head.resize(total_size, 0);
    archive_file
        .read_exact(&mut head[HEADER_SIZE..])
        .map_err(wrap_io_err!(archive_path, "Read entries"))?;

    let header = Header::new(&head)?;
    let mut entries = Vec::new();
    for entry in header.entries(&head)? {
        let offset = (total_size as u64)
            .checked_add(entry.offset())
            .ok_or(pfs0_core::Error::Overflow)?;
        entries.push(ArchiveEntry {
            name: header.name(&head, entry)?.to_vec(),
            offset,
            size: entry.size(),
        });
    }
    Ok(entries)
}

pub fn list(archive_path: impl AsRef<Path>) -> Result<(), Error> {
    for entry in read_entries(archive_path)? {
        println!(
            "{} (offset {}, {} bytes)",
            String::from_utf8_lossy(&entry.name),
            entry.offset,
            entry.size
        );
    }
    Ok(())
}
