use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use pfs0_core::{generate_header, LayoutEntry};
use tracing::{debug, info, trace};

use crate::progress::Progress;
use crate::{wrap_io_err, Config, Error};

struct BuilderEntry {
    /// Position of the file on the build system
    source: PathBuf,
    /// Name stored in the archive
    name: Vec<u8>,
    /// Size when the entry was added
    size: u64,

    /// Absolute position of the entry data in the archive, set when the
    /// header is generated
    data_offset: u64,
    /// Position of the name in the name table, set when the header is
    /// generated
    name_offset: u32,
}

impl BuilderEntry {
    fn new(source: &Path) -> Result<BuilderEntry, Error> {
        let metadata = fs::metadata(source).map_err(wrap_io_err!(source, "Read metadata"))?;
        if !metadata.is_file() {
            return Err(Error::UnsupportedEntry {
                path: source.to_path_buf(),
            });
        }

        let name = source.file_name().ok_or_else(|| Error::InvalidName {
            path: source.to_path_buf(),
        })?;

        Ok(BuilderEntry {
            source: source.to_path_buf(),
            name: name.as_bytes().to_vec(),
            size: metadata.len(),
            data_offset: 0,
            name_offset: 0,
        })
    }

    fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

impl LayoutEntry for BuilderEntry {
    fn name(&self) -> &[u8] {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn set_offsets(&mut self, data_offset: u64, name_offset: u32) {
        self.data_offset = data_offset;
        self.name_offset = name_offset;
    }
}

impl fmt::Debug for BuilderEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BuilderEntry")
            .field("source", &self.source)
            .field("name", &self.display_name())
            .field("size", &self.size)
            .field("data_offset", &self.data_offset)
            .field("name_offset", &self.name_offset)
            .finish()
    }
}

/// Builder pattern for constructing PFS0 archives. Holds a list of entries
/// and consumes itself to construct an archive.
///
/// Entries are stored under the base name of the file they were added from,
/// and sorted by that name when the archive is built, so the order files are
/// added in does not change the result. Each file's size is recorded when it
/// is added; if the file no longer has that size when it is copied, the build
/// fails.
///
/// # Example
/// ```no_run
/// use pfs0::{Builder, Config};
///
/// let mut builder = Builder::with_config("game.nsp", Config {
///     progress: true,
///     ..Config::default()
/// });
/// builder
///     .add_file("program.nca").unwrap()
///     .add_files(["control.nca", "meta.cnmt.nca"]).unwrap();
///
/// let archive_size = builder.build().unwrap();
/// ```
pub struct Builder {
    output: PathBuf,
    config: Config,

    entries: Vec<BuilderEntry>,
}

impl Builder {
    pub fn new(output: impl AsRef<Path>) -> Builder {
        Builder::with_config(output, Config::default())
    }

    pub fn with_config(output: impl AsRef<Path>, config: Config) -> Builder {
        Builder {
            output: output.as_ref().to_path_buf(),
            config,
            entries: Vec::new(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a regular file to this builder. `path` is the position of the file
    /// on the build system; its base name is the name stored in the archive.
    ///
    /// Fails without changing the builder if the file can't be inspected or
    /// is not a regular file.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Builder, Error> {
        let entry = BuilderEntry::new(path.as_ref())?;
        debug!(source = %entry.source.display(), size = entry.size, "Added entry");
        self.entries.push(entry);
        Ok(self)
    }

    /// Add each of `paths` in turn, stopping at the first failure. Files
    /// added before the failure stay in the builder.
    pub fn add_files<I, P>(&mut self, paths: I) -> Result<&mut Builder, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.add_file(path)?;
        }
        Ok(self)
    }

    /// Consume this `Builder`, creating (or truncating) the output file and
    /// writing the archive to it. Returns the total size of the archive.
    ///
    /// Nothing is created if no entries were added. On any other failure the
    /// partially written output is left in place.
    pub fn build(self) -> Result<u64, Error> {
        if self.entries.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut archive_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.output)
            .map_err(wrap_io_err!(self.output, "Create archive"))?;

        self.write_archive(&mut archive_file)
    }

    /// Consume this `Builder`, writing the header and then every entry's data
    /// at its offset. `writer` is assumed to be empty and positioned at 0.
    pub fn write_archive<W>(mut self, writer: &mut W) -> Result<u64, Error>
    where
        W: Write + Seek,
    {
        if self.entries.is_empty() {
            return Err(Error::EmptyInput);
        }

        info!(
            output = %self.output.display(),
            entries = self.entries.len(),
            "Building archive"
        );

        let header = generate_header(&mut self.entries)?;
        let written = write_head(writer, &header)
            .map_err(wrap_io_err!(self.output, "Write header"))?;
        if written != header.len() {
            return Err(Error::ShortWrite {
                path: self.output.clone(),
                expected: header.len() as u64,
                actual: written as u64,
            });
        }
        debug!(size = header.len(), "Header written");

        let data_size: u64 = self.entries.iter().map(|entry| entry.size).sum();
        let mut progress = if self.config.progress {
            let mut progress = Progress::new(io::stdout(), data_size)
                .width(self.config.progress_width)
                .interval(self.config.progress_interval());
            progress
                .begin(&self.output)
                .map_err(wrap_io_err!("Write progress"))?;
            Some(progress)
        } else {
            None
        };

        let mut buf = vec![0; self.config.buffer_size.max(1)];
        let count = self.entries.len();
        for (i, entry) in self.entries.iter().enumerate() {
            debug!(
                index = i,
                name = %entry.display_name(),
                offset = entry.data_offset,
                size = entry.size,
                "Copying entry"
            );
            if let Some(progress) = progress.as_mut() {
                progress
                    .entry(i, count, &entry.display_name())
                    .map_err(wrap_io_err!("Write progress"))?;
            }

            let copied = copy_entry(entry, writer, &self.output, &mut buf, progress.as_mut());

            if let Some(progress) = progress.as_mut() {
                progress
                    .finish_entry()
                    .map_err(wrap_io_err!("Write progress"))?;
            }

            let copied = copied?;
            if copied != entry.size {
                return Err(Error::SizeMismatch {
                    path: entry.source.clone(),
                    expected: entry.size,
                    actual: copied,
                });
            }
        }

        writer.flush().map_err(wrap_io_err!(self.output, "Flush archive"))?;

        let total = header.len() as u64 + data_size;
        info!(output = %self.output.display(), size = total, "Archive built");
        Ok(total)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Builder")
            .field("output", &self.output)
            .field("config", &self.config)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Write as much of `header` as `writer` accepts, returning the byte count.
fn write_head<W: Write>(writer: &mut W, header: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < header.len() {
        match writer.write(&header[written..]) {
            Ok(0) => break,
            Ok(count) => written += count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(written)
}

/// Copy one entry's source file into `writer` at the entry's data offset.
/// Returns the number of bytes copied, which is not checked against the
/// entry size here.
fn copy_entry<W, P>(
    entry: &BuilderEntry,
    writer: &mut W,
    output: &Path,
    buf: &mut [u8],
    mut progress: Option<&mut Progress<P>>,
) -> Result<u64, Error>
where
    W: Write + Seek,
    P: Write,
{
    let mut source_file =
        File::open(&entry.source).map_err(wrap_io_err!(entry.source, "Open source file"))?;

    writer
        .seek(SeekFrom::Start(entry.data_offset))
        .map_err(wrap_io_err!(output, "Seek to entry data"))?;

    let mut total = 0;
    loop {
        let count = match source_file.read(buf) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(Error::from_io(
                    err,
                    Some(entry.source.clone()),
                    "Read source file",
                ))
            }
        };
        writer
            .write_all(&buf[..count])
            .map_err(wrap_io_err!(output, "Write entry data"))?;
        total += count as u64;
        trace!(copied = total, "Chunk written");

        if let Some(progress) = progress.as_mut() {
            progress
                .advance(count as u64)
                .map_err(wrap_io_err!("Write progress"))?;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, Cursor, Seek, SeekFrom, Write};

    use super::Builder;
    use crate::Error;

    /// Accepts a fixed number of bytes, then reports that nothing more fits
    struct Full {
        inner: Cursor<Vec<u8>>,
        room: usize,
    }

    impl Write for Full {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let count = buf.len().min(self.room);
            self.room -= count;
            self.inner.write(&buf[..count])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for Full {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn short_header_write() -> Result<(), Error> {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.nca");
        fs::write(&path, b"data").unwrap();

        let mut builder = Builder::new(tmp.path().join("out.nsp"));
        builder.add_file(&path)?;

        let mut dest = Full {
            inner: Cursor::new(Vec::new()),
            room: 20,
        };
        match builder.write_archive(&mut dest) {
            Err(Error::ShortWrite {
                expected, actual, ..
            }) => assert_eq!((expected, actual), (48, 20)),
            other => panic!("expected ShortWrite, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn in_memory_archive() -> Result<(), Error> {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x");
        fs::write(&path, b"0123456789").unwrap();

        let mut builder = Builder::new("unused.nsp");
        builder.add_file(&path)?;

        let mut dest = Cursor::new(Vec::new());
        let size = builder.write_archive(&mut dest)?;

        // 16 + 24 + 2 = 42, padded to 48
        assert_eq!(size, 58);
        let archive = dest.into_inner();
        assert_eq!(archive.len(), 58);
        assert_eq!(&archive[48..], b"0123456789");
        Ok(())
    }

    #[test]
    fn directories_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = Builder::new("unused.nsp");
        assert!(matches!(
            builder.add_file(tmp.path()),
            Err(Error::UnsupportedEntry { .. })
        ));
        assert!(builder.is_empty());
    }
}
