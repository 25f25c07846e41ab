//! Ephemeral random-access spill file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

const FILE_PREFIX: &str = "chunkstitch-";

/// A temporary file pre-sized to the reconstructed length.
///
/// Pieces are written at their final offsets in any order. The file is
/// removed by [`BackingFile::remove`]; if that never happens, dropping the
/// last handle removes it.
#[derive(Debug)]
pub struct BackingFile {
    file: File,
    path: PathBuf,
    len: u64,
    removed: AtomicBool,
}

impl BackingFile {
    /// Creates a new file of `len` zero bytes, in `dir` or the system temp dir.
    pub fn create(dir: Option<&Path>, len: u64) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(FILE_PREFIX);
        let named = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (file, path) = named.keep()?;

        if let Err(e) = file.set_len(len) {
            // Never handed out; don't leave it behind
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        debug!(path = %path.display(), len, "created backing file");
        Ok(Self {
            file,
            path,
            len,
            removed: AtomicBool::new(false),
        })
    }

    /// Writes all of `buf` at `offset`.
    pub fn write_all_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.write_all_at(buf, offset)
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut written = 0;
            while written < buf.len() {
                let n = self
                    .file
                    .seek_write(&buf[written..], offset + written as u64)?;
                if n == 0 {
                    return Err(io::ErrorKind::WriteZero.into());
                }
                written += n;
            }
            Ok(())
        }
    }

    /// Fills `buf` from `offset`.
    pub fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset)
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut read = 0;
            while read < buf.len() {
                let n = self.file.seek_read(&mut buf[read..], offset + read as u64)?;
                if n == 0 {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                read += n;
            }
            Ok(())
        }
    }

    /// Flushes file contents and metadata to durable storage.
    pub fn sync_all(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Reads the whole file into memory.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let len = usize::try_from(self.len)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "file too large"))?;
        let mut buf = vec![0u8; len];
        self.read_exact_at(&mut buf, 0)?;
        Ok(buf)
    }

    /// Opens an independent read-only handle to the file.
    pub fn reopen(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    /// The underlying file handle.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Location of the file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true for a zero-length file.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true once the file has been removed from disk.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Deletes the file from disk.
    ///
    /// Open handles stay usable until dropped. Calling this again is a no-op.
    pub fn remove(&self) -> io::Result<()> {
        if self.removed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed backing file");
                Ok(())
            }
            Err(e) => {
                self.removed.store(false, Ordering::Release);
                Err(e)
            }
        }
    }
}

impl Drop for BackingFile {
    fn drop(&mut self) {
        if self.is_removed() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove backing file on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_presized_and_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let file = BackingFile::create(Some(dir.path()), 16).unwrap();

        assert_eq!(file.len(), 16);
        assert!(file.path().starts_with(dir.path()));
        assert_eq!(file.read_all().unwrap(), vec![0u8; 16]);
        assert_eq!(file.file().metadata().unwrap().len(), 16);
    }

    #[test]
    fn test_positioned_io() {
        let dir = tempfile::tempdir().unwrap();
        let file = BackingFile::create(Some(dir.path()), 8).unwrap();

        file.write_all_at(b"CCDD", 4).unwrap();
        file.write_all_at(b"AABB", 0).unwrap();

        let mut buf = [0u8; 4];
        file.read_exact_at(&mut buf, 2).unwrap();
        assert_eq!(&buf, b"BBCC");
        assert!(file.read_exact_at(&mut buf, 6).is_err());

        let mut reopened = String::new();
        std::io::Read::read_to_string(&mut file.reopen().unwrap(), &mut reopened).unwrap();
        assert_eq!(reopened, "AABBCCDD");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = BackingFile::create(Some(dir.path()), 4).unwrap();
        let path = file.path().to_path_buf();

        file.remove().unwrap();
        assert!(!path.exists());
        assert!(file.is_removed());
        file.remove().unwrap();
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = BackingFile::create(Some(dir.path()), 4).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_create_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(BackingFile::create(Some(&missing), 4).is_err());
    }
}
