//! Read-only access to the backing image.
//!
//! Every read seeks to an absolute offset first, so no component depends on
//! where a previous read left the cursor.
use log::debug;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::FAT12Error;

/// A read-only handle on a disk image
pub struct ImageStore<R> {
    reader: R,
}

impl ImageStore<File> {
    /// Open the image at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns `FAT12Error::StoreOpenFailure` if the file can't be opened.
    pub fn open(path: &Path) -> Result<Self, FAT12Error> {
        match File::open(path) {
            Ok(file) => {
                debug!("Opened image {}", path.display());
                Ok(ImageStore::new(file))
            }
            Err(source) => Err(FAT12Error::StoreOpenFailure {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl<R: Read + Seek> ImageStore<R> {
    /// Wrap an already opened reader
    pub fn new(reader: R) -> Self {
        ImageStore { reader }
    }

    /// Read exactly `len` bytes starting at the absolute byte `offset`.
    ///
    /// The request is checked against the length of the image before any
    /// buffer is allocated.
    ///
    /// # Errors
    ///
    /// - `FAT12Error::TruncatedRead` if the image ends before `len` bytes
    ///   could be read.
    /// - `FAT12Error::StoreRead` if the seek or read fails for any other
    ///   reason.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, FAT12Error> {
        let image_len = self.reader.seek(SeekFrom::End(0))?;
        let available = image_len.saturating_sub(offset);
        if available < len as u64 {
            return Err(FAT12Error::TruncatedRead {
                offset,
                expected: len,
                actual: available as usize,
            });
        }

        self.reader.seek(SeekFrom::Start(offset))?;

        let mut buffer = Vec::with_capacity(len);
        self.reader
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut buffer)?;

        // The image shrank between the length check and the read
        if buffer.len() < len {
            return Err(FAT12Error::TruncatedRead {
                offset,
                expected: len,
                actual: buffer.len(),
            });
        }

        Ok(buffer)
    }
}
