//! Uploaded files.
//!
//! A [`FileParam`] is captured from a multipart part. Small uploads stay in
//! memory; anything larger than the configured threshold is spooled to a
//! named temporary file owned exclusively by the `FileParam`. The temporary
//! file is removed by [`FileParam::close`] or, failing that, on drop.

use std::fmt;
use std::io;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::pipeline::Spool;

const SPOOL_PREFIX: &str = "vrpc-upload-";

enum Storage {
    Memory(Bytes),
    Spooled(NamedTempFile),
}

/// An uploaded file bound to a request field.
pub struct FileParam {
    file_name: Option<String>,
    size: u64,
    storage: Storage,
}

impl FileParam {
    /// In-memory file, e.g. for tests or in-process calls.
    pub fn from_bytes(file_name: Option<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            file_name,
            size: data.len() as u64,
            storage: Storage::Memory(data),
        }
    }

    /// Read a multipart part. Up to `spool.max_memory` bytes are kept in
    /// memory; once the part is longer, the buffered bytes and the rest of
    /// the part are written to a temporary file instead.
    pub(crate) async fn capture(
        field: &mut multer::Field<'_>,
        spool: Spool<'_>,
    ) -> Result<Self, CaptureError> {
        let file_name = field.file_name().map(str::to_owned);
        let mut buf = BytesMut::new();

        while let Some(chunk) = field.chunk().await? {
            buf.extend_from_slice(&chunk);
            if buf.len() as u64 > spool.max_memory {
                return Self::spool(file_name, buf.freeze(), field, spool.dir).await;
            }
        }

        Ok(Self::from_bytes(file_name, buf.freeze()))
    }

    async fn spool(
        file_name: Option<String>,
        head: Bytes,
        field: &mut multer::Field<'_>,
        dir: Option<&Path>,
    ) -> Result<Self, CaptureError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SPOOL_PREFIX);
        let tmp = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let mut out = tokio::fs::File::from_std(tmp.as_file().try_clone()?);

        out.write_all(&head).await?;
        let mut size = head.len() as u64;
        while let Some(chunk) = field.chunk().await? {
            out.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        out.flush().await?;

        tracing::debug!(path = %tmp.path().display(), size, "Spooled upload to temporary file");

        Ok(Self {
            file_name,
            size,
            storage: Storage::Spooled(tmp),
        })
    }

    /// File name supplied by the client, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Number of bytes received.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the content lives in a temporary file.
    pub fn is_spooled(&self) -> bool {
        matches!(self.storage, Storage::Spooled(_))
    }

    /// Location of the temporary file for spooled uploads.
    pub fn spool_path(&self) -> Option<&Path> {
        match &self.storage {
            Storage::Spooled(tmp) => Some(tmp.path()),
            Storage::Memory(_) => None,
        }
    }

    /// The whole content.
    pub async fn bytes(&self) -> io::Result<Bytes> {
        match &self.storage {
            Storage::Memory(data) => Ok(data.clone()),
            Storage::Spooled(tmp) => tokio::fs::read(tmp.path()).await.map(Bytes::from),
        }
    }

    /// Release the file, deleting any temporary storage.
    pub fn close(self) -> io::Result<()> {
        match self.storage {
            Storage::Memory(_) => Ok(()),
            Storage::Spooled(tmp) => tmp.close(),
        }
    }
}

impl fmt::Debug for FileParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileParam")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .field("spooled", &self.is_spooled())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum CaptureError {
    #[error(transparent)]
    Multipart(#[from] multer::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
