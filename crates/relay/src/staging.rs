//! Downloaded payloads on local disk, removed when the guard drops.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Context, Result},
    types::{MediaDescriptor, MediaKind},
};

/// A payload written to the staging directory.
///
/// The file is deleted when the value is dropped, whatever happened to the
/// delivery attempt.
#[derive(Debug)]
pub struct StagedMedia {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub mime_type: Option<String>,
    /// HTML caption; set only on the item that carries the post text.
    pub caption: Option<String>,
}

impl StagedMedia {
    /// Write `bytes` to `dir/media_<chat>_<post>.<ext>`.
    pub async fn write(
        dir: &Path,
        chat_id: i64,
        post_id: i64,
        media: &MediaDescriptor,
        bytes: &[u8],
    ) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create staging dir {}", dir.display()))?;
        let path = dir.join(staged_file_name(chat_id, post_id, media));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "staged media");
        Ok(Self {
            path,
            kind: media.kind,
            mime_type: media.mime_type.clone(),
            caption: None,
        })
    }

    /// On-disk size of the staged payload.
    pub async fn size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    #[must_use]
    pub fn supports_streaming(&self) -> bool {
        self.kind.supports_streaming()
    }
}

impl Drop for StagedMedia {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed staged media"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove staged media");
            },
        }
    }
}

fn staged_file_name(chat_id: i64, post_id: i64, media: &MediaDescriptor) -> String {
    format!("media_{chat_id}_{post_id}.{}", media.extension())
}
