//! Archive creation for `dtar`

use bytes::Bytes;
use std::path::Path;
use tfs_core::{routing::FileKind, TfsError, TfsResult};
use tracing::debug;

use crate::local::walk_matching;

/// Builds one container of every file of a kind below a root.
///
/// Implementations are synchronous; callers run them on a blocking thread.
pub trait Archiver: Send + Sync {
    fn build_archive(&self, root: &Path, kind: FileKind) -> TfsResult<Bytes>;
}

/// ustar archive with entry names relative to the root
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiver;

impl Archiver for TarArchiver {
    fn build_archive(&self, root: &Path, kind: FileKind) -> TfsResult<Bytes> {
        let files = if root.is_dir() {
            walk_matching(root, root, kind)
        } else {
            Vec::new()
        };

        let mut builder = tar::Builder::new(Vec::new());
        builder.mode(tar::HeaderMode::Deterministic);
        for file in &files {
            let real = file.resolve(root);
            builder
                .append_path_with_name(&real, file.to_path_string())
                .map_err(|e| TfsError::Archive(format!("{}: {}", real.display(), e)))?;
        }
        let data = builder
            .into_inner()
            .map_err(|e| TfsError::Archive(e.to_string()))?;

        debug!(files = files.len(), bytes = data.len(), "built {} archive", kind);
        Ok(Bytes::from(data))
    }
}
