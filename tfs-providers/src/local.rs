//! A component's own namespace on the local filesystem

use std::path::{Path, PathBuf};
use tfs_core::{
    path::base_name,
    routing::FileKind,
    TfsError, TfsResult, TierPath,
};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory tree owned by one component
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &TierPath) -> PathBuf {
        path.resolve(&self.root)
    }

    /// Where an upload of `name` into `dest` is stored: the base name of the
    /// client's file under the destination directory.
    pub fn upload_path(&self, dest: &TierPath, name: &str) -> TierPath {
        dest.join(base_name(name))
    }

    /// Create `dir` and any missing parents with mode 0755.
    pub async fn ensure_dir(&self, dir: &TierPath) -> TfsResult<PathBuf> {
        let real = self.resolve(dir);
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder
            .create(&real)
            .await
            .map_err(|source| TfsError::CreateDirectory {
                path: real.display().to_string(),
                source,
            })?;
        Ok(real)
    }

    /// Create (or truncate) the upload target, creating the destination
    /// directory first.
    pub async fn create_file(&self, dest: &TierPath, name: &str) -> TfsResult<fs::File> {
        self.ensure_dir(dest).await?;
        let real = self.resolve(&self.upload_path(dest, name));
        debug!("Creating {}", real.display());
        Ok(fs::File::create(&real).await?)
    }

    pub async fn open_file(&self, path: &TierPath) -> TfsResult<fs::File> {
        let real = self.resolve(path);
        match fs::metadata(&real).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(TfsError::NotFound(path.to_string())),
        }
        fs::File::open(&real)
            .await
            .map_err(|_| TfsError::NotFound(path.to_string()))
    }

    /// Best-effort delete: a file that does not exist is not an error.
    pub async fn remove_file(&self, path: &TierPath) -> TfsResult<()> {
        let real = self.resolve(path);
        match fs::remove_file(&real).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} already absent", real.display());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to remove {}: {}", real.display(), e);
                Ok(())
            }
        }
    }

    /// Files of `kind` anywhere below `dir`, sorted by path. `None` when
    /// `dir` does not exist.
    pub async fn list_files(&self, dir: &TierPath, kind: FileKind) -> TfsResult<Option<Vec<TierPath>>> {
        let root = self.root.clone();
        let real = self.resolve(dir);
        tokio::task::spawn_blocking(move || {
            if !real.is_dir() {
                return None;
            }
            Some(walk_matching(&root, &real, kind))
        })
        .await
        .map_err(|e| TfsError::Other(format!("listing task failed: {}", e)))
    }
}

pub(crate) fn walk_matching(root: &Path, dir: &Path, kind: FileKind) -> Vec<TierPath> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| kind.matches(&e.file_name().to_string_lossy()))
        .filter_map(|e| TierPath::from_real(root, e.path()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write(store: &LocalStore, path: &str, data: &[u8]) {
        let path = TierPath::new(path);
        let parent = path.parent().unwrap_or_default();
        let mut file = store.create_file(&parent, path.name().unwrap()).await.unwrap();
        file.write_all(data).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_file_makes_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path().join("spdf"));
        let dest = TierPath::new("notes/2024");
        let mut file = store.create_file(&dest, "/client/side/report.pdf").await.unwrap();
        file.write_all(b"%PDF").await.unwrap();
        drop(file);

        let real = tmp.path().join("spdf/notes/2024/report.pdf");
        assert_eq!(std::fs::read(&real).unwrap(), b"%PDF");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(tmp.path().join("spdf/notes")).unwrap().permissions().mode();
            assert_eq!(mode & 0o700, 0o700);
            assert_eq!(mode & 0o022, 0);
        }
    }

    #[tokio::test]
    async fn test_create_file_fails_when_directory_cannot_be_made() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blocker"), b"x").unwrap();
        let store = LocalStore::new(tmp.path());
        let err = store.create_file(&TierPath::new("blocker/sub"), "a.c").await.unwrap_err();
        assert!(matches!(err, TfsError::CreateDirectory { .. }));
        assert!(err.is_silent_abort());
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());
        let err = store.open_file(&TierPath::new("nope.c")).await.unwrap_err();
        assert!(matches!(err, TfsError::NotFound(_)));

        std::fs::create_dir_all(tmp.path().join("dir.c")).unwrap();
        let err = store.open_file(&TierPath::new("dir.c")).await.unwrap_err();
        assert!(matches!(err, TfsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_is_best_effort() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());
        write(&store, "notes/a.c", b"int x;").await;

        store.remove_file(&TierPath::new("notes/a.c")).await.unwrap();
        assert!(!tmp.path().join("notes/a.c").exists());
        store.remove_file(&TierPath::new("notes/a.c")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_files_filters_by_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());
        write(&store, "notes/b.pdf", b"1").await;
        write(&store, "notes/deep/a.pdf", b"2").await;
        write(&store, "notes/skip.txt", b"3").await;
        write(&store, "other/c.pdf", b"4").await;

        let listed = store.list_files(&TierPath::new("notes"), FileKind::Pdf).await.unwrap().unwrap();
        let names: Vec<_> = listed.iter().map(|p| p.to_path_string()).collect();
        assert_eq!(names, vec!["notes/b.pdf", "notes/deep/a.pdf"]);

        let all = store.list_files(&TierPath::root(), FileKind::Pdf).await.unwrap().unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());
        assert!(store.list_files(&TierPath::new("absent"), FileKind::C).await.unwrap().is_none());

        std::fs::create_dir(tmp.path().join("empty")).unwrap();
        let empty = store.list_files(&TierPath::new("empty"), FileKind::C).await.unwrap();
        assert_eq!(empty, Some(Vec::new()));
    }
}
