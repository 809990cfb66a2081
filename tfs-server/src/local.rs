// SPDX-License-Identifier: AGPL-3.0-or-later
//! Commands served from a component's own namespace
//!
//! Used by every tier for its extension and by the Router for `.c`.

use std::sync::Arc;
use tfs_core::{
    command::Command,
    routing::FileKind,
    status,
    transfer::{self, Connection},
    TfsError, TfsResult, TierPath, TransferConfig,
};
use tfs_providers::{Archiver, LocalStore};
use tracing::{info, warn};

/// `ufile <name> <dest>`: store the payload that follows the command.
pub async fn receive_upload(
    store: &LocalStore,
    conn: &mut dyn Connection,
    cmd: &Command,
    transfer: &TransferConfig,
) -> TfsResult<()> {
    let dest = TierPath::new(&cmd.arg2);
    let mut file = match store.create_file(&dest, &cmd.arg1).await {
        Ok(file) => file,
        Err(e @ TfsError::CreateDirectory { .. }) => return Err(e),
        Err(e) => {
            let target = store.resolve(&store.upload_path(&dest, &cmd.arg1));
            warn!("Cannot write {}: {}", target.display(), e);
            transfer::drain_payload(conn, transfer).await?;
            let line = status::open_failed(&target.display().to_string());
            return transfer::send_status(conn, &line).await;
        }
    };

    let bytes = transfer::recv_payload(conn, &mut file, transfer).await?;
    info!("Stored {} ({} bytes)", store.upload_path(&dest, &cmd.arg1), bytes);
    transfer::send_status(conn, &status::uploaded(&cmd.arg1)).await
}

/// `dfile <name>`: stream the file, pause, then send the status line. A
/// missing file aborts without a response.
pub async fn send_download(
    store: &LocalStore,
    conn: &mut dyn Connection,
    cmd: &Command,
    transfer: &TransferConfig,
) -> TfsResult<()> {
    let path = TierPath::new(&cmd.arg1);
    let mut file = store.open_file(&path).await?;
    let len = file.metadata().await?.len();
    let bytes = transfer::send_payload(conn, &mut file, len, transfer).await?;
    info!("Sent {} ({} bytes)", path, bytes);
    transfer.pause_before_status().await;
    transfer::send_status(conn, &status::downloaded(&cmd.arg1)).await
}

/// `rmfile <name>`
pub async fn delete(store: &LocalStore, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
    let path = TierPath::new(&cmd.arg1);
    store.remove_file(&path).await?;
    info!("Removed {}", path);
    transfer::send_status(conn, &status::deleted(&cmd.arg1)).await
}

/// `dtar <ext>`: archive every file of `kind` in the namespace and stream it.
pub async fn send_archive(
    store: &LocalStore,
    archiver: &Arc<dyn Archiver>,
    conn: &mut dyn Connection,
    kind: FileKind,
    transfer: &TransferConfig,
) -> TfsResult<()> {
    let root = store.root().to_path_buf();
    let archiver = Arc::clone(archiver);
    let data = tokio::task::spawn_blocking(move || archiver.build_archive(&root, kind))
        .await
        .map_err(|e| TfsError::Archive(format!("archive task failed: {}", e)))??;
    let bytes = transfer::send_payload(conn, &mut &data[..], data.len() as u64, transfer).await?;
    info!("Sent {} ({} bytes)", kind.archive_name(), bytes);
    Ok(())
}

/// Relative paths of the `kind` files below `dir`, one per line; `None` when
/// the directory is absent.
pub async fn listing(store: &LocalStore, dir: &TierPath, kind: FileKind) -> TfsResult<Option<String>> {
    let Some(files) = store.list_files(dir, kind).await? else {
        return Ok(None);
    };
    Ok(Some(listing_text(files.iter().map(|p| p.to_path_string()))))
}

/// One name per line. An empty listing is a lone newline so that it still
/// differs from a peer that closed without answering.
pub fn listing_text<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for name in names {
        text.push_str(name.as_ref());
        text.push('\n');
    }
    if text.is_empty() {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_text() {
        assert_eq!(listing_text(["a.c", "b.pdf"]), "a.c\nb.pdf\n");
        assert_eq!(listing_text(Vec::<String>::new()), "\n");
    }
}
