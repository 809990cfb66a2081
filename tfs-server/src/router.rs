// SPDX-License-Identifier: AGPL-3.0-or-later
//! Router: the only component clients talk to
//!
//! `.c` files live in the Router's own namespace. `.pdf` and `.txt`
//! operations are proxied to the owning tier over a fresh connection, and
//! `display` merges the contribution of every component into one list of
//! base names (local first, then PDF, then Text).

use async_trait::async_trait;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tfs_core::{
    command::Command,
    path::base_name,
    routing::FileKind,
    status::{self, UNSUPPORTED_FILE_TYPE},
    transfer::{self, Connection},
    TfsError, TfsResult, TierId, TierPath, TransferConfig,
};
use tfs_providers::{Archiver, LocalStore, TierRegistry};
use tracing::{debug, info, warn};

use crate::dispatch::CommandHandler;
use crate::local;

/// Tiers asked for their listing, in output order after the local entries
const LISTING_ORDER: [TierId; 2] = [TierId::Pdf, TierId::Text];

pub struct RouterService {
    store: LocalStore,
    tiers: TierRegistry,
    archiver: Arc<dyn Archiver>,
    transfer: TransferConfig,
}

impl RouterService {
    pub fn new(root: &Path, tiers: TierRegistry, archiver: Arc<dyn Archiver>, transfer: TransferConfig) -> Self {
        Self {
            store: LocalStore::new(root),
            tiers,
            archiver,
            transfer,
        }
    }

    /// Base names of every supported file below `path` across all
    /// components. Tiers that fail are skipped.
    pub async fn aggregate_listing(&self, path: &str) -> TfsResult<Vec<String>> {
        let dir = TierPath::new(path);
        let mut result = Vec::new();

        if let Some(files) = self.store.list_files(&dir, FileKind::C).await? {
            result.extend(files.iter().filter_map(|f| f.name()).map(String::from));
        } else {
            debug!("router has no directory {}", dir);
        }

        // Tiers are queried together; their output keeps the fixed order.
        let remote = LISTING_ORDER.map(|tier| {
            let client = self.tiers.get(tier);
            let path = dir.to_path_string();
            async move {
                match client {
                    Some(client) => Some(client.display(&path).await),
                    None => None,
                }
            }
        });
        for (tier, outcome) in LISTING_ORDER.into_iter().zip(join_all(remote).await) {
            match outcome {
                Some(Ok(Some(lines))) => {
                    result.extend(lines.iter().map(|line| base_name(line).to_string()));
                }
                Some(Ok(None)) => debug!("{} tier has no directory {}", tier, dir),
                Some(Err(e)) => warn!("Skipping {} tier in listing of {}: {}", tier, dir, e),
                None => debug!("{} tier not registered", tier),
            }
        }
        Ok(result)
    }

    async fn proxy_upload(&self, tier: TierId, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        let outcome = match self.tiers.get_or_err(tier) {
            Ok(client) => client.upload(&cmd.raw, conn).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(Some(line)) => transfer::send_status(conn, &line).await,
            Ok(None) => transfer::send_status(conn, &status::tier_no_response(tier)).await,
            Err(TfsError::TierUnavailable { .. }) => {
                // The client's payload is still in flight.
                transfer::drain_payload(conn, &self.transfer).await?;
                transfer::send_status(conn, &status::tier_unavailable(tier)).await
            }
            Err(e) => Err(e),
        }
    }

    async fn proxy_download(&self, tier: TierId, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        let relayed = self.tiers.get_or_err(tier)?.download(&cmd.raw, conn).await?;
        match relayed.status {
            Some(line) => {
                info!("Relayed {} from {} tier ({} bytes)", cmd.arg1, tier, relayed.bytes);
                transfer::send_status(conn, &line).await
            }
            None if relayed.bytes == 0 => Err(TfsError::NotFound(cmd.arg1.clone())),
            None => Err(TfsError::NoResponse),
        }
    }

    async fn proxy_remove(&self, tier: TierId, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        let outcome = match self.tiers.get_or_err(tier) {
            Ok(client) => client.remove(&cmd.raw).await,
            Err(e) => Err(e),
        };
        let line = match outcome {
            Ok(Some(line)) => line,
            Ok(None) => status::tier_no_response(tier),
            Err(e) => {
                warn!("rmfile {} on {} tier failed: {}", cmd.arg1, tier, e);
                status::tier_unavailable(tier)
            }
        };
        transfer::send_status(conn, &line).await
    }
}

#[async_trait]
impl CommandHandler for RouterService {
    fn name(&self) -> &str {
        "router"
    }

    async fn ufile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        match FileKind::from_name(&cmd.arg1) {
            Some(FileKind::C) => local::receive_upload(&self.store, conn, cmd, &self.transfer).await,
            Some(kind) => self.proxy_upload(kind.owner(), conn, cmd).await,
            None => transfer::send_status(conn, &status::not_supported(&cmd.arg1)).await,
        }
    }

    async fn dfile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        match FileKind::from_name(&cmd.arg1) {
            Some(FileKind::C) => local::send_download(&self.store, conn, cmd, &self.transfer).await,
            Some(kind) => self.proxy_download(kind.owner(), conn, cmd).await,
            None => transfer::send_status(conn, &status::not_supported(&cmd.arg1)).await,
        }
    }

    async fn rmfile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        match FileKind::from_name(&cmd.arg1) {
            Some(FileKind::C) => local::delete(&self.store, conn, cmd).await,
            Some(kind) => self.proxy_remove(kind.owner(), conn, cmd).await,
            None => transfer::send_status(conn, &status::not_supported(&cmd.arg1)).await,
        }
    }

    async fn dtar(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        match FileKind::from_extension(&cmd.arg1) {
            Some(FileKind::C) => {
                local::send_archive(&self.store, &self.archiver, conn, FileKind::C, &self.transfer).await
            }
            Some(kind) => {
                let bytes = self.tiers.get_or_err(kind.owner())?.archive(kind, conn).await?;
                if bytes == 0 {
                    return Err(TfsError::NoResponse);
                }
                info!("Relayed {} ({} bytes)", kind.archive_name(), bytes);
                Ok(())
            }
            None => transfer::send_status(conn, UNSUPPORTED_FILE_TYPE).await,
        }
    }

    async fn display(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        let names = self.aggregate_listing(&cmd.arg1).await?;
        let listing = local::listing_text(&names);
        transfer::send_payload(conn, &mut listing.as_bytes(), listing.len() as u64, &self.transfer).await?;
        Ok(())
    }
}
