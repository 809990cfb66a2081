// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage tier: owns the namespace of one extension

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tfs_core::{
    command::Command,
    routing::FileKind,
    status::{self, DIRECTORY_NOT_FOUND, UNSUPPORTED_FILE_TYPE},
    transfer::{self, Connection},
    TfsResult, TierId, TierPath, TransferConfig,
};
use tfs_providers::{Archiver, LocalStore};
use tracing::debug;

use crate::dispatch::CommandHandler;
use crate::local;

pub struct TierService {
    tier: TierId,
    kind: FileKind,
    store: LocalStore,
    archiver: Arc<dyn Archiver>,
    transfer: TransferConfig,
}

impl TierService {
    pub fn new(tier: TierId, root: &Path, archiver: Arc<dyn Archiver>, transfer: TransferConfig) -> Self {
        Self {
            tier,
            kind: tier.kind(),
            store: LocalStore::new(root),
            archiver,
            transfer,
        }
    }

    fn owns(&self, name: &str) -> bool {
        self.kind.matches(name)
    }
}

#[async_trait]
impl CommandHandler for TierService {
    fn name(&self) -> &str {
        self.tier.as_str()
    }

    async fn ufile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        if !self.owns(&cmd.arg1) {
            return transfer::send_status(conn, &status::not_supported(&cmd.arg1)).await;
        }
        local::receive_upload(&self.store, conn, cmd, &self.transfer).await
    }

    async fn dfile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        if !self.owns(&cmd.arg1) {
            return transfer::send_status(conn, &status::not_supported(&cmd.arg1)).await;
        }
        local::send_download(&self.store, conn, cmd, &self.transfer).await
    }

    async fn rmfile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        if !self.owns(&cmd.arg1) {
            return transfer::send_status(conn, &status::not_supported(&cmd.arg1)).await;
        }
        local::delete(&self.store, conn, cmd).await
    }

    async fn dtar(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        if FileKind::from_extension(&cmd.arg1) != Some(self.kind) {
            return transfer::send_status(conn, UNSUPPORTED_FILE_TYPE).await;
        }
        local::send_archive(&self.store, &self.archiver, conn, self.kind, &self.transfer).await
    }

    async fn display(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()> {
        let dir = TierPath::new(&cmd.arg1);
        let response = match local::listing(&self.store, &dir, self.kind).await? {
            Some(lines) => lines,
            None => {
                debug!("{} has no directory {}", self.tier, dir);
                DIRECTORY_NOT_FOUND.to_string()
            }
        };
        transfer::send_payload(conn, &mut response.as_bytes(), response.len() as u64, &self.transfer).await?;
        Ok(())
    }
}
