// SPDX-License-Identifier: AGPL-3.0-or-later
//! Router and storage tier services
//!
//! Both roles share the same connection loop ([`dispatch`]) and the same
//! local command handlers ([`local`]). A tier serves the one extension it
//! owns; the Router serves `.c` itself and proxies or fans out the rest.

pub mod dispatch;
pub mod listener;
pub mod local;
pub mod router;
pub mod tier;

pub use dispatch::{serve_connection, CommandHandler};
pub use listener::Listener;
pub use router::RouterService;
pub use tier::TierService;

use std::sync::Arc;
use tfs_core::{Config, TfsResult, TierId};
use tfs_providers::{TarArchiver, TierRegistry};
use tracing::info;

/// Which component a process runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Router,
    Tier(TierId),
}

impl Role {
    pub fn id(&self) -> TierId {
        match self {
            Role::Router => TierId::Router,
            Role::Tier(tier) => *tier,
        }
    }

    /// Upper bound on concurrently served clients. Tiers take one client at
    /// a time; the Router is unbounded.
    pub fn max_active(&self) -> Option<usize> {
        match self {
            Role::Router => None,
            Role::Tier(_) => Some(1),
        }
    }
}

/// Build the handler for `role` from `config`.
pub fn handler_for(config: &Config, role: Role) -> Arc<dyn CommandHandler> {
    let archiver = Arc::new(TarArchiver);
    match role {
        Role::Router => Arc::new(RouterService::new(
            &config.router.root,
            TierRegistry::from_config(config),
            archiver,
            config.transfer.clone(),
        )),
        Role::Tier(tier) => Arc::new(TierService::new(
            tier,
            &config.component(tier).root,
            archiver,
            config.transfer.clone(),
        )),
    }
}

/// Bind the component's endpoint and serve until a fatal error.
pub async fn run(config: Config, role: Role) -> TfsResult<()> {
    config.validate()?;
    let component = config.component(role.id());
    let handler = handler_for(&config, role);
    let listener = Listener::bind(component.listen, role.max_active()).await?;
    info!(
        "{} listening on {} (root {})",
        role.id(),
        listener.local_addr()?,
        component.root.display()
    );
    listener.serve(handler, config.transfer.clone()).await
}
