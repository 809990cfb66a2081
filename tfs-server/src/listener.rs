// SPDX-License-Identifier: AGPL-3.0-or-later
//! Accept loop: one task per connection

use std::net::SocketAddr;
use std::sync::Arc;
use tfs_core::{TfsError, TfsResult, TransferConfig};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::dispatch::{serve_connection, CommandHandler};

pub struct Listener {
    listener: TcpListener,
    /// Permits for concurrently served clients; `None` is unbounded
    limit: Option<Arc<Semaphore>>,
}

impl Listener {
    pub async fn bind(addr: SocketAddr, max_active: Option<usize>) -> TfsResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TfsError::Network(format!("cannot bind {}: {}", addr, e)))?;
        Ok(Self {
            listener,
            limit: max_active.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        })
    }

    pub fn local_addr(&self) -> TfsResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections until accepting fails. With a bound in place, a
    /// permit is taken before `accept`, so no further client is accepted
    /// while the bound is reached.
    pub async fn serve(self, handler: Arc<dyn CommandHandler>, transfer: TransferConfig) -> TfsResult<()> {
        loop {
            let permit = match &self.limit {
                Some(limit) => Some(
                    Arc::clone(limit)
                        .acquire_owned()
                        .await
                        .map_err(|e| TfsError::Other(e.to_string()))?,
                ),
                None => None,
            };

            let (mut stream, peer) = self.listener.accept().await?;
            info!("New client {} connected to {}", peer, handler.name());
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Cannot set TCP_NODELAY for {}: {}", peer, e);
            }

            let handler = Arc::clone(&handler);
            let transfer = transfer.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = serve_connection(&mut stream, handler.as_ref(), &transfer).await {
                    debug!("Connection {} ended: {}", peer, e);
                }
            });
        }
    }
}
