// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-connection command loop

use async_trait::async_trait;
use tfs_core::{
    command::{Command, Verb},
    status::INVALID_COMMAND,
    transfer::{self, Connection},
    TfsResult, TransferConfig,
};
use tracing::{error, info};

/// One handler per verb. Returning `Err` aborts the command without a
/// response and closes the connection.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn ufile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()>;
    async fn dfile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()>;
    async fn rmfile(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()>;
    async fn dtar(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()>;
    async fn display(&self, conn: &mut dyn Connection, cmd: &Command) -> TfsResult<()>;
}

/// Read and execute commands until the peer disconnects. Each command,
/// including any proxy round trip, completes before the next one is read.
pub async fn serve_connection(
    conn: &mut dyn Connection,
    handler: &dyn CommandHandler,
    transfer: &TransferConfig,
) -> TfsResult<()> {
    loop {
        let Some(cmd) = transfer::read_command(conn, transfer).await? else {
            info!("Client disconnected from {}", handler.name());
            return Ok(());
        };
        info!(
            command = %cmd.token,
            arg1 = %cmd.arg1,
            arg2 = %cmd.arg2,
            "{} received command",
            handler.name()
        );

        let result = match cmd.verb {
            Some(Verb::Ufile) => handler.ufile(conn, &cmd).await,
            Some(Verb::Dfile) => handler.dfile(conn, &cmd).await,
            Some(Verb::Rmfile) => handler.rmfile(conn, &cmd).await,
            Some(Verb::Dtar) => handler.dtar(conn, &cmd).await,
            Some(Verb::Display) => handler.display(conn, &cmd).await,
            None => transfer::send_status(conn, INVALID_COMMAND).await,
        };

        if let Err(e) = result {
            if e.is_silent_abort() {
                info!("{} aborted `{}`: {}", handler.name(), cmd, e);
            } else {
                error!("{} failed `{}`: {}", handler.name(), cmd, e);
            }
            return Err(e);
        }
    }
}
