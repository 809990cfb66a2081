//! Tiered File Store Core
//!
//! Wire grammar, routing keys and the chunked transfer protocol shared by the
//! Router, the Storage Tiers and the client.

pub mod command;
pub mod config;
pub mod error;
pub mod path;
pub mod routing;
pub mod status;
pub mod transfer;

pub use command::{Command, Verb};
pub use config::{ComponentConfig, Config};
pub use error::{TfsError, TfsResult};
pub use path::TierPath;
pub use routing::{FileKind, TierId};
pub use transfer::{Connection, Framing, TransferConfig};
