//! Component configuration
//!
//! Every component receives an explicit [`Config`] at startup. Defaults are
//! compiled in; an optional TOML file overrides any subset of them:
//!
//! ```toml
//! [router]
//! listen = "0.0.0.0:8091"
//! root = "/srv/tfs/smain"
//!
//! [transfer]
//! chunk_size = 1024
//! framing = "short-read"
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{TfsError, TfsResult};
use crate::routing::TierId;
use crate::transfer::TransferConfig;

pub const ROUTER_PORT: u16 = 8091;
pub const PDF_PORT: u16 = 8088;
pub const TEXT_PORT: u16 = 8089;

/// Listening endpoint and namespace root of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub listen: SocketAddr,
    pub root: PathBuf,
}

/// Whole-deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub router: ComponentConfig,
    pub pdf: ComponentConfig,
    pub text: ComponentConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// File layout with every field optional, merged over the defaults
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    router: Option<PartialComponent>,
    pdf: Option<PartialComponent>,
    text: Option<PartialComponent>,
    transfer: Option<TransferConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialComponent {
    listen: Option<SocketAddr>,
    root: Option<PathBuf>,
}

impl PartialComponent {
    fn apply(self, target: &mut ComponentConfig) {
        if let Some(listen) = self.listen {
            target.listen = listen;
        }
        if let Some(root) = self.root {
            target.root = root;
        }
    }
}

impl Config {
    /// Compiled-in layout with every namespace under `home`.
    pub fn with_home(home: &Path) -> Self {
        Self {
            router: ComponentConfig {
                listen: SocketAddr::from(([0, 0, 0, 0], ROUTER_PORT)),
                root: home.join("smain"),
            },
            pdf: ComponentConfig {
                listen: SocketAddr::from(([127, 0, 0, 3], PDF_PORT)),
                root: home.join("spdf"),
            },
            text: ComponentConfig {
                listen: SocketAddr::from(([127, 0, 0, 2], TEXT_PORT)),
                root: home.join("stext"),
            },
            transfer: TransferConfig::default(),
        }
    }

    /// Defaults rooted at the current user's home directory.
    pub fn default_for_user() -> TfsResult<Self> {
        let dirs = directories::BaseDirs::new()
            .ok_or_else(|| TfsError::Config("cannot determine home directory".into()))?;
        Ok(Self::with_home(dirs.home_dir()))
    }

    /// Parse a TOML document over `base`.
    pub fn from_toml(base: Self, content: &str) -> TfsResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| TfsError::Config(e.to_string()))?;
        let mut config = base;
        if let Some(router) = file.router {
            router.apply(&mut config.router);
        }
        if let Some(pdf) = file.pdf {
            pdf.apply(&mut config.pdf);
        }
        if let Some(text) = file.text {
            text.apply(&mut config.text);
        }
        if let Some(transfer) = file.transfer {
            config.transfer = transfer;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load the user defaults, overridden by `path` when it exists.
    pub fn load(path: Option<&Path>) -> TfsResult<Self> {
        let base = Self::default_for_user()?;
        match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(path)?;
                Self::from_toml(base, &content)
            }
            Some(path) => {
                info!("Config file {} not found, using defaults", path.display());
                Ok(base)
            }
            None => Ok(base),
        }
    }

    pub fn component(&self, tier: TierId) -> &ComponentConfig {
        match tier {
            TierId::Router => &self.router,
            TierId::Pdf => &self.pdf,
            TierId::Text => &self.text,
        }
    }

    pub fn validate(&self) -> TfsResult<()> {
        // A command frame must hold at least `ufile x y`.
        if self.transfer.chunk_size < 16 {
            return Err(TfsError::Config(format!(
                "chunk_size {} is too small",
                self.transfer.chunk_size
            )));
        }
        let listens = [self.router.listen, self.pdf.listen, self.text.listen];
        for (i, a) in listens.iter().enumerate() {
            if listens[i + 1..].contains(a) && a.port() != 0 {
                return Err(TfsError::Config(format!("listen address {} is used twice", a)));
            }
        }
        Ok(())
    }
}
