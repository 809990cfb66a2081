//! Static extension to tier routing

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::base_name;

/// Components that own a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierId {
    Router,
    Pdf,
    Text,
}

impl TierId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierId::Router => "router",
            TierId::Pdf => "pdf",
            TierId::Text => "text",
        }
    }

    /// The extension whose files this component stores.
    pub fn kind(&self) -> FileKind {
        match self {
            TierId::Router => FileKind::C,
            TierId::Pdf => FileKind::Pdf,
            TierId::Text => FileKind::Text,
        }
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported file types, keyed by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    C,
    Pdf,
    Text,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::C, FileKind::Pdf, FileKind::Text];

    /// Parse a dotted extension as sent by `dtar` (`.c`, `.pdf`, `.txt`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".c" => Some(FileKind::C),
            ".pdf" => Some(FileKind::Pdf),
            ".txt" => Some(FileKind::Text),
            _ => None,
        }
    }

    /// Routing key of a file name or path: the text after the last `.` of
    /// the final component.
    pub fn from_name(name: &str) -> Option<Self> {
        let (_, ext) = base_name(name).rsplit_once('.')?;
        match ext {
            "c" => Some(FileKind::C),
            "pdf" => Some(FileKind::Pdf),
            "txt" => Some(FileKind::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::C => ".c",
            FileKind::Pdf => ".pdf",
            FileKind::Text => ".txt",
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        FileKind::from_name(name) == Some(*self)
    }

    pub fn owner(&self) -> TierId {
        match self {
            FileKind::C => TierId::Router,
            FileKind::Pdf => TierId::Pdf,
            FileKind::Text => TierId::Text,
        }
    }

    /// Name of the container artifact built for this extension.
    pub fn archive_name(&self) -> &'static str {
        match self {
            FileKind::C => "cfiles.tar",
            FileKind::Pdf => "pdffiles.tar",
            FileKind::Text => "txtfiles.tar",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
