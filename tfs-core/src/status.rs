//! Status lines and sentinels exchanged on the wire

use crate::routing::TierId;

/// Sent by a tier when `display` names a directory it does not have.
pub const DIRECTORY_NOT_FOUND: &str = "DIRECTORY_NOT_FOUND\n";

pub const INVALID_COMMAND: &str = "Invalid command\n";

/// `dtar` with an extension no component owns
pub const UNSUPPORTED_FILE_TYPE: &str = "Unsupported file type\n";

pub fn uploaded(name: &str) -> String {
    format!("File {} uploaded successfully\n", name)
}

pub fn downloaded(name: &str) -> String {
    format!("File {} downloaded successfully\n", name)
}

pub fn deleted(name: &str) -> String {
    format!("File {} deleted successfully.\n", name)
}

/// `ufile`/`dfile`/`rmfile` on an extension no component owns
pub fn not_supported(name: &str) -> String {
    format!("File {} not supported for this process.\n", name)
}

pub fn open_failed(path: &str) -> String {
    format!("Failed to open file {} for writing\n", path)
}

pub fn tier_unavailable(tier: TierId) -> String {
    format!("Storage tier {} is unavailable\n", tier)
}

pub fn tier_no_response(tier: TierId) -> String {
    format!("Storage tier {} returned no response\n", tier)
}

/// Strip the padding a short-read payload may carry and split into lines.
pub fn listing_lines(response: &str) -> impl Iterator<Item = &str> {
    response
        .trim_end_matches('\0')
        .lines()
        .map(|line| line.trim_matches('\0').trim())
        .filter(|line| !line.is_empty())
}
