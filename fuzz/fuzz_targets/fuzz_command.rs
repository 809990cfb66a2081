// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for command frames and the paths they carry

#![no_main]

use libfuzzer_sys::fuzz_target;
use tfs_core::command::Command;
use tfs_core::path::TierPath;
use tfs_core::routing::FileKind;

fuzz_target!(|data: &[u8]| {
    // Any byte string is a possible frame off the wire
    let cmd = Command::parse(data);
    let _ = cmd.line();

    let kind = FileKind::from_name(&cmd.arg1);
    let path = TierPath::new(&cmd.arg1);
    assert!(!path.segments.iter().any(|s| s == ".." || s == "." || s.is_empty()));

    if let Some(kind) = kind {
        assert!(kind.matches(&cmd.arg1));
    }

    let dest = TierPath::new(&cmd.arg2);
    assert!(dest.resolve(std::path::Path::new("/srv/tier")).starts_with("/srv/tier"));
    let _ = dest.parent();
    let _ = dest.extension();

    // Re-encoding a parsed line must fit the frame it came from
    let line = cmd.line();
    if !line.is_empty() && line.len() < data.len() {
        let _ = Command::encode_line(&line, data.len());
    }
});
