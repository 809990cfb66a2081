//! Command grammar: `<verb> <arg1> <arg2>`

use bytes::Bytes;
use std::fmt;

use crate::error::{TfsError, TfsResult};

/// Command verbs understood by the Router and the tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Ufile,
    Dfile,
    Rmfile,
    Dtar,
    Display,
}

impl Verb {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ufile" => Some(Verb::Ufile),
            "dfile" => Some(Verb::Dfile),
            "rmfile" => Some(Verb::Rmfile),
            "dtar" => Some(Verb::Dtar),
            "display" => Some(Verb::Display),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Ufile => "ufile",
            Verb::Dfile => "dfile",
            Verb::Rmfile => "rmfile",
            Verb::Dtar => "dtar",
            Verb::Display => "display",
        }
    }

    /// Positional arguments the verb uses.
    pub fn arity(&self) -> usize {
        match self {
            Verb::Ufile => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command together with the frame it arrived in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// `None` when the first token is not a known verb
    pub verb: Option<Verb>,
    /// First token as received
    pub token: String,
    pub arg1: String,
    pub arg2: String,
    /// The frame exactly as read off the wire, forwarded verbatim when proxying
    pub raw: Bytes,
}

impl Command {
    /// Parse a command frame. Bytes after the first NUL are padding; tokens
    /// beyond the third are ignored and missing ones become empty strings.
    pub fn parse(frame: &[u8]) -> Self {
        let end = frame.iter().position(|&b| b == 0).unwrap_or(frame.len());
        let text = String::from_utf8_lossy(&frame[..end]);
        let mut tokens = text.split_ascii_whitespace();
        let token = tokens.next().unwrap_or_default().to_string();
        let arg1 = tokens.next().unwrap_or_default().to_string();
        let arg2 = tokens.next().unwrap_or_default().to_string();

        Self {
            verb: Verb::parse(&token),
            token,
            arg1,
            arg2,
            raw: Bytes::copy_from_slice(frame),
        }
    }

    /// Build the frame for a command, NUL padded to `frame_size`.
    pub fn encode(verb: Verb, arg1: &str, arg2: &str, frame_size: usize) -> TfsResult<Bytes> {
        Self::encode_line(&format!("{} {} {}", verb, arg1, arg2), frame_size)
    }

    /// Frame an arbitrary command line (used for raw passthrough).
    pub fn encode_line(line: &str, frame_size: usize) -> TfsResult<Bytes> {
        let line = line.trim_end();
        if line.is_empty() {
            return Err(TfsError::InvalidCommand("empty command".into()));
        }
        if line.len() >= frame_size || line.as_bytes().contains(&0) {
            return Err(TfsError::InvalidCommand(format!(
                "command does not fit in a {} byte frame",
                frame_size
            )));
        }
        let mut frame = vec![0u8; frame_size];
        frame[..line.len()].copy_from_slice(line.as_bytes());
        Ok(Bytes::from(frame))
    }

    /// Textual form without padding
    pub fn line(&self) -> String {
        [self.token.as_str(), self.arg1.as_str(), self.arg2.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}
