// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command implementations for the tfs client

use bytesize::ByteSize;
use console::style;
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tfs_core::{command::Verb, Config, TfsError, TfsResult};
use tfs_providers::{Download, RouterSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// The router listens on every interface; clients reach it on loopback.
pub fn router_addr(config: &Config) -> SocketAddr {
    let listen = config.router.listen;
    if listen.ip().is_unspecified() {
        SocketAddr::from((Ipv4Addr::LOCALHOST, listen.port()))
    } else {
        listen
    }
}

fn print_response(line: &str) {
    println!("Server response: {}", line.trim_end());
}

fn download_dir() -> TfsResult<PathBuf> {
    Ok(std::env::current_dir()?)
}

fn report_download(download: Download, verbose: bool) {
    match download {
        Download::Saved { path, bytes, status } => {
            println!("Receiving file: {}", path.display());
            if verbose {
                eprintln!("Received {}", ByteSize(bytes));
            }
            if !status.is_empty() {
                print_response(&status);
            }
        }
        Download::Rejected(line) => print_response(&line),
    }
}

pub async fn ufile(session: &mut RouterSession, file: &Path, dest: &str, verbose: bool) -> TfsResult<()> {
    if verbose {
        if let Ok(meta) = tokio::fs::metadata(file).await {
            eprintln!("Uploading: {} ({})", file.display(), ByteSize(meta.len()));
        }
    }
    let line = session.upload(file, dest).await?;
    print_response(&line);
    Ok(())
}

pub async fn dfile(session: &mut RouterSession, path: &str, verbose: bool) -> TfsResult<()> {
    if verbose {
        eprintln!("Downloading: {}", path);
    }
    let download = session.download(path, &download_dir()?).await?;
    report_download(download, verbose);
    Ok(())
}

pub async fn rmfile(session: &mut RouterSession, path: &str, verbose: bool) -> TfsResult<()> {
    if verbose {
        eprintln!("Removing: {}", path);
    }
    let line = session.remove(path).await?;
    print_response(&line);
    Ok(())
}

pub async fn dtar(session: &mut RouterSession, extension: &str, verbose: bool) -> TfsResult<()> {
    if verbose {
        eprintln!("Archiving: *{}", extension);
    }
    let download = session.archive(extension, &download_dir()?).await?;
    report_download(download, verbose);
    Ok(())
}

pub async fn display(session: &mut RouterSession, path: &str, verbose: bool) -> TfsResult<()> {
    if verbose {
        eprintln!("Listing: {}", if path.is_empty() { "~" } else { path });
    }
    let names = session.display(path).await?;
    if names.is_empty() {
        println!("(empty directory)");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// One line typed at the shell prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Exit,
    Command { verb: Verb, arg1: &'a str, arg2: &'a str },
    /// Fewer arguments than the verb takes
    MissingArguments(Verb),
    /// Not a known verb; passed through for the Router to reject
    Unknown,
}

fn parse_input(line: &str) -> Input<'_> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&token) = tokens.first() else {
        return Input::Empty;
    };
    if matches!(token, "exit" | "quit") {
        return Input::Exit;
    }
    let Some(verb) = Verb::parse(token) else {
        return Input::Unknown;
    };
    let args = &tokens[1..];
    if args.len() < verb.arity() {
        return Input::MissingArguments(verb);
    }
    Input::Command {
        verb,
        arg1: args.first().copied().unwrap_or(""),
        arg2: args.get(1).copied().unwrap_or(""),
    }
}

fn usage(verb: Verb) -> &'static str {
    match verb {
        Verb::Ufile => "ufile <file> <destination>",
        Verb::Dfile => "dfile <path>",
        Verb::Rmfile => "rmfile <path>",
        Verb::Dtar => "dtar <.c|.pdf|.txt>",
        Verb::Display => "display <path>",
    }
}

/// Read `<verb> <arg1> <arg2>` lines from stdin until EOF or `exit`.
pub async fn shell(session: &mut RouterSession, verbose: bool) -> TfsResult<()> {
    session.connect().await?;
    println!("Connected to {}", style(session.addr()).cyan());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Enter command: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };
        debug!(line = %line, "shell input");

        let result = match parse_input(&line) {
            Input::Empty => {
                println!("No command entered.");
                continue;
            }
            Input::Exit => return Ok(()),
            Input::MissingArguments(verb) => {
                println!("Usage: {}", usage(verb));
                continue;
            }
            Input::Command { verb, arg1, arg2 } => match verb {
                Verb::Ufile => ufile(session, Path::new(arg1), arg2, verbose).await,
                Verb::Dfile => dfile(session, arg1, verbose).await,
                Verb::Rmfile => rmfile(session, arg1, verbose).await,
                Verb::Dtar => dtar(session, arg1, verbose).await,
                Verb::Display => display(session, arg1, verbose).await,
            },
            Input::Unknown => session.raw(&line).await.map(|status| print_response(&status)),
        };

        match result {
            Ok(()) => {}
            Err(TfsError::NotFound(name)) => {
                println!("{} {}", style("Not found:").yellow(), name);
            }
            Err(e) if e.is_transport() => {
                warn!("lost connection to {}: {}", session.addr(), e);
                println!("{} {}", style("Server disconnected:").red(), e);
            }
            Err(e) => eprintln!("{} {}", style("Error:").red().bold(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_addr_uses_loopback_for_wildcard() {
        let mut config = Config::with_home(Path::new("/home/u"));
        config.router.listen = "0.0.0.0:8091".parse().unwrap();
        assert_eq!(router_addr(&config), "127.0.0.1:8091".parse().unwrap());

        config.router.listen = "10.0.0.5:9000".parse().unwrap();
        assert_eq!(router_addr(&config), "10.0.0.5:9000".parse().unwrap());
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("quit"), Input::Exit);
        assert_eq!(
            parse_input("ufile ./a.c notes extra"),
            Input::Command { verb: Verb::Ufile, arg1: "./a.c", arg2: "notes" }
        );
        assert_eq!(
            parse_input("display  notes"),
            Input::Command { verb: Verb::Display, arg1: "notes", arg2: "" }
        );
        assert_eq!(parse_input("frobnicate x"), Input::Unknown);
    }

    #[test]
    fn test_parse_input_checks_arity() {
        assert_eq!(parse_input("ufile ./a.c"), Input::MissingArguments(Verb::Ufile));
        assert_eq!(parse_input("dfile"), Input::MissingArguments(Verb::Dfile));
        assert_eq!(parse_input("dtar"), Input::MissingArguments(Verb::Dtar));
        assert!(matches!(parse_input("rmfile a.c"), Input::Command { verb: Verb::Rmfile, .. }));
    }
}
