//! Remote control via Unix socket
//!
//! Accepts one command per line, mirroring the keyboard shortcuts:
//! `restart`, `invert`, `channels`, `preset <name>`, `next`, `prev`,
//! `view <c|m|y|k|all>`, `save`, `load`, `quit`.

use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{debug, warn};

use crate::settings::View;
use crate::sim::Channel;

pub const SOCKET_PATH: &str = "/tmp/reactink.sock";

/// Commands that can be sent over the socket
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Restart,
    Invert,
    TogglePerChannel,
    Preset(String),
    NextPreset,
    PrevPreset,
    View(View),
    Save,
    Load,
    Quit,
}

/// Controller that listens for commands on a Unix socket
pub struct Controller {
    receiver: Receiver<Command>,
    _listener_thread: thread::JoinHandle<()>,
}

impl Controller {
    /// Create a new controller listening on the Unix socket
    pub fn new() -> Result<Self, String> {
        // Remove a stale socket from a previous run
        let _ = std::fs::remove_file(SOCKET_PATH);

        let listener = UnixListener::bind(SOCKET_PATH)
            .map_err(|e| format!("Failed to bind socket {}: {}", SOCKET_PATH, e))?;

        // Non-blocking so the accept loop can notice a closed socket
        listener
            .set_nonblocking(true)
            .map_err(|e| format!("Failed to set non-blocking: {}", e))?;

        let (sender, receiver) = mpsc::channel();

        let handle = thread::spawn(move || {
            Self::listener_loop(listener, sender);
        });

        Ok(Self {
            receiver,
            _listener_thread: handle,
        })
    }

    fn listener_loop(listener: UnixListener, sender: Sender<Command>) {
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    let sender = sender.clone();
                    thread::spawn(move || {
                        Self::handle_client(stream, sender);
                    });
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(std::time::Duration::from_millis(50));
                },
                Err(e) => {
                    debug!("control socket closed: {}", e);
                    break;
                },
            }
        }
    }

    fn handle_client(stream: UnixStream, sender: Sender<Command>) {
        // Accepted sockets inherit non-blocking mode on some platforms
        let _ = stream.set_nonblocking(false);
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            match parse_command(&line) {
                Some(cmd) => {
                    if sender.send(cmd).is_err() {
                        break;
                    }
                },
                None if line.trim().is_empty() => {},
                None => warn!("unknown control command '{}'", line.trim()),
            }
        }
    }

    /// Get any pending commands (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(cmd) = self.receiver.try_recv() {
            commands.push(cmd);
        }
        commands
    }

    pub fn socket_path() -> &'static str {
        SOCKET_PATH
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(SOCKET_PATH);
    }
}

/// Parse one line. The verb is case-insensitive; preset names are not.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match (verb.to_lowercase().as_str(), rest) {
        ("r" | "restart" | "reset", "") => Some(Command::Restart),
        ("i" | "invert", "") => Some(Command::Invert),
        ("p" | "channels", "") => Some(Command::TogglePerChannel),
        ("right" | "next", "") => Some(Command::NextPreset),
        ("left" | "prev", "") => Some(Command::PrevPreset),
        ("s" | "save", "") => Some(Command::Save),
        ("l" | "load", "") => Some(Command::Load),
        ("q" | "quit" | "exit", "") => Some(Command::Quit),
        ("preset", name) if !name.is_empty() => Some(Command::Preset(name.to_string())),
        ("view", "all" | "cmyk" | "composite") => Some(Command::View(View::Composite)),
        ("view", letter) => Channel::from_letter(letter).map(|c| Command::View(View::Channel(c))),
        _ => None,
    }
}
