//! Command table and push list
//!
//! A [`CommandEntry`] maps a trigger keyword to either a register [`Cell`]
//! (read, or parse-and-store when an argument is given) or a
//! [`CommandHandler`]. Tables are ordered and the first matching entry wins;
//! the transport places its built-in commands ahead of the device's.

use crate::core::types::Cell;
use crate::error::Result;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Inbound command as seen by a handler
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Text after `=`, `None` for a bare trigger
    pub argument: Option<&'a str>,
    /// Address the datagram came from
    pub sender: SocketAddr,
}

/// Handler capability for commands that are more than a register access
///
/// Handlers run on the request handler thread without any transport or
/// register lock held; they must lock whatever shared state they touch. The
/// returned string becomes the value of the `TAG=VALUE` reply, an error
/// becomes `INVALID COMMAND`.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, request: &Request<'_>) -> Result<String>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Request<'_>) -> Result<String> + Send + Sync,
{
    fn handle(&self, request: &Request<'_>) -> Result<String> {
        self(request)
    }
}

/// What a matched command does
#[derive(Clone)]
pub enum Action {
    /// Direct register access
    Cell(Cell),
    /// Delegate to a handler
    Handler(Arc<dyn CommandHandler>),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Action::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// One row of the command table
#[derive(Debug, Clone)]
pub struct CommandEntry {
    /// Wire keyword of the request
    pub trigger: String,
    /// Keyword of the `TAG=VALUE` reply
    pub tag: String,
    pub action: Action,
}

impl CommandEntry {
    /// Command backed by a register cell
    pub fn cell(trigger: &str, tag: &str, cell: Cell) -> Self {
        Self {
            trigger: trigger.to_string(),
            tag: tag.to_string(),
            action: Action::Cell(cell),
        }
    }

    /// Command backed by a handler
    pub fn handler<H>(trigger: &str, tag: &str, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        Self {
            trigger: trigger.to_string(),
            tag: tag.to_string(),
            action: Action::Handler(Arc::new(handler)),
        }
    }

    /// Match a trimmed request against this entry
    ///
    /// Matches `TRIGGER` exactly (returns `Some(None)`) or `TRIGGER=ARG`
    /// (returns `Some(Some(arg))`). Anything else, including a longer keyword
    /// that merely starts with the trigger, does not match.
    pub fn match_request<'m>(&self, message: &'m str) -> Option<Option<&'m str>> {
        let rest = message.strip_prefix(self.trigger.as_str())?;
        if rest.is_empty() {
            Some(None)
        } else {
            rest.strip_prefix('=').map(Some)
        }
    }
}

/// Ordered command table, first match wins
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in entries first, then the device's
    pub fn merged(builtins: Vec<CommandEntry>, device: Vec<CommandEntry>) -> Self {
        let mut table = Self::new();
        table.extend(builtins);
        table.extend(device);
        table
    }

    pub fn push(&mut self, entry: CommandEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = CommandEntry>) {
        self.entries.extend(entries);
    }

    /// First entry matching `message`, with its argument
    pub fn find<'m>(&self, message: &'m str) -> Option<(&CommandEntry, Option<&'m str>)> {
        self.entries
            .iter()
            .find_map(|entry| entry.match_request(message).map(|arg| (entry, arg)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }
}

/// One telemetry field of a push cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEntry {
    pub tag: String,
    pub cell: Cell,
}

impl PushEntry {
    pub fn new(tag: &str, cell: Cell) -> Self {
        Self {
            tag: tag.to_string(),
            cell,
        }
    }
}

/// Ordered push list
pub type PushList = Vec<PushEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_handler(value: &'static str) -> impl CommandHandler {
        move |_: &Request<'_>| -> Result<String> { Ok(value.to_string()) }
    }

    #[test]
    fn test_match_bare_and_argument_forms() {
        let entry = CommandEntry::cell("GETTEMP", "TEMP", Cell::float("temp_f"));
        assert_eq!(entry.match_request("GETTEMP"), Some(None));
        assert_eq!(entry.match_request("GETTEMP=5"), Some(Some("5")));
        assert_eq!(entry.match_request("GETTEMP="), Some(Some("")));
        assert_eq!(entry.match_request("GETTEMPX"), None);
        assert_eq!(entry.match_request("GETTEM"), None);
        assert_eq!(entry.match_request("gettemp"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let table = CommandTable::merged(
            vec![CommandEntry::handler("SETPAIR", "PAIR", ok_handler("builtin"))],
            vec![
                CommandEntry::handler("SETPAIR", "DEVICEPAIR", ok_handler("device")),
                CommandEntry::handler("SETPAIRX", "PAIRX", ok_handler("x")),
            ],
        );
        assert_eq!(table.len(), 3);

        let (entry, arg) = table.find("SETPAIR=1").unwrap();
        assert_eq!(entry.tag, "PAIR");
        assert_eq!(arg, Some("1"));

        let (entry, _) = table.find("SETPAIRX=1").unwrap();
        assert_eq!(entry.tag, "PAIRX");
    }

    #[test]
    fn test_no_match() {
        let table = CommandTable::merged(
            vec![CommandEntry::handler("SHUTDOWN", "SHUTDOWN", ok_handler("1"))],
            Vec::new(),
        );
        assert!(table.find("REBOOT").is_none());
        assert!(table.find("").is_none());
    }

    #[test]
    fn test_closure_handler_sees_request() {
        let entry = CommandEntry::handler("ECHO", "ECHO", |req: &Request<'_>| -> Result<String> {
            Ok(req.argument.unwrap_or("-").to_string())
        });
        let Action::Handler(handler) = &entry.action else {
            panic!("expected handler");
        };
        let request = Request {
            argument: Some("hi"),
            sender: "127.0.0.1:9".parse().unwrap(),
        };
        assert_eq!(handler.handle(&request).unwrap(), "hi");
    }
}
