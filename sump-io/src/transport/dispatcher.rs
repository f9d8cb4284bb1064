//! Request dispatch against the merged command table

use super::table::{Action, CommandEntry, CommandTable, Request};
use super::wire;
use crate::core::types::SharedRegisters;
use crate::error::{Error, Result};
use std::net::SocketAddr;

/// Resolves one request datagram to one reply line
pub struct Dispatcher {
    table: CommandTable,
    registers: SharedRegisters,
}

impl Dispatcher {
    pub fn new(table: CommandTable, registers: SharedRegisters) -> Self {
        Self { table, registers }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Build the reply for a raw datagram from `sender`
    ///
    /// Never fails: anything that does not resolve to a value is answered
    /// with `INVALID COMMAND`.
    pub fn dispatch(&self, raw: &[u8], sender: SocketAddr) -> String {
        let Some(message) = wire::decode_request(raw) else {
            log::warn!("Non-text request from {} ({} bytes)", sender, raw.len());
            return wire::INVALID_COMMAND.to_string();
        };
        log::debug!("Received from {}: {}", sender, message);

        let response = match self.table.find(message) {
            Some((entry, argument)) => match self.execute(entry, argument, sender) {
                Ok(value) => wire::format_line(&entry.tag, value),
                Err(e) => {
                    log::warn!("{} from {} failed: {}", entry.trigger, sender, e);
                    wire::INVALID_COMMAND.to_string()
                }
            },
            None => {
                log::warn!("Unknown command from {}: {:?}", sender, message);
                wire::INVALID_COMMAND.to_string()
            }
        };

        log::debug!("Responded to {}: {}", sender, response.trim_end());
        response
    }

    fn execute(
        &self,
        entry: &CommandEntry,
        argument: Option<&str>,
        sender: SocketAddr,
    ) -> Result<String> {
        match &entry.action {
            // Handlers take their own locks
            Action::Handler(handler) => handler.handle(&Request { argument, sender }),
            Action::Cell(cell) => {
                let mut registers = self.registers.lock();
                if let Some(argument) = argument {
                    registers.write(cell, argument)?;
                }
                registers.read(cell).map(|value| value.to_string())
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.table.len())
            .finish()
    }
}

/// Reject a handler request that carries an argument it does not take
pub fn no_argument(request: &Request<'_>, trigger: &str) -> Result<()> {
    match request.argument {
        None => Ok(()),
        Some(arg) => Err(Error::InvalidArgument(format!(
            "{} takes no argument, got '{}'",
            trigger, arg
        ))),
    }
}
