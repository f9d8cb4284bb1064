//! UDP request handler
//!
//! Receives command datagrams, dispatches them against the command table and
//! replies to the sender from the same socket.
//!
//! # Loop
//!
//! ```text
//! 1. recv_from (bounded by the socket read timeout)
//! 2. Record sender as peer address
//! 3. Dispatch -> TAG=VALUE or INVALID COMMAND
//! 4. send_to sender
//! 5. Exit once the transport exit flag is set
//! ```
//!
//! The read timeout is what lets the loop notice shutdown: a blocked receive
//! returns `WouldBlock`/`TimedOut` and the exit flag is polled again.

use super::dispatcher::Dispatcher;
use super::state::TransportContext;
use super::wire::MAX_DATAGRAM_SIZE;
use crate::error::Result;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

/// Request handler loop state
pub struct RequestHandler {
    socket: UdpSocket,
    dispatcher: Dispatcher,
    context: Arc<TransportContext>,
}

impl RequestHandler {
    /// `socket` must already carry a read timeout
    pub fn new(socket: UdpSocket, dispatcher: Dispatcher, context: Arc<TransportContext>) -> Self {
        Self {
            socket,
            dispatcher,
            context,
        }
    }

    /// Run until the exit flag is set
    pub fn run(&mut self) -> Result<()> {
        log::info!(
            "Request handler listening on {} ({} commands)",
            self.socket.local_addr()?,
            self.dispatcher.table().len()
        );

        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

        while !self.context.should_exit() {
            let (len, sender) = match self.socket.recv_from(&mut buffer) {
                Ok(received) => received,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    continue;
                }
                Err(e) => {
                    // e.g. ICMP port unreachable surfacing as ConnectionReset
                    log::warn!("Receive error: {}", e);
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
            };

            self.context.observe_sender(sender);
            let response = self.dispatcher.dispatch(&buffer[..len], sender);

            if let Err(e) = self.socket.send_to(response.as_bytes(), sender) {
                log::warn!("Failed to reply to {}: {}", sender, e);
            }
        }

        log::info!("Request handler stopped");
        Ok(())
    }
}
