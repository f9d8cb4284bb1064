//! UDP command and telemetry transport
//!
//! One UDP socket, two threads:
//! - `request-handler`: answers command datagrams from any sender
//! - `data-pusher`: broadcasts `PAIR=0` while unpaired, pushes telemetry to
//!   the paired peer otherwise
//!
//! The device supplies its command entries, push list and register store;
//! the transport prepends its built-in commands (`SETPAIR`, `SHUTDOWN`,
//! `SETPUSHPERIOD`, `SENDUPDATE`).

mod builtins;
mod dispatcher;
mod pusher;
mod request_handler;
mod state;
mod table;
pub mod wire;

pub use builtins::builtin_commands;
pub use dispatcher::{Dispatcher, no_argument};
pub use pusher::DataPusher;
pub use request_handler::RequestHandler;
pub use state::{PusherSignal, TransportContext, TransportState};
pub use table::{Action, CommandEntry, CommandHandler, CommandTable, PushEntry, PushList, Request};

use crate::config::Config;
use crate::core::types::SharedRegisters;
use crate::error::{Error, Result};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Running transport: both loops plus their shared context
pub struct Transport {
    context: Arc<TransportContext>,
    local_addr: SocketAddr,
    request_handler: Option<JoinHandle<()>>,
    data_pusher: Option<JoinHandle<()>>,
}

impl Transport {
    /// Bind the socket and start both loops
    ///
    /// Built-in commands are matched before `device_commands`, so a device
    /// entry that reuses a built-in trigger is never reached.
    pub fn start(
        config: &Config,
        device_commands: Vec<CommandEntry>,
        push_list: PushList,
        registers: SharedRegisters,
    ) -> Result<Self> {
        let bind_addr = config.network.bind_addr()?;
        let broadcast_addr = config.network.broadcast_addr()?;
        let push_period = config.transport.push_period()?;
        let pair_period = config.transport.pair_period()?;

        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_addr, e)))?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(config.network.read_timeout()))?;
        let push_socket = socket.try_clone()?;
        let local_addr = socket.local_addr()?;

        let (context, wake_rx) = TransportContext::new(push_period);
        let context = Arc::new(context);

        let table = CommandTable::merged(builtin_commands(&context), device_commands);
        for entry in table.iter() {
            let shadowed = table
                .iter()
                .take_while(|earlier| !std::ptr::eq(*earlier, entry))
                .any(|earlier| earlier.trigger == entry.trigger);
            if shadowed {
                log::warn!("Command {} is shadowed by an earlier entry", entry.trigger);
            }
        }
        let dispatcher = Dispatcher::new(table, Arc::clone(&registers));

        let handler_ctx = Arc::clone(&context);
        let request_handler = thread::Builder::new()
            .name("request-handler".to_string())
            .spawn(move || {
                let mut handler = RequestHandler::new(socket, dispatcher, handler_ctx);
                if let Err(e) = handler.run() {
                    log::error!("Request handler error: {}", e);
                }
            })
            .map_err(|source| Error::ThreadSpawn {
                name: "request-handler",
                source,
            })?;

        let pusher_ctx = Arc::clone(&context);
        let data_pusher = thread::Builder::new()
            .name("data-pusher".to_string())
            .spawn(move || {
                let mut pusher = DataPusher::new(
                    push_socket,
                    push_list,
                    registers,
                    pusher_ctx,
                    wake_rx,
                    broadcast_addr,
                    pair_period,
                );
                if let Err(e) = pusher.run() {
                    log::error!("Data pusher error: {}", e);
                }
            });

        let data_pusher = match data_pusher {
            Ok(handle) => handle,
            Err(source) => {
                // Request handler is already running; stop it before bailing
                context.request_shutdown();
                let _ = join_loop(request_handler, "request-handler");
                return Err(Error::ThreadSpawn {
                    name: "data-pusher",
                    source,
                });
            }
        };

        log::info!("Transport started on {}", local_addr);

        Ok(Self {
            context,
            local_addr,
            request_handler: Some(request_handler),
            data_pusher: Some(data_pusher),
        })
    }

    /// Address the command socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared transport context
    pub fn context(&self) -> &Arc<TransportContext> {
        &self.context
    }

    /// True once the exit flag is set, locally or by a remote `SHUTDOWN`
    pub fn is_shutdown_requested(&self) -> bool {
        self.context.should_exit()
    }

    /// True once both loops have returned
    pub fn is_finished(&self) -> bool {
        self.loops()
            .all(|handle| handle.as_ref().is_none_or(JoinHandle::is_finished))
    }

    /// True once either loop has returned
    ///
    /// A single dead loop leaves the transport half-working (commands
    /// answered but nothing pushed, or the reverse), so supervisors should
    /// treat it as fatal.
    pub fn any_finished(&self) -> bool {
        self.loops()
            .any(|handle| handle.as_ref().is_none_or(JoinHandle::is_finished))
    }

    fn loops(&self) -> impl Iterator<Item = &Option<JoinHandle<()>>> {
        [&self.request_handler, &self.data_pusher].into_iter()
    }

    /// Request shutdown and join both loops
    ///
    /// Returns after at most one socket read timeout.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.context.request_shutdown();

        let mut result = Ok(());
        if let Some(handle) = self.request_handler.take() {
            result = result.and(join_loop(handle, "request-handler"));
        }
        if let Some(handle) = self.data_pusher.take() {
            result = result.and(join_loop(handle, "data-pusher"));
        }

        log::info!("Transport stopped");
        result
    }
}

/// Join a loop thread, logging and reporting a panic
fn join_loop(handle: JoinHandle<()>, name: &'static str) -> Result<()> {
    handle.join().map_err(|_| {
        log::error!("{} thread panicked", name);
        Error::ThreadPanic(name)
    })
}

impl Drop for Transport {
    fn drop(&mut self) {
        if self.request_handler.is_some() || self.data_pusher.is_some() {
            if let Err(e) = self.shutdown() {
                log::error!("Transport shutdown error: {}", e);
            }
        }
    }
}
