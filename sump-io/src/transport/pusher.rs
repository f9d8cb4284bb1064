//! Data pusher: pairing broadcasts and telemetry push cycles
//!
//! # States
//!
//! | State | Action | Wait |
//! |-------|--------|------|
//! | Unpaired | broadcast `PAIR=0` | pair period |
//! | Paired | unicast push list + `SEQUENCENUMBER` to peer | push period |
//!
//! The state is not cached: `paired` is read under the transport lock at the
//! top of every iteration, so `SETPAIR=0` takes effect on the next cycle.
//!
//! # Scheduling
//!
//! Waits block on the wake channel with a deadline. While paired,
//! [`PusherSignal::Update`] cuts the wait short and the following deadline is
//! measured from the end of the forced cycle, so a forced push resets the
//! period. While unpaired it is ignored and broadcasts stay one pair period
//! apart. [`PusherSignal::PairingChanged`] ends either wait.
//! [`PusherSignal::Reschedule`] re-arms the pending deadline with the current
//! push period without pushing. A deadline past the end of `Instant`'s range
//! means the wait only ends on a signal. Only this thread advances the
//! sequence number, so forced and periodic cycles never overlap.

use super::state::{PusherSignal, TransportContext};
use super::table::PushList;
use super::wire;
use crate::core::types::SharedRegisters;
use crate::error::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// Deadline passed
    Elapsed,
    /// Forced push or pairing change
    Woken,
    /// Exit requested or the channel closed
    Shutdown,
}

/// Data pusher loop state
pub struct DataPusher {
    socket: UdpSocket,
    push_list: PushList,
    registers: SharedRegisters,
    context: Arc<TransportContext>,
    wake_rx: Receiver<PusherSignal>,
    broadcast_addr: SocketAddr,
    pair_period: Duration,
}

impl DataPusher {
    /// `socket` must have `SO_BROADCAST` enabled
    pub fn new(
        socket: UdpSocket,
        push_list: PushList,
        registers: SharedRegisters,
        context: Arc<TransportContext>,
        wake_rx: Receiver<PusherSignal>,
        broadcast_addr: SocketAddr,
        pair_period: Duration,
    ) -> Self {
        Self {
            socket,
            push_list,
            registers,
            context,
            wake_rx,
            broadcast_addr,
            pair_period,
        }
    }

    /// Run until the exit flag is set, then broadcast the unpair notice
    pub fn run(&mut self) -> Result<()> {
        log::info!(
            "Data pusher started ({} fields, pairing via {})",
            self.push_list.len(),
            self.broadcast_addr
        );

        let mut last_peer: Option<SocketAddr> = None;

        while !self.context.should_exit() {
            let peer = self.context.paired_peer();

            if peer != last_peer {
                match &peer {
                    Some(addr) => log::info!("Pushing telemetry to {}", addr),
                    None => log::info!("Unpaired, broadcasting pairing requests"),
                }
                last_peer = peer;
            }

            let outcome = match peer {
                None => {
                    self.send(wire::PAIR_NOTICE, self.broadcast_addr);
                    let started = Instant::now();
                    let pair_period = self.pair_period;
                    self.wait(false, || started.checked_add(pair_period))
                }
                Some(target) => {
                    self.push_cycle(target);
                    let finished = Instant::now();
                    let context = Arc::clone(&self.context);
                    self.wait(true, move || finished.checked_add(context.push_period()))
                }
            };

            log::trace!("Pusher wait ended: {:?}", outcome);
            if outcome == WaitOutcome::Shutdown {
                break;
            }
        }

        self.send(wire::PAIR_NOTICE, self.broadcast_addr);
        log::info!("Data pusher stopped");
        Ok(())
    }

    /// One push cycle: every push entry, then the sequence number
    fn push_cycle(&self, target: SocketAddr) {
        for entry in &self.push_list {
            // Lock per entry; fields are not snapshotted together
            let line = {
                let registers = self.registers.lock();
                match registers.read(&entry.cell) {
                    Ok(value) => wire::format_line(&entry.tag, value),
                    Err(e) => {
                        log::warn!("Skipping push field {}: {}", entry.tag, e);
                        continue;
                    }
                }
            };
            self.send(&line, target);
        }

        let sequence = self.context.take_sequence_number();
        self.send(&wire::format_line(wire::SEQUENCE_TAG, sequence), target);
        log::debug!("Push cycle {} sent to {}", sequence, target);
    }

    /// Block until the deadline, a wake signal, or shutdown
    ///
    /// `deadline` is re-evaluated after a reschedule signal; `None` waits for
    /// a signal only. Forced pushes end the wait only when `accept_update`.
    fn wait(&self, accept_update: bool, deadline: impl Fn() -> Option<Instant>) -> WaitOutcome {
        loop {
            let received = match deadline() {
                Some(deadline) => self.wake_rx.recv_deadline(deadline),
                None => self
                    .wake_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(PusherSignal::Update) if !accept_update => {
                    log::trace!("Forced push ignored while unpaired");
                }
                Ok(PusherSignal::PairingChanged) => return WaitOutcome::Woken,
                Ok(PusherSignal::Update) => {
                    // Coalesce a burst into one cycle; state is re-read next
                    // iteration, so dropped signals lose nothing
                    let pending = self.wake_rx.try_iter().count();
                    if pending > 0 {
                        log::trace!("Coalesced {} pending wake signals", pending);
                    }
                    return WaitOutcome::Woken;
                }
                Ok(PusherSignal::Reschedule) => continue,
                Ok(PusherSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    return WaitOutcome::Shutdown;
                }
                Err(RecvTimeoutError::Timeout) => return WaitOutcome::Elapsed,
            }
        }
    }

    fn send(&self, line: &str, target: SocketAddr) {
        match self.socket.send_to(line.as_bytes(), target) {
            Ok(_) => log::debug!("Sent to {}: {}", target, line.trim_end()),
            // UDP send errors are not fatal - log and continue
            Err(e) => log::warn!("Failed to send {} to {}: {}", line.trim_end(), target, e),
        }
    }
}
