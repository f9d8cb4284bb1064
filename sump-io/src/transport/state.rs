//! Transport state shared by the request handler and the data pusher
//!
//! All fields live behind one lock. The pusher is driven by a wake channel:
//! force-push, reschedule and shutdown requests are sent as
//! [`PusherSignal`]s so the pusher's timed wait can be cut short.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;

/// Mutable transport state
#[derive(Debug, Clone, PartialEq)]
pub struct TransportState {
    /// Pushes go to `peer` only while set
    pub paired: bool,
    /// Value of the next `SEQUENCENUMBER` line
    pub sequence_number: u32,
    /// Interval between unforced push cycles
    pub push_period: Duration,
    /// Both loops exit once set
    pub exit: bool,
    /// Sender of the most recent inbound datagram
    pub peer: Option<SocketAddr>,
}

/// Requests to the data pusher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PusherSignal {
    /// Push now; the next periodic cycle is measured from this one.
    /// Ignored while unpaired.
    Update,
    /// `paired` flipped; switch mode without waiting out the current period
    PairingChanged,
    /// Push period changed; recompute the pending deadline
    Reschedule,
    /// Exit the loop
    Shutdown,
}

/// Context object handed to both transport threads and the built-in commands
#[derive(Debug)]
pub struct TransportContext {
    state: Mutex<TransportState>,
    wake_tx: Sender<PusherSignal>,
}

impl TransportContext {
    /// Create the context and the receiving end of the pusher wake channel
    pub fn new(push_period: Duration) -> (Self, Receiver<PusherSignal>) {
        let (wake_tx, wake_rx) = crossbeam_channel::unbounded();
        let context = Self {
            state: Mutex::new(TransportState {
                paired: false,
                sequence_number: 0,
                push_period,
                exit: false,
                peer: None,
            }),
            wake_tx,
        };
        (context, wake_rx)
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> TransportState {
        self.state.lock().clone()
    }

    /// Record the sender of an inbound datagram as the push destination
    pub fn observe_sender(&self, sender: SocketAddr) {
        let mut state = self.state.lock();
        if state.peer != Some(sender) {
            log::info!(
                "Peer address {} -> {}",
                state
                    .peer
                    .map_or_else(|| "none".to_string(), |p| p.to_string()),
                sender
            );
            state.peer = Some(sender);
        }
    }

    /// Set or clear pairing; pairing also makes `sender` the peer
    ///
    /// The pusher is woken only when the flag actually changes, so repeated
    /// `SETPAIR` requests cannot force extra broadcasts or pushes.
    pub fn set_paired(&self, paired: bool, sender: SocketAddr) {
        let changed = {
            let mut state = self.state.lock();
            if paired {
                state.peer = Some(sender);
            }
            let changed = state.paired != paired;
            if changed {
                if paired {
                    log::info!("Paired with {}", sender);
                } else {
                    log::info!("Unpaired by {}", sender);
                }
            }
            state.paired = paired;
            changed
        };
        if changed {
            self.signal(PusherSignal::PairingChanged);
        }
    }

    /// Current pairing, as `Some(peer)` when paired
    pub fn paired_peer(&self) -> Option<SocketAddr> {
        let state = self.state.lock();
        if state.paired { state.peer } else { None }
    }

    pub fn is_paired(&self) -> bool {
        self.state.lock().paired
    }

    pub fn push_period(&self) -> Duration {
        self.state.lock().push_period
    }

    /// Change the push period; the pending wait is re-armed with it
    pub fn set_push_period(&self, period: Duration) {
        self.state.lock().push_period = period;
        self.signal(PusherSignal::Reschedule);
    }

    /// Return the current sequence number and advance it
    pub fn take_sequence_number(&self) -> u32 {
        let mut state = self.state.lock();
        let n = state.sequence_number;
        state.sequence_number = n.wrapping_add(1);
        n
    }

    /// Ask the pusher for an immediate push cycle
    pub fn request_update(&self) {
        self.signal(PusherSignal::Update);
    }

    /// Set the exit flag and wake the pusher
    pub fn request_shutdown(&self) {
        self.state.lock().exit = true;
        self.signal(PusherSignal::Shutdown);
    }

    pub fn should_exit(&self) -> bool {
        self.state.lock().exit
    }

    fn signal(&self, signal: PusherSignal) {
        // Receiver is gone only after the pusher exited
        if self.wake_tx.send(signal).is_err() {
            log::trace!("Pusher not running, dropped {:?}", signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_initial_state() {
        let (ctx, _rx) = TransportContext::new(Duration::from_secs(60));
        let state = ctx.snapshot();
        assert!(!state.paired);
        assert!(!state.exit);
        assert_eq!(state.sequence_number, 0);
        assert_eq!(state.push_period, Duration::from_secs(60));
        assert_eq!(state.peer, None);
        assert_eq!(ctx.paired_peer(), None);
    }

    #[test]
    fn test_pairing_records_peer_and_wakes_pusher() {
        let (ctx, rx) = TransportContext::new(Duration::from_secs(60));
        ctx.set_paired(true, addr(4000));
        assert_eq!(ctx.paired_peer(), Some(addr(4000)));
        assert_eq!(rx.try_recv(), Ok(PusherSignal::PairingChanged));

        ctx.set_paired(false, addr(4001));
        assert_eq!(rx.try_recv(), Ok(PusherSignal::PairingChanged));
        assert!(!ctx.is_paired());
        assert_eq!(ctx.paired_peer(), None);
        // Unpairing keeps the last peer address
        assert_eq!(ctx.snapshot().peer, Some(addr(4000)));
    }

    #[test]
    fn test_repeated_pairing_requests_do_not_wake_pusher() {
        let (ctx, rx) = TransportContext::new(Duration::from_secs(60));
        ctx.set_paired(false, addr(4000));
        assert!(rx.try_recv().is_err());

        ctx.set_paired(true, addr(4000));
        ctx.set_paired(true, addr(4002));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), [PusherSignal::PairingChanged]);
        // A repeated pair request still moves the peer
        assert_eq!(ctx.paired_peer(), Some(addr(4002)));
    }

    #[test]
    fn test_any_sender_becomes_peer() {
        let (ctx, _rx) = TransportContext::new(Duration::from_secs(60));
        ctx.set_paired(true, addr(4000));
        ctx.observe_sender(addr(5000));
        assert_eq!(ctx.paired_peer(), Some(addr(5000)));
    }

    #[test]
    fn test_sequence_numbers_advance_by_one() {
        let (ctx, _rx) = TransportContext::new(Duration::from_secs(60));
        assert_eq!(ctx.take_sequence_number(), 0);
        assert_eq!(ctx.take_sequence_number(), 1);
        assert_eq!(ctx.take_sequence_number(), 2);
        assert_eq!(ctx.snapshot().sequence_number, 3);
    }

    #[test]
    fn test_shutdown_sets_flag_and_signals() {
        let (ctx, rx) = TransportContext::new(Duration::from_secs(60));
        ctx.request_shutdown();
        assert!(ctx.should_exit());
        assert_eq!(rx.try_recv(), Ok(PusherSignal::Shutdown));
    }

    #[test]
    fn test_push_period_change_reschedules() {
        let (ctx, rx) = TransportContext::new(Duration::from_secs(60));
        ctx.set_push_period(Duration::from_secs(5));
        assert_eq!(ctx.push_period(), Duration::from_secs(5));
        assert_eq!(rx.try_recv(), Ok(PusherSignal::Reschedule));
    }

    #[test]
    fn test_signals_after_pusher_exit_are_dropped() {
        let (ctx, rx) = TransportContext::new(Duration::from_secs(60));
        drop(rx);
        ctx.request_update();
        ctx.request_shutdown();
        assert!(ctx.should_exit());
    }
}
