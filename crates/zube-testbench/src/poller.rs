//! Status-toggle handshake poller.
//!
//! One round trip: post a payload, announce it by flipping our status
//! sentinel, poll the peer's status until it differs from the last value
//! we saw, then fetch the peer's payload. Change detection is a level
//! comparison against `status_in`, so a peer that answers entirely between
//! two polls is still seen.

use log::{debug, trace};
use sim_core::Ticks;

use crate::config::PollConfig;
use crate::error::{TbError, TbResult};
use crate::transactor::Transactor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No round trip in progress.
    Idle,
    /// Payload and status written.
    Posted,
    /// Waiting for the peer's status to change.
    Polling,
    /// Change seen; fetching the response.
    Acked,
}

/// Outcome of one round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Peer's payload.
    pub response: u8,
    /// Peer's new status, the reference for the next round trip.
    pub status: u8,
    /// Status reads it took to see the change.
    pub polls: u32,
}

pub struct HandshakePoller {
    config: PollConfig,
    data_register: u8,
    status_register: u8,
    state: PollState,
    /// Sentinel we wrote last; `None` before the first round trip.
    status_out: Option<u8>,
    /// Peer status as of our last successful poll.
    status_in: u8,
    round: u32,
}

impl HandshakePoller {
    /// Poller for the mailbox at `base` (data) and `base + 1` (status).
    /// The peer's status is assumed to be zero, its post-reset value.
    #[must_use]
    pub fn new(config: PollConfig, base: u8) -> Self {
        Self {
            config,
            data_register: base,
            status_register: base.wrapping_add(1),
            state: PollState::Idle,
            status_out: None,
            status_in: 0,
            round: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Last peer status seen.
    #[must_use]
    pub fn status_in(&self) -> u8 {
        self.status_in
    }

    /// Last sentinel written.
    #[must_use]
    pub fn status_out(&self) -> Option<u8> {
        self.status_out
    }

    /// Round trips started so far.
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.round
    }

    /// Take the peer's current status as the baseline, so a value the peer
    /// wrote before any request is not mistaken for an answer.
    pub fn observe_status(&mut self, bus: &mut Transactor<'_>) -> TbResult<u8> {
        self.status_in = bus.read_register(self.status_register)?;
        Ok(self.status_in)
    }

    /// Run one round trip. Always returns to `Idle`, success or not.
    pub fn exchange(&mut self, bus: &mut Transactor<'_>, payload: u8) -> TbResult<Exchange> {
        self.round += 1;
        let result = self.run_round(bus, payload);
        self.state = PollState::Idle;
        result.map_err(|e| e.in_round(self.round))
    }

    fn next_sentinel(&self) -> u8 {
        let [first, second] = self.config.sentinels;
        match self.status_out {
            Some(s) if s == first => second,
            _ => first,
        }
    }

    fn run_round(&mut self, bus: &mut Transactor<'_>, payload: u8) -> TbResult<Exchange> {
        let mut polls = 0;
        let mut posted_at = Ticks::ZERO;
        loop {
            match self.state {
                PollState::Idle => {
                    // Payload must be settled before the status announces it
                    bus.write_register(self.data_register, payload)?;
                    let sentinel = self.next_sentinel();
                    bus.write_register(self.status_register, sentinel)?;
                    self.status_out = Some(sentinel);
                    posted_at = bus.testbench().cycle();
                    trace!("poller: round {} posted {payload:#04X} / {sentinel:#04X}", self.round);
                    self.state = PollState::Posted;
                }
                PollState::Posted => {
                    self.state = PollState::Polling;
                }
                PollState::Polling => {
                    if polls == self.config.budget {
                        return Err(TbError::PollTimeout {
                            round: self.round,
                            attempts: polls,
                            status: self.status_in,
                        });
                    }
                    bus.idle(Ticks::new(self.config.interval));
                    let status = bus.read_register(self.status_register)?;
                    polls += 1;
                    if status != self.status_in {
                        self.status_in = status;
                        self.state = PollState::Acked;
                        debug!(
                            "poller: round {} took {} loops to poll ({})",
                            self.round,
                            polls - 1,
                            bus.testbench().cycle().since(posted_at)
                        );
                    }
                }
                PollState::Acked => {
                    let response = bus.read_register(self.data_register)?;
                    return Ok(Exchange {
                        response,
                        status: self.status_in,
                        polls,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TbConfig;
    use crate::harness::Testbench;
    use crate::responder::{Complement, Silent};

    fn ready(responder: Box<dyn crate::responder::Responder>) -> Testbench {
        let mut tb = Testbench::new(TbConfig::default(), responder).unwrap();
        tb.bring_up().unwrap();
        tb
    }

    #[test]
    fn sentinels_alternate_from_first() {
        let mut poller = HandshakePoller::new(PollConfig::default(), 0x81);
        assert_eq!(poller.next_sentinel(), 0xFA);
        poller.status_out = Some(0xFA);
        assert_eq!(poller.next_sentinel(), 0xFB);
        poller.status_out = Some(0xFB);
        assert_eq!(poller.next_sentinel(), 0xFA);
    }

    #[test]
    fn single_round_trip() {
        let mut tb = ready(Box::new(Complement::new(1)));
        let mut poller = HandshakePoller::new(PollConfig::default(), 0x81);
        let ex = poller.exchange(&mut tb.transactor(), 0x5A).unwrap();
        assert_eq!(ex.response, 0xA5);
        assert_eq!(ex.status, 0xFA);
        assert_eq!(ex.polls, 1);
        assert_eq!(poller.state(), PollState::Idle);
        assert_eq!(poller.status_in(), 0xFA);
        assert_eq!(poller.status_out(), Some(0xFA));
    }

    #[test]
    fn silent_peer_exhausts_budget() {
        let mut tb = ready(Box::new(Silent));
        let mut config = PollConfig::default();
        config.budget = 3;
        let mut poller = HandshakePoller::new(config, 0x81);
        let err = poller.exchange(&mut tb.transactor(), 0x00).unwrap_err();
        assert!(
            matches!(err, TbError::PollTimeout { round: 1, attempts: 3, status: 0 }),
            "{err}"
        );
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn bus_failure_names_the_round() {
        // Poller pointed at an address nobody decodes
        let mut tb = ready(Box::new(Silent));
        let mut poller = HandshakePoller::new(PollConfig::default(), 0x10);
        let err = poller.exchange(&mut tb.transactor(), 0x00).unwrap_err();
        match err {
            TbError::RoundTrip { round, source } => {
                assert_eq!(round, 1);
                assert!(matches!(*source, TbError::BusTimeout { address: 0x11, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
