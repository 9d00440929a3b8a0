//! Passive bus monitor.
//!
//! Watches the wires after every fast edge and records each strobe window
//! as a [`BusCycle`]. It never drives anything.

use std::fmt;

use log::warn;
use sim_core::{Logic, Ticks};
use zube_mailbox::BusPins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// One completed strobe window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCycle {
    pub direction: Direction,
    pub address: u8,
    /// Data level on the last edge the strobe was seen asserted.
    pub data: Logic,
    /// First edge the strobe was seen asserted.
    pub asserted_at: Ticks,
    /// First edge the strobe was seen released.
    pub released_at: Ticks,
}

#[derive(Debug, Default)]
pub struct BusMonitor {
    cycles: Vec<BusCycle>,
    open: Option<BusCycle>,
    overlaps: Vec<Ticks>,
}

impl BusMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the wires at edge `now`.
    pub fn observe(&mut self, now: Ticks, pins: &BusPins) {
        if pins.read_asserted() && pins.write_asserted() {
            warn!("monitor: RD and WR both asserted at cycle {}", now.get());
            self.overlaps.push(now);
        }

        let active = if pins.write_asserted() {
            Some(Direction::Write)
        } else if pins.read_asserted() {
            Some(Direction::Read)
        } else {
            None
        };

        if let Some(open) = self.open.as_mut() {
            if active == Some(open.direction) {
                open.address = pins.address;
                open.data = pins.data();
                return;
            }
            let mut done = *open;
            done.released_at = now;
            self.cycles.push(done);
            self.open = None;
        }

        if let Some(direction) = active {
            self.open = Some(BusCycle {
                direction,
                address: pins.address,
                data: pins.data(),
                asserted_at: now,
                released_at: now,
            });
        }
    }

    /// Completed strobe windows, oldest first.
    #[must_use]
    pub fn cycles(&self) -> &[BusCycle] {
        &self.cycles
    }

    /// Completed writes to `address`, oldest first.
    pub fn writes_to(&self, address: u8) -> impl Iterator<Item = &BusCycle> {
        self.cycles
            .iter()
            .filter(move |c| c.direction == Direction::Write && c.address == address)
    }

    /// Edges on which both strobes were asserted.
    #[must_use]
    pub fn overlaps(&self) -> &[Ticks] {
        &self.overlaps
    }

    pub fn clear(&mut self) {
        self.cycles.clear();
        self.overlaps.clear();
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_a_write_window() {
        let mut mon = BusMonitor::new();
        let mut pins = BusPins::new();
        pins.address = 0x81;
        pins.drive_host(Some(0x07));
        pins.wr_b = false;
        mon.observe(Ticks::new(10), &pins);
        mon.observe(Ticks::new(11), &pins);
        pins.wr_b = true;
        pins.drive_host(None);
        mon.observe(Ticks::new(12), &pins);

        assert_eq!(
            mon.cycles(),
            &[BusCycle {
                direction: Direction::Write,
                address: 0x81,
                data: Logic::Driven(0x07),
                asserted_at: Ticks::new(10),
                released_at: Ticks::new(12),
            }]
        );
        assert_eq!(mon.writes_to(0x81).count(), 1);
        assert_eq!(mon.writes_to(0x82).count(), 0);
    }

    #[test]
    fn flags_overlapping_strobes() {
        let mut mon = BusMonitor::new();
        let mut pins = BusPins::new();
        pins.wr_b = false;
        pins.rd_b = false;
        mon.observe(Ticks::new(5), &pins);
        assert_eq!(mon.overlaps(), &[Ticks::new(5)]);
    }

    #[test]
    fn direction_switch_closes_window() {
        let mut mon = BusMonitor::new();
        let mut pins = BusPins::new();
        pins.rd_b = false;
        mon.observe(Ticks::new(1), &pins);
        pins.rd_b = true;
        pins.wr_b = false;
        mon.observe(Ticks::new(2), &pins);
        pins.wr_b = true;
        mon.observe(Ticks::new(3), &pins);

        let dirs: Vec<Direction> = mon.cycles().iter().map(|c| c.direction).collect();
        assert_eq!(dirs, vec![Direction::Read, Direction::Write]);
    }
}
