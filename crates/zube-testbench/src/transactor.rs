//! Host-side bus transactor.
//!
//! Drives one strobe-timed access at a time on the Z80 bus pins. The
//! transactor is the only driver of the host side, and advances the
//! simulation itself: a call returns once the access and its turnaround
//! have completed in simulated time.

use log::trace;
use sim_core::{Tickable, Ticks};

use crate::config::BusTiming;
use crate::error::{TbError, TbResult};
use crate::harness::Testbench;
use crate::monitor::Direction;

pub struct Transactor<'a> {
    tb: &'a mut Testbench,
    timing: BusTiming,
}

impl<'a> Transactor<'a> {
    pub fn new(tb: &'a mut Testbench) -> Self {
        let timing = tb.config().bus.clone();
        Self { tb, timing }
    }

    #[must_use]
    pub fn testbench(&self) -> &Testbench {
        &*self.tb
    }

    /// Let `cycles` edges pass with the bus idle.
    pub fn idle(&mut self, cycles: Ticks) {
        self.tb.tick_n(cycles);
    }

    /// Write `value` to the register at `address`.
    ///
    /// Address and data are set up one cycle ahead of `WR`, held for the
    /// write hold, and the data bus is released together with the strobe.
    pub fn write_register(&mut self, address: u8, value: u8) -> TbResult<()> {
        self.check_ready(address, Direction::Write)?;

        let pins = self.tb.pins_mut();
        pins.address = address;
        pins.drive_host(Some(value));
        self.tb.tick_n(Ticks::new(self.timing.setup));

        self.tb.pins_mut().wr_b = false;
        self.tb.tick_n(Ticks::new(self.timing.write_hold));

        let pins = self.tb.pins_mut();
        pins.wr_b = true;
        pins.drive_host(None);
        self.tb.tick_n(Ticks::new(self.timing.turnaround));

        trace!("bus: wrote {value:#04X} to {address:#04X}");
        Ok(())
    }

    /// Read the register at `address`.
    ///
    /// Waits for a responder to drive the bus, holds `RD` for at least the
    /// read hold, and samples at the end of the window.
    pub fn read_register(&mut self, address: u8) -> TbResult<u8> {
        self.check_ready(address, Direction::Read)?;

        let pins = self.tb.pins_mut();
        pins.address = address;
        pins.drive_host(None);
        self.tb.tick_n(Ticks::new(self.timing.setup));

        self.tb.pins_mut().rd_b = false;
        let budget = Ticks::new(self.timing.response_timeout);
        let Some(waited) = self.tb.wait_until(budget, |tb| tb.pins().data().is_driven()) else {
            self.release_read();
            return Err(TbError::BusTimeout {
                address,
                cycles: budget.get(),
            });
        };

        let hold = Ticks::new(self.timing.read_hold);
        if waited < hold {
            self.tb.tick_n(hold - waited);
        }
        let sample = self.tb.pins().data();
        self.release_read();

        let value = sample.value().ok_or(TbError::BusContention {
            address,
            observed: sample,
        })?;
        trace!("bus: read {value:#04X} from {address:#04X}");
        Ok(value)
    }

    fn release_read(&mut self) {
        self.tb.pins_mut().rd_b = true;
        self.tb.tick_n(Ticks::new(self.timing.turnaround));
    }

    /// RSTB high, peripheral out of reset, and no strobe left asserted.
    fn check_ready(&self, address: u8, direction: Direction) -> TbResult<()> {
        if !self.tb.rstb() || self.tb.mailbox().in_reset() {
            return Err(TbError::NotReady { address, direction });
        }
        if !self.tb.pins().strobes_idle() {
            return Err(TbError::StrobeConflict { address, direction });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TbConfig;
    use crate::responder::{FixedContents, Silent};
    use sim_core::Logic;

    fn ready(responder: Box<dyn crate::responder::Responder>) -> Testbench {
        let mut tb = Testbench::new(TbConfig::default(), responder).unwrap();
        tb.bring_up().unwrap();
        tb
    }

    #[test]
    fn write_lands_in_host_mailbox() {
        let mut tb = ready(Box::new(Silent));
        tb.transactor().write_register(0x81, 0x3C).unwrap();
        assert_eq!(tb.mailbox().host().data, 0x3C);
        assert!(tb.pins().strobes_idle());
        assert_eq!(tb.pins().data(), Logic::HighZ);
    }

    #[test]
    fn write_takes_setup_hold_and_turnaround() {
        let mut tb = ready(Box::new(Silent));
        let start = tb.cycle();
        tb.transactor().write_register(0x82, 0xFA).unwrap();
        assert_eq!(tb.cycle() - start, Ticks::new(1 + 8 + 4));
    }

    #[test]
    fn read_returns_soc_mailbox() {
        let mut tb = ready(Box::new(FixedContents::default()));
        let mut bus = tb.transactor();
        assert_eq!(bus.read_register(0x81).unwrap(), 0x55);
        assert_eq!(bus.read_register(0x82).unwrap(), 0x01);
    }

    #[test]
    fn undecoded_read_times_out() {
        let mut tb = ready(Box::new(Silent));
        let err = tb.transactor().read_register(0x90).unwrap_err();
        assert!(
            matches!(err, TbError::BusTimeout { address: 0x90, cycles: 64 }),
            "{err}"
        );
        assert!(tb.pins().strobes_idle(), "strobe released after timeout");
    }

    #[test]
    fn access_before_reset_release_is_refused() {
        let mut tb = Testbench::new(TbConfig::default(), Box::new(Silent)).unwrap();
        let start = tb.cycle();
        let err = tb.transactor().write_register(0x81, 0x42).unwrap_err();
        assert!(
            matches!(
                err,
                TbError::NotReady {
                    address: 0x81,
                    direction: Direction::Write
                }
            ),
            "{err}"
        );
        let err = tb.transactor().read_register(0x82).unwrap_err();
        assert!(matches!(err, TbError::NotReady { direction: Direction::Read, .. }));
        assert_eq!(tb.cycle(), start, "refused accesses never touch the bus");
        assert!(tb.pins().strobes_idle());
    }

    #[test]
    fn access_during_peripheral_reset_pulse_is_refused() {
        let mut tb = Testbench::new(TbConfig::default(), Box::new(Silent)).unwrap();
        tb.power_up().unwrap();
        let budget = Ticks::new(10_000);
        assert!(tb.wait_until(budget, |tb| tb.mailbox().in_reset()).is_some());
        let err = tb.transactor().write_register(0x81, 0x42).unwrap_err();
        assert!(matches!(err, TbError::NotReady { .. }), "{err}");
    }

    #[test]
    fn write_with_read_strobe_held_is_refused() {
        let mut tb = ready(Box::new(Silent));
        tb.pins_mut().rd_b = false;
        let err = tb.transactor().write_register(0x81, 1).unwrap_err();
        assert!(matches!(
            err,
            TbError::StrobeConflict {
                address: 0x81,
                direction: Direction::Write
            }
        ));
        assert_eq!(tb.mailbox().host().data, 0);
    }
}
