//! Simulation harness: clocks, power, reset, and the wiring between the
//! host bus, the mailbox peripheral, and the firmware model.
//!
//! Each fast edge advances, in order: external stimulus, the peripheral,
//! the slow domain (firmware, only on divider edges), the monitor.

use log::{debug, info};
use sim_core::{ClockDivider, MasterClock, Tickable, Ticks};
use zube_mailbox::{BusPins, Z80Mailbox};

use crate::config::TbConfig;
use crate::error::{TbError, TbResult};
use crate::monitor::BusMonitor;
use crate::responder::{Firmware, Responder};
use crate::transactor::Transactor;

/// Number of independent supply rails.
pub const POWER_RAILS: usize = 4;

pub struct Testbench {
    config: TbConfig,
    clock: MasterClock,
    slow: ClockDivider,
    cycle: Ticks,
    pins: BusPins,
    mailbox: Z80Mailbox,
    firmware: Firmware,
    monitor: BusMonitor,
    rails: [bool; POWER_RAILS],
    /// System reset, active-low.
    rstb: bool,
    /// Scheduled changes to the third-party data driver, sorted by cycle.
    stimulus: Vec<(Ticks, Option<u8>)>,
}

impl Testbench {
    /// Build a powered-down testbench with `responder` as the firmware.
    pub fn new(config: TbConfig, responder: Box<dyn Responder>) -> TbResult<Self> {
        config.validate()?;
        let mut mailbox = Z80Mailbox::new();
        mailbox.set_reset_b(false);
        Ok(Self {
            clock: MasterClock::new(config.clock.period_ps),
            slow: ClockDivider::new(config.clock.slow_divider),
            cycle: Ticks::ZERO,
            pins: BusPins::new(),
            mailbox,
            firmware: Firmware::new(config.responder.boot_delay, responder),
            monitor: BusMonitor::new(),
            rails: [false; POWER_RAILS],
            rstb: false,
            stimulus: Vec::new(),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TbConfig {
        &self.config
    }

    /// Fast edges since construction.
    #[must_use]
    pub fn cycle(&self) -> Ticks {
        self.cycle
    }

    /// Simulated time in nanoseconds.
    #[must_use]
    pub fn elapsed_ns(&self) -> u64 {
        self.clock.elapsed_ns(self.cycle)
    }

    /// Slow-domain edges so far. The slow clock only runs while RSTB is high.
    #[must_use]
    pub fn slow_edges(&self) -> u64 {
        self.slow.edges()
    }

    #[must_use]
    pub fn pins(&self) -> &BusPins {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut BusPins {
        &mut self.pins
    }

    #[must_use]
    pub fn mailbox(&self) -> &Z80Mailbox {
        &self.mailbox
    }

    #[must_use]
    pub fn firmware(&self) -> &Firmware {
        &self.firmware
    }

    #[must_use]
    pub fn monitor(&self) -> &BusMonitor {
        &self.monitor
    }

    /// Host-side transaction view of this testbench.
    pub fn transactor(&mut self) -> Transactor<'_> {
        Transactor::new(self)
    }

    #[must_use]
    pub fn rails(&self) -> [bool; POWER_RAILS] {
        self.rails
    }

    /// Switch supply rail `rail` (0-based).
    pub fn set_rail(&mut self, rail: usize, on: bool) -> TbResult<()> {
        let slot = self.rails.get_mut(rail).ok_or(TbError::NoSuchRail {
            rail,
            count: POWER_RAILS,
        })?;
        *slot = on;
        Ok(())
    }

    #[must_use]
    pub fn rstb(&self) -> bool {
        self.rstb
    }

    /// Drive the active-low system reset.
    ///
    /// Releasing it requires every rail to be up. Asserting it holds the
    /// peripheral in reset and restarts the firmware boot.
    pub fn set_rstb(&mut self, level: bool) -> TbResult<()> {
        if level {
            if let Some(rail) = self.rails.iter().position(|on| !on) {
                return Err(TbError::PowerNotStable { rail: rail + 1 });
            }
            if !self.rstb {
                debug!("harness: RSTB released at cycle {}", self.cycle.get());
                self.slow.reset();
                self.mailbox.set_reset_b(true);
            }
        } else if self.rstb {
            self.mailbox.set_reset_b(false);
            self.firmware.reset();
        }
        self.rstb = level;
        Ok(())
    }

    /// Change the third-party data driver at cycle `at`.
    pub fn schedule_external(&mut self, at: Ticks, value: Option<u8>) {
        self.stimulus.push((at, value));
        self.stimulus.sort_by_key(|&(t, _)| t);
    }

    /// Tick until `cond` holds, checking before each edge. Returns the
    /// number of edges waited, or `None` once `budget` edges pass without
    /// the condition holding.
    pub fn wait_until(&mut self, budget: Ticks, mut cond: impl FnMut(&Self) -> bool) -> Option<Ticks> {
        let mut waited = Ticks::ZERO;
        loop {
            if cond(self) {
                return Some(waited);
            }
            if waited >= budget {
                return None;
            }
            self.tick();
            waited += Ticks::new(1);
        }
    }

    /// Power sequencing: rails up one at a time, then RSTB release. The
    /// host side of the bus is idle throughout and the monitor starts a
    /// fresh trace.
    pub fn power_up(&mut self) -> TbResult<()> {
        self.set_rstb(false)?;
        self.rails = [false; POWER_RAILS];
        self.pins.set_idle();
        self.monitor.clear();
        let step = Ticks::new(self.config.reset.rail_step);
        for rail in 0..POWER_RAILS {
            self.tick_n(step);
            self.set_rail(rail, true)?;
        }
        self.tick_n(Ticks::new(self.config.reset.release_delay));
        self.set_rstb(true)?;
        info!("harness: powered up at {} ns", self.elapsed_ns());
        Ok(())
    }

    /// Wait for the firmware's peripheral reset pulse: falling edge, then
    /// rising edge, each within the configured deadline.
    pub fn wait_for_reset(&mut self) -> TbResult<()> {
        let deadline = self.clock.cycles_in_us(self.config.reset.timeout_us);
        self.wait_until(deadline, |tb| tb.mailbox.in_reset())
            .ok_or(TbError::ResetTimeout {
                edge: "falling",
                cycles: deadline.get(),
            })?;
        self.wait_until(deadline, |tb| !tb.mailbox.in_reset())
            .ok_or(TbError::ResetTimeout {
                edge: "rising",
                cycles: deadline.get(),
            })?;
        debug!("harness: peripheral out of reset at cycle {}", self.cycle.get());
        Ok(())
    }

    /// Power up, wait for the peripheral reset pulse, then settle.
    pub fn bring_up(&mut self) -> TbResult<()> {
        self.power_up()?;
        self.wait_for_reset()?;
        self.tick_n(Ticks::new(self.config.reset.settle));
        Ok(())
    }

    fn apply_stimulus(&mut self) {
        while let Some(&(at, value)) = self.stimulus.first() {
            if at > self.cycle {
                break;
            }
            self.pins.drive_external(value);
            self.stimulus.remove(0);
        }
    }
}

impl Tickable for Testbench {
    fn tick(&mut self) {
        self.cycle += Ticks::new(1);
        self.apply_stimulus();
        self.mailbox.tick(&mut self.pins);
        if self.rstb && self.slow.tick() {
            self.firmware.tick(&mut self.mailbox);
        }
        self.monitor.observe(self.cycle, &self.pins);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{FixedContents, Silent};

    fn bench() -> Testbench {
        Testbench::new(TbConfig::default(), Box::new(Silent)).unwrap()
    }

    #[test]
    fn power_up_sequence_timing() {
        let mut tb = bench();
        tb.power_up().unwrap();
        // Four rail steps of 8, then 80 to RSTB
        assert_eq!(tb.cycle(), Ticks::new(4 * 8 + 80));
        assert!(tb.rstb());
        assert_eq!(tb.rails(), [true; POWER_RAILS]);
        assert!(tb.pins().strobes_idle());
    }

    #[test]
    fn power_cycle_starts_a_fresh_trace() {
        let mut tb = bench();
        tb.power_up().unwrap();
        tb.pins_mut().wr_b = false;
        tb.tick_n(Ticks::new(3));
        tb.pins_mut().wr_b = true;
        tb.tick();
        assert_eq!(tb.monitor().cycles().len(), 1);
        tb.power_up().unwrap();
        assert!(tb.monitor().cycles().is_empty());
    }

    #[test]
    fn reset_release_needs_all_rails() {
        let mut tb = bench();
        tb.set_rail(0, true).unwrap();
        tb.set_rail(1, true).unwrap();
        let err = tb.set_rstb(true).unwrap_err();
        assert!(matches!(err, TbError::PowerNotStable { rail: 3 }), "{err}");
        assert!(!tb.rstb());
    }

    #[test]
    fn out_of_range_rail_is_an_error() {
        let mut tb = bench();
        let err = tb.set_rail(POWER_RAILS, true).unwrap_err();
        assert!(matches!(err, TbError::NoSuchRail { rail: 4, count: 4 }), "{err}");
        assert_eq!(tb.rails(), [false; POWER_RAILS]);
        tb.set_rail(POWER_RAILS - 1, true).unwrap();
        assert!(tb.rails()[POWER_RAILS - 1]);
    }

    #[test]
    fn firmware_is_frozen_while_in_reset() {
        let mut tb = bench();
        tb.tick_n(Ticks::new(10_000));
        assert!(tb.mailbox().in_reset());
        assert_eq!(tb.slow_edges(), 0);
        assert!(!tb.firmware().is_running());
    }

    #[test]
    fn slow_domain_runs_at_divided_rate() {
        let mut tb = bench();
        tb.power_up().unwrap();
        let before = tb.slow_edges();
        tb.tick_n(Ticks::new(80));
        assert_eq!(tb.slow_edges() - before, 10);
    }

    #[test]
    fn bring_up_configures_peripheral() {
        let mut tb = Testbench::new(TbConfig::default(), Box::new(FixedContents::default())).unwrap();
        tb.bring_up().unwrap();
        assert!(tb.firmware().is_running());
        assert_eq!(tb.mailbox().base(), 0x81);
        assert_eq!(tb.mailbox().soc().data, 0x55);
    }

    #[test]
    fn wait_until_respects_budget() {
        let mut tb = bench();
        let start = tb.cycle();
        assert_eq!(tb.wait_until(Ticks::new(5), |_| false), None);
        assert_eq!(tb.cycle() - start, Ticks::new(5));
        assert_eq!(tb.wait_until(Ticks::new(5), |_| true), Some(Ticks::ZERO));
    }

    #[test]
    fn scheduled_stimulus_drives_bus() {
        let mut tb = bench();
        tb.schedule_external(Ticks::new(3), Some(0x42));
        tb.schedule_external(Ticks::new(5), None);
        tb.tick_n(Ticks::new(2));
        assert!(!tb.pins().data().is_driven());
        tb.tick();
        assert_eq!(tb.pins().data().value(), Some(0x42));
        tb.tick_n(Ticks::new(2));
        assert!(!tb.pins().data().is_driven());
    }
}
