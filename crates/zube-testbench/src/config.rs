//! Testbench configuration.
//!
//! All timing is in fast-clock cycles unless a field says otherwise. Every
//! section has defaults matching the reference bench, so a JSON file only
//! needs the fields it overrides.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use zube_mailbox::SYNC_STAGES;

use crate::error::{TbError, TbResult};

/// Reference and derived clocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fast clock period in picoseconds.
    pub period_ps: u64,
    /// Fast cycles per slow (peer) cycle.
    pub slow_divider: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period_ps: 25_000,
            slow_divider: 8,
        }
    }
}

/// Strobe timing for single bus transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusTiming {
    /// Cycles between driving address/data and asserting the strobe.
    pub setup: u64,
    /// Cycles the write strobe stays asserted.
    pub write_hold: u64,
    /// Minimum cycles the read strobe stays asserted before sampling.
    pub read_hold: u64,
    /// Cycles to wait for a driver after asserting the read strobe.
    pub response_timeout: u64,
    /// Idle cycles after releasing a strobe.
    pub turnaround: u64,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            setup: 1,
            write_hold: 8,
            read_hold: 8,
            response_timeout: 64,
            turnaround: 4,
        }
    }
}

/// Handshake poller cadence and budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Cycles between status polls: 16 slow periods plus one.
    pub interval: u64,
    /// Maximum polls per round trip.
    pub budget: u32,
    /// The two alternating status sentinels.
    pub sentinels: [u8; 2],
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: 16 * 8 + 1,
            budget: 20,
            sentinels: [0xFA, 0xFB],
        }
    }
}

/// Power sequencing and reset deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Cycles between raising successive power rails.
    pub rail_step: u64,
    /// Cycles from the last rail to releasing RSTB.
    pub release_delay: u64,
    /// Deadline for each peripheral reset edge, in microseconds.
    pub timeout_us: u64,
    /// Cycles to wait after the peripheral leaves reset.
    pub settle: u64,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            rail_step: 8,
            release_delay: 80,
            timeout_us: 1000,
            settle: 1000,
        }
    }
}

/// Firmware model timing, in slow-clock cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Slow cycles from RSTB release to the peripheral reset pulse.
    pub boot_delay: u64,
    /// Slow cycles between seeing a request and posting the response.
    pub latency: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            boot_delay: 64,
            latency: 1,
        }
    }
}

/// Complete testbench configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbConfig {
    pub clock: ClockConfig,
    pub bus: BusTiming,
    pub poll: PollConfig,
    pub reset: ResetConfig,
    pub responder: ResponderConfig,
}

impl TbConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(text: &str) -> TbResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file(path: &Path) -> TbResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject settings the protocol cannot work with.
    ///
    /// A poll interval that is an exact multiple of the slow period is
    /// legal but samples on the same domain-crossing phase every time, so
    /// it only earns a warning.
    pub fn validate(&self) -> TbResult<()> {
        if self.clock.period_ps == 0 {
            return Err(TbError::Config("clock.period_ps must be non-zero".into()));
        }
        if self.clock.slow_divider == 0 {
            return Err(TbError::Config("clock.slow_divider must be non-zero".into()));
        }
        if self.bus.write_hold < SYNC_STAGES {
            return Err(TbError::Config(format!(
                "bus.write_hold of {} cycles is shorter than the {SYNC_STAGES}-stage strobe synchronizer",
                self.bus.write_hold
            )));
        }
        if self.bus.response_timeout < SYNC_STAGES {
            return Err(TbError::Config(format!(
                "bus.response_timeout of {} cycles can never see a synchronized response",
                self.bus.response_timeout
            )));
        }
        if self.poll.budget == 0 {
            return Err(TbError::Config("poll.budget must be at least 1".into()));
        }
        if self.poll.sentinels[0] == self.poll.sentinels[1] {
            return Err(TbError::Config(format!(
                "poll.sentinels must differ (both {:#04X})",
                self.poll.sentinels[0]
            )));
        }
        if self.bus.turnaround < SYNC_STAGES {
            warn!(
                "bus.turnaround of {} cycles is shorter than the peripheral's release delay; back-to-back accesses may fight",
                self.bus.turnaround
            );
        }
        if self.poll.interval % self.clock.slow_divider == 0 {
            warn!(
                "poll.interval {} is a multiple of the slow period {}; every poll samples the same phase",
                self.poll.interval, self.clock.slow_divider
            );
        }
        Ok(())
    }
}
