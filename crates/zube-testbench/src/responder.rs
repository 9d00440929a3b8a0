//! SoC firmware models.
//!
//! The firmware runs in the slow clock domain and touches the peripheral
//! only through its Wishbone port and reset line. [`Firmware`] handles the
//! common boot sequence; a [`Responder`] supplies the per-scenario
//! behaviour once the peripheral is configured.

use log::{debug, error, info};
use zube_mailbox::{DecodeError, SocPort, WB_BASE_ADDRESS, WB_DATA, WB_STATUS};

use crate::Z80_BASE;

/// Scenario-specific firmware behaviour.
pub trait Responder {
    fn name(&self) -> &'static str;

    /// Runs once, on the first slow edge after the boot-time reset pulse.
    fn init(&mut self, port: &mut dyn SocPort) -> Result<(), DecodeError>;

    /// Runs on every later slow edge.
    fn tick(&mut self, port: &mut dyn SocPort) -> Result<(), DecodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Boot { remaining: u64 },
    ResetLow,
    Init,
    Running,
    Faulted,
}

/// Boot sequencing around a [`Responder`].
///
/// After system reset: wait `boot_delay` slow edges, pulse the peripheral's
/// reset low for one edge, release it, run `init`, then `tick` forever.
pub struct Firmware {
    phase: Phase,
    boot_delay: u64,
    behavior: Box<dyn Responder>,
}

impl Firmware {
    #[must_use]
    pub fn new(boot_delay: u64, behavior: Box<dyn Responder>) -> Self {
        Self {
            phase: Phase::Boot {
                remaining: boot_delay,
            },
            boot_delay,
            behavior,
        }
    }

    /// System reset: restart from the boot delay.
    pub fn reset(&mut self) {
        self.phase = Phase::Boot {
            remaining: self.boot_delay,
        };
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.behavior.name()
    }

    /// Configuration done and responding.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Stopped after a Wishbone fault.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.phase == Phase::Faulted
    }

    /// Advance one slow-clock edge.
    pub fn tick(&mut self, port: &mut dyn SocPort) {
        self.phase = match self.phase {
            Phase::Boot { remaining: 0 } => {
                debug!("firmware: pulsing peripheral reset");
                port.set_reset_b(false);
                Phase::ResetLow
            }
            Phase::Boot { remaining } => Phase::Boot {
                remaining: remaining - 1,
            },
            Phase::ResetLow => {
                port.set_reset_b(true);
                Phase::Init
            }
            Phase::Init => match self.behavior.init(port) {
                Ok(()) => {
                    info!("firmware: {} responder configured", self.behavior.name());
                    Phase::Running
                }
                Err(e) => {
                    error!("firmware: init fault: {e}");
                    Phase::Faulted
                }
            },
            Phase::Running => match self.behavior.tick(port) {
                Ok(()) => Phase::Running,
                Err(e) => {
                    error!("firmware: fault: {e}");
                    Phase::Faulted
                }
            },
            Phase::Faulted => Phase::Faulted,
        };
    }
}

/// Request seen, response not yet posted.
#[derive(Debug, Clone, Copy)]
struct Pending {
    remaining: u64,
    data: u8,
    status: u8,
}

/// Answers each request with the bitwise complement of its payload and
/// acknowledges by echoing the requester's status sentinel.
#[derive(Debug, Clone)]
pub struct Complement {
    latency: u64,
    last_status: u8,
    pending: Option<Pending>,
    answered: u64,
}

impl Complement {
    /// `latency` is in slow edges between seeing a request and answering.
    #[must_use]
    pub fn new(latency: u64) -> Self {
        Self {
            latency,
            last_status: 0,
            pending: None,
            answered: 0,
        }
    }

    /// Requests answered so far.
    #[must_use]
    pub fn answered(&self) -> u64 {
        self.answered
    }
}

impl Responder for Complement {
    fn name(&self) -> &'static str {
        "complement"
    }

    fn init(&mut self, port: &mut dyn SocPort) -> Result<(), DecodeError> {
        port.wb_write(WB_BASE_ADDRESS, u32::from(Z80_BASE))?;
        self.last_status = port.wb_read(WB_STATUS)? as u8;
        self.pending = None;
        Ok(())
    }

    fn tick(&mut self, port: &mut dyn SocPort) -> Result<(), DecodeError> {
        if self.pending.is_none() {
            let status = port.wb_read(WB_STATUS)? as u8;
            if status == self.last_status {
                return Ok(());
            }
            self.last_status = status;
            // Payload was written before the status that announced it
            let data = port.wb_read(WB_DATA)? as u8;
            debug!("firmware: request {data:#04X} (status {status:#04X})");
            self.pending = Some(Pending {
                remaining: self.latency,
                data,
                status,
            });
        }

        if let Some(p) = self.pending.as_mut() {
            if p.remaining > 0 {
                p.remaining -= 1;
                return Ok(());
            }
            let Pending { data, status, .. } = *p;
            self.pending = None;
            port.wb_write(WB_DATA, u32::from(!data))?;
            port.wb_write(WB_STATUS, u32::from(status))?;
            self.answered += 1;
        }
        Ok(())
    }
}

/// Writes known contents at start-up and never answers requests.
#[derive(Debug, Clone)]
pub struct FixedContents {
    pub data: u8,
    pub status: u8,
}

impl Default for FixedContents {
    fn default() -> Self {
        Self {
            data: 0x55,
            status: 0x01,
        }
    }
}

impl Responder for FixedContents {
    fn name(&self) -> &'static str {
        "fixed-contents"
    }

    fn init(&mut self, port: &mut dyn SocPort) -> Result<(), DecodeError> {
        port.wb_write(WB_BASE_ADDRESS, u32::from(Z80_BASE))?;
        port.wb_write(WB_DATA, u32::from(self.data))?;
        port.wb_write(WB_STATUS, u32::from(self.status))
    }

    fn tick(&mut self, _port: &mut dyn SocPort) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Configures the base address and then ignores the host entirely.
#[derive(Debug, Clone, Default)]
pub struct Silent;

impl Responder for Silent {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn init(&mut self, port: &mut dyn SocPort) -> Result<(), DecodeError> {
        port.wb_write(WB_BASE_ADDRESS, u32::from(Z80_BASE))
    }

    fn tick(&mut self, _port: &mut dyn SocPort) -> Result<(), DecodeError> {
        Ok(())
    }
}
