//! The mailbox peripheral itself.
//!
//! Runs on the fast clock. Strobes from the Z80 side pass through a
//! two-flop synchronizer, so the peripheral acts on a strobe two edges
//! after the host asserts it and keeps driving the data bus for two edges
//! after a read strobe is released.

use log::{debug, trace, warn};
use sim_core::{Logic, Observable, Value};

use crate::pins::BusPins;
use crate::soc::{DecodeError, SocPort, SocRegister};

/// Base address after reset. Firmware reprograms it on start-up.
const RESET_BASE: u8 = 0x00;

/// One direction of the mailbox: a payload byte and its status byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub data: u8,
    pub status: u8,
}

/// A Z80-side register, relative to the programmable base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Z80Register {
    Data,
    Status,
}

/// Z80 bus mailbox peripheral.
pub struct Z80Mailbox {
    /// Z80 address of the data register; status sits at `base + 1`.
    base: u8,
    /// Host→SoC mailbox, written from the Z80 bus.
    host: Mailbox,
    /// SoC→host mailbox, written by firmware.
    soc: Mailbox,
    /// Read strobe synchronizer (asserted = true). Index 1 is the output.
    rd_sync: [bool; 2],
    /// Write strobe synchronizer.
    wr_sync: [bool; 2],
    /// Synchronized write strobe on the previous edge (for edge detection).
    wr_prev: bool,
    /// Held in reset (active-low line is low).
    in_reset: bool,
    /// Value currently driven onto the data bus.
    driving: Option<u8>,
    /// Completed Z80 reads and writes that hit a register.
    reads: u64,
    writes: u64,
}

impl Z80Mailbox {
    /// Create the peripheral in its post-reset state (out of reset).
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: RESET_BASE,
            host: Mailbox::default(),
            soc: Mailbox::default(),
            rd_sync: [false; 2],
            wr_sync: [false; 2],
            wr_prev: false,
            in_reset: false,
            driving: None,
            reads: 0,
            writes: 0,
        }
    }

    /// Drive the active-low reset line. Asserting clears every register.
    pub fn set_reset_b(&mut self, level: bool) {
        let assert = !level;
        if assert && !self.in_reset {
            debug!("mailbox: reset asserted");
            self.clear();
        } else if !assert && self.in_reset {
            debug!("mailbox: reset released");
        }
        self.in_reset = assert;
    }

    #[must_use]
    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    #[must_use]
    pub fn base(&self) -> u8 {
        self.base
    }

    /// Host→SoC mailbox.
    #[must_use]
    pub fn host(&self) -> Mailbox {
        self.host
    }

    /// SoC→host mailbox.
    #[must_use]
    pub fn soc(&self) -> Mailbox {
        self.soc
    }

    /// Decode a Z80 address against the current base.
    #[must_use]
    pub fn decode(&self, address: u8) -> Option<Z80Register> {
        if address == self.base {
            Some(Z80Register::Data)
        } else if address == self.base.wrapping_add(1) {
            Some(Z80Register::Status)
        } else {
            None
        }
    }

    /// Advance one fast-clock edge against the bus wires.
    pub fn tick(&mut self, pins: &mut BusPins) {
        if self.in_reset {
            self.driving = None;
            pins.drive_device(None);
            return;
        }

        self.rd_sync = [pins.read_asserted(), self.rd_sync[0]];
        self.wr_sync = [pins.write_asserted(), self.wr_sync[0]];
        let rd = self.rd_sync[1];
        let wr = self.wr_sync[1];

        // Writes latch on the synchronized leading edge of WR
        if wr && !self.wr_prev {
            self.latch_write(pins.address, pins.data());
        }
        self.wr_prev = wr;

        let drive = if rd {
            self.decode(pins.address).map(|reg| self.z80_read(reg))
        } else {
            None
        };
        if drive.is_some() && self.driving.is_none() {
            self.reads += 1;
            trace!("mailbox: driving {:#04X} for read of {:#04X}", drive.unwrap_or(0), pins.address);
        }
        self.driving = drive;
        pins.drive_device(drive);
    }

    fn latch_write(&mut self, address: u8, level: Logic) {
        let Some(reg) = self.decode(address) else {
            trace!("mailbox: ignoring write to undecoded {address:#04X}");
            return;
        };
        let Some(value) = level.value() else {
            warn!("mailbox: write to {address:#04X} with undefined data ({level})");
            return;
        };
        match reg {
            Z80Register::Data => self.host.data = value,
            Z80Register::Status => self.host.status = value,
        }
        self.writes += 1;
        debug!("mailbox: host wrote {value:#04X} to {reg:?}");
    }

    fn z80_read(&self, reg: Z80Register) -> u8 {
        match reg {
            Z80Register::Data => self.soc.data,
            Z80Register::Status => self.soc.status,
        }
    }

    /// Decode a SoC access. Unmapped addresses are not acknowledged.
    fn wishbone_register(addr: u32) -> Result<SocRegister, DecodeError> {
        SocRegister::from_wishbone(addr).inspect_err(|e| warn!("mailbox: {e}"))
    }

    fn clear(&mut self) {
        self.base = RESET_BASE;
        self.host = Mailbox::default();
        self.soc = Mailbox::default();
        self.rd_sync = [false; 2];
        self.wr_sync = [false; 2];
        self.wr_prev = false;
    }
}

impl Default for Z80Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl SocPort for Z80Mailbox {
    fn wb_read(&mut self, addr: u32) -> Result<u32, DecodeError> {
        let value = match Self::wishbone_register(addr)? {
            SocRegister::BaseAddress => self.base,
            SocRegister::Data => self.host.data,
            SocRegister::Status => self.host.status,
        };
        Ok(u32::from(value))
    }

    fn wb_write(&mut self, addr: u32, value: u32) -> Result<(), DecodeError> {
        let reg = Self::wishbone_register(addr)?;
        let byte = value as u8;
        match reg {
            SocRegister::BaseAddress => self.base = byte,
            SocRegister::Data => self.soc.data = byte,
            SocRegister::Status => self.soc.status = byte,
        }
        debug!("mailbox: SoC wrote {byte:#04X} to {reg:?}");
        Ok(())
    }

    fn set_reset_b(&mut self, level: bool) {
        Z80Mailbox::set_reset_b(self, level);
    }
}

impl Observable for Z80Mailbox {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "base" => Some(self.base.into()),
            "reset" => Some(self.in_reset.into()),
            "host.data" => Some(self.host.data.into()),
            "host.status" => Some(self.host.status.into()),
            "soc.data" => Some(self.soc.data.into()),
            "soc.status" => Some(self.soc.status.into()),
            "driving" => Some(match self.driving {
                Some(v) => v.into(),
                None => "z".into(),
            }),
            "reads" => Some(self.reads.into()),
            "writes" => Some(self.writes.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "base",
            "reset",
            "host.data",
            "host.status",
            "soc.data",
            "soc.status",
            "driving",
            "reads",
            "writes",
        ]
    }
}
