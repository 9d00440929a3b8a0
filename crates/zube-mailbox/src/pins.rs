//! Z80 bus wires shared by the host transactor and the peripheral.

use sim_core::Logic;

/// The external Z80-style bus.
///
/// Strobes are active-low: `wr_b == false` means a write is in progress.
/// The data bus has one driver slot per party: the host, the mailbox, and
/// any other device sharing the bus. The level everyone sees is the
/// resolution of all three.
#[derive(Debug, Clone)]
pub struct BusPins {
    /// Address bus, driven by the host.
    pub address: u8,
    /// Write strobe (active-low), driven by the host.
    pub wr_b: bool,
    /// Read strobe (active-low), driven by the host.
    pub rd_b: bool,
    host_data: Option<u8>,
    device_data: Option<u8>,
    external_data: Option<u8>,
}

impl BusPins {
    /// Idle bus: address 0, both strobes high, data undriven.
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: 0,
            wr_b: true,
            rd_b: true,
            host_data: None,
            device_data: None,
            external_data: None,
        }
    }

    /// Resolved data bus level.
    #[must_use]
    pub fn data(&self) -> Logic {
        Logic::resolve(&[self.host_data, self.device_data, self.external_data])
    }

    /// Set or release the host's data driver.
    pub fn drive_host(&mut self, value: Option<u8>) {
        self.host_data = value;
    }

    /// Set or release the peripheral's data driver.
    pub fn drive_device(&mut self, value: Option<u8>) {
        self.device_data = value;
    }

    /// Set or release a third device's driver (another peripheral on the
    /// shared Z80 bus).
    pub fn drive_external(&mut self, value: Option<u8>) {
        self.external_data = value;
    }

    #[must_use]
    pub fn write_asserted(&self) -> bool {
        !self.wr_b
    }

    #[must_use]
    pub fn read_asserted(&self) -> bool {
        !self.rd_b
    }

    /// Both strobes de-asserted.
    #[must_use]
    pub fn strobes_idle(&self) -> bool {
        self.wr_b && self.rd_b
    }

    /// Return the host side of the bus to idle. The peripheral's driver is
    /// left alone; it releases on its own clock.
    pub fn set_idle(&mut self) {
        self.address = 0;
        self.wr_b = true;
        self.rd_b = true;
        self.host_data = None;
    }
}

impl Default for BusPins {
    fn default() -> Self {
        Self::new()
    }
}
