//! SoC-side Wishbone register port.

use std::fmt;

/// Wishbone base address of the peripheral.
pub const WB_BASE: u32 = 0x3000_0000;
/// Z80 base address register.
pub const WB_BASE_ADDRESS: u32 = WB_BASE;
/// Data register.
pub const WB_DATA: u32 = WB_BASE + 0x4;
/// Status register.
pub const WB_STATUS: u32 = WB_BASE + 0x8;

/// A decoded SoC-side register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocRegister {
    BaseAddress,
    Data,
    Status,
}

impl SocRegister {
    /// Decode a Wishbone byte address.
    pub fn from_wishbone(addr: u32) -> Result<Self, DecodeError> {
        match addr {
            WB_BASE_ADDRESS => Ok(Self::BaseAddress),
            WB_DATA => Ok(Self::Data),
            WB_STATUS => Ok(Self::Status),
            other => Err(DecodeError::Unmapped(other)),
        }
    }

    #[must_use]
    pub const fn wishbone_address(self) -> u32 {
        match self {
            Self::BaseAddress => WB_BASE_ADDRESS,
            Self::Data => WB_DATA,
            Self::Status => WB_STATUS,
        }
    }
}

/// Wishbone access that no register acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Unmapped(u32),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped(addr) => write!(
                f,
                "no register at Wishbone address {addr:#010X} (expected {WB_BASE_ADDRESS:#010X}, {WB_DATA:#010X} or {WB_STATUS:#010X})",
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// What the SoC firmware can reach: the Wishbone registers and the
/// logic-analyzer line wired to the peripheral's reset.
pub trait SocPort {
    /// 32-bit Wishbone read. Mailbox registers zero-extend.
    fn wb_read(&mut self, addr: u32) -> Result<u32, DecodeError>;

    /// 32-bit Wishbone write. Mailbox registers keep the low byte.
    fn wb_write(&mut self, addr: u32, value: u32) -> Result<(), DecodeError>;

    /// Drive the peripheral's active-low reset.
    fn set_reset_b(&mut self, level: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_three_registers() {
        for reg in [SocRegister::BaseAddress, SocRegister::Data, SocRegister::Status] {
            assert_eq!(SocRegister::from_wishbone(reg.wishbone_address()), Ok(reg));
        }
    }

    #[test]
    fn rejects_unaligned_and_foreign_addresses() {
        assert_eq!(
            SocRegister::from_wishbone(0x3000_0002),
            Err(DecodeError::Unmapped(0x3000_0002))
        );
        assert!(SocRegister::from_wishbone(0x2000_0000).is_err());
        let msg = DecodeError::Unmapped(0x3000_000C).to_string();
        assert!(msg.contains("0x3000000C"), "{msg}");
    }
}
