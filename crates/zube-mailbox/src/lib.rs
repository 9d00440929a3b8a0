//! Zube Z80 bus mailbox peripheral.
//!
//! The peripheral sits on an external Z80-style bus (8-bit address, 8-bit
//! tri-state data, active-low `WR`/`RD` strobes) and exposes two one-byte
//! mailboxes to it. The SoC side reaches the same mailboxes through a
//! Wishbone register port. There is no interrupt line: each side signals
//! fresh data by changing the status byte.
//!
//! # Z80 registers (relative to the programmable base)
//!
//! | Addr     | Read                  | Write                 |
//! |----------|-----------------------|-----------------------|
//! | base     | SoC→host data         | host→SoC data         |
//! | base + 1 | SoC→host status       | host→SoC status       |
//!
//! Any other address is not decoded and the data bus stays undriven.
//!
//! # SoC registers (Wishbone, base `0x3000_0000`)
//!
//! | Offset | Read                 | Write                  |
//! |--------|----------------------|------------------------|
//! | $0     | Z80 base address     | Z80 base address       |
//! | $4     | host→SoC data        | SoC→host data          |
//! | $8     | host→SoC status      | SoC→host status        |

mod mailbox;
mod pins;
mod soc;

pub use mailbox::{Mailbox, Z80Mailbox, Z80Register};
pub use pins::BusPins;
pub use soc::{DecodeError, SocPort, SocRegister, WB_BASE, WB_BASE_ADDRESS, WB_DATA, WB_STATUS};

/// Depth of the strobe synchronizer: edges between a host strobe change
/// and the peripheral acting on it.
pub const SYNC_STAGES: u64 = 2;
