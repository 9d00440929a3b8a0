//! Cycle-level testbench for the Zube Z80 mailbox handshake.
//!
//! A RISC-V SoC and a host on an external Z80-style bus swap one byte at a
//! time through the mailbox peripheral, with no interrupt line between
//! them. The host side runs on the fast reference clock; the SoC firmware
//! runs on a slow clock derived at 8:1. Two layers sit on the host side:
//!
//! - [`Transactor`]: strobe-timed single register reads and writes.
//! - [`HandshakePoller`]: write payload, flip the status sentinel, poll the
//!   peer's status until it changes, read the response.
//!
//! [`Scenario`] bundles the reference checks; the `zube-testbench` binary
//! runs them from the command line.

mod config;
mod error;
mod harness;
mod monitor;
mod poller;
pub mod responder;
mod scenario;
mod transactor;

pub use config::{BusTiming, ClockConfig, PollConfig, ResetConfig, ResponderConfig, TbConfig};
pub use error::{TbError, TbResult};
pub use harness::{POWER_RAILS, Testbench};
pub use monitor::{BusCycle, BusMonitor, Direction};
pub use poller::{Exchange, HandshakePoller, PollState};
pub use responder::{Complement, FixedContents, Firmware, Responder, Silent};
pub use scenario::{Report, Scenario};
pub use transactor::Transactor;

/// Z80 address the firmware programs as the mailbox base.
pub const Z80_BASE: u8 = 0x81;
/// Payload register on the Z80 bus.
pub const PAYLOAD_REGISTER: u8 = Z80_BASE;
/// Status register on the Z80 bus.
pub const STATUS_REGISTER: u8 = Z80_BASE + 1;
