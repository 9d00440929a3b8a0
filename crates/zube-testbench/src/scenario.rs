//! Reference scenarios.
//!
//! Each scenario pairs a firmware responder with a host-side sequence and
//! checks what the host observes. The first failure ends the scenario.

use std::fmt;
use std::str::FromStr;

use log::info;

use crate::config::TbConfig;
use crate::error::{TbError, TbResult};
use crate::harness::Testbench;
use crate::poller::{Exchange, HandshakePoller};
use crate::responder::{Complement, FixedContents, Responder, Silent};
use crate::{PAYLOAD_REGISTER, STATUS_REGISTER, Z80_BASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Power sequencing and an idle bus after RSTB release.
    Startup,
    /// Ping payloads 0..n and expect each one complemented.
    Ping,
    /// Expect fixed register contents after reset, with no request sent.
    ResetContents,
    /// Ping a peer that never answers; fails with a poll timeout.
    Silent,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Startup,
        Scenario::Ping,
        Scenario::ResetContents,
        Scenario::Silent,
    ];

    /// The firmware this scenario runs against.
    #[must_use]
    pub fn responder(self, config: &TbConfig) -> Box<dyn Responder> {
        match self {
            Scenario::Startup | Scenario::Ping => Box::new(Complement::new(config.responder.latency)),
            Scenario::ResetContents => Box::new(FixedContents::default()),
            Scenario::Silent => Box::new(Silent),
        }
    }

    /// A powered-down testbench wired to this scenario's responder.
    pub fn testbench(self, config: TbConfig) -> TbResult<Testbench> {
        let responder = self.responder(&config);
        Testbench::new(config, responder)
    }

    /// Run on `tb`. `count` is the number of ping round trips.
    pub fn run_on(self, tb: &mut Testbench, count: u8) -> TbResult<Report> {
        let exchanges = match self {
            Scenario::Startup => {
                startup(tb)?;
                Vec::new()
            }
            Scenario::Ping => ping(tb, count)?,
            Scenario::Silent => ping(tb, count.max(1))?,
            Scenario::ResetContents => {
                reset_contents(tb)?;
                Vec::new()
            }
        };
        info!("{self}: test complete at {} ns", tb.elapsed_ns());
        Ok(Report {
            scenario: self,
            exchanges,
            cycles: tb.cycle().get(),
            elapsed_ns: tb.elapsed_ns(),
        })
    }

    /// Build a testbench and run.
    pub fn run(self, config: TbConfig, count: u8) -> TbResult<Report> {
        let mut tb = self.testbench(config)?;
        self.run_on(&mut tb, count)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Startup => "startup",
            Scenario::Ping => "ping",
            Scenario::ResetContents => "reset-contents",
            Scenario::Silent => "silent",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.to_string() == s)
            .ok_or_else(|| {
                let names: Vec<String> = Scenario::ALL.iter().map(ToString::to_string).collect();
                format!("unknown scenario '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// What a passing scenario observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub scenario: Scenario,
    pub exchanges: Vec<Exchange>,
    pub cycles: u64,
    pub elapsed_ns: u64,
}

fn check(context: impl FnOnce() -> String, expected: u8, observed: u8) -> TbResult<()> {
    if expected == observed {
        Ok(())
    } else {
        Err(TbError::Mismatch {
            context: context(),
            expected,
            observed,
        })
    }
}

fn startup(tb: &mut Testbench) -> TbResult<()> {
    tb.power_up()?;
    let pins = tb.pins();
    let strobes = (u8::from(pins.rd_b) << 1) | u8::from(pins.wr_b);
    check(|| "strobe levels after reset release (RD_B, WR_B)".into(), 0b11, strobes)?;
    let data = pins.data();
    if data.is_driven() {
        return Err(TbError::BusNotIdle { observed: data });
    }
    Ok(())
}

/// Round trips with payloads `0..count`; each response must be the
/// payload's complement.
fn ping(tb: &mut Testbench, count: u8) -> TbResult<Vec<Exchange>> {
    tb.bring_up()?;
    let mut poller = HandshakePoller::new(tb.config().poll.clone(), Z80_BASE);
    let mut bus = tb.transactor();
    let mut exchanges = Vec::with_capacity(count as usize);
    for data_out in 0..count {
        let ex = poller.exchange(&mut bus, data_out)?;
        let round = poller.rounds();
        check(
            || format!("round trip {round} response to {data_out:#04X}"),
            !data_out,
            ex.response,
        )?;
        exchanges.push(ex);
    }
    Ok(exchanges)
}

/// Registers hold the firmware's start-up values without any request.
fn reset_contents(tb: &mut Testbench) -> TbResult<()> {
    tb.bring_up()?;
    let mut bus = tb.transactor();
    let data = bus.read_register(PAYLOAD_REGISTER)?;
    check(|| format!("payload register {PAYLOAD_REGISTER:#04X} after reset"), 0x55, data)?;
    let status = bus.read_register(STATUS_REGISTER)?;
    check(|| format!("status register {STATUS_REGISTER:#04X} after reset"), 0x01, status)?;
    Ok(())
}
