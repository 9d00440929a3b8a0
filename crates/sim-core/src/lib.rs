//! Core traits and types for cycle-level bus simulation.
//!
//! Everything ticks at the fast reference clock. Slower domains are derived
//! from it by integer division and only ever advance on a fast edge.

mod clock;
mod logic;
mod observable;
mod tickable;
mod ticks;

pub use clock::{ClockDivider, MasterClock};
pub use logic::Logic;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
