//! Trait for components that advance on clock edges.

use crate::Ticks;

/// A component that advances on rising edges of its own clock.
///
/// Fast-domain components are ticked every reference cycle; slow-domain
/// components are ticked only when their [`ClockDivider`](crate::ClockDivider)
/// fires. The component never sees the other domain's edges.
pub trait Tickable {
    /// Advance by one edge of this component's clock.
    fn tick(&mut self);

    /// Advance by multiple edges.
    ///
    /// Default implementation calls `tick()` in a loop. Implementations may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
