//! Schedule tick shared between the timer interrupt and the control loop
//!
//! The periodic wake interrupt is the only writer besides the single reset in
//! the refresh cycle. Every access runs inside a critical section, so the
//! control loop never observes a half-written counter on targets without
//! native 16-bit atomics.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Monotonic tick counter with a wake signal.
///
/// ```rust,ignore
/// static TICK: ScheduleTick = ScheduleTick::new(config::DEFAULT.initial_tick());
///
/// #[interrupt]
/// fn TIMER2_COMPA() {
///     TICK.increment();
/// }
/// ```
pub struct ScheduleTick {
    count: Mutex<Cell<u16>>,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl ScheduleTick {
    pub const fn new(initial: u16) -> Self {
        Self {
            count: Mutex::new(Cell::new(initial)),
            wake: Signal::new(),
        }
    }

    /// Advance the counter by one and wake the control loop.
    ///
    /// Called from the timer interrupt.
    pub fn increment(&self) {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().wrapping_add(1));
        });
        self.wake.signal(());
    }

    /// Indivisible read of the current tick
    pub fn snapshot(&self) -> u16 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }

    /// Indivisible reset to zero, racing the interrupt's increments
    pub fn reset(&self) {
        critical_section::with(|cs| self.count.borrow(cs).set(0));
    }

    /// Suspend until the next tick has been counted.
    pub async fn wait(&self) {
        self.wake.wait().await;
    }

    /// Consume a pending wake without blocking, for polling loops.
    pub fn take_wake(&self) -> bool {
        self.wake.try_take().is_some()
    }
}

/// The hardware that drives [`ScheduleTick::increment`].
pub trait TickSource {
    /// Stop the periodic interrupt and any other wake source for good.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn test_increment_and_reset() {
        let tick = ScheduleTick::new(190);
        tick.increment();
        tick.increment();
        assert_eq!(tick.snapshot(), 192);

        tick.reset();
        assert_eq!(tick.snapshot(), 0);
    }

    #[test]
    fn test_increment_signals_wake() {
        let tick = ScheduleTick::new(0);
        assert!(!tick.take_wake());

        tick.increment();
        tick.increment();
        // several ticks collapse into one pending wake
        assert!(tick.take_wake());
        assert!(!tick.take_wake());
    }

    #[test]
    fn test_wait_returns_after_increment() {
        let tick = ScheduleTick::new(0);
        tick.increment();
        embassy_futures::block_on(tick.wait());
        assert_eq!(tick.snapshot(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let tick = Arc::new(ScheduleTick::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tick = tick.clone();
                thread::spawn(move || {
                    for _ in 0..5_000 {
                        tick.increment();
                    }
                })
            })
            .collect();

        // snapshots taken while the counters race must always be plausible
        for _ in 0..1_000 {
            assert!(tick.snapshot() <= 20_000);
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tick.snapshot(), 20_000);
    }

    #[test]
    fn test_reset_racing_increments() {
        let tick = Arc::new(ScheduleTick::new(0));

        let interrupt = {
            let tick = tick.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    tick.increment();
                }
            })
        };

        for _ in 0..1_000 {
            tick.reset();
            assert!(tick.snapshot() <= 10_000);
        }

        interrupt.join().unwrap();
        assert!(tick.snapshot() <= 10_000);
    }
}
