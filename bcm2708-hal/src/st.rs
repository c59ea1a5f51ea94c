//! System timer driver module.
//!
//! The system timer is a free-running 64-bit counter ticking at a fixed
//! 1 MHz, split across two 32-bit registers. It is the monotonic time
//! source for capture timestamps and for blocking delays.
use bcm2708::st::MmioSystemTimer;

use crate::time::Hertz;

/// Fixed tick frequency of the system timer.
pub const TICK_FREQUENCY: Hertz = Hertz::from_raw(1_000_000);

/// Nanoseconds per timer tick.
pub const NANOS_PER_TICK: u64 = 1_000_000_000 / TICK_FREQUENCY.raw() as u64;

/// High level system timer driver.
pub struct SystemTimer {
    regs: MmioSystemTimer<'static>,
}

unsafe impl Send for SystemTimer {}

impl SystemTimer {
    #[inline]
    pub const fn new(regs: MmioSystemTimer<'static>) -> Self {
        Self { regs }
    }

    /// Read the 64-bit counter.
    ///
    /// The two halves cannot be read atomically; the upper half is read
    /// again after the lower half and the read restarts if it changed in
    /// between.
    #[inline]
    pub fn read_timer(&self) -> u64 {
        let mut upper = self.regs.read_chi();
        loop {
            let lower = self.regs.read_clo();
            let upper_again = self.regs.read_chi();
            if upper_again == upper {
                return ((upper as u64) << 32) | (lower as u64);
            }
            // Lower half rolled over, take the fresh upper half.
            upper = upper_again;
        }
    }
}

/// The system timer can be used for blocking delays.
impl embedded_hal::delay::DelayNs for SystemTimer {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = (ns as u64).div_ceil(NANOS_PER_TICK);
        let end_of_delay = self.read_timer() + ticks;
        while self.read_timer() < end_of_delay {}
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::boxed::Box;

    const ST_WORDS: usize = 0x1C / 4;
    const CLO: usize = 1;
    const CHI: usize = 2;

    fn sim_timer() -> (SystemTimer, &'static mut [u32; ST_WORDS]) {
        let block = Box::leak(Box::new([0u32; ST_WORDS]));
        let regs = unsafe { bcm2708::st::SystemTimer::new_mmio_at(block.as_mut_ptr() as usize) };
        (SystemTimer::new(regs), block)
    }

    #[test]
    fn read_timer_combines_both_halves() {
        let (timer, block) = sim_timer();
        assert_eq!(timer.read_timer(), 0);
        block[CLO] = 0xDEAD_BEEF;
        block[CHI] = 0x1234;
        assert_eq!(timer.read_timer(), 0x0000_1234_DEAD_BEEF);
    }

    #[test]
    fn one_tick_is_one_microsecond() {
        assert_eq!(NANOS_PER_TICK, 1_000);
    }
}
