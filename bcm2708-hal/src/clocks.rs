//! General-purpose clock (GPCLK) module.
//!
//! The three general-purpose clock generators derive an output frequency
//! from one of the internal oscillators through an integer divisor. Every
//! register write must carry the [bcm2708::clock::PASSWD] password in the
//! upper byte, and the generator must report not-busy before its source or
//! divisor may be changed.
use arbitrary_int::{u4, u12};
use bcm2708::clock::{ClockControl, ClockDivisor, MmioClockManager, PASSWD};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::time::Hertz;

/// Crystal oscillator reference frequency.
pub const OSCILLATOR_FREQUENCY: Hertz = Hertz::from_raw(19_200_000);
/// PLLD reference frequency.
pub const PLLD_FREQUENCY: Hertz = Hertz::from_raw(500_000_000);

/// Busy-flag reads after which a single diagnostic warning is emitted.
///
/// The wait itself is unbounded: the hardware gives no upper bound for the
/// propagation delay, and aborting would leave the generator half
/// configured. A stuck BUSY flag is a liveness gap of the protocol; the
/// warning makes it observable.
const BUSY_WARN_SPINS: u32 = 1_000_000;

/// Clock source selectors of the general-purpose clock generators.
///
/// Selector values 8 and above, and the missing value 0, tie the generator
/// to ground.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ClockSource {
    Oscillator = 1,
    TestDebug0 = 2,
    TestDebug1 = 3,
    PllA = 4,
    PllC = 5,
    PllD = 6,
    PllHdmi = 7,
}

impl ClockSource {
    /// Reference frequency of the source.
    ///
    /// Returns [None] for sources whose frequency depends on the firmware
    /// clock configuration of the board.
    pub const fn frequency(&self) -> Option<Hertz> {
        match self {
            ClockSource::Oscillator => Some(OSCILLATOR_FREQUENCY),
            ClockSource::PllD => Some(PLLD_FREQUENCY),
            _ => None,
        }
    }
}

/// Output frequency of a generator fed by `source` through `divisor`.
///
/// Returns [None] for a zero divisor or a source without a fixed reference
/// frequency.
pub fn output_frequency(source: ClockSource, divisor: u12) -> Option<Hertz> {
    let reference = source.frequency()?;
    let divisor = divisor.value() as u32;
    if divisor == 0 {
        return None;
    }
    Some(Hertz::from_raw(reference.raw() / divisor))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockId {
    Gp0,
    Gp1,
    Gp2,
}

/// Driver for one general-purpose clock generator.
pub struct GpClock {
    id: ClockId,
    regs: MmioClockManager<'static>,
}

impl GpClock {
    pub const fn new(regs: MmioClockManager<'static>, id: ClockId) -> Self {
        Self { id, regs }
    }

    pub const fn id(&self) -> ClockId {
        self.id
    }

    /// Program the generator to `source` divided by `divisor`.
    ///
    /// Protocol, strictly ordered: disable the generator, wait for the BUSY
    /// flag to clear, write the divisor, then enable with the same source
    /// selector. Repeated identical calls are idempotent at the register
    /// level.
    pub fn configure(&mut self, source: ClockSource, divisor: u12) {
        let src = u4::new(u8::from(source));
        self.write_ctl(
            ClockControl::DEFAULT
                .with_passwd(PASSWD)
                .with_src(src)
                .with_enable(false),
        );
        self.wait_while_busy();
        self.write_div(
            ClockDivisor::DEFAULT
                .with_passwd(PASSWD)
                .with_divi(divisor),
        );
        self.write_ctl(
            ClockControl::DEFAULT
                .with_passwd(PASSWD)
                .with_src(src)
                .with_enable(true),
        );
        log::debug!(
            "{:?} configured: source {:?}, divisor {}",
            self.id,
            source,
            divisor.value()
        );
    }

    fn wait_while_busy(&self) {
        let mut spins: u32 = 0;
        while self.read_ctl().busy() {
            spins = spins.saturating_add(1);
            if spins == BUSY_WARN_SPINS {
                log::warn!("{:?} busy flag still set after {} reads", self.id, spins);
            }
        }
    }

    fn read_ctl(&self) -> ClockControl {
        match self.id {
            ClockId::Gp0 => self.regs.read_gp0_ctl(),
            ClockId::Gp1 => self.regs.read_gp1_ctl(),
            ClockId::Gp2 => self.regs.read_gp2_ctl(),
        }
    }

    fn write_ctl(&mut self, ctl: ClockControl) {
        match self.id {
            ClockId::Gp0 => self.regs.write_gp0_ctl(ctl),
            ClockId::Gp1 => self.regs.write_gp1_ctl(ctl),
            ClockId::Gp2 => self.regs.write_gp2_ctl(ctl),
        }
    }

    fn write_div(&mut self, div: ClockDivisor) {
        match self.id {
            ClockId::Gp0 => self.regs.write_gp0_div(div),
            ClockId::Gp1 => self.regs.write_gp1_div(div),
            ClockId::Gp2 => self.regs.write_gp2_div(div),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use approx::abs_diff_eq;
    use bcm2708::clock::ClockManager;
    use std::boxed::Box;

    const CM_WORDS: usize = 0x88 / 4;
    const GP0_CTL: usize = 28;
    const GP0_DIV: usize = 29;

    fn sim_clock(id: ClockId) -> (GpClock, &'static mut [u32; CM_WORDS]) {
        let block = Box::leak(Box::new([0u32; CM_WORDS]));
        let regs = unsafe { ClockManager::new_mmio_at(block.as_mut_ptr() as usize) };
        (GpClock::new(regs, id), block)
    }

    #[test]
    fn configure_writes_protocol_end_state() {
        let (mut clock, block) = sim_clock(ClockId::Gp0);
        clock.configure(ClockSource::PllD, u12::new(41));
        assert_eq!(block[GP0_CTL], 0x5A00_0016);
        assert_eq!(block[GP0_DIV], 0x5A00_0000 | (41 << 12));
    }

    #[test]
    fn configure_is_idempotent() {
        let (mut clock, block) = sim_clock(ClockId::Gp0);
        clock.configure(ClockSource::PllD, u12::new(41));
        let after_first = (block[GP0_CTL], block[GP0_DIV]);
        clock.configure(ClockSource::PllD, u12::new(41));
        assert_eq!((block[GP0_CTL], block[GP0_DIV]), after_first);
    }

    #[test]
    fn generators_use_their_own_register_pair() {
        let (mut clock, block) = sim_clock(ClockId::Gp2);
        clock.configure(ClockSource::Oscillator, u12::new(2));
        assert_eq!(block[GP0_CTL], 0);
        assert_eq!(block[GP0_CTL + 4], 0x5A00_0011);
        assert_eq!(block[GP0_DIV + 4], 0x5A00_0000 | (2 << 12));
    }

    #[test]
    fn output_frequency_from_plld() {
        let freq = output_frequency(ClockSource::PllD, u12::new(41)).unwrap();
        let mhz = freq.raw() as f64 / 1e6;
        assert!(abs_diff_eq!(mhz, 12.195, epsilon = 0.001));
    }

    #[test]
    fn output_frequency_edge_cases() {
        assert!(output_frequency(ClockSource::PllD, u12::new(0)).is_none());
        assert!(output_frequency(ClockSource::PllC, u12::new(10)).is_none());
        assert_eq!(
            output_frequency(ClockSource::Oscillator, u12::new(2)),
            Some(Hertz::from_raw(9_600_000))
        );
    }
}
