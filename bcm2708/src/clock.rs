//! # Clock manager register module.
//!
//! Writing any of these registers requires the password in the upper byte;
//! writes without it are ignored by the hardware.
use arbitrary_int::{u2, u4, u12};

/// Password required in bits 31:24 of every clock manager write.
pub const PASSWD: u8 = 0x5A;

/// General-purpose clock control register.
#[bitbybit::bitfield(u32, default = 0x0)]
#[derive(Debug)]
pub struct ClockControl {
    /// Must be [PASSWD] for the write to take effect.
    #[bits(24..=31, w)]
    passwd: u8,
    /// MASH noise-shaping stage selection.
    #[bits(9..=10, rw)]
    mash: u2,
    /// Invert the clock generator output.
    #[bit(8, rw)]
    flip: bool,
    /// Set while the clock generator is running; the source and divisor
    /// must not be changed until it clears after a disable.
    #[bit(7, r)]
    busy: bool,
    /// Stop and reset the clock generator immediately.
    #[bit(5, rw)]
    kill: bool,
    /// Request the clock generator to start or stop cleanly.
    #[bit(4, rw)]
    enable: bool,
    /// Clock source selector.
    #[bits(0..=3, rw)]
    src: u4,
}

/// General-purpose clock divisor register.
#[bitbybit::bitfield(u32, default = 0x0)]
#[derive(Debug)]
pub struct ClockDivisor {
    /// Must be [PASSWD] for the write to take effect.
    #[bits(24..=31, w)]
    passwd: u8,
    /// Integer part of the divisor.
    #[bits(12..=23, rw)]
    divi: u12,
    /// Fractional part of the divisor, used by the MASH stages.
    #[bits(0..=11, rw)]
    divf: u12,
}

/// Clock manager register access for the general-purpose clocks GP0-GP2.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct ClockManager {
    _reserved_0: [u32; 28],

    /// GP0 control
    gp0_ctl: ClockControl,
    /// GP0 divisor
    gp0_div: ClockDivisor,
    /// GP1 control
    gp1_ctl: ClockControl,
    /// GP1 divisor
    gp1_div: ClockDivisor,
    /// GP2 control
    gp2_ctl: ClockControl,
    /// GP2 divisor
    gp2_div: ClockDivisor,
}

static_assertions::const_assert_eq!(core::mem::size_of::<ClockManager>(), 0x88);

impl ClockManager {
    /// Create a new clock manager MMIO instance at the fixed
    /// BCM2836/BCM2837 base address.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same
    /// peripheral structure from multiple threads. The user must ensure that
    /// concurrent accesses are safe and do not interfere with each other.
    #[inline]
    pub const unsafe fn new_mmio_fixed() -> MmioClockManager<'static> {
        unsafe { ClockManager::new_mmio_at(crate::PERI_BASE_BCM2836 + crate::CM_OFFSET) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_encoding() {
        let ctl = ClockControl::DEFAULT
            .with_passwd(PASSWD)
            .with_src(u4::new(6))
            .with_enable(true);
        assert_eq!(ctl.raw_value(), 0x5A00_0016);
    }

    #[test]
    fn divisor_is_shifted_by_twelve() {
        let div = ClockDivisor::DEFAULT
            .with_passwd(PASSWD)
            .with_divi(u12::new(0x29));
        assert_eq!(div.raw_value(), 0x5A02_9000);
    }

    #[test]
    fn busy_flag_is_bit_seven() {
        let ctl = ClockControl::new_with_raw_value(1 << 7);
        assert!(ctl.busy());
        let ctl = ClockControl::new_with_raw_value(0);
        assert!(!ctl.busy());
    }
}
