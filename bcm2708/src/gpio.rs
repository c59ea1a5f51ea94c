//! # GPIO register module.
use arbitrary_int::u3;

/// Function-select code of one pin, packed 10 pins per 32-bit GPFSEL
/// register, 3 bits per pin.
///
/// The alternate-function selectors are not in numerical order: alternate
/// functions 0 to 3 use codes 0b100 to 0b111, alternate function 4 uses
/// 0b011 and alternate function 5 uses 0b010.
#[bitbybit::bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum PinFunction {
    Input = 0b000,
    Output = 0b001,
    Alt5 = 0b010,
    Alt4 = 0b011,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
}

impl PinFunction {
    /// Function-select code for alternate function `alt_id`.
    ///
    /// Returns [None] if `alt_id` is larger than 5.
    pub const fn alt(alt_id: u8) -> Option<Self> {
        match alt_id {
            0 => Some(PinFunction::Alt0),
            1 => Some(PinFunction::Alt1),
            2 => Some(PinFunction::Alt2),
            3 => Some(PinFunction::Alt3),
            4 => Some(PinFunction::Alt4),
            5 => Some(PinFunction::Alt5),
            _ => None,
        }
    }

    /// The 3-bit hardware code.
    pub const fn code(&self) -> u3 {
        u3::new(*self as u8)
    }
}

/// GPIO register access.
///
/// Covers the register window from GPFSEL0 through GPPUDCLK1. The SET and
/// CLR registers are write-only by hardware design: bits written as 1 take
/// effect, bits written as 0 leave the corresponding pins untouched, so no
/// read-modify-write is ever needed (or possible) on them.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Gpio {
    /// Function select for pins 0-9
    fsel0: u32,
    /// Function select for pins 10-19
    fsel1: u32,
    /// Function select for pins 20-29
    fsel2: u32,
    /// Function select for pins 30-39
    fsel3: u32,
    /// Function select for pins 40-49
    fsel4: u32,
    /// Function select for pins 50-53
    fsel5: u32,

    _reserved_0: u32,

    /// Output set for pins 0-31
    #[mmio(Write)]
    set0: u32,
    /// Output set for pins 32-53
    #[mmio(Write)]
    set1: u32,

    _reserved_1: u32,

    /// Output clear for pins 0-31
    #[mmio(Write)]
    clr0: u32,
    /// Output clear for pins 32-53
    #[mmio(Write)]
    clr1: u32,

    _reserved_2: u32,

    /// Pin level for pins 0-31
    #[mmio(PureRead)]
    lev0: u32,
    /// Pin level for pins 32-53
    #[mmio(PureRead)]
    lev1: u32,

    _reserved_3: u32,

    /// Event detect status
    eds0: u32,
    eds1: u32,

    _reserved_4: u32,

    /// Rising edge detect enable
    ren0: u32,
    ren1: u32,

    _reserved_5: u32,

    /// Falling edge detect enable
    fen0: u32,
    fen1: u32,

    _reserved_6: u32,

    /// High level detect enable
    hen0: u32,
    hen1: u32,

    _reserved_7: u32,

    /// Low level detect enable
    len0: u32,
    len1: u32,

    _reserved_8: u32,

    /// Async rising edge detect enable
    aren0: u32,
    aren1: u32,

    _reserved_9: u32,

    /// Async falling edge detect enable
    afen0: u32,
    afen1: u32,

    _reserved_10: u32,

    /// Pull-up/down mode
    pud: u32,
    /// Pull-up/down clock for pins 0-31
    pudclk0: u32,
    /// Pull-up/down clock for pins 32-53
    pudclk1: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Gpio>(), 0xA0);

impl Gpio {
    /// Create a new GPIO MMIO instance at the fixed BCM2836/BCM2837 base
    /// address.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same
    /// peripheral structure from multiple threads. The user must ensure that
    /// concurrent accesses are safe and do not interfere with each other.
    #[inline]
    pub const unsafe fn new_mmio_fixed() -> MmioGpio<'static> {
        unsafe { Gpio::new_mmio_at(crate::PERI_BASE_BCM2836 + crate::GPIO_OFFSET) }
    }
}
