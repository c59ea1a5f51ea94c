//! Low-level GPIO access module.
use bcm2708::gpio::{MmioGpio, PinFunction};

/// Checked pin offset, 0 to 53.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinOffset(usize);

impl PinOffset {
    /// Returns [None] if the offset is larger than 53.
    pub const fn new(offset: usize) -> Option<Self> {
        if offset > 53 {
            return None;
        }
        Some(PinOffset(offset))
    }

    pub const fn offset(&self) -> usize {
        self.0
    }
}

pub struct LowLevelGpio {
    offset: PinOffset,
    regs: MmioGpio<'static>,
}

impl LowLevelGpio {
    pub fn new(regs: MmioGpio<'static>, offset: PinOffset) -> Self {
        Self { offset, regs }
    }

    pub fn offset(&self) -> PinOffset {
        self.offset
    }

    /// Clear the pin's function-select field to the input encoding.
    #[inline]
    pub fn configure_as_input(&mut self) {
        self.write_function(PinFunction::Input);
    }

    /// Set the pin's function-select field to the output encoding.
    #[inline]
    pub fn configure_as_output(&mut self) {
        self.write_function(PinFunction::Output);
    }

    /// Route the pin to one of the six alternate functions.
    #[inline]
    pub fn configure_as_alt(&mut self, function: PinFunction) {
        self.write_function(function);
    }

    /// Read back the pin's current function-select field.
    pub fn function(&self) -> PinFunction {
        let (shift, fsel) = self.get_fsel_reg_and_shift();
        let val = unsafe { core::ptr::read_volatile(fsel) };
        PinFunction::new_with_raw_value(arbitrary_int::u3::new(((val >> shift) & 0b111) as u8))
    }

    /// Drive the pin high through the write-only SET register.
    ///
    /// A single-bit mask write; other pins in the register are unaffected by
    /// the zero bits.
    #[inline]
    pub fn set_high(&mut self) {
        match self.offset.offset() {
            offset @ 0..=31 => self.regs.write_set0(1 << offset),
            offset @ 32..=53 => self.regs.write_set1(1 << (offset - 32)),
            _ => panic!("invalid pin offset"),
        }
    }

    /// Drive the pin low through the write-only CLR register.
    #[inline]
    pub fn set_low(&mut self) {
        match self.offset.offset() {
            offset @ 0..=31 => self.regs.write_clr0(1 << offset),
            offset @ 32..=53 => self.regs.write_clr1(1 << (offset - 32)),
            _ => panic!("invalid pin offset"),
        }
    }

    /// Instantaneous level of the pin, regardless of configured function.
    #[inline]
    pub fn is_high(&self) -> bool {
        match self.offset.offset() {
            offset @ 0..=31 => (self.regs.read_lev0() >> offset) & 0b1 == 1,
            offset @ 32..=53 => (self.regs.read_lev1() >> (offset - 32)) & 0b1 == 1,
            _ => panic!("invalid pin offset"),
        }
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        !self.is_high()
    }

    /// Read-modify-write of the pin's 3-bit function-select field, leaving
    /// the other nine pins in the register untouched.
    fn write_function(&mut self, function: PinFunction) {
        let (shift, fsel) = self.get_fsel_reg_and_shift();
        let mut val = unsafe { core::ptr::read_volatile(fsel) };
        val &= !(0b111 << shift);
        val |= (function.code().value() as u32) << shift;
        unsafe { core::ptr::write_volatile(fsel, val) };
    }

    #[inline(always)]
    fn get_fsel_reg_and_shift(&self) -> (usize, *mut u32) {
        let offset = self.offset.offset();
        let reg = match offset / 10 {
            0 => self.regs.pointer_to_fsel0(),
            1 => self.regs.pointer_to_fsel1(),
            2 => self.regs.pointer_to_fsel2(),
            3 => self.regs.pointer_to_fsel3(),
            4 => self.regs.pointer_to_fsel4(),
            5 => self.regs.pointer_to_fsel5(),
            _ => panic!("invalid pin offset"),
        };
        ((offset % 10) * 3, reg)
    }
}
