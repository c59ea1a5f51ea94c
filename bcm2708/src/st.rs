//! # System timer register module.

/// System timer register access.
///
/// The counter runs freely at 1 MHz and is split across two 32-bit
/// registers. CLO and CHI are read-only; the compare registers belong to the
/// GPU-shared channels 0/2 and the ARM-available channels 1/3.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct SystemTimer {
    /// Control/status: match flags for the four compare channels
    cs: u32,
    /// Counter, lower 32 bits
    #[mmio(PureRead)]
    clo: u32,
    /// Counter, upper 32 bits
    #[mmio(PureRead)]
    chi: u32,
    /// Compare 0
    cmp0: u32,
    /// Compare 1
    cmp1: u32,
    /// Compare 2
    cmp2: u32,
    /// Compare 3
    cmp3: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<SystemTimer>(), 0x1C);

impl SystemTimer {
    /// Create a new system timer MMIO instance at the fixed
    /// BCM2836/BCM2837 base address.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same
    /// peripheral structure from multiple threads. The user must ensure that
    /// concurrent accesses are safe and do not interfere with each other.
    #[inline]
    pub const unsafe fn new_mmio_fixed() -> MmioSystemTimer<'static> {
        unsafe { SystemTimer::new_mmio_at(crate::PERI_BASE_BCM2836 + crate::ST_OFFSET) }
    }
}
