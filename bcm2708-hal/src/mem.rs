//! Peripheral register window management.
//!
//! Exactly one [Peripherals] instance owns the resident register handles at
//! a time. Mapping is fatal on failure for the whole subsystem; there is no
//! degraded mode without register access.
use core::sync::atomic::{AtomicBool, Ordering};

use bcm2708::{CM_OFFSET, GPIO_OFFSET, ST_OFFSET, clock, gpio, st};

static MAPPED: AtomicBool = AtomicBool::new(false);

/// Peripheral windows start on page boundaries.
const PAGE_SIZE: usize = 4096;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("peripheral base address {0:#010x} is not page aligned")]
    Unaligned(usize),
    #[error("peripheral windows are already mapped")]
    AlreadyMapped,
}

/// Resident register windows for the peripheral blocks in use.
pub struct Peripherals {
    pub gpio: gpio::MmioGpio<'static>,
    pub clock: clock::MmioClockManager<'static>,
    pub st: st::MmioSystemTimer<'static>,
}

impl core::fmt::Debug for Peripherals {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Peripherals").finish_non_exhaustive()
    }
}

impl Peripherals {
    /// Map the GPIO, clock manager and system timer windows relative to
    /// `peri_base` (one of [bcm2708::PERI_BASE_BCM2835] or
    /// [bcm2708::PERI_BASE_BCM2836]).
    ///
    /// Fails if the base is not page aligned or if the windows are already
    /// mapped by another instance.
    pub fn map(peri_base: usize) -> Result<Self, MapError> {
        if peri_base % PAGE_SIZE != 0 {
            return Err(MapError::Unaligned(peri_base));
        }
        if MAPPED.swap(true, Ordering::AcqRel) {
            return Err(MapError::AlreadyMapped);
        }
        Ok(unsafe { Self::steal(peri_base) })
    }

    /// Create the register handles without taking ownership.
    ///
    /// # Safety
    ///
    /// This function allows creating an arbitrary amount of register
    /// handles for the same hardware. The user must ensure that concurrent
    /// accesses are safe and do not interfere with a mapped instance.
    pub const unsafe fn steal(peri_base: usize) -> Self {
        Self {
            gpio: unsafe { gpio::Gpio::new_mmio_at(peri_base + GPIO_OFFSET) },
            clock: unsafe { clock::ClockManager::new_mmio_at(peri_base + CM_OFFSET) },
            st: unsafe { st::SystemTimer::new_mmio_at(peri_base + ST_OFFSET) },
        }
    }

    /// Release the windows.
    ///
    /// Consumes the handle set, so the windows cannot be touched after the
    /// release and a release can only happen once. Mapping again afterwards
    /// is allowed.
    pub fn unmap(self) {
        MAPPED.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test function: the mapped flag is process global.
    #[test]
    fn map_lifecycle() {
        assert_eq!(
            Peripherals::map(0x3F00_0100).unwrap_err(),
            MapError::Unaligned(0x3F00_0100)
        );

        let first = Peripherals::map(bcm2708::PERI_BASE_BCM2836).unwrap();
        assert_eq!(
            Peripherals::map(bcm2708::PERI_BASE_BCM2836).unwrap_err(),
            MapError::AlreadyMapped
        );

        first.unmap();
        let second = Peripherals::map(bcm2708::PERI_BASE_BCM2835).unwrap();
        second.unmap();
    }
}
