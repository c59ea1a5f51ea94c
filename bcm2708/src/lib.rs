//! # PAC for the BCM2708-family (Raspberry Pi) peripherals
//!
//! Typed register models for the three peripheral blocks used by the
//! pulse-echo acquisition front end: the GPIO controller, the clock manager
//! and the free-running system timer. Offsets and field encodings follow the
//! BCM2835 ARM Peripherals datasheet.
//!
//! The fixed-address constructors target the BCM2836/BCM2837 peripheral
//! window (Pi 2 and Pi 3). On the older BCM2835 boards (Pi 1, Zero, Zero W)
//! the window starts at [PERI_BASE_BCM2835]; use the generated `new_mmio_at`
//! constructors with that base instead.
#![no_std]

pub mod clock;
pub mod gpio;
pub mod st;

/// Peripheral bus window base for BCM2835 boards (Pi 1, Zero, Zero W).
pub const PERI_BASE_BCM2835: usize = 0x2000_0000;
/// Peripheral bus window base for BCM2836/BCM2837 boards (Pi 2, Pi 3).
pub const PERI_BASE_BCM2836: usize = 0x3F00_0000;

/// GPIO controller offset within the peripheral window.
pub const GPIO_OFFSET: usize = 0x0020_0000;
/// Clock manager offset within the peripheral window.
pub const CM_OFFSET: usize = 0x0010_1000;
/// System timer offset within the peripheral window.
pub const ST_OFFSET: usize = 0x0000_3000;
