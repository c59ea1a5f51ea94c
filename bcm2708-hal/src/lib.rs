//! # HAL for a Raspberry Pi pulse-echo acquisition front end
//!
//! Drivers on top of the [bcm2708] peripheral access crate for a
//! software-defined oscilloscope / ultrasound front end: two parallel 9-bit
//! ADCs are digitized by polling the GPIO level register at the maximum rate
//! the CPU allows, while a pulser pin pair and a general-purpose clock
//! output drive the external analog hardware. There is no sampling hardware
//! involved; the sampling rate is a function of CPU instruction throughput
//! and the calibrated spin delays in [delay].
//!
//! Bring-up order:
//!
//! 1. [mem::Peripherals::map] the GPIO, clock manager and system timer
//!    windows.
//! 2. Configure the ADC reference clock:
//!    [clocks::GpClock::configure] with [scope::ADC_CLOCK_SOURCE] and
//!    [scope::ADC_CLOCK_DIVISOR].
//! 3. Create the engine with [scope::Scope::new]; it claims the converter,
//!    pulser and clock pins.
//! 4. Run [scope::Scope::capture] once per acquisition request and hand the
//!    filled [scope::Record] to a [scope::RecordReader] for streaming.
#![no_std]

pub mod clocks;
pub mod delay;
pub mod gpio;
pub mod mem;
pub mod scope;
pub mod st;
pub mod time;
