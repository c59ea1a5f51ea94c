//! Calibrated busy-wait delays.
//!
//! The pulse timing of the acquisition engine is derived from counted spin
//! loops, not from a timer. A spin count buys a fixed number of CPU cycles,
//! so the resulting wall-clock delay depends on the core clock, cache state
//! and pipeline behavior of the specific board. Reference calibration,
//! measured on the original hardware:
//!
//! | spins | measured delay |
//! |-------|----------------|
//! | 10    | ≈ 200 ns       |
//! | 20    | ≈ 250 ns       |
//! | 150   | ≈ 750 ns       |
//! | 1500  | ≈ 7500 ns      |
//!
//! These values do not transfer to other CPUs or clock configurations.
//! Treat spin counts as calibration inputs and re-measure on every new
//! board revision.

/// Spin for `count` iterations of the architecture's spin-loop hint.
#[inline(always)]
pub fn nop_spin(count: u32) {
    for _ in 0..count {
        core::hint::spin_loop();
    }
}
