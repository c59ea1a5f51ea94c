//! # Time units

// Frequency based

/// Hertz
pub type Hertz = fugit::HertzU32;

/// MegaHertz
pub type MegaHertz = fugit::MegahertzU32;

// Period based

/// Milliseconds
pub type Milliseconds = fugit::MillisDurationU32;

/// Microseconds
pub type Microseconds = fugit::MicrosDurationU32;

/// Nanoseconds, 64 bit. Elapsed capture times can exceed the u32 range.
pub type Nanoseconds64 = fugit::NanosDurationU64;
