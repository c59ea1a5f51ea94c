//! Pulse-echo acquisition engine.
//!
//! One capture fires the pulser and digitizes both ADCs line by line: the
//! excitation pulse is followed by a damper recovery window, then the GPIO
//! level register is read back-to-back into the sample buffer. The inner
//! readout loop has no delay in it; its iteration rate *is* the sampling
//! rate, so everything that costs cycles stays out of it. Both converters
//! appear interleaved in every sample word, see [RawSample].
//!
//! The per-line timing comes from calibrated spin counts
//! ([crate::delay::nop_spin]), not from a timer, and the whole capture runs
//! inside a critical section so that interrupt and scheduler jitter cannot
//! distort the sample cadence. The only timing reference a capture records
//! is the elapsed time over the whole run; per-sample timestamps do not
//! exist.
use arbitrary_int::u12;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use bcm2708::gpio::{MmioGpio, PinFunction};

use crate::clocks::ClockSource;
use crate::delay::nop_spin;
use crate::gpio::Flex;
use crate::gpio::ll::{LowLevelGpio, PinOffset};
use crate::st::{NANOS_PER_TICK, SystemTimer};
use crate::time::Nanoseconds64;

/// GPIO offsets of the first converter's data bits, LSB first.
pub const ADC1_PINS: [usize; 9] = [16, 17, 18, 19, 20, 22, 25, 26, 27];
/// GPIO offsets of the second converter's data bits, LSB first.
pub const ADC2_PINS: [usize; 9] = [7, 8, 9, 10, 11, 12, 13, 14, 15];
/// Pulser excitation pin.
pub const PULSE_ON_PIN: usize = 23;
/// Pulser damping pin.
pub const PULSE_OFF_PIN: usize = 24;
/// ADC reference clock output pin, routed to GPCLK0 via alternate function 0.
pub const ADC_CLOCK_PIN: usize = 4;

/// Source feeding the ADC reference clock.
pub const ADC_CLOCK_SOURCE: ClockSource = ClockSource::PllD;
/// Integer divisor for the ADC reference clock.
///
/// The shipped value is 0x29 (41), which gives 500 MHz / 41 ≈ 12.2 MHz from
/// PLLD. The accompanying documentation of the original hardware describes
/// divide-by-50 for a 10 MHz output instead; the literal value here is
/// authoritative and the output frequency measured on the target decides
/// the final trim.
pub const ADC_CLOCK_DIVISOR: u12 = u12::new(0x29);

/// Pulser settle hold between arming and the first line. Not configurable.
const SETTLE_MS: u32 = 10;

/// Calibrated capture timing. See [crate::delay] for the spin calibration
/// table; spin counts buy CPU cycles, not wall-clock time, and must be
/// re-measured when the board or its clocking changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    /// Number of pulse-then-sample repetitions per capture.
    pub lines: usize,
    /// Level register reads per line.
    pub samples_per_line: usize,
    /// Spin count holding the excitation pulse high.
    pub pulse_on_spins: u32,
    /// Spin count of the damper recovery window.
    pub pulse_off_spins: u32,
    /// Yield between lines. The reference intent is "a minimal yield", not
    /// a precise duration; this is a lower bound, not a guarantee.
    pub interline_yield_us: u32,
}

impl TimingProfile {
    /// Reference calibration: 10 lines of 2500 samples, a ≈200 ns
    /// excitation pulse and a few microseconds of damper recovery.
    pub const DEFAULT: Self = Self {
        lines: 10,
        samples_per_line: 2500,
        pulse_on_spins: 10,
        pulse_off_spins: 3500,
        interline_yield_us: 500,
    };

    /// Total sample count of one capture.
    pub const fn total_samples(&self) -> usize {
        self.lines * self.samples_per_line
    }
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("profile needs {required} samples but the record can hold {capacity}")]
    Capacity { required: usize, capacity: usize },
}

/// One raw readout of the full GPIO level register.
///
/// Both converters are wired to scattered GPIO offsets and appear
/// interleaved in the same word; the accessors reassemble the two 9-bit
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample(pub u32);

impl RawSample {
    /// First converter value, from the [ADC1_PINS] bit positions.
    pub const fn adc1(&self) -> u16 {
        let word = self.0;
        (((word >> 16) & 0x1F) | (((word >> 22) & 0b1) << 5) | (((word >> 25) & 0b111) << 6))
            as u16
    }

    /// Second converter value, from the contiguous [ADC2_PINS] range.
    pub const fn adc2(&self) -> u16 {
        ((self.0 >> 7) & 0x1FF) as u16
    }
}

/// Result of one acquisition: the sample buffer and the elapsed wall time
/// between the capture timestamps.
///
/// Every capture fully overwrites the previous contents. The effective
/// per-sample period can only be inferred as an average over the whole run
/// ([Self::sample_period_ns]); jitter within the capture is unmeasured.
pub struct Record<const N: usize> {
    samples: heapless::Vec<u32, N>,
    elapsed: Nanoseconds64,
}

impl<const N: usize> Record<N> {
    pub const fn new() -> Self {
        Self {
            samples: heapless::Vec::new(),
            elapsed: Nanoseconds64::from_ticks(0),
        }
    }

    /// Raw level register readouts, in capture order.
    pub fn samples(&self) -> &[u32] {
        &self.samples
    }

    /// Decoded view of one sample.
    pub fn sample(&self, index: usize) -> Option<RawSample> {
        self.samples.get(index).map(|raw| RawSample(*raw))
    }

    /// Wall time between the capture start and stop timestamps.
    pub const fn elapsed(&self) -> Nanoseconds64 {
        self.elapsed
    }

    /// Average sampling period over the whole capture, in nanoseconds.
    ///
    /// Returns [None] for an empty record.
    pub fn sample_period_ns(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.elapsed.ticks() / self.samples.len() as u64)
    }
}

impl<const N: usize> Default for Record<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The acquisition engine.
///
/// Owns the pulser pins and the raw level register access for the readout
/// hot path. Constructing the engine claims and configures the converter
/// input pins, the pulser pins (idle state: no excitation, damper engaged)
/// and the ADC clock pin; the clock generator itself is programmed
/// separately through [crate::clocks::GpClock].
pub struct Scope {
    regs: MmioGpio<'static>,
    pulse_on: Flex,
    pulse_off: Flex,
    timer: SystemTimer,
    profile: TimingProfile,
}

impl Scope {
    pub fn new(gpio: MmioGpio<'static>, timer: SystemTimer, profile: TimingProfile) -> Self {
        for offset in ADC1_PINS.iter().chain(ADC2_PINS.iter()) {
            let mut pin = LowLevelGpio::new(
                unsafe { gpio.clone() },
                PinOffset::new(*offset).unwrap(),
            );
            pin.configure_as_input();
        }

        let mut pulse_on = Flex::new(
            unsafe { gpio.clone() },
            PinOffset::new(PULSE_ON_PIN).unwrap(),
        );
        let mut pulse_off = Flex::new(
            unsafe { gpio.clone() },
            PinOffset::new(PULSE_OFF_PIN).unwrap(),
        );
        pulse_on.configure_as_output(PinState::Low);
        pulse_off.configure_as_output(PinState::High);

        let mut clock_pin = LowLevelGpio::new(
            unsafe { gpio.clone() },
            PinOffset::new(ADC_CLOCK_PIN).unwrap(),
        );
        clock_pin.configure_as_alt(PinFunction::Alt0);

        Self {
            regs: gpio,
            pulse_on,
            pulse_off,
            timer,
            profile,
        }
    }

    pub const fn profile(&self) -> &TimingProfile {
        &self.profile
    }

    /// Run one acquisition into `record`, fully replacing its contents.
    ///
    /// Blocks for the duration of the capture. Everything between the start
    /// and stop timestamps runs inside a critical section; on the target,
    /// the `critical-section` implementation must mask both IRQ and FIQ on
    /// the executing core, since the capture cadence is only deterministic
    /// without interrupt jitter. Once the section is entered the capture
    /// cannot be cancelled and runs to completion.
    ///
    /// Not re-entrant; one capture at a time per engine is enforced by the
    /// mutable borrow. Serializing capture *requests* is the caller's job.
    pub fn capture<const N: usize>(&mut self, record: &mut Record<N>) -> Result<(), CaptureError> {
        let required = self.profile.total_samples();
        if required > N {
            return Err(CaptureError::Capacity {
                required,
                capacity: N,
            });
        }
        record.samples.clear();

        // Arm the pulser and let the analog front end settle.
        self.pulse_on.configure_as_output(PinState::High);
        self.pulse_off.configure_as_output(PinState::Low);
        self.timer.delay_ms(SETTLE_MS);

        let profile = self.profile;
        let lev = self.regs.pointer_to_lev0();
        let (start, stop) = critical_section::with(|_| {
            let start = self.timer.read_timer();
            for _ in 0..profile.lines {
                self.pulse_on.set_high();
                nop_spin(profile.pulse_on_spins);
                self.pulse_on.set_low();

                self.pulse_off.set_low();
                nop_spin(profile.pulse_off_spins);
                self.pulse_off.set_high();

                // Capacity was established before the capture started; the
                // unchecked push keeps bounds tests out of the sampling
                // cadence.
                for _ in 0..profile.samples_per_line {
                    unsafe {
                        record
                            .samples
                            .push_unchecked(core::ptr::read_volatile(lev));
                    }
                }

                self.timer.delay_us(profile.interline_yield_us);
            }
            let stop = self.timer.read_timer();
            (start, stop)
        });

        // Disarm: both pulser pins back to high impedance.
        self.pulse_on.configure_as_input();
        self.pulse_off.configure_as_input();

        record.elapsed = Nanoseconds64::from_ticks((stop - start) * NANOS_PER_TICK);
        log::debug!(
            "capture complete: {} samples in {} ns",
            record.samples.len(),
            record.elapsed.ticks()
        );
        Ok(())
    }
}

/// Read-only byte stream over a completed [Record].
///
/// Streams the sample words in little-endian order followed by the 8-byte
/// elapsed-nanoseconds value, then reports end of stream. Writing through
/// the cursor always fails with [AccessError::WriteUnsupported] and has no
/// side effects.
pub struct RecordReader<'a, const N: usize> {
    record: &'a Record<N>,
    pos: usize,
}

impl<'a, const N: usize> RecordReader<'a, N> {
    pub const fn new(record: &'a Record<N>) -> Self {
        Self { record, pos: 0 }
    }

    /// Total length of the byte stream.
    pub fn len(&self) -> usize {
        self.record.samples.len() * 4 + 8
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn byte_at(&self, index: usize) -> u8 {
        let sample_bytes = self.record.samples.len() * 4;
        if index < sample_bytes {
            self.record.samples[index / 4].to_le_bytes()[index % 4]
        } else {
            self.record.elapsed.ticks().to_le_bytes()[index - sample_bytes]
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("the capture record is read-only")]
    WriteUnsupported,
}

impl embedded_io::Error for AccessError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::InvalidInput
    }
}

impl<const N: usize> embedded_io::ErrorType for RecordReader<'_, N> {
    type Error = AccessError;
}

impl<const N: usize> embedded_io::Read for RecordReader<'_, N> {
    /// Read the next chunk of the stream; returns 0 once it is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = self.len() - self.pos;
        let count = remaining.min(buf.len());
        for byte in buf[..count].iter_mut() {
            *byte = self.byte_at(self.pos);
            self.pos += 1;
        }
        Ok(count)
    }
}

impl<const N: usize> embedded_io::Write for RecordReader<'_, N> {
    /// The record never accepts externally supplied data.
    fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> {
        Err(AccessError::WriteUnsupported)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use embedded_io::{Read, Write};
    use std::boxed::Box;
    use std::thread;

    const GPIO_WORDS: usize = 0xA0 / 4;
    const ST_WORDS: usize = 0x1C / 4;
    const FSEL0: usize = 0;
    const FSEL2: usize = 2;
    const LEV0: usize = 13;

    fn sim_gpio() -> (MmioGpio<'static>, &'static mut [u32; GPIO_WORDS]) {
        let block = Box::leak(Box::new([0u32; GPIO_WORDS]));
        let regs = unsafe { bcm2708::gpio::Gpio::new_mmio_at(block.as_mut_ptr() as usize) };
        (regs, block)
    }

    /// Simulated system timer advanced by a detached ticker thread, so
    /// delays terminate and the capture timestamps differ.
    fn sim_timer_running() -> SystemTimer {
        let block: &'static mut [u32; ST_WORDS] = Box::leak(Box::new([0u32; ST_WORDS]));
        let clo_addr = core::ptr::addr_of_mut!(block[1]) as usize;
        thread::spawn(move || {
            let clo = unsafe { AtomicU32::from_ptr(clo_addr as *mut u32) };
            loop {
                clo.fetch_add(1, Ordering::Relaxed);
            }
        });
        let regs = unsafe { bcm2708::st::SystemTimer::new_mmio_at(block.as_ptr() as usize) };
        SystemTimer::new(regs)
    }

    fn quick_profile() -> TimingProfile {
        TimingProfile {
            lines: 2,
            samples_per_line: 4,
            pulse_on_spins: 1,
            pulse_off_spins: 1,
            interline_yield_us: 1,
        }
    }

    #[test]
    fn end_to_end_capture() {
        let (regs, block) = sim_gpio();
        block[LEV0] = 0xAAAA_AAAA;
        let mut scope = Scope::new(regs, sim_timer_running(), TimingProfile::DEFAULT);
        let mut record = Record::<25000>::new();

        scope.capture(&mut record).unwrap();

        assert_eq!(record.samples().len(), 25000);
        assert!(record.samples().iter().all(|word| *word == 0xAAAA_AAAA));
        assert!(record.elapsed().ticks() > 0);
        assert_eq!(record.sample_period_ns(), Some(record.elapsed().ticks() / 25000));
    }

    #[test]
    fn new_configures_pins() {
        let (regs, block) = sim_gpio();
        // Leftover output configuration on an ADC pin from a previous run.
        block[FSEL0 + 1] = 0b001 << 18; // pin 16
        let _scope = Scope::new(regs, sim_timer_running(), quick_profile());

        // ADC pins are inputs again, the clock pin routes to GPCLK0 and the
        // pulser pins idle as outputs.
        assert_eq!(block[FSEL0 + 1], 0);
        assert_eq!(block[FSEL0], 0b100 << 12);
        assert_eq!(block[FSEL2], (0b001 << 9) | (0b001 << 12));
    }

    #[test]
    fn capture_disarms_pulser() {
        let (regs, block) = sim_gpio();
        let mut scope = Scope::new(regs, sim_timer_running(), quick_profile());
        let mut record = Record::<8>::new();
        scope.capture(&mut record).unwrap();
        // Pulser pins back to high impedance; the other fields of the
        // register (all converter inputs) stay zero.
        assert_eq!(block[FSEL2], 0);
    }

    #[test]
    fn boundary_profile_single_sample() {
        let (regs, block) = sim_gpio();
        block[LEV0] = 7;
        let profile = TimingProfile {
            lines: 1,
            samples_per_line: 1,
            ..quick_profile()
        };
        let mut scope = Scope::new(regs, sim_timer_running(), profile);
        let mut record = Record::<1>::new();
        scope.capture(&mut record).unwrap();
        assert_eq!(record.samples(), &[7]);
    }

    #[test]
    fn capacity_error_reported_before_side_effects() {
        let (regs, _block) = sim_gpio();
        let mut scope = Scope::new(regs, sim_timer_running(), quick_profile());
        let mut record = Record::<4>::new();
        assert_eq!(
            scope.capture(&mut record).unwrap_err(),
            CaptureError::Capacity {
                required: 8,
                capacity: 4
            }
        );
        assert!(record.samples().is_empty());
    }

    #[test]
    fn consecutive_captures_fully_overwrite() {
        let (regs, block) = sim_gpio();
        block[LEV0] = 0xAAAA_AAAA;
        let mut scope = Scope::new(regs, sim_timer_running(), quick_profile());
        let mut record = Record::<8>::new();
        scope.capture(&mut record).unwrap();
        assert!(record.samples().iter().all(|word| *word == 0xAAAA_AAAA));

        block[LEV0] = 0x5555_5555;
        scope.capture(&mut record).unwrap();
        assert_eq!(record.samples().len(), 8);
        assert!(record.samples().iter().all(|word| *word == 0x5555_5555));
    }

    #[test]
    fn raw_sample_reassembles_converters() {
        let word = (1 << 16) | (1 << 18) | (1 << 20) | (1 << 25) | (1 << 27) // ADC1 = 0b101010101
            | (1 << 8) | (1 << 10) | (1 << 12) | (1 << 14); // ADC2 = 0b010101010
        let sample = RawSample(word);
        assert_eq!(sample.adc1(), 0x155);
        assert_eq!(sample.adc2(), 0x0AA);
    }

    #[test]
    fn reader_streams_samples_then_elapsed() {
        let mut record = Record::<4>::new();
        record.samples.push(0x0403_0201).unwrap();
        record.samples.push(0x0807_0605).unwrap();
        record.elapsed = Nanoseconds64::from_ticks(0x1122);

        let mut reader = RecordReader::new(&record);
        assert_eq!(reader.len(), 16);

        let mut all = [0u8; 16];
        assert_eq!(reader.read(&mut all).unwrap(), 16);
        assert_eq!(
            all,
            [1, 2, 3, 4, 5, 6, 7, 8, 0x22, 0x11, 0, 0, 0, 0, 0, 0]
        );
        // Exhausted: further reads return empty.
        assert_eq!(reader.read(&mut all).unwrap(), 0);
    }

    #[test]
    fn reader_supports_partial_reads() {
        let mut record = Record::<4>::new();
        record.samples.push(0x0403_0201).unwrap();

        let mut reader = RecordReader::new(&record);
        let mut chunk = [0u8; 5];
        assert_eq!(reader.read(&mut chunk).unwrap(), 5);
        assert_eq!(chunk, [1, 2, 3, 4, 0]);
        assert_eq!(reader.read(&mut chunk).unwrap(), 5);
        assert_eq!(reader.read(&mut chunk).unwrap(), 2);
        assert_eq!(reader.read(&mut chunk).unwrap(), 0);
        assert_eq!(reader.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn writes_always_rejected() {
        let record = Record::<4>::new();
        let mut reader = RecordReader::new(&record);
        assert_eq!(
            reader.write(&[1, 2, 3]).unwrap_err(),
            AccessError::WriteUnsupported
        );
        assert_eq!(reader.write(&[]).unwrap_err(), AccessError::WriteUnsupported);
        use embedded_io::Error;
        assert_eq!(
            AccessError::WriteUnsupported.kind(),
            embedded_io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn empty_record_period_is_undefined() {
        let record = Record::<4>::new();
        assert_eq!(record.sample_period_ns(), None);
        let reader = RecordReader::new(&record);
        assert_eq!(reader.len(), 8);
    }
}
