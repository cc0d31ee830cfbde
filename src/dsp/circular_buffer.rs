//! # Circular Buffer
//!
//! A fixed-capacity ring store for one channel of audio history.
//!
//! ## Why a power of two?
//!
//! A ring buffer needs to wrap an ever-growing position back into
//! `[0, capacity)`. The textbook way is the modulo operator:
//!
//! ```text
//! index = position % capacity
//! ```
//!
//! When `capacity` is a power of two, the same result comes from masking
//! off the high bits, which is a single AND instruction instead of a
//! division:
//!
//! ```text
//! index = position & (capacity - 1)
//!
//! capacity = 8        → mask = 0b0111
//! position = 13       → 0b1101 & 0b0111 = 0b0101 = 5   (13 % 8 = 5)
//! ```
//!
//! The mask also makes wrapping arithmetic on `usize` harmless: any
//! position that overflowed past `usize::MAX` still lands on the right
//! slot, because `usize::MAX + 1` is itself a multiple of every power of
//! two that fits in a `usize`.
//!
//! Because of this, the capacity is *forced* up to the next power of two
//! at creation, even if that wastes some memory. At 44.1 kHz a 5 second
//! delay needs 220 500 samples, which rounds up to 262 144 (about 1 MB
//! per channel as `f32`).

use crate::dsp::clamp::MAX_DELAY_SECONDS;
use crate::error::{Error, Result};

/// A power-of-two-length sample store with bitmask wraparound.
///
/// Unlike a classic delay line, the buffer does not track a write head of
/// its own. Callers address it with absolute positions and the buffer wraps
/// them. This lets both channels of a stereo delay share one write cursor.
#[derive(Debug)]
pub struct CircularBuffer {
    /// The stored samples. Length is always a power of two.
    samples: Box<[f32]>,

    /// `samples.len() - 1`, cached so that indexing is a single AND.
    mask: usize,
}

impl CircularBuffer {
    /// Allocate a zeroed buffer of exactly `capacity` samples.
    ///
    /// Use [`for_sample_rate()`](Self::for_sample_rate) to derive a
    /// capacity from a sample rate.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if `capacity` is not a power of two
    ///   (zero included). The mask trick would silently misaddress such a
    ///   buffer.
    /// - [`Error::AllocationFailure`] if the allocator cannot provide the
    ///   memory.
    pub fn new(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(Error::InvalidCapacity { capacity });
        }

        // `vec![0.0; n]` aborts the process on allocation failure. A plugin
        // must never take the host down with it, so reserve fallibly first.
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(capacity)
            .map_err(|source| Error::AllocationFailure {
                samples: capacity,
                source: Some(source),
            })?;
        samples.resize(capacity, 0.0);

        Ok(Self {
            samples: samples.into_boxed_slice(),
            mask: capacity - 1,
        })
    }

    /// Allocate a buffer large enough to hold [`MAX_DELAY_SECONDS`] of
    /// audio at `sample_rate`.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`] if the rate is so high that no `usize`
    /// power of two is large enough, or if the allocation itself fails.
    pub fn for_sample_rate(sample_rate: f32) -> Result<Self> {
        let capacity =
            capacity_for_sample_rate(sample_rate).ok_or(Error::AllocationFailure {
                samples: minimum_samples(sample_rate),
                source: None,
            })?;
        Self::new(capacity)
    }

    /// Wrap an absolute position into a slot index.
    #[inline]
    pub fn index_of(&self, position: usize) -> usize {
        position & self.mask
    }

    /// Read the sample stored at `position` (wrapped).
    #[inline]
    pub fn read(&self, position: usize) -> f32 {
        self.samples[self.index_of(position)]
    }

    /// Store `value` at `position` (wrapped).
    #[inline]
    pub fn write(&mut self, position: usize, value: f32) {
        let index = self.index_of(position);
        self.samples[index] = value;
    }

    /// Zero every stored sample. Never allocates.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
    }

    /// Number of samples the buffer holds.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; the smallest possible buffer holds one sample.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The smallest power of two that can hold [`MAX_DELAY_SECONDS`] of audio,
/// or `None` if that power of two does not fit in a `usize`.
///
/// The product is truncated to whole samples before rounding up, and a
/// product of zero (or a nonsensical negative/NaN rate, which `as usize`
/// saturates to zero) yields a single-sample buffer.
///
/// ```text
/// 44100 Hz × 5 s = 220500 → 262144
/// 48000 Hz × 5 s = 240000 → 262144
/// 96000 Hz × 5 s = 480000 → 524288
/// ```
pub fn capacity_for_sample_rate(sample_rate: f32) -> Option<usize> {
    minimum_samples(sample_rate).checked_next_power_of_two()
}

/// `floor(sample_rate × MAX_DELAY_SECONDS)`, saturating at both ends.
fn minimum_samples(sample_rate: f32) -> usize {
    (sample_rate * MAX_DELAY_SECONDS) as usize
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
