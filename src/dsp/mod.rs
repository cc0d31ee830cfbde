//! # DSP (Digital Signal Processing) Core
//!
//! The delay engine, built bottom-up:
//!
//! - **`clamp`**: range limits for the control values.
//!
//! - **`circular_buffer`**: a power-of-two ring store with bitmask
//!   wraparound. One per channel.
//!
//! - **`delay`**: the stereo delay instance that owns two circular buffers
//!   and runs the per-block read/mix/write loop.

pub mod circular_buffer;
pub mod clamp;
pub mod delay;
