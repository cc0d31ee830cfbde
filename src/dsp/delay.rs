//! # Stereo Delay Line
//!
//! Two channels of pure delay with a per-channel dry/wet mix and no
//! feedback:
//!
//! ```text
//! in ──┬───────────────────────── × dry ──┐
//!      │                                  │
//!      └─► [ring buffer] ── d samples ── × wet ─►(+)──► out
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! instantiate ──► activate ──► run ──► run ──► ... ──► cleanup
//!                    ▲                  │
//!                    └──────────────────┘  (stop / restart)
//! ```
//!
//! All memory is allocated in [`DelayLineInstance::instantiate()`]. After
//! that, neither [`activate()`](DelayLineInstance::activate) nor
//! [`run()`](DelayLineInstance::run) allocate, lock, or perform I/O, so
//! both are safe to call from the audio thread.
//!
//! ## Block processing
//!
//! Control values are sampled once at the start of each block. A delay
//! time of `t` seconds becomes `floor(t × sample_rate)` samples, and the
//! read head for the block starts that many samples behind the shared write
//! cursor:
//!
//! ```text
//! read_origin = write_cursor + buffer_len - delay_samples
//! ```
//!
//! Adding `buffer_len` keeps the subtraction from going negative; the
//! buffer's bitmask takes care of the rest. For every sample the delayed
//! value is read *before* the new input is written to the same slot.
//!
//! ## Zero delay reads a full cycle back
//!
//! With `delay_samples = 0` the read origin lands on the write cursor
//! itself. Because reads happen before writes, the value read is the one
//! stored in that slot `buffer_len` samples ago, not the current input.
//! At 44.1 kHz that is an echo about 5.9 seconds late. This matches the
//! behavior hosts have always seen from this plugin and is kept as is.

use nih_plug::{nih_debug_assert, nih_log, nih_warn};

use super::circular_buffer::CircularBuffer;
use super::clamp::{clamp_delay, clamp_unit};
use crate::error::Result;
use crate::ports::Ports;

/// Raw control port values for one block, before clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    /// Delay time in seconds, `[left, right]`.
    pub delay_seconds: [f32; 2],
    /// Wet ratio, `[left, right]`. `0` is fully dry, `1` fully wet.
    pub wet: [f32; 2],
}

/// Per-channel mixing state derived from [`Controls`] at a block boundary.
#[derive(Debug, Clone, Copy)]
struct ChannelMix {
    read_origin: usize,
    wet: f32,
    dry: f32,
}

/// One instance of the stereo delay.
///
/// Port bindings are deliberately *not* stored here; see
/// [`Ports`](crate::ports::Ports).
#[derive(Debug)]
pub struct DelayLineInstance {
    sample_rate: f32,

    /// `[left, right]` history, both the same power-of-two length.
    buffers: [CircularBuffer; 2],

    /// Where the next input sample goes, shared by both channels.
    /// Always in `[0, buffer_len)`.
    write_cursor: usize,
}

impl DelayLineInstance {
    /// Create an instance for the given sample rate, allocating both
    /// channel buffers up front.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`](crate::error::Error::AllocationFailure)
    /// if either buffer cannot be allocated, including when the sample rate
    /// is so high that five seconds of audio would not fit in a `usize`.
    /// Nothing is leaked; whichever buffer did get allocated is dropped.
    pub fn instantiate(sample_rate: f32) -> Result<Self> {
        nih_debug_assert!(sample_rate > 0.0, "sample rate must be positive");

        let buffers = [
            CircularBuffer::for_sample_rate(sample_rate)?,
            CircularBuffer::for_sample_rate(sample_rate)?,
        ];

        nih_log!(
            "stereo delay instantiated at {} Hz with {} samples per channel",
            sample_rate,
            buffers[0].len()
        );

        Ok(Self {
            sample_rate,
            buffers,
            write_cursor: 0,
        })
    }

    /// Silence both buffers and rewind the write cursor.
    ///
    /// Safe to call any number of times, including between blocks, so a
    /// host can stop and restart playback without stale echoes leaking in.
    pub fn activate(&mut self) {
        for buffer in &mut self.buffers {
            buffer.reset();
        }
        self.write_cursor = 0;
    }

    /// Release the instance and its buffers.
    ///
    /// Taking `self` by value means nothing can touch the instance
    /// afterwards. Dropping it has the same effect.
    pub fn cleanup(self) {
        drop(self);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Length of each channel buffer in samples.
    pub fn buffer_len(&self) -> usize {
        self.buffers[0].len()
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Convert a delay time to whole samples, clamping first and truncating
    /// toward zero.
    #[inline]
    pub fn delay_samples(&self, seconds: f32) -> usize {
        (clamp_delay(seconds) * self.sample_rate) as usize
    }

    /// Process one block using the host's port bindings.
    ///
    /// If any port is unbound the block is skipped entirely: no output is
    /// written and the cursor stays put. Audio buffers shorter than
    /// `block_size` shrink the block to the shortest one. Both are host
    /// mistakes, so debug builds log a warning, but neither ever panics.
    pub fn run(&mut self, ports: &mut Ports<'_>, block_size: usize) {
        let Some((controls, input, output)) = ports.bind() else {
            if cfg!(debug_assertions) {
                nih_warn!("run() called with unbound ports, skipping the block");
            }
            return;
        };

        let available = input
            .iter()
            .map(|channel| channel.len())
            .chain(output.iter().map(|channel| channel.len()))
            .min()
            .unwrap_or(0);
        if cfg!(debug_assertions) && available < block_size {
            nih_warn!(
                "audio ports hold {} samples but the block is {}",
                available,
                block_size
            );
        }

        self.process_block(&controls, input, output, block_size.min(available));
    }

    /// Process one block from slices.
    ///
    /// The block size is the length of the shortest slice.
    pub fn process(&mut self, controls: &Controls, input: [&[f32]; 2], output: [&mut [f32]; 2]) {
        let block_size = input
            .iter()
            .map(|channel| channel.len())
            .chain(output.iter().map(|channel| channel.len()))
            .min()
            .unwrap_or(0);

        self.process_block(controls, input, output, block_size);
    }

    fn channel_mix(&self, controls: &Controls, channel: usize) -> ChannelMix {
        let delay = self.delay_samples(controls.delay_seconds[channel]);
        let wet = clamp_unit(controls.wet[channel]);

        ChannelMix {
            read_origin: self
                .write_cursor
                .wrapping_add(self.buffer_len())
                .wrapping_sub(delay),
            wet,
            dry: 1.0 - wet,
        }
    }

    /// The core loop. Callers guarantee every slice holds `block_size`
    /// samples.
    fn process_block(
        &mut self,
        controls: &Controls,
        input: [&[f32]; 2],
        output: [&mut [f32]; 2],
        block_size: usize,
    ) {
        if block_size == 0 {
            return;
        }

        let mixes = [self.channel_mix(controls, 0), self.channel_mix(controls, 1)];
        let cursor = self.write_cursor;

        // The channels share nothing but the cursor, so each one can run its
        // whole block independently.
        for (((buffer, mix), input), output) in self
            .buffers
            .iter_mut()
            .zip(mixes)
            .zip(input)
            .zip(output)
        {
            for (i, (&sample, out)) in input[..block_size]
                .iter()
                .zip(&mut output[..block_size])
                .enumerate()
            {
                let delayed = buffer.read(mix.read_origin.wrapping_add(i));
                *out = mix.dry * sample + mix.wet * delayed;
                buffer.write(cursor.wrapping_add(i), sample);
            }
        }

        self.write_cursor = self.buffers[0].index_of(cursor.wrapping_add(block_size));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ports::{PortConnection, PortId};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn controls(delay_seconds: f32, wet: f32) -> Controls {
        Controls {
            delay_seconds: [delay_seconds; 2],
            wet: [wet; 2],
        }
    }

    /// Run `input` through the delay in blocks of `block`, returning both
    /// output channels.
    fn run_in_blocks(
        delay: &mut DelayLineInstance,
        controls: &Controls,
        input: [&[f32]; 2],
        block: usize,
    ) -> [Vec<f32>; 2] {
        let mut out = [vec![0.0; input[0].len()], vec![0.0; input[1].len()]];
        let [out_left, out_right] = &mut out;

        for ((in_left, in_right), (out_left, out_right)) in input[0]
            .chunks(block)
            .zip(input[1].chunks(block))
            .zip(out_left.chunks_mut(block).zip(out_right.chunks_mut(block)))
        {
            delay.process(controls, [in_left, in_right], [out_left, out_right]);
        }

        out
    }

    fn ramp(len: usize) -> Vec<f32> {
        (1..=len).map(|n| n as f32).collect()
    }

    #[test]
    fn test_instantiate_sizes_buffers() {
        let delay = DelayLineInstance::instantiate(44100.0).unwrap();
        assert_eq!(delay.buffer_len(), 262_144);
        assert_eq!(delay.sample_rate(), 44100.0);
        assert_eq!(delay.write_cursor(), 0);
    }

    /// A rate whose five-second history cannot be addressed fails cleanly.
    #[test]
    fn test_instantiate_reports_capacity_overflow() {
        let err = DelayLineInstance::instantiate(1.0e19).unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationFailure {
                samples: usize::MAX,
                source: None
            }
        ));
    }

    /// 1e18 Hz × 5 s rounds up to 2^63 samples per channel, which no
    /// allocator can provide.
    #[test]
    fn test_instantiate_reports_allocation_failure() {
        let err = DelayLineInstance::instantiate(1.0e18).unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationFailure {
                samples,
                source: Some(_)
            } if samples == 1usize << 63
        ));
        assert!(err.to_string().starts_with("failed to allocate a delay buffer"));
    }

    #[test]
    fn test_delay_samples_truncates_and_clamps() {
        let delay = DelayLineInstance::instantiate(8000.0).unwrap();
        assert_eq!(delay.delay_samples(1.0), 8000);
        assert_eq!(delay.delay_samples(0.00019), 1); // 1.52 samples
        assert_eq!(delay.delay_samples(-3.0), 0);
        assert_eq!(delay.delay_samples(10.0), 40_000);
    }

    /// Fully dry output is the input, bit for bit.
    #[test]
    fn test_dry_is_passthrough() {
        let mut delay = DelayLineInstance::instantiate(1000.0).unwrap();
        delay.activate();

        let left = ramp(3000);
        let right: Vec<f32> = left.iter().map(|x| -x).collect();
        let out = run_in_blocks(&mut delay, &controls(0.25, 0.0), [&left, &right], 128);

        assert_eq!(out[0], left);
        assert_eq!(out[1], right);
    }

    /// Fully wet output is the input shifted by the delay.
    #[test]
    fn test_wet_is_pure_delay() {
        let mut delay = DelayLineInstance::instantiate(1000.0).unwrap();
        delay.activate();

        let input = ramp(2000);
        let c = Controls {
            delay_seconds: [0.1, 0.25],
            wet: [1.0, 1.0],
        };
        let out = run_in_blocks(&mut delay, &c, [&input, &input], 64);

        for n in 0..input.len() {
            let expected_left = if n >= 100 { input[n - 100] } else { 0.0 };
            let expected_right = if n >= 250 { input[n - 250] } else { 0.0 };
            assert_eq!(out[0][n], expected_left, "left sample {n}");
            assert_eq!(out[1][n], expected_right, "right sample {n}");
        }
    }

    #[test]
    fn test_partial_mix() {
        let mut delay = DelayLineInstance::instantiate(100.0).unwrap();
        delay.activate();

        let input = ramp(64);
        let out = run_in_blocks(&mut delay, &controls(0.1, 0.25), [&input, &input], 16);

        for n in 10..input.len() {
            let expected = 0.75 * input[n] + 0.25 * input[n - 10];
            assert_relative_eq!(out[0][n], expected, epsilon = 1e-5);
        }
    }

    /// Out-of-range controls behave like the nearest legal value.
    #[test]
    fn test_controls_are_clamped() {
        let input = ramp(64);

        let mut clamped = DelayLineInstance::instantiate(4.0).unwrap();
        clamped.activate();
        let wild = Controls {
            delay_seconds: [99.0, -1.0],
            wet: [7.0, -2.0],
        };
        let out = run_in_blocks(&mut clamped, &wild, [&input, &input], 8);

        let mut legal = DelayLineInstance::instantiate(4.0).unwrap();
        legal.activate();
        let tame = Controls {
            delay_seconds: [5.0, 0.0],
            wet: [1.0, 0.0],
        };
        let expected = run_in_blocks(&mut legal, &tame, [&input, &input], 8);

        assert_eq!(out, expected);
        // Fully dry on the right, so the input comes straight through.
        assert_eq!(out[1], input);
    }

    /// Scenario: 8 kHz, one second of delay, fully wet, unit impulse.
    #[test]
    fn test_impulse_reappears_one_second_later() {
        const SAMPLE_RATE: f32 = 8000.0;
        const BLOCK: usize = 256;

        let mut delay = DelayLineInstance::instantiate(SAMPLE_RATE).unwrap();
        delay.activate();

        let mut input = vec![0.0; BLOCK * 40];
        input[0] = 1.0;
        let silence = vec![0.0; input.len()];
        let c = Controls {
            delay_seconds: [1.0, 1.0],
            wet: [1.0, 1.0],
        };
        let out = run_in_blocks(&mut delay, &c, [&input, &silence], BLOCK);

        for (n, &sample) in out[0].iter().enumerate() {
            let expected = if n == 8000 { 1.0 } else { 0.0 };
            assert_eq!(sample, expected, "left sample {n}");
        }
        assert!(out[1].iter().all(|&s| s == 0.0));
    }

    /// A zero delay is *not* a passthrough: it reads the value stored one
    /// full buffer cycle earlier.
    #[test]
    fn test_zero_delay_reads_one_full_cycle_back() {
        // 1 Hz × 5 s rounds up to an 8-sample buffer.
        let mut delay = DelayLineInstance::instantiate(1.0).unwrap();
        delay.activate();
        assert_eq!(delay.buffer_len(), 8);

        let input = ramp(24);
        let out = run_in_blocks(&mut delay, &controls(0.0, 1.0), [&input, &input], 3);

        for n in 0..input.len() {
            let expected = if n >= 8 { input[n - 8] } else { 0.0 };
            assert_eq!(out[0][n], expected, "sample {n}");
        }
    }

    /// The longest delay reads exactly one buffer length back when the
    /// buffer length equals the maximum delay.
    #[test]
    fn test_max_delay_at_exact_power_of_two() {
        // 1.6 Hz × 5 s = 8 samples exactly.
        let mut delay = DelayLineInstance::instantiate(1.6).unwrap();
        delay.activate();
        assert_eq!(delay.buffer_len(), 8);
        assert_eq!(delay.delay_samples(5.0), 8);

        let input = ramp(20);
        let out = run_in_blocks(&mut delay, &controls(5.0, 1.0), [&input, &input], 5);

        for n in 8..input.len() {
            assert_eq!(out[0][n], input[n - 8]);
        }
    }

    #[test]
    fn test_empty_block_is_noop() {
        let mut delay = DelayLineInstance::instantiate(100.0).unwrap();
        delay.activate();

        let input = ramp(10);
        run_in_blocks(&mut delay, &controls(0.05, 1.0), [&input, &input], 10);
        let cursor = delay.write_cursor();

        let empty: [f32; 0] = [];
        let mut left: [f32; 0] = [];
        let mut right: [f32; 0] = [];
        delay.process(&controls(0.05, 1.0), [&empty, &empty], [&mut left, &mut right]);
        assert_eq!(delay.write_cursor(), cursor);

        // History is intact: the next block still sees the earlier input.
        let zeros = [0.0f32; 5];
        let out = run_in_blocks(&mut delay, &controls(0.05, 1.0), [&zeros, &zeros], 5);
        assert_eq!(out[0], input[5..10].to_vec());
    }

    /// Activating again wipes every trace of earlier audio.
    #[test]
    fn test_activate_after_run_silences_history() {
        let mut delay = DelayLineInstance::instantiate(100.0).unwrap();
        delay.activate();

        let input = vec![0.5; 700];
        run_in_blocks(&mut delay, &controls(0.3, 0.5), [&input, &input], 50);
        assert_ne!(delay.write_cursor(), 0);

        delay.activate();
        assert_eq!(delay.write_cursor(), 0);

        // A zero delay reads every slot before overwriting it, and the
        // maximum delay reaches the oldest history, so between them every
        // stored sample is inspected.
        let silence = vec![0.0; delay.buffer_len()];
        for delay_seconds in [0.0, 5.0] {
            let c = controls(delay_seconds, 1.0);
            let out = run_in_blocks(&mut delay, &c, [&silence, &silence], 64);
            assert!(out[0].iter().chain(&out[1]).all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_run_through_ports() {
        let mut delay = DelayLineInstance::instantiate(10.0).unwrap();
        delay.activate();

        let delay_time = 0.2; // 2 samples
        let wet = 1.0;
        let dry = 0.0;
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut out_left = [0.0; 4];
        let mut out_right = [0.0; 4];

        {
            let mut ports = Ports::new();
            ports.connect_port(PortId::DelayLeft, PortConnection::Control(&delay_time));
            ports.connect_port(PortId::DelayRight, PortConnection::Control(&delay_time));
            ports.connect_port(PortId::DryWetLeft, PortConnection::Control(&wet));
            ports.connect_port(PortId::DryWetRight, PortConnection::Control(&dry));
            ports.connect_port(PortId::InputLeft, PortConnection::AudioInput(&input));
            ports.connect_port(PortId::InputRight, PortConnection::AudioInput(&input));
            ports.connect_port(PortId::OutputLeft, PortConnection::AudioOutput(&mut out_left));
            ports.connect_port(PortId::OutputRight, PortConnection::AudioOutput(&mut out_right));

            delay.run(&mut ports, 4);
        }

        assert_eq!(out_left, [0.0, 0.0, 1.0, 2.0]);
        assert_eq!(out_right, input);
        assert_eq!(delay.write_cursor(), 4);
    }

    /// Only `block_size` samples are touched even if the buffers are longer.
    #[test]
    fn test_run_respects_block_size() {
        let mut delay = DelayLineInstance::instantiate(10.0).unwrap();
        delay.activate();

        let zero = 0.0;
        let input = [1.0; 8];
        let mut out_left = [-1.0; 8];
        let mut out_right = [-1.0; 8];

        {
            let mut ports = Ports::new();
            ports.connect(0, PortConnection::Control(&zero));
            ports.connect(1, PortConnection::Control(&zero));
            ports.connect(2, PortConnection::Control(&zero));
            ports.connect(3, PortConnection::Control(&zero));
            ports.connect(4, PortConnection::AudioInput(&input));
            ports.connect(5, PortConnection::AudioInput(&input));
            ports.connect(6, PortConnection::AudioOutput(&mut out_left));
            ports.connect(7, PortConnection::AudioOutput(&mut out_right));

            delay.run(&mut ports, 3);
        }

        assert_eq!(out_left, [1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0]);
        assert_eq!(delay.write_cursor(), 3);
    }

    /// A block with unbound ports is skipped rather than processed.
    #[test]
    fn test_run_with_unbound_ports_is_skipped() {
        let mut delay = DelayLineInstance::instantiate(10.0).unwrap();
        delay.activate();

        let value = 0.5;
        let input = [1.0; 4];
        let mut ports = Ports::new();
        ports.connect(0, PortConnection::Control(&value));
        ports.connect(4, PortConnection::AudioInput(&input));

        delay.run(&mut ports, 4);
        assert_eq!(delay.write_cursor(), 0);
    }

    /// Audio buffers shorter than the requested block shrink the block
    /// instead of panicking, and the cursor only advances by what was
    /// actually processed.
    #[test]
    fn test_run_with_short_buffers_processes_what_fits() {
        let mut delay = DelayLineInstance::instantiate(10.0).unwrap();
        delay.activate();

        let zero = 0.0;
        let in_left = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let in_right = [7.0, 8.0, 9.0];
        let mut out_left = [-1.0; 6];
        let mut out_right = [-1.0; 5];

        {
            let mut ports = Ports::new();
            for id in [
                PortId::DelayLeft,
                PortId::DelayRight,
                PortId::DryWetLeft,
                PortId::DryWetRight,
            ] {
                ports.connect_port(id, PortConnection::Control(&zero));
            }
            ports.connect_port(PortId::InputLeft, PortConnection::AudioInput(&in_left));
            ports.connect_port(PortId::InputRight, PortConnection::AudioInput(&in_right));
            ports.connect_port(PortId::OutputLeft, PortConnection::AudioOutput(&mut out_left));
            ports.connect_port(PortId::OutputRight, PortConnection::AudioOutput(&mut out_right));

            delay.run(&mut ports, 6);
        }

        assert_eq!(out_left, [1.0, 2.0, 3.0, -1.0, -1.0, -1.0]);
        assert_eq!(out_right, [7.0, 8.0, 9.0, -1.0, -1.0]);
        assert_eq!(delay.write_cursor(), 3);
    }

    #[test]
    fn test_cleanup_consumes_instance() {
        let delay = DelayLineInstance::instantiate(48000.0).unwrap();
        delay.cleanup();
    }

    proptest! {
        /// The cursor only depends on the total number of samples, and
        /// the output only on the input, never on how the host chunked it.
        #[test]
        fn chunking_does_not_change_result(
            blocks in prop::collection::vec(0usize..40, 1..30),
            delay_seconds in 0.0f32..=5.0,
            wet in 0.0f32..=1.0,
        ) {
            let total: usize = blocks.iter().sum();
            let input = ramp(total);
            let c = controls(delay_seconds, wet);

            let mut whole = DelayLineInstance::instantiate(10.0).unwrap();
            whole.activate();
            let mut expected = vec![0.0; total];
            let mut scratch = vec![0.0; total];
            whole.process(&c, [&input, &input], [&mut expected, &mut scratch]);

            let mut chunked = DelayLineInstance::instantiate(10.0).unwrap();
            chunked.activate();
            let mut actual = vec![0.0; total];
            let mut offset = 0;
            for &block in &blocks {
                let range = offset..offset + block;
                let mut scratch = vec![0.0; block];
                chunked.process(
                    &c,
                    [&input[range.clone()], &input[range.clone()]],
                    [&mut actual[range], &mut scratch],
                );
                offset += block;
            }

            prop_assert_eq!(chunked.write_cursor(), total % chunked.buffer_len());
            prop_assert_eq!(whole.write_cursor(), chunked.write_cursor());
            prop_assert_eq!(actual, expected);
        }
    }
}
