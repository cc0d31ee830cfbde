//! # Stereo Delay Line: A Five-Second Stereo Delay Plugin
//!
//! A plain stereo delay with independent delay time and dry/wet mix per
//! channel, no feedback, and a hard ceiling of five seconds. Built with
//! [nih-plug](https://github.com/robbert-vdh/nih-plug), so the same code
//! ships as CLAP, VST3, and (through clap-wrapper) AUv2.
//!
//! ## Signal Flow
//!
//! ```text
//! Input L ──┬──────────────────────────────── × (1 - wet L) ──┐
//!           │                                                 │
//!           └──► [Ring Buffer L] ── delay L ─── × wet L ─────►(+)──► Output L
//!
//! Input R ──┬──────────────────────────────── × (1 - wet R) ──┐
//!           │                                                 │
//!           └──► [Ring Buffer R] ── delay R ─── × wet R ─────►(+)──► Output R
//! ```
//!
//! ## Layout
//!
//! - [`dsp`]: the delay engine itself (clamping, ring buffers, the
//!   per-block loop). It knows nothing about nih-plug.
//! - [`ports`]: the eight fixed ports and the borrowed bindings the engine
//!   reads from and writes to.
//! - [`descriptor`]: the plugin's static identity.
//! - This file: the adapter that lets a DAW drive the engine.

pub mod descriptor;
pub mod dsp;
pub mod error;
mod params;
pub mod ports;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::delay::{Controls, DelayLineInstance};
use nih_plug::prelude::*;
use params::DelayParams;
use ports::{PortConnection, PortId, Ports};

/// The plugin as the DAW sees it.
///
/// The DAW never touches the delay engine directly. It calls
/// `initialize()`, `reset()`, and `process()`, and this struct translates
/// those into the engine's own lifecycle:
///
/// | DAW call       | Engine call                            |
/// |----------------|----------------------------------------|
/// | `initialize()` | `instantiate()` + `activate()`         |
/// | `reset()`      | `activate()`                           |
/// | `process()`    | bind ports + `run()`                   |
/// | drop           | `cleanup()`                            |
struct StereoDelay {
    /// Shared with the host, which writes automation into it from other
    /// threads.
    params: Arc<DelayParams>,

    /// `None` until the host tells us the sample rate.
    instance: Option<DelayLineInstance>,

    /// Copies of the input channels for the current block.
    ///
    /// nih-plug processes in place: input and output are the same slice.
    /// The engine borrows input immutably and output mutably, so the input
    /// is copied aside first. Sized to the host's maximum block length in
    /// `initialize()`, so `process()` never allocates.
    scratch: [Vec<f32>; 2],
}

impl Default for StereoDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(DelayParams::default()),
            instance: None,
            scratch: [Vec::new(), Vec::new()],
        }
    }
}

impl Plugin for StereoDelay {
    const NAME: &'static str = descriptor::NAME;
    const VENDOR: &'static str = descriptor::MAKER;
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The engine is hard-wired to two channels, so stereo is the only
    // layout we offer.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Controls are read once per block. Splitting blocks at automation
    // points would only make the block boundaries land in different places.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate everything the audio thread will need.
    ///
    /// Returning `false` tells the host this configuration can't be used.
    /// The only way that happens here is running out of memory.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        // Replacing the old instance drops it, which is its cleanup.
        let mut instance = match DelayLineInstance::instantiate(buffer_config.sample_rate) {
            Ok(instance) => instance,
            Err(err) => {
                nih_error!("could not create the delay: {}", err);
                self.instance = None;
                return false;
            }
        };
        instance.activate();
        self.instance = Some(instance);

        if let Some(desc) = descriptor::descriptor(0) {
            nih_log!(
                "{} (id {}) ready with {} ports",
                desc.label,
                desc.unique_id,
                desc.ports.len()
            );
        }

        let max_block = buffer_config.max_buffer_size as usize;
        for scratch in &mut self.scratch {
            scratch.clear();
            scratch.resize(max_block, 0.0);
        }

        true
    }

    /// Called when playback stops or the plugin is bypassed. Clearing the
    /// history here keeps old echoes out of the next take.
    fn reset(&mut self) {
        if let Some(instance) = &mut self.instance {
            instance.activate();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let Some(instance) = &mut self.instance else {
            return ProcessStatus::Normal;
        };

        let block_size = buffer.samples();
        let controls = self.params.controls();

        let [scratch_left, scratch_right] = &mut self.scratch;
        let [out_left, out_right] = buffer.as_slice() else {
            nih_debug_assert_failure!("expected a stereo buffer");
            return ProcessStatus::Normal;
        };

        // Hosts are not supposed to exceed `max_buffer_size`, but a short
        // scratch buffer must not turn into a panic on the audio thread.
        let block_size = block_size.min(scratch_left.len());
        scratch_left[..block_size].copy_from_slice(&out_left[..block_size]);
        scratch_right[..block_size].copy_from_slice(&out_right[..block_size]);

        let mut ports = Ports::new();
        ports.connect_port(
            PortId::DelayLeft,
            PortConnection::Control(&controls.delay_seconds[0]),
        );
        ports.connect_port(
            PortId::DelayRight,
            PortConnection::Control(&controls.delay_seconds[1]),
        );
        ports.connect_port(PortId::DryWetLeft, PortConnection::Control(&controls.wet[0]));
        ports.connect_port(PortId::DryWetRight, PortConnection::Control(&controls.wet[1]));
        ports.connect_port(
            PortId::InputLeft,
            PortConnection::AudioInput(&scratch_left[..block_size]),
        );
        ports.connect_port(
            PortId::InputRight,
            PortConnection::AudioInput(&scratch_right[..block_size]),
        );
        ports.connect_port(
            PortId::OutputLeft,
            PortConnection::AudioOutput(&mut out_left[..block_size]),
        );
        ports.connect_port(
            PortId::OutputRight,
            PortConnection::AudioOutput(&mut out_right[..block_size]),
        );

        instance.run(&mut ports, block_size);

        ProcessStatus::Tail(tail_samples(instance, &controls))
    }
}

/// How long the host should keep calling `process()` after the input goes
/// silent. With no feedback the effect rings out after a single echo, so
/// the tail is just the longer of the two delays.
fn tail_samples(instance: &DelayLineInstance, controls: &Controls) -> u32 {
    let longest = controls
        .delay_seconds
        .iter()
        .map(|&seconds| instance.delay_samples(seconds))
        .max()
        .unwrap_or(0);
    longest as u32
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for StereoDelay {
    const CLAP_ID: &'static str = "org.ladspa.delay-5s-stereo";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A five-second stereo delay with per-channel dry/wet and no feedback");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for StereoDelay {
    // 16 ASCII bytes, unique to this plugin.
    const VST3_CLASS_ID: [u8; 16] = *b"StereoDelay5s399";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.
// clap_wrapper re-exports the CLAP entry point as an AUv2 factory so
// Logic Pro can load the plugin as an Audio Unit.

nih_export_clap!(StereoDelay);
nih_export_vst3!(StereoDelay);
clap_wrapper::export_auv2!();
