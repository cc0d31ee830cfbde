//! # Plugin Parameters
//!
//! The four control ports, exposed to the DAW as automatable parameters.
//! Names, ranges, and defaults come straight from the port table so the
//! plugin looks the same to every host.
//!
//! ## No smoothing
//!
//! None of these parameters use a smoother. The delay engine samples its
//! controls once per block, so a large jump in delay time produces an
//! instant jump in the read position. That click is the expected sound of
//! this delay, not a bug to be papered over.

use nih_plug::prelude::*;

use crate::dsp::delay::Controls;
use crate::ports::{PortId, RangeHint, DELAY_HINT, DRY_WET_HINT};

/// Host-visible parameters, one per control port.
#[derive(Params)]
pub struct DelayParams {
    /// **Delay (Left)**: seconds until the left echo, 0 to 5.
    #[id = "delay_l"]
    pub delay_left: FloatParam,

    /// **Delay (Right)**: seconds until the right echo, 0 to 5.
    #[id = "delay_r"]
    pub delay_right: FloatParam,

    /// **Dry/Wet (Left)**: 0% is the untouched input, 100% only the echo.
    #[id = "wet_l"]
    pub wet_left: FloatParam,

    /// **Dry/Wet (Right)**
    #[id = "wet_r"]
    pub wet_right: FloatParam,
}

impl DelayParams {
    /// Snapshot the current values for one block.
    pub fn controls(&self) -> Controls {
        Controls {
            delay_seconds: [self.delay_left.value(), self.delay_right.value()],
            wet: [self.wet_left.value(), self.wet_right.value()],
        }
    }
}

fn linear_param(port: PortId, hint: RangeHint) -> FloatParam {
    FloatParam::new(
        port.info().name,
        hint.default_value(),
        FloatRange::Linear {
            min: hint.lower,
            max: hint.upper,
        },
    )
}

fn delay_param(port: PortId) -> FloatParam {
    linear_param(port, DELAY_HINT)
        .with_unit(" s")
        .with_value_to_string(formatters::v2s_f32_rounded(3))
        // One millisecond is finer than anyone can hear in an echo.
        .with_step_size(0.001)
}

fn dry_wet_param(port: PortId) -> FloatParam {
    linear_param(port, DRY_WET_HINT)
        .with_unit("%")
        // Display as percentage: 0.50 → "50.0%"
        .with_value_to_string(formatters::v2s_f32_percentage(1))
        .with_string_to_value(formatters::s2v_f32_percentage())
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            delay_left: delay_param(PortId::DelayLeft),
            delay_right: delay_param(PortId::DelayRight),
            wet_left: dry_wet_param(PortId::DryWetLeft),
            wet_right: dry_wet_param(PortId::DryWetRight),
        }
    }
}
