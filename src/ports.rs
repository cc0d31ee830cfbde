//! # Ports
//!
//! The delay exposes eight fixed ports: four control inputs (delay time and
//! dry/wet per channel) and four audio ports (input and output per
//! channel). A host binds each port to memory it owns before asking the
//! engine to process a block.
//!
//! ## Borrowed bindings
//!
//! Port memory belongs to the host, and audio buffers are only valid for
//! the duration of a single block. Instead of storing raw pointers inside
//! the delay instance, bindings live in a separate [`Ports`] value that
//! borrows the host's memory for a lifetime `'a`. The instance only sees
//! the bindings while `run()` is executing, so it can never hold on to a
//! buffer after the host has moved on.
//!
//! ```text
//!  host memory          Ports<'a>                 DelayLineInstance
//! ┌────────────┐      ┌──────────────┐   run()   ┌──────────────────┐
//! │ delay_l: f32├─────►│ delay[0]     │──────────►│ buffers, cursor  │
//! │ in_l: [f32] ├─────►│ input[0]     │           └──────────────────┘
//! │ out_l:[f32] ├─────►│ output[0]    │
//! └────────────┘      └──────────────┘
//! ```

use nih_plug::nih_warn;

use crate::dsp::clamp::MAX_DELAY_SECONDS;
use crate::dsp::delay::Controls;

/// Identifies one of the eight ports. The discriminant is the port index a
/// host uses when binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PortId {
    DelayLeft = 0,
    DelayRight = 1,
    DryWetLeft = 2,
    DryWetRight = 3,
    InputLeft = 4,
    InputRight = 5,
    OutputLeft = 6,
    OutputRight = 7,
}

impl PortId {
    /// All ports, in index order.
    pub const ALL: [PortId; 8] = [
        PortId::DelayLeft,
        PortId::DelayRight,
        PortId::DryWetLeft,
        PortId::DryWetRight,
        PortId::InputLeft,
        PortId::InputRight,
        PortId::OutputLeft,
        PortId::OutputRight,
    ];

    /// Look up a port by index. Returns `None` for anything past the
    /// eighth port.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Static metadata for this port.
    pub fn info(self) -> &'static PortInfo {
        &PORTS[self.index()]
    }
}

/// What kind of data a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// A single scalar read once per block.
    ControlInput,
    /// A block of samples read by the engine.
    AudioInput,
    /// A block of samples written by the engine.
    AudioOutput,
}

/// How a host should pick the initial value of a control port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// Exactly `1.0`.
    One,
    /// Halfway between the lower and upper bound.
    Middle,
}

/// The advertised range of a control port.
///
/// Hosts should stay inside this range, but the engine clamps anyway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeHint {
    pub lower: f32,
    pub upper: f32,
    pub default: DefaultValue,
}

impl RangeHint {
    /// Resolve [`DefaultValue`] to a concrete number.
    pub fn default_value(&self) -> f32 {
        match self.default {
            DefaultValue::One => 1.0,
            DefaultValue::Middle => (self.lower + self.upper) * 0.5,
        }
    }
}

/// Static description of one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortInfo {
    pub id: PortId,
    pub name: &'static str,
    pub kind: PortKind,
    /// Only control ports carry a range.
    pub hint: Option<RangeHint>,
}

/// Range of both delay-time ports, in seconds.
pub const DELAY_HINT: RangeHint = RangeHint {
    lower: 0.0,
    upper: MAX_DELAY_SECONDS,
    default: DefaultValue::One,
};

/// Range of both dry/wet ports.
pub const DRY_WET_HINT: RangeHint = RangeHint {
    lower: 0.0,
    upper: 1.0,
    default: DefaultValue::Middle,
};

/// The port table, indexed by [`PortId`].
pub static PORTS: [PortInfo; 8] = [
    PortInfo {
        id: PortId::DelayLeft,
        name: "Delay (Seconds) (Left)",
        kind: PortKind::ControlInput,
        hint: Some(DELAY_HINT),
    },
    PortInfo {
        id: PortId::DelayRight,
        name: "Delay (Seconds) (Right)",
        kind: PortKind::ControlInput,
        hint: Some(DELAY_HINT),
    },
    PortInfo {
        id: PortId::DryWetLeft,
        name: "Dry/Wet Balance (Left)",
        kind: PortKind::ControlInput,
        hint: Some(DRY_WET_HINT),
    },
    PortInfo {
        id: PortId::DryWetRight,
        name: "Dry/Wet Balance (Right)",
        kind: PortKind::ControlInput,
        hint: Some(DRY_WET_HINT),
    },
    PortInfo {
        id: PortId::InputLeft,
        name: "Input (Left)",
        kind: PortKind::AudioInput,
        hint: None,
    },
    PortInfo {
        id: PortId::InputRight,
        name: "Input (Right)",
        kind: PortKind::AudioInput,
        hint: None,
    },
    PortInfo {
        id: PortId::OutputLeft,
        name: "Output (Left)",
        kind: PortKind::AudioOutput,
        hint: None,
    },
    PortInfo {
        id: PortId::OutputRight,
        name: "Output (Right)",
        kind: PortKind::AudioOutput,
        hint: None,
    },
];

/// A borrowed piece of host memory, typed by the role it plays.
#[derive(Debug)]
pub enum PortConnection<'a> {
    Control(&'a f32),
    AudioInput(&'a [f32]),
    AudioOutput(&'a mut [f32]),
}

impl PortConnection<'_> {
    pub fn kind(&self) -> PortKind {
        match self {
            PortConnection::Control(_) => PortKind::ControlInput,
            PortConnection::AudioInput(_) => PortKind::AudioInput,
            PortConnection::AudioOutput(_) => PortKind::AudioOutput,
        }
    }
}

/// The current binding of every port. Slots start out unbound (`None`).
#[derive(Debug, Default)]
pub struct Ports<'a> {
    delay: [Option<&'a f32>; 2],
    dry_wet: [Option<&'a f32>; 2],
    input: [Option<&'a [f32]>; 2],
    output: [Option<&'a mut [f32]>; 2],
}

impl<'a> Ports<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the port at `index`, replacing any previous binding.
    ///
    /// Unknown indices are ignored, as are connections whose kind does not
    /// match the port. Neither is an error: hosts rebind freely, and a
    /// misbinding simply leaves the slot as it was.
    pub fn connect(&mut self, index: usize, connection: PortConnection<'a>) {
        if let Some(port) = PortId::from_index(index) {
            self.connect_port(port, connection);
        }
    }

    /// Bind a known port, replacing any previous binding.
    ///
    /// A connection of the wrong kind is dropped. Debug builds log a
    /// warning about it.
    pub fn connect_port(&mut self, port: PortId, connection: PortConnection<'a>) {
        match (port, connection) {
            (PortId::DelayLeft, PortConnection::Control(value)) => self.delay[0] = Some(value),
            (PortId::DelayRight, PortConnection::Control(value)) => self.delay[1] = Some(value),
            (PortId::DryWetLeft, PortConnection::Control(value)) => self.dry_wet[0] = Some(value),
            (PortId::DryWetRight, PortConnection::Control(value)) => self.dry_wet[1] = Some(value),
            (PortId::InputLeft, PortConnection::AudioInput(data)) => self.input[0] = Some(data),
            (PortId::InputRight, PortConnection::AudioInput(data)) => self.input[1] = Some(data),
            (PortId::OutputLeft, PortConnection::AudioOutput(data)) => self.output[0] = Some(data),
            (PortId::OutputRight, PortConnection::AudioOutput(data)) => self.output[1] = Some(data),
            (port, connection) => {
                if cfg!(debug_assertions) {
                    nih_warn!(
                        "{:?} connection ignored for {:?} port {:?}",
                        connection.kind(),
                        port.info().kind,
                        port
                    );
                }
            }
        }
    }

    /// Whether the given port currently has a binding.
    pub fn is_bound(&self, port: PortId) -> bool {
        match port {
            PortId::DelayLeft => self.delay[0].is_some(),
            PortId::DelayRight => self.delay[1].is_some(),
            PortId::DryWetLeft => self.dry_wet[0].is_some(),
            PortId::DryWetRight => self.dry_wet[1].is_some(),
            PortId::InputLeft => self.input[0].is_some(),
            PortId::InputRight => self.input[1].is_some(),
            PortId::OutputLeft => self.output[0].is_some(),
            PortId::OutputRight => self.output[1].is_some(),
        }
    }

    /// Snapshot the control values and borrow the audio buffers for one
    /// block. Returns `None` if any port is unbound.
    pub(crate) fn bind(&mut self) -> Option<(Controls, [&[f32]; 2], [&mut [f32]; 2])> {
        let [Some(delay_left), Some(delay_right)] = self.delay else {
            return None;
        };
        let [Some(wet_left), Some(wet_right)] = self.dry_wet else {
            return None;
        };
        let [Some(input_left), Some(input_right)] = self.input else {
            return None;
        };
        let [Some(output_left), Some(output_right)] = &mut self.output else {
            return None;
        };

        let controls = Controls {
            delay_seconds: [*delay_left, *delay_right],
            wet: [*wet_left, *wet_right],
        };

        Some((
            controls,
            [input_left, input_right],
            [&mut **output_left, &mut **output_right],
        ))
    }
}
