//! # Plugin Descriptor
//!
//! The static identity of the plugin: who made it, what it is called, and
//! which ports it has. Hosts that enumerate plugins by index ask for
//! descriptor 0; there is no descriptor 1.
//!
//! The table is a `static`, built at compile time. There is nothing to
//! allocate when the library loads and nothing to free when it unloads.

use crate::ports::{PortInfo, PORTS};

/// Capability flags a plugin can advertise to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties(u32);

impl Properties {
    /// `run()` never allocates, blocks, or does I/O, and its cost is
    /// bounded by the block size.
    pub const HARD_RT_CAPABLE: Properties = Properties(0x4);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Properties) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Everything a host needs to know about the plugin before instantiating
/// it.
#[derive(Debug)]
pub struct PluginDescriptor {
    pub unique_id: u32,
    /// Short, whitespace-free identifier.
    pub label: &'static str,
    pub properties: Properties,
    pub name: &'static str,
    pub maker: &'static str,
    pub copyright: &'static str,
    pub ports: &'static [PortInfo],
}

/// Display name, shared with the plugin adapter.
pub const NAME: &str = "Simple Stereo Delay Line";
pub const MAKER: &str = "Richard Furse (LADSPA example plugins)";

static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    unique_id: 399,
    label: "delay_5s_stereo",
    properties: Properties::HARD_RT_CAPABLE,
    name: NAME,
    maker: MAKER,
    copyright: "None",
    ports: &PORTS,
};

/// Look up a descriptor by index. Only index 0 exists.
///
/// The plugin adapter reads its identity from here, and embedders of the
/// library can enumerate it the same way a plugin host would.
pub fn descriptor(index: usize) -> Option<&'static PluginDescriptor> {
    match index {
        0 => Some(&DESCRIPTOR),
        _ => None,
    }
}
