//! Shared types for k8s-event
//!
//! This crate contains the severity model, the level mask and the rate
//! settings used across the k8s-event crates.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde::ser::Serializer;

/// Name of the plugin as it appears in a Corefile
pub const PLUGIN_NAME: &str = "k8s_event";

/// Component reported as the event source
pub const COMPONENT_NAME: &str = "CoreDNS";

// ============================================================================
// Severity
// ============================================================================

/// Log severity forwarded by the bridge
///
/// The discriminant is the bit position inside a [`LevelMask`]. It follows the
/// plugin's historical numbering, which is alphabetical rather than by
/// importance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug = 0,
    Error = 1,
    Fatal = 2,
    Info = 3,
    Warning = 4,
}

impl Severity {
    /// All severities, in bit order
    pub const ALL: [Severity; 5] = [
        Self::Debug,
        Self::Error,
        Self::Fatal,
        Self::Info,
        Self::Warning,
    ];

    /// Bit position inside a level mask
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// Lowercase directive name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }

    /// Event reason attached to events of this severity
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Debug => "CoreDNSDebug",
            Self::Error => "CoreDNSError",
            Self::Fatal => "CoreDNSFatal",
            Self::Info => "CoreDNSInfo",
            Self::Warning => "CoreDNSWarning",
        }
    }

    /// Event type attached to events of this severity
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Debug | Self::Info => EventType::Normal,
            Self::Warning | Self::Error | Self::Fatal => EventType::Warning,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a severity name is not recognised
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid Level: {0}")]
pub struct InvalidLevel(pub String);

impl FromStr for Severity {
    type Err = InvalidLevel;

    /// Parse a severity name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            _ => Err(InvalidLevel(s.to_string())),
        }
    }
}

/// Kubernetes event type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Normal,
    Warning,
}

// ============================================================================
// Level Mask
// ============================================================================

/// Set of severities that get forwarded as events
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelMask(u32);

impl LevelMask {
    /// Mask with no severity enabled
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask with every severity enabled
    pub const fn all() -> Self {
        Self(0b1_1111)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Return a copy of this mask with `severity` enabled
    pub const fn with(self, severity: Severity) -> Self {
        Self(self.0 | 1 << severity.bit())
    }

    /// Check whether `severity` is forwarded
    pub const fn allows(self, severity: Severity) -> bool {
        self.0 & (1 << severity.bit()) != 0
    }

    /// Iterate over the enabled severities in bit order
    pub fn iter(self) -> impl Iterator<Item = Severity> {
        Severity::ALL.into_iter().filter(move |s| self.allows(*s))
    }
}

impl Default for LevelMask {
    fn default() -> Self {
        Self::empty().with(Severity::Error).with(Severity::Warning)
    }
}

impl FromIterator<Severity> for LevelMask {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for LevelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for LevelMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

// ============================================================================
// Rate Settings
// ============================================================================

pub const DEFAULT_RATE_QPS: f32 = 1. / 300.;
pub const MIN_RATE_QPS: f64 = 1. / 3600.;
pub const MAX_RATE_QPS: f64 = 1.;

pub const DEFAULT_RATE_BURST: u32 = 25;
pub const MIN_RATE_BURST: u32 = 1;
pub const MAX_RATE_BURST: u32 = 256;

pub const DEFAULT_RATE_CACHE_SIZE: usize = 4096;
pub const MIN_RATE_CACHE_SIZE: usize = 1;
pub const MAX_RATE_CACHE_SIZE: usize = 65535;

/// Rate limiting parameters handed to the event broadcaster
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RateSettings {
    /// Sustained events per second per source object
    pub qps: f32,

    /// Bucket size for bursts of events
    pub burst: u32,

    /// Number of source objects tracked by the spam filter
    pub cache_size: usize,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            qps: DEFAULT_RATE_QPS,
            burst: DEFAULT_RATE_BURST,
            cache_size: DEFAULT_RATE_CACHE_SIZE,
        }
    }
}

/// Settings produced by parsing a `k8s_event` stanza
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Settings {
    /// Severities forwarded as events
    pub levels: LevelMask,

    /// Rate limiting parameters
    pub rate: RateSettings,

    /// Whether a `rate` directive was present
    pub rate_configured: bool,
}
