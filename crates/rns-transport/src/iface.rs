//! Interface capability records.
//!
//! The engine never calls into an interface; it only reads the metadata
//! registered here and names interfaces by id in its emitted actions.

/// Lightweight interface identifier, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub u64);

/// Declared routing role of an interface. Parameterizes path expiry and
/// forwarding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterfaceMode {
    Full = 0,
    PointToPoint = 1,
    AccessPoint = 2,
    Roaming = 3,
    Boundary = 4,
    Gateway = 5,
}

/// Default path expiration (7 days).
pub const PATH_TIME: f64 = 60.0 * 60.0 * 24.0 * 7.0;

/// Access-point path expiration (1 day).
pub const AP_PATH_TIME: f64 = 60.0 * 60.0 * 24.0;

/// Roaming path expiration (6 hours).
pub const ROAMING_PATH_TIME: f64 = 60.0 * 60.0 * 6.0;

impl InterfaceMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(InterfaceMode::Full),
            1 => Some(InterfaceMode::PointToPoint),
            2 => Some(InterfaceMode::AccessPoint),
            3 => Some(InterfaceMode::Roaming),
            4 => Some(InterfaceMode::Boundary),
            5 => Some(InterfaceMode::Gateway),
            _ => None,
        }
    }

    /// Lifetime of paths learned over an interface in this mode.
    #[must_use]
    pub fn path_ttl(&self) -> f64 {
        match self {
            InterfaceMode::AccessPoint => AP_PATH_TIME,
            InterfaceMode::Roaming => ROAMING_PATH_TIME,
            InterfaceMode::Full
            | InterfaceMode::PointToPoint
            | InterfaceMode::Boundary
            | InterfaceMode::Gateway => PATH_TIME,
        }
    }
}

/// A registered interface: id plus the metadata the engine's rate limiter
/// and segmenter parameterize on.
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub id: InterfaceId,
    pub name: String,
    /// Nominal link-layer bandwidth in bits per second.
    pub bitrate_bps: u64,
    pub mtu: usize,
    pub mode: InterfaceMode,
    /// Whether the interface is currently usable.
    pub up: bool,
}

impl InterfaceInfo {
    pub fn new(id: InterfaceId, name: impl Into<String>, bitrate_bps: u64) -> Self {
        Self {
            id,
            name: name.into(),
            bitrate_bps,
            mtu: rns_core::constants::MTU,
            mode: InterfaceMode::Full,
            up: true,
        }
    }

    pub fn with_mode(mut self, mode: InterfaceMode) -> Self {
        self.mode = mode;
        self
    }
}
