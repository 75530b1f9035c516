//! Topology descriptor types
//!
//! Owned mirrors of the RandR screen-resource records. Variable-length data
//! (names, identifier lists) lives in ordinary `String`/`Vec` fields so a
//! descriptor can be cloned, re-targeted and dropped as a unit.

use serde::{Deserialize, Serialize};

use super::ids::Xid;

/// Output connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
    /// Display attached
    Connected,
    /// Nothing attached
    #[default]
    Disconnected,
    /// Driver cannot tell
    Unknown,
}

/// Physical subpixel layout reported for an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubpixelOrder {
    /// Not reported
    #[default]
    Unknown,
    /// Horizontal stripes, red first
    HorizontalRgb,
    /// Horizontal stripes, blue first
    HorizontalBgr,
    /// Vertical stripes, red first
    VerticalRgb,
    /// Vertical stripes, blue first
    VerticalBgr,
    /// No subpixel structure
    None,
}

/// Rotation/reflection bit set, as in `RR_Rotate_*` / `RR_Reflect_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(pub u16);

impl Rotation {
    /// No rotation
    pub const NORMAL: Self = Self(1);
    /// Rotated by 90 degrees
    pub const LEFT: Self = Self(2);
    /// Rotated by 180 degrees
    pub const INVERTED: Self = Self(4);
    /// Rotated by 270 degrees
    pub const RIGHT: Self = Self(8);
}

impl Default for Rotation {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Mode (timing) descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfo {
    /// Mode identifier
    pub id: Xid,

    /// Horizontal resolution
    pub width: u32,
    /// Vertical resolution
    pub height: u32,

    /// Pixel clock in Hz
    #[serde(default)]
    pub dot_clock: u64,
    #[serde(default)]
    pub h_sync_start: u32,
    #[serde(default)]
    pub h_sync_end: u32,
    #[serde(default)]
    pub h_total: u32,
    #[serde(default)]
    pub h_skew: u32,
    #[serde(default)]
    pub v_sync_start: u32,
    #[serde(default)]
    pub v_sync_end: u32,
    #[serde(default)]
    pub v_total: u32,

    /// Human-readable name, usually `WxH`
    pub name: String,

    /// `RR_*` mode flags (interlace, sync polarity, ...)
    #[serde(default)]
    pub mode_flags: u64,
}

impl ModeInfo {
    /// Vertical refresh rate derived from the timing fields
    pub fn refresh_rate(&self) -> Option<f64> {
        if self.h_total == 0 || self.v_total == 0 {
            return None;
        }
        Some(self.dot_clock as f64 / (self.h_total as f64 * self.v_total as f64))
    }
}

/// Controller (CRTC) descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrtcInfo {
    /// Controller identifier
    pub id: Xid,

    /// X position in screen space
    pub x: i32,
    /// Y position in screen space
    pub y: i32,

    /// Scanout width in pixels (0 when disabled)
    pub width: u32,
    /// Scanout height in pixels (0 when disabled)
    pub height: u32,

    /// Active mode (0 when disabled)
    pub mode: Xid,

    /// Current rotation
    #[serde(default)]
    pub rotation: Rotation,

    /// Supported rotations
    #[serde(default)]
    pub rotations: u16,

    /// Outputs currently driven
    #[serde(default)]
    pub outputs: Vec<Xid>,

    /// Outputs this controller could drive
    #[serde(default)]
    pub possible: Vec<Xid>,
}

impl CrtcInfo {
    /// Whether the controller is scanning out
    pub fn is_enabled(&self) -> bool {
        self.mode != 0 && self.width > 0 && self.height > 0
    }
}

/// Output descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputInfo {
    /// Output identifier
    pub id: Xid,

    /// Connector name (e.g. "DP-1")
    pub name: String,

    /// Owning controller, if any
    #[serde(default)]
    pub crtc: Option<Xid>,

    /// Physical width in millimeters
    #[serde(default)]
    pub mm_width: u64,
    /// Physical height in millimeters
    #[serde(default)]
    pub mm_height: u64,

    #[serde(default)]
    pub connection: Connection,

    #[serde(default)]
    pub subpixel_order: SubpixelOrder,

    /// Controllers that could drive this output
    #[serde(default)]
    pub crtcs: Vec<Xid>,

    /// Outputs that can be cloned with this one
    #[serde(default)]
    pub clones: Vec<Xid>,

    /// Supported modes
    #[serde(default)]
    pub modes: Vec<Xid>,

    /// Number of leading entries of `modes` that are preferred
    #[serde(default)]
    pub npreferred: usize,
}

/// Unmodified snapshot of the display source's screen resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalTopology {
    /// Server timestamp of the last change
    #[serde(default)]
    pub timestamp: u64,

    /// Server timestamp of the last configuration change
    #[serde(default)]
    pub config_timestamp: u64,

    /// Controllers
    pub crtcs: Vec<CrtcInfo>,

    /// Outputs
    pub outputs: Vec<OutputInfo>,

    /// Modes
    pub modes: Vec<ModeInfo>,
}

impl PhysicalTopology {
    /// Look up a controller by identifier
    pub fn crtc(&self, id: Xid) -> Option<&CrtcInfo> {
        self.crtcs.iter().find(|c| c.id == id)
    }

    /// Look up an output by identifier
    pub fn output(&self, id: Xid) -> Option<&OutputInfo> {
        self.outputs.iter().find(|o| o.id == id)
    }

    /// Look up a mode by identifier
    pub fn mode(&self, id: Xid) -> Option<&ModeInfo> {
        self.modes.iter().find(|m| m.id == id)
    }

    /// Controller currently driving `output`
    pub fn controller_for_output(&self, output: &OutputInfo) -> Option<&CrtcInfo> {
        output.crtc.and_then(|id| self.crtc(id))
    }

    /// Mode currently active on `crtc`
    pub fn mode_for_controller(&self, crtc: &CrtcInfo) -> Option<&ModeInfo> {
        if crtc.mode == 0 {
            return None;
        }
        self.mode(crtc.mode)
    }
}
