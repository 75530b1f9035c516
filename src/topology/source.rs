//! Display source collaborator
//!
//! The engine never talks to a display server directly. Everything it needs
//! comes through [`DisplaySource`]: one topology snapshot per pass plus raw
//! per-output properties (EDID). [`SnapshotSource`] implements the contract
//! on top of a JSON capture so the engine can be driven offline.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use super::ids::Xid;
use super::types::PhysicalTopology;

/// Result type for display source queries
pub type Result<T> = std::result::Result<T, SourceError>;

/// Display source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not answer the query
    #[error("Display source unavailable: {0}")]
    Unavailable(String),

    /// Queried an output the source does not know
    #[error("Unknown output: 0x{0:x}")]
    UnknownOutput(Xid),

    /// Snapshot file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be parsed
    #[error("Invalid topology snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Source of the physical display topology
///
/// Implementations own retry policy; the engine propagates failures as-is.
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySource {
    /// Query the current controllers, outputs and modes
    fn topology(&self) -> Result<PhysicalTopology>;

    /// Fetch a raw output property, `None` if the output does not carry it
    fn output_property(&self, output: Xid, property: &str) -> Result<Option<Vec<u8>>>;
}

/// Property value stored as lower-case hex in snapshot files
#[derive(Debug, Clone, PartialEq, Eq)]
struct HexBytes(Vec<u8>);

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let hex: String = self.0.iter().map(|b| format!("{:02x}", b)).collect();
        serializer.serialize_str(&hex)
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let text: String = text.split_whitespace().collect();
        if !text.is_ascii() || text.len() % 2 != 0 {
            return Err(serde::de::Error::custom("expected an even number of hex digits"));
        }
        (0..text.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&text[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map(HexBytes)
            .map_err(serde::de::Error::custom)
    }
}

/// Captured topology with its output properties
///
/// ```json
/// {
///   "topology": { "crtcs": [...], "outputs": [...], "modes": [...] },
///   "properties": { "67": { "EDID": "00ffffffffffff00..." } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSource {
    topology: PhysicalTopology,

    #[serde(default)]
    properties: HashMap<Xid, HashMap<String, HexBytes>>,
}

impl SnapshotSource {
    /// Wrap an in-memory topology without any properties
    pub fn new(topology: PhysicalTopology) -> Self {
        Self {
            topology,
            properties: HashMap::new(),
        }
    }

    /// Attach a property value to an output
    pub fn with_property(mut self, output: Xid, property: &str, value: impl Into<Vec<u8>>) -> Self {
        self.properties
            .entry(output)
            .or_default()
            .insert(property.to_string(), HexBytes(value.into()));
        self
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&text)?;
        debug!(
            "Loaded topology snapshot {}: {} crtcs, {} outputs, {} modes",
            path.display(),
            snapshot.topology.crtcs.len(),
            snapshot.topology.outputs.len(),
            snapshot.topology.modes.len()
        );
        Ok(snapshot)
    }

    /// Serialize the snapshot back to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl DisplaySource for SnapshotSource {
    fn topology(&self) -> Result<PhysicalTopology> {
        Ok(self.topology.clone())
    }

    fn output_property(&self, output: Xid, property: &str) -> Result<Option<Vec<u8>>> {
        if self.topology.output(output).is_none() {
            return Err(SourceError::UnknownOutput(output));
        }
        Ok(self
            .properties
            .get(&output)
            .and_then(|props| props.get(property))
            .map(|value| value.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
      "topology": {
        "crtcs": [
            { "id": 63, "x": 0, "y": 0, "width": 3360, "height": 1050, "mode": 80,
              "outputs": [67], "possible": [67] }
        ],
        "outputs": [
            { "id": 67, "name": "DP-1", "crtc": 63, "mm_width": 600, "mm_height": 340,
              "connection": "connected", "crtcs": [63], "modes": [80] }
        ],
        "modes": [
            { "id": 80, "width": 3360, "height": 1050, "name": "3360x1050" }
        ]
      },
        "properties": { "67": { "EDID": "00ffff ffffffff00" } }
    }"#;

    #[test]
    fn test_snapshot_parses_topology() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let topo = source.topology().unwrap();
        assert_eq!(topo.crtcs.len(), 1);
        assert_eq!(topo.outputs[0].name, "DP-1");
        assert_eq!(topo.outputs[0].crtc, Some(63));
    }

    #[test]
    fn test_snapshot_property_hex() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let edid = source.output_property(67, "EDID").unwrap().unwrap();
        assert_eq!(edid, vec![0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00]);
        assert!(source.output_property(67, "BACKLIGHT").unwrap().is_none());
    }

    #[test]
    fn test_snapshot_unknown_output() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        assert!(matches!(
            source.output_property(99, "EDID"),
            Err(SourceError::UnknownOutput(99))
        ));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let again = SnapshotSource::from_json(&source.to_json().unwrap()).unwrap();
        assert_eq!(again.topology().unwrap(), source.topology().unwrap());
        assert_eq!(
            again.output_property(67, "EDID").unwrap(),
            source.output_property(67, "EDID").unwrap()
        );
    }

    #[test]
    fn test_odd_hex_rejected() {
        let bad = SNAPSHOT.replace("00ffff ffffffff00", "abc");
        assert!(SnapshotSource::from_json(&bad).is_err());
    }
}
