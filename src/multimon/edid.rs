//! EDID Matching
//!
//! Configuration records identify displays by the hex encoding of their
//! EDID property. The comparison is exact: same length, same lower-case
//! digits.

use std::fmt::Write;

use tracing::{debug, trace};

use crate::splits::{SplitConfiguration, SplitStore};
use crate::topology::{DisplaySource, OutputInfo, SourceError};

use super::MultiMonitorConfig;

/// Lower-case hex encoding, two digits per byte
pub fn fingerprint(raw: &[u8]) -> String {
    let mut hex = String::with_capacity(raw.len() * 2);
    for byte in raw {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

/// Looks up split configurations for physical outputs
pub struct EdidMatcher<'a> {
    store: &'a SplitStore,
    property: &'a str,
    max_bytes: usize,
}

impl<'a> EdidMatcher<'a> {
    /// Create a matcher over `store`
    pub fn new(store: &'a SplitStore, config: &'a MultiMonitorConfig) -> Self {
        Self {
            store,
            property: &config.edid_property,
            max_bytes: config.max_edid_bytes,
        }
    }

    /// Fingerprint of an output's EDID, `None` if it has none
    ///
    /// # Errors
    ///
    /// Propagates display source failures unchanged.
    pub fn fingerprint_output(
        &self,
        source: &dyn DisplaySource,
        output: &OutputInfo,
    ) -> Result<Option<String>, SourceError> {
        let raw = match source.output_property(output.id, self.property)? {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                trace!("Output {} has no {} property", output.name, self.property);
                return Ok(None);
            }
        };

        let raw = if raw.len() > self.max_bytes {
            debug!(
                "Output {}: {} is {} bytes, using the first {}",
                output.name,
                self.property,
                raw.len(),
                self.max_bytes
            );
            &raw[..self.max_bytes]
        } else {
            &raw[..]
        };

        Ok(Some(fingerprint(raw)))
    }

    /// Configuration for this fingerprint at the given controller size
    pub fn lookup(&self, fingerprint: &str, width: u32, height: u32) -> Option<&'a SplitConfiguration> {
        let found = self.store.find(fingerprint, width, height);
        if found.is_none() && self.store.knows_edid(fingerprint) {
            debug!(
                "Display is configured, but not for {}x{}; leaving it unsplit",
                width, height
            );
        }
        found
    }
}
