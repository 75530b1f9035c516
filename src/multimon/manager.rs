//! Topology Augmentation
//!
//! Runs matching, interpretation and synthesis over every physical output
//! and merges the results into an [`AugmentedTopology`].

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::multimon::edid::EdidMatcher;
use crate::multimon::layout::{interpret, SplitRect};
use crate::multimon::synthesizer::{RecordSynthesizer, SyntheticRecords};
use crate::multimon::{MultiMonitorError, Result};
use crate::splits::SplitStore;
use crate::topology::{CrtcInfo, DisplaySource, ModeInfo, OutputInfo, PhysicalTopology, Xid};

/// Synthesis settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMonitorConfig {
    /// Output property holding the EDID
    pub edid_property: String,

    /// EDID bytes taken into the fingerprint
    pub max_edid_bytes: usize,

    /// Placed between the physical name and the split index
    pub name_separator: String,
}

impl Default for MultiMonitorConfig {
    fn default() -> Self {
        Self {
            edid_property: "EDID".to_string(),
            max_edid_bytes: 384,
            name_separator: "~".to_string(),
        }
    }
}

/// Kind of descriptor an identifier refers to
///
/// Identifiers are only unique per kind. A synthetic mode carries the same
/// value as the synthetic output it belongs to (`make_synthetic(output, k)`
/// for both), so every id lookup and origin query takes the kind along
/// with the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Output descriptor
    Output,
    /// Controller descriptor
    Crtc,
    /// Mode descriptor
    Mode,
}

#[derive(Debug, Clone, Copy)]
enum OutputSlot {
    Physical(usize),
    Synthetic(usize),
}

/// Physical topology plus the synthetic records derived from it
///
/// Borrows the physical topology and owns every synthetic descriptor.
/// Dropping the value, or calling [`release`](Self::release), frees all
/// synthetic records at once.
#[derive(Debug)]
pub struct AugmentedTopology<'t> {
    physical: &'t PhysicalTopology,
    crtcs: Vec<CrtcInfo>,
    outputs: Vec<OutputInfo>,
    modes: Vec<ModeInfo>,
    output_order: Vec<OutputSlot>,
    index: HashMap<(RecordKind, Xid), usize>,
    origins: HashMap<(RecordKind, Xid), Xid>,
}

impl<'t> AugmentedTopology<'t> {
    /// The physical topology, unchanged
    pub fn passthrough(physical: &'t PhysicalTopology) -> Self {
        Self {
            physical,
            crtcs: Vec::new(),
            outputs: Vec::new(),
            modes: Vec::new(),
            output_order: (0..physical.outputs.len()).map(OutputSlot::Physical).collect(),
            index: HashMap::new(),
            origins: HashMap::new(),
        }
    }

    fn empty(physical: &'t PhysicalTopology) -> Self {
        Self {
            output_order: Vec::with_capacity(physical.outputs.len()),
            ..Self::passthrough(physical)
        }
    }

    fn push_physical(&mut self, slot: usize) {
        self.output_order.push(OutputSlot::Physical(slot));
    }

    fn push_split(&mut self, output: &OutputInfo, crtc: &CrtcInfo, records: Vec<SyntheticRecords>) {
        for SyntheticRecords {
            output: synth_output,
            crtc: synth_crtc,
            mode: synth_mode,
        } in records
        {
            self.origins
                .insert((RecordKind::Output, synth_output.id), output.id);
            self.origins.insert((RecordKind::Crtc, synth_crtc.id), crtc.id);
            self.origins.insert((RecordKind::Mode, synth_mode.id), crtc.mode);

            self.index
                .insert((RecordKind::Output, synth_output.id), self.outputs.len());
            self.index
                .insert((RecordKind::Crtc, synth_crtc.id), self.crtcs.len());
            self.index
                .insert((RecordKind::Mode, synth_mode.id), self.modes.len());

            self.output_order
                .push(OutputSlot::Synthetic(self.outputs.len()));
            self.outputs.push(synth_output);
            self.crtcs.push(synth_crtc);
            self.modes.push(synth_mode);
        }
    }

    /// The borrowed physical topology
    pub fn physical(&self) -> &'t PhysicalTopology {
        self.physical
    }

    /// Whether any output was split
    pub fn is_augmented(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Physical controllers followed by synthetic ones
    pub fn crtcs(&self) -> impl Iterator<Item = &CrtcInfo> + '_ {
        self.physical.crtcs.iter().chain(self.crtcs.iter())
    }

    /// Outputs as consumers see them
    ///
    /// A split output is replaced, in place, by its virtual outputs in
    /// split-index order.
    pub fn outputs(&self) -> impl Iterator<Item = &OutputInfo> + '_ {
        self.output_order.iter().map(move |slot| match *slot {
            OutputSlot::Physical(i) => &self.physical.outputs[i],
            OutputSlot::Synthetic(i) => &self.outputs[i],
        })
    }

    /// Physical modes followed by synthetic ones
    pub fn modes(&self) -> impl Iterator<Item = &ModeInfo> + '_ {
        self.physical.modes.iter().chain(self.modes.iter())
    }

    /// Number of controllers
    pub fn crtc_count(&self) -> usize {
        self.physical.crtcs.len() + self.crtcs.len()
    }

    /// Number of visible outputs
    pub fn output_count(&self) -> usize {
        self.output_order.len()
    }

    /// Number of modes
    pub fn mode_count(&self) -> usize {
        self.physical.modes.len() + self.modes.len()
    }

    /// Controller by identifier, synthetic or real
    pub fn crtc(&self, id: Xid) -> Option<&CrtcInfo> {
        match self.index.get(&(RecordKind::Crtc, id)) {
            Some(&i) => Some(&self.crtcs[i]),
            None => self.physical.crtc(id),
        }
    }

    /// Output by identifier, synthetic or real
    ///
    /// Physical outputs that were split still resolve here even though
    /// [`outputs`](Self::outputs) no longer lists them.
    pub fn output(&self, id: Xid) -> Option<&OutputInfo> {
        match self.index.get(&(RecordKind::Output, id)) {
            Some(&i) => Some(&self.outputs[i]),
            None => self.physical.output(id),
        }
    }

    /// Mode by identifier, synthetic or real
    pub fn mode(&self, id: Xid) -> Option<&ModeInfo> {
        match self.index.get(&(RecordKind::Mode, id)) {
            Some(&i) => Some(&self.modes[i]),
            None => self.physical.mode(id),
        }
    }

    /// Controller scanning out `output`, `None` when it is off
    pub fn active_crtc(&self, output: &OutputInfo) -> Option<&CrtcInfo> {
        output
            .crtc
            .and_then(|id| self.crtc(id))
            .filter(|crtc| crtc.is_enabled())
    }

    /// Refresh rate `output` is running at
    pub fn refresh_rate(&self, output: &OutputInfo) -> Option<f64> {
        self.active_crtc(output)
            .and_then(|crtc| self.mode(crtc.mode))
            .and_then(ModeInfo::refresh_rate)
    }

    /// Real record a synthetic one was derived from
    ///
    /// For modes this is the physical controller's active mode.
    pub fn origin_of(&self, kind: RecordKind, id: Xid) -> Option<Xid> {
        self.origins.get(&(kind, id)).copied()
    }

    /// Whether `id` names a synthetic record of this topology
    pub fn is_synthetic(&self, kind: RecordKind, id: Xid) -> bool {
        self.index.contains_key(&(kind, id))
    }

    /// Owned copy of the merged view
    ///
    /// Synthetic mode and output identifiers coincide, see [`RecordKind`].
    pub fn to_topology(&self) -> PhysicalTopology {
        PhysicalTopology {
            timestamp: self.physical.timestamp,
            config_timestamp: self.physical.config_timestamp,
            crtcs: self.crtcs().cloned().collect(),
            outputs: self.outputs().cloned().collect(),
            modes: self.modes().cloned().collect(),
        }
    }

    /// Drop every synthetic record and hand back the physical topology
    pub fn release(self) -> &'t PhysicalTopology {
        debug!(
            "Releasing {} synthetic outputs, {} controllers, {} modes",
            self.outputs.len(),
            self.crtcs.len(),
            self.modes.len()
        );
        self.physical
    }
}

/// What the display source reports about one physical output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    /// Output name
    pub name: String,
    /// EDID fingerprint, if the output has one
    pub edid: Option<String>,
    /// Size of the driving controller, if any
    pub size: Option<(u32, u32)>,
    /// Whether a stored configuration applies right now
    pub configured: bool,
}

/// Builds augmented topologies from a split store
pub struct TopologyAugmenter<'s> {
    store: &'s SplitStore,
    config: MultiMonitorConfig,
}

impl<'s> TopologyAugmenter<'s> {
    /// Create an augmenter over `store`
    pub fn new(store: &'s SplitStore, config: MultiMonitorConfig) -> Self {
        Self { store, config }
    }

    /// Augment `topology`, falling back to passthrough on inconsistency
    ///
    /// An inconsistent physical topology yields the physical topology
    /// unchanged rather than a half-built augmentation.
    ///
    /// # Errors
    ///
    /// Only display source failures are returned, unchanged.
    pub fn augment<'t>(
        &self,
        source: &dyn DisplaySource,
        topology: &'t PhysicalTopology,
    ) -> Result<AugmentedTopology<'t>> {
        match self.try_augment(source, topology) {
            Ok(augmented) => Ok(augmented),
            Err(MultiMonitorError::Source(e)) => Err(MultiMonitorError::Source(e)),
            Err(e) => {
                warn!("Topology augmentation aborted, passing through: {}", e);
                Ok(AugmentedTopology::passthrough(topology))
            }
        }
    }

    /// Augment `topology`, reporting every failure
    ///
    /// # Errors
    ///
    /// Returns [`MultiMonitorError::Invariant`] or [`MultiMonitorError::Id`]
    /// when the physical topology is inconsistent, and
    /// [`MultiMonitorError::Source`] when the display source fails.
    pub fn try_augment<'t>(
        &self,
        source: &dyn DisplaySource,
        topology: &'t PhysicalTopology,
    ) -> Result<AugmentedTopology<'t>> {
        let matcher = EdidMatcher::new(self.store, &self.config);
        let mut augmented = AugmentedTopology::empty(topology);
        let mut split_crtcs = HashSet::new();

        for (slot, output) in topology.outputs.iter().enumerate() {
            match self.split_output(&matcher, source, topology, output, &split_crtcs)? {
                Some((crtc, records)) => {
                    info!(
                        "Split output {} into {} virtual outputs",
                        output.name,
                        records.len()
                    );
                    split_crtcs.insert(crtc.id);
                    augmented.push_split(output, crtc, records);
                }
                None => augmented.push_physical(slot),
            }
        }

        debug!(
            "Augmented topology: {} outputs, {} controllers, {} modes",
            augmented.output_count(),
            augmented.crtc_count(),
            augmented.mode_count()
        );
        Ok(augmented)
    }

    fn split_output<'t>(
        &self,
        matcher: &EdidMatcher<'_>,
        source: &dyn DisplaySource,
        topology: &'t PhysicalTopology,
        output: &OutputInfo,
        split_crtcs: &HashSet<Xid>,
    ) -> Result<Option<(&'t CrtcInfo, Vec<SyntheticRecords>)>> {
        let Some(crtc_id) = output.crtc else {
            trace!("Output {} is not driven, skipping", output.name);
            return Ok(None);
        };
        let crtc = topology.crtc(crtc_id).ok_or_else(|| {
            MultiMonitorError::Invariant(format!(
                "output {} refers to unknown controller 0x{:x}",
                output.name, crtc_id
            ))
        })?;

        let Some(fingerprint) = matcher.fingerprint_output(source, output)? else {
            return Ok(None);
        };
        let Some(record) = matcher.lookup(&fingerprint, crtc.width, crtc.height) else {
            trace!("No configuration for output {}", output.name);
            return Ok(None);
        };

        if split_crtcs.contains(&crtc.id) {
            warn!(
                "Controller 0x{:x} is already split, leaving output {} unsplit",
                crtc.id, output.name
            );
            return Ok(None);
        }

        let mode = topology.mode_for_controller(crtc).ok_or_else(|| {
            MultiMonitorError::Invariant(format!(
                "controller 0x{:x} has no active mode 0x{:x}",
                crtc.id, crtc.mode
            ))
        })?;

        let leaves = match interpret(&record.program, SplitRect::with_size(crtc.width, crtc.height)) {
            Ok(leaves) => leaves,
            Err(e) => {
                warn!(
                    "Ignoring malformed split program for {} ({}): {}",
                    output.name, record.name, e
                );
                return Ok(None);
            }
        };

        let synthesizer = RecordSynthesizer::new(output, crtc, mode, &self.config.name_separator);
        let records = leaves
            .iter()
            .map(|leaf| synthesizer.synthesize(leaf))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some((crtc, records)))
    }

    /// Describe every physical output for configuration authoring
    ///
    /// # Errors
    ///
    /// Display source failures are returned unchanged.
    pub fn describe_outputs(
        &self,
        source: &dyn DisplaySource,
        topology: &PhysicalTopology,
    ) -> Result<Vec<OutputSummary>> {
        let matcher = EdidMatcher::new(self.store, &self.config);
        let mut summaries = Vec::with_capacity(topology.outputs.len());

        for output in &topology.outputs {
            let edid = matcher.fingerprint_output(source, output)?;
            let size = topology
                .controller_for_output(output)
                .map(|crtc| (crtc.width, crtc.height));
            let configured = match (&edid, size) {
                (Some(fp), Some((w, h))) => self.store.find(fp, w, h).is_some(),
                _ => false,
            };
            summaries.push(OutputSummary {
                name: output.name.clone(),
                edid,
                size,
                configured,
            });
        }

        Ok(summaries)
    }
}
