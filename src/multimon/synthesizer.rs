//! Record Synthesis
//!
//! Fabricates the output, controller and mode descriptors for one split
//! leaf. Every synthetic descriptor is derived from the physical output,
//! the controller driving it and that controller's active mode; nothing
//! else in the topology is consulted.
//!
//! Identifier allocation for leaf `k` of output `o` on controller `c`:
//!
//! | record     | identifier              |
//! |------------|-------------------------|
//! | output     | `make_synthetic(o, k)`  |
//! | controller | `make_synthetic(c, k)`  |
//! | mode       | `make_synthetic(o, k)`  |
//!
//! Mode and output identifiers live in separate lookup tables, so sharing
//! the same value is harmless.

use crate::topology::{make_synthetic, CrtcInfo, IdError, ModeInfo, OutputInfo, Xid};

use super::layout::SplitLeaf;
use super::{MultiMonitorError, Result};

/// The three descriptors standing in for one leaf
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRecords {
    /// Virtual output
    pub output: OutputInfo,
    /// Virtual controller driving `output`
    pub crtc: CrtcInfo,
    /// Mode `crtc` is running
    pub mode: ModeInfo,
}

/// Builds synthetic descriptors for the leaves of one physical output
#[derive(Debug, Clone, Copy)]
pub struct RecordSynthesizer<'a> {
    output: &'a OutputInfo,
    crtc: &'a CrtcInfo,
    mode: &'a ModeInfo,
    separator: &'a str,
}

impl<'a> RecordSynthesizer<'a> {
    /// Synthesizer for `output`, driven by `crtc` running `mode`
    ///
    /// Synthetic output names are the physical name, `separator`, and the
    /// split index.
    pub fn new(
        output: &'a OutputInfo,
        crtc: &'a CrtcInfo,
        mode: &'a ModeInfo,
        separator: &'a str,
    ) -> Self {
        Self {
            output,
            crtc,
            mode,
            separator,
        }
    }

    /// Descriptors for one leaf
    ///
    /// # Errors
    ///
    /// Fails if any physical identifier involved is already synthetic, the
    /// split index does not fit the identifier space, or the leaf position
    /// does not fit screen coordinates.
    pub fn synthesize(&self, leaf: &SplitLeaf) -> Result<SyntheticRecords> {
        let k = leaf.split_index;
        let output_id = make_synthetic(self.output.id, k)?;
        let crtc_id = make_synthetic(self.crtc.id, k)?;
        let mode_id = make_synthetic(self.output.id, k)?;
        let clones = self
            .output
            .clones
            .iter()
            .map(|&clone| make_synthetic(clone, k))
            .collect::<std::result::Result<Vec<Xid>, IdError>>()?;
        let x = offset(self.crtc.x, leaf.rect.x)?;
        let y = offset(self.crtc.y, leaf.rect.y)?;

        let mode = ModeInfo {
            id: mode_id,
            width: leaf.rect.width,
            height: leaf.rect.height,
            name: format!("{}x{}", leaf.rect.width, leaf.rect.height),
            ..self.mode.clone()
        };

        let crtc = CrtcInfo {
            id: crtc_id,
            x,
            y,
            width: leaf.rect.width,
            height: leaf.rect.height,
            mode: mode_id,
            rotation: self.crtc.rotation,
            rotations: self.crtc.rotations,
            outputs: vec![output_id],
            possible: vec![output_id],
        };

        let output = OutputInfo {
            id: output_id,
            name: format!("{}{}{}", self.output.name, self.separator, k),
            crtc: Some(crtc_id),
            mm_width: scale_mm(self.output.mm_width, leaf.rect.width, self.crtc.width),
            mm_height: scale_mm(self.output.mm_height, leaf.rect.height, self.crtc.height),
            connection: self.output.connection,
            subpixel_order: self.output.subpixel_order,
            crtcs: vec![crtc_id],
            clones,
            modes: vec![mode_id],
            npreferred: 1,
        };

        Ok(SyntheticRecords { output, crtc, mode })
    }
}

/// Screen coordinate of a leaf edge `delta` pixels past `origin`
fn offset(origin: i32, delta: u32) -> Result<i32> {
    i32::try_from(delta)
        .ok()
        .and_then(|delta| origin.checked_add(delta))
        .ok_or_else(|| {
            MultiMonitorError::Invariant(format!(
                "leaf offset {} from {} leaves screen coordinates",
                delta, origin
            ))
        })
}

/// Physical size of `part` pixels out of `whole`; unscaled when `whole` is 0
fn scale_mm(mm: u64, part: u32, whole: u32) -> u64 {
    if whole == 0 {
        return mm;
    }
    mm * u64::from(part) / u64::from(whole)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multimon::layout::SplitRect;
    use crate::topology::{is_synthetic, split_index, strip, Connection, Rotation, SubpixelOrder};

    fn physical_output() -> OutputInfo {
        OutputInfo {
            id: 0x43,
            name: "DP-1".to_string(),
            crtc: Some(0x3f),
            mm_width: 600,
            mm_height: 340,
            connection: Connection::Connected,
            subpixel_order: SubpixelOrder::HorizontalRgb,
            crtcs: vec![0x3f, 0x40],
            clones: vec![0x44],
            modes: vec![0x1c4, 0x1c5],
            npreferred: 1,
        }
    }

    fn physical_crtc() -> CrtcInfo {
        CrtcInfo {
            id: 0x3f,
            x: 1920,
            y: 0,
            width: 3360,
            height: 1050,
            mode: 0x1c4,
            rotation: Rotation::NORMAL,
            rotations: 0x3f,
            outputs: vec![0x43],
            possible: vec![0x43],
        }
    }

    fn physical_mode() -> ModeInfo {
        ModeInfo {
            id: 0x1c4,
            width: 3360,
            height: 1050,
            dot_clock: 238_560_000,
            h_sync_start: 3408,
            h_sync_end: 3440,
            h_total: 3520,
            h_skew: 0,
            v_sync_start: 1053,
            v_sync_end: 1059,
            v_total: 1080,
            name: "3360x1050".to_string(),
            mode_flags: 0x5,
        }
    }

    fn left_leaf() -> SplitLeaf {
        SplitLeaf {
            rect: SplitRect {
                x: 0,
                y: 0,
                width: 1680,
                height: 1050,
            },
            split_index: 1,
        }
    }

    fn right_leaf() -> SplitLeaf {
        SplitLeaf {
            rect: SplitRect {
                x: 1680,
                y: 0,
                width: 1680,
                height: 1050,
            },
            split_index: 2,
        }
    }

    #[test]
    fn test_physical_size_scaled_to_leaf() {
        let (output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");

        let records = synth.synthesize(&left_leaf()).unwrap();
        assert_eq!(records.output.mm_width, 300);
        assert_eq!(records.output.mm_height, 340);
    }

    #[test]
    fn test_zero_controller_size_not_scaled() {
        let (output, mut crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        crtc.width = 0;
        crtc.height = 0;
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");

        let records = synth.synthesize(&left_leaf()).unwrap();
        assert_eq!(records.output.mm_width, 600);
        assert_eq!(records.output.mm_height, 340);
    }

    #[test]
    fn test_identifiers_encode_split_index() {
        let (output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");
        let records = synth.synthesize(&right_leaf()).unwrap();

        for id in [records.output.id, records.crtc.id, records.mode.id] {
            assert!(is_synthetic(id));
            assert_eq!(split_index(id), 2);
        }
        assert_eq!(strip(records.output.id), 0x43);
        assert_eq!(strip(records.crtc.id), 0x3f);
        assert_eq!(records.output.clones, vec![make_synthetic(0x44, 2).unwrap()]);
    }

    #[test]
    fn test_records_reference_each_other() {
        let (output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");
        let r = synth.synthesize(&right_leaf()).unwrap();

        assert_eq!(r.output.crtc, Some(r.crtc.id));
        assert_eq!(r.output.crtcs, vec![r.crtc.id]);
        assert_eq!(r.output.modes, vec![r.mode.id]);
        assert_eq!(r.output.npreferred, 1);
        assert_eq!(r.crtc.outputs, vec![r.output.id]);
        assert_eq!(r.crtc.possible, vec![r.output.id]);
        assert_eq!(r.crtc.mode, r.mode.id);
    }

    #[test]
    fn test_controller_geometry() {
        let (output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");
        let r = synth.synthesize(&right_leaf()).unwrap();

        assert_eq!((r.crtc.x, r.crtc.y), (1920 + 1680, 0));
        assert_eq!((r.crtc.width, r.crtc.height), (1680, 1050));
        assert_eq!(r.crtc.rotation, Rotation::NORMAL);
        assert_eq!(r.crtc.rotations, 0x3f);
    }

    #[test]
    fn test_mode_copies_timing() {
        let (output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");
        let r = synth.synthesize(&left_leaf()).unwrap();

        assert_eq!(r.mode.name, "1680x1050");
        assert_eq!((r.mode.width, r.mode.height), (1680, 1050));
        assert_eq!(r.mode.dot_clock, mode.dot_clock);
        assert_eq!(r.mode.h_total, mode.h_total);
        assert_eq!(r.mode.v_total, mode.v_total);
        assert_eq!(r.mode.mode_flags, mode.mode_flags);
    }

    #[test]
    fn test_output_name_and_attributes() {
        let (output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");
        let r = synth.synthesize(&right_leaf()).unwrap();

        assert_eq!(r.output.name, "DP-1~2");
        assert_eq!(r.output.connection, Connection::Connected);
        assert_eq!(r.output.subpixel_order, SubpixelOrder::HorizontalRgb);

        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "-split-");
        assert_eq!(synth.synthesize(&left_leaf()).unwrap().output.name, "DP-1-split-1");
    }

    #[test]
    fn test_synthetic_source_rejected() {
        let (mut output, crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        output.id = make_synthetic(0x43, 1).unwrap();
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");
        assert!(matches!(
            synth.synthesize(&left_leaf()),
            Err(MultiMonitorError::Id(IdError::AlreadySynthetic(_)))
        ));
    }

    #[test]
    fn test_position_overflow_rejected() {
        let (output, mut crtc, mode) = (physical_output(), physical_crtc(), physical_mode());
        crtc.x = i32::MAX - 100;
        let synth = RecordSynthesizer::new(&output, &crtc, &mode, "~");

        assert!(synth.synthesize(&left_leaf()).is_ok());
        assert!(matches!(
            synth.synthesize(&right_leaf()),
            Err(MultiMonitorError::Invariant(_))
        ));
    }
}
