//! Passthrough Dispatch
//!
//! Operations other than topology reads go straight to the display server.
//! Mutations aimed at a synthetic record have no real counterpart and are
//! dropped; anything touching only real records is forwarded unchanged.
//! Reads and primary-output selection on a synthetic output act on the
//! physical output behind it.

use tracing::debug;

use crate::topology::source::Result;
use crate::topology::{is_synthetic, strip, Rotation, Xid};

/// Controller configuration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtcConfig {
    /// Left edge in screen coordinates
    pub x: i32,
    /// Top edge in screen coordinates
    pub y: i32,
    /// Mode to run, 0 to disable
    pub mode: Xid,
    /// Rotation to apply
    pub rotation: Rotation,
    /// Outputs to drive
    pub outputs: Vec<Xid>,
}

/// Gamma ramps, one entry per step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct Gamma {
    pub red: Vec<u16>,
    pub green: Vec<u16>,
    pub blue: Vec<u16>,
}

/// Projective transform in 16.16 fixed point, plus filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transform {
    /// Row-major matrix
    pub matrix: [[i32; 3]; 3],
    /// Filter name, empty for the default
    pub filter: String,
    /// Filter parameters
    pub params: Vec<i32>,
}

/// Panning area of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct Panning {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Display server operations outside topology queries
#[cfg_attr(test, mockall::automock)]
pub trait DisplayControl {
    /// Reconfigure a controller
    fn set_crtc_config(&self, crtc: Xid, config: &CrtcConfig) -> Result<()>;
    /// Load gamma ramps
    fn set_crtc_gamma(&self, crtc: Xid, gamma: &Gamma) -> Result<()>;
    /// Set a controller's transform
    fn set_crtc_transform(&self, crtc: Xid, transform: &Transform) -> Result<()>;
    /// Set a controller's panning area
    fn set_panning(&self, crtc: Xid, panning: &Panning) -> Result<()>;
    /// Replace an output property
    fn change_output_property(&self, output: Xid, property: &str, value: &[u8]) -> Result<()>;
    /// Remove an output property
    fn delete_output_property(&self, output: Xid, property: &str) -> Result<()>;
    /// Make a mode available on an output
    fn add_output_mode(&self, output: Xid, mode: Xid) -> Result<()>;
    /// Withdraw a mode from an output
    fn delete_output_mode(&self, output: Xid, mode: Xid) -> Result<()>;
    /// Mark an output primary
    fn set_output_primary(&self, output: Xid) -> Result<()>;
    /// Read an output property
    fn output_property(&self, output: Xid, property: &str) -> Result<Option<Vec<u8>>>;
    /// Number of gamma ramp entries
    fn crtc_gamma_size(&self, crtc: Xid) -> Result<u32>;
}

/// What happened to a mutating request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Sent to the display server
    Forwarded,
    /// Dropped, a synthetic record was involved
    Rejected,
}

/// Applies the synthetic-id policy in front of a [`DisplayControl`]
pub struct PassthroughGuard<C> {
    inner: C,
}

impl<C: DisplayControl> PassthroughGuard<C> {
    /// Wrap `inner`
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    fn gate(
        &self,
        operation: &str,
        ids: &[Xid],
        forward: impl FnOnce(&C) -> Result<()>,
    ) -> Result<Disposition> {
        if let Some(id) = ids.iter().find(|&&id| is_synthetic(id)) {
            debug!("Rejecting {} on synthetic id 0x{:08x}", operation, id);
            return Ok(Disposition::Rejected);
        }
        forward(&self.inner)?;
        Ok(Disposition::Forwarded)
    }

    /// Reconfigure a controller
    pub fn set_crtc_config(&self, crtc: Xid, config: &CrtcConfig) -> Result<Disposition> {
        let mut ids = vec![crtc, config.mode];
        ids.extend_from_slice(&config.outputs);
        self.gate("set_crtc_config", &ids, |c| c.set_crtc_config(crtc, config))
    }

    /// Load gamma ramps
    pub fn set_crtc_gamma(&self, crtc: Xid, gamma: &Gamma) -> Result<Disposition> {
        self.gate("set_crtc_gamma", &[crtc], |c| c.set_crtc_gamma(crtc, gamma))
    }

    /// Set a controller's transform
    pub fn set_crtc_transform(&self, crtc: Xid, transform: &Transform) -> Result<Disposition> {
        self.gate("set_crtc_transform", &[crtc], |c| {
            c.set_crtc_transform(crtc, transform)
        })
    }

    /// Set a controller's panning area
    pub fn set_panning(&self, crtc: Xid, panning: &Panning) -> Result<Disposition> {
        self.gate("set_panning", &[crtc], |c| c.set_panning(crtc, panning))
    }

    /// Replace an output property
    pub fn change_output_property(
        &self,
        output: Xid,
        property: &str,
        value: &[u8],
    ) -> Result<Disposition> {
        self.gate("change_output_property", &[output], |c| {
            c.change_output_property(output, property, value)
        })
    }

    /// Remove an output property
    pub fn delete_output_property(&self, output: Xid, property: &str) -> Result<Disposition> {
        self.gate("delete_output_property", &[output], |c| {
            c.delete_output_property(output, property)
        })
    }

    /// Make a mode available on an output
    pub fn add_output_mode(&self, output: Xid, mode: Xid) -> Result<Disposition> {
        self.gate("add_output_mode", &[output, mode], |c| {
            c.add_output_mode(output, mode)
        })
    }

    /// Withdraw a mode from an output
    pub fn delete_output_mode(&self, output: Xid, mode: Xid) -> Result<Disposition> {
        self.gate("delete_output_mode", &[output, mode], |c| {
            c.delete_output_mode(output, mode)
        })
    }

    /// Mark an output primary; a virtual output selects its physical one
    pub fn set_output_primary(&self, output: Xid) -> Result<()> {
        self.inner.set_output_primary(strip(output))
    }

    /// Read an output property, from the physical output for virtual ones
    pub fn output_property(&self, output: Xid, property: &str) -> Result<Option<Vec<u8>>> {
        self.inner.output_property(strip(output), property)
    }

    /// Gamma size, from the physical controller for virtual ones
    pub fn crtc_gamma_size(&self, crtc: Xid) -> Result<u32> {
        self.inner.crtc_gamma_size(strip(crtc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{make_synthetic, SourceError};
    use mockall::predicate::{always, eq};

    fn synthetic(id: Xid) -> Xid {
        make_synthetic(id, 2).unwrap()
    }

    fn config(outputs: Vec<Xid>) -> CrtcConfig {
        CrtcConfig {
            x: 0,
            y: 0,
            mode: 0x1c4,
            rotation: Rotation::NORMAL,
            outputs,
        }
    }

    #[test]
    fn test_real_crtc_config_forwarded() {
        let mut control = MockDisplayControl::new();
        control
            .expect_set_crtc_config()
            .with(eq(0x3f), eq(config(vec![0x43])))
            .times(1)
            .returning(|_, _| Ok(()));

        let guard = PassthroughGuard::new(control);
        assert_eq!(
            guard.set_crtc_config(0x3f, &config(vec![0x43])).unwrap(),
            Disposition::Forwarded
        );
    }

    #[test]
    fn test_synthetic_crtc_config_rejected() {
        let mut control = MockDisplayControl::new();
        control.expect_set_crtc_config().times(0);

        let guard = PassthroughGuard::new(control);
        assert_eq!(
            guard
                .set_crtc_config(synthetic(0x3f), &config(vec![0x43]))
                .unwrap(),
            Disposition::Rejected
        );
        assert_eq!(
            guard
                .set_crtc_config(0x3f, &config(vec![synthetic(0x43)]))
                .unwrap(),
            Disposition::Rejected
        );
    }

    #[test]
    fn test_property_changes_gated() {
        let mut control = MockDisplayControl::new();
        control
            .expect_change_output_property()
            .with(eq(0x43), eq("Backlight"), always())
            .times(1)
            .returning(|_, _, _| Ok(()));
        control.expect_delete_output_property().times(0);

        let guard = PassthroughGuard::new(control);
        assert_eq!(
            guard.change_output_property(0x43, "Backlight", &[1, 0, 0, 0]).unwrap(),
            Disposition::Forwarded
        );
        assert_eq!(
            guard.delete_output_property(synthetic(0x43), "Backlight").unwrap(),
            Disposition::Rejected
        );
    }

    #[test]
    fn test_mode_changes_gated() {
        let mut control = MockDisplayControl::new();
        control.expect_add_output_mode().times(0);
        control
            .expect_delete_output_mode()
            .with(eq(0x43), eq(0x1c4))
            .times(1)
            .returning(|_, _| Ok(()));

        let guard = PassthroughGuard::new(control);
        assert_eq!(
            guard.add_output_mode(0x43, synthetic(0x43)).unwrap(),
            Disposition::Rejected
        );
        assert_eq!(
            guard.delete_output_mode(0x43, 0x1c4).unwrap(),
            Disposition::Forwarded
        );
    }

    #[test]
    fn test_controller_settings_gated() {
        let mut control = MockDisplayControl::new();
        control.expect_set_crtc_gamma().times(0);
        control.expect_set_crtc_transform().times(0);
        control
            .expect_set_panning()
            .times(1)
            .returning(|_, _| Ok(()));

        let guard = PassthroughGuard::new(control);
        assert_eq!(
            guard.set_crtc_gamma(synthetic(0x3f), &Gamma::default()).unwrap(),
            Disposition::Rejected
        );
        assert_eq!(
            guard
                .set_crtc_transform(synthetic(0x3f), &Transform::default())
                .unwrap(),
            Disposition::Rejected
        );
        assert_eq!(
            guard.set_panning(0x3f, &Panning::default()).unwrap(),
            Disposition::Forwarded
        );
    }

    #[test]
    fn test_reads_use_physical_id() {
        let mut control = MockDisplayControl::new();
        control
            .expect_output_property()
            .with(eq(0x43), eq("EDID"))
            .times(1)
            .returning(|_, _| Ok(Some(vec![0x00, 0xff])));
        control
            .expect_crtc_gamma_size()
            .with(eq(0x3f))
            .returning(|_| Ok(256));
        control
            .expect_set_output_primary()
            .with(eq(0x43))
            .times(1)
            .returning(|_| Ok(()));

        let guard = PassthroughGuard::new(control);
        assert_eq!(
            guard.output_property(synthetic(0x43), "EDID").unwrap(),
            Some(vec![0x00, 0xff])
        );
        assert_eq!(guard.crtc_gamma_size(synthetic(0x3f)).unwrap(), 256);
        guard.set_output_primary(synthetic(0x43)).unwrap();
    }

    #[test]
    fn test_forward_error_propagates() {
        let mut control = MockDisplayControl::new();
        control
            .expect_set_panning()
            .returning(|_, _| Err(SourceError::Unavailable("BadMatch".to_string())));

        let guard = PassthroughGuard::new(control);
        assert!(guard.set_panning(0x3f, &Panning::default()).is_err());
    }
}
