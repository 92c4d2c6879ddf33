// src/record.rs

//! Defines the canonical per-display record produced by every backend.
//!
//! A [`DisplayRecord`] is a plain value: cloning it deep-copies the name,
//! description and EDID block, and records carry no handles that need
//! explicit release. Fields that only one platform can fill hold their
//! `Default` values everywhere else, so the struct has the same shape on
//! every target and serializes uniformly.

use serde::{Deserialize, Serialize};

/// Everything the calibration pipeline needs to know about one physical
/// display.
///
/// Produced by [`crate::enumerate_displays`]; the list is normalized so
/// that the primary display (when one is known) comes first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayRecord {
    /// Platform display name: the GDI device name (`\\.\DISPLAY1`) on
    /// Windows, the monitor product name on macOS, the X11 display string
    /// with a screen suffix (`:0.0`) on X11.
    pub name: String,
    /// Human-readable summary including position and size, suitable for
    /// display-selection UIs.
    pub description: String,
    /// Position of the top-left corner in the virtual desktop, in pixels.
    pub origin: (i32, i32),
    /// Width and height in pixels.
    pub size: (u32, u32),
    /// Whether this is the primary (or default) display. At most one record
    /// per enumeration carries this flag.
    pub is_primary: bool,
    /// Windows monitor device ID, `None` when `EnumDisplayDevicesW` could
    /// not report one (a profile cannot be installed for such a monitor).
    pub device_id: Option<String>,
    /// macOS `CGDirectDisplayID`, 0 elsewhere.
    pub cg_display_id: u32,
    /// X11 virtual screen number this display belongs to.
    pub virtual_screen: i32,
    /// Xinerama/XRandR screen index, kept in the server's
    /// Xinerama-compatible order.
    pub topology_index: i32,
    /// Screen index used for VideoLUT (RAMDAC) addressing.
    pub ramdac_index: i32,
    /// X11 root-window atom that may hold the associated ICC profile
    /// (`_ICC_PROFILE` or `_ICC_PROFILE_<n>`), 0 when not interned.
    pub icc_profile_atom: u64,
    /// XRandR output atom (`_ICC_PROFILE`) for per-output profiles, 0 when
    /// not interned.
    pub icc_profile_output_atom: u64,
    /// Raw EDID block: exactly 128 or 256 bytes, or empty when none could
    /// be retrieved.
    pub edid: Vec<u8>,
    /// XRandR CRTC XID driving this display, 0 when unknown.
    pub crtc: u64,
    /// XRandR output XID, 0 when unknown.
    pub output: u64,
}

impl DisplayRecord {
    /// The XRandR output XID, or 0 when the record did not come from the
    /// XRandR tier.
    pub fn xrandr_output_id(&self) -> u64 {
        self.output
    }
}

/// EDID blocks come in one or two 128-byte pages; anything else read back
/// from a property is noise and gets discarded.
pub(crate) fn is_valid_edid_len(len: usize) -> bool {
    len == 128 || len == 256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_are_empty() {
        let rec = DisplayRecord::default();
        assert!(rec.name.is_empty());
        assert!(rec.edid.is_empty());
        assert_eq!(rec.device_id, None);
        assert_eq!(rec.output, 0);
        assert_eq!(rec.xrandr_output_id(), 0);
        assert!(!rec.is_primary);
    }

    #[test]
    fn clone_is_deep() {
        let rec = DisplayRecord {
            name: ":0.0".to_string(),
            edid: vec![0u8; 128],
            ..Default::default()
        };
        let mut copy = rec.clone();
        copy.edid[0] = 0xff;
        copy.name.push('x');
        assert_eq!(rec.edid[0], 0);
        assert_eq!(rec.name, ":0.0");
    }

    #[test]
    fn edid_lengths() {
        assert!(is_valid_edid_len(128));
        assert!(is_valid_edid_len(256));
        assert!(!is_valid_edid_len(0));
        assert!(!is_valid_edid_len(127));
        assert!(!is_valid_edid_len(129));
        assert!(!is_valid_edid_len(512));
    }

    #[test]
    fn serializes_round_trip() {
        let rec = DisplayRecord {
            name: "\\\\.\\DISPLAY1".to_string(),
            description: "DISPLAY1, at 0, 0, width 1920, height 1080 (Primary Display)"
                .to_string(),
            origin: (0, 0),
            size: (1920, 1080),
            is_primary: true,
            device_id: Some("MONITOR\\DEL4026".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: DisplayRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
