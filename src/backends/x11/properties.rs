// src/backends/x11/properties.rs

//! Naming rules for the X11 properties this backend reads or publishes:
//! the `_ICC_PROFILE` root-window atoms and the per-monitor EDID
//! properties. Kept free of Xlib calls so the rules are testable anywhere.

/// Root-window atom that may hold the ICC profile for a monitor.
///
/// The first monitor of a screen uses the bare name; later monitors get
/// their topology index as a suffix.
pub(crate) fn icc_root_atom_name(topology_index: i32) -> String {
    if topology_index == 0 {
        "_ICC_PROFILE".to_string()
    } else {
        format!("_ICC_PROFILE_{}", topology_index)
    }
}

/// XRandR output property holding a per-output ICC profile. Unlike the
/// root-window atom this is not indexed; each output carries its own.
pub(crate) const ICC_OUTPUT_ATOM_NAME: &str = "_ICC_PROFILE";

/// XRandR output properties that may carry the EDID, in probe order.
pub(crate) const OUTPUT_EDID_PROPERTIES: [&str; 2] = ["EDID_DATA", "EDID"];

/// Root-window EDID properties published by legacy DDC drivers, in probe
/// order, suffixed with the topology index for monitors past the first.
pub(crate) fn legacy_edid_property_names(topology_index: i32) -> [String; 2] {
    if topology_index == 0 {
        [
            "XFree86_DDC_EDID1_RAWDATA".to_string(),
            "XFree86_DDC_EDID2_RAWDATA".to_string(),
        ]
    } else {
        [
            format!("XFree86_DDC_EDID1_RAWDATA_{}", topology_index),
            format!("XFree86_DDC_EDID2_RAWDATA_{}", topology_index),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_monitor_uses_bare_icc_atom() {
        assert_eq!(icc_root_atom_name(0), "_ICC_PROFILE");
    }

    #[test]
    fn later_monitors_get_indexed_icc_atoms() {
        assert_eq!(icc_root_atom_name(1), "_ICC_PROFILE_1");
        assert_eq!(icc_root_atom_name(7), "_ICC_PROFILE_7");
    }

    #[test]
    fn legacy_edid_names_for_first_screen() {
        let names = legacy_edid_property_names(0);
        assert_eq!(names[0], "XFree86_DDC_EDID1_RAWDATA");
        assert_eq!(names[1], "XFree86_DDC_EDID2_RAWDATA");
    }

    #[test]
    fn legacy_edid_names_are_suffixed_past_the_first() {
        let names = legacy_edid_property_names(2);
        assert_eq!(names[0], "XFree86_DDC_EDID1_RAWDATA_2");
        assert_eq!(names[1], "XFree86_DDC_EDID2_RAWDATA_2");
    }

    #[test]
    fn edid_data_is_probed_before_edid() {
        assert_eq!(OUTPUT_EDID_PROPERTIES, ["EDID_DATA", "EDID"]);
    }
}
