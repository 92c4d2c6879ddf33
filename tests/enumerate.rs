//! Public-API properties that hold on any machine, headless CI included:
//! enumeration may legitimately find nothing, but it must never panic,
//! violate the record invariants, or disagree with itself across calls.

use disppath::{
    enumerate_displays, physical_size_mm, select_display, xrandr_output_id, DisplayRecord,
    EnumOptions,
};

#[test_log::test]
fn enumeration_records_are_well_formed() {
    let options = EnumOptions::from_env();
    let displays = enumerate_displays(&options);
    for display in &displays {
        assert!(!display.name.is_empty(), "records always carry a name");
        assert!(
            !display.description.is_empty(),
            "records always carry a description"
        );
        assert!(
            matches!(display.edid.len(), 0 | 128 | 256),
            "EDID must be absent or a whole block, got {} bytes",
            display.edid.len()
        );
    }
}

#[test_log::test]
fn at_most_one_primary_and_it_is_first() {
    let options = EnumOptions::from_env();
    let displays = enumerate_displays(&options);
    let primaries = displays.iter().filter(|d| d.is_primary).count();
    assert!(primaries <= 1, "found {} primary displays", primaries);
    if primaries == 1 {
        assert!(displays[0].is_primary, "the primary display must be first");
    }
}

#[test_log::test]
fn enumeration_is_idempotent() {
    let options = EnumOptions::from_env();
    assert_eq!(enumerate_displays(&options), enumerate_displays(&options));
}

#[test_log::test]
fn selection_matches_enumeration() {
    let options = EnumOptions::from_env();
    let displays = enumerate_displays(&options);
    for (index, display) in displays.iter().enumerate() {
        assert_eq!(select_display(&options, index).as_ref(), Some(display));
    }
}

#[test_log::test]
fn selection_past_the_end_is_none() {
    let options = EnumOptions::from_env();
    let count = enumerate_displays(&options).len();
    assert!(select_display(&options, count).is_none());
    assert!(select_display(&options, usize::MAX).is_none());
}

#[test_log::test]
fn physical_size_lookup_never_panics() {
    let options = EnumOptions::from_env();
    for display in enumerate_displays(&options) {
        let (width_mm, height_mm) = physical_size_mm(&display);
        // Real monitors report a few hundred millimetres; anything
        // enormous means the platform handed back garbage.
        assert!(width_mm < 100_000, "width {} mm", width_mm);
        assert!(height_mm < 100_000, "height {} mm", height_mm);
    }
}

#[test]
fn default_record_has_no_physical_size() {
    let record = DisplayRecord::default();
    assert_eq!(physical_size_mm(&record), (0, 0));
    assert_eq!(xrandr_output_id(&record), 0);
}

#[test_log::test]
fn ignoring_every_optional_tier_still_enumerates_safely() {
    let options = EnumOptions {
        ignore_xrandr12: true,
        ignore_xinerama: true,
    };
    let displays = enumerate_displays(&options);
    let primaries = displays.iter().filter(|d| d.is_primary).count();
    assert!(primaries <= 1);
    for display in &displays {
        assert!(matches!(display.edid.len(), 0 | 128 | 256));
    }
}

#[test]
fn records_round_trip_through_serde() {
    let options = EnumOptions::from_env();
    let displays = enumerate_displays(&options);
    let body = serde_json::to_string(&displays).expect("display lists serialize");
    let back: Vec<DisplayRecord> =
        serde_json::from_str(&body).expect("display lists deserialize");
    assert_eq!(displays, back);
}
