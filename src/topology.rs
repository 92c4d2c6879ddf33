// src/topology.rs

//! Normalizes the backend output into the canonical order: the primary
//! display, when one is known, comes first.

use crate::backends;
use crate::options::EnumOptions;
use crate::record::DisplayRecord;

/// Moves the primary record to the front of the list.
///
/// Backends mark at most one record with `is_primary`; this swap makes
/// index 0 the default choice for callers that calibrate "the" display.
/// Lists without a primary record keep their backend order.
pub(crate) fn promote_primary(records: &mut [DisplayRecord]) {
    if let Some(pos) = records.iter().position(|r| r.is_primary) {
        if pos > 0 {
            records.swap(0, pos);
        }
    }
}

/// One full enumeration in canonical order.
pub(crate) fn enumerate(options: &EnumOptions) -> Vec<DisplayRecord> {
    let mut records = backends::enumerate(options);
    promote_primary(&mut records);
    records
}

/// The record at `index` of a fresh enumeration, `None` out of range.
/// Indices are only stable within one enumeration of an unchanged
/// topology.
pub(crate) fn select(options: &EnumOptions, index: usize) -> Option<DisplayRecord> {
    enumerate(options).into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, primary: bool) -> DisplayRecord {
        DisplayRecord {
            name: name.to_string(),
            is_primary: primary,
            ..Default::default()
        }
    }

    #[test]
    fn no_primary_keeps_order() {
        let mut records = vec![named("a", false), named("b", false)];
        promote_primary(&mut records);
        assert_eq!(records[0].name, "a");
        assert_eq!(records[1].name, "b");
    }

    #[test]
    fn primary_already_first_is_untouched() {
        let mut records = vec![named("a", true), named("b", false)];
        promote_primary(&mut records);
        assert_eq!(records[0].name, "a");
    }

    #[test]
    fn mid_list_primary_swaps_to_front() {
        let mut records = vec![named("a", false), named("b", false), named("c", true)];
        promote_primary(&mut records);
        assert_eq!(records[0].name, "c");
        // Swap, not rotation: the displaced head takes the primary's slot.
        assert_eq!(records[1].name, "b");
        assert_eq!(records[2].name, "a");
    }

    #[test]
    fn empty_list_is_fine() {
        let mut records: Vec<DisplayRecord> = Vec::new();
        promote_primary(&mut records);
        assert!(records.is_empty());
    }
}
