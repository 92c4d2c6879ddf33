// src/backends/macos.rs

//! CoreGraphics display enumeration and physical size lookup.
//!
//! The active-display list and geometry come from CoreGraphics; monitor
//! product names come from the display's IOKit info dictionary. Name
//! lookups fail per display (yielding "(unknown)"), never the whole
//! enumeration.

use core_foundation::base::{CFType, TCFType};
use core_foundation::dictionary::{CFDictionary, CFDictionaryGetValueIfPresent, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::display::CGDisplay;
use log::{debug, error};
use std::os::raw::c_void;
use std::ptr;

use crate::options::EnumOptions;
use crate::record::DisplayRecord;

const MACH_PORT_NULL: u32 = 0;

// CGDisplayIOServicePort has been deprecated since 10.9 but remains the
// only route to the IOKit info dictionary that covers every display.
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGDisplayIOServicePort(display: u32) -> u32;
}

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    fn IODisplayCreateInfoDictionary(service: u32, options: u32) -> CFDictionaryRef;
}

fn describe(name: &str, origin: (i32, i32), size: (u32, u32), is_primary: bool) -> String {
    let mut description = format!(
        "{}, at {}, {}, width {}, height {}",
        name, origin.0, origin.1, size.0, size.1
    );
    if is_primary {
        description.push_str(" (Primary Display)");
    }
    description
}

fn dictionary_value(dict: CFDictionaryRef, key: &str) -> Option<*const c_void> {
    let key = CFString::new(key);
    let mut value: *const c_void = ptr::null();
    // SAFETY: valid dictionary and key; value is a plain local.
    let present = unsafe {
        CFDictionaryGetValueIfPresent(
            dict,
            key.as_concrete_TypeRef() as *const c_void,
            &mut value,
        )
    };
    if present != 0 && !value.is_null() {
        Some(value)
    } else {
        None
    }
}

/// English product name from the display's IOKit info dictionary; any
/// failure along the chain yields `None`.
fn product_name(display_id: u32) -> Option<String> {
    // SAFETY: plain value call; an unknown ID yields MACH_PORT_NULL.
    let port = unsafe { CGDisplayIOServicePort(display_id) };
    if port == MACH_PORT_NULL {
        debug!("no IO service port for display {}", display_id);
        return None;
    }
    // SAFETY: create rule, so the wrapper owns the dictionary and
    // releases it on drop.
    let info = unsafe {
        let dict = IODisplayCreateInfoDictionary(port, 0);
        if dict.is_null() {
            debug!("no info dictionary for display {}", display_id);
            return None;
        }
        CFDictionary::<CFString, CFType>::wrap_under_create_rule(dict)
    };
    let names = dictionary_value(info.as_concrete_TypeRef(), "DisplayProductName")?;
    let name = dictionary_value(names as CFDictionaryRef, "en_US")?;
    // SAFETY: get rule; the string is owned by the info dictionary, which
    // stays alive until `info` drops at the end of this scope.
    let name = unsafe { CFString::wrap_under_get_rule(name as CFStringRef) };
    Some(name.to_string())
}

/// Enumerates physical displays. Hard failures are logged and yield an
/// empty list.
pub(crate) fn enumerate(_options: &EnumOptions) -> Vec<DisplayRecord> {
    let ids = match CGDisplay::active_displays() {
        Ok(ids) => ids,
        Err(err) => {
            error!("CGGetActiveDisplayList failed with error {}", err);
            return Vec::new();
        }
    };
    if ids.is_empty() {
        error!("no active displays");
        return Vec::new();
    }
    debug!("found {} active display(s)", ids.len());

    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        let display = CGDisplay::new(id);
        let bounds = display.bounds();
        let origin = (bounds.origin.x as i32, bounds.origin.y as i32);
        let size = (bounds.size.width as u32, bounds.size.height as u32);
        let is_primary = display.is_main();
        let name = match product_name(id) {
            Some(name) => name,
            None => String::from("(unknown)"),
        };
        let record = DisplayRecord {
            description: describe(&name, origin, size, is_primary),
            name,
            origin,
            size,
            is_primary,
            cg_display_id: id,
            ..Default::default()
        };
        debug!("adding display '{}'", record.description);
        records.push(record);
    }
    records
}

/// Physical size in millimetres as CoreGraphics reports it. An unknown
/// display ID yields `(0, 0)`.
pub(crate) fn size_mm(record: &DisplayRecord) -> (u32, u32) {
    let size = CGDisplay::new(record.cg_display_id).screen_size();
    (size.width as u32, size.height as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_carries_name_and_geometry() {
        assert_eq!(
            describe("DELL U2415", (0, 0), (1920, 1200), false),
            "DELL U2415, at 0, 0, width 1920, height 1200"
        );
    }

    #[test]
    fn primary_display_is_annotated() {
        assert_eq!(
            describe("Color LCD", (0, 0), (2560, 1600), true),
            "Color LCD, at 0, 0, width 2560, height 1600 (Primary Display)"
        );
    }
}
