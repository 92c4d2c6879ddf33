// src/backends/x11/mod.rs

//! X11 display enumeration and physical size lookup.
//!
//! Three tiers, in order of preference: XRandR 1.2+ per-output, Xinerama
//! per-head, plain X screens. One connection serves a whole enumeration;
//! the physical size lookup opens its own short-lived connection against
//! the record's screen.

mod connection;
mod error_trap;
mod legacy;
mod properties;
mod randr;

use log::{debug, error};
use x11::xlib;

use crate::options::{EnumOptions, IGNORE_XRANDR_ENV};
use crate::record::DisplayRecord;
use connection::Connection;

/// Display name enumeration connects to: `$DISPLAY` with its screen
/// suffix normalized to `.0`, or `":0.0"` when unset or empty.
fn normalized_display_name() -> String {
    match std::env::var("DISPLAY") {
        Ok(name) if !name.is_empty() => normalize_display_name(&name),
        _ => String::from(":0.0"),
    }
}

/// `:1` becomes `:1.0`, `:1.` becomes `:1.0`, `:1.23` becomes `:1.0`.
/// Names without a colon pass through unchanged.
fn normalize_display_name(raw: &str) -> String {
    let colon = match raw.rfind(':') {
        Some(pos) => pos,
        None => return raw.to_string(),
    };
    match raw[colon..].find('.') {
        None => format!("{}.0", raw),
        Some(rel) => {
            let dot = colon + rel;
            format!("{}0", &raw[..=dot])
        }
    }
}

/// Rewrites the screen suffix of a display name: `":0.0"` with screen 2
/// becomes `":0.2"`. Names without a colon-dot pair pass through
/// unchanged.
fn name_with_screen(name: &str, screen: i32) -> String {
    let colon = match name.rfind(':') {
        Some(pos) => pos,
        None => return name.to_string(),
    };
    match name[colon..].find('.') {
        None => name.to_string(),
        Some(rel) => {
            let dot = colon + rel;
            format!("{}.{}", &name[..dot], screen)
        }
    }
}

/// Enumerates physical displays. Hard failures are logged and yield an
/// empty list.
pub(crate) fn enumerate(options: &EnumOptions) -> Vec<DisplayRecord> {
    let name = normalized_display_name();
    let conn = match Connection::open(&name) {
        Ok(conn) => conn,
        Err(err) => {
            error!("display enumeration failed: {:#}", err);
            return Vec::new();
        }
    };

    let tier_a = if options.ignore_xrandr12 {
        debug!("XRandR 1.2 enumeration disabled by {}", IGNORE_XRANDR_ENV);
        None
    } else {
        match randr::enumerate(&conn, &name) {
            Ok(records) => records,
            Err(err) => {
                error!("display enumeration failed: {:#}", err);
                return Vec::new();
            }
        }
    };

    match tier_a {
        Some(records) => records,
        None => match legacy::enumerate(&conn, &name, options) {
            Ok(records) => records,
            Err(err) => {
                error!("display enumeration failed: {:#}", err);
                Vec::new()
            }
        },
    }
}

/// Physical size in millimetres as the X server reports it for the
/// record's screen. Any failure yields `(0, 0)`.
pub(crate) fn size_mm(record: &DisplayRecord) -> (u32, u32) {
    if record.name.is_empty() {
        // A default record names no display; XOpenDisplay treats ""
        // like $DISPLAY and would answer for an unrelated screen.
        return (0, 0);
    }
    let name = name_with_screen(&record.name, record.virtual_screen);
    let conn = match Connection::open(&name) {
        Ok(conn) => conn,
        Err(err) => {
            debug!("physical size unavailable: {:#}", err);
            return (0, 0);
        }
    };
    let screen = record.virtual_screen;
    if screen < 0 || screen >= conn.screen_count() {
        debug!("physical size unavailable: screen {} out of range", screen);
        return (0, 0);
    }
    // SAFETY: valid display and in-range screen index.
    let width = unsafe { xlib::XDisplayWidthMM(conn.display(), screen) };
    // SAFETY: as above.
    let height = unsafe { xlib::XDisplayHeightMM(conn.display(), screen) };
    (width.max(0) as u32, height.max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_gain_a_screen_zero_suffix() {
        assert_eq!(normalize_display_name(":0"), ":0.0");
        assert_eq!(normalize_display_name(":1"), ":1.0");
        assert_eq!(normalize_display_name("localhost:10"), "localhost:10.0");
    }

    #[test]
    fn trailing_dot_gets_a_zero() {
        assert_eq!(normalize_display_name(":0."), ":0.0");
    }

    #[test]
    fn nonzero_screen_suffixes_are_reset() {
        assert_eq!(normalize_display_name(":1.23"), ":1.0");
        assert_eq!(normalize_display_name("host:0.5"), "host:0.0");
    }

    #[test]
    fn already_normalized_names_are_unchanged() {
        assert_eq!(normalize_display_name(":0.0"), ":0.0");
    }

    #[test]
    fn names_without_a_colon_pass_through() {
        assert_eq!(normalize_display_name("wayland-0"), "wayland-0");
    }

    #[test]
    fn screen_rewrite_replaces_the_suffix() {
        assert_eq!(name_with_screen(":0.0", 2), ":0.2");
        assert_eq!(name_with_screen("host:1.0", 1), "host:1.1");
        assert_eq!(name_with_screen(":1.23", 0), ":1.0");
    }

    #[test]
    fn screen_rewrite_without_a_suffix_is_a_noop() {
        assert_eq!(name_with_screen(":0", 2), ":0");
        assert_eq!(name_with_screen("wayland-0", 1), "wayland-0");
    }
}
