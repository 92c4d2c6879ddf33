// src/backends/x11/legacy.rs

//! Xinerama and plain-screen enumeration, for servers without usable
//! XRandR 1.2.
//!
//! Xinerama presents every head inside one virtual X screen, so records
//! carry screen suffix `.0` and per-head topology indices. Without
//! Xinerama each X screen is its own display. Monitor labels come from
//! XF86VidMode when the driver implements it, EDID from the root-window
//! properties older servers publish.

use anyhow::{bail, Result};
use libc::{c_int, c_uchar, c_ulong, c_void};
use log::{debug, warn};
use std::ffi::CStr;
use std::{mem, ptr, slice};
use x11::{xf86vmode, xinerama, xlib};

use super::connection::Connection;
use super::error_trap::ErrorTrap;
use super::name_with_screen;
use super::properties::{icc_root_atom_name, legacy_edid_property_names};
use crate::options::{EnumOptions, IGNORE_XINERAMA_ENV};
use crate::record::{is_valid_edid_len, DisplayRecord};

fn describe(label: &str, origin: (i32, i32), size: (u32, u32)) -> String {
    format!(
        "{} at {}, {}, width {}, height {}",
        label, origin.0, origin.1, size.0, size.1
    )
}

/// `Ok(None)` when Xinerama is absent or inactive; a failing query aborts
/// the enumeration.
fn xinerama_heads(
    dpy: *mut xlib::Display,
) -> Result<Option<Vec<xinerama::XineramaScreenInfo>>> {
    let mut event_base: c_int = 0;
    let mut error_base: c_int = 0;
    // SAFETY: valid display; out-parameters are plain locals.
    let active = unsafe {
        xinerama::XineramaQueryExtension(dpy, &mut event_base, &mut error_base) != 0
            && xinerama::XineramaIsActive(dpy) != 0
    };
    if !active {
        debug!("Xinerama not present or not active");
        return Ok(None);
    }
    let mut head_count: c_int = 0;
    // SAFETY: valid display; the returned array is copied and then freed.
    let info = unsafe { xinerama::XineramaQueryScreens(dpy, &mut head_count) };
    if info.is_null() || head_count <= 0 {
        if !info.is_null() {
            // SAFETY: the array came from the Xlib allocator.
            unsafe { xlib::XFree(info as *mut c_void) };
        }
        bail!("XineramaQueryScreens failed");
    }
    // SAFETY: the server returned head_count entries.
    let heads = unsafe { slice::from_raw_parts(info, head_count as usize) }.to_vec();
    // SAFETY: the array came from the Xlib allocator.
    unsafe { xlib::XFree(info as *mut c_void) };
    Ok(Some(heads))
}

/// Reads an EDID block from the root-window properties older servers
/// publish, accepting only well-formed 128/256-byte blocks.
fn root_window_edid(conn: &Connection, screen: i32, topology_index: i32) -> Vec<u8> {
    let root = conn.root_window(screen);
    for name in legacy_edid_property_names(topology_index) {
        let atom = match conn.find_atom(&name) {
            Some(atom) => atom,
            None => continue,
        };
        let mut actual_type: xlib::Atom = 0;
        let mut actual_format: c_int = 0;
        let mut item_count: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();
        // SAFETY: valid display/window/atom; out-parameters are plain
        // locals and `data` is freed with XFree below on every path.
        let status = unsafe {
            xlib::XGetWindowProperty(
                conn.display(),
                root,
                atom,
                0,
                0x7ffffff,
                xlib::False,
                xlib::XA_INTEGER,
                &mut actual_type,
                &mut actual_format,
                &mut item_count,
                &mut bytes_after,
                &mut data,
            )
        };
        let mut edid = Vec::new();
        if status == 0 && !data.is_null() && is_valid_edid_len(item_count as usize) {
            // SAFETY: the server returned at least item_count bytes.
            edid = unsafe { slice::from_raw_parts(data, item_count as usize) }.to_vec();
        }
        if !data.is_null() {
            // SAFETY: property data came from the Xlib allocator.
            unsafe { xlib::XFree(data as *mut c_void) };
        }
        if !edid.is_empty() {
            debug!("got EDID ({} bytes) from root property {}", edid.len(), name);
            return edid;
        }
    }
    Vec::new()
}

/// Labels the monitor with its XF86VidMode model string when available,
/// else a 1-based ordinal.
fn monitor_label(conn: &Connection, screen: i32, ordinal: usize) -> String {
    let dpy = conn.display();
    let mut event_base: c_int = 0;
    let mut error_base: c_int = 0;
    // SAFETY: valid display; out-parameters are plain locals.
    if unsafe { xf86vmode::XF86VidModeQueryExtension(dpy, &mut event_base, &mut error_base) } != 0
    {
        // Some proprietary multi-screen drivers (TwinView, MergedFB)
        // implement XVidMode incompletely; the error trap absorbs any
        // protocol complaint about the screen argument.
        // SAFETY: zeroed means the pointer fields are NULL until the
        // server fills them in.
        let mut monitor: xf86vmode::XF86VidModeMonitor = unsafe { mem::zeroed() };
        // SAFETY: valid display; monitor is a plain local.
        if unsafe { xf86vmode::XF86VidModeGetMonitor(dpy, screen, &mut monitor) } != 0 {
            let model = if monitor.model.is_null() {
                String::new()
            } else {
                // SAFETY: non-NULL model is a NUL-terminated string owned
                // by Xlib until freed below.
                unsafe { CStr::from_ptr(monitor.model) }
                    .to_string_lossy()
                    .into_owned()
            };
            // SAFETY: the call succeeded, so every non-NULL field came
            // from the Xlib allocator and is freed exactly once.
            unsafe {
                for field in [
                    monitor.vendor as *mut c_void,
                    monitor.model as *mut c_void,
                    monitor.hsync as *mut c_void,
                    monitor.vsync as *mut c_void,
                ] {
                    if !field.is_null() {
                        xlib::XFree(field);
                    }
                }
            }
            if !model.is_empty() {
                return model;
            }
        }
    }
    format!("Monitor {}", ordinal + 1)
}

/// ICC atom, EDID and description, shared by both legacy tiers.
fn finish_record(conn: &Connection, record: &mut DisplayRecord, ordinal: usize) {
    match conn.intern_atom(&icc_root_atom_name(record.topology_index)) {
        Ok(atom) => record.icc_profile_atom = atom as u64,
        Err(err) => warn!("{:#}", err),
    }
    record.edid = root_window_edid(conn, record.virtual_screen, record.topology_index);
    let label = monitor_label(conn, record.topology_index, ordinal);
    record.description = describe(&label, record.origin, record.size);
}

/// Enumerates displays through Xinerama, or failing that one record per
/// plain X screen. Errors abort the whole enumeration.
pub(super) fn enumerate(
    conn: &Connection,
    base_name: &str,
    options: &EnumOptions,
) -> Result<Vec<DisplayRecord>> {
    let dpy = conn.display();
    let _trap = ErrorTrap::install();

    let heads = if options.ignore_xinerama {
        debug!("Xinerama enumeration disabled by {}", IGNORE_XINERAMA_ENV);
        None
    } else {
        xinerama_heads(dpy)?
    };

    let mut records = Vec::new();
    match heads {
        Some(heads) => {
            debug!("enumerating {} Xinerama head(s)", heads.len());
            for (i, head) in heads.iter().enumerate() {
                let index = i as i32;
                let mut record = DisplayRecord {
                    name: name_with_screen(base_name, 0),
                    origin: (head.x_org as i32, head.y_org as i32),
                    size: (head.width.max(0) as u32, head.height.max(0) as u32),
                    virtual_screen: 0,
                    topology_index: index,
                    ramdac_index: index,
                    ..Default::default()
                };
                finish_record(conn, &mut record, i);
                debug!("adding Xinerama head {} as '{}'", i, record.description);
                records.push(record);
            }
        }
        None => {
            let screen_count = conn.screen_count();
            debug!("enumerating {} plain X screen(s)", screen_count);
            for screen in 0..screen_count {
                // SAFETY: valid display and in-range screen index.
                let width = unsafe { xlib::XDisplayWidth(dpy, screen) };
                // SAFETY: as above.
                let height = unsafe { xlib::XDisplayHeight(dpy, screen) };
                let mut record = DisplayRecord {
                    name: name_with_screen(base_name, screen),
                    origin: (0, 0),
                    size: (width.max(0) as u32, height.max(0) as u32),
                    virtual_screen: screen,
                    topology_index: screen,
                    ramdac_index: screen,
                    ..Default::default()
                };
                finish_record(conn, &mut record, screen as usize);
                debug!("adding X screen {} as '{}'", screen, record.description);
                records.push(record);
            }
            // The default screen is the default display.
            let default_screen = conn.default_screen();
            if let Some(record) = records.get_mut(default_screen as usize) {
                record.is_primary = true;
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_carries_label_and_geometry() {
        assert_eq!(
            describe("Monitor 1", (0, 0), (1920, 1080)),
            "Monitor 1 at 0, 0, width 1920, height 1080"
        );
    }

    #[test]
    fn description_keeps_negative_origins() {
        assert_eq!(
            describe("DELL U2415", (-1920, 200), (1920, 1200)),
            "DELL U2415 at -1920, 200, width 1920, height 1200"
        );
    }
}
