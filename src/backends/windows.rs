// src/backends/windows.rs

//! GDI display enumeration and physical size lookup.
//!
//! `EnumDisplayMonitors` walks the visible monitors; a second pass asks
//! `EnumDisplayDevicesW` for each monitor's device ID, the handle profile
//! management needs. That symbol is resolved from user32 at runtime and
//! without it no monitor can be matched to a device, so enumeration
//! refuses to run at all.

use libloading::Library;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use std::mem;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{
    CreateDCW, DeleteDC, EnumDisplayMonitors, GetDeviceCaps, GetMonitorInfoW, DISPLAY_DEVICEW,
    HDC, HMONITOR, HORZSIZE, MONITORINFO, MONITORINFOEXW, MONITORINFOF_PRIMARY, VERTSIZE,
};

use crate::options::EnumOptions;
use crate::record::DisplayRecord;

/// Mirror drivers and other invisible pseudo-displays use this device
/// name prefix; they cannot be calibrated.
const PSEUDO_DISPLAY_PREFIX: &str = r"\\.\DISPLAYV";

type EnumDisplayDevicesWFn =
    unsafe extern "system" fn(PCWSTR, u32, *mut DISPLAY_DEVICEW, u32) -> BOOL;

static ENUM_DISPLAY_DEVICES: Lazy<Option<EnumDisplayDevicesWFn>> = Lazy::new(|| {
    // SAFETY: loading a system library and looking up one symbol with the
    // signature user32 publishes for it.
    let lib = match unsafe { Library::new("user32.dll") } {
        Ok(lib) => lib,
        Err(err) => {
            debug!("user32.dll not loadable: {}", err);
            return None;
        }
    };
    let f = unsafe { lib.get::<EnumDisplayDevicesWFn>(b"EnumDisplayDevicesW\0") }
        .map(|sym| *sym)
        .ok();
    // The cached function pointer must outlive the Library handle, so the
    // library stays mapped for the life of the process.
    mem::forget(lib);
    f
});

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn wide_cstring(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn is_pseudo_display(name: &str) -> bool {
    name.starts_with(PSEUDO_DISPLAY_PREFIX)
}

/// `\\.\DISPLAY1` reads better without its device prefix.
fn describe(device: &str, origin: (i32, i32), size: (u32, u32), is_primary: bool) -> String {
    let short = device.strip_prefix(r"\\.\").unwrap_or(device);
    let mut description = format!(
        "{}, at {}, {}, width {}, height {}",
        short, origin.0, origin.1, size.0, size.1
    );
    if is_primary {
        description.push_str(" (Primary Display)");
    }
    description
}

extern "system" fn monitor_callback(
    monitor: HMONITOR,
    _dc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    // SAFETY: lparam carries the Vec passed by enumerate below, and the
    // callback only runs during that call.
    let records = unsafe { &mut *(lparam.0 as *mut Vec<DisplayRecord>) };

    let mut info = MONITORINFOEXW::default();
    info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;
    // SAFETY: valid monitor handle; cbSize identifies the extended struct.
    let ok = unsafe {
        GetMonitorInfoW(
            monitor,
            &mut info as *mut MONITORINFOEXW as *mut MONITORINFO,
        )
    };
    if !ok.as_bool() {
        debug!("GetMonitorInfoW failed; monitor skipped");
        return TRUE;
    }

    let name = wide_to_string(&info.szDevice);
    if is_pseudo_display(&name) {
        debug!("skipping pseudo display {}", name);
        return TRUE;
    }

    let rect = info.monitorInfo.rcMonitor;
    let origin = (rect.left, rect.top);
    let size = (
        (rect.right - rect.left).max(0) as u32,
        (rect.bottom - rect.top).max(0) as u32,
    );
    let is_primary = (info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY) != 0;

    let record = DisplayRecord {
        description: describe(&name, origin, size, is_primary),
        name,
        origin,
        size,
        is_primary,
        ..Default::default()
    };
    debug!("adding monitor '{}'", record.description);
    records.push(record);
    TRUE
}

/// Asks user32 for the device ID backing a GDI device name.
fn device_id(enum_devices: EnumDisplayDevicesWFn, device_name: &str) -> Option<String> {
    let wide = wide_cstring(device_name);
    let mut device = DISPLAY_DEVICEW {
        cb: mem::size_of::<DISPLAY_DEVICEW>() as u32,
        ..Default::default()
    };
    // SAFETY: wide outlives the call; cb identifies the struct.
    let ok = unsafe { enum_devices(PCWSTR(wide.as_ptr()), 0, &mut device, 0) };
    if !ok.as_bool() {
        return None;
    }
    Some(wide_to_string(&device.DeviceID))
}

/// Enumerates physical displays. Hard failures are logged and yield an
/// empty list.
pub(crate) fn enumerate(_options: &EnumOptions) -> Vec<DisplayRecord> {
    let enum_devices = match *ENUM_DISPLAY_DEVICES {
        Some(f) => f,
        None => {
            error!("EnumDisplayDevicesW unavailable; cannot enumerate displays");
            return Vec::new();
        }
    };

    let mut records: Vec<DisplayRecord> = Vec::new();
    // SAFETY: the callback dereferences lparam only as the Vec above and
    // only for the duration of this call.
    let ok = unsafe {
        EnumDisplayMonitors(
            None,
            None,
            Some(monitor_callback),
            LPARAM(&mut records as *mut _ as isize),
        )
    };
    if !ok.as_bool() {
        error!("EnumDisplayMonitors failed");
        return Vec::new();
    }

    for record in &mut records {
        record.device_id = device_id(enum_devices, &record.name);
        if record.device_id.is_none() {
            warn!("EnumDisplayDevicesW failed for {}", record.name);
        }
    }
    records
}

/// Physical size in millimetres as GDI reports it for the record's
/// device. Any failure yields `(0, 0)`.
pub(crate) fn size_mm(record: &DisplayRecord) -> (u32, u32) {
    if record.name.is_empty() {
        return (0, 0);
    }
    let wide = wide_cstring(&record.name);
    // SAFETY: the device name acts as the driver argument; wide outlives
    // the call.
    let hdc = unsafe { CreateDCW(PCWSTR(wide.as_ptr()), PCWSTR::null(), PCWSTR::null(), None) };
    if hdc.is_invalid() {
        debug!("CreateDCW failed for {}", record.name);
        return (0, 0);
    }
    // SAFETY: valid DC, deleted below.
    let width = unsafe { GetDeviceCaps(Some(hdc), HORZSIZE) };
    // SAFETY: as above.
    let height = unsafe { GetDeviceCaps(Some(hdc), VERTSIZE) };
    // SAFETY: hdc came from CreateDCW and is deleted exactly once.
    let _ = unsafe { DeleteDC(hdc) };
    (width.max(0) as u32, height.max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_displays_are_detected() {
        assert!(is_pseudo_display(r"\\.\DISPLAYV1"));
        assert!(!is_pseudo_display(r"\\.\DISPLAY1"));
    }

    #[test]
    fn description_drops_the_device_prefix() {
        assert_eq!(
            describe(r"\\.\DISPLAY1", (0, 0), (1920, 1080), false),
            "DISPLAY1, at 0, 0, width 1920, height 1080"
        );
    }

    #[test]
    fn primary_display_is_annotated() {
        assert_eq!(
            describe(r"\\.\DISPLAY2", (-1920, 0), (1920, 1200), true),
            "DISPLAY2, at -1920, 0, width 1920, height 1200 (Primary Display)"
        );
    }

    #[test]
    fn wide_strings_stop_at_the_terminator() {
        let wide = [0x44, 0x50, 0, 0x78];
        assert_eq!(wide_to_string(&wide), "DP");
        assert_eq!(wide_to_string(&[0]), "");
    }
}
