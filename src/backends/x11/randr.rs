// src/backends/x11/randr.rs

//! XRandR 1.2+ enumeration: one record per connected output.
//!
//! The walk visits CRTCs and outputs in the same order the X server's
//! Xinerama compatibility layer reports them (primary first, the rest in
//! index order), so the topology indices handed out here agree with what
//! Xinerama-based applications see.
//!
//! Calibration needs VideoLUT access; if `XRRGetCrtcGamma` cannot deliver
//! it for any display, everything gathered here is thrown away and the
//! caller falls back to the older extensions.

use anyhow::{bail, Result};
use libc::{c_int, c_uchar, c_ulong, c_ushort, c_void};
use libloading::Library;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::{mem, ptr, slice};
use x11::{xlib, xrandr};

use super::connection::Connection;
use super::error_trap::ErrorTrap;
use super::name_with_screen;
use super::properties::{icc_root_atom_name, ICC_OUTPUT_ATOM_NAME, OUTPUT_EDID_PROPERTIES};
use crate::record::{is_valid_edid_len, DisplayRecord};

/// `RR_Disconnected` from randr.h. Outputs reporting `UnknownConnection`
/// are kept; only definitely-disconnected ones are skipped.
const RR_DISCONNECTED: c_ushort = 1;

type GetScreenResourcesCurrentFn =
    unsafe extern "C" fn(*mut xlib::Display, xlib::Window) -> *mut xrandr::XRRScreenResources;
type GetOutputPrimaryFn =
    unsafe extern "C" fn(*mut xlib::Display, xlib::Window) -> xrandr::RROutput;

/// Entry points added in XRandR 1.3, resolved at runtime so a binary built
/// against 1.3 headers still runs with an older libXrandr.
struct RandrCaps {
    get_screen_resources_current: Option<GetScreenResourcesCurrentFn>,
    get_output_primary: Option<GetOutputPrimaryFn>,
}

static CAPS: Lazy<RandrCaps> = Lazy::new(|| {
    // The unversioned name only exists with the dev package installed;
    // try the stable soname as well.
    for lib_name in ["libXrandr.so", "libXrandr.so.2"] {
        // SAFETY: loading a system library and looking up two symbols with
        // the signatures libXrandr publishes for them.
        let lib = match unsafe { Library::new(lib_name) } {
            Ok(lib) => lib,
            Err(_) => continue,
        };
        let current = unsafe {
            lib.get::<GetScreenResourcesCurrentFn>(b"XRRGetScreenResourcesCurrent\0")
        }
        .map(|sym| *sym)
        .ok();
        let primary = unsafe { lib.get::<GetOutputPrimaryFn>(b"XRRGetOutputPrimary\0") }
            .map(|sym| *sym)
            .ok();
        // The cached function pointers must outlive the Library handle, so
        // the library stays mapped for the life of the process.
        mem::forget(lib);
        debug!(
            "XRandR 1.3 entry points from {}: current={} primary={}",
            lib_name,
            current.is_some(),
            primary.is_some()
        );
        return RandrCaps {
            get_screen_resources_current: current,
            get_output_primary: primary,
        };
    }
    debug!("libXrandr not loadable; using XRandR 1.2 calls only");
    RandrCaps {
        get_screen_resources_current: None,
        get_output_primary: None,
    }
});

/// Descriptions number monitors 1-based across all screens; outputs after
/// the first on a CRTC show the same pixels and are labelled as clones.
fn describe_output(
    ordinal: usize,
    output_name: &str,
    origin: (i32, i32),
    size: (u32, u32),
    clone_of: Option<&str>,
) -> String {
    let mut description = format!(
        "Monitor {}, Output {} at {}, {}, width {}, height {}",
        ordinal, output_name, origin.0, origin.1, size.0, size.1
    );
    if let Some(first) = clone_of {
        description.push_str(&format!("[ Clone of {} ]", first));
    }
    description
}

/// Visit order that puts the primary element first and keeps everything
/// else in index order. `primary` values out of range fall back to the
/// natural order.
fn rotate_primary_first(count: usize, primary: Option<usize>) -> Vec<usize> {
    match primary {
        Some(p) if p < count => {
            let mut order = Vec::with_capacity(count);
            order.push(p);
            order.extend((0..count).filter(|&j| j != p));
            order
        }
        _ => (0..count).collect(),
    }
}

struct ScreenResources {
    ptr: *mut xrandr::XRRScreenResources,
}

impl ScreenResources {
    /// Prefers the 1.3 current-variant (no server-side re-probe) when the
    /// running libXrandr has it.
    fn fetch(
        dpy: *mut xlib::Display,
        root: xlib::Window,
        current: Option<GetScreenResourcesCurrentFn>,
    ) -> Option<Self> {
        // SAFETY: valid display and root window; both calls return either
        // NULL or a resource block we free on drop.
        let ptr = match current {
            Some(f) => unsafe { f(dpy, root) },
            None => unsafe { xrandr::XRRGetScreenResources(dpy, root) },
        };
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr })
        }
    }

    fn raw(&self) -> *mut xrandr::XRRScreenResources {
        self.ptr
    }

    fn crtcs(&self) -> &[xrandr::RRCrtc] {
        // SAFETY: ncrtc/crtcs describe a server-allocated array valid until
        // the resources are freed.
        let n = unsafe { (*self.ptr).ncrtc };
        if n <= 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts((*self.ptr).crtcs, n as usize) }
    }
}

impl Drop for ScreenResources {
    fn drop(&mut self) {
        // SAFETY: ptr came from XRRGetScreenResources[Current] and is freed
        // exactly once.
        unsafe { xrandr::XRRFreeScreenResources(self.ptr) };
    }
}

struct CrtcInfo {
    ptr: *mut xrandr::XRRCrtcInfo,
}

impl CrtcInfo {
    fn fetch(
        dpy: *mut xlib::Display,
        res: &ScreenResources,
        crtc: xrandr::RRCrtc,
    ) -> Option<Self> {
        // SAFETY: valid display/resources; NULL is checked before use.
        let ptr = unsafe { xrandr::XRRGetCrtcInfo(dpy, res.raw(), crtc) };
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr })
        }
    }

    fn has_live_mode(&self) -> bool {
        // SAFETY: ptr is valid until drop.
        unsafe { (*self.ptr).mode != 0 }
    }

    fn geometry(&self) -> (i32, i32, u32, u32) {
        // SAFETY: ptr is valid until drop.
        let info = unsafe { &*self.ptr };
        (info.x, info.y, info.width, info.height)
    }

    fn outputs(&self) -> &[xrandr::RROutput] {
        // SAFETY: noutput/outputs describe a server-allocated array valid
        // until the info is freed.
        let n = unsafe { (*self.ptr).noutput };
        if n <= 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts((*self.ptr).outputs, n as usize) }
    }
}

impl Drop for CrtcInfo {
    fn drop(&mut self) {
        // SAFETY: ptr came from XRRGetCrtcInfo and is freed exactly once.
        unsafe { xrandr::XRRFreeCrtcInfo(self.ptr) };
    }
}

struct OutputInfo {
    ptr: *mut xrandr::XRROutputInfo,
}

impl OutputInfo {
    fn fetch(
        dpy: *mut xlib::Display,
        res: &ScreenResources,
        output: xrandr::RROutput,
    ) -> Option<Self> {
        // SAFETY: valid display/resources; NULL is checked before use.
        let ptr = unsafe { xrandr::XRRGetOutputInfo(dpy, res.raw(), output) };
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr })
        }
    }

    fn is_disconnected(&self) -> bool {
        // SAFETY: ptr is valid until drop.
        unsafe { (*self.ptr).connection == RR_DISCONNECTED }
    }

    fn name(&self) -> String {
        // SAFETY: name/nameLen describe a server-allocated string valid
        // until the info is freed.
        let info = unsafe { &*self.ptr };
        if info.name.is_null() || info.nameLen <= 0 {
            return String::new();
        }
        let bytes = unsafe { slice::from_raw_parts(info.name as *const u8, info.nameLen as usize) };
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Drop for OutputInfo {
    fn drop(&mut self) {
        // SAFETY: ptr came from XRRGetOutputInfo and is freed exactly once.
        unsafe { xrandr::XRRFreeOutputInfo(self.ptr) };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PrimaryPosition {
    crtc_index: usize,
    output_index: usize,
}

/// Finds the CRTC/output indices carrying the server's primary output, the
/// same way the server's Xinerama layer does: only CRTCs with a live mode
/// and at least one output count.
fn locate_primary(
    infos: &[Option<CrtcInfo>],
    primary: xrandr::RROutput,
) -> Option<PrimaryPosition> {
    if primary == 0 {
        return None;
    }
    let mut found = None;
    for (j, info) in infos.iter().enumerate() {
        let crtci = match info.as_ref() {
            Some(info) => info,
            None => continue,
        };
        if !crtci.has_live_mode() || crtci.outputs().is_empty() {
            continue;
        }
        for (k, &output_id) in crtci.outputs().iter().enumerate() {
            if output_id == primary {
                found = Some(PrimaryPosition {
                    crtc_index: j,
                    output_index: k,
                });
            }
        }
    }
    if found.is_none() {
        debug!("primary output {} not found on any live CRTC", primary);
    }
    found
}

/// What the walk planner needs to know about one CRTC: whether it is
/// usable (live mode, at least one output) and how many outputs it
/// drives. A failed `XRRGetCrtcInfo` fetch summarizes as unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CrtcSummary {
    usable: bool,
    output_count: usize,
}

impl CrtcSummary {
    fn of(info: Option<&CrtcInfo>) -> Self {
        match info {
            Some(info) => Self {
                usable: info.has_live_mode() && !info.outputs().is_empty(),
                output_count: info.outputs().len(),
            },
            None => Self {
                usable: false,
                output_count: 0,
            },
        }
    }
}

/// One CRTC the walk will visit: the topology index it consumes and the
/// order its outputs are scanned in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CrtcVisit {
    crtc_index: usize,
    topology_index: i32,
    output_order: Vec<usize>,
}

/// Plans the walk over a screen's CRTCs.
///
/// Visit order is primary-first; unusable CRTCs are dropped without
/// consuming a topology index, while every usable CRTC consumes exactly
/// one, whether or not its outputs later yield records. Output order
/// rotates only within the primary's own CRTC.
fn plan_crtc_walk(crtcs: &[CrtcSummary], primary: Option<PrimaryPosition>) -> Vec<CrtcVisit> {
    let crtc_order = rotate_primary_first(crtcs.len(), primary.map(|p| p.crtc_index));
    let mut visits = Vec::with_capacity(crtcs.len());
    let mut topology_index: i32 = 0;
    for xj in crtc_order {
        if !crtcs[xj].usable {
            continue;
        }
        let output_primary = primary
            .filter(|p| p.crtc_index == xj)
            .map(|p| p.output_index);
        visits.push(CrtcVisit {
            crtc_index: xj,
            topology_index,
            output_order: rotate_primary_first(crtcs[xj].output_count, output_primary),
        });
        topology_index += 1;
    }
    visits
}

/// True when the CRTC's gamma table is readable and non-empty.
fn gamma_accessible(dpy: *mut xlib::Display, crtc: xrandr::RRCrtc) -> bool {
    // SAFETY: valid display; the gamma block is freed before returning.
    let gamma = unsafe { xrandr::XRRGetCrtcGamma(dpy, crtc) };
    if gamma.is_null() {
        return false;
    }
    let size = unsafe { (*gamma).size };
    unsafe { xrandr::XRRFreeGamma(gamma) };
    size != 0
}

/// Reads the output's EDID property (trying both conventional names),
/// accepting only well-formed 128/256-byte blocks.
fn output_edid(conn: &Connection, output: xrandr::RROutput) -> Vec<u8> {
    for key in OUTPUT_EDID_PROPERTIES {
        let atom = match conn.find_atom(key) {
            Some(atom) => atom,
            None => continue,
        };
        let mut actual_type: xlib::Atom = 0;
        let mut actual_format: c_int = 0;
        let mut item_count: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();
        // SAFETY: valid display/output/atom; out-parameters are plain
        // locals and `data` is freed with XFree below on every path.
        let status = unsafe {
            xrandr::XRRGetOutputProperty(
                conn.display(),
                output,
                atom,
                0,
                0x7ffffff,
                xlib::False,
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
            debug!("got EDID ({} bytes) from output property {}", edid.len(), key);
            return edid;
        }
    }
    Vec::new()
}

/// Enumerates displays through XRandR 1.2+.
///
/// `Ok(None)` means this tier cannot answer (extension missing or too old,
/// VideoLUT gate tripped, or nothing enumerated) and the caller should try
/// the older extensions. Errors abort the whole enumeration.
pub(super) fn enumerate(conn: &Connection, base_name: &str) -> Result<Option<Vec<DisplayRecord>>> {
    let dpy = conn.display();

    let mut event_base: c_int = 0;
    let mut error_base: c_int = 0;
    // SAFETY: valid display; out-parameters are plain locals.
    if unsafe { xrandr::XRRQueryExtension(dpy, &mut event_base, &mut error_base) } == 0 {
        debug!("XRandR extension not present");
        return Ok(None);
    }
    let mut major: c_int = 0;
    let mut minor: c_int = 0;
    // SAFETY: valid display; out-parameters are plain locals.
    if unsafe { xrandr::XRRQueryVersion(dpy, &mut major, &mut minor) } == 0 {
        debug!("XRRQueryVersion failed");
        return Ok(None);
    }
    if major != 1 || minor < 2 {
        debug!("XRandR {}.{} lacks per-output enumeration", major, minor);
        return Ok(None);
    }

    let _trap = ErrorTrap::install();

    // The 1.3 entry points only make sense when the server speaks 1.3.
    let (get_current, get_primary) = if minor >= 3 {
        (CAPS.get_screen_resources_current, CAPS.get_output_primary)
    } else {
        (None, None)
    };

    let screen_count = conn.screen_count();
    debug!("enumerating {} X screen(s) via XRandR {}.{}", screen_count, major, minor);

    let mut records: Vec<DisplayRecord> = Vec::new();
    for screen in 0..screen_count {
        let root = conn.root_window(screen);
        let res = match ScreenResources::fetch(dpy, root, get_current) {
            Some(res) => res,
            None => bail!("XRRGetScreenResources failed for screen {}", screen),
        };

        let crtcs = res.crtcs();
        let mut infos: Vec<Option<CrtcInfo>> = Vec::with_capacity(crtcs.len());
        for (xj, &crtc_id) in crtcs.iter().enumerate() {
            let info = CrtcInfo::fetch(dpy, &res, crtc_id);
            match &info {
                None => debug!("XRRGetCrtcInfo failed for screen {} CRTC {}", screen, xj),
                Some(info) if !info.has_live_mode() || info.outputs().is_empty() => {
                    debug!("screen {} CRTC {} skipped: no mode or no outputs", screen, xj);
                }
                Some(_) => {}
            }
            infos.push(info);
        }

        let primary_pos = get_primary.and_then(|f| {
            // SAFETY: resolved from libXrandr with this exact signature.
            let primary = unsafe { f(dpy, root) };
            locate_primary(&infos, primary)
        });

        let summaries: Vec<CrtcSummary> =
            infos.iter().map(|info| CrtcSummary::of(info.as_ref())).collect();

        for visit in plan_crtc_walk(&summaries, primary_pos) {
            let crtci = match infos[visit.crtc_index].as_ref() {
                Some(info) => info,
                None => continue,
            };
            let crtc_id = crtcs[visit.crtc_index];
            let outputs = crtci.outputs();

            let mut first_output_name: Option<String> = None;
            for (k, &xk) in visit.output_order.iter().enumerate() {
                let output_id = outputs[xk];
                let outi = OutputInfo::fetch(dpy, &res, output_id);
                if k == 0 {
                    // Clone records reference the first output visited on
                    // this CRTC, connected or not.
                    first_output_name = outi.as_ref().map(|info| info.name());
                }
                let outi = match outi {
                    Some(info) => info,
                    None => {
                        debug!(
                            "XRRGetOutputInfo failed for screen {} CRTC {} output {}",
                            screen, visit.crtc_index, xk
                        );
                        continue;
                    }
                };
                if outi.is_disconnected() {
                    debug!(
                        "screen {} CRTC {} output {} is disconnected",
                        screen, visit.crtc_index, xk
                    );
                    continue;
                }

                if !gamma_accessible(dpy, crtc_id) {
                    warn!("XRRGetCrtcGamma failed - falling back to older extensions");
                    return Ok(None);
                }

                let (x, y, width, height) = crtci.geometry();
                let mut record = DisplayRecord {
                    name: name_with_screen(base_name, screen),
                    origin: (x, y),
                    size: (width, height),
                    virtual_screen: screen,
                    topology_index: visit.topology_index,
                    ramdac_index: visit.topology_index,
                    crtc: crtc_id as u64,
                    output: output_id as u64,
                    ..Default::default()
                };

                let clone_of = if k > 0 { first_output_name.as_deref() } else { None };
                record.description = describe_output(
                    records.len() + 1,
                    &outi.name(),
                    (x, y),
                    (width, height),
                    clone_of,
                );

                match conn.intern_atom(&icc_root_atom_name(visit.topology_index)) {
                    Ok(atom) => record.icc_profile_atom = atom as u64,
                    Err(err) => warn!("{:#}", err),
                }
                match conn.intern_atom(ICC_OUTPUT_ATOM_NAME) {
                    Ok(atom) => record.icc_profile_output_atom = atom as u64,
                    Err(err) => warn!("{:#}", err),
                }

                record.edid = output_edid(conn, output_id);

                debug!(
                    "adding screen {} CRTC {} output {} as '{}'",
                    screen, visit.crtc_index, xk, record.description
                );
                records.push(record);
            }
        }
    }

    if records.is_empty() {
        debug!("XRandR tier produced no displays");
        return Ok(None);
    }

    // The default screen's leading record is the default display; the
    // caller moves it to the front of the final list.
    let default_screen = conn.default_screen();
    if let Some(record) = records
        .iter_mut()
        .find(|r| r.virtual_screen == default_screen)
    {
        record.is_primary = true;
    }

    Ok(Some(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_without_primary_is_natural_order() {
        assert_eq!(rotate_primary_first(3, None), vec![0, 1, 2]);
        assert_eq!(rotate_primary_first(0, None), Vec::<usize>::new());
    }

    #[test]
    fn rotation_puts_primary_first_keeping_the_rest_in_order() {
        assert_eq!(rotate_primary_first(5, Some(2)), vec![2, 0, 1, 3, 4]);
        assert_eq!(rotate_primary_first(4, Some(3)), vec![3, 0, 1, 2]);
    }

    #[test]
    fn rotation_with_primary_already_first_changes_nothing() {
        assert_eq!(rotate_primary_first(3, Some(0)), vec![0, 1, 2]);
    }

    #[test]
    fn rotation_ignores_out_of_range_primary() {
        assert_eq!(rotate_primary_first(3, Some(9)), vec![0, 1, 2]);
    }

    #[test]
    fn rotation_single_element() {
        assert_eq!(rotate_primary_first(1, Some(0)), vec![0]);
        assert_eq!(rotate_primary_first(1, None), vec![0]);
    }

    #[test]
    fn output_description_format() {
        assert_eq!(
            describe_output(1, "DP-0", (0, 0), (2560, 1440), None),
            "Monitor 1, Output DP-0 at 0, 0, width 2560, height 1440"
        );
    }

    #[test]
    fn clone_outputs_are_labelled() {
        assert_eq!(
            describe_output(2, "HDMI-0", (1920, 0), (1920, 1080), Some("DP-0")),
            "Monitor 2, Output HDMI-0 at 1920, 0, width 1920, height 1080[ Clone of DP-0 ]"
        );
    }

    fn usable(output_count: usize) -> CrtcSummary {
        CrtcSummary {
            usable: true,
            output_count,
        }
    }

    fn unusable() -> CrtcSummary {
        CrtcSummary {
            usable: false,
            output_count: 0,
        }
    }

    fn indexed(visits: &[CrtcVisit]) -> Vec<(usize, i32)> {
        visits
            .iter()
            .map(|v| (v.crtc_index, v.topology_index))
            .collect()
    }

    #[test]
    fn unusable_crtcs_consume_no_topology_index() {
        // A modeless or output-less CRTC (or a failed info fetch) drops
        // out entirely; the CRTC after it takes the next index, so ICC
        // atom names and VidMode screen arguments stay compact.
        let visits = plan_crtc_walk(&[usable(1), unusable(), usable(2)], None);
        assert_eq!(indexed(&visits), [(0, 0), (2, 1)]);
    }

    #[test]
    fn topology_indices_are_fixed_before_outputs_are_examined() {
        // Output-level skips (disconnected, failed fetch) happen after
        // the plan is made: a usable CRTC keeps its index even when it
        // ends up contributing no records, shifting everything after it.
        let visits = plan_crtc_walk(&[usable(2), usable(1), usable(3)], None);
        assert_eq!(indexed(&visits), [(0, 0), (1, 1), (2, 2)]);
        assert_eq!(visits[2].output_order, vec![0, 1, 2]);
    }

    #[test]
    fn an_unusable_primary_crtc_drops_out_without_disturbing_the_rest() {
        // The primary pointer can reference a CRTC that lost its mode
        // between queries; the walk visits it first, drops it, and the
        // remaining CRTCs keep their relative order and compact indices.
        let primary = Some(PrimaryPosition {
            crtc_index: 1,
            output_index: 0,
        });
        let visits = plan_crtc_walk(&[usable(1), unusable(), usable(1)], primary);
        assert_eq!(indexed(&visits), [(0, 0), (2, 1)]);
    }

    #[test]
    fn primary_crtc_is_visited_first_and_takes_index_zero() {
        let primary = Some(PrimaryPosition {
            crtc_index: 1,
            output_index: 1,
        });
        let visits = plan_crtc_walk(&[usable(1), usable(2), usable(1)], primary);
        assert_eq!(indexed(&visits), [(1, 0), (0, 1), (2, 2)]);
        // Output rotation applies only on the primary's own CRTC.
        assert_eq!(visits[0].output_order, vec![1, 0]);
        assert_eq!(visits[1].output_order, vec![0]);
        assert_eq!(visits[2].output_order, vec![0]);
    }

    #[test]
    fn a_screen_with_no_usable_crtcs_plans_nothing() {
        assert!(plan_crtc_walk(&[unusable(), unusable()], None).is_empty());
        assert!(plan_crtc_walk(&[], None).is_empty());
    }
}
