// src/lib.rs

//! Physical display enumeration for color-calibration pipelines.
//!
//! Calibration has to know which monitors exist, where they sit in the
//! virtual desktop, and which platform handles address them before it
//! can measure anything. This crate answers those questions with one
//! canonical [`DisplayRecord`] list, produced by the backend compiled in
//! for the host platform:
//!
//! - Windows: GDI monitor enumeration plus per-monitor device IDs.
//! - macOS: CoreGraphics active displays plus IOKit product names.
//! - X11: XRandR 1.2+ per-output enumeration, falling back to Xinerama
//!   heads and then plain X screens, with ICC profile atoms and EDID.
//!
//! The primary display, when the platform knows one, is always first in
//! the returned list.
//!
//! ```no_run
//! use disppath::{enumerate_displays, physical_size_mm, EnumOptions};
//!
//! let options = EnumOptions::from_env();
//! for (index, display) in enumerate_displays(&options).iter().enumerate() {
//!     let (width_mm, height_mm) = physical_size_mm(display);
//!     println!(
//!         "{}: {} ({} x {} mm)",
//!         index, display.description, width_mm, height_mm
//!     );
//! }
//! ```

mod backends;
pub mod options;
pub mod record;
mod topology;

pub use options::EnumOptions;
pub use record::DisplayRecord;

/// Enumerates the physical displays attached to this system.
///
/// Records come back in canonical order (primary display first). Hard
/// platform failures are logged and yield an empty list; this function
/// does not panic. Indices into the result are stable only until the
/// display topology changes.
pub fn enumerate_displays(options: &EnumOptions) -> Vec<DisplayRecord> {
    topology::enumerate(options)
}

/// Enumerates and returns the display at `index`, `None` out of range.
pub fn select_display(options: &EnumOptions, index: usize) -> Option<DisplayRecord> {
    topology::select(options, index)
}

/// Physical width and height of a display in millimetres, `(0, 0)` when
/// the platform cannot report it.
pub fn physical_size_mm(record: &DisplayRecord) -> (u32, u32) {
    backends::size_mm(record)
}

/// XRandR output XID backing the display, `0` for records that did not
/// come from the XRandR tier.
pub fn xrandr_output_id(record: &DisplayRecord) -> u64 {
    record.xrandr_output_id()
}
