// src/backends/mod.rs

//! Platform backends. Exactly one is compiled in; all of them fill the
//! same canonical record shape and share the error policy: hard
//! failures are logged and produce an empty list, never a panic.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod windows;
#[cfg(all(unix, not(target_os = "macos")))]
mod x11;

#[cfg(target_os = "macos")]
use self::macos as platform;
#[cfg(windows)]
use self::windows as platform;
#[cfg(all(unix, not(target_os = "macos")))]
use self::x11 as platform;

#[cfg(not(any(windows, target_os = "macos", all(unix, not(target_os = "macos")))))]
mod fallback {
    use crate::options::EnumOptions;
    use crate::record::DisplayRecord;

    pub(crate) fn enumerate(_options: &EnumOptions) -> Vec<DisplayRecord> {
        log::warn!("no display backend for this platform");
        Vec::new()
    }

    pub(crate) fn size_mm(_record: &DisplayRecord) -> (u32, u32) {
        (0, 0)
    }
}
#[cfg(not(any(windows, target_os = "macos", all(unix, not(target_os = "macos")))))]
use self::fallback as platform;

use crate::options::EnumOptions;
use crate::record::DisplayRecord;

/// Enumerates physical displays with the compiled-in backend.
pub(crate) fn enumerate(options: &EnumOptions) -> Vec<DisplayRecord> {
    platform::enumerate(options)
}

/// Physical size in millimetres for one record, `(0, 0)` when the
/// platform cannot say.
pub(crate) fn size_mm(record: &DisplayRecord) -> (u32, u32) {
    platform::size_mm(record)
}
