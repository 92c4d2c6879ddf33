// src/backends/x11/error_trap.rs

//! Scoped suppression of Xlib protocol errors.
//!
//! Probing optional extensions and properties can raise X errors (BadAtom,
//! BadWindow, BadValue) that the default Xlib handler turns into a process
//! exit. While a guard is alive those errors are counted and otherwise
//! ignored; dropping the guard restores whatever handler was installed
//! before.
//!
//! Xlib keeps a single process-global error handler, so guards must not be
//! nested and enumeration must not run concurrently from multiple threads.

use libc::c_int;
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use x11::xlib;

static TRAPPED: AtomicUsize = AtomicUsize::new(0);

/// Error handler that swallows the error and keeps a count for diagnostics.
///
/// Returning 0 tells Xlib the error is handled; the return value is
/// otherwise ignored.
unsafe extern "C" fn ignore_error(
    _display: *mut xlib::Display,
    _event: *mut xlib::XErrorEvent,
) -> c_int {
    TRAPPED.fetch_add(1, Ordering::Relaxed);
    0
}

pub(crate) struct ErrorTrap {
    previous: Option<unsafe extern "C" fn(*mut xlib::Display, *mut xlib::XErrorEvent) -> c_int>,
    start_count: usize,
}

impl ErrorTrap {
    /// Installs the ignoring handler, remembering the current one.
    pub fn install() -> Self {
        let start_count = TRAPPED.load(Ordering::Relaxed);
        // SAFETY: XSetErrorHandler only stores the function pointer; the
        // handler itself is a static fn alive for the whole program.
        let previous = unsafe { xlib::XSetErrorHandler(Some(ignore_error)) };
        Self {
            previous,
            start_count,
        }
    }
}

impl Drop for ErrorTrap {
    fn drop(&mut self) {
        // SAFETY: restores the handler captured at install time; passing
        // None reinstates Xlib's default handler.
        unsafe {
            xlib::XSetErrorHandler(self.previous);
        }
        let seen = TRAPPED.load(Ordering::Relaxed) - self.start_count;
        if seen > 0 {
            debug!("X error trap released after swallowing {} error(s)", seen);
        }
    }
}
