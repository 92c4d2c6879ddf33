// src/backends/x11/connection.rs

//! RAII wrapper for an Xlib display connection.
//!
//! One `Connection` serves a whole enumeration pass; it closes the display
//! when dropped, so every early-return path in the backend releases the
//! server connection without explicit cleanup calls.

use anyhow::{anyhow, Context, Result};
use libc::c_int;
use log::{debug, warn};
use std::ffi::CString;
use x11::xlib;

pub(crate) struct Connection {
    display: *mut xlib::Display,
    name: String,
}

impl Connection {
    /// Opens the named display (e.g. `":0.0"`).
    pub fn open(name: &str) -> Result<Self> {
        let c_name = CString::new(name)
            .with_context(|| format!("display name '{}' contains a NUL byte", name))?;
        // SAFETY: `XOpenDisplay` accepts a NUL-terminated C string and
        // returns NULL on failure, which we check before use.
        let display = unsafe { xlib::XOpenDisplay(c_name.as_ptr()) };
        if display.is_null() {
            return Err(anyhow!("failed to open X display '{}'", name));
        }
        debug!("Opened X display '{}' ({:p})", name, display);
        Ok(Self {
            display,
            name: name.to_string(),
        })
    }

    /// The raw display pointer for Xlib calls.
    ///
    /// Valid for the lifetime of the `Connection`; callers must not hold it
    /// past drop.
    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.display
    }

    pub fn screen_count(&self) -> c_int {
        // SAFETY: the display pointer is valid until drop.
        unsafe { xlib::XScreenCount(self.display) }
    }

    pub fn default_screen(&self) -> c_int {
        // SAFETY: the display pointer is valid until drop.
        unsafe { xlib::XDefaultScreen(self.display) }
    }

    pub fn root_window(&self, screen: c_int) -> xlib::Window {
        // SAFETY: the display pointer is valid until drop; `screen` must be
        // a real screen index, which callers take from `screen_count`.
        unsafe { xlib::XRootWindow(self.display, screen) }
    }

    /// Interns an atom, creating it on the server if necessary.
    ///
    /// Returns an error when the server refuses the intern (in practice
    /// only under resource exhaustion).
    pub fn intern_atom(&self, name: &str) -> Result<xlib::Atom> {
        let c_name = CString::new(name)
            .with_context(|| format!("atom name '{}' contains a NUL byte", name))?;
        // SAFETY: valid display, NUL-terminated name; `False` creates the
        // atom when it does not exist yet.
        let atom = unsafe { xlib::XInternAtom(self.display, c_name.as_ptr(), xlib::False) };
        if atom == 0 {
            return Err(anyhow!("unable to intern atom '{}'", name));
        }
        Ok(atom)
    }

    /// Looks up an existing atom; `None` when the server has never seen the
    /// name (the property it would describe cannot exist either).
    pub fn find_atom(&self, name: &str) -> Option<xlib::Atom> {
        let c_name = match CString::new(name) {
            Ok(c) => c,
            Err(_) => {
                warn!("atom name '{}' contains a NUL byte", name);
                return None;
            }
        };
        // SAFETY: valid display, NUL-terminated name; `True` means
        // only-if-exists, so 0 is a normal "not present" answer.
        let atom = unsafe { xlib::XInternAtom(self.display, c_name.as_ptr(), xlib::True) };
        if atom == 0 {
            None
        } else {
            Some(atom)
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.display.is_null() {
            debug!("Closing X display '{}' ({:p})", self.name, self.display);
            // SAFETY: the pointer came from XOpenDisplay and is closed
            // exactly once; it is nulled so a second drop is impossible.
            unsafe {
                xlib::XCloseDisplay(self.display);
            }
            self.display = std::ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn drop_on_null_display_is_a_noop() {
        // Simulates a connection whose display was already torn down; Drop
        // must not call XCloseDisplay on NULL.
        let conn = Connection {
            display: ptr::null_mut(),
            name: ":9.9".to_string(),
        };
        drop(conn);
    }

    #[test]
    #[ignore = "requires a running X server"]
    fn open_real_display() {
        let name = std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".to_string());
        let conn = Connection::open(&name).expect("X server reachable");
        assert!(!conn.display().is_null());
        assert!(conn.screen_count() >= 1);
        let screen = conn.default_screen();
        assert!(screen >= 0 && screen < conn.screen_count());
        assert_ne!(conn.root_window(screen), 0);
        // Predefined atoms always intern to themselves.
        assert_eq!(conn.find_atom("PRIMARY"), Some(xlib::XA_PRIMARY));
        assert!(conn.intern_atom("_ICC_PROFILE").is_ok());
    }
}
