// src/options.rs

//! Enumeration options, threaded explicitly through the call graph instead
//! of consulting the process environment at point of use.

use serde::{Deserialize, Serialize};

/// Environment variable that disables the XRandR 1.2+ tier when set.
pub const IGNORE_XRANDR_ENV: &str = "DISPPATH_IGNORE_XRANDR1_2";
/// Environment variable that disables the Xinerama tier when set.
pub const IGNORE_XINERAMA_ENV: &str = "DISPPATH_IGNORE_XINERAMA";

/// Controls which X11 enumeration tiers are considered.
///
/// Both flags exist to work around servers whose XRandR or Xinerama
/// implementations misreport the monitor layout; they have no effect on
/// Windows or macOS. The default enables everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumOptions {
    /// Skip the XRandR 1.2+ tier and go straight to Xinerama / plain X11.
    pub ignore_xrandr12: bool,
    /// Skip the Xinerama tier and enumerate plain X11 screens.
    pub ignore_xinerama: bool,
}

impl EnumOptions {
    /// Reads the options from the process environment.
    ///
    /// Presence is what counts: a variable set to the empty string still
    /// disables its tier.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`EnumOptions::from_env`] but with an injected lookup, so
    /// tests never have to mutate the process environment.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            ignore_xrandr12: is_set(lookup(IGNORE_XRANDR_ENV)),
            ignore_xinerama: is_set(lookup(IGNORE_XINERAMA_ENV)),
        }
    }
}

fn is_set(value: Option<String>) -> bool {
    value.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn default_enables_all_tiers() {
        let opts = EnumOptions::default();
        assert!(!opts.ignore_xrandr12);
        assert!(!opts.ignore_xinerama);
    }

    #[test]
    fn unset_variables_leave_defaults() {
        let opts = EnumOptions::from_env_with(lookup_from(&[]));
        assert_eq!(opts, EnumOptions::default());
    }

    #[test]
    fn an_empty_value_still_counts_as_set() {
        let opts = EnumOptions::from_env_with(lookup_from(&[(IGNORE_XRANDR_ENV, "")]));
        assert!(opts.ignore_xrandr12);
        assert!(!opts.ignore_xinerama);
    }

    #[test]
    fn any_value_sets_the_flag() {
        // Even "0": presence is what matters, not the value.
        let opts = EnumOptions::from_env_with(lookup_from(&[
            (IGNORE_XRANDR_ENV, "0"),
            (IGNORE_XINERAMA_ENV, "yes"),
        ]));
        assert!(opts.ignore_xrandr12);
        assert!(opts.ignore_xinerama);
    }

    #[test]
    fn flags_are_independent() {
        let opts = EnumOptions::from_env_with(lookup_from(&[(IGNORE_XINERAMA_ENV, "1")]));
        assert!(!opts.ignore_xrandr12);
        assert!(opts.ignore_xinerama);
    }
}
