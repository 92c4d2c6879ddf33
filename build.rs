// build.rs

use std::env;

fn main() {
    // Only the X11 backend links against system libraries; Windows and macOS
    // builds use import libraries / frameworks resolved by their toolchains.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" || target_os == "macos" {
        return;
    }

    // Try pkg-config first, which is the standard way to find library
    // linking information on Unix-like systems. If it fails (not installed,
    // or a .pc file is missing), fall back to manually specifying common
    // linker flags.
    let libraries = ["x11", "xrandr", "xinerama", "xxf86vm"];

    let mut pkg_config_success = true;

    for lib in &libraries {
        let result = pkg_config::probe_library(lib);

        if result.is_err() {
            // If probing fails for any library, assume pkg-config isn't fully
            // working or the library isn't registered with it, and switch to
            // manual linking for the lot.
            eprintln!(
                "pkg-config failed for library '{}'. Falling back to manual linking.",
                lib
            );
            pkg_config_success = false;
            break;
        }
    }

    if !pkg_config_success {
        // Manual linking fallback. This assumes the libraries are in standard
        // paths like /usr/lib or /usr/local/lib.
        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-lib=Xrandr");
        println!("cargo:rustc-link-lib=Xinerama");
        println!("cargo:rustc-link-lib=Xxf86vm");
        println!("cargo:rustc-link-search=/usr/lib");

        eprintln!(
            "Manual linking flags applied. Ensure X11, Xrandr, Xinerama and Xxf86vm development libraries are installed."
        );
    } else {
        eprintln!("pkg-config successfully found libraries. Linking configured automatically.");
    }
}
