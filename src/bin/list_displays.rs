// src/bin/list_displays.rs

//! Prints every display the host reports, as text or (with `--json`) a
//! machine-readable array with per-display physical sizes.

use anyhow::{Context, Result};
use env_logger::Env;
use log::debug;
use serde::Serialize;

use disppath::{
    enumerate_displays, physical_size_mm, xrandr_output_id, DisplayRecord, EnumOptions,
};

#[derive(Debug, Serialize)]
struct DisplayReport<'a> {
    #[serde(flatten)]
    record: &'a DisplayRecord,
    size_mm: (u32, u32),
}

fn print_text(displays: &[DisplayRecord]) {
    if displays.is_empty() {
        println!("no displays found");
        return;
    }
    for (index, display) in displays.iter().enumerate() {
        println!("{}: {}", index, display.description);
        println!("    name: {}", display.name);
        if let Some(device_id) = &display.device_id {
            println!("    device id: {}", device_id);
        }
        let (width_mm, height_mm) = physical_size_mm(display);
        if (width_mm, height_mm) != (0, 0) {
            println!("    physical size: {} x {} mm", width_mm, height_mm);
        }
        if !display.edid.is_empty() {
            println!("    edid: {} bytes", display.edid.len());
        }
        let output = xrandr_output_id(display);
        if output != 0 {
            println!("    xrandr output: 0x{:x}", output);
        }
    }
}

fn print_json(displays: &[DisplayRecord]) -> Result<()> {
    let reports: Vec<DisplayReport> = displays
        .iter()
        .map(|record| DisplayReport {
            record,
            size_mm: physical_size_mm(record),
        })
        .collect();
    let body = serde_json::to_string_pretty(&reports).context("serializing display list")?;
    println!("{}", body);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let json = std::env::args().skip(1).any(|arg| arg == "--json");

    let options = EnumOptions::from_env();
    debug!("enumerating with {:?}", options);
    let displays = enumerate_displays(&options);

    if json {
        print_json(&displays)?;
    } else {
        print_text(&displays);
    }
    Ok(())
}
