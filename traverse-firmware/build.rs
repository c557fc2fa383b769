//! Build script for traverse-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates axis.toml and compiles it into the firmware

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use traverse_core::config::{AxisConfig, ConfigError};

/// Layout of axis.toml
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AxisFile {
    axis: AxisConfig,
}

fn main() {
    setup_linker();
    let config = load_config();
    generate_config(&config);
}

/// Set up linker search paths and scripts
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and validate axis.toml
fn load_config() -> AxisConfig {
    println!("cargo:rerun-if-changed=axis.toml");

    let config_path = Path::new("axis.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: axis.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires an axis.toml configuration file.          ║\n\
            ║  Please create one in the traverse-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read axis.toml                                 ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let file: AxisFile = match toml::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid axis.toml                                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    if let Err(e) = file.axis.validate() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Inconsistent [axis] section in axis.toml                 ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(describe(e))
        );
    }

    println!("cargo:warning=axis.toml validated successfully");
    file.axis
}

fn describe(error: ConfigError) -> &'static str {
    match error {
        ConfigError::InvalidMechanics => {
            "steps_per_rev, microsteps or screw_pitch_mm cannot\nproduce a usable steps/mm (microsteps must be a power of two <= 256)"
        }
        ConfigError::InvalidTravel => {
            "travel_min_mm must be >= 0 and below travel_max_mm,\nand travel_max_mm must fit in the driver position field"
        }
        ConfigError::InvalidTiming => "all *_timeout_ms and *_period_ms values must be non-zero",
        ConfigError::SpeedOutOfRange => {
            "default_speed_mm_s and max_jog_speed_mm_s must be positive\nand fit in the 16-bit driver speed field"
        }
        ConfigError::InvalidLimit => {
            "max_current_ma, max_temperature_c and max_missed_polls\nmust be non-zero"
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the validated configuration as a Rust constant
fn generate_config(config: &AxisConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let source = format!(
        "/// Axis configuration compiled from axis.toml\n\
         pub const AXIS_CONFIG: AxisConfig = AxisConfig {{\n    \
             steps_per_rev: {},\n    \
             microsteps: {},\n    \
             screw_pitch_mm: {:?}_f32,\n    \
             travel_min_mm: {:?}_f32,\n    \
             travel_max_mm: {:?}_f32,\n    \
             max_current_ma: {},\n    \
             max_temperature_c: {},\n    \
             homing_timeout_ms: {},\n    \
             control_period_ms: {},\n    \
             response_timeout_ms: {},\n    \
             queue_timeout_ms: {},\n    \
             max_missed_polls: {},\n    \
             default_speed_mm_s: {:?}_f32,\n    \
             max_jog_speed_mm_s: {:?}_f32,\n\
         }};\n",
        config.steps_per_rev,
        config.microsteps,
        config.screw_pitch_mm,
        config.travel_min_mm,
        config.travel_max_mm,
        config.max_current_ma,
        config.max_temperature_c,
        config.homing_timeout_ms,
        config.control_period_ms,
        config.response_timeout_ms,
        config.queue_timeout_ms,
        config.max_missed_polls,
        config.default_speed_mm_s,
        config.max_jog_speed_mm_s,
    );

    fs::write(out_dir.join("axis_config.rs"), source).unwrap();
}
