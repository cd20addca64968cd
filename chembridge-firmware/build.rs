//! Build script for chembridge-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates bridge.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
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
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate bridge.toml at compile time
///
/// The firmware parser enforces the same rules at boot; failing here turns a
/// silent fallback to defaults into a build error.
fn validate_config() {
    println!("cargo:rerun-if-changed=bridge.toml");

    let config_path = Path::new("bridge.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: bridge.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds a bridge.toml configuration file.           ║\n\
            ║  Please create one in the chembridge-firmware directory.         ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read bridge.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in bridge.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_intellichem(&config, &mut errors);
    validate_serial(&config, &mut errors);
    validate_bridge(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid bridge configuration                             ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=bridge.toml validated successfully");
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

const SECTIONS: &[(&str, &[&str])] = &[
    ("intellichem", &["address", "poll_interval", "timeout"]),
    ("serial", &["baudrate", "databits", "parity", "stopbits"]),
    (
        "bridge",
        &[
            "control_enabled",
            "comms_lost_threshold",
            "state_wait_ms",
            "command_rate_limit_ms",
        ],
    ),
];

/// Only known sections and keys, and no top-level keys
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        return;
    };

    for (name, value) in root {
        let Some((_, keys)) = SECTIONS.iter().find(|(section, _)| section == name) else {
            errors.push(format!("unknown section or top-level key '{}'", name));
            continue;
        };
        let Some(table) = value.as_table() else {
            errors.push(format!("[{}] must be a table", name));
            continue;
        };
        for key in table.keys() {
            if !keys.contains(&key.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", name, key));
            }
        }
    }
}

fn integer(config: &toml::Value, section: &str, key: &str) -> Option<Result<i64, String>> {
    let value = config.get(section)?.get(key)?;
    Some(
        value
            .as_integer()
            .ok_or_else(|| format!("[{}] {} must be an integer", section, key)),
    )
}

fn check_range(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    match integer(config, section, key) {
        Some(Ok(value)) if !range.contains(&value) => errors.push(format!(
            "[{}] {} must be {}-{}",
            section,
            key,
            range.start(),
            range.end()
        )),
        Some(Err(e)) => errors.push(e),
        _ => {}
    }
}

fn validate_intellichem(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "intellichem", "address", 144..=158, errors);
    check_range(config, "intellichem", "poll_interval", 5..=300, errors);
    check_range(config, "intellichem", "timeout", 1..=30, errors);
}

fn validate_serial(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "serial", "baudrate", 1..=1_000_000, errors);
    check_range(config, "serial", "databits", 7..=8, errors);
    check_range(config, "serial", "stopbits", 1..=2, errors);

    if let Some(parity) = config.get("serial").and_then(|s| s.get("parity")) {
        match parity.as_str() {
            Some("none" | "even" | "odd" | "N" | "E" | "O") => {}
            _ => errors.push("[serial] parity must be \"none\", \"even\" or \"odd\"".into()),
        }
    }
}

fn validate_bridge(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(enabled) = config.get("bridge").and_then(|b| b.get("control_enabled")) {
        if !enabled.is_bool() {
            errors.push("[bridge] control_enabled must be true or false".into());
        }
    }
    check_range(config, "bridge", "comms_lost_threshold", 1..=3_600, errors);
    check_range(config, "bridge", "state_wait_ms", 1..=60_000, errors);
    check_range(config, "bridge", "command_rate_limit_ms", 0..=60_000, errors);

    let poll = integer(config, "intellichem", "poll_interval")
        .and_then(Result::ok)
        .unwrap_or(30);
    let threshold = integer(config, "bridge", "comms_lost_threshold")
        .and_then(Result::ok)
        .unwrap_or(30);
    if threshold < poll {
        errors.push(format!(
            "[bridge] comms_lost_threshold ({}s) below poll_interval ({}s)",
            threshold, poll
        ));
    }
}
