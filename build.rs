// PolledButtonDriver - Build Script
//
// Bakes the click/hold timing constants into the build.

use std::process::Command;

/// Timing knobs and their defaults, in RTOS ticks.
const TIMING_VARS: [(&str, u32); 5] = [
    ("BTNDRV_DEBOUNCE_TICKS", 5),
    ("BTNDRV_LONG_CLICK_TICKS", 100),
    ("BTNDRV_VERY_LONG_CLICK_TICKS", 300),
    ("BTNDRV_HOLD_TICKS", 500),
    ("BTNDRV_CLICK_TIMEOUT_TICKS", 40),
];

fn main() {
    // ESP-IDF environment setup (MUST be first!)
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING=btndrv v{}-g{}", version, git_hash);

    for (var, default) in TIMING_VARS {
        println!("cargo:rerun-if-env-changed={}", var);

        let value = match std::env::var(var) {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(ticks) => ticks,
                Err(_) => panic!("{} must be a tick count, got {:?}", var, raw),
            },
            Err(_) => default,
        };
        println!("cargo:rustc-env={}={}", var, value);
    }

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}
