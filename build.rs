//! Build script for refmem.
//!
//! Flags feature combinations that are likely mistakes.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    if debug_enabled && is_release {
        emit_warning("'debug' feature enabled in a release build");
        emit_note("Every allocation captures a backtrace and every free poisons its payload.");
    }

    if diagnostics_enabled && is_release {
        emit_note("'diagnostics' enabled: heap diagnostics are printed to stderr");
    }

    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("wasm") {
        emit_note("WebAssembly target: SharedHeap works but threads may be unavailable");
    }
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[refmem] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[refmem]    {}", msg);
}
