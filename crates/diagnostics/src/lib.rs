// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging setup shared by the ghfs crates.
//!
//! Usage:
//! - Set GHFS_LOG=off (default) - no logs
//! - Set GHFS_LOG=info - remote calls, connects, imports
//! - Set GHFS_LOG=debug - every fetch, lookup and skipped entry

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`].
pub const LOG_ENV: &str = "GHFS_LOG";

static INIT: Once = Once::new();

/// Maps a `GHFS_LOG` value to the minimum level to emit, `None` meaning off.
///
/// Unknown values fall back to `Info`.
pub fn parse_level(value: &str) -> Option<emit::Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "" => None,
        "debug" => Some(emit::Level::Debug),
        "warn" => Some(emit::Level::Warn),
        "error" => Some(emit::Level::Error),
        _ => Some(emit::Level::Info),
    }
}

/// Initialize diagnostics based on the GHFS_LOG environment variable
///
/// This should be called once at application startup. It's safe to call
/// multiple times - subsequent calls will be ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());

        let Some(level) = parse_level(&value) else {
            return;
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The runtime lives for the rest of the process.
        std::mem::forget(rt);
    });
}

/// Log basic operations (connects, remote calls, imports)
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (fetches, lookups, skipped entries)
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log warning conditions (filtered repositories, retried connects)
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log critical error conditions
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}
