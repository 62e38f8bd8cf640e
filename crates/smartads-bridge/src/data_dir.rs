// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// Explicit override, mainly for sandboxed hosts and tests.
pub const DATA_DIR_ENV: &str = "SMARTADS_DATA_DIR";

/// Return the bridge data directory, creating it if needed.
///
/// `None` when no candidate location is known; callers then keep state in
/// memory.
pub fn data_dir() -> Option<PathBuf> {
    let dir = resolve()?;
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot create data directory");
        return None;
    }
    Some(dir)
}

fn resolve() -> Option<PathBuf> {
    if let Some(dir) = non_empty_env(DATA_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    // Try XDG data dir, then fall back to home
    if let Some(xdg) = non_empty_env("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg).join("smartads"));
    }
    non_empty_env("HOME").map(|home| {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("smartads")
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
