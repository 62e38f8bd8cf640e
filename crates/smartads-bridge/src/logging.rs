// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tracing subscriber for the bridge.
//
// The SDK level set by the scripting runtime sits in a reloadable
// `LevelFilter`; `RUST_LOG` narrows it further when present at start-up.

use std::sync::OnceLock;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, reload};

use smartads_core::types::LogLevel;

static LEVEL: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

fn level_filter(level: LogLevel) -> LevelFilter {
    LevelFilter::from_level(level.tracing_level())
}

/// Install the global subscriber once. Later calls are no-ops. If the host
/// already installed a subscriber, that one keeps receiving events.
pub fn init(initial: LogLevel) {
    LEVEL.get_or_init(|| {
        let (level, handle) = reload::Layer::new(level_filter(initial));
        let env = EnvFilter::try_from_default_env().ok();

        let installed = tracing_subscriber::registry()
            .with(level)
            .with(env)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init();
        if installed.is_err() {
            tracing::debug!("global subscriber already set, SDK log level will not apply");
        }
        handle
    });
}

/// Change the SDK log level at runtime.
pub fn set_level(level: LogLevel) {
    init(level);
    if let Some(handle) = LEVEL.get() {
        if let Err(e) = handle.reload(level_filter(level)) {
            tracing::warn!(error = %e, "failed to change log level");
        }
    }
    tracing::debug!(?level, "log level set");
}
