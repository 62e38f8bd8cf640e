// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stateless string helpers used by the facades and the C bridge.

use md5::{Digest, Md5};

use crate::error::Result;
use crate::value::ParamMap;

/// `true` for a missing or zero-length string.
pub fn is_nil_or_empty(s: Option<&str>) -> bool {
    s.is_none_or(str::is_empty)
}

/// Serialize a string-keyed mapping to a JSON object.
///
/// Keys are emitted in sorted order so equal maps produce equal strings.
pub fn json_string_from_map(map: &ParamMap) -> Result<String> {
    Ok(serde_json::to_string(map)?)
}

/// MD5 digest of the UTF-8 bytes of `input` as a lowercase hex string.
///
/// Not a security primitive; used for content fingerprints expected by the
/// analytics backend.
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
