// SPDX-License-Identifier: Apache-2.0
//! SHA-256 hex digests for board edit passwords and the create-board
//! credential allowlist, stored as lowercase SHA-256 hex in `passwd.json`.

use sha2::{Digest, Sha256};

/// SHA-256 of `passwd`, as the raw 32 bytes stored in a `BoardRegistry`.
pub fn digest_bytes(passwd: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(passwd.as_bytes());
    hasher.finalize().into()
}

/// SHA-256 of `passwd`, lowercase hex, as stored in `passwd.json`.
pub fn digest_hex(passwd: &str) -> String {
    hex_encode(&digest_bytes(passwd))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
