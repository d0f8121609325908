//! SHAKE256 sponge: the hash primitive every key, address and signature is built on.
//!
//! Input is absorbed as the UTF-8 bytes of the given text. Squeezing reads
//! from a snapshot of the current state, so repeated squeezes of the same
//! state return the same bytes.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use std::fmt;

/// An absorb/squeeze sponge over SHAKE256.
#[derive(Clone, Default)]
pub struct Sponge {
    state: Shake256,
}

impl Sponge {
    /// Create an empty sponge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb more input. Calls accumulate in order.
    pub fn absorb(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.state.update(data.as_ref());
        self
    }

    /// Squeeze `length` bytes from the current state.
    pub fn squeeze(&self, length: usize) -> Vec<u8> {
        let mut reader = self.state.clone().finalize_xof();
        let mut out = vec![0u8; length];
        reader.read(&mut out);
        out
    }

    /// Squeeze `length` bytes as lowercase hex (`2 * length` characters).
    pub fn squeeze_hex(&self, length: usize) -> String {
        hex::encode(self.squeeze(length))
    }
}

impl fmt::Debug for Sponge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sponge(shake256)")
    }
}

/// One-shot hash: absorb `data` once and squeeze `length` bytes as hex.
pub fn hash(data: impl AsRef<[u8]>, length: usize) -> String {
    let mut sponge = Sponge::new();
    sponge.absorb(data);
    sponge.squeeze_hex(length)
}
