//! Keyed, state-chained challenge-response authentication.
//!
//! The login handshake is a chain: the first response is keyed off the
//! shared secret, and every subsequent response is keyed off the state the
//! previous exchange left behind. A verifier therefore needs the whole
//! transcript, not just the latest challenge — replaying one observed
//! exchange proves nothing about the next. This client only generates
//! responses; server-side verification is out of scope.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::ClientError;

type HmacSha256 = Hmac<Sha256>;

/// Per-connection authentication chain. Created at session configuration
/// time; fails fast if the key is absent so no login message is ever built
/// without working credentials.
pub struct AuthState {
    client_id: u32,
    chain: [u8; 32],
}

impl AuthState {
    pub fn new(client_id: u32, key: &str) -> Result<Self, ClientError> {
        if key.trim().is_empty() {
            return Err(ClientError::AuthNotConfigured);
        }
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(b"fsd-auth-init");
        mac.update(&client_id.to_be_bytes());
        Ok(AuthState {
            client_id,
            chain: mac.finalize().into_bytes().into(),
        })
    }

    /// Random token to challenge a peer with.
    pub fn generate_challenge() -> String {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex(&bytes)
    }

    /// Answer a challenge. The response is a MAC over the client id and the
    /// challenge, keyed by the current chain state; the digest then becomes
    /// the new chain state, binding the next exchange to this one.
    pub fn respond_to(&mut self, challenge: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.chain)
            .expect("HMAC accepts keys of any length");
        mac.update(&self.client_id.to_be_bytes());
        mac.update(challenge.as_bytes());
        let digest: [u8; 32] = mac.finalize().into_bytes().into();
        self.chain = digest;
        hex(&digest)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
