//! Capability negotiation.
//!
//! Capabilities are optional protocol features advertised with `$CQ`/`$CR`
//! `CAPS` exchanges as `KEY=1` tokens. The local set is configured once on
//! the identity; peer sets are cached per callsign and gate optional
//! behavior (for example, aircraft-config deltas are only worth sending to
//! peers that advertise `ACCONFIG`). Unknown tokens are ignored so newer
//! peers never break older clients.

use std::collections::HashMap;

/// One optional protocol feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Peer answers version queries.
    Version,
    /// Peer answers ATC-info (ATIS) queries.
    AtcInfo,
    /// Peer answers aircraft-info (model description) queries.
    AircraftInfo,
    /// Peer accepts incremental aircraft-configuration deltas.
    AircraftConfig,
    /// Peer accepts interim (high-rate) position updates.
    InterimPositions,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Version,
        Capability::AtcInfo,
        Capability::AircraftInfo,
        Capability::AircraftConfig,
        Capability::InterimPositions,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Capability::Version => "VERSION",
            Capability::AtcInfo => "ATCINFO",
            Capability::AircraftInfo => "MODELDESC",
            Capability::AircraftConfig => "ACCONFIG",
            Capability::InterimPositions => "INTERIMPOS",
        }
    }

    fn from_token(tok: &str) -> Option<Capability> {
        Capability::ALL.iter().copied().find(|c| c.token() == tok)
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Bitmask of [`Capability`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    pub const fn empty() -> Self {
        CapabilitySet(0)
    }

    #[must_use]
    pub fn with(mut self, cap: Capability) -> Self {
        self.insert(cap);
        self
    }

    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// Render as the `KEY=1` token list carried by a `CAPS` response.
    pub fn encode_tokens(self) -> Vec<String> {
        self.iter().map(|c| format!("{}=1", c.token())).collect()
    }

    /// Decode a peer's advertised token list. Unknown keys and `KEY=0`
    /// entries are skipped; token order does not matter.
    pub fn decode_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = CapabilitySet::empty();
        for tok in tokens {
            let (key, value) = tok.split_once('=').unwrap_or((tok, "1"));
            if value.trim() != "1" {
                continue;
            }
            if let Some(cap) = Capability::from_token(key.trim()) {
                set.insert(cap);
            }
        }
        set
    }
}

/// Peer capability sets, keyed by canonical (uppercase) callsign.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    by_callsign: HashMap<String, CapabilitySet>,
}

impl CapabilityCache {
    pub fn insert(&mut self, callsign: &str, caps: CapabilitySet) {
        self.by_callsign.insert(callsign.to_ascii_uppercase(), caps);
    }

    pub fn get(&self, callsign: &str) -> Option<CapabilitySet> {
        self.by_callsign.get(&callsign.to_ascii_uppercase()).copied()
    }

    pub fn supports(&self, callsign: &str, cap: Capability) -> bool {
        self.get(callsign).is_some_and(|set| set.contains(cap))
    }

    pub fn clear(&mut self) {
        self.by_callsign.clear();
    }
}
