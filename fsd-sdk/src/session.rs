//! Session state: connection phase, identity, server target.
//!
//! [`SessionState`] is deliberately synchronous and I/O-free — it owns the
//! phase transitions, builds the login/logoff lines, and gates outbound
//! traffic, while the async run loop in [`crate::client`] does the reading
//! and writing. That split keeps the whole lifecycle unit-testable without
//! a socket.

use fsd_protocol::fields::{AtcRating, PilotRating, ProtocolVersion};
use fsd_protocol::message::{AtcLogin, Message, PilotLogin};

use crate::auth::AuthState;
use crate::caps::{CapabilityCache, CapabilitySet};
use crate::error::ClientError;

/// Connection lifecycle phase. `Disconnected` is both the initial and the
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// How the session logs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    Pilot,
    Atc,
    /// Observer sessions use the ATC login with the Observer rating.
    Observer,
}

/// Who this session claims to be. Mutable only until the session reaches
/// Connected; the run loop freezes it afterwards.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Stored canonically uppercase; comparisons are case-insensitive.
    pub callsign: String,
    pub real_name: String,
    pub client_id: u32,
    /// Shared secret for the challenge-response chain.
    pub key: String,
    pub protocol: ProtocolVersion,
    pub simulator_type: u8,
    pub rating: AtcRating,
    pub pilot_rating: PilotRating,
    /// Capabilities advertised in `CAPS` responses.
    pub capabilities: CapabilitySet,
}

/// Server to connect to. Immutable for the lifetime of a connection attempt.
#[derive(Debug, Clone)]
pub struct ServerTarget {
    pub host: String,
    pub port: u16,
    pub mode: LoginMode,
    /// Whether filed flight plans must carry an ICAO equipment suffix
    /// (`B738/L` rather than `B738`).
    pub require_icao_equipment_suffix: bool,
}

pub struct SessionState {
    phase: ConnectionPhase,
    identity: ClientIdentity,
    target: ServerTarget,
    pub auth: AuthState,
    pub peer_caps: CapabilityCache,
}

impl SessionState {
    /// Validate identity and credentials up front: a missing callsign, name
    /// or key is reported here, before any login traffic exists.
    pub fn new(mut identity: ClientIdentity, target: ServerTarget) -> Result<Self, ClientError> {
        if identity.callsign.trim().is_empty() {
            return Err(ClientError::MissingIdentity("callsign"));
        }
        if identity.real_name.trim().is_empty() {
            return Err(ClientError::MissingIdentity("real name"));
        }
        let auth = AuthState::new(identity.client_id, &identity.key)?;
        identity.callsign = identity.callsign.trim().to_ascii_uppercase();
        Ok(SessionState {
            phase: ConnectionPhase::Disconnected,
            identity,
            target,
            auth,
            peer_caps: CapabilityCache::default(),
        })
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn callsign(&self) -> &str {
        &self.identity.callsign
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn target(&self) -> &ServerTarget {
        &self.target
    }

    /// Identity stays editable while configuring and during the connection
    /// attempt, and freezes once the session is Connected.
    pub fn identity_mut(&mut self) -> Result<&mut ClientIdentity, ClientError> {
        match self.phase {
            ConnectionPhase::Disconnected | ConnectionPhase::Connecting => Ok(&mut self.identity),
            _ => Err(ClientError::IdentityLocked),
        }
    }

    pub fn is_own_callsign(&self, callsign: &str) -> bool {
        self.identity.callsign.eq_ignore_ascii_case(callsign)
    }

    // ── Transitions ──

    pub fn begin_connect(&mut self) -> Result<(), ClientError> {
        if self.phase != ConnectionPhase::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        self.phase = ConnectionPhase::Connecting;
        Ok(())
    }

    /// Transport-level ready signal: the session is now live.
    pub fn transport_ready(&mut self) {
        if self.phase == ConnectionPhase::Connecting {
            self.phase = ConnectionPhase::Connected;
        }
    }

    /// Start an orderly teardown. Returns `true` when a delete message
    /// should go out first; `disconnect()` while already disconnected is a
    /// no-op.
    pub fn begin_disconnect(&mut self) -> bool {
        match self.phase {
            ConnectionPhase::Connected => {
                self.phase = ConnectionPhase::Disconnecting;
                true
            }
            ConnectionPhase::Connecting => {
                self.phase = ConnectionPhase::Disconnecting;
                false
            }
            _ => false,
        }
    }

    /// Settle the teardown (or a failed attempt) into Disconnected.
    pub fn finish_disconnect(&mut self) {
        self.phase = ConnectionPhase::Disconnected;
        self.peer_caps.clear();
    }

    /// Transport dropped out from under us: no delete message, straight to
    /// Disconnected.
    pub fn connection_lost(&mut self) {
        self.phase = ConnectionPhase::Disconnected;
        self.peer_caps.clear();
    }

    /// Only login traffic may leave a session that is not Connected.
    pub fn can_send(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    // ── Login / logoff lines ──

    pub fn login_message(&self) -> Message {
        let id = &self.identity;
        match self.target.mode {
            LoginMode::Pilot => Message::PilotLogin(PilotLogin {
                callsign: id.callsign.clone(),
                client_id: id.client_id,
                key: id.key.clone(),
                rating: id.rating,
                protocol: id.protocol,
                simulator_type: id.simulator_type,
                real_name: id.real_name.clone(),
            }),
            LoginMode::Atc | LoginMode::Observer => Message::AtcLogin(AtcLogin {
                callsign: id.callsign.clone(),
                real_name: id.real_name.clone(),
                client_id: id.client_id,
                key: id.key.clone(),
                rating: match self.target.mode {
                    LoginMode::Observer => AtcRating::Observer,
                    _ => id.rating,
                },
                protocol: id.protocol,
            }),
        }
    }

    pub fn delete_message(&self) -> Message {
        match self.target.mode {
            LoginMode::Pilot => Message::DeletePilot {
                callsign: self.identity.callsign.clone(),
                client_id: self.identity.client_id,
            },
            LoginMode::Atc | LoginMode::Observer => Message::DeleteAtc {
                callsign: self.identity.callsign.clone(),
                client_id: self.identity.client_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::Capability;

    fn identity() -> ClientIdentity {
        ClientIdentity {
            callsign: "abcd".to_string(),
            real_name: "Test User".to_string(),
            client_id: 0x1234567,
            key: "123456".to_string(),
            protocol: ProtocolVersion { major: 1, minor: 1 },
            simulator_type: 16,
            rating: AtcRating::Observer,
            pilot_rating: PilotRating::Student,
            capabilities: CapabilitySet::empty().with(Capability::AtcInfo),
        }
    }

    fn target(mode: LoginMode) -> ServerTarget {
        ServerTarget {
            host: "fsd.example.net".to_string(),
            port: 6809,
            mode,
            require_icao_equipment_suffix: false,
        }
    }

    #[test]
    fn callsign_is_canonicalized_uppercase() {
        let session = SessionState::new(identity(), target(LoginMode::Pilot)).unwrap();
        assert_eq!(session.callsign(), "ABCD");
        assert!(session.is_own_callsign("abcd"));
        assert!(session.is_own_callsign("Abcd"));
    }

    #[test]
    fn pilot_login_line_is_exact() {
        let session = SessionState::new(identity(), target(LoginMode::Pilot)).unwrap();
        assert_eq!(
            session.login_message().encode(),
            "#APABCD:SERVER:1234567:123456:1:101:16:Test User"
        );
        assert_eq!(session.delete_message().encode(), "#DPABCD:1234567");
    }

    #[test]
    fn observer_logs_in_as_atc_observer() {
        let mut id = identity();
        id.rating = AtcRating::Controller1;
        let session = SessionState::new(id, target(LoginMode::Observer)).unwrap();
        match session.login_message() {
            Message::AtcLogin(login) => assert_eq!(login.rating, AtcRating::Observer),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            session.delete_message(),
            Message::DeleteAtc { .. }
        ));
    }

    #[test]
    fn lifecycle_transitions() {
        let mut session = SessionState::new(identity(), target(LoginMode::Pilot)).unwrap();
        assert_eq!(session.phase(), ConnectionPhase::Disconnected);
        assert!(!session.can_send());

        session.begin_connect().unwrap();
        assert_eq!(session.phase(), ConnectionPhase::Connecting);
        assert!(session.begin_connect().is_err());
        assert!(!session.can_send());

        session.transport_ready();
        assert_eq!(session.phase(), ConnectionPhase::Connected);
        assert!(session.can_send());

        assert!(session.begin_disconnect());
        assert_eq!(session.phase(), ConnectionPhase::Disconnecting);
        session.finish_disconnect();
        assert_eq!(session.phase(), ConnectionPhase::Disconnected);

        // disconnect() while already disconnected is a no-op.
        assert!(!session.begin_disconnect());
        assert_eq!(session.phase(), ConnectionPhase::Disconnected);
    }

    #[test]
    fn connection_loss_forces_disconnected() {
        let mut session = SessionState::new(identity(), target(LoginMode::Pilot)).unwrap();
        session.begin_connect().unwrap();
        session.transport_ready();
        session.peer_caps.insert("EGLL_TWR", CapabilitySet::empty().with(Capability::AtcInfo));

        session.connection_lost();
        assert_eq!(session.phase(), ConnectionPhase::Disconnected);
        // Cached peer state does not outlive the connection.
        assert!(session.peer_caps.get("EGLL_TWR").is_none());
    }

    #[test]
    fn identity_freezes_once_connected() {
        let mut session = SessionState::new(identity(), target(LoginMode::Pilot)).unwrap();
        session.identity_mut().unwrap().real_name = "Renamed".to_string();
        session.begin_connect().unwrap();
        assert!(session.identity_mut().is_ok());
        session.transport_ready();
        assert!(matches!(
            session.identity_mut(),
            Err(ClientError::IdentityLocked)
        ));
    }

    #[test]
    fn missing_configuration_fails_before_any_traffic() {
        let mut id = identity();
        id.callsign = "  ".to_string();
        assert!(matches!(
            SessionState::new(id, target(LoginMode::Pilot)),
            Err(ClientError::MissingIdentity("callsign"))
        ));

        let mut id = identity();
        id.key = String::new();
        assert!(matches!(
            SessionState::new(id, target(LoginMode::Pilot)),
            Err(ClientError::AuthNotConfigured)
        ));
    }
}
