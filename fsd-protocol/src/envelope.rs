//! Raw line → marker + ordered field list.
//!
//! The envelope layer only knows the marker table and the colon delimiter.
//! Kind-specific interpretation (which field means what, which tail is free
//! text) lives in [`crate::message`]. Free text is recovered losslessly via
//! [`Envelope::tail`]: splitting on `:` and rejoining with `:` reproduces
//! the original bytes, so embedded colons in a trailing field survive.

use crate::error::ParseError;

/// Every message kind this client understands, keyed by its wire marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PilotLogin,
    AtcLogin,
    DeletePilot,
    DeleteAtc,
    TextMessage,
    PlaneInfo,
    PilotPosition,
    AtcPosition,
    ClientQuery,
    ClientResponse,
    Ping,
    Pong,
    FlightPlan,
    AuthChallenge,
    AuthResponse,
    ServerError,
    Kill,
}

impl MessageKind {
    pub fn marker(self) -> &'static str {
        match self {
            MessageKind::PilotLogin => "#AP",
            MessageKind::AtcLogin => "#AA",
            MessageKind::DeletePilot => "#DP",
            MessageKind::DeleteAtc => "#DA",
            MessageKind::TextMessage => "#TM",
            MessageKind::PlaneInfo => "#SB",
            MessageKind::PilotPosition => "@",
            MessageKind::AtcPosition => "%",
            MessageKind::ClientQuery => "$CQ",
            MessageKind::ClientResponse => "$CR",
            MessageKind::Ping => "$PI",
            MessageKind::Pong => "$PO",
            MessageKind::FlightPlan => "$FP",
            MessageKind::AuthChallenge => "$ZC",
            MessageKind::AuthResponse => "$ZR",
            MessageKind::ServerError => "$ER",
            MessageKind::Kill => "$!!",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::PilotLogin => "pilot-login",
            MessageKind::AtcLogin => "atc-login",
            MessageKind::DeletePilot => "delete-pilot",
            MessageKind::DeleteAtc => "delete-atc",
            MessageKind::TextMessage => "text",
            MessageKind::PlaneInfo => "plane-info",
            MessageKind::PilotPosition => "pilot-position",
            MessageKind::AtcPosition => "atc-position",
            MessageKind::ClientQuery => "client-query",
            MessageKind::ClientResponse => "client-response",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::FlightPlan => "flight-plan",
            MessageKind::AuthChallenge => "auth-challenge",
            MessageKind::AuthResponse => "auth-response",
            MessageKind::ServerError => "server-error",
            MessageKind::Kill => "kill",
        }
    }

    /// Minimum field count for the kind to be dispatchable at all.
    fn min_fields(self) -> usize {
        match self {
            MessageKind::PilotLogin => 8,
            MessageKind::AtcLogin => 7,
            MessageKind::DeletePilot | MessageKind::DeleteAtc | MessageKind::Kill => 2,
            MessageKind::TextMessage => 3,
            MessageKind::PlaneInfo => 3,
            MessageKind::PilotPosition => 10,
            MessageKind::AtcPosition => 8,
            MessageKind::ClientQuery => 3,
            MessageKind::ClientResponse => 3,
            MessageKind::Ping | MessageKind::Pong => 3,
            MessageKind::FlightPlan => 16,
            MessageKind::AuthChallenge | MessageKind::AuthResponse => 3,
            MessageKind::ServerError => 5,
        }
    }

    /// Match the marker at the head of a line. Two-character `#`/`$` kinds
    /// are checked before the single-character position markers so `#TM`
    /// never falls through to an unknown `#` family.
    fn strip(line: &str) -> Result<(MessageKind, &str), ParseError> {
        use MessageKind::*;
        for kind in [
            PilotLogin,
            AtcLogin,
            DeletePilot,
            DeleteAtc,
            TextMessage,
            PlaneInfo,
            ClientQuery,
            ClientResponse,
            Ping,
            Pong,
            FlightPlan,
            AuthChallenge,
            AuthResponse,
            ServerError,
            Kill,
            PilotPosition,
            AtcPosition,
        ] {
            if let Some(rest) = line.strip_prefix(kind.marker()) {
                return Ok((kind, rest));
            }
        }
        // Report the marker-ish prefix, not whole lines of peer traffic.
        let head: String = line.chars().take(3).collect();
        Err(ParseError::UnknownMessage(head))
    }
}

/// One parsed inbound line: kind plus ordered colon-split fields. Transient;
/// consumed by [`crate::message::Message::parse`] and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub kind: MessageKind,
    pub fields: Vec<&'a str>,
}

impl<'a> Envelope<'a> {
    /// Split a received line (CR/LF tolerated, stripped here) into an
    /// envelope. Lines with an unknown marker or too few fields for their
    /// kind are rejected, never panicked on.
    pub fn parse(line: &'a str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (kind, rest) = MessageKind::strip(line)?;
        let fields: Vec<&str> = rest.split(':').collect();
        if fields.len() < kind.min_fields() {
            return Err(ParseError::MalformedMessage {
                kind: kind.name(),
                expected: kind.min_fields(),
                got: fields.len(),
            });
        }
        Ok(Envelope { kind, fields })
    }

    pub fn field(&self, idx: usize) -> Result<&'a str, ParseError> {
        self.fields.get(idx).copied().ok_or(ParseError::MalformedMessage {
            kind: self.kind.name(),
            expected: idx + 1,
            got: self.fields.len(),
        })
    }

    /// Rejoin everything from `idx` onward as one opaque trailing field,
    /// restoring any colons the split consumed.
    pub fn tail(&self, idx: usize) -> String {
        self.fields[idx.min(self.fields.len())..].join(":")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    #[test]
    fn splits_admin_message() {
        let env = Envelope::parse("#DPBAW123:1234567").unwrap();
        assert_eq!(env.kind, MessageKind::DeletePilot);
        assert_eq!(env.fields, vec!["BAW123", "1234567"]);
    }

    #[test]
    fn position_markers_are_single_character() {
        let env = Envelope::parse("@N:BAW123:2200:1:51.47750:-0.46139:2500:140:285:1").unwrap();
        assert_eq!(env.kind, MessageKind::PilotPosition);
        assert_eq!(env.fields[0], "N");
        assert_eq!(env.fields[1], "BAW123");

        let env = Envelope::parse("%EGLL_TWR:18500:4:50:5:51.47750:-0.46139:80").unwrap();
        assert_eq!(env.kind, MessageKind::AtcPosition);
    }

    #[test]
    fn free_text_tail_preserves_colons() {
        let env = Envelope::parse("#TMEGLL_TWR:BAW123:cleared to land: runway 27L").unwrap();
        assert_eq!(env.kind, MessageKind::TextMessage);
        assert_eq!(env.field(0).unwrap(), "EGLL_TWR");
        assert_eq!(env.field(1).unwrap(), "BAW123");
        assert_eq!(env.tail(2), "cleared to land: runway 27L");
    }

    #[test]
    fn crlf_is_tolerated() {
        let env = Envelope::parse("$PIBAW123:SERVER:1694000000\r\n").unwrap();
        assert_eq!(env.kind, MessageKind::Ping);
        assert_eq!(env.fields, vec!["BAW123", "SERVER", "1694000000"]);
    }

    #[test]
    fn unknown_marker_is_reported_not_fatal() {
        match Envelope::parse("&XYnope:1:2") {
            Err(ParseError::UnknownMessage(head)) => assert_eq!(head, "&XY"),
            other => panic!("expected UnknownMessage, got {other:?}"),
        }
    }

    #[test]
    fn short_line_is_malformed() {
        match Envelope::parse("@N:BAW123") {
            Err(ParseError::MalformedMessage { kind, expected, got }) => {
                assert_eq!(kind, "pilot-position");
                assert_eq!(expected, 10);
                assert_eq!(got, 2);
            }
            other => panic!("expected MalformedMessage, got {other:?}"),
        }
    }

    #[test]
    fn empty_segments_are_kept() {
        let env = Envelope::parse("$CQBAW123:SERVER:CAPS").unwrap();
        assert_eq!(env.fields.len(), 3);
        let env = Envelope::parse("$CRBAW123:EGLL_TWR:CAPS:").unwrap();
        assert_eq!(env.fields, vec!["BAW123", "EGLL_TWR", "CAPS", ""]);
    }
}
