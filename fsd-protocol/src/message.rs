//! The typed message set.
//!
//! One tagged enum per the wire kinds, produced by a single dispatch step in
//! [`Message::parse`] so handlers never re-index a raw field list, and
//! rendered back by [`Message::encode`] with fixed field order and fixed
//! formatting. `parse(encode(m)) == m` holds for every kind.

use crate::envelope::{Envelope, MessageKind};
use crate::error::{FieldError, ParseError};
use crate::fields::{
    AtcRating, FacilityType, PilotRating, ProtocolVersion, TransponderMode, encode_coordinate,
    parse_coordinate, parse_frequency_khz, parse_hex_u32, parse_i32, parse_u16, parse_u32,
};

/// Login and flight-plan messages are always addressed to the server.
pub const SERVER_TARGET: &str = "SERVER";

/// Broadcast tag addressing aircraft-config queries to all aircraft in
/// range instead of one callsign.
pub const ACC_BROADCAST_TAG: &str = "@94836";

// ── Addressing ─────────────────────────────────────────────────────

/// Wildcard distribution targets rendered as fixed tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastTarget {
    /// `*` — every connected client.
    AllClients,
    /// `*A` — all ATC in range.
    AllAtc,
    /// `*S` — all supervisors.
    AllSupervisors,
}

impl BroadcastTarget {
    pub fn token(self) -> &'static str {
        match self {
            BroadcastTarget::AllClients => "*",
            BroadcastTarget::AllAtc => "*A",
            BroadcastTarget::AllSupervisors => "*S",
        }
    }

    fn from_token(tok: &str) -> Option<Self> {
        match tok {
            "*" => Some(BroadcastTarget::AllClients),
            "*A" => Some(BroadcastTarget::AllAtc),
            "*S" => Some(BroadcastTarget::AllSupervisors),
            _ => None,
        }
    }
}

/// Where a text message is addressed: a station, a radio frequency, or a
/// wildcard group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextTarget {
    Callsign(String),
    /// Frequency-addressed (radio) text; value in kHz.
    Radio(u32),
    Broadcast(BroadcastTarget),
}

impl TextTarget {
    pub fn encode(&self) -> String {
        match self {
            TextTarget::Callsign(cs) => cs.clone(),
            TextTarget::Radio(khz) => format!("@{:05}", khz.saturating_sub(100_000)),
            TextTarget::Broadcast(b) => b.token().to_string(),
        }
    }

    pub fn parse(tok: &str) -> Result<Self, FieldError> {
        if let Some(b) = BroadcastTarget::from_token(tok) {
            return Ok(TextTarget::Broadcast(b));
        }
        if let Some(freq) = tok.strip_prefix('@') {
            return Ok(TextTarget::Radio(parse_frequency_khz(freq)?));
        }
        Ok(TextTarget::Callsign(tok.to_string()))
    }
}

// ── Message payloads ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PilotLogin {
    pub callsign: String,
    pub client_id: u32,
    pub key: String,
    pub rating: AtcRating,
    pub protocol: ProtocolVersion,
    pub simulator_type: u8,
    pub real_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtcLogin {
    pub callsign: String,
    pub real_name: String,
    pub client_id: u32,
    pub key: String,
    pub rating: AtcRating,
    pub protocol: ProtocolVersion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextMessage {
    pub from: String,
    pub to: TextTarget,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PilotPosition {
    pub mode: TransponderMode,
    pub callsign: String,
    pub squawk: u16,
    pub rating: AtcRating,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: i32,
    pub groundspeed_kts: u32,
    /// Packed pitch/bank/heading/on-ground word, see [`crate::fields::pack_pbh`].
    pub pbh: u32,
    pub pilot_rating: PilotRating,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtcPosition {
    pub callsign: String,
    pub frequency_khz: u32,
    pub facility: FacilityType,
    pub visual_range_nm: u32,
    pub rating: AtcRating,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: i32,
}

/// `$CQ` payload, keyed by the query-type token.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    /// `CAPS` — ask a peer for its capability list.
    Capabilities,
    /// `ATIS` — ask a controller for its ATIS.
    Atis,
    /// `ACC:<json>` — incremental aircraft-configuration delta. The payload
    /// is kept as raw text so it re-encodes byte-identically; use
    /// [`ClientQuery::aircraft_config`] for the parsed form.
    AircraftConfig { json: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientQuery {
    pub from: String,
    pub to: String,
    pub payload: QueryPayload,
}

impl ClientQuery {
    /// Parsed JSON of an `ACC` payload, `None` for other query types.
    pub fn aircraft_config(&self) -> Option<serde_json::Result<serde_json::Value>> {
        match &self.payload {
            QueryPayload::AircraftConfig { json } => Some(serde_json::from_str(json)),
            _ => None,
        }
    }
}

/// One line of a multi-line ATIS reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AtisLine {
    /// `T` — one text line of the ATIS body.
    Text(String),
    /// `Z` — the controller's planned logoff time.
    LogoffTime(String),
    /// `E` — terminator carrying the expected body line count.
    End { line_count: u32 },
}

/// `$CR` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// `CAPS:<KEY=1>...` — advertised capability tokens, kept raw; the
    /// capability registry interprets them.
    Capabilities { tokens: Vec<String> },
    Atis(AtisLine),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    pub from: String,
    pub to: String,
    pub payload: ReplyPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneInfoResponse {
    pub from: String,
    pub to: String,
    pub equipment: String,
    pub airline: Option<String>,
    pub livery: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRules {
    Ifr,
    Vfr,
    Dvfr,
    Svfr,
}

impl FlightRules {
    fn token(self) -> &'static str {
        match self {
            FlightRules::Ifr => "I",
            FlightRules::Vfr => "V",
            FlightRules::Dvfr => "D",
            FlightRules::Svfr => "S",
        }
    }

    fn from_token(tok: &str) -> Result<Self, FieldError> {
        match tok {
            "I" => Ok(FlightRules::Ifr),
            "V" => Ok(FlightRules::Vfr),
            "D" => Ok(FlightRules::Dvfr),
            "S" => Ok(FlightRules::Svfr),
            other => Err(FieldError::UnknownValue {
                what: "flight rules",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightPlan {
    pub callsign: String,
    pub rules: FlightRules,
    /// Aircraft type, optionally with an ICAO equipment suffix.
    pub equipment: String,
    pub cruise_tas_kts: u32,
    pub departure: String,
    /// Estimated and actual departure times, opaque zulu tokens.
    pub etd: String,
    pub atd: String,
    pub cruise_level: u32,
    pub destination: String,
    pub hours_enroute: u32,
    pub minutes_enroute: u32,
    pub hours_fuel: u32,
    pub minutes_fuel: u32,
    pub alternate: String,
    /// Colons here are replaced with spaces on encode; the route, not the
    /// remarks, owns the free-text tail of the line.
    pub remarks: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    pub from: String,
    pub to: String,
    pub code: u16,
    pub param: String,
    pub text: String,
}

// ── The tagged message type ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    PilotLogin(PilotLogin),
    AtcLogin(AtcLogin),
    DeletePilot { callsign: String, client_id: u32 },
    DeleteAtc { callsign: String, client_id: u32 },
    Text(TextMessage),
    PilotPosition(PilotPosition),
    AtcPosition(AtcPosition),
    Query(ClientQuery),
    Response(ClientResponse),
    Ping { from: String, to: String, timestamp: String },
    Pong { from: String, to: String, timestamp: String },
    PlaneInfoRequest { from: String, to: String },
    PlaneInfoResponse(PlaneInfoResponse),
    FlightPlan(FlightPlan),
    AuthChallenge { from: String, to: String, challenge: String },
    AuthResponse { from: String, to: String, response: String },
    ServerError(ServerError),
    Kill { from: String, to: String, reason: Option<String> },
}

impl Message {
    /// Render the message as one wire line, without the CR LF terminator.
    pub fn encode(&self) -> String {
        match self {
            Message::PilotLogin(m) => format!(
                "#AP{}:{}:{:x}:{}:{}:{}:{}:{}",
                m.callsign,
                SERVER_TARGET,
                m.client_id,
                m.key,
                m.rating.to_wire(),
                m.protocol.to_wire(),
                m.simulator_type,
                m.real_name,
            ),
            Message::AtcLogin(m) => format!(
                "#AA{}:{}:{}:{:x}:{}:{}:{}",
                m.callsign,
                SERVER_TARGET,
                m.real_name,
                m.client_id,
                m.key,
                m.rating.to_wire(),
                m.protocol.to_wire(),
            ),
            Message::DeletePilot { callsign, client_id } => {
                format!("#DP{callsign}:{client_id:x}")
            }
            Message::DeleteAtc { callsign, client_id } => {
                format!("#DA{callsign}:{client_id:x}")
            }
            Message::Text(m) => format!("#TM{}:{}:{}", m.from, m.to.encode(), m.text),
            Message::PilotPosition(m) => format!(
                "@{}:{}:{:04}:{}:{}:{}:{}:{}:{}:{}",
                m.mode.to_wire(),
                m.callsign,
                m.squawk,
                m.rating.to_wire(),
                encode_coordinate(m.latitude),
                encode_coordinate(m.longitude),
                m.altitude_ft,
                m.groundspeed_kts,
                m.pbh,
                m.pilot_rating.to_wire(),
            ),
            Message::AtcPosition(m) => format!(
                "%{}:{:05}:{}:{}:{}:{}:{}:{}",
                m.callsign,
                m.frequency_khz.saturating_sub(100_000),
                m.facility.to_wire(),
                m.visual_range_nm,
                m.rating.to_wire(),
                encode_coordinate(m.latitude),
                encode_coordinate(m.longitude),
                m.altitude_m,
            ),
            Message::Query(m) => match &m.payload {
                QueryPayload::Capabilities => format!("$CQ{}:{}:CAPS", m.from, m.to),
                QueryPayload::Atis => format!("$CQ{}:{}:ATIS", m.from, m.to),
                QueryPayload::AircraftConfig { json } => {
                    format!("$CQ{}:{}:ACC:{}", m.from, m.to, json)
                }
            },
            Message::Response(m) => match &m.payload {
                ReplyPayload::Capabilities { tokens } => {
                    let mut line = format!("$CR{}:{}:CAPS", m.from, m.to);
                    for tok in tokens {
                        line.push(':');
                        line.push_str(tok);
                    }
                    line
                }
                ReplyPayload::Atis(atis) => match atis {
                    AtisLine::Text(text) => format!("$CR{}:{}:ATIS:T:{}", m.from, m.to, text),
                    AtisLine::LogoffTime(t) => format!("$CR{}:{}:ATIS:Z:{}", m.from, m.to, t),
                    AtisLine::End { line_count } => {
                        format!("$CR{}:{}:ATIS:E:{}", m.from, m.to, line_count)
                    }
                },
            },
            Message::Ping { from, to, timestamp } => format!("$PI{from}:{to}:{timestamp}"),
            Message::Pong { from, to, timestamp } => format!("$PO{from}:{to}:{timestamp}"),
            Message::PlaneInfoRequest { from, to } => format!("#SB{from}:{to}:PIR"),
            Message::PlaneInfoResponse(m) => {
                let mut line = format!("#SB{}:{}:PI:GEN:EQUIPMENT={}", m.from, m.to, m.equipment);
                if let Some(airline) = &m.airline {
                    line.push_str(":AIRLINE=");
                    line.push_str(airline);
                }
                if let Some(livery) = &m.livery {
                    line.push_str(":LIVERY=");
                    line.push_str(livery);
                }
                line
            }
            Message::FlightPlan(m) => format!(
                "$FP{}:{}:{}:{}:{}:{}:{}:{}:FL{}:{}:{}:{}:{}:{}:{}:{}:{}",
                m.callsign,
                SERVER_TARGET,
                m.rules.token(),
                m.equipment,
                m.cruise_tas_kts,
                m.departure,
                m.etd,
                m.atd,
                m.cruise_level,
                m.destination,
                m.hours_enroute,
                m.minutes_enroute,
                m.hours_fuel,
                m.minutes_fuel,
                m.alternate,
                m.remarks.replace(':', " "),
                m.route,
            ),
            Message::AuthChallenge { from, to, challenge } => {
                format!("$ZC{from}:{to}:{challenge}")
            }
            Message::AuthResponse { from, to, response } => {
                format!("$ZR{from}:{to}:{response}")
            }
            Message::ServerError(m) => {
                format!("$ER{}:{}:{:03}:{}:{}", m.from, m.to, m.code, m.param, m.text)
            }
            Message::Kill { from, to, reason } => match reason {
                Some(reason) => format!("$!!{from}:{to}:{reason}"),
                None => format!("$!!{from}:{to}"),
            },
        }
    }

    /// The full terminated line as it goes on the wire.
    pub fn to_wire(&self) -> String {
        let mut line = self.encode();
        line.push_str("\r\n");
        line
    }

    /// Parse one received line (terminator tolerated) into a typed message.
    pub fn parse(line: &str) -> Result<Message, ParseError> {
        let env = Envelope::parse(line)?;
        let kind = env.kind;
        let bad = |source: FieldError| ParseError::BadField {
            kind: kind.name(),
            source,
        };

        Ok(match kind {
            MessageKind::PilotLogin => Message::PilotLogin(PilotLogin {
                callsign: env.field(0)?.to_string(),
                client_id: parse_hex_u32(env.field(2)?).map_err(bad)?,
                key: env.field(3)?.to_string(),
                rating: parse_u8(env.field(4)?)
                    .and_then(AtcRating::from_wire)
                    .map_err(bad)?,
                protocol: ProtocolVersion::from_wire(parse_u16(env.field(5)?).map_err(bad)?),
                simulator_type: parse_u8(env.field(6)?).map_err(bad)?,
                real_name: env.tail(7),
            }),
            MessageKind::AtcLogin => Message::AtcLogin(AtcLogin {
                callsign: env.field(0)?.to_string(),
                real_name: env.field(2)?.to_string(),
                client_id: parse_hex_u32(env.field(3)?).map_err(bad)?,
                key: env.field(4)?.to_string(),
                rating: parse_u8(env.field(5)?)
                    .and_then(AtcRating::from_wire)
                    .map_err(bad)?,
                protocol: ProtocolVersion::from_wire(parse_u16(env.field(6)?).map_err(bad)?),
            }),
            MessageKind::DeletePilot => Message::DeletePilot {
                callsign: env.field(0)?.to_string(),
                client_id: parse_hex_u32(env.field(1)?).map_err(bad)?,
            },
            MessageKind::DeleteAtc => Message::DeleteAtc {
                callsign: env.field(0)?.to_string(),
                client_id: parse_hex_u32(env.field(1)?).map_err(bad)?,
            },
            MessageKind::TextMessage => Message::Text(TextMessage {
                from: env.field(0)?.to_string(),
                to: TextTarget::parse(env.field(1)?).map_err(bad)?,
                text: env.tail(2),
            }),
            MessageKind::PilotPosition => Message::PilotPosition(PilotPosition {
                mode: TransponderMode::from_wire(env.field(0)?).map_err(bad)?,
                callsign: env.field(1)?.to_string(),
                squawk: parse_u16(env.field(2)?).map_err(bad)?,
                rating: parse_u8(env.field(3)?)
                    .and_then(AtcRating::from_wire)
                    .map_err(bad)?,
                latitude: parse_coordinate(env.field(4)?).map_err(bad)?,
                longitude: parse_coordinate(env.field(5)?).map_err(bad)?,
                altitude_ft: parse_i32(env.field(6)?).map_err(bad)?,
                groundspeed_kts: parse_u32(env.field(7)?).map_err(bad)?,
                pbh: parse_u32(env.field(8)?).map_err(bad)?,
                pilot_rating: parse_u8(env.field(9)?)
                    .and_then(PilotRating::from_wire)
                    .map_err(bad)?,
            }),
            MessageKind::AtcPosition => Message::AtcPosition(AtcPosition {
                callsign: env.field(0)?.to_string(),
                frequency_khz: parse_frequency_khz(env.field(1)?).map_err(bad)?,
                facility: parse_u8(env.field(2)?)
                    .and_then(FacilityType::from_wire)
                    .map_err(bad)?,
                visual_range_nm: parse_u32(env.field(3)?).map_err(bad)?,
                rating: parse_u8(env.field(4)?)
                    .and_then(AtcRating::from_wire)
                    .map_err(bad)?,
                latitude: parse_coordinate(env.field(5)?).map_err(bad)?,
                longitude: parse_coordinate(env.field(6)?).map_err(bad)?,
                altitude_m: parse_i32(env.field(7)?).map_err(bad)?,
            }),
            MessageKind::ClientQuery => {
                let from = env.field(0)?.to_string();
                let to = env.field(1)?.to_string();
                let payload = match env.field(2)? {
                    "CAPS" => QueryPayload::Capabilities,
                    "ATIS" => QueryPayload::Atis,
                    "ACC" => QueryPayload::AircraftConfig { json: env.tail(3) },
                    other => {
                        return Err(ParseError::UnknownMessage(format!("$CQ:{other}")));
                    }
                };
                Message::Query(ClientQuery { from, to, payload })
            }
            MessageKind::ClientResponse => {
                let from = env.field(0)?.to_string();
                let to = env.field(1)?.to_string();
                let payload = match env.field(2)? {
                    "CAPS" => ReplyPayload::Capabilities {
                        tokens: env.fields[3..].iter().map(|s| s.to_string()).collect(),
                    },
                    "ATIS" => ReplyPayload::Atis(match env.field(3)? {
                        "T" => AtisLine::Text(env.tail(4)),
                        "Z" => AtisLine::LogoffTime(env.tail(4)),
                        "E" => AtisLine::End {
                            line_count: parse_u32(env.field(4)?).map_err(bad)?,
                        },
                        other => {
                            return Err(ParseError::UnknownMessage(format!("$CR:ATIS:{other}")));
                        }
                    }),
                    other => {
                        return Err(ParseError::UnknownMessage(format!("$CR:{other}")));
                    }
                };
                Message::Response(ClientResponse { from, to, payload })
            }
            MessageKind::Ping => Message::Ping {
                from: env.field(0)?.to_string(),
                to: env.field(1)?.to_string(),
                timestamp: env.field(2)?.to_string(),
            },
            MessageKind::Pong => Message::Pong {
                from: env.field(0)?.to_string(),
                to: env.field(1)?.to_string(),
                timestamp: env.field(2)?.to_string(),
            },
            MessageKind::PlaneInfo => {
                let from = env.field(0)?.to_string();
                let to = env.field(1)?.to_string();
                match env.field(2)? {
                    "PIR" => Message::PlaneInfoRequest { from, to },
                    "PI" if env.field(3).is_ok_and(|f| f == "GEN") => {
                        let mut equipment = None;
                        let mut airline = None;
                        let mut livery = None;
                        for param in &env.fields[4..] {
                            match param.split_once('=') {
                                Some(("EQUIPMENT", v)) => equipment = Some(v.to_string()),
                                Some(("AIRLINE", v)) => airline = Some(v.to_string()),
                                Some(("LIVERY", v)) => livery = Some(v.to_string()),
                                // Forward compatible: unknown keys are skipped.
                                _ => {}
                            }
                        }
                        Message::PlaneInfoResponse(PlaneInfoResponse {
                            from,
                            to,
                            equipment: equipment.ok_or(ParseError::MalformedMessage {
                                kind: kind.name(),
                                expected: 5,
                                got: env.fields.len(),
                            })?,
                            airline,
                            livery,
                        })
                    }
                    other => {
                        return Err(ParseError::UnknownMessage(format!("#SB:{other}")));
                    }
                }
            }
            MessageKind::FlightPlan => {
                let level_tok = env.field(8)?;
                let cruise_level =
                    parse_u32(level_tok.strip_prefix("FL").unwrap_or(level_tok)).map_err(bad)?;
                Message::FlightPlan(FlightPlan {
                    callsign: env.field(0)?.to_string(),
                    rules: FlightRules::from_token(env.field(2)?).map_err(bad)?,
                    equipment: env.field(3)?.to_string(),
                    cruise_tas_kts: parse_u32(env.field(4)?).map_err(bad)?,
                    departure: env.field(5)?.to_string(),
                    etd: env.field(6)?.to_string(),
                    atd: env.field(7)?.to_string(),
                    cruise_level,
                    destination: env.field(9)?.to_string(),
                    hours_enroute: parse_u32(env.field(10)?).map_err(bad)?,
                    minutes_enroute: parse_u32(env.field(11)?).map_err(bad)?,
                    hours_fuel: parse_u32(env.field(12)?).map_err(bad)?,
                    minutes_fuel: parse_u32(env.field(13)?).map_err(bad)?,
                    alternate: env.field(14)?.to_string(),
                    remarks: env.field(15)?.to_string(),
                    route: env.tail(16),
                })
            }
            MessageKind::AuthChallenge => Message::AuthChallenge {
                from: env.field(0)?.to_string(),
                to: env.field(1)?.to_string(),
                challenge: env.field(2)?.to_string(),
            },
            MessageKind::AuthResponse => Message::AuthResponse {
                from: env.field(0)?.to_string(),
                to: env.field(1)?.to_string(),
                response: env.field(2)?.to_string(),
            },
            MessageKind::ServerError => Message::ServerError(ServerError {
                from: env.field(0)?.to_string(),
                to: env.field(1)?.to_string(),
                code: parse_u16(env.field(2)?).map_err(bad)?,
                param: env.field(3)?.to_string(),
                text: env.tail(4),
            }),
            MessageKind::Kill => Message::Kill {
                from: env.field(0)?.to_string(),
                to: env.field(1)?.to_string(),
                reason: if env.fields.len() > 2 {
                    Some(env.tail(2))
                } else {
                    None
                },
            },
        })
    }
}

fn parse_u8(tok: &str) -> Result<u8, FieldError> {
    tok.trim()
        .parse()
        .map_err(|_| FieldError::InvalidNumber(tok.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::pack_pbh;

    fn round_trip(msg: Message) {
        let line = msg.encode();
        assert_eq!(Message::parse(&line).unwrap(), msg, "line was {line:?}");
    }

    #[test]
    fn pilot_login_reference_vector() {
        let msg = Message::PilotLogin(PilotLogin {
            callsign: "ABCD".to_string(),
            client_id: 0x1234567,
            key: "123456".to_string(),
            rating: AtcRating::Observer,
            protocol: ProtocolVersion { major: 1, minor: 1 },
            simulator_type: 16,
            real_name: "Test User".to_string(),
        });
        assert_eq!(msg.encode(), "#APABCD:SERVER:1234567:123456:1:101:16:Test User");
        assert_eq!(msg.to_wire(), "#APABCD:SERVER:1234567:123456:1:101:16:Test User\r\n");
        round_trip(msg);
    }

    #[test]
    fn atc_login_and_deletes() {
        let msg = Message::AtcLogin(AtcLogin {
            callsign: "EGLL_TWR".to_string(),
            real_name: "Jo Bloggs".to_string(),
            client_id: 0xbeef,
            key: "secret".to_string(),
            rating: AtcRating::Controller1,
            protocol: ProtocolVersion { major: 1, minor: 1 },
        });
        assert_eq!(msg.encode(), "#AAEGLL_TWR:SERVER:Jo Bloggs:beef:secret:5:101");
        round_trip(msg);

        let msg = Message::DeletePilot {
            callsign: "ABCD".to_string(),
            client_id: 0x1234567,
        };
        assert_eq!(msg.encode(), "#DPABCD:1234567");
        round_trip(msg);
        round_trip(Message::DeleteAtc {
            callsign: "EGLL_TWR".to_string(),
            client_id: 0xbeef,
        });
    }

    #[test]
    fn pilot_position_line() {
        let msg = Message::PilotPosition(PilotPosition {
            mode: TransponderMode::ModeC,
            callsign: "BAW123".to_string(),
            squawk: 200,
            rating: AtcRating::Observer,
            latitude: 51.4775,
            longitude: -0.46139,
            altitude_ft: 2500,
            groundspeed_kts: 140,
            pbh: pack_pbh(0.0, 0.0, 25.0, true),
            pilot_rating: PilotRating::Student,
        });
        assert_eq!(
            msg.encode(),
            "@N:BAW123:0200:1:51.47750:-0.46139:2500:140:285:1"
        );
        round_trip(msg);
    }

    #[test]
    fn atc_position_line() {
        let msg = Message::AtcPosition(AtcPosition {
            callsign: "EGLL_TWR".to_string(),
            frequency_khz: 118_500,
            facility: FacilityType::Tower,
            visual_range_nm: 50,
            rating: AtcRating::Controller1,
            latitude: 51.4775,
            longitude: -0.46139,
            altitude_m: 80,
        });
        assert_eq!(msg.encode(), "%EGLL_TWR:18500:4:50:5:51.47750:-0.46139:80");
        round_trip(msg);
    }

    #[test]
    fn text_targets() {
        let private = Message::Text(TextMessage {
            from: "BAW123".to_string(),
            to: TextTarget::Callsign("EGLL_TWR".to_string()),
            text: "request taxi".to_string(),
        });
        assert_eq!(private.encode(), "#TMBAW123:EGLL_TWR:request taxi");
        round_trip(private);

        let radio = Message::Text(TextMessage {
            from: "BAW123".to_string(),
            to: TextTarget::Radio(128_200),
            text: "with you, 2500ft".to_string(),
        });
        assert_eq!(radio.encode(), "#TMBAW123:@28200:with you, 2500ft");
        round_trip(radio);

        let wallop = Message::Text(TextMessage {
            from: "BAW123".to_string(),
            to: TextTarget::Broadcast(BroadcastTarget::AllSupervisors),
            text: "need a supervisor".to_string(),
        });
        assert_eq!(wallop.encode(), "#TMBAW123:*S:need a supervisor");
        round_trip(wallop);
    }

    #[test]
    fn text_free_tail_keeps_colons() {
        let msg = Message::parse("#TMEGLL_TWR:BAW123:QNH 1013: wind calm: cleared").unwrap();
        match msg {
            Message::Text(t) => assert_eq!(t.text, "QNH 1013: wind calm: cleared"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn capability_query_and_response() {
        let query = Message::Query(ClientQuery {
            from: "BAW123".to_string(),
            to: "EGLL_TWR".to_string(),
            payload: QueryPayload::Capabilities,
        });
        assert_eq!(query.encode(), "$CQBAW123:EGLL_TWR:CAPS");
        round_trip(query);

        let reply = Message::Response(ClientResponse {
            from: "EGLL_TWR".to_string(),
            to: "BAW123".to_string(),
            payload: ReplyPayload::Capabilities {
                tokens: vec!["ATCINFO=1".to_string(), "ACCONFIG=1".to_string()],
            },
        });
        assert_eq!(reply.encode(), "$CREGLL_TWR:BAW123:CAPS:ATCINFO=1:ACCONFIG=1");
        round_trip(reply);
    }

    #[test]
    fn aircraft_config_json_tail() {
        let msg = Message::Query(ClientQuery {
            from: "BAW123".to_string(),
            to: ACC_BROADCAST_TAG.to_string(),
            payload: QueryPayload::AircraftConfig {
                json: r#"{"config":{"lights":{"landing":true}}}"#.to_string(),
            },
        });
        assert_eq!(
            msg.encode(),
            r#"$CQBAW123:@94836:ACC:{"config":{"lights":{"landing":true}}}"#
        );
        round_trip(msg.clone());

        if let Message::Query(q) = Message::parse(&msg.encode()).unwrap() {
            let value = q.aircraft_config().unwrap().unwrap();
            assert_eq!(value["config"]["lights"]["landing"], true);
        } else {
            panic!("expected query");
        }
    }

    #[test]
    fn atis_lines() {
        let text = Message::parse("$CREGLL_ATIS:BAW123:ATIS:T:Info B: rwy 27L in use").unwrap();
        match text {
            Message::Response(ClientResponse {
                payload: ReplyPayload::Atis(AtisLine::Text(line)),
                ..
            }) => assert_eq!(line, "Info B: rwy 27L in use"),
            other => panic!("unexpected {other:?}"),
        }

        round_trip(Message::Response(ClientResponse {
            from: "EGLL_ATIS".to_string(),
            to: "BAW123".to_string(),
            payload: ReplyPayload::Atis(AtisLine::LogoffTime("2100z".to_string())),
        }));
        round_trip(Message::Response(ClientResponse {
            from: "EGLL_ATIS".to_string(),
            to: "BAW123".to_string(),
            payload: ReplyPayload::Atis(AtisLine::End { line_count: 3 }),
        }));
    }

    #[test]
    fn ping_pong() {
        let ping = Message::Ping {
            from: "SERVER".to_string(),
            to: "BAW123".to_string(),
            timestamp: "1694000000".to_string(),
        };
        assert_eq!(ping.encode(), "$PISERVER:BAW123:1694000000");
        round_trip(ping);
        round_trip(Message::Pong {
            from: "BAW123".to_string(),
            to: "SERVER".to_string(),
            timestamp: "1694000000".to_string(),
        });
    }

    #[test]
    fn plane_info_optional_groups() {
        let bare = Message::PlaneInfoResponse(PlaneInfoResponse {
            from: "BAW123".to_string(),
            to: "EZY45".to_string(),
            equipment: "B738".to_string(),
            airline: None,
            livery: None,
        });
        assert_eq!(bare.encode(), "#SBBAW123:EZY45:PI:GEN:EQUIPMENT=B738");
        round_trip(bare);

        let full = Message::PlaneInfoResponse(PlaneInfoResponse {
            from: "BAW123".to_string(),
            to: "EZY45".to_string(),
            equipment: "B738".to_string(),
            airline: Some("BAW".to_string()),
            livery: Some("OneWorld".to_string()),
        });
        assert_eq!(
            full.encode(),
            "#SBBAW123:EZY45:PI:GEN:EQUIPMENT=B738:AIRLINE=BAW:LIVERY=OneWorld"
        );
        round_trip(full);

        round_trip(Message::PlaneInfoRequest {
            from: "EZY45".to_string(),
            to: "BAW123".to_string(),
        });
    }

    #[test]
    fn flight_plan_line() {
        let msg = Message::FlightPlan(FlightPlan {
            callsign: "BAW123".to_string(),
            rules: FlightRules::Ifr,
            equipment: "B738/L".to_string(),
            cruise_tas_kts: 450,
            departure: "EGLL".to_string(),
            etd: "1230".to_string(),
            atd: "1240".to_string(),
            cruise_level: 350,
            destination: "LEMD".to_string(),
            hours_enroute: 2,
            minutes_enroute: 5,
            hours_fuel: 3,
            minutes_fuel: 30,
            alternate: "LETO".to_string(),
            remarks: "/v/ new pilot".to_string(),
            route: "CPT L9 KENET".to_string(),
        });
        assert_eq!(
            msg.encode(),
            "$FPBAW123:SERVER:I:B738/L:450:EGLL:1230:1240:FL350:LEMD:2:5:3:30:LETO:/v/ new pilot:CPT L9 KENET"
        );
        round_trip(msg);
    }

    #[test]
    fn flight_plan_empty_optionals_are_empty_segments() {
        let msg = Message::FlightPlan(FlightPlan {
            callsign: "BAW123".to_string(),
            rules: FlightRules::Vfr,
            equipment: "C172".to_string(),
            cruise_tas_kts: 110,
            departure: "EGLL".to_string(),
            etd: "1230".to_string(),
            atd: "1230".to_string(),
            cruise_level: 25,
            destination: "EGLL".to_string(),
            hours_enroute: 0,
            minutes_enroute: 45,
            hours_fuel: 2,
            minutes_fuel: 0,
            alternate: String::new(),
            remarks: String::new(),
            route: String::new(),
        });
        // Absent alternate/remarks render as empty segments, not omissions.
        assert_eq!(
            msg.encode(),
            "$FPBAW123:SERVER:V:C172:110:EGLL:1230:1230:FL25:EGLL:0:45:2:0:::"
        );
        round_trip(msg);
    }

    #[test]
    fn flight_plan_remarks_colons_are_sanitized() {
        let msg = Message::FlightPlan(FlightPlan {
            callsign: "BAW123".to_string(),
            rules: FlightRules::Ifr,
            equipment: "B738".to_string(),
            cruise_tas_kts: 450,
            departure: "EGLL".to_string(),
            etd: "1230".to_string(),
            atd: "1230".to_string(),
            cruise_level: 350,
            destination: "LEMD".to_string(),
            hours_enroute: 2,
            minutes_enroute: 5,
            hours_fuel: 3,
            minutes_fuel: 30,
            alternate: "LETO".to_string(),
            remarks: "ETOPS: no".to_string(),
            route: "DCT".to_string(),
        });
        assert!(msg.encode().contains(":ETOPS  no:DCT"));
    }

    #[test]
    fn auth_and_kill_and_error() {
        round_trip(Message::AuthChallenge {
            from: "SERVER".to_string(),
            to: "BAW123".to_string(),
            challenge: "c68a24b1".to_string(),
        });
        round_trip(Message::AuthResponse {
            from: "BAW123".to_string(),
            to: "SERVER".to_string(),
            response: "deadbeef".to_string(),
        });

        let kill = Message::Kill {
            from: "SUP".to_string(),
            to: "BAW123".to_string(),
            reason: None,
        };
        // Trailing optional group omitted entirely when absent.
        assert_eq!(kill.encode(), "$!!SUP:BAW123");
        round_trip(kill);
        round_trip(Message::Kill {
            from: "SUP".to_string(),
            to: "BAW123".to_string(),
            reason: Some("idling on a tower frequency".to_string()),
        });

        let err = Message::parse("$ERSERVER:BAW123:006:EGLL_GND:no such callsign").unwrap();
        match &err {
            Message::ServerError(e) => {
                assert_eq!(e.code, 6);
                assert_eq!(e.param, "EGLL_GND");
                assert_eq!(e.text, "no such callsign");
            }
            other => panic!("unexpected {other:?}"),
        }
        round_trip(err);
    }

    #[test]
    fn unknown_query_type_is_unknown_message() {
        assert!(matches!(
            Message::parse("$CQBAW123:SERVER:WH"),
            Err(ParseError::UnknownMessage(_))
        ));
    }

    #[test]
    fn malformed_numeric_field_is_bad_field() {
        assert!(matches!(
            Message::parse("@N:BAW123:22OO:1:51.0:-0.4:2500:140:285:1"),
            Err(ParseError::BadField { .. })
        ));
    }
}
