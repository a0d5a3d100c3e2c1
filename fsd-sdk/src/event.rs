//! Events emitted by the client for the consumer (GUI, interpolation
//! engine, logger) to act on. One inbound line is dispatched to completion
//! before the next is parsed, so event order is server-send order.

use fsd_protocol::fields::{PilotRating, TransponderMode, unpack_pbh};
use fsd_protocol::message::{AtcPosition, FlightPlan, PilotPosition};

use crate::caps::CapabilitySet;
use crate::consolidate::TextBatch;

/// A pilot position with the packed pitch/bank/heading word already
/// unpacked into degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct PilotPositionUpdate {
    pub callsign: String,
    pub mode: TransponderMode,
    pub squawk: u16,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: i32,
    pub groundspeed_kts: u32,
    pub pitch: f64,
    pub bank: f64,
    pub heading: f64,
    pub on_ground: bool,
    pub pilot_rating: PilotRating,
}

impl From<PilotPosition> for PilotPositionUpdate {
    fn from(p: PilotPosition) -> Self {
        let (pitch, bank, heading, on_ground) = unpack_pbh(p.pbh);
        PilotPositionUpdate {
            callsign: p.callsign,
            mode: p.mode,
            squawk: p.squawk,
            latitude: p.latitude,
            longitude: p.longitude,
            altitude_ft: p.altitude_ft,
            groundspeed_kts: p.groundspeed_kts,
            pitch,
            bank,
            heading,
            on_ground,
            pilot_rating: p.pilot_rating,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    /// Login sent, transport ready; the session is live.
    Connected,

    /// The session ended — orderly logoff, server kill, or transport loss.
    Disconnected { reason: String },

    /// A peer aircraft moved.
    PilotPosition(PilotPositionUpdate),

    /// A controller position/refresh.
    AtcPosition(AtcPosition),

    /// One consolidated burst of text from a single sender (radio or
    /// private), fragments in arrival order.
    TextBatch(TextBatch),

    /// A peer answered a capability query.
    CapabilitiesReceived { from: String, caps: CapabilitySet },

    /// A complete ATIS: body lines newline-joinable, plus the controller's
    /// planned logoff time when one was sent.
    Atis {
        from: String,
        lines: Vec<String>,
        logoff_time: Option<String>,
    },

    /// A peer filed or amended a flight plan.
    FlightPlanReceived(FlightPlan),

    /// A peer asked what we are flying; answer with
    /// [`crate::client::ClientHandle::send_plane_info`].
    PlaneInfoRequest { from: String },

    /// A peer told us what it is flying.
    PlaneInfoResponse {
        from: String,
        equipment: String,
        airline: Option<String>,
        livery: Option<String>,
    },

    /// Incremental aircraft-configuration delta from a peer.
    AircraftConfig {
        from: String,
        config: serde_json::Value,
    },

    /// A peer answered one of our pings; the timestamp is the token we
    /// sent, echoed back.
    Pong { from: String, timestamp: String },

    /// A pilot left the network.
    PilotDeleted { callsign: String },

    /// A controller left the network.
    AtcDeleted { callsign: String },

    /// `$ER` from the server.
    ServerError {
        code: u16,
        param: String,
        text: String,
    },

    /// A supervisor ordered this session off the network. The client tears
    /// down immediately after emitting this.
    KillRequested {
        from: String,
        reason: Option<String>,
    },

    /// Every received line, before parsing — the diagnostics trace feed.
    /// Malformed lines appear here even though no typed event follows.
    RawLine(String),
}
