//! FSD protocol client.
//!
//! This is the entry point for SDK consumers. [`connect`] opens a TCP
//! stream, sends the login message, and runs the protocol in a spawned
//! task; the caller gets a [`ClientHandle`] for outbound operations and an
//! [`Event`] receiver for everything inbound. [`connect_with_stream`]
//! accepts any `AsyncRead + AsyncWrite` stream, which is how the tests
//! drive a session over `tokio::io::duplex` without a network.
//!
//! ## Reconnection
//!
//! The SDK does not reconnect on its own. A transport loss surfaces as
//! [`Event::Disconnected`]; retry policy (backoff, rate limits) belongs to
//! the consumer.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;

use fsd_protocol::fields::{FacilityType, TransponderMode, pack_pbh};
use fsd_protocol::message::{
    ACC_BROADCAST_TAG, AtcPosition, AtisLine, BroadcastTarget, ClientQuery, ClientResponse,
    FlightPlan, Message, PilotPosition, PlaneInfoResponse, QueryPayload, ReplyPayload,
    TextMessage, TextTarget,
};

use crate::caps::{Capability, CapabilitySet};
use crate::consolidate::{BatchKey, ConsolidationBuffer};
use crate::error::ClientError;
use crate::event::Event;
use crate::session::{ClientIdentity, ServerTarget, SessionState};

/// Everything needed to bring a session up.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub identity: ClientIdentity,
    pub server: ServerTarget,
    /// How long a text burst may go quiet before its batch is delivered.
    pub consolidation_window: Duration,
}

impl ClientConfig {
    pub fn new(identity: ClientIdentity, server: ServerTarget) -> Self {
        ClientConfig {
            identity,
            server,
            consolidation_window: Duration::from_secs(1),
        }
    }
}

/// One position sample for [`ClientHandle::send_pilot_position`]; angles in
/// degrees, the wire packing is handled here.
#[derive(Debug, Clone, Copy)]
pub struct PositionReport {
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
}

/// Controller position sample for [`ClientHandle::send_atc_position`].
#[derive(Debug, Clone, Copy)]
pub struct AtcPositionReport {
    pub frequency_khz: u32,
    pub facility: FacilityType,
    pub visual_range_nm: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: i32,
}

/// Commands the consumer can send to the client task.
#[derive(Debug)]
enum Command {
    Text { to: TextTarget, text: String },
    PilotPosition(PositionReport),
    AtcPosition(AtcPositionReport),
    FileFlightPlan(FlightPlan),
    Ping { to: String },
    QueryCapabilities { to: String },
    QueryAtis { to: String },
    RequestPlaneInfo { to: String },
    SendPlaneInfo {
        to: String,
        equipment: String,
        airline: Option<String>,
        livery: Option<String>,
    },
    AircraftConfig {
        to: Option<String>,
        config: serde_json::Value,
    },
    Raw(String),
    Disconnect,
}

/// A handle to a running session.
#[derive(Clone)]
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl ClientHandle {
    async fn send(&self, cmd: Command) -> Result<(), ClientError> {
        self.cmd_tx.send(cmd).await.map_err(|_| ClientError::ChannelClosed)
    }

    /// Private text to a station.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<(), ClientError> {
        self.send(Command::Text {
            to: TextTarget::Callsign(to.to_ascii_uppercase()),
            text: text.to_string(),
        })
        .await
    }

    /// Text on a radio frequency (kHz).
    pub async fn send_radio_text(&self, frequency_khz: u32, text: &str) -> Result<(), ClientError> {
        if frequency_khz < 100_000 {
            return Err(ClientError::BadFrequency(frequency_khz));
        }
        self.send(Command::Text {
            to: TextTarget::Radio(frequency_khz),
            text: text.to_string(),
        })
        .await
    }

    /// Text to all supervisors (`*S`).
    pub async fn send_wallop(&self, text: &str) -> Result<(), ClientError> {
        self.send(Command::Text {
            to: TextTarget::Broadcast(BroadcastTarget::AllSupervisors),
            text: text.to_string(),
        })
        .await
    }

    pub async fn send_pilot_position(&self, report: PositionReport) -> Result<(), ClientError> {
        self.send(Command::PilotPosition(report)).await
    }

    pub async fn send_atc_position(&self, report: AtcPositionReport) -> Result<(), ClientError> {
        if report.frequency_khz < 100_000 {
            return Err(ClientError::BadFrequency(report.frequency_khz));
        }
        self.send(Command::AtcPosition(report)).await
    }

    /// File a flight plan. The sender callsign is filled in by the session.
    pub async fn file_flight_plan(&self, plan: FlightPlan) -> Result<(), ClientError> {
        self.send(Command::FileFlightPlan(plan)).await
    }

    pub async fn send_ping(&self, to: &str) -> Result<(), ClientError> {
        self.send(Command::Ping { to: to.to_string() }).await
    }

    pub async fn request_capabilities(&self, to: &str) -> Result<(), ClientError> {
        self.send(Command::QueryCapabilities { to: to.to_string() }).await
    }

    /// Ask a controller for its ATIS; the reply arrives assembled as
    /// [`Event::Atis`].
    pub async fn request_atis(&self, to: &str) -> Result<(), ClientError> {
        self.send(Command::QueryAtis { to: to.to_string() }).await
    }

    pub async fn request_plane_info(&self, to: &str) -> Result<(), ClientError> {
        self.send(Command::RequestPlaneInfo { to: to.to_string() }).await
    }

    pub async fn send_plane_info(
        &self,
        to: &str,
        equipment: &str,
        airline: Option<&str>,
        livery: Option<&str>,
    ) -> Result<(), ClientError> {
        self.send(Command::SendPlaneInfo {
            to: to.to_string(),
            equipment: equipment.to_string(),
            airline: airline.map(str::to_string),
            livery: livery.map(str::to_string),
        })
        .await
    }

    /// Send an incremental aircraft-configuration delta. `None` broadcasts
    /// to all aircraft in range; a targeted send is skipped when the peer
    /// is known not to support it.
    pub async fn send_aircraft_config(
        &self,
        to: Option<&str>,
        config: serde_json::Value,
    ) -> Result<(), ClientError> {
        self.send(Command::AircraftConfig {
            to: to.map(str::to_string),
            config,
        })
        .await
    }

    /// Escape hatch: one pre-rendered line, terminator added here.
    pub async fn raw(&self, line: &str) -> Result<(), ClientError> {
        self.send(Command::Raw(line.to_string())).await
    }

    /// Orderly logoff: delete message, then teardown. Pending consolidation
    /// batches are discarded, not delivered.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.send(Command::Disconnect).await
    }
}

/// Connect to the configured server and run the session.
///
/// The established TCP stream is the transport-ready signal: the login
/// message goes out and the session reaches Connected as the task starts.
pub async fn connect(config: ClientConfig) -> Result<(ClientHandle, mpsc::Receiver<Event>)> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::debug!(%addr, "connecting");
    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("TCP connect to {addr} failed: {e}"))?;
    tcp.set_nodelay(true)?;
    Ok(connect_with_stream(tcp, config)?)
}

/// Run a session over an already-established stream.
///
/// Identity and credentials are validated here, before any traffic: a
/// missing callsign or auth key is an error from this call, not a later
/// surprise on the wire.
pub fn connect_with_stream<S>(
    stream: S,
    config: ClientConfig,
) -> Result<(ClientHandle, mpsc::Receiver<Event>), ClientError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let session = SessionState::new(config.identity, config.server)?;
    let window = config.consolidation_window;

    let (event_tx, event_rx) = mpsc::channel(4096);
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let handle = ClientHandle { cmd_tx };

    tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(stream);
        let result = run_session(
            BufReader::new(reader),
            writer,
            session,
            window,
            event_tx.clone(),
            cmd_rx,
        )
        .await;
        if let Err(e) = result {
            let _ = event_tx
                .send(Event::Disconnected {
                    reason: e.to_string(),
                })
                .await;
        }
    });

    Ok((handle, event_rx))
}

enum Flow {
    Continue,
    Stop,
}

async fn run_session<R, W>(
    mut reader: R,
    mut writer: W,
    mut session: SessionState,
    window: Duration,
    event_tx: mpsc::Sender<Event>,
    mut cmd_rx: mpsc::Receiver<Command>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.begin_connect().map_err(anyhow::Error::from)?;
    let login = session.login_message();
    writer.write_all(login.to_wire().as_bytes()).await?;
    session.transport_ready();
    tracing::info!(callsign = session.callsign(), "session connected");
    let _ = event_tx.send(Event::Connected).await;

    let mut consolidation = ConsolidationBuffer::new(window);
    let mut atis = HashMap::new();
    let mut line_buf = String::new();

    loop {
        let flush_at = consolidation.deadline();
        tokio::select! {
            result = reader.read_line(&mut line_buf) => {
                let n = result?;
                if n == 0 {
                    session.connection_lost();
                    consolidation.clear();
                    let _ = event_tx.send(Event::Disconnected { reason: "connection lost".to_string() }).await;
                    break;
                }
                let raw = line_buf.trim_end().to_string();
                line_buf.clear();
                // Raw trace feed first: malformed lines stay diagnosable
                // even though they produce no typed event.
                let _ = event_tx.send(Event::RawLine(raw.clone())).await;
                match Message::parse(&raw) {
                    Ok(msg) => {
                        let flow = dispatch_inbound(
                            msg,
                            &mut session,
                            &mut consolidation,
                            &mut atis,
                            &mut writer,
                            &event_tx,
                        )
                        .await?;
                        if let Flow::Stop = flow {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, line = %raw, "dropping undecodable line");
                    }
                }
            }
            Some(cmd) = cmd_rx.recv() => {
                if matches!(cmd, Command::Disconnect) {
                    if session.begin_disconnect() {
                        writer.write_all(session.delete_message().to_wire().as_bytes()).await?;
                    }
                    consolidation.clear();
                    session.finish_disconnect();
                    let _ = event_tx.send(Event::Disconnected { reason: "client logoff".to_string() }).await;
                    break;
                }
                if !session.can_send() {
                    tracing::warn!(?cmd, "rejected: session is not connected");
                    continue;
                }
                match cmd {
                    Command::Raw(line) => {
                        tracing::trace!(%line, "raw send");
                        writer.write_all(line.as_bytes()).await?;
                        writer.write_all(b"\r\n").await?;
                    }
                    other => {
                        if let Some(msg) = build_outbound(other, &session) {
                            writer.write_all(msg.to_wire().as_bytes()).await?;
                        }
                    }
                }
            }
            _ = sleep_until_opt(flush_at) => {
                if let Some(batch) = consolidation.take_due(Instant::now()) {
                    let _ = event_tx.send(Event::TextBatch(batch)).await;
                }
            }
        }
    }

    Ok(())
}

/// Sleep until the consolidation deadline, or forever when no batch is
/// open. A new fragment moves the deadline, which cancels this arm on the
/// next loop iteration.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

/// Partially assembled multi-line ATIS, keyed by sender.
#[derive(Default)]
struct AtisAssembly {
    lines: Vec<String>,
    logoff_time: Option<String>,
}

async fn dispatch_inbound<W: AsyncWrite + Unpin>(
    msg: Message,
    session: &mut SessionState,
    consolidation: &mut ConsolidationBuffer,
    atis: &mut HashMap<String, AtisAssembly>,
    writer: &mut W,
    event_tx: &mpsc::Sender<Event>,
) -> Result<Flow> {
    match msg {
        Message::Text(TextMessage { from, to, text }) => {
            let key = BatchKey { from, to };
            if let Some(flushed) = consolidation.push(key, text, Instant::now()) {
                let _ = event_tx.send(Event::TextBatch(flushed)).await;
            }
        }
        Message::PilotPosition(p) => {
            let _ = event_tx.send(Event::PilotPosition(p.into())).await;
        }
        Message::AtcPosition(p) => {
            let _ = event_tx.send(Event::AtcPosition(p)).await;
        }
        Message::Ping { from, timestamp, .. } => {
            // Keepalive goes both ways: answer the server (or any peer)
            // with a pong echoing its token.
            let pong = Message::Pong {
                from: session.callsign().to_string(),
                to: from,
                timestamp,
            };
            writer.write_all(pong.to_wire().as_bytes()).await?;
        }
        Message::Pong { from, timestamp, .. } => {
            let _ = event_tx.send(Event::Pong { from, timestamp }).await;
        }
        Message::AuthChallenge { from, challenge, .. } => {
            let response = session.auth.respond_to(&challenge);
            let reply = Message::AuthResponse {
                from: session.callsign().to_string(),
                to: from,
                response,
            };
            writer.write_all(reply.to_wire().as_bytes()).await?;
        }
        Message::AuthResponse { from, .. } => {
            // This client only generates responses; verifying a peer's is
            // the server's job.
            tracing::debug!(%from, "ignoring inbound auth response");
        }
        Message::Query(ClientQuery { from, payload, .. }) => match payload {
            QueryPayload::Capabilities => {
                let reply = Message::Response(ClientResponse {
                    from: session.callsign().to_string(),
                    to: from,
                    payload: ReplyPayload::Capabilities {
                        tokens: session.identity().capabilities.encode_tokens(),
                    },
                });
                writer.write_all(reply.to_wire().as_bytes()).await?;
            }
            QueryPayload::Atis => {
                tracing::debug!(%from, "no ATIS to serve, ignoring query");
            }
            QueryPayload::AircraftConfig { json } => match serde_json::from_str(&json) {
                Ok(config) => {
                    let _ = event_tx.send(Event::AircraftConfig { from, config }).await;
                }
                Err(e) => {
                    tracing::debug!(%from, error = %e, "dropping unreadable aircraft config");
                }
            },
        },
        Message::Response(ClientResponse { from, payload, .. }) => match payload {
            ReplyPayload::Capabilities { tokens } => {
                let caps = CapabilitySet::decode_tokens(tokens.iter().map(String::as_str));
                session.peer_caps.insert(&from, caps);
                let _ = event_tx.send(Event::CapabilitiesReceived { from, caps }).await;
            }
            ReplyPayload::Atis(line) => {
                let key = from.to_ascii_uppercase();
                match line {
                    AtisLine::Text(text) => atis.entry(key).or_default().lines.push(text),
                    AtisLine::LogoffTime(t) => {
                        atis.entry(key).or_default().logoff_time = Some(t);
                    }
                    AtisLine::End { line_count } => {
                        let assembly = atis.remove(&key).unwrap_or_default();
                        if assembly.lines.len() != line_count as usize {
                            tracing::warn!(
                                %from,
                                advertised = line_count,
                                received = assembly.lines.len(),
                                "ATIS line count mismatch, delivering anyway"
                            );
                        }
                        let _ = event_tx
                            .send(Event::Atis {
                                from,
                                lines: assembly.lines,
                                logoff_time: assembly.logoff_time,
                            })
                            .await;
                    }
                }
            }
        },
        Message::PlaneInfoRequest { from, .. } => {
            let _ = event_tx.send(Event::PlaneInfoRequest { from }).await;
        }
        Message::PlaneInfoResponse(PlaneInfoResponse {
            from,
            equipment,
            airline,
            livery,
            ..
        }) => {
            let _ = event_tx
                .send(Event::PlaneInfoResponse {
                    from,
                    equipment,
                    airline,
                    livery,
                })
                .await;
        }
        Message::FlightPlan(plan) => {
            let _ = event_tx.send(Event::FlightPlanReceived(plan)).await;
        }
        Message::DeletePilot { callsign, .. } => {
            let _ = event_tx.send(Event::PilotDeleted { callsign }).await;
        }
        Message::DeleteAtc { callsign, .. } => {
            let _ = event_tx.send(Event::AtcDeleted { callsign }).await;
        }
        Message::ServerError(e) => {
            tracing::warn!(code = e.code, text = %e.text, "server error");
            let _ = event_tx
                .send(Event::ServerError {
                    code: e.code,
                    param: e.param,
                    text: e.text,
                })
                .await;
        }
        Message::Kill { from, to, reason } => {
            if session.is_own_callsign(&to) {
                let _ = event_tx
                    .send(Event::KillRequested {
                        from,
                        reason: reason.clone(),
                    })
                    .await;
                session.connection_lost();
                consolidation.clear();
                let _ = event_tx
                    .send(Event::Disconnected {
                        reason: reason.unwrap_or_else(|| "killed by supervisor".to_string()),
                    })
                    .await;
                return Ok(Flow::Stop);
            }
            tracing::debug!(%to, "kill for another station, ignoring");
        }
        Message::PilotLogin(_) | Message::AtcLogin(_) => {
            // Login lines are client-to-server; a relayed one is peer noise.
            tracing::debug!("ignoring relayed login line");
        }
    }
    Ok(Flow::Continue)
}

fn build_outbound(cmd: Command, session: &SessionState) -> Option<Message> {
    let callsign = session.callsign().to_string();
    let identity = session.identity();
    match cmd {
        Command::Text { to, text } => Some(Message::Text(TextMessage {
            from: callsign,
            to,
            text,
        })),
        Command::PilotPosition(r) => Some(Message::PilotPosition(PilotPosition {
            mode: r.mode,
            callsign,
            squawk: r.squawk,
            rating: identity.rating,
            latitude: r.latitude,
            longitude: r.longitude,
            altitude_ft: r.altitude_ft,
            groundspeed_kts: r.groundspeed_kts,
            pbh: pack_pbh(r.pitch, r.bank, r.heading, r.on_ground),
            pilot_rating: identity.pilot_rating,
        })),
        Command::AtcPosition(r) => Some(Message::AtcPosition(AtcPosition {
            callsign,
            frequency_khz: r.frequency_khz,
            facility: r.facility,
            visual_range_nm: r.visual_range_nm,
            rating: identity.rating,
            latitude: r.latitude,
            longitude: r.longitude,
            altitude_m: r.altitude_m,
        })),
        Command::FileFlightPlan(mut plan) => {
            if session.target().require_icao_equipment_suffix && !plan.equipment.contains('/') {
                tracing::warn!(
                    equipment = %plan.equipment,
                    "server requires an ICAO equipment suffix, dropping flight plan"
                );
                return None;
            }
            plan.callsign = callsign;
            Some(Message::FlightPlan(plan))
        }
        Command::Ping { to } => Some(Message::Ping {
            from: callsign,
            to,
            timestamp: unix_timestamp(),
        }),
        Command::QueryCapabilities { to } => Some(Message::Query(ClientQuery {
            from: callsign,
            to,
            payload: QueryPayload::Capabilities,
        })),
        Command::QueryAtis { to } => Some(Message::Query(ClientQuery {
            from: callsign,
            to,
            payload: QueryPayload::Atis,
        })),
        Command::RequestPlaneInfo { to } => Some(Message::PlaneInfoRequest { from: callsign, to }),
        Command::SendPlaneInfo {
            to,
            equipment,
            airline,
            livery,
        } => Some(Message::PlaneInfoResponse(PlaneInfoResponse {
            from: callsign,
            to,
            equipment,
            airline,
            livery,
        })),
        Command::AircraftConfig { to, config } => {
            if let Some(peer) = &to
                && let Some(peer_caps) = session.peer_caps.get(peer)
                && !peer_caps.contains(Capability::AircraftConfig)
            {
                tracing::debug!(%peer, "peer does not accept aircraft config, skipping");
                return None;
            }
            Some(Message::Query(ClientQuery {
                from: callsign,
                to: to.unwrap_or_else(|| ACC_BROADCAST_TAG.to_string()),
                payload: QueryPayload::AircraftConfig {
                    json: config.to_string(),
                },
            }))
        }
        // Raw and Disconnect are handled in the run loop.
        Command::Raw(_) | Command::Disconnect => None,
    }
}

fn unix_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}
