//! Client SDK for FSD flight-simulation networks.
//!
//! Connect with [`client::connect`], drive the session through the returned
//! [`client::ClientHandle`], and consume inbound traffic as [`event::Event`]s.
//! Wire-level types live in [`fsd_protocol`], re-exported as [`protocol`].

pub mod auth;
pub mod caps;
pub mod client;
pub mod consolidate;
pub mod error;
pub mod event;
pub mod session;

pub use fsd_protocol as protocol;

pub use client::{
    AtcPositionReport, ClientConfig, ClientHandle, PositionReport, connect, connect_with_stream,
};
pub use error::ClientError;
pub use event::{Event, PilotPositionUpdate};
pub use session::{ClientIdentity, LoginMode, ServerTarget};
