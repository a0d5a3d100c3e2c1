//! Wire grammar for the FSD flight-simulation network protocol.
//!
//! FSD is a line-oriented, colon-delimited ASCII protocol: every message is
//! one CR LF terminated line whose leading marker (`@`, `%`, `#XX`, `$XX`)
//! selects the message kind and whose remaining fields are colon separated.
//! This crate is the pure wire layer — no I/O, no async:
//!
//! - [`fields`] — scalar codecs (coordinates, packed pitch/bank/heading,
//!   frequency tokens, ratings, facilities, transponder modes)
//! - [`envelope`] — raw line → marker + ordered field list
//! - [`message`] — the typed message set, with a single [`Message::parse`]
//!   dispatch and a byte-exact [`Message::encode`] builder
//!
//! The parse/encode pair round-trips: `Message::parse(&m.encode())` yields
//! `m` for every message kind, including empty-optional variants.

pub mod envelope;
pub mod error;
pub mod fields;
pub mod message;

pub use envelope::{Envelope, MessageKind};
pub use error::{FieldError, ParseError};
pub use message::Message;
