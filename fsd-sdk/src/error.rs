use thiserror::Error;

/// Errors surfaced to SDK consumers. Inbound wire problems never appear
/// here — malformed server lines are dropped (and visible on the raw-line
/// trace feed), not raised.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `connect()` on a session that already left the disconnected state.
    #[error("session is already connecting or connected")]
    AlreadyConnected,

    /// The shared authentication key is missing; must be fixed before any
    /// login traffic is produced.
    #[error("authentication key is not configured")]
    AuthNotConfigured,

    /// A required identity field is empty at connect time.
    #[error("missing identity field: {0}")]
    MissingIdentity(&'static str),

    /// Identity fields are frozen once the session reaches Connected.
    #[error("identity is immutable while connected")]
    IdentityLocked,

    /// VHF frequencies start at 100 MHz; anything below cannot be encoded.
    #[error("frequency {0} kHz is below the 100 MHz band floor")]
    BadFrequency(u32),

    /// The client task has shut down and can no longer accept commands.
    #[error("client task has shut down")]
    ChannelClosed,
}
