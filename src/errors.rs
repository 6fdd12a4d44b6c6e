//! Engine Error
//! Mission: a typed reason code for every place the driver needs to branch
//! on *why* something failed rather than string-match a message. Boundaries
//! further from the driver loop — CLI bootstrap, registry I/O — still
//! propagate with `anyhow`.

use thiserror::Error;

use crate::types::Venue;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("venue I/O failed for {venue:?}: {source}")]
    VenueIo {
        venue: Venue,
        #[source]
        source: anyhow::Error,
    },

    #[error("risk manager rejected trade: {reason}")]
    RiskRejected { reason: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("persistence error: {0}")]
    Persistence(#[source] anyhow::Error),
}
