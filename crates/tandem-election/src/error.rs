use thiserror::Error;

/// Errors surfaced by the election engine to the BFT consensus layer.
///
/// Transient data unavailability (a snail block not yet received, a fast
/// height beyond `head + k`) is never an error; those queries return `None`
/// and the caller retries on a later chain event.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ElectionError {
    /// Public-key recovery from a vote signature failed.
    #[error("invalid sign")]
    InvalidSign,

    /// No committee is available for the requested fast height.
    #[error("get committee failed")]
    Committee,

    /// The signature recovered to a key that is not a committee member.
    #[error("invalid committee member")]
    InvalidMember,

    /// `start()` was called before a consensus engine was configured.
    #[error("consensus engine not configured")]
    EngineNotSet,
}
