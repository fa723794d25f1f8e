use thiserror::Error;

/// The engine favors total, silently-defaulting functions; this enum covers
/// the few outcomes a caller must be able to distinguish.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Deleting the last remaining page would leave the document with zero
    /// pages, an invalid state.
    #[error("cannot delete the last remaining page")]
    LastPage,
}
