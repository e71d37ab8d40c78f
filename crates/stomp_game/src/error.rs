use thiserror::Error;

/// Failures that stop a level (or the whole game) from running.
#[derive(Debug, Error)]
pub enum GameError {
    /// A level document is missing, unparseable or refers to unknown assets.
    #[error("failed to load level {level}: {reason}")]
    LevelLoad { level: usize, reason: String },

    /// The asset manifest, an animation file or an asset reference is bad.
    #[error("failed to load asset '{id}': {reason}")]
    AssetLoad { id: String, reason: String },

    #[error("failed to load config {path}: {reason}")]
    Config { path: String, reason: String },

    /// In-frame state that must never happen, e.g. more kills than enemies.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type GameResult<T> = Result<T, GameError>;
