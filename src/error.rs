use std::path::PathBuf;

/// Errors raised when a board arrives in wire form (rows of `1`/`-1`/`0`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("board must be 6x7, got {rows}x{cols}")]
    Shape { rows: usize, cols: usize },

    #[error("invalid cell value {value} at row {row}, column {col}")]
    CellValue { row: usize, col: usize, value: i8 },

    #[error("disc at row {row}, column {col} is floating above an empty cell")]
    FloatingDisc { row: usize, col: usize },
}

/// Errors from the inference service. The display text is what the player
/// sees as status when the opponent's move fails.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("could not reach inference service at {url}: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    /// Non-2xx reply. `detail` is the server's message, or a generic one.
    #[error("{detail}")]
    Status { status: u16, detail: String },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("invalid service endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Errors on the telemetry WebSocket. These are logged and answered with a
/// reconnect; they never reach the player.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("telemetry connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("telemetry stream error: {0}")]
    Read(tokio_tungstenite::tungstenite::Error),
}

/// A pushed telemetry message that could not be turned into a sample.
#[derive(Debug, thiserror::Error)]
pub enum MalformedTelemetry {
    #[error("message is not valid JSON: {0}")]
    NotJson(serde_json::Error),

    #[error("unexpected message type {0:?}")]
    UnexpectedType(Option<String>),

    #[error("telemetry message has no record")]
    MissingRecord,

    #[error("telemetry record has the wrong shape: {0}")]
    BadRecord(serde_json::Error),

    #[error("binary frame is not UTF-8")]
    NotText,
}

/// A line of player input that is not a session command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("column must be 1-7, got {0}")]
    Column(String),

    #[error("backend command needs a key, e.g. `b gpu`")]
    MissingBackend,

    #[error("unknown command {0:?}")]
    Unknown(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
