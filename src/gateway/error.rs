/// Errors from a round trip to the engine
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("engine connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("message of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),

    #[error("engine closed the connection")]
    Closed,

    #[error("engine rejected {command}: {message} ({code})")]
    Remote {
        command: &'static str,
        code: String,
        message: String,
    },

    #[error("unexpected `{got}` response to {command}")]
    UnexpectedResponse {
        command: &'static str,
        got: &'static str,
    },
}
