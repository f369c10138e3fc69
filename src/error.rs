use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("command '{cmd}' failed with status {status}, stderr: {stderr}")]
    CommandFailed {
        cmd: String,
        status: i32,
        stderr: String,
    },
    #[error("command '{cmd}' timed out after {timeout_secs}s")]
    CommandTimeout { cmd: String, timeout_secs: u64 },
    #[error("unknown rpc operation: '{0}'")]
    UnknownOperation(String),
    #[error("missing parameter '{parameter}' for rpc operation '{operation}'")]
    MissingParameter {
        operation: String,
        parameter: String,
    },
    #[error("unexpected parameter '{parameter}' for rpc operation '{operation}'")]
    UnexpectedParameter {
        operation: String,
        parameter: String,
    },
    #[error("rpc '{operation}' returned http status {status}")]
    RpcStatus { operation: String, status: u16 },
    #[error("rpc '{operation}' response has no 'result' field")]
    RpcMissingResult { operation: String },
    #[error("rpc '{operation}' failed after {attempts} attempts: {detail}")]
    RpcExhausted {
        operation: String,
        attempts: u32,
        detail: String,
    },
    #[error("invalid check start time: '{0}', expected '%Y-%m-%d %H:%M:%S' or '%Y-%m-%d'")]
    InvalidStartTime(String),
    #[error("invalid boolean value: '{0}'")]
    InvalidBool(String),
}
