use bon::bon;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};

use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PanelError {
    ////////////////////////////////
    // Lib native errors
    #[error(transparent)]
    #[diagnostic(transparent)]
    WrapError(#[from] WrapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    LibError(#[from] LibError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ConnectionError(#[from] ConnectionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ProtocolError(#[from] ProtocolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ValidationError(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TomlError(#[from] TomlError),

    ////////////////////////////////
    // Type convertion
    #[error(transparent)]
    #[diagnostic(code(parse::error))]
    ParseError(#[from] url::ParseError),

    #[error(transparent)]
    #[diagnostic(code(serde::error))]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(vmpanel::strum::error))]
    StrumError(#[from] strum::ParseError),

    #[error(transparent)]
    #[diagnostic(code(vmpanel::io::error))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(vmpanel::io::error))]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    #[diagnostic(code(vmpanel::io::error))]
    EnvError(#[from] std::env::VarError),

    // Http
    #[error(transparent)]
    #[diagnostic(code(hyper::error))]
    HyprError(#[from] hyper::Error),

    #[error(transparent)]
    #[diagnostic(code(hyper::error))]
    HyprHttpError(#[from] hyper::http::Error),
}

/**
Errors raised while reaching the management host,
before any http response could be read.
*/
#[derive(Debug, Error, Diagnostic)]
pub enum ConnectionError {
    #[error("The management host is down or unreachable.")]
    #[diagnostic(code(vmpanel::connection::error))]
    HostDown,

    #[error("The management host refused the connection.")]
    #[diagnostic(code(vmpanel::connection::error))]
    HandshakeFailed,
}

/**
The management host answered something that is not a valid
api response (non-2xx status or a body that doesn't parse as json).
Carries the status and the first chars of the raw body.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("Bad response from management host (http {})", status)]
#[diagnostic(code(vmpanel::protocol::error))]
pub struct ProtocolError {
    pub status: u16,
    #[help]
    pub body: String,
}

impl ProtocolError {
    pub fn new(status: u16, body: &str) -> Self {
        // Keep error output readable on oversized bodies.
        let body: String = body.chars().take(200).collect();
        Self { status, body }
    }
}

/**
A local pre-flight check failed.
The operation was never sent to the management host.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(vmpanel::validation::error))]
pub struct ValidationError {
    pub message: String,
    #[help]
    pub help: String,
}
impl ValidationError {
    pub fn new(message: &str, help: &str) -> Self {
        Self {
            message: message.to_owned(),
            help: help.to_owned(),
        }
    }
}

/**
A toml file couldn't be cast into a valid configuration.
Keeps the source and the offending span for fancy reports.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("Couldn't cast the toml into a valid configuration.")]
#[diagnostic(code(vmpanel::toml::error))]
pub struct TomlError {
    #[source_code]
    pub source_code: NamedSource<String>,
    #[label("here")]
    pub at: Option<SourceSpan>,
    #[help]
    pub help: String,
}
impl TomlError {
    pub fn new(e: toml::de::Error, toml_string: &str) -> Self {
        let at = e.span().map(SourceSpan::from);
        Self {
            source_code: NamedSource::new("config", toml_string.to_owned()),
            at,
            help: e.message().to_owned(),
        }
    }
}

/**
A config error with help higher origin
Can be recursively chained.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(vmpanel::wrap::error))]
pub struct WrapError {
    pub message: String,
    #[diagnostic_source]
    pub origin: Report,
    #[help]
    pub help: String,
}

#[bon]
impl WrapError {
    #[builder]
    pub fn new(msg: &str, help: &str, origin: Report) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
            origin,
        }
    }
}

/**
A root cause error with no inner origin
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(vmpanel::lib::error))]
pub struct LibError {
    pub message: String,
    #[help]
    pub help: String,
}

impl LibError {
    pub fn new(message: &str, help: &str) -> Self {
        Self {
            message: message.to_owned(),
            help: help.to_owned(),
        }
    }
}
