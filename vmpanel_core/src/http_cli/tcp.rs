/*
* This module connects to the management host through plain tcp.
*/

use super::Response;
use crate::config::Host;

// Http
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::client::conn::http1::{handshake, SendRequest};
use hyper::{Request, Response as HyperResponse};
use hyper_util::rt::TokioIo;
use url::Url;

// Socket
use tokio::net::TcpStream;
use tokio::spawn;
use tokio::task::JoinHandle;

// Error Handling
use log::debug;
use miette::{Error, Result};
use vmpanel_error::{ConnectionError, LibError, PanelError, WrapError};

#[derive(Debug, Clone)]
pub struct TcpUri {
    pub host: String,
    pub port: u16,
}
impl TcpUri {
    pub fn new(url: &str) -> Result<Self, PanelError> {
        let parsed = Url::parse(url)?;
        let host = match parsed.host_str() {
            Some(host) => host.to_owned(),
            None => {
                let message = format!("The url has no host: {}", url);
                let help = "Expected something like: http://localhost:8080";
                return Err(LibError::new(&message, help).into());
            }
        };
        let port = parsed.port_or_known_default().unwrap_or(80);
        Ok(Self { host, port })
    }
}

/// This struct is a convenience wrapper
/// around a tcp stream to the management host.
pub struct HostConnection {
    pub uri: TcpUri,
    pub handle: Option<StreamHandle>,
}

pub struct StreamHandle {
    pub sender: SendRequest<Full<Bytes>>,
    pub connection: JoinHandle<Result<(), hyper::Error>>,
}

impl HostConnection {
    pub fn new(host: &Host) -> Result<Self, PanelError> {
        let uri = TcpUri::new(&host.url)?;
        Ok(Self { uri, handle: None })
    }

    pub async fn open(&mut self) -> Result<&mut Self, PanelError> {
        let addrs = format!("{}:{}", self.uri.host, self.uri.port);
        let stream: TokioIo<TcpStream> = match TcpStream::connect(&addrs).await {
            Err(e) => {
                debug!("Couldn't reach the endpoint {}: {}", addrs, e);
                let err = ConnectionError::HostDown;
                return Err(err.into());
            }
            Ok(v) => TokioIo::new(v),
        };

        match handshake(stream).await {
            Err(e) => {
                let help = format!("Connection refused for endpoint: {addrs}");
                let err = WrapError::builder()
                    .msg("Couldn't talk http to the management host")
                    .help(&help)
                    .origin(Error::from_err(e))
                    .build();
                return Err(err.into());
            }
            Ok((sender, connection)) => {
                self.handle = Some(StreamHandle {
                    sender,
                    connection: spawn(async move { connection.await }),
                });
            }
        };
        Ok(self)
    }

    pub async fn send(
        &mut self,
        endpoint: &str,
        request: Request<Full<Bytes>>,
    ) -> Result<Response, PanelError> {
        if let Some(handle) = &mut self.handle {
            let response: HyperResponse<Incoming> =
                handle.sender.send_request(request).await?;

            let response: Response = Response::new(endpoint, response);
            debug!("{} -> {}", endpoint, response.status());

            Ok(response)
        } else {
            let err = LibError::new("Connection has no handler.", "open connection first.");
            return Err(err.into());
        }
    }

    /*
     * No need to close the stream as it is dropped once the variable
     * gets out of scope.
     */
    pub fn close(&mut self) {
        self.handle = None;
    }
}
