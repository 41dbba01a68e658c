pub mod response;
pub mod tcp;

// Reexports
pub use response::{ApiResponse, Response};
pub use tcp::HostConnection;

use std::future::Future;

// Http
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Request;

use serde::Serialize;

// Error Handling
use vmpanel_error::PanelError;

pub trait HttpRequest {
    /*
     * Send an http GET request to the management host.
     * Arguments:
     * - endpoint: the url endpoint (ex:"/api/vm/list")
     */
    fn get(&mut self, endpoint: &str)
        -> impl Future<Output = Result<Response, PanelError>> + Send;
    /*
     * Send an http POST request with a json body.
     * Arguments:
     * - endpoint: the url endpoint (ex:"/api/vm/start")
     */
    fn post<T>(
        &mut self,
        endpoint: &str,
        body: Option<T>,
    ) -> impl Future<Output = Result<Response, PanelError>> + Send
    where
        T: Serialize + Send;
    /*
     * Send a raw byte-stream POST (file upload).
     * The target filename travels out-of-band in the X-Filename header.
     */
    fn post_raw(
        &mut self,
        endpoint: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<Response, PanelError>> + Send;
}

impl HttpRequest for HostConnection {
    async fn get(&mut self, endpoint: &str) -> Result<Response, PanelError> {
        let request = Request::builder()
            .uri(endpoint)
            .method("GET")
            .header("Host", self.uri.host.to_owned())
            .body(Full::new(Bytes::new()))?;

        self.send(endpoint, request).await
    }

    async fn post<T>(&mut self, endpoint: &str, body: Option<T>) -> Result<Response, PanelError>
    where
        T: Serialize + Send,
    {
        let request = Request::builder()
            .uri(endpoint)
            .method("POST")
            .header("Host", self.uri.host.to_owned())
            .header("Content-Type", "application/json");

        let request = match body {
            None => request.body(Full::new(Bytes::new()))?,
            Some(value) => {
                let json = serde_json::to_string(&value)?;
                request.body(Full::new(Bytes::from(json)))?
            }
        };

        self.send(endpoint, request).await
    }

    async fn post_raw(
        &mut self,
        endpoint: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Response, PanelError> {
        let request = Request::builder()
            .uri(endpoint)
            .method("POST")
            .header("Host", self.uri.host.to_owned())
            .header("X-Filename", filename)
            .header("Content-Type", "application/octet-stream")
            .body(Full::new(Bytes::from(bytes)))?;

        self.send(endpoint, request).await
    }
}
