use http_body_util::BodyExt;
use hyper::body::{Bytes, Incoming};
use hyper::{Response as HyperResponse, StatusCode};

// Serde
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// Error Handling
use miette::Result;
use vmpanel_error::{PanelError, ProtocolError};

/*
* The json envelope returned by every mutating endpoint
* of the management api.
*/
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    pub output: Option<String>,
}

#[derive(Debug)]
pub struct Response {
    pub url: String,
    pub inner: HyperResponse<Incoming>,
}

/*
* Convenient methods to easily convert and troubleshoot a response.
*/
impl Response {
    pub fn new(url: &str, response: HyperResponse<Incoming>) -> Self {
        Self {
            url: url.to_owned(),
            inner: response,
        }
    }
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }
    pub async fn into_bytes(self) -> Result<Bytes, PanelError> {
        let data = self.inner.into_body().collect().await?;
        let data = data.to_bytes();
        Ok(data)
    }
    pub async fn to_string(self) -> Result<String, PanelError> {
        let data: Bytes = self.into_bytes().await?;
        let value: String = String::from_utf8(data.to_vec())?;
        Ok(value)
    }
    /*
     * Decode the body as json.
     * The api wraps application failures in a json envelope even on
     * error statuses, so the body is parsed whatever the status.
     * A body that doesn't parse is a protocol failure carrying the
     * status and a truncated raw body.
     */
    pub async fn to_value<T: DeserializeOwned>(self) -> Result<T, PanelError> {
        let status: StatusCode = self.inner.status();
        let body = self.to_string().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(value),
            Err(_) => Err(ProtocolError::new(status.as_u16(), &body).into()),
        }
    }
}
