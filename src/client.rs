use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use url::Url;

use crate::backend::{ByteStream, ChatBackend, ChatResponse};
use crate::chat::{BASE_URL_ENV, DEFAULT_BASE_URL};
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_BYTES,
};
use crate::types::{ChatRequest, ErrorDetail, Message, Session, SessionId, SessionIdentity};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response header carrying the id of a newly created session.
pub const CHAT_ID_HEADER: &str = "x-chat-id";
/// Response header carrying the title of a newly created session.
pub const CHAT_TITLE_HEADER: &str = "x-chat-title";

/// HTTP client for the chat backend.
#[derive(Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl ChatClient {
    /// Create a new client.
    ///
    /// The base URL is read from the CHATTERBOX_BASE_URL environment variable,
    /// falling back to a backend on localhost.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds list, history and delete requests.  Sends only get a
    /// connect timeout; their bodies stream for as long as the backend writes.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::url(format!("invalid base URL {base_url:?}: {e}"), Some(e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::url(
                format!("base URL {base_url} cannot have paths joined onto it"),
                None,
            ));
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request and response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The API root endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint below the API root.  Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url("base URL cannot have paths joined onto it", None))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Issue a request and turn non-success statuses into errors.
    async fn execute(&self, method: Method, url: Url, request: RequestBuilder) -> Result<Response> {
        let url_text = url.to_string();
        if let Some(logger) = &self.logger {
            logger.log_request(method.as_str(), &url_text);
        }
        CLIENT_REQUESTS.click();
        let started = Instant::now();

        let response = request.send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })?;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        let status = response.status().as_u16();
        if let Some(logger) = &self.logger {
            logger.log_status(method.as_str(), &url_text, status);
        }
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response, url.path()).await);
        }
        Ok(response)
    }

    /// Process error responses and convert to our Error type.
    ///
    /// The backend reports failures as `{"detail": "..."}`; anything else
    /// is described by its status alone.
    async fn process_error_response(response: Response, path: &str) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let message = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<ErrorDetail>(&body)
                .ok()
                .and_then(|error| error.detail),
            Err(_) => None,
        }
        .unwrap_or_else(|| format!("HTTP error: {status_code}"));

        match status_code {
            404 => Error::not_found(message, Some(path.to_string())),
            408 => Error::timeout(message, None),
            429 => Error::rate_limit(message, retry_after),
            _ => Error::api(status_code, message),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self
            .client
            .get(url.clone())
            .headers(self.default_headers())
            .timeout(self.timeout);
        let response = self.execute(Method::GET, url, request).await?;
        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatClient {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let url = self.endpoint(&["chats"])?;
        self.get_json(url).await
    }

    async fn history(&self, id: &SessionId) -> Result<Vec<Message>> {
        let url = self.endpoint(&["chat", id.as_str()])?;
        self.get_json(url).await
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint(&["chat"])?;
        let mut headers = self.default_headers();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain"));
        let builder = self.client.post(url.clone()).headers(headers).json(&request);
        let response = self.execute(Method::POST, url, builder).await?;

        let identity = SessionIdentity::from_headers(
            header_text(response.headers(), CHAT_ID_HEADER).as_deref(),
            header_text(response.headers(), CHAT_TITLE_HEADER).as_deref(),
        );
        if let (Some(logger), Some(identity)) = (&self.logger, &identity) {
            logger.log_identity(identity);
        }

        let body = reply_body(Box::pin(response.bytes_stream()), self.logger.clone());
        Ok(ChatResponse::new(identity, body))
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let url = self.endpoint(&["chat", id.as_str()])?;
        let request = self
            .client
            .delete(url.clone())
            .headers(self.default_headers())
            .timeout(self.timeout);
        self.execute(Method::DELETE, url, request).await?;
        Ok(())
    }
}

/// Read a header as text.
///
/// Header values that are not UTF-8 are Latin-1, one byte per code point.
fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).map(|value| {
        let bytes = value.as_bytes();
        match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    })
}

/// Adapt a response body into a [`ByteStream`] that ends after the first
/// transport error.
fn reply_body<S>(byte_stream: S, logger: Option<Arc<dyn ClientLogger>>) -> ByteStream
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    Box::pin(stream::unfold(
        (byte_stream, logger, 0u64, false),
        |(mut byte_stream, logger, total, failed)| async move {
            if failed {
                return None;
            }
            match byte_stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Some(logger) = &logger {
                        logger.log_stream_chunk(&bytes);
                    }
                    let total = total + bytes.len() as u64;
                    Some((Ok(bytes), (byte_stream, logger, total, false)))
                }
                Some(Err(e)) => {
                    let err =
                        Error::streaming(format!("Error in HTTP stream: {}", e), Some(Box::new(e)));
                    Some((Err(err), (byte_stream, logger, total, true)))
                }
                None => {
                    if let Some(logger) = &logger {
                        logger.log_stream_end(total);
                    }
                    None
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = ChatClient::with_options(Some(DEFAULT_BASE_URL.to_string()), None).unwrap();
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = ChatClient::with_options(
            Some("https://chat.example.com/api/".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://chat.example.com/api/");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ChatClient::with_options(Some("not a url".to_string()), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));

        let err = ChatClient::with_options(Some("mailto:someone@example.com".to_string()), None)
            .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn endpoints_join_onto_the_api_root() {
        let client = ChatClient::with_options(Some(DEFAULT_BASE_URL.to_string()), None).unwrap();
        assert_eq!(
            client.endpoint(&["chats"]).unwrap().as_str(),
            "http://localhost:3000/api/chats"
        );
        assert_eq!(
            client.endpoint(&["chat", "abc-123"]).unwrap().as_str(),
            "http://localhost:3000/api/chat/abc-123"
        );

        // without a trailing slash the last segment is kept
        let client =
            ChatClient::with_options(Some("http://localhost:3000/api".to_string()), None).unwrap();
        assert_eq!(
            client.endpoint(&["chats"]).unwrap().as_str(),
            "http://localhost:3000/api/chats"
        );
    }

    #[test]
    fn session_ids_are_percent_encoded() {
        let client = ChatClient::with_options(Some(DEFAULT_BASE_URL.to_string()), None).unwrap();
        assert_eq!(
            client.endpoint(&["chat", "a/b c"]).unwrap().as_str(),
            "http://localhost:3000/api/chat/a%2Fb%20c"
        );
    }

    #[test]
    fn header_text_falls_back_to_latin1() {
        let mut headers = HeaderMap::new();
        headers.insert(CHAT_ID_HEADER, HeaderValue::from_static("abc"));
        headers.insert(
            CHAT_TITLE_HEADER,
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        assert_eq!(header_text(&headers, CHAT_ID_HEADER).as_deref(), Some("abc"));
        assert_eq!(
            header_text(&headers, CHAT_TITLE_HEADER).as_deref(),
            Some("café")
        );
        assert_eq!(header_text(&headers, "x-missing"), None);
    }

    #[test]
    fn header_text_keeps_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CHAT_TITLE_HEADER,
            HeaderValue::from_bytes("Ação".as_bytes()).unwrap(),
        );
        assert_eq!(
            header_text(&headers, CHAT_TITLE_HEADER).as_deref(),
            Some("Ação")
        );
    }
}
