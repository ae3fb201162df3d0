use crate::error::{stream_error, Error, ErrorKind};
use async_trait::async_trait;
use eventsource_client::{self as es, Client};
use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use log::*;

/// One raw frame read off the wire, before its data is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Event name; empty when the server sent none.
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

impl Frame {
    pub fn new(event: &str, data: &str) -> Self {
        Self {
            event: event.to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

/// Frames from one open connection. The stream ends (or yields an error) when
/// the connection drops.
pub type FrameStream = BoxStream<'static, Result<Frame, Error>>;

/// Opens a single connection. Reconnecting is the client's job, never the
/// transport's.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve once the connection is established, or fail.
    async fn open(&self, url: &str, last_event_id: Option<&str>) -> Result<FrameStream, Error>;
}

/// Transport backed by `eventsource-client` with its built-in reconnection
/// disabled.
#[derive(Debug, Clone, Default)]
pub struct EventSourceTransport {
    headers: Vec<(String, String)>,
}

impl EventSourceTransport {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Forward a session cookie so the stream is authenticated like the REST calls.
    pub fn with_cookie(self, cookie: &str) -> Self {
        self.with_header("Cookie", cookie)
    }

    fn build_client(
        &self,
        url: &str,
        last_event_id: Option<&str>,
    ) -> Result<impl es::Client, es::Error> {
        let mut builder = es::ClientBuilder::for_url(url)?;
        for (name, value) in &self.headers {
            builder = builder.header(name, value)?;
        }
        if let Some(id) = last_event_id {
            builder = builder.header("Last-Event-ID", id)?;
        }

        Ok(builder
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build())
    }
}

#[async_trait]
impl Transport for EventSourceTransport {
    async fn open(&self, url: &str, last_event_id: Option<&str>) -> Result<FrameStream, Error> {
        let client = self
            .build_client(url, last_event_id)
            .map_err(|e| stream_error(ErrorKind::InvalidEndpoint, &e.to_string()))?;

        let mut sse_stream = client.stream();

        // The request is only sent once the stream is polled; the first item
        // tells us whether the connection actually came up.
        let head = match sse_stream.next().await {
            Some(Ok(item)) => into_frame(Ok(item)),
            Some(Err(e)) => return Err(stream_error(ErrorKind::Transport, &e.to_string())),
            None => {
                return Err(stream_error(
                    ErrorKind::StreamClosed,
                    "stream closed before the first event",
                ))
            }
        };
        debug!("SSE connection to {url} established");

        let rest = sse_stream.filter_map(|item| future::ready(into_frame(item)));
        Ok(stream::iter(head).chain(rest).boxed())
    }
}

fn into_frame(item: Result<es::SSE, es::Error>) -> Option<Result<Frame, Error>> {
    match item {
        Ok(es::SSE::Event(event)) => Some(Ok(Frame {
            event: event.event_type,
            data: event.data,
            id: event.id,
        })),
        // Comments are keep-alives
        Ok(es::SSE::Comment(_)) => None,
        Err(e) => Some(Err(stream_error(ErrorKind::Transport, &e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_filtered_out() {
        assert!(into_frame(Ok(es::SSE::Comment("keep-alive".to_string()))).is_none());
    }

    #[test]
    fn invalid_url_is_rejected_before_connecting() {
        let transport = EventSourceTransport::new();
        assert!(transport.build_client("not a url", None).is_err());
    }

    #[tokio::test]
    async fn open_fails_when_nothing_listens() {
        let transport = EventSourceTransport::new().with_cookie("PHPSESSID=abc");
        // Port 9 (discard) is closed on test machines; the connect fails fast.
        let result = transport.open("http://127.0.0.1:9/realtime", None).await;
        assert!(result.is_err());
    }
}
