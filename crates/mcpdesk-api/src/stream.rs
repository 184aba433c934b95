//! Streaming chat sessions over server-sent events.
//!
//! [`StreamController::open`] spawns one background task that owns the HTTP
//! connection for `GET /ai/generateStream` and forwards parsed events
//! through a bounded [`tokio::sync::mpsc`] channel as [`StreamEvent`]s.
//!
//! Guarantees per session:
//!
//! - chunks are delivered in arrival order
//! - at most one terminal event (`Complete` or `Error`) is delivered, and
//!   nothing follows it
//! - [`ChatStream::cancel`] (or dropping the stream) ends the session
//!   without any terminal event; repeated calls are no-ops
//! - the connection is released exactly once, whichever path ended it
//!
//! No timeout applies: a silent stream stays open until the server
//! finishes, the connection fails, or the caller cancels.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpdesk_api::{StreamController, StreamEvent, TransportConfig};
//!
//! let controller = StreamController::new(base_url, &TransportConfig::default())?;
//! let mut stream = controller.open("hello", None);
//!
//! while let Some(event) = stream.recv().await {
//!     match event {
//!         StreamEvent::Chunk(text) => print!("{text}"),
//!         StreamEvent::Complete => println!(),
//!         StreamEvent::Error(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::gateway::endpoint_url;
use crate::normalize::{self, Failure, Origin};
use crate::sse::{SseEvent, SseParser};
use crate::transport::TransportConfig;

// ── Protocol constants ───────────────────────────────────────────────

pub const STREAM_PATH: &str = "ai/generateStream";

/// Name of the event that marks successful completion.
pub const DONE_EVENT: &str = "done";

/// Explicit name some servers give to ordinary data events.
const MESSAGE_EVENT: &str = "message";

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── Events & state ───────────────────────────────────────────────────

/// One item delivered to the consumer of a [`ChatStream`].
#[derive(Debug)]
pub enum StreamEvent {
    /// A piece of generated text, exactly as the server sent it.
    Chunk(String),
    /// The server signalled the end of the answer.
    Complete,
    /// The stream failed; always `ErrorKind::StreamFailure`.
    Error(Error),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Chunk(_))
    }
}

/// Lifecycle of a session. A session is created `Open`; the other three
/// states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[repr(u8)]
pub enum SessionState {
    Open = 0,
    Completed = 1,
    Errored = 2,
    Cancelled = 3,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self != Self::Open
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Completed,
            2 => Self::Errored,
            _ => Self::Cancelled,
        }
    }
}

/// Atomic state shared by the connection task and every handle.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(SessionState::Open as u8))
    }

    fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `Open -> to`. Returns `false` if the session already ended,
    /// so exactly one caller wins the right to finish it.
    fn finish(&self, to: SessionState) -> bool {
        self.0
            .compare_exchange(
                SessionState::Open as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// Opens chat streams against the API root.
#[derive(Debug, Clone)]
pub struct StreamController {
    http: reqwest::Client,
    base_url: Url,
}

impl StreamController {
    /// Create a controller with its own timeout-free HTTP client.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_stream_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a controller around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// `{base}/ai/generateStream?message=..[&sessionId=..]`
    ///
    /// An empty session key is treated as absent.
    pub fn stream_url(&self, message: &str, session_key: Option<&str>) -> Result<Url, Error> {
        let mut url = endpoint_url(&self.base_url, STREAM_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("message", message);
            if let Some(key) = session_key.filter(|k| !k.is_empty()) {
                query.append_pair("sessionId", key);
            }
        }
        Ok(url)
    }

    /// Open one streaming session.
    ///
    /// Returns immediately; the connection is established by a background
    /// task. Must be called from within a tokio runtime.
    pub fn open(&self, message: &str, session_key: Option<&str>) -> ChatStream {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let stream = ChatStream {
            rx,
            handle: CancelHandle {
                state: Arc::new(StateCell::new()),
                token: CancellationToken::new(),
            },
            released: CancellationToken::new(),
            session_key: session_key.map(str::to_owned),
            finished: false,
        };

        let url = match self.stream_url(message, session_key) {
            Ok(url) => url,
            Err(err) => {
                // Nothing to connect to: fail the session before spawning.
                stream.handle.state.finish(SessionState::Errored);
                let _ = tx.try_send(StreamEvent::Error(Error::Stream {
                    message: err.message(),
                    status: None,
                }));
                stream.released.cancel();
                return stream;
            }
        };

        info!(session = ?session_key, "opening chat stream");

        let task = SessionTask {
            http: self.http.clone(),
            url,
            state: Arc::clone(&stream.handle.state),
            cancel: stream.handle.token.clone(),
            guard: ConnectionGuard {
                released: stream.released.clone(),
            },
            tx,
        };
        tokio::spawn(task.run());

        stream
    }
}

// ── Session handle ───────────────────────────────────────────────────

/// Cloneable cancellation handle for a session.
///
/// Cancelling is synchronous and idempotent: it never emits an event, and
/// once a session has ended (by any path) it does nothing.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<StateCell>,
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.state.finish(SessionState::Cancelled) {
            debug!("chat stream cancelled");
        }
        self.token.cancel();
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }
}

/// Consumer side of one streaming session.
///
/// Dropping the stream cancels the session.
#[derive(Debug)]
pub struct ChatStream {
    rx: mpsc::Receiver<StreamEvent>,
    handle: CancelHandle,
    released: CancellationToken,
    session_key: Option<String>,
    finished: bool,
}

impl ChatStream {
    /// Receive the next event, or `None` once the session is over.
    ///
    /// After a terminal event or a cancellation this always returns `None`.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        std::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        if self.finished {
            return Poll::Ready(None);
        }
        if self.handle.state() == SessionState::Cancelled {
            self.close();
            return Poll::Ready(None);
        }

        match ready!(self.rx.poll_recv(cx)) {
            // Anything that raced past a cancel is discarded.
            Some(_) if self.handle.state() == SessionState::Cancelled => {
                self.close();
                Poll::Ready(None)
            }
            Some(event) => {
                if event.is_terminal() {
                    self.close();
                }
                Poll::Ready(Some(event))
            }
            None => {
                self.finished = true;
                Poll::Ready(None)
            }
        }
    }

    fn close(&mut self) {
        self.finished = true;
        self.rx.close();
    }

    /// End the session without a terminal event. See [`CancelHandle`].
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// A handle that can cancel this session from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Current lifecycle state of the connection.
    ///
    /// This can already read `Completed` or `Errored` while the matching
    /// terminal event is still waiting in the channel.
    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    /// The session key the stream was opened with, if any.
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    /// Resolves once the underlying connection has been dropped.
    pub fn released(&self) -> impl Future<Output = ()> + Send + '_ {
        self.released.cancelled()
    }

    pub fn is_released(&self) -> bool {
        self.released.is_cancelled()
    }

    /// Feed every event to a callback-style handler, returning the final
    /// state. Use [`cancel_handle`](Self::cancel_handle) beforehand to keep
    /// the ability to cancel.
    pub async fn drive<H: StreamHandler + ?Sized>(mut self, handler: &mut H) -> SessionState {
        while let Some(event) = self.recv().await {
            match event {
                StreamEvent::Chunk(text) => handler.on_chunk(&text),
                StreamEvent::Complete => handler.on_complete(),
                StreamEvent::Error(err) => handler.on_error(err),
            }
        }
        self.state()
    }
}

impl Stream for ChatStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

/// Callback-style consumer for [`ChatStream::drive`].
///
/// `on_complete` or `on_error` is called at most once, and `on_chunk` is
/// never called after either.
pub trait StreamHandler {
    fn on_chunk(&mut self, chunk: &str);
    fn on_complete(&mut self);
    fn on_error(&mut self, error: Error);
}

// ── Background connection task ───────────────────────────────────────

/// Signals `released` when the connection is gone.
#[derive(Debug)]
struct ConnectionGuard {
    released: CancellationToken,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        trace!("chat stream connection released");
        self.released.cancel();
    }
}

/// How the connection ended.
#[derive(Debug)]
enum Outcome {
    Completed,
    Failed(Error),
    /// Cancelled, or nobody is listening any more.
    Abandoned,
}

struct SessionTask {
    http: reqwest::Client,
    url: Url,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    guard: ConnectionGuard,
    tx: mpsc::Sender<StreamEvent>,
}

impl SessionTask {
    async fn run(self) {
        let Self {
            http,
            url,
            state,
            cancel,
            guard,
            tx,
        } = self;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Outcome::Abandoned,
            outcome = connect_and_pump(&http, url, &state, &tx) => outcome,
        };

        // The response body is gone by now; release before reporting.
        drop(guard);

        match outcome {
            Outcome::Completed => {
                if state.finish(SessionState::Completed) {
                    info!("chat stream completed");
                    let _ = tx.send(StreamEvent::Complete).await;
                }
            }
            Outcome::Failed(err) => {
                if state.finish(SessionState::Errored) {
                    warn!(error = %err, "chat stream failed");
                    let _ = tx.send(StreamEvent::Error(err)).await;
                }
            }
            Outcome::Abandoned => debug!(state = %state.load(), "chat stream abandoned"),
        }
    }
}

async fn connect_and_pump(
    http: &reqwest::Client,
    url: Url,
    state: &StateCell,
    tx: &mpsc::Sender<StreamEvent>,
) -> Outcome {
    debug!("GET {url}");

    let resp = match http
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => return Outcome::Failed(normalize::from_reqwest(&e, Origin::Stream, None)),
    };

    if !resp.status().is_success() {
        return Outcome::Failed(normalize::from_response(resp, Origin::Stream).await);
    }

    pump(resp.bytes_stream(), state, tx, |e: reqwest::Error| {
        normalize::from_reqwest(&e, Origin::Stream, None)
    })
    .await
}

/// Parse the body and forward chunks until `done`, failure, or abandonment.
async fn pump<S, E>(
    body: S,
    state: &StateCell,
    tx: &mpsc::Sender<StreamEvent>,
    map_err: impl Fn(E) -> Error,
) -> Outcome
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut body = std::pin::pin!(body);
    let mut parser = SseParser::new();

    while let Some(read) = body.next().await {
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) => return Outcome::Failed(map_err(e)),
        };

        for event in parser.push(&bytes) {
            match classify(event) {
                Frame::Chunk(text) => {
                    if state.load() != SessionState::Open {
                        return Outcome::Abandoned;
                    }
                    if tx.send(StreamEvent::Chunk(text)).await.is_err() {
                        return Outcome::Abandoned;
                    }
                }
                // Anything after `done` in the same read is dropped with the parser.
                Frame::Done => return Outcome::Completed,
                Frame::Skip => {}
            }
        }
    }

    Outcome::Failed(normalize::normalize(
        Failure::Transport {
            description: Some("stream closed before completion".to_owned()),
        },
        Origin::Stream,
    ))
}

enum Frame {
    Chunk(String),
    Done,
    Skip,
}

fn classify(event: SseEvent) -> Frame {
    match event.event.as_deref() {
        Some(DONE_EVENT) => Frame::Done,
        None | Some(MESSAGE_EVENT) if !event.data.is_empty() => Frame::Chunk(event.data),
        None | Some(MESSAGE_EVENT) => Frame::Skip,
        Some(other) => {
            trace!(event = other, "ignoring named sse event");
            Frame::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn body(frames: &[&str]) -> impl Stream<Item = Result<Bytes, Error>> {
        let items: Vec<Result<Bytes, Error>> = frames
            .iter()
            .map(|f| Ok(Bytes::copy_from_slice(f.as_bytes())))
            .collect();
        stream::iter(items)
    }

    fn drain(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<String> {
        let mut chunks = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                StreamEvent::Chunk(text) => chunks.push(text),
                other => panic!("unexpected event {other:?}"),
            }
        }
        chunks
    }

    #[tokio::test]
    async fn pump_forwards_chunks_until_done() {
        let (tx, mut rx) = mpsc::channel(16);
        let state = StateCell::new();

        let outcome = pump(
            body(&["data: He\n\n", "data: llo\n\nevent: done\ndata:\n\n"]),
            &state,
            &tx,
            |e| e,
        )
        .await;

        assert!(matches!(outcome, Outcome::Completed));
        assert_eq!(drain(&mut rx), ["He", "llo"]);
    }

    #[tokio::test]
    async fn events_after_done_are_discarded() {
        let (tx, mut rx) = mpsc::channel(16);
        let state = StateCell::new();

        let outcome = pump(
            body(&["data: a\n\nevent: done\n\ndata: late\n\n", "data: later\n\n"]),
            &state,
            &tx,
            |e| e,
        )
        .await;

        assert!(matches!(outcome, Outcome::Completed));
        assert_eq!(drain(&mut rx), ["a"]);
    }

    #[tokio::test]
    async fn eof_without_done_is_a_stream_failure() {
        let (tx, mut rx) = mpsc::channel(16);
        let state = StateCell::new();

        let outcome = pump(body(&["data: partial\n\n"]), &state, &tx, |e| e).await;

        let err = match outcome {
            Outcome::Failed(err) => err,
            other => panic!("expected failure, got {other:?}"),
        };
        assert_eq!(err.kind(), ErrorKind::StreamFailure);
        assert_eq!(err.message(), "stream closed before completion");
        assert_eq!(drain(&mut rx), ["partial"]);
    }

    #[tokio::test]
    async fn read_error_mid_stream_fails_after_delivered_chunks() {
        let (tx, mut rx) = mpsc::channel(16);
        let state = StateCell::new();
        let items: Vec<Result<Bytes, Error>> = vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Err(Error::Stream {
                message: "connection reset".into(),
                status: None,
            }),
            Ok(Bytes::from_static(b"data: two\n\n")),
        ];

        let outcome = pump(stream::iter(items), &state, &tx, |e| e).await;

        assert!(matches!(outcome, Outcome::Failed(ref e) if e.message() == "connection reset"));
        assert_eq!(drain(&mut rx), ["one"]);
    }

    #[tokio::test]
    async fn cancelled_state_stops_forwarding() {
        let (tx, mut rx) = mpsc::channel(16);
        let state = StateCell::new();
        assert!(state.finish(SessionState::Cancelled));

        let outcome = pump(body(&["data: x\n\nevent: done\n\n"]), &state, &tx, |e| e).await;

        assert!(matches!(outcome, Outcome::Abandoned));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn empty_and_unknown_events_are_skipped() {
        assert!(matches!(classify(SseEvent::default()), Frame::Skip));
        assert!(matches!(
            classify(SseEvent {
                event: Some("heartbeat".into()),
                data: "x".into(),
            }),
            Frame::Skip
        ));
        assert!(matches!(
            classify(SseEvent {
                event: Some("message".into()),
                data: "x".into(),
            }),
            Frame::Chunk(ref t) if t == "x"
        ));
    }

    #[test]
    fn state_cell_finishes_once() {
        let state = StateCell::new();
        assert!(state.finish(SessionState::Completed));
        assert!(!state.finish(SessionState::Cancelled));
        assert!(!state.finish(SessionState::Errored));
        assert_eq!(state.load(), SessionState::Completed);
    }

    #[test]
    fn stream_url_encodes_message_and_skips_empty_key() {
        let controller = StreamController::with_client(
            reqwest::Client::new(),
            Url::parse("http://localhost:9898/api").unwrap(),
        );
        let url = controller.stream_url("hello world & more", None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9898/api/ai/generateStream?message=hello+world+%26+more"
        );
        let keyed = controller.stream_url("hi", Some("abc123")).unwrap();
        assert_eq!(keyed.query(), Some("message=hi&sessionId=abc123"));
        let blank = controller.stream_url("hi", Some("")).unwrap();
        assert_eq!(blank.query(), Some("message=hi"));
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_silent() {
        let controller = StreamController::with_client(
            reqwest::Client::new(),
            // Port 9 (discard) on loopback: the connect may hang or fail, either is fine.
            Url::parse("http://127.0.0.1:9/api").unwrap(),
        );
        let mut stream = controller.open("hello", None);
        stream.cancel();
        stream.cancel();

        assert_eq!(stream.state(), SessionState::Cancelled);
        assert!(stream.recv().await.is_none());
        assert!(stream.recv().await.is_none());
        tokio::time::timeout(std::time::Duration::from_secs(5), stream.released())
            .await
            .unwrap();
    }
}
