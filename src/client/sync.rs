//! The dashboard sync client and its connection task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{socket_url, AuthError, TokenClient};
use crate::config::SyncConfig;
use crate::protocol::{ClientMessage, DashboardState, ServerMessage, StateRequest};

use super::backoff::ReconnectPolicy;
use super::error::SyncError;
use super::observer::DashboardObserver;
use super::pending::PendingRequests;
use super::queue::SendQueue;

/// Default deadline for a state request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection lifecycle states of the update channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket; either never connected or waiting out a reconnect delay.
    Disconnected,
    /// Fetching a token or performing the WebSocket handshake.
    Connecting,
    /// Live socket; outbound frames go straight to the wire.
    Open,
    /// Terminal: explicit shutdown, invalid session, or reconnect exhaustion.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Per-request knobs for [`DashboardSyncClient::request_dashboard_state_with`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Deadline for the full-state response.
    pub timeout: Duration,
    /// Cancelling this token abandons the request early.
    pub cancel: CancellationToken,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

impl RequestOptions {
    /// Set the response deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Why a live connection ended.
enum Disconnect {
    /// Socket error or server-side close; reconnect applies.
    Transport,
    /// Explicit client shutdown; terminal.
    Shutdown,
}

/// Client for the real-time dashboard update channel.
///
/// Owns one WebSocket connection (token-authenticated, auto-reconnecting
/// with capped exponential backoff), a FIFO queue that buffers outbound
/// frames while disconnected, and a correlation map that lets callers await
/// full-state responses. All inbound traffic is dispatched to the
/// [`DashboardObserver`] injected at construction.
///
/// Cloning is cheap: clones share the same connection, queue, and pending
/// map.
#[derive(Clone)]
pub struct DashboardSyncClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: SyncConfig,
    token_client: TokenClient,
    observer: Arc<dyn DashboardObserver>,
    queue: SendQueue,
    pending: PendingRequests,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl DashboardSyncClient {
    /// Create a client for the given backend, dispatching to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Auth`] if the configured host does not form a
    /// valid base URL or the HTTP client cannot be built.
    pub fn new(
        config: SyncConfig,
        observer: Arc<dyn DashboardObserver>,
    ) -> Result<Self, SyncError> {
        let base_url = Url::parse(&config.http_base_url()).map_err(AuthError::from)?;
        let token_client = TokenClient::new(base_url)?;
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                token_client,
                observer,
                queue: SendQueue::new(),
                pending: PendingRequests::new(),
                state_tx,
                shutdown: CancellationToken::new(),
                running: AtomicBool::new(false),
            }),
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Number of outbound frames waiting for a live socket.
    #[must_use]
    pub fn queued_messages(&self) -> usize {
        self.inner.queue.len()
    }

    /// Number of state requests currently in flight.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Start the connection task.
    ///
    /// Idempotent: a no-op while a connection task is already running, and
    /// after [`shutdown`](Self::shutdown). The task fetches a token, opens
    /// the socket, flushes the queue, and keeps reconnecting per the
    /// configured policy until told to stop.
    pub fn connect(&self) {
        if self.inner.shutdown.is_cancelled() {
            tracing::warn!("connect() called after shutdown, ignoring");
            return;
        }
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Update channel already connecting or connected");
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run().await;
            inner.running.store(false, Ordering::SeqCst);
        });
    }

    /// Queue an outbound frame.
    ///
    /// Never fails: while the socket is open the connection task forwards
    /// the frame immediately, otherwise it stays queued (FIFO) until the
    /// next successful connect. Frames do not survive process restart.
    pub fn send(&self, message: ClientMessage) {
        if self.connection_state() != ConnectionState::Open {
            tracing::debug!("Update channel not open, frame queued");
        }
        self.inner.queue.push(message);
    }

    /// Request a fresh dashboard state and await the response.
    ///
    /// Uses the configured default timeout. See
    /// [`request_dashboard_state_with`](Self::request_dashboard_state_with).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RequestTimeout`] if no full-state frame arrives
    /// in time, or [`SyncError::Shutdown`] if the client stops first.
    pub async fn request_dashboard_state(
        &self,
        request: StateRequest,
    ) -> Result<DashboardState, SyncError> {
        let options =
            RequestOptions::default().with_timeout(self.inner.config.request_timeout());
        self.request_dashboard_state_with(request, options).await
    }

    /// Request a fresh dashboard state with per-request timeout/cancellation.
    ///
    /// Concurrent requests with identical parameters share a single wire
    /// frame and resolve with the same payload (single-flight); requests
    /// with different parameters each send their own frame. A timed-out or
    /// cancelled request frees its pending slot immediately, so later
    /// requests always start fresh. A response arriving after the deadline
    /// is delivered to the observer as a normal full-state update but
    /// resolves nothing here.
    ///
    /// # Errors
    ///
    /// [`SyncError::RequestTimeout`], [`SyncError::RequestCancelled`], or
    /// [`SyncError::Shutdown`].
    pub async fn request_dashboard_state_with(
        &self,
        request: StateRequest,
        options: RequestOptions,
    ) -> Result<DashboardState, SyncError> {
        // A stopped client can never answer; don't sit out the timeout.
        if self.inner.shutdown.is_cancelled()
            || self.connection_state() == ConnectionState::Closed
        {
            return Err(SyncError::Shutdown);
        }

        let (waiter, receiver, is_new) = self.inner.pending.subscribe(&request);
        if is_new {
            self.send(ClientMessage::GetDashboardState(request));
        } else {
            tracing::debug!("Identical state request already in flight, sharing it");
        }

        tokio::select! {
            result = receiver => result.map_err(|_| SyncError::Shutdown),
            () = options.cancel.cancelled() => {
                self.inner.pending.remove_waiter(waiter);
                Err(SyncError::RequestCancelled)
            }
            () = tokio::time::sleep(options.timeout) => {
                self.inner.pending.remove_waiter(waiter);
                Err(SyncError::RequestTimeout(options.timeout))
            }
        }
    }

    /// Shut the client down.
    ///
    /// Terminal: closes the socket, stops reconnecting, and fails every
    /// pending request with [`SyncError::Shutdown`].
    pub fn shutdown(&self) {
        tracing::info!("Shutting down dashboard sync client");
        self.inner.shutdown.cancel();
        self.inner.pending.clear();
        self.inner.state_tx.send_replace(ConnectionState::Closed);
    }

    #[cfg(test)]
    pub(crate) async fn dispatch_for_test(&self, text: &str) {
        self.inner.dispatch(text).await;
    }
}

impl Inner {
    /// Connection task body: token, socket, session, backoff, repeat.
    async fn run(&self) {
        let policy = ReconnectPolicy::from(self.config.reconnect);
        let mut failures: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                self.set_state(ConnectionState::Closed).await;
                return;
            }
            self.set_state(ConnectionState::Connecting).await;

            // One token per connection attempt. An invalid session is fatal
            // to the whole loop: reconnecting cannot fix it. Other token
            // failures (endpoint down, 5xx) back off and retry like any
            // connection failure.
            let token = match self.token_client.fetch_token().await {
                Ok(token) => token,
                Err(err) if err.requires_login() => {
                    tracing::error!(error = %err, "Session invalid, stopping sync client");
                    self.observer.on_error(&SyncError::Auth(err)).await;
                    self.observer.on_auth_required().await;
                    self.park_closed().await;
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Token fetch failed");
                    self.observer.on_error(&SyncError::Auth(err)).await;
                    self.set_state(ConnectionState::Disconnected).await;
                    failures += 1;
                    if self.backoff(&policy, failures).await {
                        continue;
                    }
                    self.park_closed().await;
                    return;
                }
            };

            let url = match socket_url(
                &self.config.host,
                self.config.ws_port,
                &self.config.ws_path,
                &token,
            ) {
                Ok(url) => url,
                Err(err) => {
                    tracing::error!(error = %err, "Invalid update channel URL, stopping sync client");
                    self.park_closed().await;
                    return;
                }
            };

            tracing::info!(
                host = %self.config.host,
                port = self.config.ws_port,
                "Connecting to update channel"
            );

            match connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    failures = 0;
                    if matches!(self.drive_connection(ws).await, Disconnect::Shutdown) {
                        self.park_closed().await;
                        return;
                    }
                    self.set_state(ConnectionState::Disconnected).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Update channel handshake failed");
                    self.observer.on_error(&SyncError::Transport(err)).await;
                    self.set_state(ConnectionState::Disconnected).await;
                }
            }

            failures += 1;
            if !self.backoff(&policy, failures).await {
                self.park_closed().await;
                return;
            }
        }
    }

    /// Count a failed attempt against the policy and wait out the backoff
    /// delay. Returns `false` when the loop must stop instead (policy
    /// exhausted or shutdown requested).
    async fn backoff(&self, policy: &ReconnectPolicy, failures: u32) -> bool {
        if policy.is_exhausted(failures) {
            let err = SyncError::ReconnectExhausted { attempts: failures };
            tracing::error!(error = %err, "Stopping sync client");
            self.observer.on_error(&err).await;
            return false;
        }

        let delay = policy.delay_for(failures - 1);
        tracing::info!(?delay, "Scheduling reconnect");
        tokio::select! {
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Drive one live socket session until it ends.
    async fn drive_connection(&self, ws: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Disconnect {
        let (mut sink, mut stream) = ws.split();

        // Everything queued while disconnected goes out before the channel
        // is reported open, so pre-open sends are ordered before post-open
        // ones.
        if let Err(err) = self.flush_queue(&mut sink).await {
            self.observer.on_error(&SyncError::Transport(err)).await;
            return Disconnect::Transport;
        }
        self.set_state(ConnectionState::Open).await;

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return Disconnect::Shutdown;
                }
                () = self.queue.wait() => {
                    if let Err(err) = self.flush_queue(&mut sink).await {
                        self.observer.on_error(&SyncError::Transport(err)).await;
                        return Disconnect::Transport;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(&text).await,
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::warn!("Update channel closed by server");
                        return Disconnect::Transport;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "Update channel read error");
                        self.observer.on_error(&SyncError::Transport(err)).await;
                        return Disconnect::Transport;
                    }
                }
            }
        }
    }

    /// Send every queued frame, oldest first.
    ///
    /// On transport failure the unsent remainder is put back so it survives
    /// to the next connection.
    async fn flush_queue<S>(&self, sink: &mut S) -> Result<(), tungstenite::Error>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let queued = self.queue.drain();
        if queued.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = queued.len(), "Flushing outbound queue");

        let mut iter = queued.into_iter();
        while let Some(message) = iter.next() {
            if let Err(err) = send_frame(sink, &message).await {
                let mut rest = vec![message];
                rest.extend(iter);
                self.queue.requeue_front(rest);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Route one inbound frame.
    ///
    /// Malformed frames are logged and dropped; the connection stays up.
    async fn dispatch(&self, text: &str) {
        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Dropping malformed inbound frame");
                return;
            }
        };

        match message {
            ServerMessage::InitialDashboardState { data }
            | ServerMessage::DashboardStateUpdate { data } => {
                let resolved = self.pending.resolve_all(&data);
                tracing::debug!(resolved, "Full dashboard state received");
                self.observer.on_full_state(&data).await;
            }
            ServerMessage::TranscriptionUpdated { data } => {
                self.observer
                    .on_transcription_updated(&data.transcription)
                    .await;
            }
            ServerMessage::TranscriptionUpdateTrigger { .. } => {
                self.observer.on_refresh_needed().await;
            }
            ServerMessage::WorkerStats { data } => {
                self.observer.on_worker_stats(&data).await;
            }
            ServerMessage::Error { message } => {
                tracing::warn!(message = %message, "Server-reported error");
                self.observer.on_server_error(&message).await;
            }
        }
    }

    /// Enter the terminal state, failing all pending requests.
    async fn park_closed(&self) {
        self.pending.clear();
        self.set_state(ConnectionState::Closed).await;
    }

    async fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state changed");
            self.observer.on_connection_state(state).await;
        }
    }
}

/// Serialize and send one frame.
///
/// Serialization failures are logged and swallowed (the frame is dropped);
/// only transport failures propagate.
async fn send_frame<S>(sink: &mut S, message: &ClientMessage) -> Result<(), tungstenite::Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match serde_json::to_string(message) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize outbound frame, dropping it");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::observer::NullObserver;
    use crate::protocol::Transcription;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn test_client() -> DashboardSyncClient {
        DashboardSyncClient::new(SyncConfig::default(), Arc::new(NullObserver)).unwrap()
    }

    fn test_client_with(observer: Arc<dyn DashboardObserver>) -> DashboardSyncClient {
        DashboardSyncClient::new(SyncConfig::default(), observer).unwrap()
    }

    /// Observer that records which callbacks fired.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }
    }

    #[async_trait]
    impl DashboardObserver for Recorder {
        async fn on_full_state(&self, _state: &DashboardState) {
            self.record("full_state");
        }
        async fn on_transcription_updated(&self, transcription: &Transcription) {
            self.record(format!("patch:{}", transcription.id));
        }
        async fn on_worker_stats(&self, _stats: &crate::protocol::WorkerStats) {
            self.record("worker_stats");
        }
        async fn on_refresh_needed(&self) {
            self.record("refresh_needed");
        }
        async fn on_server_error(&self, message: &str) {
            self.record(format!("server_error:{message}"));
        }
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let client = test_client();
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.queued_messages(), 0);
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn send_queues_while_disconnected() {
        let client = test_client();
        client.send(ClientMessage::GetDashboardState(StateRequest::new(1, 25)));
        client.send(ClientMessage::GetDashboardState(StateRequest::new(2, 25)));
        assert_eq!(client.queued_messages(), 2);
    }

    #[tokio::test]
    async fn request_times_out_and_frees_slot() {
        let client = test_client();
        let options = RequestOptions::default().with_timeout(Duration::from_millis(20));

        let result = client
            .request_dashboard_state_with(StateRequest::new(1, 25), options)
            .await;
        assert!(matches!(result, Err(SyncError::RequestTimeout(_))));
        assert_eq!(client.pending_requests(), 0);

        // The request frame itself was queued (no connection in this test).
        assert_eq!(client.queued_messages(), 1);
    }

    #[tokio::test]
    async fn cancelled_request_frees_slot() {
        let client = test_client();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = RequestOptions::default().with_cancel(cancel);

        let result = client
            .request_dashboard_state_with(StateRequest::new(1, 25), options)
            .await;
        assert!(matches!(result, Err(SyncError::RequestCancelled)));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn shutdown_fails_pending_requests() {
        let client = test_client();
        let pending = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .request_dashboard_state(StateRequest::new(1, 25))
                    .await
            })
        };
        // Let the request register before shutting down.
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.shutdown();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(SyncError::Shutdown)));
        assert_eq!(client.connection_state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn request_after_shutdown_fails_fast() {
        let client = test_client();
        client.shutdown();

        let start = tokio::time::Instant::now();
        let result = client
            .request_dashboard_state(StateRequest::new(1, 25))
            .await;
        assert!(matches!(result, Err(SyncError::Shutdown)));
        // Fails immediately instead of sitting out the 10s default timeout.
        assert!(start.elapsed() < Duration::from_secs(1));
        // Nothing was registered or queued for a client that cannot answer.
        assert_eq!(client.pending_requests(), 0);
        assert_eq!(client.queued_messages(), 0);
    }

    #[tokio::test]
    async fn dispatch_routes_full_state_and_resolves_pending() {
        let recorder = Arc::new(Recorder::default());
        let client = test_client_with(recorder.clone());

        let request = StateRequest::new(1, 25);
        let pending = {
            let client = client.clone();
            let request = request.clone();
            tokio::spawn(async move { client.request_dashboard_state(request).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.pending_requests(), 1);

        client
            .dispatch_for_test(
                r#"{"type":"dashboard_state_update","data":{"transcription_count":{"total_filtered":1}}}"#,
            )
            .await;

        let state = pending.await.unwrap().unwrap();
        assert_eq!(state.transcription_count.unwrap().effective_total(), 1);
        assert_eq!(client.pending_requests(), 0);
        assert_eq!(recorder.events(), vec!["full_state"]);
    }

    #[tokio::test]
    async fn dispatch_routes_patch_trigger_workers_and_errors() {
        let recorder = Arc::new(Recorder::default());
        let client = test_client_with(recorder.clone());

        client
            .dispatch_for_test(
                r#"{"type":"transcription_updated","data":{"transcription":{"id":"abc123"}}}"#,
            )
            .await;
        client
            .dispatch_for_test(r#"{"type":"transcription_update_trigger"}"#)
            .await;
        client
            .dispatch_for_test(r#"{"type":"worker_stats","data":{"workers":[]}}"#)
            .await;
        client
            .dispatch_for_test(r#"{"type":"error","message":"boom"}"#)
            .await;

        assert_eq!(
            recorder.events(),
            vec![
                "patch:abc123",
                "refresh_needed",
                "worker_stats",
                "server_error:boom"
            ]
        );
    }

    #[tokio::test]
    async fn dispatch_drops_malformed_frames() {
        let recorder = Arc::new(Recorder::default());
        let client = test_client_with(recorder.clone());

        client.dispatch_for_test("not json at all").await;
        client.dispatch_for_test(r#"{"type":"mystery"}"#).await;

        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn late_response_after_timeout_resolves_nothing() {
        let client = test_client();
        let options = RequestOptions::default().with_timeout(Duration::from_millis(10));
        let result = client
            .request_dashboard_state_with(StateRequest::new(1, 25), options)
            .await;
        assert!(matches!(result, Err(SyncError::RequestTimeout(_))));

        // The "late" response arrives after the slot was freed: nothing to
        // resolve, no panic, observer still sees it as a normal update.
        client
            .dispatch_for_test(r#"{"type":"initial_dashboard_state","data":{}}"#)
            .await;
        assert_eq!(client.pending_requests(), 0);
    }
}
