//! Single-flight token refresh
//!
//! At most one refresh runs at a time. Callers that hit a 401 while it runs
//! join the same shared future; authenticated requests issued while it runs
//! are parked in a FIFO queue and replayed, in order, once it settles.
//!
//! The refresh itself runs in a spawned task, so a caller that times out or
//! is dropped never cancels it.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chatline_common::auth::{AuthFailureSignal, TokenStore};
use chatline_domain::constants::{AUTH_FAILURE_MESSAGE, DEFAULT_REFRESH_TIMEOUT_MS};
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::errors::{ApiError, RefreshError};
use super::refresher::{RefreshedTokens, TokenRefresher};
use crate::http::ResponseBody;

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;
type RequestOutcome = Result<ResponseBody, ApiError>;
type Replay = Box<dyn FnOnce() -> BoxFuture<'static, RequestOutcome> + Send>;

struct QueuedRequest {
    replay: Replay,
    reply: oneshot::Sender<RequestOutcome>,
}

#[derive(Default)]
struct RefreshState {
    in_flight: Option<RefreshFuture>,
    queue: VecDeque<QueuedRequest>,
}

struct Inner {
    refresher: Arc<dyn TokenRefresher>,
    tokens: Arc<TokenStore>,
    signal: AuthFailureSignal,
    refresh_timeout: Duration,
    state: Mutex<RefreshState>,
}

enum Admission<F> {
    Run(F),
    Wait(oneshot::Receiver<RequestOutcome>),
}

/// Coordinates access-token refreshes across concurrent requests.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        tokens: Arc<TokenStore>,
        signal: AuthFailureSignal,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                refresher,
                tokens,
                signal,
                refresh_timeout: Duration::from_millis(DEFAULT_REFRESH_TIMEOUT_MS),
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Bounds the refresh network call. Must be set before the coordinator
    /// is shared.
    #[must_use]
    pub fn with_refresh_timeout(self, timeout: Duration) -> Self {
        let inner = Inner {
            refresher: Arc::clone(&self.inner.refresher),
            tokens: Arc::clone(&self.inner.tokens),
            signal: self.inner.signal.clone(),
            refresh_timeout: timeout,
            state: Mutex::new(RefreshState::default()),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// Number of requests parked behind the running refresh.
    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Refreshes the access token, joining a refresh already in flight.
    ///
    /// # Errors
    /// Any [`RefreshError`]. On failure the token store has been cleared and
    /// the auth-failure signal emitted.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let pending = {
            let mut state = self.inner.state.lock();
            self.join_or_start(&mut state)
        };
        pending.await
    }

    /// Refresh on behalf of a request that was rejected while carrying
    /// `used`.
    ///
    /// Returns the current token without a network call when it has already
    /// been replaced. When the session has been cleared in the meantime,
    /// fails without starting a refresh.
    pub(crate) async fn refresh_stale(&self, used: &str) -> Result<String, RefreshError> {
        let pending = {
            let mut state = self.inner.state.lock();
            if state.in_flight.is_none() {
                match self.inner.tokens.access_token() {
                    Some(current) if current != used => {
                        debug!("Access token already replaced; skipping refresh");
                        return Ok(current);
                    }
                    None => return Err(RefreshError::NoRefreshToken),
                    Some(_) => {}
                }
            }
            self.join_or_start(&mut state)
        };
        pending.await
    }

    /// Runs `retry` now, or parks it until the running refresh settles.
    ///
    /// Parked requests replay in arrival order after a successful refresh
    /// and are rejected with [`ApiError::Authentication`] after a failed
    /// one.
    ///
    /// # Errors
    /// Whatever `retry` returns, or the refresh failure.
    pub async fn queue_request<F, Fut>(&self, retry: F) -> Result<ResponseBody, ApiError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ResponseBody, ApiError>> + Send + 'static,
    {
        let admission = {
            let mut state = self.inner.state.lock();
            if state.in_flight.is_some() {
                let (reply, receiver) = oneshot::channel();
                state.queue.push_back(QueuedRequest { replay: Box::new(move || retry().boxed()), reply });
                debug!(queued = state.queue.len(), "Request queued behind token refresh");
                Admission::Wait(receiver)
            } else {
                Admission::Run(retry)
            }
        };

        match admission {
            Admission::Run(retry) => retry().await,
            Admission::Wait(receiver) => receiver.await.unwrap_or(Err(ApiError::Cancelled)),
        }
    }

    fn join_or_start(&self, state: &mut RefreshState) -> RefreshFuture {
        if let Some(pending) = &state.in_flight {
            return pending.clone();
        }

        debug!("Starting token refresh");
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run());
        let pending = async move { handle.await.unwrap_or(Err(RefreshError::Aborted)) }.boxed().shared();
        state.in_flight = Some(pending.clone());
        pending
    }
}

impl Inner {
    async fn run(self: Arc<Self>) -> Result<String, RefreshError> {
        match self.exchange().await {
            Ok(tokens) => {
                self.tokens.store_session(&tokens.access_token, tokens.refresh_token.as_deref());
                let queue = self.settle();
                info!(replaying = queue.len(), "Access token refreshed");
                replay(queue);
                Ok(tokens.access_token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed; ending session");
                self.tokens.clear();
                let queue = self.settle();
                for request in queue {
                    let _ = request.reply.send(Err(ApiError::from(err.clone())));
                }
                self.signal.emit(AUTH_FAILURE_MESSAGE);
                Err(err)
            }
        }
    }

    async fn exchange(&self) -> Result<RefreshedTokens, RefreshError> {
        let refresh_token = self.tokens.refresh_token().ok_or(RefreshError::NoRefreshToken)?;
        tokio::time::timeout(self.refresh_timeout, self.refresher.refresh(&refresh_token))
            .await
            .map_err(|_| RefreshError::Timeout(self.refresh_timeout))?
    }

    /// Back to idle; hands over the parked requests.
    fn settle(&self) -> VecDeque<QueuedRequest> {
        let mut state = self.state.lock();
        state.in_flight = None;
        std::mem::take(&mut state.queue)
    }
}

/// Starts parked requests in FIFO order and lets them run side by side, so a
/// slow request never holds up the ones behind it. Callers that gave up are
/// skipped.
fn replay(queue: VecDeque<QueuedRequest>) {
    if queue.is_empty() {
        return;
    }
    tokio::spawn(async move {
        let mut pending: FuturesUnordered<_> = queue
            .into_iter()
            .filter(|request| {
                let abandoned = request.reply.is_closed();
                if abandoned {
                    debug!("Skipping abandoned queued request");
                }
                !abandoned
            })
            .map(|request| {
                let outcome = (request.replay)();
                async move {
                    let _ = request.reply.send(outcome.await);
                }
            })
            .collect();
        while pending.next().await.is_some() {}
    });
}
