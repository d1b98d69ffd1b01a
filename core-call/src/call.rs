//! One-shot, cloneable remote calls
//!
//! A [`Call`] pairs a request template with a [`ResponseAdapter`]. It runs at
//! most once, either awaited through [`Call::execute`] or in the background
//! through [`Call::enqueue`], and can be canceled from any thread.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --execute/enqueue--> Executing --ok--> Completed
//!                               |------err--> Failed
//! Idle | Executing --cancel--> Canceled
//! ```
//!
//! Every transition out of `Executing` is a single compare-and-set, so a
//! completion racing a cancellation has exactly one winner.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, Instrument};

use crate::adapter::ResponseAdapter;
use crate::error::{CallError, Result};

/// Completion handler for [`Call::enqueue`].
///
/// Exactly one of the two methods is invoked, exactly once. Any
/// `FnOnce(Result<T>)` closure is a callback.
pub trait Callback<T>: Send + 'static {
    fn on_response(self: Box<Self>, value: T);
    fn on_failure(self: Box<Self>, error: CallError);
}

impl<T, F> Callback<T> for F
where
    F: FnOnce(Result<T>) + Send + 'static,
{
    fn on_response(self: Box<Self>, value: T) {
        (*self)(Ok(value))
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        (*self)(Err(error))
    }
}

pub(crate) fn deliver<T: 'static>(callback: Box<dyn Callback<T>>, result: Result<T>) {
    match result {
        Ok(value) => callback.on_response(value),
        Err(error) => callback.on_failure(error),
    }
}

/// Callback of a spawned call. If the task is dropped before it delivers,
/// which is what a shut-down runtime does, the call is canceled and the
/// callback receives that cancellation instead.
struct PendingDelivery<T: 'static> {
    callback: Option<Box<dyn Callback<T>>>,
    state: Arc<CallState>,
}

impl<T: 'static> PendingDelivery<T> {
    fn new(callback: Box<dyn Callback<T>>, state: Arc<CallState>) -> Self {
        Self {
            callback: Some(callback),
            state,
        }
    }

    fn deliver(mut self, result: Result<T>) {
        if let Some(callback) = self.callback.take() {
            deliver(callback, result);
        }
    }
}

impl<T: 'static> Drop for PendingDelivery<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            debug!("Background call dropped before completing; reporting cancellation");
            self.state.cancel();
            callback.on_failure(CallError::canceled());
        }
    }
}

/// A single remote operation producing `T`
#[async_trait]
pub trait Call<T: Send + 'static>: Send + Sync {
    /// Run the call on the current task and wait for its outcome.
    ///
    /// # Errors
    ///
    /// - [`CallError::AlreadyExecuted`] if this instance already ran; no
    ///   request is sent
    /// - [`CallError::Transport`] for I/O faults, non-2xx replies without an
    ///   API envelope and cancellation
    /// - [`CallError::Api`] when the service reports an error code
    async fn execute(&self) -> Result<T>;

    /// Run the call in the background and hand the outcome to `callback`.
    ///
    /// Returns [`CallError::AlreadyExecuted`] immediately, without invoking
    /// the callback, if this instance already ran. If the runtime shuts down
    /// before the call finishes, the callback receives a canceled
    /// [`CallError::Transport`].
    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> Result<()>;

    fn is_executed(&self) -> bool;

    fn is_canceled(&self) -> bool;

    /// Cancel the call. Idempotent; a no-op once the call has completed.
    fn cancel(&self);

    /// A fresh, idle call for the same request
    fn clone_call(&self) -> BoxCall<T>;
}

pub type BoxCall<T> = Box<dyn Call<T>>;

impl<T: Send + 'static> Clone for Box<dyn Call<T>> {
    fn clone(&self) -> Self {
        self.clone_call()
    }
}

/// Observable state of an [`HttpCall`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallLifecycle {
    Idle,
    Executing,
    Completed,
    Failed,
    Canceled,
}

const IDLE: u8 = 0;
const EXECUTING: u8 = 1;
const COMPLETED: u8 = 2;
const FAILED: u8 = 3;
const CANCELED: u8 = 4;

impl CallLifecycle {
    fn from_raw(raw: u8) -> Self {
        match raw {
            IDLE => CallLifecycle::Idle,
            EXECUTING => CallLifecycle::Executing,
            COMPLETED => CallLifecycle::Completed,
            FAILED => CallLifecycle::Failed,
            _ => CallLifecycle::Canceled,
        }
    }
}

/// Shared plumbing for the calls of one client: transport, runtime used by
/// `enqueue`, and the root token canceled on client shutdown.
#[derive(Clone)]
pub struct CallContext {
    transport: Arc<dyn HttpClient>,
    runtime: Handle,
    cancel_root: CancellationToken,
}

impl CallContext {
    pub fn new(transport: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self {
            transport,
            runtime,
            cancel_root: CancellationToken::new(),
        }
    }

    pub fn with_cancel_root(mut self, token: CancellationToken) -> Self {
        self.cancel_root = token;
        self
    }

    pub fn transport(&self) -> &Arc<dyn HttpClient> {
        &self.transport
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn cancel_root(&self) -> &CancellationToken {
        &self.cancel_root
    }

    /// Build an idle call for `request`
    pub fn call<T: Send + 'static>(
        &self,
        request: HttpRequest,
        adapter: Arc<dyn ResponseAdapter<T>>,
    ) -> HttpCall<T> {
        HttpCall::new(self.clone(), request, adapter)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("shut_down", &self.cancel_root.is_cancelled())
            .finish()
    }
}

/// Immutable part shared by a call and its clones
struct CallTemplate<T> {
    context: CallContext,
    request: HttpRequest,
    adapter: Arc<dyn ResponseAdapter<T>>,
}

/// Per-instance execution state
struct CallState {
    executed: AtomicBool,
    lifecycle: AtomicU8,
    token: CancellationToken,
}

impl CallState {
    fn new(parent: &CancellationToken) -> Self {
        Self {
            executed: AtomicBool::new(false),
            lifecycle: AtomicU8::new(IDLE),
            token: parent.child_token(),
        }
    }

    fn mark_executed(&self) -> Result<()> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(CallError::AlreadyExecuted);
        }
        Ok(())
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.lifecycle
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn begin(&self) -> Result<()> {
        if self.token.is_cancelled() {
            self.transition(IDLE, CANCELED);
            return Err(CallError::canceled());
        }
        if self.transition(IDLE, EXECUTING) {
            Ok(())
        } else {
            Err(CallError::canceled())
        }
    }

    fn lifecycle(&self) -> CallLifecycle {
        let raw = self.lifecycle.load(Ordering::SeqCst);
        match raw {
            // canceled through the client's root token
            IDLE | EXECUTING if self.token.is_cancelled() => CallLifecycle::Canceled,
            _ => CallLifecycle::from_raw(raw),
        }
    }

    fn cancel(&self) {
        let mut current = self.lifecycle.load(Ordering::SeqCst);
        loop {
            if current != IDLE && current != EXECUTING {
                return;
            }
            match self.lifecycle.compare_exchange(
                current,
                CANCELED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        self.token.cancel();
    }
}

/// [`Call`] backed by an [`HttpClient`] exchange
pub struct HttpCall<T> {
    template: Arc<CallTemplate<T>>,
    state: Arc<CallState>,
}

impl<T: Send + 'static> HttpCall<T> {
    pub fn new(
        context: CallContext,
        request: HttpRequest,
        adapter: Arc<dyn ResponseAdapter<T>>,
    ) -> Self {
        let state = Arc::new(CallState::new(&context.cancel_root));
        Self {
            template: Arc::new(CallTemplate {
                context,
                request,
                adapter,
            }),
            state,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.template.request
    }

    pub fn lifecycle(&self) -> CallLifecycle {
        self.state.lifecycle()
    }

    fn span(&self) -> tracing::Span {
        let request = &self.template.request;
        debug_span!("call", method = ?request.method, url = %request.url)
    }
}

impl<T> Clone for HttpCall<T> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            state: Arc::new(CallState::new(&self.template.context.cancel_root)),
        }
    }
}

impl<T> fmt::Debug for HttpCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCall")
            .field("method", &self.template.request.method)
            .field("url", &self.template.request.url)
            .field("lifecycle", &self.state.lifecycle())
            .finish()
    }
}

async fn run<T: Send + 'static>(template: Arc<CallTemplate<T>>, state: Arc<CallState>) -> Result<T> {
    state.begin()?;

    let exchange = async {
        match template.context.transport.execute(template.request.clone()).await {
            Ok(response) => template.adapter.adapt(response).await.into_result(),
            Err(e) => Err(CallError::from(e)),
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = state.token.cancelled() => {
            state.transition(EXECUTING, CANCELED);
            debug!("Call canceled in flight");
            return Err(CallError::canceled());
        }
        outcome = exchange => outcome,
    };

    let terminal = if outcome.is_ok() { COMPLETED } else { FAILED };
    if state.transition(EXECUTING, terminal) {
        debug!(ok = outcome.is_ok(), "Call finished");
        outcome
    } else {
        debug!("Call canceled before its outcome was delivered");
        Err(CallError::canceled())
    }
}

#[async_trait]
impl<T: Send + 'static> Call<T> for HttpCall<T> {
    async fn execute(&self) -> Result<T> {
        self.state.mark_executed()?;
        run(self.template.clone(), self.state.clone())
            .instrument(self.span())
            .await
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> Result<()> {
        self.state.mark_executed()?;
        let template = self.template.clone();
        let state = self.state.clone();
        let pending = PendingDelivery::new(callback, state.clone());
        self.template.context.runtime.spawn(
            async move {
                let result = run(template, state).await;
                pending.deliver(result);
            }
            .instrument(self.span()),
        );
        Ok(())
    }

    fn is_executed(&self) -> bool {
        self.state.executed.load(Ordering::SeqCst)
    }

    fn is_canceled(&self) -> bool {
        self.state.lifecycle() == CallLifecycle::Canceled
    }

    fn cancel(&self) {
        self.state.cancel();
    }

    fn clone_call(&self) -> BoxCall<T> {
        Box::new(self.clone())
    }
}
