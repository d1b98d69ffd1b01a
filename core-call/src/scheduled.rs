//! Executor-bound call decorator

use async_trait::async_trait;
use bridge_traits::background::CallbackExecutor;
use std::sync::Arc;

use crate::call::{BoxCall, Call, Callback};
use crate::error::{CallError, Result};

/// Delivers the callbacks of an inner call through a [`CallbackExecutor`].
///
/// `execute` is passed through untouched; only `enqueue` callbacks are moved
/// onto the executor.
pub struct ScheduledCall<T> {
    inner: BoxCall<T>,
    executor: Arc<dyn CallbackExecutor>,
}

impl<T: Send + 'static> ScheduledCall<T> {
    pub fn new(inner: BoxCall<T>, executor: Arc<dyn CallbackExecutor>) -> Self {
        Self { inner, executor }
    }

    pub fn into_inner(self) -> BoxCall<T> {
        self.inner
    }
}

struct ExecutorCallback<T> {
    callback: Box<dyn Callback<T>>,
    executor: Arc<dyn CallbackExecutor>,
}

impl<T: Send + 'static> Callback<T> for ExecutorCallback<T> {
    fn on_response(self: Box<Self>, value: T) {
        let ExecutorCallback { callback, executor } = *self;
        executor.execute(Box::new(move || callback.on_response(value)));
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        let ExecutorCallback { callback, executor } = *self;
        executor.execute(Box::new(move || callback.on_failure(error)));
    }
}

#[async_trait]
impl<T: Send + 'static> Call<T> for ScheduledCall<T> {
    async fn execute(&self) -> Result<T> {
        self.inner.execute().await
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> Result<()> {
        self.inner.enqueue(Box::new(ExecutorCallback {
            callback,
            executor: self.executor.clone(),
        }))
    }

    fn is_executed(&self) -> bool {
        self.inner.is_executed()
    }

    fn is_canceled(&self) -> bool {
        self.inner.is_canceled()
    }

    fn cancel(&self) {
        self.inner.cancel()
    }

    fn clone_call(&self) -> BoxCall<T> {
        Box::new(ScheduledCall {
            inner: self.inner.clone_call(),
            executor: self.executor.clone(),
        })
    }
}
