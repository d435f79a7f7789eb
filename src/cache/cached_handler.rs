//! Request handler memoized through a [`CacheAdapter`]
//!
//! Wrapping a fan-out target in a `CachedHandler` lets a branch consult the
//! cache before invoking the target and populate it afterwards, without the
//! coordinator knowing caching is involved.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::adapter::CacheAdapter;
use super::traits::CacheStore;
use crate::dispatch::{HandlerError, RequestHandler};
use crate::messaging::{DispatchContext, Message};

pub struct CachedHandler<S> {
    inner: Arc<dyn RequestHandler>,
    adapter: CacheAdapter<S>,
}

impl<S> std::fmt::Debug for CachedHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedHandler")
            .field("inner", &self.inner.name())
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl<S: CacheStore> CachedHandler<S> {
    pub fn new(inner: Arc<dyn RequestHandler>, adapter: CacheAdapter<S>) -> Self {
        Self { inner, adapter }
    }

    pub fn adapter(&self) -> &CacheAdapter<S> {
        &self.adapter
    }
}

#[async_trait]
impl<S: CacheStore + 'static> RequestHandler for CachedHandler<S> {
    async fn handle(
        &self,
        request: &Message,
        context: &DispatchContext,
    ) -> Result<Message, HandlerError> {
        let Some(input) = request.as_str() else {
            debug!(
                cache = %self.adapter.name(),
                "Request body is still streaming, bypassing cache"
            );
            return self.inner.handle(request, context).await;
        };

        let lookup = self
            .adapter
            .get_or_compute(input, context, || async {
                let reply = self.inner.handle(request, context).await?;
                reply
                    .into_text()
                    .await
                    .map_err(|e| HandlerError::malformed(self.inner.name(), e.to_string()))
            })
            .await?;

        Ok(Message::text(lookup.value))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
