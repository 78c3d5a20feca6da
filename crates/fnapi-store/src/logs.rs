//! In-memory [`LogStore`].
//!
//! Serves as the conformance double for log backends and as the log half of
//! [`InMemoryDatastore`](crate::InMemoryDatastore). Entries are keyed by call
//! id alone; call ids are globally unique so the app id is only logged.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use crate::traits::{LogStore, LogStream};

#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored log entries.
    pub fn len(&self) -> usize {
        self.logs.read().map(|logs| logs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the logs of `call_ids`. Returns how many existed.
    pub fn remove_logs<'a>(
        &self,
        call_ids: impl IntoIterator<Item = &'a str>,
    ) -> StoreResult<usize> {
        let mut logs = self.logs.write().map_err(StoreError::poisoned)?;
        Ok(call_ids
            .into_iter()
            .filter(|id| logs.remove(*id).is_some())
            .count())
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn insert_log(
        &self,
        ctx: &Context,
        app_id: &str,
        call_id: &str,
        log: LogStream<'_>,
    ) -> StoreResult<()> {
        ctx.check()?;
        let mut buf = Vec::new();
        ctx.run(async {
            log.read_to_end(&mut buf)
                .await
                .map_err(|e| StoreError::Internal(format!("reading log stream: {e}")))
        })
        .await?;

        let size = buf.len();
        self.logs
            .write()
            .map_err(StoreError::poisoned)?
            .insert(call_id.to_string(), Bytes::from(buf));
        tracing::debug!(app_id, call_id, size, "stored call log");
        Ok(())
    }

    async fn get_log(&self, ctx: &Context, _app_id: &str, call_id: &str) -> StoreResult<Bytes> {
        ctx.check()?;
        let logs = self.logs.read().map_err(StoreError::poisoned)?;
        logs.get(call_id)
            .cloned()
            .ok_or_else(|| StoreError::CallLogNotFound(call_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryLogStore::new();
        let ctx = Context::background();
        let mut data: &[u8] = b"hello from call1\n";
        store.insert_log(&ctx, "app1", "call1", &mut data).await.unwrap();

        let log = store.get_log(&ctx, "app1", "call1").await.unwrap();
        assert_eq!(&log[..], b"hello from call1\n");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_log_is_not_found() {
        let store = InMemoryLogStore::new();
        let err = store
            .get_log(&Context::background(), "app1", "nope")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::CallLogNotFound("nope".into()));
    }

    #[tokio::test]
    async fn later_write_overwrites() {
        let store = InMemoryLogStore::new();
        let ctx = Context::background();
        let mut first: &[u8] = b"first";
        let mut second: &[u8] = b"second";
        store.insert_log(&ctx, "app1", "call1", &mut first).await.unwrap();
        store.insert_log(&ctx, "app1", "call1", &mut second).await.unwrap();
        assert_eq!(&store.get_log(&ctx, "app1", "call1").await.unwrap()[..], b"second");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn remove_logs_counts_existing() {
        let store = InMemoryLogStore::new();
        let ctx = Context::background();
        for id in ["call1", "call2"] {
            let mut data: &[u8] = b"x";
            store.insert_log(&ctx, "app1", id, &mut data).await.unwrap();
        }
        assert_eq!(store.remove_logs(["call1", "ghost"]).unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get_log(&ctx, "app1", "call1").await.is_err());
    }

    #[tokio::test]
    async fn cancelled_context_stores_nothing() {
        let store = InMemoryLogStore::new();
        let ctx = Context::background();
        ctx.cancel();
        let mut data: &[u8] = b"data";
        let err = store.insert_log(&ctx, "app1", "call1", &mut data).await.unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_writers() {
        let store = std::sync::Arc::new(InMemoryLogStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let ctx = Context::background();
                let body = format!("log {i}");
                let mut reader = body.as_bytes();
                store
                    .insert_log(&ctx, "app1", &format!("call{i}"), &mut reader)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.len(), 16);
    }
}
