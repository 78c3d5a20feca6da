//! Store contract for the fnapi control plane.
//!
//! The [`Datastore`] trait (with its [`LogStore`] half) is the full
//! persistence surface for apps, routes, calls and call logs. Backends
//! implement it, and so do decorators, which wrap another implementation
//! and add one cross-cutting concern each:
//!
//! - [`Validator`] -- rejects malformed arguments before they reach storage
//! - [`Traced`] -- opens one `tracing` span per operation
//! - [`testing::CountingDatastore`] -- counts invocations, for tests
//!
//! Decorators stack in any order. [`layered`] builds the usual chain,
//! `Traced<Validator<D>>`.
//!
//! # Backends
//!
//! - [`InMemoryDatastore`] -- `RwLock`-guarded maps for tests and embedding
//! - [`InMemoryLogStore`] -- reference [`LogStore`], keyed by call id
//!
//! # Rules
//!
//! 1. A decorator that delegates returns the wrapped result unchanged.
//! 2. Validation errors never reach storage.
//! 3. Storage errors (not found, conflict) pass through every decorator.
//! 4. Every operation takes a [`Context`]; backends fail with
//!    `Cancelled`/`DeadlineExceeded` once it is done.

pub mod context;
pub mod error;
pub mod logs;
pub mod memory;
pub mod testing;
pub mod traced;
pub mod traits;
pub mod validator;

pub use context::Context;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use logs::InMemoryLogStore;
pub use memory::{InMemoryDatastore, MemoryState};
pub use traced::Traced;
pub use traits::{Datastore, LogStore, LogStream, RawHandle};
pub use validator::Validator;

/// Wrap `store` in validation, then tracing.
pub fn layered<D: Datastore>(store: D) -> Traced<Validator<D>> {
    Traced::new(Validator::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnapi_types::{App, AppFilter, Call, CallStatus, Route};
    use proptest::prelude::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn layered_chain_matches_bare_store() {
        let chain = layered(testing::CountingDatastore::new(InMemoryDatastore::new()));
        let ctx = Context::background();

        let app = chain.insert_app(&ctx, &App::named("myapp")).await.unwrap();
        let bare = chain.inner().inner().inner();
        assert_eq!(bare.get_app(&ctx, &app).await.unwrap(), app);
        assert_eq!(chain.get_app(&ctx, &app).await.unwrap(), app);

        let route = chain
            .insert_route(&ctx, &Route::new(&app.id, "/hello", "img"))
            .await
            .unwrap();
        assert_eq!(chain.get_route(&ctx, &app, "/hello").await.unwrap(), route);
        assert_eq!(bare.get_route(&ctx, &app, "/hello").await.unwrap(), route);
    }

    #[tokio::test]
    async fn conflict_survives_any_stacking_order() {
        let ctx = Context::background();
        let call = Call::new("app-id", "/hello");
        let running = call.transitioned(CallStatus::Running);
        let expected = StoreError::Conflict {
            id: call.id.clone(),
            expected: CallStatus::Queued,
            actual: CallStatus::Running,
        };

        let a = layered(InMemoryDatastore::new());
        let b = Validator::new(Traced::new(InMemoryDatastore::new()));
        let c = Traced::new(Traced::new(Validator::new(InMemoryDatastore::new())));
        let stores: [&dyn Datastore; 3] = [&a, &b, &c];
        for store in stores {
            store.insert_call(&ctx, &call).await.unwrap();
            store.update_call(&ctx, &call, &running).await.unwrap();
            assert_eq!(
                store.update_call(&ctx, &call, &running).await.unwrap_err(),
                expected
            );
        }
    }

    #[tokio::test]
    async fn works_behind_a_trait_object() {
        let store: std::sync::Arc<dyn Datastore> = std::sync::Arc::new(layered(InMemoryDatastore::new()));
        let ctx = Context::background();
        store.insert_app(&ctx, &App::named("a")).await.unwrap();
        assert_eq!(store.get_apps(&ctx, &AppFilter::default()).await.unwrap().len(), 1);
    }

    proptest! {
        #[test]
        fn decorated_reads_equal_bare_reads(names in proptest::collection::btree_set("[a-z][a-z0-9-]{0,15}", 1..8)) {
            let rt = runtime();
            rt.block_on(async {
                let chain = Traced::new(Validator::new(Traced::new(InMemoryDatastore::new())));
                let ctx = Context::background();
                for name in &names {
                    chain.insert_app(&ctx, &App::named(name.as_str())).await.unwrap();
                }
                let bare = chain.inner().inner().inner();

                let via_chain = chain.get_apps(&ctx, &AppFilter::default()).await.unwrap();
                let direct = bare.get_apps(&ctx, &AppFilter::default()).await.unwrap();
                prop_assert_eq!(&via_chain, &direct);

                for name in &names {
                    let key = App::named(name.as_str());
                    prop_assert_eq!(
                        chain.get_app(&ctx, &key).await.unwrap(),
                        bare.get_app(&ctx, &key).await.unwrap()
                    );
                }
                Ok(())
            })?;
        }
    }
}
