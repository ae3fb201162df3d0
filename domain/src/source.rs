use crate::error::Error;
use crate::snapshot::Snapshot;
use api_client::ApiClient;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// Where a module fetches its snapshot when it is not pushed.
#[async_trait]
pub trait SnapshotSource<S: Snapshot>: Send + Sync {
    async fn fetch(&self) -> Result<S, Error>;
}

/// Fetches `S` from its REST endpoint.
pub struct ApiSource<S> {
    api: Arc<ApiClient>,
    _snapshot: PhantomData<fn() -> S>,
}

impl<S: Snapshot> ApiSource<S> {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            _snapshot: PhantomData,
        }
    }
}

#[async_trait]
impl<S: Snapshot> SnapshotSource<S> for ApiSource<S> {
    async fn fetch(&self) -> Result<S, Error> {
        Ok(self.api.get_json::<S>(S::ENDPOINT, &[]).await?)
    }
}
