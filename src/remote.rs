use crate::errors::TrackerError;
use crate::models::{EventId, EventRecord};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::marker::PhantomData;
use tracing::debug;

pub trait RemoteSource<T>: Send + Sync {
    fn list(&self) -> impl Future<Output = Result<Vec<T>, TrackerError>> + Send;

    fn create(&self, item: &T) -> impl Future<Output = Result<T, TrackerError>> + Send;

    fn update(&self, id: &EventId, item: &T) -> impl Future<Output = Result<(), TrackerError>> + Send;

    fn delete(&self, id: &EventId) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

/// Placeholder remote for widgets that only keep local data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl<T: Send + Sync> RemoteSource<T> for NoRemote {
    async fn list(&self) -> Result<Vec<T>, TrackerError> {
        Err(TrackerError::Network("no remote configured".into()))
    }

    async fn create(&self, _item: &T) -> Result<T, TrackerError> {
        Err(TrackerError::Network("no remote configured".into()))
    }

    async fn update(&self, _id: &EventId, _item: &T) -> Result<(), TrackerError> {
        Err(TrackerError::Network("no remote configured".into()))
    }

    async fn delete(&self, _id: &EventId) -> Result<(), TrackerError> {
        Err(TrackerError::Network("no remote configured".into()))
    }
}

#[derive(Debug, Clone)]
pub struct RestResource<M> {
    client: Client,
    base_url: String,
    singular: &'static str,
    plural: &'static str,
    _metadata: PhantomData<fn() -> M>,
}

impl<M> RestResource<M> {
    pub fn new(client: Client, base_url: &str, singular: &'static str, plural: &'static str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            singular,
            plural,
            _metadata: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.plural)
    }

    fn item_url(&self, id: &EventId) -> String {
        format!("{}/{}/{}", self.base_url, self.plural, id)
    }

    fn wrap<T: Serialize>(&self, item: &T) -> Result<Value, TrackerError> {
        let mut envelope = Map::new();
        envelope.insert(self.singular.to_string(), serde_json::to_value(item)?);
        Ok(Value::Object(envelope))
    }
}

fn unwrap_envelope<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, TrackerError> {
    let inner = body
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| TrackerError::Parse(format!("response is missing `{key}`")))?;
    Ok(serde_json::from_value(inner)?)
}

fn check_status(status: StatusCode, action: &str) -> Result<(), TrackerError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TrackerError::Network(format!("{action} failed with status {status}")))
    }
}

impl<M> RemoteSource<EventRecord<M>> for RestResource<M>
where
    M: Serialize + DeserializeOwned + Default + Send + Sync,
{
    async fn list(&self) -> Result<Vec<EventRecord<M>>, TrackerError> {
        let url = self.collection_url();
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;
        check_status(response.status(), "list")?;
        let body: Value = response.json().await?;
        unwrap_envelope(body, self.plural)
    }

    async fn create(&self, item: &EventRecord<M>) -> Result<EventRecord<M>, TrackerError> {
        let url = self.collection_url();
        debug!("POST {url}");
        let payload = self.wrap(item)?;
        let response = self.client.post(&url).json(&payload).send().await?;
        check_status(response.status(), "create")?;
        let body: Value = response.json().await?;
        unwrap_envelope(body, self.singular)
    }

    async fn update(&self, id: &EventId, item: &EventRecord<M>) -> Result<(), TrackerError> {
        let url = self.item_url(id);
        debug!("PATCH {url}");
        let payload = self.wrap(item)?;
        let response = self.client.patch(&url).json(&payload).send().await?;
        check_status(response.status(), "update")
    }

    async fn delete(&self, id: &EventId) -> Result<(), TrackerError> {
        let url = self.item_url(id);
        debug!("DELETE {url}");
        let response = self.client.delete(&url).send().await?;
        check_status(response.status(), "delete")
    }
}
