use std::future::Future;
use std::marker::PhantomData;

use crate::{SaveError, SaveEvent};

/// The persistence step a [`crate::DebouncedSaver`] defers.
#[async_trait::async_trait]
pub trait SaveOperation<T>: Send + Sync {
    async fn save(&self, payload: T) -> Result<(), SaveError>;
}

/// Adapts an async closure into a [`SaveOperation`].
pub struct FnSave<F, T> {
    f: F,
    _payload: PhantomData<fn(T)>,
}

pub fn save_fn<T, F, Fut>(f: F) -> FnSave<F, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SaveError>> + Send + 'static,
{
    FnSave {
        f,
        _payload: PhantomData,
    }
}

#[async_trait::async_trait]
impl<T, F, Fut> SaveOperation<T> for FnSave<F, T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SaveError>> + Send + 'static,
{
    async fn save(&self, payload: T) -> Result<(), SaveError> {
        (self.f)(payload).await
    }
}

/// Side channel for save lifecycle reporting.
pub trait SaveEventSink: Send + Sync {
    fn emit(&self, event: SaveEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<SaveEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<SaveEvent>) -> Self {
        Self { tx }
    }
}

impl SaveEventSink for ChannelEventSink {
    fn emit(&self, event: SaveEvent) {
        let _ = self.tx.send(event);
    }
}
