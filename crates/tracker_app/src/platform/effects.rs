use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracker_core::{DayPlan, Effect, Msg, DAY_PLAN_TABLE};
use tracker_engine::{
    ChannelEventSink, DebouncedSaver, FileRecordStore, RecordSaver, RestRecordStore, SaveError,
    SaveEvent, SaveOperation,
};
use tracker_logging::tracker_info;

use super::config::{AppConfig, BackendConfig};

/// Executes core effects against the configured backend.
pub struct EffectRunner {
    saver: DebouncedSaver<DayPlan>,
    events: mpsc::Receiver<SaveEvent>,
}

impl EffectRunner {
    /// Must be called inside the tokio runtime that drives the save timers.
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        Self::with_operation(config, build_operation(&config.backend)?)
    }

    fn with_operation(
        config: &AppConfig,
        operation: Arc<dyn SaveOperation<DayPlan>>,
    ) -> anyhow::Result<Self> {
        let (tx, events) = mpsc::channel();
        let saver = DebouncedSaver::builder()
            .shared_operation(operation)
            .delay(config.save_delay())
            .policy(config.dispatch)
            .event_sink(Arc::new(ChannelEventSink::new(tx)))
            .build()
            .context("failed to configure auto-save")?;
        tracker_info!(
            "Auto-save configured: delay {:?}, policy {:?}",
            saver.delay(),
            saver.policy()
        );
        Ok(Self { saver, events })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RequestSave(plan) => self.saver.request_save(plan),
            }
        }
    }

    /// Save lifecycle messages received since the last call.
    pub fn drain_messages(&self) -> Vec<Msg> {
        self.events.try_iter().map(map_event).collect()
    }

    /// Saves pending edits right away.
    pub async fn flush(&self) -> Option<Result<(), SaveError>> {
        self.saver.flush().await
    }

    /// Waits for in-flight saves to settle; `false` if `limit` ran out first.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let mut saving = self.saver.subscribe();
        let settled = tokio::time::timeout(limit, saving.wait_for(|flag| !*flag))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false);
        settled
    }
}

fn build_operation(backend: &BackendConfig) -> anyhow::Result<Arc<dyn SaveOperation<DayPlan>>> {
    let operation: Arc<dyn SaveOperation<DayPlan>> = match backend {
        BackendConfig::Local { dir } => {
            tracker_info!("Saving plans to {:?}", dir);
            Arc::new(RecordSaver::new(
                FileRecordStore::new(dir.clone()),
                DAY_PLAN_TABLE,
                day_plan_id,
            ))
        }
        BackendConfig::Hosted { base_url, .. } => {
            let settings = backend
                .backend_settings()
                .context("hosted backend without settings")?;
            let store = RestRecordStore::new(settings)
                .with_context(|| format!("invalid hosted backend {base_url:?}"))?;
            tracker_info!("Saving plans to hosted backend {}", base_url);
            Arc::new(RecordSaver::new(store, DAY_PLAN_TABLE, day_plan_id))
        }
    };
    Ok(operation)
}

fn day_plan_id(plan: &DayPlan) -> String {
    plan.date.clone()
}

fn map_event(event: SaveEvent) -> Msg {
    match event {
        SaveEvent::Started { dispatch_id } => Msg::SaveStarted { dispatch_id },
        SaveEvent::Succeeded { dispatch_id, .. } => Msg::SaveSucceeded { dispatch_id },
        SaveEvent::Failed { dispatch_id, error } => Msg::SaveFailed {
            dispatch_id,
            message: error.to_string(),
        },
    }
}
