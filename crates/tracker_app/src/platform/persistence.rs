use thiserror::Error;
use tracker_core::{DayPlan, DAY_PLAN_TABLE};
use tracker_engine::{FileRecordStore, RestRecordStore, StoreError};
use tracker_logging::{tracker_info, tracker_warn};

use super::config::BackendConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored plan is malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("stored plan is dated {found}, expected {expected}")]
    WrongDate { expected: String, found: String },
    #[error("background read failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads the stored plan for `date`; `Ok(None)` when the day was never saved.
pub async fn load_day_plan(
    backend: &BackendConfig,
    date: &str,
) -> Result<Option<DayPlan>, LoadError> {
    let loaded = match backend {
        BackendConfig::Local { dir } => {
            let store = FileRecordStore::new(dir.clone());
            let id = date.to_string();
            tokio::task::spawn_blocking(move || {
                store.load_by_id::<DayPlan>(DAY_PLAN_TABLE, &id)
            })
            .await??
        }
        BackendConfig::Hosted { .. } => load_hosted(backend, date).await?,
    };

    match loaded {
        Some(plan) if plan.date != date => {
            let err = LoadError::WrongDate {
                expected: date.to_string(),
                found: plan.date,
            };
            tracker_warn!("Failed to load plan for {}: {}", date, err);
            Err(err)
        }
        Some(plan) => {
            tracker_info!("Loaded stored plan for {}", date);
            Ok(Some(plan))
        }
        None => {
            tracker_info!("No stored plan for {}; starting fresh", date);
            Ok(None)
        }
    }
}

async fn load_hosted(backend: &BackendConfig, date: &str) -> Result<Option<DayPlan>, LoadError> {
    let Some(settings) = backend.backend_settings() else {
        return Ok(None);
    };
    let store = RestRecordStore::new(settings)?;
    let row = store.fetch_by_id(DAY_PLAN_TABLE, date).await?;
    Ok(row.map(serde_json::from_value).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracker_engine::RecordStore;

    fn local(temp: &TempDir) -> BackendConfig {
        BackendConfig::Local {
            dir: temp.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn local_plan_round_trips_through_the_file_store() {
        let temp = TempDir::new().unwrap();
        let mut stored = DayPlan::new("2026-10-15");
        stored.notes = "meal prep sunday".to_string();
        FileRecordStore::new(temp.path())
            .update_by_id(
                DAY_PLAN_TABLE,
                "2026-10-15",
                &serde_json::to_value(&stored).unwrap(),
            )
            .await
            .unwrap();

        let loaded = load_day_plan(&local(&temp), "2026-10-15").await.unwrap();
        assert_eq!(loaded, Some(stored));
    }

    #[tokio::test]
    async fn never_saved_day_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let loaded = load_day_plan(&local(&temp), "2026-10-15").await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn unreadable_plan_is_reported_not_replaced() {
        let temp = TempDir::new().unwrap();
        let table_dir = temp.path().join(DAY_PLAN_TABLE);
        std::fs::create_dir_all(&table_dir).unwrap();
        std::fs::write(table_dir.join("2026-10-15.json"), "{ not json").unwrap();

        let err = load_day_plan(&local(&temp), "2026-10-15")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Serialization(_))), "{err:?}");
    }

    #[tokio::test]
    async fn plan_filed_under_another_date_is_an_error() {
        let temp = TempDir::new().unwrap();
        FileRecordStore::new(temp.path())
            .update_by_id(
                DAY_PLAN_TABLE,
                "2026-10-15",
                &serde_json::to_value(DayPlan::new("2026-10-14")).unwrap(),
            )
            .await
            .unwrap();

        let err = load_day_plan(&local(&temp), "2026-10-15")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::WrongDate { .. }), "{err:?}");
    }
}
