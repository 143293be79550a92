//! Tracker engine: debounced persistence and the record stores behind it.
mod debounce;
mod operation;
mod persist;
mod remote;
mod store;
mod types;

pub use debounce::{
    ConfigError, DebouncedSaver, DebouncedSaverBuilder, DispatchPolicy, DEFAULT_SAVE_DELAY,
};
pub use operation::{save_fn, ChannelEventSink, FnSave, SaveEventSink, SaveOperation};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use remote::{BackendSettings, RestRecordStore};
pub use store::{FileRecordStore, RecordSaver, RecordStore, StoreError};
pub use types::{DispatchId, SaveError, SaveEvent, SaveFailureKind};
