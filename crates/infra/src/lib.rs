//! Infrastructure layer: product store, event log, ledger engine, audit.

pub mod audit;
pub mod clock;
pub mod config;
pub mod event_log;
pub mod ledger;
pub mod locks;
pub mod product_store;


pub use audit::{AuditFinding, AuditReport, FindingKind, verify_ledger};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use event_log::{
    EventLog, EventLogError, FileEventLog, InMemoryEventLog, StoredEvent, UncommittedEvent,
};
pub use ledger::{Ledger, LedgerEnvelope};
pub use product_store::{InMemoryProductStore, ProductStore, StoreError};

/// A ledger persisted to a JSON-lines file, rebuilt in memory on open.
pub type FileLedger = Ledger<InMemoryProductStore, FileEventLog>;

/// Open the file-backed ledger described by `config`.
pub fn open_file_ledger(config: &LedgerConfig) -> supplychain_core::LedgerResult<FileLedger> {
    let log = FileEventLog::open(&config.event_log_path, config.sync_writes)?;
    Ledger::recover(InMemoryProductStore::new(), log)
}
