//! `gstrecon`: GST invoice reconciliation engine.
//!
//! Matches a buyer's purchase register (CIS) against the supplier-reported
//! GSTR-2B statement through eight progressively looser layers, and explains
//! every match in an append-only audit log.
//!
//! Pure engine crate: receives materialized tables and a resolved column
//! mapping, returns annotated tables. No CLI or IO dependencies.

pub mod aggregate;
pub mod assemble;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod fuzzy;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod records;
pub mod reverse;
pub mod session;

pub use audit::AuditEntry;
pub use config::{ColumnNames, FieldMapping, ReconConfig};
pub use engine::{run, run_with_progress};
pub use error::ReconError;
pub use model::{Layer, Ledger, LedgerTable, MatchStatus, ReconInput, ReconResult};
