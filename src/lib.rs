//! cycletrace - hook-driven section timing for deterministic emulated hosts
//!
//! The host fires entry hooks at known code locations with a register snapshot
//! and a cycle count. This library turns that stream into a per-session
//! report: section intervals with vblank time netted out, per-section division
//! histograms, generated-entity slots and derived frame counts.

pub mod cli;
pub mod clock;
pub mod config;
pub mod encode;
pub mod error;
pub mod hooks;
pub mod modulo;
pub mod outbox;
pub mod replay;
pub mod report;
pub mod section;
pub mod session;
pub mod summary;
pub mod tables;
pub mod tracer;
pub mod vblank;

pub use clock::{CycleCount, Host, SnapshotHost};
pub use config::TraceConfig;
pub use error::TraceError;
pub use hooks::{HookKind, RegisterSnapshot};
pub use report::Report;
pub use tracer::Tracer;
