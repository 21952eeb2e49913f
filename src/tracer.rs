//! Hook event dispatch
//!
//! [`Tracer`] is the entry point the host calls into. It resolves hook
//! addresses to kinds, keeps the cycle clock honest, and routes each event to
//! the active [`Session`]. Events are delivered one at a time and each handler
//! runs to completion; `&mut self` on every entry point rules out re-entry.

use tracing::{debug, info, trace, warn};

use crate::clock::{CycleClock, CycleCount, Host};
use crate::config::{ConfigError, TraceConfig};
use crate::encode::{encode, WireFormat};
use crate::error::Result;
use crate::hooks::{HookKind, HookRegistry, RegisterSnapshot};
use crate::modulo::{ModuloEvent, RetryPolicy};
use crate::outbox::Outbox;
use crate::report::Report;
use crate::section::{SectionLabel, SectionPath};
use crate::session::Session;
use crate::tables::LookupTables;

#[derive(Debug)]
pub struct Tracer {
    registry: HookRegistry,
    section_count: u8,
    retry_policy: RetryPolicy,
    wire_format: WireFormat,
    tables: LookupTables,
    clock: CycleClock,
    session: Option<Session>,
    outbox: Outbox,
    completed: u64,
}

impl Tracer {
    /// Build a tracer from configuration
    pub fn new(config: &TraceConfig) -> std::result::Result<Self, ConfigError> {
        let registry = config.registry()?;
        let outbox = match config.outbox_capacity {
            Some(capacity) => Outbox::bounded(capacity),
            None => Outbox::new(),
        };

        debug!(hooks = registry.len(), "tracer configured");

        Ok(Self {
            registry,
            section_count: config.section_count,
            retry_policy: config.retry_policy,
            wire_format: config.wire_format,
            tables: config.tables.clone(),
            clock: CycleClock::new(),
            session: None,
            outbox,
            completed: 0,
        })
    }

    /// Handle a hook fire
    ///
    /// Returns the frozen report when the hook finalizes a session.
    pub fn on_hook<H: Host + ?Sized>(
        &mut self,
        address: u32,
        regs: RegisterSnapshot,
        cycle_now: CycleCount,
        host: &H,
    ) -> Option<Report> {
        let Some(kind) = self.registry.resolve(address) else {
            trace!(address, "unregistered hook address ignored");
            return None;
        };

        match kind {
            HookKind::SessionReset => {
                self.clock.restart(cycle_now);
                self.begin_session(host);
            }
            HookKind::SessionFinalize => {
                let cycle = self.observe_cycle(cycle_now);
                return self.finalize_session(cycle, host);
            }
            HookKind::SectionOpen => {
                let cycle = self.observe_cycle(cycle_now);
                self.in_session(kind, |s| s.on_section(SectionPath::Open, regs.r0, cycle));
            }
            HookKind::SectionPost => {
                let cycle = self.observe_cycle(cycle_now);
                self.in_session(kind, |s| s.on_section(SectionPath::Post, regs.r0, cycle));
            }
            HookKind::DivisionOp { signed } => {
                self.in_session(kind, |s| {
                    s.on_division(ModuloEvent::from_registers(regs, signed));
                    Ok(())
                });
            }
            HookKind::PeriodicStart => self.on_periodic_start(cycle_now),
            HookKind::PeriodicEnd => self.on_periodic_end(cycle_now),
            HookKind::EntityGenerated => {
                let counter = host.read_counter();
                self.in_session(kind, |s| s.on_entity(regs, counter));
            }
            HookKind::SelectionMade => {
                let counter = host.read_counter();
                self.in_session(kind, |s| {
                    s.on_selection(regs.r0, counter);
                    Ok(())
                });
            }
        }
        None
    }

    /// Display-refresh interrupt entered
    pub fn on_periodic_start(&mut self, cycle_now: CycleCount) {
        let cycle = self.observe_cycle(cycle_now);
        self.in_session(HookKind::PeriodicStart, |s| {
            s.on_periodic_start(cycle);
            Ok(())
        });
    }

    /// Display-refresh interrupt left
    pub fn on_periodic_end(&mut self, cycle_now: CycleCount) {
        let cycle = self.observe_cycle(cycle_now);
        self.in_session(HookKind::PeriodicEnd, |s| s.on_periodic_end(cycle));
    }

    fn begin_session<H: Host + ?Sized>(&mut self, host: &H) {
        if let Some(discarded) = self.session.take() {
            info!(
                closed_intervals = discarded.closed_count(),
                "session reset before finalize; in-progress report discarded"
            );
        }
        let counter = host.read_counter();
        self.session = Some(Session::new(self.section_count, self.retry_policy, counter));
        debug!(counter, "session started");
    }

    fn finalize_session<H: Host + ?Sized>(
        &mut self,
        cycle: CycleCount,
        host: &H,
    ) -> Option<Report> {
        let Some(session) = self.session.take() else {
            debug!("finalize without an active session ignored");
            return None;
        };

        let report = session.finalize(cycle, host.read_win_streak(), &self.tables);
        match encode(&report, self.wire_format) {
            Ok(text) => {
                let sequence = self.outbox.enqueue(text);
                debug!(sequence, "report queued for transport");
            }
            Err(e) => warn!(error = %e, "report encoding failed; not queued"),
        }

        self.completed += 1;
        info!(
            intervals = report.intervals().len(),
            retries = report.retry_count(),
            vblanks = report.vblanks().len(),
            anomalies = report.anomalies(),
            "session finalized"
        );
        Some(report)
    }

    fn in_session(&mut self, kind: HookKind, handler: impl FnOnce(&mut Session) -> Result<()>) {
        match self.session.as_mut() {
            Some(session) => {
                if let Err(err) = handler(session) {
                    session.record_anomaly(&err);
                }
            }
            None => trace!(?kind, "hook outside a session ignored"),
        }
    }

    /// Accept a cycle stamp, clamping regressions to the latest value
    fn observe_cycle(&mut self, cycle_now: CycleCount) -> CycleCount {
        match self.clock.observe(cycle_now) {
            Ok(cycle) => cycle,
            Err(err) => {
                match self.session.as_mut() {
                    Some(session) => session.record_anomaly(&err),
                    None => trace!(error = %err, "cycle regression outside a session"),
                }
                self.clock.latest().unwrap_or(cycle_now)
            }
        }
    }

    /// Cycles since the last vblank boundary of the active session
    pub fn cycles_since_boundary(&self) -> Option<u64> {
        let now = self.clock.latest()?;
        self.session.as_ref()?.ledger().cycles_since_boundary(now)
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_section(&self) -> Option<SectionLabel> {
        self.session.as_ref()?.current_section()
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    /// Number of sessions finalized so far
    pub fn completed(&self) -> u64 {
        self.completed
    }
}
