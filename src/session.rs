//! Per-session state
//!
//! A [`Session`] lives from a reset hook to a finalize hook and owns everything
//! that is measured in between. It is handed by `&mut` into each component
//! call, so there is no shared "current section" and no global state.

use tracing::{debug, warn};

use crate::clock::CycleCount;
use crate::error::{Result, TraceError};
use crate::hooks::RegisterSnapshot;
use crate::modulo::{ModuloCollector, ModuloEvent, RetryPolicy};
use crate::report::{assemble, AssemblyInputs, EntitySlot, Report, Selection, ENTITY_SLOTS};
use crate::section::{SectionLabel, SectionPath, SectionTracker};
use crate::tables::LookupTables;
use crate::vblank::VblankLedger;

#[derive(Debug, Clone)]
pub struct Session {
    reset_counter: u32,
    ledger: VblankLedger,
    tracker: SectionTracker,
    modulo: ModuloCollector,
    slots: [Option<EntitySlot>; ENTITY_SLOTS],
    selection: Option<Selection>,
    anomalies: u64,
}

impl Session {
    pub fn new(section_count: u8, retry_policy: RetryPolicy, reset_counter: u32) -> Self {
        Self {
            reset_counter,
            ledger: VblankLedger::new(),
            tracker: SectionTracker::new(section_count),
            modulo: ModuloCollector::new(retry_policy),
            slots: [None; ENTITY_SLOTS],
            selection: None,
            anomalies: 0,
        }
    }

    pub fn on_section(
        &mut self,
        path: SectionPath,
        raw_index: u32,
        cycle: CycleCount,
    ) -> Result<()> {
        let label = self.tracker.label(path, raw_index)?;
        if let Some(change) = self.tracker.on_hook(label, cycle, &self.ledger) {
            self.modulo.on_section_changed(&change);
        }
        Ok(())
    }

    pub fn on_division(&mut self, event: ModuloEvent) {
        self.modulo.on_division(event);
    }

    pub fn on_periodic_start(&mut self, cycle: CycleCount) {
        self.ledger.on_interval_start(cycle);
    }

    pub fn on_periodic_end(&mut self, cycle: CycleCount) -> Result<()> {
        self.ledger.on_interval_end(cycle)
    }

    /// Fill the next free entity slot
    pub fn on_entity(&mut self, regs: RegisterSnapshot, counter: u32) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(TraceError::SlotsExhausted {
                capacity: ENTITY_SLOTS,
            })?;
        *slot = Some(EntitySlot {
            id: regs.r0,
            payload: regs.r1,
            drawn_at: counter,
        });
        Ok(())
    }

    pub fn on_selection(&mut self, identifier: u32, counter: u32) {
        if let Some(previous) = self.selection.replace(Selection {
            identifier,
            counter,
        }) {
            debug!(
                previous = previous.identifier,
                identifier, "selection replaced within session"
            );
        }
    }

    /// Log a recovered anomaly and count it against this session
    ///
    /// A stray periodic end is logged only; it leaves the report unchanged.
    pub fn record_anomaly(&mut self, err: &TraceError) {
        if let TraceError::ProtocolViolation { .. } = err {
            warn!(error = %err, "periodic end ignored");
            return;
        }
        self.anomalies += 1;
        warn!(error = %err, anomalies = self.anomalies, "trace anomaly recovered");
    }

    /// Close the last interval and freeze the report
    pub fn finalize(mut self, cycle: CycleCount, win_streak: u16, tables: &LookupTables) -> Report {
        if let Some(change) = self.tracker.finalize(cycle, &self.ledger) {
            self.modulo.on_section_changed(&change);
        }

        assemble(
            &AssemblyInputs {
                intervals: self.tracker.closed(),
                ledger: &self.ledger,
                histograms: self.modulo.histograms(),
                slots: &self.slots,
                selection: self.selection,
                reset_counter: self.reset_counter,
                win_streak,
                anomalies: self.anomalies,
            },
            tables,
        )
    }

    pub fn current_section(&self) -> Option<SectionLabel> {
        self.tracker.current()
    }

    pub fn closed_count(&self) -> usize {
        self.tracker.closed().len()
    }

    pub fn ledger(&self) -> &VblankLedger {
        &self.ledger
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }
}
