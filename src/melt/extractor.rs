//! Schema-directed row extraction
//!
//! The melter never infers anything: the loaded schema decides which elements
//! are rows and which of their children are columns. Everything else is
//! dropped as it streams past.
//!
//! Only matched elements that are still open hold anything: the declared
//! cells seen so far and a [`SpillBuffer`] for the statements of matched
//! descendants. A statement is written when its element closes, after the
//! statement of the nearest open matched ancestor, so the output follows the
//! order in which elements start.

use crate::melt::plan::MeltPlan;
use crate::melt::writer::{InsertWriter, SpillBuffer};
use crate::types::{Row, Schema};
use crate::walker::{Child, WalkEvent};
use serde::Serialize;
use std::io::{self, Write};

/// In-memory budget of one element's held-back statements
pub const DEFAULT_SPILL_LIMIT: usize = 8 * 1024 * 1024;

/// Aggregate counts collected while extracting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MeltStats {
    /// Start tags seen
    pub elements: u64,
    /// Elements whose tag resolved to a declared table
    pub matched: u64,
    /// Statements produced
    pub rows: u64,
    /// Children of matched elements that are not declared columns
    pub dropped_children: u64,
}

/// A matched element that has not closed yet
struct OpenRow {
    plan_id: usize,
    row: Row,
    spill: SpillBuffer,
}

/// Extracts rows from walk events using a pre-computed plan
pub struct PlannedMelter {
    plan: MeltPlan,
    /// One entry per open element, `None` when its tag matches no table
    open: Vec<Option<OpenRow>>,
    spill_limit: usize,
    stats: MeltStats,
}

impl PlannedMelter {
    pub fn new(plan: MeltPlan) -> Self {
        Self::with_spill_limit(plan, DEFAULT_SPILL_LIMIT)
    }

    pub fn with_spill_limit(plan: MeltPlan, spill_limit: usize) -> Self {
        PlannedMelter {
            plan,
            open: Vec::new(),
            spill_limit,
            stats: MeltStats::default(),
        }
    }

    pub fn from_schema(schema: &Schema) -> Self {
        Self::new(MeltPlan::from_schema(schema))
    }

    pub fn stats(&self) -> MeltStats {
        self.stats
    }

    /// Cells held for matched elements that are still open
    pub fn pending_cells(&self) -> usize {
        self.open
            .iter()
            .flatten()
            .map(|open| open.row.cells.len())
            .sum()
    }

    /// Feed one walk event, writing every statement that is ready
    pub fn melt<W: Write>(
        &mut self,
        event: WalkEvent,
        writer: &mut InsertWriter<W>,
    ) -> io::Result<()> {
        match event {
            WalkEvent::Start { name } => self.start(&name),
            WalkEvent::Child { child, .. } => self.child(child),
            WalkEvent::End { .. } => self.end(writer)?,
        }
        Ok(())
    }

    fn start(&mut self, tag: &str) {
        self.stats.elements += 1;

        let open = match self.plan.lookup(tag) {
            Some(plan_id) => {
                self.stats.matched += 1;
                Some(OpenRow {
                    plan_id,
                    row: Row::new(self.plan.table_plan(plan_id).table.as_str()),
                    spill: SpillBuffer::new(self.spill_limit),
                })
            }
            None => None,
        };
        self.open.push(open);
    }

    /// A direct child of the innermost open element
    fn child(&mut self, child: Child) {
        let Some(Some(open)) = self.open.last_mut() else {
            return;
        };
        if !self.plan.table_plan(open.plan_id).has_column(&child.name) {
            self.stats.dropped_children += 1;
            return;
        }

        let value = child
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        open.row.push(child.name, value);
    }

    fn end<W: Write>(&mut self, writer: &mut InsertWriter<W>) -> io::Result<()> {
        let Some(Some(OpenRow { row, spill, .. })) = self.open.pop() else {
            return Ok(());
        };

        // A matched element without declared children writes nothing itself,
        // but its descendants' statements still go out in place.
        let statement = (!row.is_empty()).then(|| row.to_insert_statement());
        if statement.is_some() {
            self.stats.rows += 1;
        }

        match self.open.iter_mut().rev().find_map(Option::as_mut) {
            Some(ancestor) => {
                if let Some(statement) = &statement {
                    ancestor.spill.push_statement(statement)?;
                }
                ancestor.spill.absorb(spill)
            }
            None => {
                if let Some(statement) = &statement {
                    writer.write_statement(statement)?;
                }
                writer.write_spill(spill)
            }
        }
    }
}
