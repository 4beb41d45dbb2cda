//! Phase deadlines, planned backwards from a project's due date.
//!
//! Phases run writing → writing QC → design → design QC. Writing and design
//! time scale with priority; QC time does not, but is squeezed (down to a
//! minimum) when the due date is too close for the full plan.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use staffline_core::{Priority, Time};
use tracing::{debug, warn};

/// Day allocations used by [`DeadlinePlanner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Writing days at normal priority
    pub writing_base_days: u32,
    /// Writing QC days
    pub writing_qc_days: u32,
    /// Design days at normal priority
    pub design_base_days: u32,
    /// Design QC days
    pub design_qc_days: u32,
    /// Floor for a squeezed QC phase
    pub min_qc_days: u32,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            writing_base_days: 7,
            writing_qc_days: 3,
            design_base_days: 5,
            design_qc_days: 3,
            min_qc_days: 1,
        }
    }
}

/// The deadline of every phase, with the day counts behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDeadlines {
    /// Final due date (also the design QC deadline)
    pub due: Time,
    /// Writing must be done by
    pub writing: Time,
    /// Writing QC must be done by
    pub writing_qc: Time,
    /// Design must be done by
    pub design: Time,
    /// Design QC must be done by
    pub design_qc: Time,
    /// Days given to writing
    pub writing_days: u32,
    /// Days given to writing QC
    pub writing_qc_days: u32,
    /// Days given to design
    pub design_days: u32,
    /// Days given to design QC
    pub design_qc_days: u32,
    /// Sum of all phase days
    pub total_days: u32,
}

/// Plans phase deadlines.
#[derive(Debug, Clone, Default)]
pub struct DeadlinePlanner {
    config: DeadlineConfig,
}

/// Writing/design time as a percentage of the base allocation.
fn priority_percent(priority: Priority) -> u32 {
    match priority {
        Priority::High => 80,
        Priority::Low => 120,
        Priority::Medium | Priority::None => 100,
    }
}

impl DeadlinePlanner {
    /// Create a planner with custom allocations.
    pub fn new(config: DeadlineConfig) -> Self {
        Self { config }
    }

    /// Plan backwards from `due`, counting available days from `now`.
    pub fn plan(
        &self,
        due: Time,
        priority: Priority,
        needs_writer: bool,
        needs_designer: bool,
        now: Time,
    ) -> PhaseDeadlines {
        let c = &self.config;
        let pct = priority_percent(priority);
        let writing_days = if needs_writer { c.writing_base_days * pct / 100 } else { 0 };
        let design_days = if needs_designer { c.design_base_days * pct / 100 } else { 0 };
        let mut writing_qc_days = if needs_writer { c.writing_qc_days } else { 0 };
        let mut design_qc_days = if needs_designer { c.design_qc_days } else { 0 };

        let needed = writing_days + writing_qc_days + design_days + design_qc_days;
        let available = (due - now).num_days();
        if available < needed as i64 {
            warn!(needed, available, "Not enough time for the full plan; squeezing QC");
            (writing_qc_days, design_qc_days) =
                self.squeeze_qc(available, writing_days + design_days, needs_writer, needs_designer);
        }

        let days = |n: u32| Duration::days(n as i64);
        let design_qc = due;
        let design = if needs_designer { design_qc - days(design_qc_days) } else { due };
        let writing_qc = if needs_designer { design - days(design_days) } else { design };
        let writing = if needs_writer { writing_qc - days(writing_qc_days) } else { writing_qc };

        let plan = PhaseDeadlines {
            due,
            writing,
            writing_qc,
            design,
            design_qc,
            writing_days,
            writing_qc_days,
            design_days,
            design_qc_days,
            total_days: writing_days + writing_qc_days + design_days + design_qc_days,
        };
        debug!(writing = %plan.writing, design = %plan.design, total_days = plan.total_days, "Planned deadlines");
        plan
    }

    fn squeeze_qc(&self, available: i64, core_days: u32, needs_writer: bool, needs_designer: bool) -> (u32, u32) {
        let c = &self.config;
        let floor = |needed: bool| if needed { c.min_qc_days } else { 0 };

        let qc_available = available - core_days as i64;
        if qc_available < 0 {
            warn!(core_days, available, "Not enough time even for writing and design");
            return (floor(needs_writer), floor(needs_designer));
        }
        let qc_available = qc_available as u32;

        match (needs_writer, needs_designer) {
            (true, true) => {
                let writing_qc = c.writing_qc_days.min(qc_available / 2);
                let design_qc = c.design_qc_days.min(qc_available - writing_qc);
                (writing_qc.max(c.min_qc_days), design_qc.max(c.min_qc_days))
            }
            (true, false) => (c.writing_qc_days.min(qc_available).max(c.min_qc_days), 0),
            (false, true) => (0, c.design_qc_days.min(qc_available).max(c.min_qc_days)),
            (false, false) => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Time {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn planner() -> DeadlinePlanner {
        DeadlinePlanner::default()
    }

    #[test]
    fn test_full_plan_when_time_allows() {
        let due = now() + Duration::days(30);
        let plan = planner().plan(due, Priority::Medium, true, true, now());

        assert_eq!(
            (plan.writing_days, plan.writing_qc_days, plan.design_days, plan.design_qc_days),
            (7, 3, 5, 3)
        );
        assert_eq!(plan.total_days, 18);
        assert_eq!(plan.design_qc, due);
        assert_eq!(plan.design, due - Duration::days(3));
        assert_eq!(plan.writing_qc, due - Duration::days(8));
        assert_eq!(plan.writing, due - Duration::days(11));
    }

    #[test]
    fn test_priority_scales_core_work_only() {
        let due = now() + Duration::days(30);
        let high = planner().plan(due, Priority::High, true, true, now());
        assert_eq!((high.writing_days, high.design_days), (5, 4));
        assert_eq!((high.writing_qc_days, high.design_qc_days), (3, 3));

        let low = planner().plan(due, Priority::Low, true, true, now());
        assert_eq!((low.writing_days, low.design_days), (8, 6));
    }

    #[test]
    fn test_short_deadline_squeezes_qc() {
        // 12 core days + 3 spare for QC.
        let plan = planner().plan(now() + Duration::days(15), Priority::None, true, true, now());
        assert_eq!((plan.writing_qc_days, plan.design_qc_days), (1, 2));
        assert_eq!(plan.total_days, 15);
    }

    #[test]
    fn test_impossible_deadline_keeps_minimum_qc() {
        let plan = planner().plan(now() + Duration::days(5), Priority::Medium, true, true, now());
        assert_eq!((plan.writing_qc_days, plan.design_qc_days), (1, 1));
        assert_eq!(plan.writing_days, 7);
    }

    #[test]
    fn test_custom_allocations() {
        let planner = DeadlinePlanner::new(DeadlineConfig {
            writing_base_days: 10,
            writing_qc_days: 2,
            design_base_days: 4,
            design_qc_days: 2,
            min_qc_days: 1,
        });
        let due = now() + Duration::days(30);

        let plan = planner.plan(due, Priority::Medium, true, true, now());
        assert_eq!(
            (plan.writing_days, plan.writing_qc_days, plan.design_days, plan.design_qc_days),
            (10, 2, 4, 2)
        );
        assert_eq!(plan.writing, due - Duration::days(8));

        let high = planner.plan(due, Priority::High, true, true, now());
        assert_eq!((high.writing_days, high.design_days), (8, 3));
    }

    #[test]
    fn test_writer_only_project() {
        let due = now() + Duration::days(20);
        let plan = planner().plan(due, Priority::Medium, true, false, now());
        assert_eq!((plan.design_days, plan.design_qc_days), (0, 0));
        assert_eq!(plan.design, due);
        assert_eq!(plan.writing_qc, due);
        assert_eq!(plan.writing, due - Duration::days(3));
        assert_eq!(plan.total_days, 10);
    }
}
