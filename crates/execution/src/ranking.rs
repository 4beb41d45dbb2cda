//! Candidate ranking.
//!
//! For one project slot the engine filters the resources with the slot's
//! role and orders the survivors best-first:
//!
//! ```text
//! score = skill_weight    * skill grade      (exact 1.0, ANY 0.5)
//!       + kpi_weight      * kpi
//!       + workload_weight * headroom         (limit - workload)
//!       + platform_weight * platform tier    ((n - index) / n)
//! ```
//!
//! Resources that are unavailable, marked do-not-assign, do not cover the
//! project topic, or are at their workload limit never appear. Equal scores
//! are ordered by resource ID so the result is reproducible.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use staffline_core::{Priority, Project, Resource, ResourceId, Role, SkillMatch, Slot};

use crate::config::RankingWeights;

/// A resource that passed every exclusion filter, with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// The resource
    pub resource_id: ResourceId,
    /// Total weighted score
    pub score: f64,
    /// Skill grade that went into the score
    pub skill_grade: f64,
    /// Open slots below the workload limit
    pub headroom: u32,
}

/// Scores and orders candidate resources.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    weights: RankingWeights,
    platforms: Vec<String>,
}

impl RankingEngine {
    /// Create an engine with the given weights and platform order (best first).
    pub fn new(weights: RankingWeights, platforms: Vec<String>) -> Self {
        Self { weights, platforms }
    }

    /// Workload limit for `resource` when staffing a project of `priority`.
    ///
    /// High-priority projects may use the full declared capacity; other
    /// projects leave `ceil(max_workload * priority_boost)` slots free.
    pub fn workload_limit(&self, resource: &Resource, priority: Priority) -> u32 {
        if priority.is_high() {
            return resource.max_workload;
        }
        let reserve = (resource.max_workload as f64 * self.weights.priority_boost).ceil() as u32;
        resource.max_workload.saturating_sub(reserve)
    }

    /// Whether `resource` can take one more assignment for `project`.
    pub fn can_take(&self, resource: &Resource, project: &Project) -> bool {
        resource.available && resource.has_room(self.workload_limit(resource, project.priority))
    }

    fn platform_tier(&self, resource: &Resource) -> f64 {
        let Some(platform) = resource.platform.as_deref() else {
            return 0.0;
        };
        let n = self.platforms.len();
        self.platforms
            .iter()
            .position(|p| p.eq_ignore_ascii_case(platform.trim()))
            .map(|i| (n - i) as f64 / n as f64)
            .unwrap_or(0.0)
    }

    /// Score one resource for a slot, or `None` if it is excluded.
    pub fn score(&self, project: &Project, slot: Slot, resource: &Resource) -> Option<Candidate> {
        if resource.role != slot.role() || !self.can_take(resource, project) {
            return None;
        }
        let skill = resource.skill_match(&project.topic);
        if skill == SkillMatch::None {
            return None;
        }

        let limit = self.workload_limit(resource, project.priority);
        let headroom = limit - resource.workload;
        let w = &self.weights;
        let score = w.skill_weight * skill.grade()
            + w.kpi_weight * resource.kpi
            + w.workload_weight * headroom as f64
            + w.platform_weight * self.platform_tier(resource);

        Some(Candidate {
            resource_id: resource.id.clone(),
            score,
            skill_grade: skill.grade(),
            headroom,
        })
    }

    /// Rank `resources` for one slot of `project`, best first.
    ///
    /// Resources listed in `exclude` are skipped. An empty result is a
    /// normal outcome.
    pub fn rank(
        &self,
        project: &Project,
        slot: Slot,
        resources: &[Resource],
        exclude: &HashSet<ResourceId>,
    ) -> Vec<Candidate> {
        let mut ranked: Vec<_> = resources
            .iter()
            .filter(|r| !exclude.contains(&r.id))
            .filter_map(|r| self.score(project, slot, r))
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });
        ranked
    }

    /// Choose one distinct resource per slot, in slot order.
    ///
    /// Returns the first slot that could not be filled as the error.
    pub fn pick(
        &self,
        project: &Project,
        slots: &[Slot],
        pools: &HashMap<Role, Vec<Resource>>,
        exclude: &HashSet<ResourceId>,
    ) -> Result<BTreeMap<Slot, ResourceId>, Slot> {
        let mut taken = exclude.clone();
        let mut picks = BTreeMap::new();
        for &slot in slots {
            let pool = pools.get(&slot.role()).map(Vec::as_slice).unwrap_or(&[]);
            let best = self
                .rank(project, slot, pool, &taken)
                .into_iter()
                .next()
                .ok_or(slot)?;
            taken.insert(best.resource_id.clone());
            picks.insert(slot, best.resource_id);
        }
        Ok(picks)
    }

    /// Top `top_n` candidates for every required slot, without committing.
    pub fn recommend(
        &self,
        project: &Project,
        pools: &HashMap<Role, Vec<Resource>>,
        top_n: usize,
    ) -> BTreeMap<Slot, Vec<Candidate>> {
        let none = HashSet::new();
        project
            .required_slots()
            .into_iter()
            .map(|slot| {
                let pool = pools.get(&slot.role()).map(Vec::as_slice).unwrap_or(&[]);
                let mut ranked = self.rank(project, slot, pool, &none);
                ranked.truncate(top_n);
                (slot, ranked)
            })
            .collect()
    }
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(RankingWeights::default(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffline_core::ProjectId;

    fn rid(name: &str) -> ResourceId {
        ResourceId::new(name).unwrap()
    }

    fn science_project() -> Project {
        let mut p = Project::new(ProjectId::from_number(1).unwrap(), "Science");
        p.ready_to_assign = true;
        p
    }

    fn writer(name: &str, kpi: f64, workload: u32, cap: u32, skills: &[&str]) -> Resource {
        Resource::new(rid(name), Role::Writer, cap)
            .with_kpi(kpi)
            .with_workload(workload)
            .with_skills(skills.iter().copied())
    }

    fn engine(kpi_weight: f64, workload_weight: f64) -> RankingEngine {
        RankingEngine::new(
            RankingWeights::default().with_kpi_and_workload(kpi_weight, workload_weight),
            Vec::new(),
        )
    }

    fn top(engine: &RankingEngine, project: &Project, pool: &[Resource]) -> Option<String> {
        engine
            .rank(project, Slot::Writer, pool, &HashSet::new())
            .first()
            .map(|c| c.resource_id.to_string())
    }

    #[test]
    fn test_workload_heavy_weights_prefer_idle_writer() {
        let pool = [
            writer("W1", 9.0, 2, 3, &["Science"]),
            writer("W2", 7.0, 0, 3, &["Science"]),
        ];
        assert_eq!(top(&engine(1.0, 2.0), &science_project(), &pool).as_deref(), Some("W2"));
    }

    #[test]
    fn test_kpi_heavy_weights_prefer_strong_writer() {
        let pool = [
            writer("W1", 9.0, 2, 3, &["Science"]),
            writer("W2", 7.0, 0, 3, &["Science"]),
        ];
        assert_eq!(top(&engine(2.0, 1.0), &science_project(), &pool).as_deref(), Some("W1"));
    }

    #[test]
    fn test_non_matching_skills_are_excluded_not_penalized() {
        let pool = [
            writer("W1", 100.0, 0, 3, &["Art"]),
            writer("W2", 1.0, 0, 3, &["Science"]),
        ];
        let ranked = engine(1.0, 1.0).rank(&science_project(), Slot::Writer, &pool, &HashSet::new());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].resource_id, rid("W2"));
    }

    #[test]
    fn test_no_match_gives_empty_list() {
        let pool = [writer("W1", 5.0, 0, 3, &["Art"])];
        assert!(engine(1.0, 1.0)
            .rank(&science_project(), Slot::Writer, &pool, &HashSet::new())
            .is_empty());
    }

    #[test]
    fn test_wildcard_ranks_below_specialist() {
        let pool = [
            writer("W1", 5.0, 0, 3, &["ANY"]),
            writer("W2", 5.0, 0, 3, &["Science"]),
        ];
        let ranked = engine(1.0, 1.0).rank(&science_project(), Slot::Writer, &pool, &HashSet::new());
        assert_eq!(ranked[0].resource_id, rid("W2"));
        assert_eq!(ranked[1].skill_grade, 0.5);
    }

    #[test]
    fn test_full_unavailable_and_blocked_are_excluded() {
        let mut away = writer("W3", 9.0, 0, 3, &["Science"]);
        away.available = false;
        let pool = [
            writer("W1", 9.0, 3, 3, &["Science"]),
            writer("W2", 9.0, 0, 3, &["Science", "DO NOT ASSIGN"]),
            away,
            Resource::new(rid("D1"), Role::Designer, 3).with_skills(["Science"]),
        ];
        assert!(engine(1.0, 1.0)
            .rank(&science_project(), Slot::Writer, &pool, &HashSet::new())
            .is_empty());
    }

    #[test]
    fn test_ties_break_by_resource_id() {
        let pool = [
            writer("W3", 5.0, 1, 3, &["Science"]),
            writer("W1", 5.0, 1, 3, &["Science"]),
            writer("W2", 5.0, 1, 3, &["Science"]),
        ];
        let e = engine(1.0, 1.0);
        let first: Vec<_> = e
            .rank(&science_project(), Slot::Writer, &pool, &HashSet::new())
            .into_iter()
            .map(|c| c.resource_id.to_string())
            .collect();
        assert_eq!(first, vec!["W1", "W2", "W3"]);

        let mut reversed = pool.to_vec();
        reversed.reverse();
        let second: Vec<_> = e
            .rank(&science_project(), Slot::Writer, &reversed, &HashSet::new())
            .into_iter()
            .map(|c| c.resource_id.to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_priority_boost_reserves_capacity_for_high_priority() {
        let e = RankingEngine::new(RankingWeights::default().with_priority_boost(0.25), Vec::new());
        let busy = writer("W1", 5.0, 3, 4, &["Science"]);

        let mut normal = science_project();
        normal.priority = Priority::Medium;
        assert_eq!(e.workload_limit(&busy, normal.priority), 3);
        assert!(e.score(&normal, Slot::Writer, &busy).is_none());

        let mut urgent = science_project();
        urgent.priority = Priority::High;
        assert_eq!(e.workload_limit(&busy, urgent.priority), 4);
        let c = e.score(&urgent, Slot::Writer, &busy).unwrap();
        assert_eq!(c.headroom, 1);

        let full = writer("W2", 5.0, 4, 4, &["Science"]);
        assert!(e.score(&urgent, Slot::Writer, &full).is_none());
    }

    #[test]
    fn test_high_priority_still_requires_matching_skill() {
        let e = RankingEngine::new(RankingWeights::default().with_priority_boost(0.25), Vec::new());
        let mut urgent = science_project();
        urgent.priority = Priority::High;
        let idle_outsider = writer("W1", 9.0, 0, 3, &["Art"]);

        assert_eq!(e.workload_limit(&idle_outsider, urgent.priority), 3);
        assert!(e.score(&urgent, Slot::Writer, &idle_outsider).is_none());
        assert!(e
            .rank(&urgent, Slot::Writer, &[idle_outsider], &HashSet::new())
            .is_empty());
    }

    #[test]
    fn test_platform_tier_bonus() {
        let weights = RankingWeights {
            platform_weight: 4.0,
            ..RankingWeights::default()
        };
        let e = RankingEngine::new(weights, vec!["Adobe".into(), "Figma".into()]);
        let mut project = science_project();
        project.topic.clear();

        let adobe = Resource::new(rid("D1"), Role::Designer, 3).with_platform("adobe");
        let figma = Resource::new(rid("D2"), Role::Designer, 3).with_platform("Figma");
        let other = Resource::new(rid("D0"), Role::Designer, 3).with_platform("Paint");

        let ranked = e.rank(&project, Slot::Designer, &[other, figma, adobe], &HashSet::new());
        let order: Vec<_> = ranked.iter().map(|c| c.resource_id.as_str()).collect();
        assert_eq!(order, vec!["D1", "D2", "D0"]);
        assert_eq!(ranked[0].score - ranked[2].score, 4.0);
    }

    #[test]
    fn test_pick_uses_distinct_controllers() {
        let mut project = science_project();
        project.needs_designer = true;
        let controllers = vec![
            Resource::new(rid("C1"), Role::Controller, 3).with_skills(["ANY"]).with_kpi(9.0),
            Resource::new(rid("C2"), Role::Controller, 3).with_skills(["ANY"]).with_kpi(5.0),
        ];
        let pools = HashMap::from([(Role::Controller, controllers)]);
        let picks = engine(1.0, 1.0)
            .pick(&project, &[Slot::WriterReview, Slot::DesignReview], &pools, &HashSet::new())
            .unwrap();
        assert_eq!(picks[&Slot::WriterReview], rid("C1"));
        assert_eq!(picks[&Slot::DesignReview], rid("C2"));
    }

    #[test]
    fn test_pick_reports_unfillable_slot() {
        let project = science_project();
        let pools = HashMap::from([(Role::Writer, vec![writer("W1", 5.0, 0, 3, &["Science"])])]);
        let err = engine(1.0, 1.0)
            .pick(&project, &[Slot::Writer, Slot::Designer], &pools, &HashSet::new())
            .unwrap_err();
        assert_eq!(err, Slot::Designer);
    }

    #[test]
    fn test_recommend_truncates_per_slot() {
        let mut project = science_project();
        project.needs_designer = false;
        let pools = HashMap::from([
            (
                Role::Writer,
                vec![
                    writer("W1", 5.0, 0, 3, &["Science"]),
                    writer("W2", 6.0, 0, 3, &["Science"]),
                    writer("W3", 7.0, 0, 3, &["Science"]),
                ],
            ),
            (Role::Controller, vec![Resource::new(rid("C1"), Role::Controller, 2).with_skills(["ANY"])]),
        ]);
        let recs = engine(1.0, 1.0).recommend(&project, &pools, 2);
        assert_eq!(recs.len(), 2);
        let writers: Vec<_> = recs[&Slot::Writer].iter().map(|c| c.resource_id.as_str()).collect();
        assert_eq!(writers, vec!["W3", "W2"]);
        assert_eq!(recs[&Slot::WriterReview].len(), 1);
    }
}
