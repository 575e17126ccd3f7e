//! Integer-program formulation and solve.
//!
//! One integer decision variable per activity (its run count), a linear
//! objective over AP costs, and one coverage constraint per objective. The
//! solver returns the exact optimum; run counts are integral by
//! construction.

use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, constraint, default_solver,
    variable, variables,
};
use thiserror::Error;
use tracing::debug;

use farm_core::{QuestRecord, TraitQuery, TraitSignature};

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solver rejected the model: {0}")]
    Backend(String),
}

/// Outcome of one optimization run.
///
/// "Nothing to do" and "cannot be done" are deliberately distinct variants;
/// callers must not treat an empty plan as covering both.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanOutcome {
    /// No objectives are active: the empty plan at zero cost.
    NothingRequired,
    /// A cost-minimal assignment covering every objective.
    Plan(FarmPlan),
    /// At least one objective that no known activity contributes to.
    Infeasible { uncovered: Vec<TraitSignature> },
}

/// A solved assignment: activities with positive run counts only.
#[derive(Clone, Debug, PartialEq)]
pub struct FarmPlan {
    pub entries: Vec<PlanEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanEntry {
    pub quest: QuestRecord,
    pub runs: u64,
}

impl FarmPlan {
    pub fn total_cost(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| entry.quest.ap_cost * entry.runs)
            .sum()
    }

    /// Kills the plan accumulates toward one objective.
    pub fn covered_count(&self, signature: &TraitSignature) -> u64 {
        self.entries
            .iter()
            .map(|entry| entry.quest.matched_count(signature) * entry.runs)
            .sum()
    }
}

/// Solve for the cheapest run counts covering every objective.
///
/// Expects the pruned record list from the index; activities contributing
/// to nothing would only enlarge the model.
pub fn optimize(quests: &[QuestRecord], queries: &[TraitQuery]) -> Result<PlanOutcome, SolveError> {
    if queries.is_empty() {
        return Ok(PlanOutcome::NothingRequired);
    }

    // An objective with zero coverage everywhere makes the program
    // infeasible; report those signatures instead of solving.
    let uncovered: Vec<TraitSignature> = queries
        .iter()
        .filter(|query| {
            quests
                .iter()
                .all(|quest| quest.matched_count(&query.signature) == 0)
        })
        .map(|query| query.signature.clone())
        .collect();
    if !uncovered.is_empty() {
        return Ok(PlanOutcome::Infeasible { uncovered });
    }

    let mut problem = variables!();
    let runs: Vec<Variable> = quests
        .iter()
        .map(|_| problem.add(variable().integer().min(0)))
        .collect();

    let total_cost: Expression = quests
        .iter()
        .zip(&runs)
        .map(|(quest, run)| *run * quest.ap_cost as f64)
        .sum();

    let mut model = problem.minimise(total_cost).using(default_solver);
    for query in queries {
        let coverage: Expression = quests
            .iter()
            .zip(&runs)
            .map(|(quest, run)| *run * quest.matched_count(&query.signature) as f64)
            .sum();
        model = model.with(constraint!(coverage >= query.required_count as f64));
    }

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            return Ok(PlanOutcome::Infeasible {
                uncovered: Vec::new(),
            });
        }
        Err(err) => return Err(SolveError::Backend(err.to_string())),
    };

    let entries: Vec<PlanEntry> = quests
        .iter()
        .zip(&runs)
        .filter_map(|(quest, run)| {
            let count = solution.value(*run).round() as u64;
            (count > 0).then(|| PlanEntry {
                quest: quest.clone(),
                runs: count,
            })
        })
        .collect();

    debug!(activities = entries.len(), "optimizer produced a plan");
    Ok(PlanOutcome::Plan(FarmPlan { entries }))
}

#[cfg(test)]
mod tests {
    use farm_core::{QuestId, QuestInfo, TraitId};

    use super::*;

    fn quest(id: u32, ap_cost: u64, counts: &[(TraitSignature, u64)]) -> QuestRecord {
        let mut record = QuestRecord::new(
            QuestId(id),
            ap_cost,
            QuestInfo::new(format!("Quest {id}"), "Spot", "War"),
        );
        for (signature, count) in counts {
            if *count > 0 {
                record.match_counts.insert(signature.clone(), *count);
            }
        }
        record
    }

    fn query(signature: TraitSignature, required: u64) -> TraitQuery {
        TraitQuery::new(signature, required)
    }

    /// Exhaustive search over run-count vectors bounded by `cap`.
    fn brute_force_min_cost(quests: &[QuestRecord], queries: &[TraitQuery], cap: u64) -> Option<u64> {
        fn recurse(
            quests: &[QuestRecord],
            queries: &[TraitQuery],
            cap: u64,
            runs: &mut Vec<u64>,
            best: &mut Option<u64>,
        ) {
            if runs.len() == quests.len() {
                let satisfied = queries.iter().all(|query| {
                    let covered: u64 = quests
                        .iter()
                        .zip(runs.iter())
                        .map(|(quest, &count)| quest.matched_count(&query.signature) * count)
                        .sum();
                    covered >= query.required_count
                });
                if satisfied {
                    let cost: u64 = quests
                        .iter()
                        .zip(runs.iter())
                        .map(|(quest, &count)| quest.ap_cost * count)
                        .sum();
                    if best.is_none_or(|b| cost < b) {
                        *best = Some(cost);
                    }
                }
                return;
            }
            for count in 0..=cap {
                runs.push(count);
                recurse(quests, queries, cap, runs, best);
                runs.pop();
            }
        }

        let mut best = None;
        recurse(quests, queries, cap, &mut Vec::new(), &mut best);
        best
    }

    #[test]
    fn forced_assignment_is_exact() {
        let x = TraitSignature::single(TraitId(201));
        let y = TraitSignature::single(TraitId(305));
        let quests = vec![
            quest(1, 10, &[(x.clone(), 3)]),
            quest(2, 6, &[(y.clone(), 2)]),
        ];
        let queries = vec![query(x.clone(), 9), query(y.clone(), 4)];

        let outcome = optimize(&quests, &queries).unwrap();
        let PlanOutcome::Plan(plan) = outcome else {
            panic!("expected a plan, got {outcome:?}");
        };

        assert_eq!(plan.entries.len(), 2);
        let runs_a = plan.entries.iter().find(|e| e.quest.id == QuestId(1)).unwrap();
        let runs_b = plan.entries.iter().find(|e| e.quest.id == QuestId(2)).unwrap();
        assert_eq!(runs_a.runs, 3);
        assert_eq!(runs_b.runs, 2);
        assert_eq!(plan.total_cost(), 42);

        assert!(plan.covered_count(&x) >= 9);
        assert!(plan.covered_count(&y) >= 4);
    }

    #[test]
    fn matches_brute_force_on_overlapping_objectives() {
        let x = TraitSignature::single(TraitId(201));
        let y = TraitSignature::single(TraitId(305));
        let quests = vec![
            quest(1, 5, &[(x.clone(), 2), (y.clone(), 1)]),
            quest(2, 4, &[(x.clone(), 1), (y.clone(), 2)]),
            quest(3, 3, &[(y.clone(), 1)]),
        ];
        let queries = vec![query(x.clone(), 7), query(y.clone(), 6)];

        let outcome = optimize(&quests, &queries).unwrap();
        let PlanOutcome::Plan(plan) = outcome else {
            panic!("expected a plan, got {outcome:?}");
        };

        let expected = brute_force_min_cost(&quests, &queries, 10).unwrap();
        assert_eq!(plan.total_cost(), expected);
        assert!(plan.covered_count(&x) >= 7);
        assert!(plan.covered_count(&y) >= 6);
    }

    #[test]
    fn cheap_but_useless_quests_are_never_selected() {
        let x = TraitSignature::single(TraitId(201));
        let quests = vec![
            quest(1, 10, &[(x.clone(), 3)]),
            // Relevant to nothing in this objective set.
            quest(2, 1, &[]),
        ];
        let queries = vec![query(x.clone(), 6)];

        let outcome = optimize(&quests, &queries).unwrap();
        let PlanOutcome::Plan(plan) = outcome else {
            panic!("expected a plan, got {outcome:?}");
        };

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].quest.id, QuestId(1));
        assert_eq!(plan.entries[0].runs, 2);
    }

    #[test]
    fn no_objectives_is_nothing_required() {
        let outcome = optimize(&[], &[]).unwrap();
        assert_eq!(outcome, PlanOutcome::NothingRequired);
    }

    #[test]
    fn uncovered_objectives_are_reported_infeasible() {
        let x = TraitSignature::single(TraitId(201));
        let ghost = TraitSignature::single(TraitId(999));
        let quests = vec![quest(1, 10, &[(x.clone(), 3)])];
        let queries = vec![query(x, 6), query(ghost.clone(), 1)];

        let outcome = optimize(&quests, &queries).unwrap();
        assert_eq!(
            outcome,
            PlanOutcome::Infeasible {
                uncovered: vec![ghost]
            }
        );
    }

    #[test]
    fn infeasible_is_distinct_from_nothing_required() {
        let ghost = TraitSignature::single(TraitId(999));
        let outcome = optimize(&[], &[query(ghost, 1)]).unwrap();
        assert!(matches!(outcome, PlanOutcome::Infeasible { .. }));
    }
}
