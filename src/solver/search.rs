//! Depth-first backtracking search with MRV variable selection, LCV plus
//! soft-score value ordering, forward checking and domain restoration.

use super::catalog::Catalog;
use super::constraints;
use super::control::{CancellationToken, ProgressSink};
use super::scoring;
use super::state::SchedulingState;
use super::variables::{Assignment, VariableIndex};
use crate::error::GenerationError;
use log::trace;
use std::cmp::Reverse;
use std::fmt;

/// Counters collected while searching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub assignments: u64,
    pub backtracks: u64,
    pub wipeouts: u64,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} assignments, {} backtracks, {} forward-check wipeouts",
            self.nodes, self.assignments, self.backtracks, self.wipeouts
        )
    }
}

type DomainSnapshot = Vec<(VariableIndex, Vec<Assignment>)>;

pub struct BacktrackingSearch<'s, 'a> {
    catalog: &'s Catalog<'a>,
    progress: Option<&'s dyn ProgressSink>,
    cancellation: &'s CancellationToken,
    total: usize,
    assigned: usize,
    stats: SearchStats,
}

impl<'s, 'a> BacktrackingSearch<'s, 'a> {
    pub fn new(
        catalog: &'s Catalog<'a>,
        progress: Option<&'s dyn ProgressSink>,
        cancellation: &'s CancellationToken,
    ) -> Self {
        Self {
            catalog,
            progress,
            cancellation,
            total: 0,
            assigned: 0,
            stats: SearchStats::default(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Searches for a complete assignment. `Ok(false)` means the search space
    /// was exhausted; the state is then back to its unassigned starting point.
    pub fn solve(&mut self, state: &mut SchedulingState) -> Result<bool, GenerationError> {
        self.total = state.len();
        self.assigned = state.assigned_count();
        self.backtrack(state)
    }

    fn backtrack(&mut self, state: &mut SchedulingState) -> Result<bool, GenerationError> {
        if self.cancellation.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        self.stats.nodes += 1;

        let Some(index) = self.select_variable(state) else {
            return Ok(true);
        };

        for candidate in self.order_values(state, index) {
            if !constraints::is_valid(self.catalog, state, &state.variables[index], &candidate) {
                continue;
            }

            let snapshot = snapshot_domains(state, index);
            state.assign(self.catalog, index, candidate);
            self.assigned += 1;
            self.stats.assignments += 1;
            self.report_progress();
            trace!(
                "Assigned variable {} to teacher {} at slot {} ({}/{}).",
                index, candidate.teacher_id, candidate.time_slot_id, self.assigned, self.total
            );

            if self.forward_check(state) {
                if self.backtrack(state)? {
                    return Ok(true);
                }
            } else {
                self.stats.wipeouts += 1;
            }

            state.undo(self.catalog, index);
            self.assigned -= 1;
            self.stats.backtracks += 1;
            restore_domains(state, snapshot);
        }

        Ok(false)
    }

    /// MRV: the unassigned variable with the fewest currently valid values.
    /// Ties go to combined lessons, then to special-room lessons, then to input order.
    fn select_variable(&self, state: &SchedulingState) -> Option<VariableIndex> {
        state.unassigned().min_by_key(|&i| {
            let variable = &state.variables[i];
            let valid = variable
                .domain
                .iter()
                .filter(|a| constraints::is_valid(self.catalog, state, variable, a))
                .count();
            (
                valid,
                variable.combined_lesson_id.is_none(),
                !variable.requires_special_room,
            )
        })
    }

    /// LCV first, soft score second; equal candidates keep their domain order.
    fn order_values(&self, state: &SchedulingState, index: VariableIndex) -> Vec<Assignment> {
        let variable = &state.variables[index];
        let mut ranked: Vec<(usize, Reverse<u32>, Assignment)> = variable
            .domain
            .iter()
            .filter(|a| match constraints::first_violation(self.catalog, state, variable, a) {
                None => true,
                Some(rule) => {
                    trace!(
                        "Variable {} skips teacher {} at slot {}: {}.",
                        index, a.teacher_id, a.time_slot_id, rule
                    );
                    false
                }
            })
            .map(|a| {
                (
                    count_eliminations(state, index, a),
                    Reverse(scoring::score_assignment(self.catalog, state, variable, a)),
                    *a,
                )
            })
            .collect();
        ranked.sort_by_key(|(eliminated, score, _)| (*eliminated, *score));
        ranked.into_iter().map(|(_, _, a)| a).collect()
    }

    /// Prunes every unassigned domain against the new state. Fails as soon as one empties.
    fn forward_check(&self, state: &mut SchedulingState) -> bool {
        let pending: Vec<VariableIndex> = state.unassigned().collect();
        for i in pending {
            let variable = &state.variables[i];
            let domain: Vec<Assignment> = variable
                .domain
                .iter()
                .filter(|a| constraints::is_valid(self.catalog, state, variable, a))
                .copied()
                .collect();
            let wiped_out = domain.is_empty();
            state.variables[i].domain = domain;
            if wiped_out {
                return false;
            }
        }
        true
    }

    fn report_progress(&self) {
        if let Some(progress) = self.progress {
            if self.total > 0 {
                progress.report((self.assigned * 100 / self.total) as u32);
            }
        }
    }
}

/// Values in other unassigned domains that share the candidate's slot and would
/// clash with it on teacher, groups or special room.
fn count_eliminations(
    state: &SchedulingState,
    index: VariableIndex,
    candidate: &Assignment,
) -> usize {
    let variable = &state.variables[index];
    state
        .unassigned()
        .filter(|&i| i != index)
        .map(|i| {
            let other = &state.variables[i];
            let shares_group = other.shares_group_with(&variable.group_ids);
            other
                .domain
                .iter()
                .filter(|a| a.time_slot_id == candidate.time_slot_id)
                .filter(|a| {
                    a.teacher_id == candidate.teacher_id
                        || shares_group
                        || (candidate.room_id.is_some() && a.room_id == candidate.room_id)
                })
                .count()
        })
        .sum()
}

fn snapshot_domains(state: &SchedulingState, except: VariableIndex) -> DomainSnapshot {
    state
        .unassigned()
        .filter(|&i| i != except)
        .map(|i| (i, state.variables[i].domain.clone()))
        .collect()
}

fn restore_domains(state: &mut SchedulingState, snapshot: DomainSnapshot) {
    for (i, domain) in snapshot {
        state.variables[i].domain = domain;
    }
}
