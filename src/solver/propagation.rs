//! Turns grade-subject requirements into lesson variables and computes their
//! initial domains.
//!
//! Mandatory combined lessons produce one set of variables for the merged
//! groups. Every other group gets its own set; optional combined lessons only
//! tag those variables with the config id.

use super::catalog::Catalog;
use super::constraints;
use super::state::SchedulingState;
use super::variables::{Assignment, LessonVariable};
use crate::data::{CombinedLessonId, GradeSubjectRequirement, GroupId, Subject};
use log::debug;

/// Builds the variables for every requirement and prunes their domains to a fixpoint.
pub fn build_state(catalog: &Catalog<'_>) -> SchedulingState {
    let input = catalog.input();
    let mut variables = Vec::new();

    let mandatory: Vec<_> = input
        .combined_lessons
        .iter()
        .filter(|c| c.is_mandatory && !c.group_ids.is_empty())
        .filter_map(|c| {
            input
                .requirements
                .iter()
                .find(|r| r.grade_id == c.grade_id && r.subject_id == c.subject_id)
                .map(|r| (c, r))
        })
        .collect();

    for (combined, requirement) in &mandatory {
        let Some(subject) = catalog.subject(requirement.subject_id) else {
            continue;
        };
        push_variables(
            catalog,
            &mut variables,
            requirement,
            subject,
            &combined.group_ids,
            Some(combined.id),
        );
    }

    for requirement in &input.requirements {
        let Some(subject) = catalog.subject(requirement.subject_id) else {
            continue;
        };
        for group in input.groups.iter().filter(|g| g.grade_id == requirement.grade_id) {
            let merged = mandatory.iter().any(|(c, r)| {
                r.grade_id == requirement.grade_id
                    && r.subject_id == requirement.subject_id
                    && c.group_ids.contains(&group.id)
            });
            if merged {
                continue;
            }
            let optional = input
                .combined_lessons
                .iter()
                .find(|c| {
                    !c.is_mandatory
                        && c.grade_id == requirement.grade_id
                        && c.subject_id == requirement.subject_id
                        && c.group_ids.contains(&group.id)
                })
                .map(|c| c.id);
            push_variables(catalog, &mut variables, requirement, subject, &[group.id], optional);
        }
    }

    let mut state = SchedulingState::new(variables);
    let rounds = prune_static(&mut state);
    debug!(
        "Built {} lesson variables with {} candidate assignments ({} pruning rounds).",
        state.len(),
        state.variables.iter().map(|v| v.domain.len()).sum::<usize>(),
        rounds
    );
    state
}

/// Splits the weekly periods into doubles and singles and creates one variable per occurrence.
fn push_variables(
    catalog: &Catalog<'_>,
    variables: &mut Vec<LessonVariable>,
    requirement: &GradeSubjectRequirement,
    subject: &Subject,
    group_ids: &[GroupId],
    combined_lesson_id: Option<CombinedLessonId>,
) {
    let doubles = if requirement.prefer_double_periods && subject.allow_double_periods {
        requirement.periods_per_week / 2
    } else {
        0
    };
    let singles = requirement.periods_per_week - doubles * 2;

    for period_index in 0..doubles + singles {
        let mut variable = LessonVariable {
            requirement_id: requirement.id,
            grade_id: requirement.grade_id,
            subject_id: requirement.subject_id,
            period_index,
            group_ids: group_ids.to_vec(),
            is_double_period: period_index < doubles,
            combined_lesson_id,
            requires_special_room: subject.requires_special_room,
            special_room_id: subject.special_room_id,
            max_periods_per_day: subject.max_periods_per_day,
            domain: Vec::new(),
            current: None,
        };
        variable.domain = initial_domain(catalog, &variable, subject);
        variables.push(variable);
    }
}

/// Every (qualified teacher, teaching slot) pair that passes the context-free rules.
fn initial_domain(
    catalog: &Catalog<'_>,
    variable: &LessonVariable,
    subject: &Subject,
) -> Vec<Assignment> {
    let room_id = if subject.requires_special_room {
        subject.special_room_id
    } else {
        None
    };
    let mut domain = Vec::new();

    for teacher_id in catalog.qualified_teachers(variable.subject_id, variable.grade_id) {
        for &slot_id in catalog.teaching_slots() {
            let Some(slot) = catalog.slot(slot_id) else {
                continue;
            };
            if !constraints::teacher_not_blocked(catalog, teacher_id, slot_id) {
                continue;
            }
            if !catalog
                .teacher_day_limit(teacher_id, slot.day_id)
                .is_some_and(|max| max > 0)
            {
                continue;
            }
            if !constraints::grade_day_limit(catalog, variable.grade_id, slot) {
                continue;
            }
            if variable.is_double_period {
                let Some(next) = slot.next_teaching_slot.and_then(|id| catalog.slot(id)) else {
                    continue;
                };
                if !constraints::grade_day_limit(catalog, variable.grade_id, next)
                    || !constraints::teacher_not_blocked(catalog, teacher_id, next.id)
                {
                    continue;
                }
            }
            domain.push(Assignment::new(teacher_id, slot_id, room_id));
        }
    }
    domain
}

/// Candidates must pass every static rule; currently that is only the special-room match.
fn is_statically_consistent(variable: &LessonVariable, assignment: &Assignment) -> bool {
    constraints::special_room(variable, assignment.room_id)
}

/// Removes statically inconsistent candidates until no domain shrinks.
/// Returns the number of rounds.
fn prune_static(state: &mut SchedulingState) -> usize {
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut changed = false;
        for variable in &mut state.variables {
            let domain = std::mem::take(&mut variable.domain);
            let before = domain.len();
            variable.domain = domain
                .into_iter()
                .filter(|a| is_statically_consistent(variable, a))
                .collect();
            changed |= variable.domain.len() < before;
        }
        if !changed {
            return rounds;
        }
    }
}
