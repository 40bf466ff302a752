//! Soft constraints: weighted preferences used to rank legal candidates and
//! to compute the 0-100 quality score of a finished timetable. They never
//! decide legality.

use super::catalog::Catalog;
use super::state::SchedulingState;
use super::variables::{Assignment, LessonVariable};

pub const SAME_TEACHER_WEIGHT: u32 = 1000;
pub const MINIMIZE_GAPS_WEIGHT: u32 = 100;
pub const AVOID_SAME_SUBJECT_WEIGHT: u32 = 50;
pub const EVEN_DISTRIBUTION_WEIGHT: u32 = 20;
pub const DOUBLE_PERIOD_WEIGHT: u32 = 10;
pub const COMBINED_LESSON_WEIGHT: u32 = 5;

pub const TOTAL_WEIGHT: u32 = SAME_TEACHER_WEIGHT
    + MINIMIZE_GAPS_WEIGHT
    + AVOID_SAME_SUBJECT_WEIGHT
    + EVEN_DISTRIBUTION_WEIGHT
    + DOUBLE_PERIOD_WEIGHT
    + COMBINED_LESSON_WEIGHT;

/// Scores a candidate for `variable` against the current state. Higher is better.
pub fn score_assignment(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    variable: &LessonVariable,
    candidate: &Assignment,
) -> u32 {
    same_teacher(state, variable, candidate)
        + minimize_gaps(catalog, state, candidate)
        + avoid_same_subject(catalog, state, variable, candidate)
        + even_distribution(catalog, state, variable, candidate)
        + double_period(variable)
        + combined_lesson(variable)
}

/// Keep one teacher per subject and group set. Neutral while nothing is established yet.
fn same_teacher(state: &SchedulingState, variable: &LessonVariable, candidate: &Assignment) -> u32 {
    let mut established = state
        .variables
        .iter()
        .filter(|v| v.subject_id == variable.subject_id && v.shares_group_with(&variable.group_ids))
        .filter_map(|v| v.current)
        .peekable();

    if established.peek().is_none() || established.any(|a| a.teacher_id == candidate.teacher_id) {
        SAME_TEACHER_WEIGHT
    } else {
        0
    }
}

/// Prefer slots next to (or only a break away from) the teacher's other lessons that day.
fn minimize_gaps(catalog: &Catalog<'_>, state: &SchedulingState, candidate: &Assignment) -> u32 {
    let Some(slot) = catalog.slot(candidate.time_slot_id) else {
        return 0;
    };
    let Some(used) = state.teacher_slots(candidate.teacher_id) else {
        return MINIMIZE_GAPS_WEIGHT;
    };
    let mut same_day = used
        .iter()
        .filter_map(|id| catalog.slot(*id))
        .filter(|s| s.day_id == slot.day_id && !s.is_break)
        .peekable();

    if same_day.peek().is_none() || same_day.any(|other| catalog.only_breaks_between(other, slot)) {
        MINIMIZE_GAPS_WEIGHT
    } else {
        0
    }
}

/// A single lesson should not repeat a subject the groups already have that day.
fn avoid_same_subject(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    variable: &LessonVariable,
    candidate: &Assignment,
) -> u32 {
    if variable.is_double_period {
        return AVOID_SAME_SUBJECT_WEIGHT;
    }
    let Some(slot) = catalog.slot(candidate.time_slot_id) else {
        return 0;
    };
    let repeated = variable
        .group_ids
        .iter()
        .any(|g| state.group_subject_day_count(*g, variable.subject_id, slot.day_id) > 0);
    if repeated { 0 } else { AVOID_SAME_SUBJECT_WEIGHT }
}

/// Placing here must not make this day the subject's busiest beyond the week's minimum.
fn even_distribution(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    variable: &LessonVariable,
    candidate: &Assignment,
) -> u32 {
    let Some(slot) = catalog.slot(candidate.time_slot_id) else {
        return 0;
    };
    let day_count = |day_id| -> u32 {
        variable
            .group_ids
            .iter()
            .map(|g| state.group_subject_day_count(*g, variable.subject_id, day_id))
            .sum()
    };
    let minimum = catalog
        .days()
        .iter()
        .map(|d| day_count(d.id))
        .min()
        .unwrap_or(0);

    if day_count(slot.day_id) <= minimum {
        EVEN_DISTRIBUTION_WEIGHT
    } else {
        0
    }
}

fn double_period(variable: &LessonVariable) -> u32 {
    if variable.is_double_period { DOUBLE_PERIOD_WEIGHT } else { 0 }
}

fn combined_lesson(variable: &LessonVariable) -> u32 {
    if variable.combined_lesson_id.is_some() {
        COMBINED_LESSON_WEIGHT
    } else {
        0
    }
}

/// Quality of a finished timetable on a 0-100 scale, rounded to two decimals.
///
/// Every assigned variable is scored against the completed state, its own
/// lesson included. An empty timetable scores 100.
pub fn quality_score(catalog: &Catalog<'_>, state: &SchedulingState) -> f64 {
    if state.is_empty() {
        return 100.0;
    }
    let possible = state.len() as f64 * f64::from(TOTAL_WEIGHT);

    let actual: u64 = state
        .variables
        .iter()
        .filter_map(|v| v.current.map(|a| (v, a)))
        .map(|(v, a)| u64::from(score_assignment(catalog, state, v, &a)))
        .sum();

    (actual as f64 / possible * 100.0 * 100.0).round() / 100.0
}
