//! Post-solve diagnostics. They run whether or not the search succeeded and
//! never influence `success`, except that every unassigned lesson is named
//! as an error.

use super::catalog::Catalog;
use super::state::SchedulingState;
use crate::data::{
    GeneratedReport, GroupId, RelatedEntity, ReportCategory, ReportSeverity, SubjectId,
    TeacherId, TeachingDayId,
};
use itertools::Itertools;
use std::collections::HashMap;

/// All findings for `state`, grouped by check in a fixed order.
pub fn generate_reports(catalog: &Catalog<'_>, state: &SchedulingState) -> Vec<GeneratedReport> {
    let mut reports = Vec::new();
    teacher_splits(catalog, state, &mut reports);
    teacher_gaps(catalog, state, &mut reports);
    subject_clustering(catalog, state, &mut reports);
    double_periods_not_used(catalog, state, &mut reports);
    combined_lessons_not_used(catalog, state, &mut reports);
    unassigned_lessons(catalog, state, &mut reports);
    reports
}

fn subject_name(catalog: &Catalog<'_>, subject_id: SubjectId) -> String {
    catalog
        .subject(subject_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("#{subject_id}"))
}

fn teacher_splits(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    reports: &mut Vec<GeneratedReport>,
) {
    let teachers_by_lesson: HashMap<(Vec<GroupId>, SubjectId), Vec<TeacherId>> = state
        .variables
        .iter()
        .filter_map(|v| {
            let assignment = v.current?;
            let groups = v.group_ids.iter().copied().sorted().collect_vec();
            Some(((groups, v.subject_id), assignment.teacher_id))
        })
        .into_group_map();

    let lessons = teachers_by_lesson.into_iter().sorted_by(|a, b| a.0.cmp(&b.0));
    for ((_, subject_id), teachers) in lessons {
        let distinct = teachers.iter().unique().count();
        if distinct > 1 {
            reports.push(GeneratedReport::new(
                ReportSeverity::Warning,
                ReportCategory::TeacherSplit,
                format!(
                    "Subject '{}' is taught by {} different teachers for the same group.",
                    subject_name(catalog, subject_id),
                    distinct
                ),
                Some(RelatedEntity::Subject(subject_id)),
            ));
        }
    }
}

fn teacher_gaps(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    reports: &mut Vec<GeneratedReport>,
) {
    for teacher in &catalog.input().teachers {
        let Some(used) = state.teacher_slots(teacher.id) else {
            continue;
        };
        for day in catalog.days() {
            let numbers = used
                .iter()
                .filter_map(|id| catalog.slot(*id))
                .filter(|s| s.day_id == day.id)
                .map(|s| s.slot_number)
                .sorted()
                .dedup()
                .collect_vec();

            for (earlier, later) in numbers.iter().tuple_windows() {
                let idle = day
                    .time_slots
                    .iter()
                    .any(|s| !s.is_break && s.slot_number > *earlier && s.slot_number < *later);
                if idle {
                    reports.push(GeneratedReport::new(
                        ReportSeverity::Info,
                        ReportCategory::GapInTeacherSchedule,
                        format!(
                            "Teacher '{}' has a gap on day {} between slots {} and {}.",
                            teacher.name, day.day_of_week, earlier, later
                        ),
                        Some(RelatedEntity::Teacher(teacher.id)),
                    ));
                }
            }
        }
    }
}

fn subject_clustering(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    reports: &mut Vec<GeneratedReport>,
) {
    // A double period contributes two periods to its day.
    let days_by_group_subject: HashMap<(GroupId, SubjectId), Vec<TeachingDayId>> = state
        .variables
        .iter()
        .filter_map(|v| {
            let slot = catalog.slot(v.current?.time_slot_id)?;
            Some((v, slot.day_id))
        })
        .flat_map(|(v, day_id)| {
            v.group_ids.iter().flat_map(move |g| {
                std::iter::repeat_n(((*g, v.subject_id), day_id), v.slots_needed() as usize)
            })
        })
        .into_group_map();

    let lessons = days_by_group_subject.into_iter().sorted_by_key(|(k, _)| *k);
    for ((group_id, subject_id), days) in lessons {
        let total = days.len();
        let busiest = days.iter().counts().into_values().max().unwrap_or(0);
        if total >= 3 && busiest > total / 2 + 1 {
            let group = catalog
                .group(group_id)
                .map(|g| g.name.clone())
                .unwrap_or_else(|| format!("#{group_id}"));
            reports.push(GeneratedReport::new(
                ReportSeverity::Warning,
                ReportCategory::SubjectClustering,
                format!(
                    "Subject '{}' for group '{}' has {}/{} periods on a single day.",
                    subject_name(catalog, subject_id),
                    group,
                    busiest,
                    total
                ),
                Some(RelatedEntity::Subject(subject_id)),
            ));
        }
    }
}

fn double_periods_not_used(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    reports: &mut Vec<GeneratedReport>,
) {
    for req in catalog.input().requirements.iter().filter(|r| r.prefer_double_periods) {
        let Some(subject) = catalog.subject(req.subject_id) else {
            continue;
        };
        if !subject.allow_double_periods {
            continue;
        }
        let scheduled = state.variables.iter().any(|v| {
            v.is_assigned()
                && v.is_double_period
                && v.subject_id == req.subject_id
                && v.grade_id == req.grade_id
        });
        if !scheduled {
            reports.push(GeneratedReport::new(
                ReportSeverity::Info,
                ReportCategory::DoublePeriodNotUsed,
                format!(
                    "Subject '{}' in grade prefers double periods but none were scheduled.",
                    subject.name
                ),
                Some(RelatedEntity::GradeSubjectRequirement(req.id)),
            ));
        }
    }
}

fn combined_lessons_not_used(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    reports: &mut Vec<GeneratedReport>,
) {
    for combined in catalog.input().combined_lessons.iter().filter(|c| !c.is_mandatory) {
        let used = state
            .variables
            .iter()
            .any(|v| v.is_assigned() && v.combined_lesson_id == Some(combined.id));
        if !used {
            reports.push(GeneratedReport::new(
                ReportSeverity::Info,
                ReportCategory::CombinedLessonNotUsed,
                format!(
                    "Optional combined lesson for '{}' was not utilized.",
                    subject_name(catalog, combined.subject_id)
                ),
                Some(RelatedEntity::CombinedLessonConfig(combined.id)),
            ));
        }
    }
}

fn unassigned_lessons(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    reports: &mut Vec<GeneratedReport>,
) {
    for variable in state.variables.iter().filter(|v| !v.is_assigned()) {
        reports.push(GeneratedReport::new(
            ReportSeverity::Error,
            ReportCategory::InfeasibleConstraint,
            format!(
                "Could not schedule period {} for subject '{}' (groups: {}).",
                variable.period_index + 1,
                subject_name(catalog, variable.subject_id),
                variable.group_ids.iter().join(", ")
            ),
            Some(RelatedEntity::GradeSubjectRequirement(variable.requirement_id)),
        ));
    }
}
