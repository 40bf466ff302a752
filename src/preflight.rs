//! Structural checks over a scheduling input, run before a generation is
//! requested. Unlike the generator this never rejects the input outright:
//! dangling references become issues.

use crate::data::{Grade, RelatedEntity, ReportSeverity, SchedulingInput};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PreflightCategory {
    TeacherCoverage,
    TeacherAvailability,
    SlotCapacity,
    CombinedLessonConfig,
    DataConsistency,
    TimeStructure,
    RoomCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightIssue {
    pub severity: ReportSeverity,
    pub category: PreflightCategory,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub issues: Vec<PreflightIssue>,
}

pub fn validate(input: &SchedulingInput) -> PreflightReport {
    let grades: HashMap<_, &Grade> = input.grades.iter().map(|g| (g.id, g)).collect();
    let mut issues = Vec::new();

    teacher_coverage(input, &grades, &mut issues);
    teacher_availability(input, &mut issues);
    slot_capacity(input, &mut issues);
    combined_lesson_groups(input, &grades, &mut issues);
    data_consistency(input, &grades, &mut issues);
    time_structure(input, &mut issues);
    room_capacity(input, &grades, &mut issues);

    let error_count = issues.iter().filter(|i| i.severity == ReportSeverity::Error).count();
    let warning_count = issues.iter().filter(|i| i.severity == ReportSeverity::Warning).count();
    debug!("Preflight found {error_count} errors and {warning_count} warnings.");

    PreflightReport {
        is_valid: error_count == 0,
        error_count,
        warning_count,
        issues,
    }
}

fn issue(
    severity: ReportSeverity,
    category: PreflightCategory,
    message: String,
    related_entity: RelatedEntity,
) -> PreflightIssue {
    PreflightIssue {
        severity,
        category,
        message,
        related_entity: Some(related_entity),
    }
}

fn grade_name(grades: &HashMap<u32, &Grade>, id: u32) -> String {
    grades.get(&id).map(|g| g.name.clone()).unwrap_or_else(|| format!("#{id}"))
}

fn subject_name(input: &SchedulingInput, id: u32) -> String {
    input
        .subjects
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("#{id}"))
}

fn teacher_coverage(
    input: &SchedulingInput,
    grades: &HashMap<u32, &Grade>,
    issues: &mut Vec<PreflightIssue>,
) {
    for req in &input.requirements {
        // Dangling grades are reported by the consistency check.
        let Some(grade) = grades.get(&req.grade_id) else {
            continue;
        };
        let covered = input
            .teachers
            .iter()
            .flat_map(|t| &t.qualifications)
            .any(|q| q.covers(req.subject_id, grade.sort_order));
        if !covered {
            issues.push(issue(
                ReportSeverity::Error,
                PreflightCategory::TeacherCoverage,
                format!(
                    "Subject '{}' in grade '{}' has no qualified teacher.",
                    subject_name(input, req.subject_id),
                    grade.name
                ),
                RelatedEntity::GradeSubjectRequirement(req.id),
            ));
        }
    }
}

fn teacher_availability(input: &SchedulingInput, issues: &mut Vec<PreflightIssue>) {
    for teacher in input.teachers.iter().filter(|t| !t.qualifications.is_empty()) {
        let available: u64 = teacher
            .day_configs
            .iter()
            .map(|dc| u64::from(dc.max_periods))
            .sum();
        if available == 0 {
            issues.push(issue(
                ReportSeverity::Warning,
                PreflightCategory::TeacherAvailability,
                format!("Teacher '{}' has qualifications but zero available hours.", teacher.name),
                RelatedEntity::Teacher(teacher.id),
            ));
        }
    }
}

fn slot_capacity(input: &SchedulingInput, issues: &mut Vec<PreflightIssue>) {
    for grade in &input.grades {
        let required: u64 = input
            .requirements
            .iter()
            .filter(|r| r.grade_id == grade.id)
            .map(|r| u64::from(r.periods_per_week))
            .sum();
        let available: u64 = input
            .grade_day_configs
            .iter()
            .filter(|c| c.grade_id == grade.id)
            .map(|c| u64::from(c.max_periods))
            .sum();
        if required > available {
            issues.push(issue(
                ReportSeverity::Error,
                PreflightCategory::SlotCapacity,
                format!(
                    "Grade '{}' requires {} periods/week but only {} slots are available.",
                    grade.name, required, available
                ),
                RelatedEntity::Grade(grade.id),
            ));
        }
    }
}

fn combined_lesson_groups(
    input: &SchedulingInput,
    grades: &HashMap<u32, &Grade>,
    issues: &mut Vec<PreflightIssue>,
) {
    for config in &input.combined_lessons {
        let foreign = config
            .group_ids
            .iter()
            .filter_map(|id| input.groups.iter().find(|g| g.id == *id))
            .filter(|g| g.grade_id != config.grade_id);
        for group in foreign {
            issues.push(issue(
                ReportSeverity::Error,
                PreflightCategory::CombinedLessonConfig,
                format!(
                    "Combined lesson for '{}' in grade '{}' references group '{}' from a different grade.",
                    subject_name(input, config.subject_id),
                    grade_name(grades, config.grade_id),
                    group.name
                ),
                RelatedEntity::CombinedLessonConfig(config.id),
            ));
        }
    }
}

fn data_consistency(
    input: &SchedulingInput,
    grades: &HashMap<u32, &Grade>,
    issues: &mut Vec<PreflightIssue>,
) {
    let subjects: HashSet<u32> = input.subjects.iter().map(|s| s.id).collect();
    for req in &input.requirements {
        if !subjects.contains(&req.subject_id) {
            issues.push(issue(
                ReportSeverity::Error,
                PreflightCategory::DataConsistency,
                format!(
                    "Grade '{}' references a non-existent subject (ID: {}).",
                    grade_name(grades, req.grade_id),
                    req.subject_id
                ),
                RelatedEntity::GradeSubjectRequirement(req.id),
            ));
        }
        if !grades.contains_key(&req.grade_id) {
            issues.push(issue(
                ReportSeverity::Error,
                PreflightCategory::DataConsistency,
                format!(
                    "Requirement for '{}' references a non-existent grade (ID: {}).",
                    subject_name(input, req.subject_id),
                    req.grade_id
                ),
                RelatedEntity::GradeSubjectRequirement(req.id),
            ));
        }
    }
}

fn time_structure(input: &SchedulingInput, issues: &mut Vec<PreflightIssue>) {
    for day in &input.teaching_days {
        if day.time_slots.iter().all(|s| s.is_break) {
            issues.push(issue(
                ReportSeverity::Warning,
                PreflightCategory::TimeStructure,
                format!("Teaching day {} has no non-break time slots.", day.day_of_week),
                RelatedEntity::TeachingDay(day.id),
            ));
        }
    }
}

fn room_capacity(
    input: &SchedulingInput,
    grades: &HashMap<u32, &Grade>,
    issues: &mut Vec<PreflightIssue>,
) {
    for config in &input.combined_lessons {
        let Some(subject) = input.subjects.iter().find(|s| s.id == config.subject_id) else {
            continue;
        };
        if !subject.requires_special_room {
            continue;
        }
        let Some(room) = subject
            .special_room_id
            .and_then(|id| input.rooms.iter().find(|r| r.id == id))
        else {
            continue;
        };
        if room.capacity < config.max_groups_per_lesson {
            issues.push(issue(
                ReportSeverity::Error,
                PreflightCategory::RoomCapacity,
                format!(
                    "Room '{}' (capacity {}) cannot fit {} groups for combined '{}' in grade '{}'.",
                    room.name,
                    room.capacity,
                    config.max_groups_per_lesson,
                    subject.name,
                    grade_name(grades, config.grade_id)
                ),
                RelatedEntity::CombinedLessonConfig(config.id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CombinedLessonConfig, Group, Room};
    use crate::fixtures::{self, ROOM_BASE, Shape};

    fn categories(report: &PreflightReport) -> Vec<PreflightCategory> {
        report.issues.iter().map(|i| i.category).collect()
    }

    #[test]
    fn consistent_input_is_valid() {
        let report = validate(&fixtures::minimal_input(Shape::default()));
        assert!(report.is_valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn uncovered_requirement_and_idle_teacher() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.teachers[0].qualifications[0].min_grade_sort_order = 5;
        input.teachers[0].qualifications[0].max_grade_sort_order = 6;
        input.teachers[0].day_configs.clear();

        let report = validate(&input);
        assert_eq!(
            categories(&report),
            vec![PreflightCategory::TeacherCoverage, PreflightCategory::TeacherAvailability]
        );
        assert_eq!((report.error_count, report.warning_count), (1, 1));
        assert!(!report.is_valid);
        assert_eq!(
            report.issues[0].message,
            "Subject 'Subject 1' in grade 'Grade 1' has no qualified teacher."
        );
    }

    #[test]
    fn over_committed_grade() {
        let input = fixtures::minimal_input(Shape {
            subjects: 2,
            periods_per_week: 2,
            slots_per_day: 3,
            ..Shape::default()
        });

        let report = validate(&input);
        assert_eq!(categories(&report), vec![PreflightCategory::SlotCapacity]);
        assert_eq!(
            report.issues[0].message,
            "Grade 'Grade 1' requires 4 periods/week but only 3 slots are available."
        );
    }

    #[test]
    fn huge_period_counts_do_not_overflow() {
        let mut input = fixtures::minimal_input(Shape {
            subjects: 2,
            days: 2,
            ..Shape::default()
        });
        for req in &mut input.requirements {
            req.periods_per_week = u32::MAX / 2 + 1;
        }
        input.teachers[0].day_configs[0].max_periods = u32::MAX;
        input.teachers[0].day_configs[1].max_periods = 1;

        let report = validate(&input);
        assert_eq!(categories(&report), vec![PreflightCategory::SlotCapacity]);
        assert_eq!(
            report.issues[0].message,
            "Grade 'Grade 1' requires 4294967296 periods/week but only 6 slots are available."
        );
    }

    #[test]
    fn cross_grade_group_in_combined_lesson() {
        let mut input = fixtures::minimal_input(Shape {
            grades: 2,
            ..Shape::default()
        });
        input.combined_lessons.push(CombinedLessonConfig {
            id: 3,
            grade_id: input.grades[0].id,
            subject_id: input.subjects[0].id,
            is_mandatory: false,
            max_groups_per_lesson: 2,
            group_ids: input.groups.iter().map(|g| g.id).collect(),
        });

        let report = validate(&input);
        assert_eq!(categories(&report), vec![PreflightCategory::CombinedLessonConfig]);
        assert_eq!(report.issues[0].related_entity, Some(RelatedEntity::CombinedLessonConfig(3)));
    }

    #[test]
    fn dangling_references_are_issues_not_failures() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.requirements[0].subject_id = 777;
        input.groups.push(Group {
            id: 999,
            grade_id: 42,
            name: "orphan".into(),
            sort_order: 0,
        });

        let report = validate(&input);
        assert!(categories(&report).contains(&PreflightCategory::DataConsistency));
    }

    #[test]
    fn break_only_day_and_small_special_room() {
        let mut input = fixtures::minimal_input(Shape {
            days: 2,
            ..Shape::default()
        });
        for slot in &mut input.teaching_days[1].time_slots {
            slot.is_break = true;
        }
        input.rooms.push(Room {
            id: ROOM_BASE,
            name: "Lab".into(),
            capacity: 1,
        });
        input.subjects[0].requires_special_room = true;
        input.subjects[0].special_room_id = Some(ROOM_BASE);
        input.combined_lessons.push(CombinedLessonConfig {
            id: 4,
            grade_id: input.grades[0].id,
            subject_id: input.subjects[0].id,
            is_mandatory: true,
            max_groups_per_lesson: 2,
            group_ids: Vec::new(),
        });

        let report = validate(&input);
        assert_eq!(
            categories(&report),
            vec![PreflightCategory::TimeStructure, PreflightCategory::RoomCapacity]
        );
        assert_eq!(report.error_count, 1);
        assert_eq!(report.warning_count, 1);
    }
}
