//! Small hand-built inputs shared by the unit tests.

use crate::data::{
    Grade, GradeDayConfig, GradeSubjectRequirement, Group, Qualification, SchedulingInput,
    Subject, Teacher, TeacherDayConfig, TeachingDay, TimeSlot, TimeSlotId,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Shape {
    pub grades: u32,
    pub groups_per_grade: u32,
    pub subjects: u32,
    pub teachers: u32,
    pub days: u32,
    pub slots_per_day: u32,
    pub periods_per_week: u32,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            grades: 1,
            groups_per_grade: 1,
            subjects: 1,
            teachers: 1,
            days: 1,
            slots_per_day: 3,
            periods_per_week: 1,
        }
    }
}

pub(crate) const GRADE_BASE: u32 = 1;
pub(crate) const GROUP_BASE: u32 = 100;
pub(crate) const SUBJECT_BASE: u32 = 200;
pub(crate) const TEACHER_BASE: u32 = 300;
pub(crate) const DAY_BASE: u32 = 400;
pub(crate) const REQUIREMENT_BASE: u32 = 500;
pub(crate) const ROOM_BASE: u32 = 600;

/// Id of slot `slot_number` (1-based) on the `day`-th (0-based) teaching day.
pub(crate) fn slot_id(day: u32, slot_number: u32) -> TimeSlotId {
    1000 + day * 100 + slot_number
}

/// Every teacher is qualified for every subject in every grade and may teach
/// a full day; every grade may use every slot.
pub(crate) fn minimal_input(shape: Shape) -> SchedulingInput {
    let grades: Vec<Grade> = (0..shape.grades)
        .map(|i| Grade {
            id: GRADE_BASE + i,
            name: format!("Grade {}", i + 1),
            sort_order: i as i32 + 1,
        })
        .collect();

    let groups = grades
        .iter()
        .enumerate()
        .flat_map(|(gi, grade)| {
            (0..shape.groups_per_grade).map(move |i| Group {
                id: GROUP_BASE + gi as u32 * shape.groups_per_grade + i,
                grade_id: grade.id,
                name: format!("{}{}", gi + 1, (b'A' + i as u8) as char),
                sort_order: i as i32,
            })
        })
        .collect();

    let subjects: Vec<Subject> = (0..shape.subjects)
        .map(|i| Subject {
            id: SUBJECT_BASE + i,
            name: format!("Subject {}", i + 1),
            requires_special_room: false,
            special_room_id: None,
            max_periods_per_day: 2,
            allow_double_periods: false,
        })
        .collect();

    let teaching_days: Vec<TeachingDay> = (0..shape.days)
        .map(|d| TeachingDay {
            id: DAY_BASE + d,
            day_of_week: d + 1,
            sort_order: d as i32,
            time_slots: (1..=shape.slots_per_day)
                .map(|s| TimeSlot {
                    id: slot_id(d, s),
                    slot_number: s,
                    is_break: false,
                })
                .collect(),
        })
        .collect();

    let teachers = (0..shape.teachers)
        .map(|i| Teacher {
            id: TEACHER_BASE + i,
            name: format!("Teacher {}", i + 1),
            qualifications: subjects
                .iter()
                .flat_map(|s| {
                    grades.iter().map(move |g| Qualification {
                        subject_id: s.id,
                        min_grade_sort_order: g.sort_order,
                        max_grade_sort_order: g.sort_order,
                    })
                })
                .collect(),
            day_configs: teaching_days
                .iter()
                .map(|d| TeacherDayConfig {
                    teaching_day_id: d.id,
                    max_periods: shape.slots_per_day,
                })
                .collect(),
            blocked_slot_ids: Vec::new(),
        })
        .collect();

    let requirements = grades
        .iter()
        .flat_map(|g| subjects.iter().map(move |s| (g.id, s.id)))
        .enumerate()
        .map(|(i, (grade_id, subject_id))| GradeSubjectRequirement {
            id: REQUIREMENT_BASE + i as u32,
            grade_id,
            subject_id,
            periods_per_week: shape.periods_per_week,
            prefer_double_periods: false,
        })
        .collect();

    let grade_day_configs = grades
        .iter()
        .flat_map(|g| {
            teaching_days.iter().map(move |d| GradeDayConfig {
                grade_id: g.id,
                teaching_day_id: d.id,
                max_periods: shape.slots_per_day,
            })
        })
        .collect();

    SchedulingInput {
        grades,
        groups,
        subjects,
        rooms: Vec::new(),
        teachers,
        teaching_days,
        requirements,
        combined_lessons: Vec::new(),
        grade_day_configs,
    }
}
