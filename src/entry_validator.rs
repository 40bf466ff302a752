//! Re-checks one hand-edited timetable entry against the rest of its timetable.
//!
//! The other entries are loaded into a [`SchedulingState`] so the daily limits,
//! blocked slots, special rooms, grade windows and double-period rules are the
//! exact predicates the generator uses. Teacher, group and room clashes are
//! computed per entry so each violation can name the entry it conflicts with.

use crate::data::{EntryId, GroupId, RoomId, SchedulingInput, StoredEntry, TimeSlotId};
use crate::error::GenerationError;
use crate::solver::catalog::Catalog;
use crate::solver::constraints;
use crate::solver::state::{SchedulingState, occupied_slots};
use crate::solver::variables::{Assignment, LessonVariable};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryViolation {
    #[error("Time slot {0} not found.")]
    UnknownTimeSlot(TimeSlotId),

    #[error("Teacher double-booked at slot {slot} (conflicts with entry {conflicting_entry}).")]
    TeacherDoubleBooked {
        slot: TimeSlotId,
        conflicting_entry: EntryId,
    },

    #[error("Group {group} double-booked at slot {slot} (conflicts with entry {conflicting_entry}).")]
    GroupDoubleBooked {
        group: GroupId,
        slot: TimeSlotId,
        conflicting_entry: EntryId,
    },

    #[error("Room {room} double-booked at slot {slot} (conflicts with entry {conflicting_entry}).")]
    RoomDoubleBooked {
        room: RoomId,
        slot: TimeSlotId,
        conflicting_entry: EntryId,
    },

    #[error("Teacher '{teacher}' is blocked at this time slot.")]
    TeacherBlocked { teacher: String },

    #[error("Teacher '{teacher}' exceeds daily limit of {max} periods.")]
    TeacherDailyLimit { teacher: String, max: u32 },

    #[error("Subject '{subject}' requires special room {} but assigned to {}.", room_label(.required), room_label(.assigned))]
    SpecialRoom {
        subject: String,
        required: Option<RoomId>,
        assigned: Option<RoomId>,
    },

    #[error("Slot is outside the day window of grade '{grade}'.")]
    GradeDayLimit { grade: String },

    #[error("Double period requires a free consecutive non-break slot but none exists.")]
    DoublePeriodNotConsecutive,

    #[error("Subject '{subject}' exceeds daily limit of {max} for group {group}.")]
    SubjectDailyLimit {
        subject: String,
        max: u32,
        group: GroupId,
    },
}

fn room_label(room: &Option<RoomId>) -> String {
    room.map_or_else(|| "none".to_string(), |r| r.to_string())
}

/// Every hard rule `entry` breaks given `others` (the rest of the timetable;
/// an element with the same id as `entry` is ignored).
///
/// Fails only when the input itself has dangling references.
pub fn validate_entry(
    input: &SchedulingInput,
    entry: &StoredEntry,
    others: &[StoredEntry],
) -> Result<Vec<EntryViolation>, GenerationError> {
    let catalog = Catalog::new(input)?;
    let lesson = &entry.lesson;

    let Some(slot) = catalog.slot(lesson.time_slot_id).filter(|s| !s.is_break).copied() else {
        return Ok(vec![EntryViolation::UnknownTimeSlot(lesson.time_slot_id)]);
    };
    let others: Vec<&StoredEntry> = others.iter().filter(|o| o.id != entry.id).collect();
    let mut violations = clashes(&catalog, entry, &others);

    let state = load_state(&catalog, &others);
    let variable = as_variable(&catalog, entry);
    let candidate = Assignment::new(lesson.teacher_id, lesson.time_slot_id, lesson.room_id);
    let teacher = catalog
        .teacher(lesson.teacher_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("#{}", lesson.teacher_id));
    let subject = catalog.subject(lesson.subject_id);
    let subject_name = subject.map(|s| s.name.clone()).unwrap_or_default();

    if !constraints::teacher_not_blocked(&catalog, lesson.teacher_id, slot.id) {
        violations.push(EntryViolation::TeacherBlocked {
            teacher: teacher.clone(),
        });
    }
    let needed = variable.slots_needed();
    if !constraints::teacher_daily_limit(&catalog, &state, lesson.teacher_id, &slot, needed) {
        violations.push(EntryViolation::TeacherDailyLimit {
            teacher,
            max: catalog.teacher_day_limit(lesson.teacher_id, slot.day_id).unwrap_or(0),
        });
    }
    if !constraints::special_room(&variable, lesson.room_id) {
        violations.push(EntryViolation::SpecialRoom {
            subject: subject_name.clone(),
            required: variable.special_room_id,
            assigned: lesson.room_id,
        });
    }
    if !constraints::grade_day_limit(&catalog, lesson.grade_id, &slot) {
        violations.push(EntryViolation::GradeDayLimit {
            grade: catalog
                .grade(lesson.grade_id)
                .map(|g| g.name.clone())
                .unwrap_or_default(),
        });
    }
    if lesson.is_double_period
        && !constraints::double_period_consecutive(&catalog, &state, &variable, &candidate, &slot)
    {
        violations.push(EntryViolation::DoublePeriodNotConsecutive);
    }
    if subject.is_some() {
        for &group in &lesson.group_ids {
            let used = state.group_subject_day_count(group, lesson.subject_id, slot.day_id);
            if used + variable.slots_needed() > variable.max_periods_per_day {
                violations.push(EntryViolation::SubjectDailyLimit {
                    subject: subject_name.clone(),
                    max: variable.max_periods_per_day,
                    group,
                });
            }
        }
    }

    Ok(violations)
}

/// Teacher, group and room clashes against every other entry, double periods
/// occupying both slots.
fn clashes(
    catalog: &Catalog<'_>,
    entry: &StoredEntry,
    others: &[&StoredEntry],
) -> Vec<EntryViolation> {
    let lesson = &entry.lesson;
    let mine = occupied_slots(catalog, lesson.time_slot_id, lesson.is_double_period);
    let mut violations = Vec::new();

    for other in others {
        let theirs = occupied_slots(
            catalog,
            other.lesson.time_slot_id,
            other.lesson.is_double_period,
        );
        let Some(&slot) = mine.iter().find(|s| theirs.contains(s)) else {
            continue;
        };
        if other.lesson.teacher_id == lesson.teacher_id {
            violations.push(EntryViolation::TeacherDoubleBooked {
                slot,
                conflicting_entry: other.id,
            });
        }
        for &group in lesson.group_ids.iter().filter(|g| other.lesson.group_ids.contains(g)) {
            violations.push(EntryViolation::GroupDoubleBooked {
                group,
                slot,
                conflicting_entry: other.id,
            });
        }
        if let Some(room) = lesson.room_id.filter(|r| other.lesson.room_id == Some(*r)) {
            violations.push(EntryViolation::RoomDoubleBooked {
                room,
                slot,
                conflicting_entry: other.id,
            });
        }
    }
    violations
}

fn as_variable(catalog: &Catalog<'_>, entry: &StoredEntry) -> LessonVariable {
    let lesson = &entry.lesson;
    let subject = catalog.subject(lesson.subject_id);
    let requirement_id = catalog
        .input()
        .requirements
        .iter()
        .find(|r| r.grade_id == lesson.grade_id && r.subject_id == lesson.subject_id)
        .map(|r| r.id)
        .unwrap_or_default();

    LessonVariable {
        requirement_id,
        grade_id: lesson.grade_id,
        subject_id: lesson.subject_id,
        period_index: lesson.period_index,
        group_ids: lesson.group_ids.clone(),
        is_double_period: lesson.is_double_period,
        combined_lesson_id: lesson.combined_lesson_id,
        requires_special_room: subject.is_some_and(|s| s.requires_special_room),
        special_room_id: subject.and_then(|s| s.special_room_id),
        max_periods_per_day: subject.map_or(u32::MAX, |s| s.max_periods_per_day),
        domain: Vec::new(),
        current: None,
    }
}

fn load_state(catalog: &Catalog<'_>, others: &[&StoredEntry]) -> SchedulingState {
    let mut state = SchedulingState::new(others.iter().map(|o| as_variable(catalog, o)).collect());
    for (index, other) in others.iter().enumerate() {
        let lesson = &other.lesson;
        state.assign(
            catalog,
            index,
            Assignment::new(lesson.teacher_id, lesson.time_slot_id, lesson.room_id),
        );
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GeneratedEntry, Room};
    use crate::fixtures::{self, ROOM_BASE, Shape, slot_id};

    fn entry(
        id: EntryId,
        input: &SchedulingInput,
        group: usize,
        teacher: usize,
        slot: TimeSlotId,
    ) -> StoredEntry {
        StoredEntry {
            id,
            lesson: GeneratedEntry {
                time_slot_id: slot,
                grade_id: input.grades[0].id,
                subject_id: input.subjects[0].id,
                teacher_id: input.teachers[teacher].id,
                room_id: None,
                period_index: 0,
                is_double_period: false,
                combined_lesson_id: None,
                group_ids: vec![input.groups[group].id],
            },
        }
    }

    #[test]
    fn clean_edit_has_no_violations() {
        let input = fixtures::minimal_input(Shape {
            groups_per_grade: 2,
            ..Shape::default()
        });
        let edited = entry(1, &input, 0, 0, slot_id(0, 2));
        let others = [entry(2, &input, 1, 0, slot_id(0, 1)), edited.clone()];

        assert_eq!(validate_entry(&input, &edited, &others).unwrap(), vec![]);
    }

    #[test]
    fn clashes_name_the_conflicting_entry() {
        let input = fixtures::minimal_input(Shape::default());
        let edited = entry(1, &input, 0, 0, slot_id(0, 1));
        let others = [entry(2, &input, 0, 0, slot_id(0, 1))];

        let violations = validate_entry(&input, &edited, &others).unwrap();
        assert_eq!(
            violations[..2],
            [
                EntryViolation::TeacherDoubleBooked {
                    slot: slot_id(0, 1),
                    conflicting_entry: 2
                },
                EntryViolation::GroupDoubleBooked {
                    group: input.groups[0].id,
                    slot: slot_id(0, 1),
                    conflicting_entry: 2
                },
            ]
        );
        assert_eq!(
            violations[0].to_string(),
            "Teacher double-booked at slot 1001 (conflicts with entry 2)."
        );
    }

    #[test]
    fn second_slot_of_a_double_period_is_occupied() {
        let mut input = fixtures::minimal_input(Shape {
            groups_per_grade: 2,
            ..Shape::default()
        });
        input.subjects[0].allow_double_periods = true;
        let mut double = entry(2, &input, 1, 0, slot_id(0, 1));
        double.lesson.is_double_period = true;
        let edited = entry(1, &input, 0, 0, slot_id(0, 2));

        let violations = validate_entry(&input, &edited, &[double]).unwrap();
        assert_eq!(
            violations,
            vec![EntryViolation::TeacherDoubleBooked {
                slot: slot_id(0, 2),
                conflicting_entry: 2
            }]
        );
    }

    #[test]
    fn state_based_rules_report_every_breach() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.rooms.push(Room {
            id: ROOM_BASE,
            name: "Lab".into(),
            capacity: 1,
        });
        input.subjects[0].requires_special_room = true;
        input.subjects[0].special_room_id = Some(ROOM_BASE);
        input.subjects[0].max_periods_per_day = 1;
        input.teachers[0].blocked_slot_ids = vec![slot_id(0, 3)];
        input.teachers[0].day_configs[0].max_periods = 1;
        input.grade_day_configs[0].max_periods = 2;
        let edited = entry(1, &input, 0, 0, slot_id(0, 3));
        let mut earlier = entry(2, &input, 0, 0, slot_id(0, 1));
        earlier.lesson.room_id = Some(ROOM_BASE);

        let violations = validate_entry(&input, &edited, &[earlier]).unwrap();
        assert_eq!(
            violations,
            vec![
                EntryViolation::TeacherBlocked {
                    teacher: "Teacher 1".into()
                },
                EntryViolation::TeacherDailyLimit {
                    teacher: "Teacher 1".into(),
                    max: 1
                },
                EntryViolation::SpecialRoom {
                    subject: "Subject 1".into(),
                    required: Some(ROOM_BASE),
                    assigned: None
                },
                EntryViolation::GradeDayLimit {
                    grade: "Grade 1".into()
                },
                EntryViolation::SubjectDailyLimit {
                    subject: "Subject 1".into(),
                    max: 1,
                    group: input.groups[0].id
                },
            ]
        );
        assert_eq!(
            violations[2].to_string(),
            "Subject 'Subject 1' requires special room 600 but assigned to none."
        );
    }

    #[test]
    fn double_in_the_last_slot_has_no_partner() {
        let input = fixtures::minimal_input(Shape::default());
        let mut edited = entry(1, &input, 0, 0, slot_id(0, 3));
        edited.lesson.is_double_period = true;

        let violations = validate_entry(&input, &edited, &[]).unwrap();
        assert!(violations.contains(&EntryViolation::DoublePeriodNotConsecutive));
    }

    #[test]
    fn unknown_slot_short_circuits() {
        let input = fixtures::minimal_input(Shape::default());
        let edited = entry(1, &input, 0, 0, 4242);

        assert_eq!(
            validate_entry(&input, &edited, &[]).unwrap(),
            vec![EntryViolation::UnknownTimeSlot(4242)]
        );
    }
}
