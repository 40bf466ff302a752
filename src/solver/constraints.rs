//! Hard constraints: the single source of truth for whether a candidate
//! assignment is legal against the current state.
//!
//! Rules that do not depend on the state (blocked slots, special rooms, the
//! grade's daily window) are also used while building the initial domains.

use super::catalog::{Catalog, SlotInfo};
use super::state::SchedulingState;
use super::variables::{Assignment, LessonVariable};
use crate::data::{GradeId, GroupId, RoomId, TeacherId, TimeSlotId};
use std::fmt;

/// The hard rules a candidate can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardConstraint {
    /// The slot is unknown or a break.
    UnknownSlot,
    TeacherDoubleBooked,
    GroupDoubleBooked,
    RoomDoubleBooked,
    TeacherBlocked,
    TeacherDailyLimit,
    SpecialRoom,
    GradeDayLimit,
    DoublePeriodConsecutive,
    SubjectDailyLimit,
}

impl fmt::Display for HardConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HardConstraint::UnknownSlot => "slot is not a teaching slot",
            HardConstraint::TeacherDoubleBooked => "teacher already busy",
            HardConstraint::GroupDoubleBooked => "group already busy",
            HardConstraint::RoomDoubleBooked => "room already busy",
            HardConstraint::TeacherBlocked => "teacher blocked",
            HardConstraint::TeacherDailyLimit => "teacher daily limit",
            HardConstraint::SpecialRoom => "special room mismatch",
            HardConstraint::GradeDayLimit => "outside grade day window",
            HardConstraint::DoublePeriodConsecutive => "no free consecutive slot",
            HardConstraint::SubjectDailyLimit => "subject daily limit",
        };
        f.write_str(text)
    }
}

/// The teacher is not already teaching in the slot.
pub fn teacher_free(state: &SchedulingState, teacher_id: TeacherId, slot_id: TimeSlotId) -> bool {
    !state.teacher_busy(teacher_id, slot_id)
}

/// None of the groups already has a lesson in the slot.
pub fn groups_free(state: &SchedulingState, group_ids: &[GroupId], slot_id: TimeSlotId) -> bool {
    group_ids.iter().all(|g| !state.group_busy(*g, slot_id))
}

/// The room, if any, is not in use in the slot.
pub fn room_free(state: &SchedulingState, room_id: Option<RoomId>, slot_id: TimeSlotId) -> bool {
    room_id.is_none_or(|r| !state.room_busy(r, slot_id))
}

/// The teacher has not blocked the slot.
pub fn teacher_not_blocked(
    catalog: &Catalog<'_>,
    teacher_id: TeacherId,
    slot_id: TimeSlotId,
) -> bool {
    !catalog.is_blocked(teacher_id, slot_id)
}

/// The teacher's periods that day plus `needed` stay within their day config.
/// A teacher without a config for the day cannot teach on it.
pub fn teacher_daily_limit(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    teacher_id: TeacherId,
    slot: &SlotInfo,
    needed: u32,
) -> bool {
    catalog
        .teacher_day_limit(teacher_id, slot.day_id)
        .is_some_and(|max| state.teacher_day_count(teacher_id, slot.day_id) + needed <= max)
}

/// Every lesson has been placed. Checked once, after the search.
pub fn all_scheduled(state: &SchedulingState) -> bool {
    state.variables.iter().all(LessonVariable::is_assigned)
}

/// A subject that needs a special room gets exactly that room.
pub fn special_room(variable: &LessonVariable, room_id: Option<RoomId>) -> bool {
    !variable.requires_special_room || room_id == variable.special_room_id
}

/// The slot's non-break position fits the grade's window for the day.
/// A grade without a config for the day has no window there.
pub fn grade_day_limit(catalog: &Catalog<'_>, grade_id: GradeId, slot: &SlotInfo) -> bool {
    !slot.is_break
        && catalog
            .grade_day_limit(grade_id, slot.day_id)
            .is_some_and(|max| slot.position <= max)
}

/// A double period also needs the next non-break slot, free for the same
/// teacher, groups and room, inside the grade's window and not blocked.
pub fn double_period_consecutive(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    variable: &LessonVariable,
    candidate: &Assignment,
    slot: &SlotInfo,
) -> bool {
    let Some(next) = slot.next_teaching_slot.and_then(|id| catalog.slot(id)) else {
        return false;
    };
    teacher_free(state, candidate.teacher_id, next.id)
        && groups_free(state, &variable.group_ids, next.id)
        && room_free(state, candidate.room_id, next.id)
        && grade_day_limit(catalog, variable.grade_id, next)
        && teacher_not_blocked(catalog, candidate.teacher_id, next.id)
}

/// No group exceeds the subject's periods per day.
pub fn subject_daily_limit(
    state: &SchedulingState,
    variable: &LessonVariable,
    slot: &SlotInfo,
) -> bool {
    variable.group_ids.iter().all(|g| {
        let used = state.group_subject_day_count(*g, variable.subject_id, slot.day_id);
        used + variable.slots_needed() <= variable.max_periods_per_day
    })
}

/// Returns the first hard rule the candidate breaks, checking in rule order.
pub fn first_violation(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    variable: &LessonVariable,
    candidate: &Assignment,
) -> Option<HardConstraint> {
    let Some(slot) = catalog.slot(candidate.time_slot_id).filter(|s| !s.is_break) else {
        return Some(HardConstraint::UnknownSlot);
    };
    let slot_id = slot.id;

    if !teacher_free(state, candidate.teacher_id, slot_id) {
        return Some(HardConstraint::TeacherDoubleBooked);
    }
    if !groups_free(state, &variable.group_ids, slot_id) {
        return Some(HardConstraint::GroupDoubleBooked);
    }
    if !room_free(state, candidate.room_id, slot_id) {
        return Some(HardConstraint::RoomDoubleBooked);
    }
    if !teacher_not_blocked(catalog, candidate.teacher_id, slot_id) {
        return Some(HardConstraint::TeacherBlocked);
    }
    if !teacher_daily_limit(catalog, state, candidate.teacher_id, slot, variable.slots_needed()) {
        return Some(HardConstraint::TeacherDailyLimit);
    }
    if !special_room(variable, candidate.room_id) {
        return Some(HardConstraint::SpecialRoom);
    }
    if !grade_day_limit(catalog, variable.grade_id, slot) {
        return Some(HardConstraint::GradeDayLimit);
    }
    if !subject_daily_limit(state, variable, slot) {
        return Some(HardConstraint::SubjectDailyLimit);
    }
    if variable.is_double_period
        && !double_period_consecutive(catalog, state, variable, candidate, slot)
    {
        return Some(HardConstraint::DoublePeriodConsecutive);
    }
    None
}

/// True when the candidate satisfies every hard constraint against `state`.
pub fn is_valid(
    catalog: &Catalog<'_>,
    state: &SchedulingState,
    variable: &LessonVariable,
    candidate: &Assignment,
) -> bool {
    first_violation(catalog, state, variable, candidate).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Room;
    use crate::fixtures::{self, ROOM_BASE, Shape, slot_id};
    use crate::solver::propagation::build_state;

    fn at(teacher: TeacherId, slot_number: u32) -> Assignment {
        Assignment::new(teacher, slot_id(0, slot_number), None)
    }

    fn two_groups() -> crate::data::SchedulingInput {
        fixtures::minimal_input(Shape {
            groups_per_grade: 2,
            teachers: 2,
            ..Shape::default()
        })
    }

    #[test]
    fn rejects_busy_teacher_and_allows_other_slot() {
        let input = two_groups();
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        let teacher = input.teachers[0].id;
        state.assign(&catalog, 0, Assignment::new(teacher, slot_id(0, 1), None));

        let other = state.variables[1].clone();
        assert_eq!(
            first_violation(&catalog, &state, &other, &at(teacher, 1)),
            Some(HardConstraint::TeacherDoubleBooked)
        );
        assert!(is_valid(&catalog, &state, &other, &at(teacher, 2)));
    }

    #[test]
    fn rejects_busy_group() {
        let input = fixtures::minimal_input(Shape {
            subjects: 2,
            teachers: 2,
            ..Shape::default()
        });
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        state.assign(&catalog, 0, Assignment::new(input.teachers[0].id, slot_id(0, 1), None));

        let second_subject = state.variables[1].clone();
        let candidate = Assignment::new(input.teachers[1].id, slot_id(0, 1), None);
        assert_eq!(
            first_violation(&catalog, &state, &second_subject, &candidate),
            Some(HardConstraint::GroupDoubleBooked)
        );
    }

    #[test]
    fn rejects_busy_room_and_ignores_missing_room() {
        let input = two_groups();
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        let room = ROOM_BASE;
        let in_room = Assignment::new(input.teachers[0].id, slot_id(0, 1), Some(room));
        state.assign(&catalog, 0, in_room);

        assert!(!room_free(&state, Some(room), slot_id(0, 1)));
        assert!(room_free(&state, Some(room), slot_id(0, 2)));
        assert!(room_free(&state, None, slot_id(0, 1)));
    }

    #[test]
    fn rejects_blocked_slot() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.teachers[0].blocked_slot_ids.push(slot_id(0, 2));
        let catalog = Catalog::new(&input).unwrap();
        let state = build_state(&catalog);
        let variable = state.variables[0].clone();

        let candidate = Assignment::new(input.teachers[0].id, slot_id(0, 2), None);
        assert_eq!(
            first_violation(&catalog, &state, &variable, &candidate),
            Some(HardConstraint::TeacherBlocked)
        );
    }

    #[test]
    fn rejects_teacher_over_daily_maximum() {
        let mut input = two_groups();
        input.teachers[0].day_configs[0].max_periods = 1;
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        let teacher = input.teachers[0].id;
        state.assign(&catalog, 0, Assignment::new(teacher, slot_id(0, 1), None));

        let other = state.variables[1].clone();
        assert_eq!(
            first_violation(&catalog, &state, &other, &at(teacher, 2)),
            Some(HardConstraint::TeacherDailyLimit)
        );
    }

    #[test]
    fn rejects_teacher_without_day_config() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.teachers[0].day_configs.clear();
        let catalog = Catalog::new(&input).unwrap();
        let state = build_state(&catalog);
        let variable = state.variables[0].clone();
        assert!(variable.domain.is_empty());

        let candidate = Assignment::new(input.teachers[0].id, slot_id(0, 1), None);
        assert_eq!(
            first_violation(&catalog, &state, &variable, &candidate),
            Some(HardConstraint::TeacherDailyLimit)
        );
    }

    #[test]
    fn special_room_requires_exactly_the_configured_room() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.rooms.push(Room {
            id: ROOM_BASE,
            name: "Lab".into(),
            capacity: 30,
        });
        input.rooms.push(Room {
            id: ROOM_BASE + 1,
            name: "Hall".into(),
            capacity: 90,
        });
        input.subjects[0].requires_special_room = true;
        input.subjects[0].special_room_id = Some(ROOM_BASE);
        let catalog = Catalog::new(&input).unwrap();
        let state = build_state(&catalog);
        let variable = state.variables[0].clone();
        let teacher = input.teachers[0].id;

        let lab = Assignment::new(teacher, slot_id(0, 1), Some(ROOM_BASE));
        let hall = Assignment::new(teacher, slot_id(0, 1), Some(ROOM_BASE + 1));
        assert!(is_valid(&catalog, &state, &variable, &lab));
        assert_eq!(
            first_violation(&catalog, &state, &variable, &hall),
            Some(HardConstraint::SpecialRoom)
        );
        assert_eq!(
            first_violation(&catalog, &state, &variable, &at(teacher, 1)),
            Some(HardConstraint::SpecialRoom)
        );
    }

    #[test]
    fn rejects_slot_past_grade_window() {
        let mut input = fixtures::minimal_input(Shape::default());
        input.grade_day_configs[0].max_periods = 2;
        let catalog = Catalog::new(&input).unwrap();
        let state = build_state(&catalog);
        let variable = state.variables[0].clone();
        let teacher = input.teachers[0].id;

        assert!(is_valid(&catalog, &state, &variable, &at(teacher, 2)));
        assert_eq!(
            first_violation(&catalog, &state, &variable, &at(teacher, 3)),
            Some(HardConstraint::GradeDayLimit)
        );
    }

    #[test]
    fn double_period_requires_free_following_slot() {
        let mut input = fixtures::minimal_input(Shape {
            subjects: 2,
            teachers: 2,
            periods_per_week: 2,
            slots_per_day: 4,
            ..Shape::default()
        });
        input.subjects[0].allow_double_periods = true;
        input.requirements[0].prefer_double_periods = true;
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        let double = state.variables[0].clone();
        assert!(double.is_double_period);

        // Second subject (two singles) occupies slot 2.
        state.assign(&catalog, 1, Assignment::new(input.teachers[1].id, slot_id(0, 2), None));

        let teacher = input.teachers[0].id;
        assert_eq!(
            first_violation(&catalog, &state, &double, &at(teacher, 1)),
            Some(HardConstraint::DoublePeriodConsecutive)
        );
        assert!(is_valid(&catalog, &state, &double, &at(teacher, 3)));
        assert_eq!(
            first_violation(&catalog, &state, &double, &at(teacher, 4)),
            Some(HardConstraint::DoublePeriodConsecutive)
        );
    }

    #[test]
    fn rejects_subject_over_daily_maximum() {
        let mut input = fixtures::minimal_input(Shape {
            periods_per_week: 2,
            ..Shape::default()
        });
        input.subjects[0].max_periods_per_day = 1;
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        let teacher = input.teachers[0].id;
        state.assign(&catalog, 0, Assignment::new(teacher, slot_id(0, 1), None));

        let second = state.variables[1].clone();
        assert_eq!(
            first_violation(&catalog, &state, &second, &at(teacher, 2)),
            Some(HardConstraint::SubjectDailyLimit)
        );
    }

    #[test]
    fn violations_read_as_plain_reasons() {
        assert_eq!(HardConstraint::TeacherDoubleBooked.to_string(), "teacher already busy");
        assert_eq!(
            HardConstraint::DoublePeriodConsecutive.to_string(),
            "no free consecutive slot"
        );
    }

    #[test]
    fn all_scheduled_holds_only_once_everything_is_placed() {
        let input = fixtures::minimal_input(Shape::default());
        let catalog = Catalog::new(&input).unwrap();
        let mut state = build_state(&catalog);
        assert!(!all_scheduled(&state));

        state.assign(&catalog, 0, Assignment::new(input.teachers[0].id, slot_id(0, 1), None));
        assert!(all_scheduled(&state));
    }
}
