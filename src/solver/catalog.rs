//! Read-only lookup tables over a [`SchedulingInput`].
//!
//! Everything the constraint checks need to answer in constant time is
//! computed here once per generation run: the slot table with non-break
//! positions, per-day slot order, daily limits and blocked slots.

use crate::data::{
    Grade, GradeId, Group, GroupId, SchedulingInput, Subject, SubjectId, Teacher, TeacherId,
    TeachingDay, TeachingDayId, TimeSlotId,
};
use crate::error::GenerationError;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

/// A time slot together with the facts derived from its teaching day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub id: TimeSlotId,
    pub day_id: TeachingDayId,
    pub slot_number: u32,
    pub is_break: bool,
    /// Number of non-break slots of the same day whose slot number is at most this one.
    pub position: u32,
    /// The next non-break slot of the same day, if any.
    pub next_teaching_slot: Option<TimeSlotId>,
}

#[derive(Debug)]
pub struct Catalog<'a> {
    input: &'a SchedulingInput,
    days: Vec<&'a TeachingDay>,
    slots: HashMap<TimeSlotId, SlotInfo>,
    day_slots: HashMap<TeachingDayId, Vec<TimeSlotId>>,
    teaching_slots: Vec<TimeSlotId>,
    grades: HashMap<GradeId, &'a Grade>,
    groups: HashMap<GroupId, &'a Group>,
    subjects: HashMap<SubjectId, &'a Subject>,
    teachers: HashMap<TeacherId, &'a Teacher>,
    grade_day_limits: HashMap<(GradeId, TeachingDayId), u32>,
    teacher_day_limits: HashMap<(TeacherId, TeachingDayId), u32>,
    blocked: HashSet<(TeacherId, TimeSlotId)>,
}

impl<'a> Catalog<'a> {
    /// Indexes the input, rejecting references to entities that do not exist.
    pub fn new(input: &'a SchedulingInput) -> Result<Self, GenerationError> {
        let days: Vec<&TeachingDay> = input
            .teaching_days
            .iter()
            .sorted_by_key(|d| (d.sort_order, d.day_of_week, d.id))
            .collect();

        let mut slots = HashMap::new();
        let mut day_slots = HashMap::new();
        let mut teaching_slots = Vec::new();
        for day in &days {
            let ordered = day.time_slots.iter().sorted_by_key(|s| s.slot_number).collect_vec();
            let mut position = 0;
            for (i, slot) in ordered.iter().enumerate() {
                if !slot.is_break {
                    position += 1;
                    teaching_slots.push(slot.id);
                }
                let next_teaching_slot = ordered[i + 1..]
                    .iter()
                    .find(|s| !s.is_break && s.slot_number > slot.slot_number)
                    .map(|s| s.id);
                let info = SlotInfo {
                    id: slot.id,
                    day_id: day.id,
                    slot_number: slot.slot_number,
                    is_break: slot.is_break,
                    position,
                    next_teaching_slot,
                };
                if slots.insert(slot.id, info).is_some() {
                    return Err(GenerationError::invalid(format!(
                        "time slot {} appears more than once",
                        slot.id
                    )));
                }
            }
            if day_slots
                .insert(day.id, ordered.iter().map(|s| s.id).collect())
                .is_some()
            {
                return Err(GenerationError::invalid(format!(
                    "teaching day {} appears more than once",
                    day.id
                )));
            }
        }

        let grades: HashMap<_, _> = input.grades.iter().map(|g| (g.id, g)).collect();
        let groups: HashMap<_, _> = input.groups.iter().map(|g| (g.id, g)).collect();
        let subjects: HashMap<_, _> = input.subjects.iter().map(|s| (s.id, s)).collect();
        let teachers: HashMap<_, _> = input.teachers.iter().map(|t| (t.id, t)).collect();

        for group in &input.groups {
            if !grades.contains_key(&group.grade_id) {
                return Err(GenerationError::invalid(format!(
                    "group {} references unknown grade {}",
                    group.id, group.grade_id
                )));
            }
        }
        for req in &input.requirements {
            if !grades.contains_key(&req.grade_id) || !subjects.contains_key(&req.subject_id) {
                return Err(GenerationError::invalid(format!(
                    "requirement {} references unknown grade {} or subject {}",
                    req.id, req.grade_id, req.subject_id
                )));
            }
        }
        for combined in &input.combined_lessons {
            if !grades.contains_key(&combined.grade_id)
                || !subjects.contains_key(&combined.subject_id)
            {
                return Err(GenerationError::invalid(format!(
                    "combined lesson {} references unknown grade {} or subject {}",
                    combined.id, combined.grade_id, combined.subject_id
                )));
            }
            if let Some(group_id) = combined.group_ids.iter().find(|g| !groups.contains_key(g)) {
                return Err(GenerationError::invalid(format!(
                    "combined lesson {} references unknown group {}",
                    combined.id, group_id
                )));
            }
        }

        let grade_day_limits = input
            .grade_day_configs
            .iter()
            .map(|c| ((c.grade_id, c.teaching_day_id), c.max_periods))
            .collect();
        let teacher_day_limits = input
            .teachers
            .iter()
            .flat_map(|t| {
                t.day_configs
                    .iter()
                    .map(move |dc| ((t.id, dc.teaching_day_id), dc.max_periods))
            })
            .collect();
        let blocked = input
            .teachers
            .iter()
            .flat_map(|t| t.blocked_slot_ids.iter().map(move |s| (t.id, *s)))
            .collect();

        Ok(Self {
            input,
            days,
            slots,
            day_slots,
            teaching_slots,
            grades,
            groups,
            subjects,
            teachers,
            grade_day_limits,
            teacher_day_limits,
            blocked,
        })
    }

    pub fn input(&self) -> &'a SchedulingInput {
        self.input
    }

    /// Teaching days in calendar order.
    pub fn days(&self) -> &[&'a TeachingDay] {
        &self.days
    }

    pub fn slot(&self, id: TimeSlotId) -> Option<&SlotInfo> {
        self.slots.get(&id)
    }

    /// Every non-break slot of the week, days in calendar order and slots by number.
    pub fn teaching_slots(&self) -> &[TimeSlotId] {
        &self.teaching_slots
    }

    /// All slots of one day (breaks included) ordered by slot number.
    pub fn day_slots(&self, day_id: TeachingDayId) -> &[TimeSlotId] {
        self.day_slots.get(&day_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn grade(&self, id: GradeId) -> Option<&'a Grade> {
        self.grades.get(&id).copied()
    }

    pub fn group(&self, id: GroupId) -> Option<&'a Group> {
        self.groups.get(&id).copied()
    }

    pub fn subject(&self, id: SubjectId) -> Option<&'a Subject> {
        self.subjects.get(&id).copied()
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&'a Teacher> {
        self.teachers.get(&id).copied()
    }

    pub fn grade_day_limit(&self, grade_id: GradeId, day_id: TeachingDayId) -> Option<u32> {
        self.grade_day_limits.get(&(grade_id, day_id)).copied()
    }

    pub fn teacher_day_limit(&self, teacher_id: TeacherId, day_id: TeachingDayId) -> Option<u32> {
        self.teacher_day_limits.get(&(teacher_id, day_id)).copied()
    }

    pub fn is_blocked(&self, teacher_id: TeacherId, slot_id: TimeSlotId) -> bool {
        self.blocked.contains(&(teacher_id, slot_id))
    }

    /// Teachers qualified for the subject at the grade, in input order.
    pub fn qualified_teachers(&self, subject_id: SubjectId, grade_id: GradeId) -> Vec<TeacherId> {
        let Some(grade) = self.grade(grade_id) else {
            return Vec::new();
        };
        self.input
            .teachers
            .iter()
            .filter(|t| {
                t.qualifications
                    .iter()
                    .any(|q| q.covers(subject_id, grade.sort_order))
            })
            .map(|t| t.id)
            .collect()
    }

    /// True when two slots of the same day are neighbours, or only break slots
    /// lie between them.
    pub fn only_breaks_between(&self, a: &SlotInfo, b: &SlotInfo) -> bool {
        if a.day_id != b.day_id || a.id == b.id {
            return false;
        }
        let (lo, hi) = if a.slot_number < b.slot_number {
            (a.slot_number, b.slot_number)
        } else {
            (b.slot_number, a.slot_number)
        };
        self.day_slots(a.day_id)
            .iter()
            .filter_map(|id| self.slot(*id))
            .filter(|s| s.slot_number > lo && s.slot_number < hi)
            .all(|s| s.is_break)
    }
}
