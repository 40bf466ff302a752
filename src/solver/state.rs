//! Mutable search state: the lesson variables plus the usage indices that
//! make the hard-constraint checks cheap.
//!
//! The indices always describe exactly the union of the variables' current
//! assignments, the implicit second slot of double periods included. They are
//! only ever changed through [`SchedulingState::assign`] and
//! [`SchedulingState::undo`], which are exact inverses of each other.

use super::catalog::Catalog;
use super::variables::{Assignment, LessonVariable, VariableIndex};
use crate::data::{GroupId, RoomId, SubjectId, TeacherId, TeachingDayId, TimeSlotId};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulingState {
    pub variables: Vec<LessonVariable>,
    teacher_slots: SlotIndex<TeacherId>,
    group_slots: SlotIndex<GroupId>,
    room_slots: SlotIndex<RoomId>,
    teacher_day_count: HashMap<(TeacherId, TeachingDayId), u32>,
    group_subject_day_count: HashMap<(GroupId, SubjectId, TeachingDayId), u32>,
}

/// The slots a lesson starting at `slot_id` occupies: the slot itself and,
/// for double periods, the next non-break slot of the day when there is one.
pub fn occupied_slots(
    catalog: &Catalog<'_>,
    slot_id: TimeSlotId,
    is_double: bool,
) -> Vec<TimeSlotId> {
    let mut slots = vec![slot_id];
    if is_double {
        if let Some(next) = catalog.slot(slot_id).and_then(|s| s.next_teaching_slot) {
            slots.push(next);
        }
    }
    slots
}

type SlotIndex<K> = HashMap<K, HashSet<TimeSlotId>>;

fn occupy<K: Eq + Hash>(index: &mut SlotIndex<K>, key: K, slots: &[TimeSlotId]) {
    index.entry(key).or_default().extend(slots.iter().copied());
}

fn release<K: Eq + Hash>(index: &mut SlotIndex<K>, key: K, slots: &[TimeSlotId]) {
    if let Some(used) = index.get_mut(&key) {
        for slot in slots {
            used.remove(slot);
        }
        if used.is_empty() {
            index.remove(&key);
        }
    }
}

fn increment<K: Eq + Hash>(counts: &mut HashMap<K, u32>, key: K, by: u32) {
    *counts.entry(key).or_insert(0) += by;
}

fn decrement<K: Eq + Hash>(counts: &mut HashMap<K, u32>, key: K, by: u32) {
    if let Some(count) = counts.get_mut(&key) {
        *count = count.saturating_sub(by);
        if *count == 0 {
            counts.remove(&key);
        }
    }
}

impl SchedulingState {
    pub fn new(variables: Vec<LessonVariable>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Indices of the variables that have no current assignment.
    pub fn unassigned(&self) -> impl Iterator<Item = VariableIndex> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_assigned())
            .map(|(i, _)| i)
    }

    pub fn assigned_count(&self) -> usize {
        self.variables.iter().filter(|v| v.is_assigned()).count()
    }

    /// Binds `assignment` to the variable and records every slot it occupies.
    pub fn assign(&mut self, catalog: &Catalog<'_>, index: VariableIndex, assignment: Assignment) {
        let Some(day_id) = catalog.slot(assignment.time_slot_id).map(|s| s.day_id) else {
            return;
        };
        let variable = &mut self.variables[index];
        variable.current = Some(assignment);
        let slots = occupied_slots(catalog, assignment.time_slot_id, variable.is_double_period);
        let used = slots.len() as u32;

        occupy(&mut self.teacher_slots, assignment.teacher_id, &slots);
        for &group_id in &variable.group_ids {
            occupy(&mut self.group_slots, group_id, &slots);
            increment(
                &mut self.group_subject_day_count,
                (group_id, variable.subject_id, day_id),
                used,
            );
        }
        if let Some(room_id) = assignment.room_id {
            occupy(&mut self.room_slots, room_id, &slots);
        }
        increment(&mut self.teacher_day_count, (assignment.teacher_id, day_id), used);
    }

    /// Clears the variable's assignment and releases its slots, returning what was bound.
    pub fn undo(&mut self, catalog: &Catalog<'_>, index: VariableIndex) -> Option<Assignment> {
        let variable = &mut self.variables[index];
        let assignment = variable.current.take()?;
        let Some(day_id) = catalog.slot(assignment.time_slot_id).map(|s| s.day_id) else {
            return Some(assignment);
        };
        let slots = occupied_slots(catalog, assignment.time_slot_id, variable.is_double_period);
        let used = slots.len() as u32;

        release(&mut self.teacher_slots, assignment.teacher_id, &slots);
        for &group_id in &variable.group_ids {
            release(&mut self.group_slots, group_id, &slots);
            decrement(
                &mut self.group_subject_day_count,
                (group_id, variable.subject_id, day_id),
                used,
            );
        }
        if let Some(room_id) = assignment.room_id {
            release(&mut self.room_slots, room_id, &slots);
        }
        decrement(&mut self.teacher_day_count, (assignment.teacher_id, day_id), used);
        Some(assignment)
    }

    pub fn teacher_busy(&self, teacher_id: TeacherId, slot_id: TimeSlotId) -> bool {
        self.teacher_slots
            .get(&teacher_id)
            .is_some_and(|s| s.contains(&slot_id))
    }

    pub fn group_busy(&self, group_id: GroupId, slot_id: TimeSlotId) -> bool {
        self.group_slots
            .get(&group_id)
            .is_some_and(|s| s.contains(&slot_id))
    }

    pub fn room_busy(&self, room_id: RoomId, slot_id: TimeSlotId) -> bool {
        self.room_slots
            .get(&room_id)
            .is_some_and(|s| s.contains(&slot_id))
    }

    /// Slots the teacher currently occupies anywhere in the week.
    pub fn teacher_slots(&self, teacher_id: TeacherId) -> Option<&HashSet<TimeSlotId>> {
        self.teacher_slots.get(&teacher_id)
    }

    pub fn teacher_day_count(&self, teacher_id: TeacherId, day_id: TeachingDayId) -> u32 {
        self.teacher_day_count
            .get(&(teacher_id, day_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn group_subject_day_count(
        &self,
        group_id: GroupId,
        subject_id: SubjectId,
        day_id: TeachingDayId,
    ) -> u32 {
        self.group_subject_day_count
            .get(&(group_id, subject_id, day_id))
            .copied()
            .unwrap_or(0)
    }
}
