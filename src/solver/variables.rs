use crate::data::{
    CombinedLessonId, GradeId, GroupId, RequirementId, RoomId, SubjectId, TeacherId, TimeSlotId,
};

/// A candidate (teacher, time slot, room) choice for a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Assignment {
    pub teacher_id: TeacherId,
    pub time_slot_id: TimeSlotId,
    pub room_id: Option<RoomId>,
}

impl Assignment {
    pub fn new(teacher_id: TeacherId, time_slot_id: TimeSlotId, room_id: Option<RoomId>) -> Self {
        Self {
            teacher_id,
            time_slot_id,
            room_id,
        }
    }
}

/// Position of a variable inside its [`SchedulingState`](super::state::SchedulingState).
pub type VariableIndex = usize;

/// One weekly occurrence of a subject for a grade, taught to one group or to
/// a mandatorily combined set of groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonVariable {
    pub requirement_id: RequirementId,
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
    /// 0-based occurrence counter within the requirement; doubles come first.
    pub period_index: u32,
    pub group_ids: Vec<GroupId>,
    pub is_double_period: bool,
    pub combined_lesson_id: Option<CombinedLessonId>,
    pub requires_special_room: bool,
    pub special_room_id: Option<RoomId>,
    pub max_periods_per_day: u32,
    pub domain: Vec<Assignment>,
    pub current: Option<Assignment>,
}

impl LessonVariable {
    pub fn is_assigned(&self) -> bool {
        self.current.is_some()
    }

    /// Number of consecutive slots the lesson occupies.
    pub fn slots_needed(&self) -> u32 {
        if self.is_double_period { 2 } else { 1 }
    }

    pub fn shares_group_with(&self, group_ids: &[GroupId]) -> bool {
        self.group_ids.iter().any(|g| group_ids.contains(g))
    }
}
