use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type GradeId = u32;
pub type GroupId = u32;
pub type SubjectId = u32;
pub type RoomId = u32;
pub type TeacherId = u32;
pub type TeachingDayId = u32;
pub type TimeSlotId = u32;
pub type RequirementId = u32;
pub type CombinedLessonId = u32;
pub type EntryId = u32;
pub type TimetableId = u32;

/// A school grade (year level). `sort_order` drives teacher qualification ranges.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: GradeId,
    pub name: String,
    pub sort_order: i32,
}

/// A class group belonging to a grade.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub grade_id: GradeId,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// A subject taught at the school.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub requires_special_room: bool,
    #[serde(default)]
    pub special_room_id: Option<RoomId>,
    pub max_periods_per_day: u32,
    #[serde(default)]
    pub allow_double_periods: bool,
}

/// Represents a physical room with a given capacity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
}

/// A subject a teacher may teach, for grades whose sort order lies in the inclusive range.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualification {
    pub subject_id: SubjectId,
    pub min_grade_sort_order: i32,
    pub max_grade_sort_order: i32,
}

impl Qualification {
    pub fn covers(&self, subject_id: SubjectId, grade_sort_order: i32) -> bool {
        self.subject_id == subject_id
            && (self.min_grade_sort_order..=self.max_grade_sort_order).contains(&grade_sort_order)
    }
}

/// How many periods a teacher may work on a given teaching day.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDayConfig {
    pub teaching_day_id: TeachingDayId,
    pub max_periods: u32,
}

/// Represents a teacher with their qualifications and availability.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    #[serde(default)]
    pub day_configs: Vec<TeacherDayConfig>,
    #[serde(default)]
    pub blocked_slot_ids: Vec<TimeSlotId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub slot_number: u32,
    #[serde(default)]
    pub is_break: bool,
}

/// A day of the week on which lessons take place, with its ordered time slots.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingDay {
    pub id: TeachingDayId,
    pub day_of_week: u32,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
}

/// How many periods of a subject a grade needs every week.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubjectRequirement {
    pub id: RequirementId,
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
    pub periods_per_week: u32,
    #[serde(default)]
    pub prefer_double_periods: bool,
}

/// Groups of one grade that share (mandatory) or may share (optional) a lesson.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedLessonConfig {
    pub id: CombinedLessonId,
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
    pub is_mandatory: bool,
    pub max_groups_per_lesson: u32,
    #[serde(default)]
    pub group_ids: Vec<GroupId>,
}

/// How many periods a grade may have on a given teaching day.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDayConfig {
    pub grade_id: GradeId,
    pub teaching_day_id: TeachingDayId,
    pub max_periods: u32,
}

/// The complete, immutable snapshot needed to generate one timetable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingInput {
    pub grades: Vec<Grade>,
    pub groups: Vec<Group>,
    pub subjects: Vec<Subject>,
    pub rooms: Vec<Room>,
    pub teachers: Vec<Teacher>,
    pub teaching_days: Vec<TeachingDay>,
    pub requirements: Vec<GradeSubjectRequirement>,
    pub combined_lessons: Vec<CombinedLessonConfig>,
    pub grade_day_configs: Vec<GradeDayConfig>,
}

/// Represents a single scheduled lesson in the generated timetable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEntry {
    pub time_slot_id: TimeSlotId,
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub room_id: Option<RoomId>,
    pub period_index: u32,
    pub is_double_period: bool,
    pub combined_lesson_id: Option<CombinedLessonId>,
    pub group_ids: Vec<GroupId>,
}

/// A persisted timetable entry, as handed to the single-entry validator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub id: EntryId,
    #[serde(flatten)]
    pub lesson: GeneratedEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ReportSeverity {
    Error,
    Warning,
    Info,
}

/// The kind of finding a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ReportCategory {
    TeacherSplit,
    GapInTeacherSchedule,
    SubjectClustering,
    DoublePeriodNotUsed,
    CombinedLessonNotUsed,
    InfeasibleConstraint,
}

/// The configuration entity a report or issue points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", content = "id")]
pub enum RelatedEntity {
    Grade(GradeId),
    Subject(SubjectId),
    Teacher(TeacherId),
    TeachingDay(TeachingDayId),
    GradeSubjectRequirement(RequirementId),
    CombinedLessonConfig(CombinedLessonId),
}

/// A diagnostic finding produced after a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub severity: ReportSeverity,
    pub category: ReportCategory,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
}

impl GeneratedReport {
    pub fn new(
        severity: ReportSeverity,
        category: ReportCategory,
        message: impl Into<String>,
        related_entity: Option<RelatedEntity>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            related_entity,
        }
    }
}

impl fmt::Display for GeneratedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}/{:?}] {}", self.severity, self.category, self.message)
    }
}

/// The final output of the generator.
///
/// `quality_score` is only present when every lesson was placed. `reports` is
/// populated for failed runs as well.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub quality_score: Option<f64>,
    pub entries: Vec<GeneratedEntry>,
    pub reports: Vec<GeneratedReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_deserializes_from_camel_case_with_defaults() {
        let json = r#"{
            "grades": [{ "id": 1, "name": "Year 1", "sortOrder": 1 }],
            "groups": [{ "id": 10, "gradeId": 1, "name": "1A" }],
            "subjects": [{ "id": 5, "name": "Chemistry", "requiresSpecialRoom": true,
                           "specialRoomId": 7, "maxPeriodsPerDay": 2 }],
            "teachers": [{ "id": 3, "name": "Ada",
                           "qualifications": [{ "subjectId": 5, "minGradeSortOrder": 1, "maxGradeSortOrder": 4 }] }]
        }"#;

        let input: SchedulingInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.groups[0].sort_order, 0);
        assert_eq!(input.subjects[0].special_room_id, Some(7));
        assert!(!input.subjects[0].allow_double_periods);
        assert!(input.teachers[0].day_configs.is_empty());
        assert!(input.teaching_days.is_empty());
        assert!(input.teachers[0].qualifications[0].covers(5, 4));
        assert!(!input.teachers[0].qualifications[0].covers(5, 5));
    }

    #[test]
    fn stored_entry_flattens_lesson_fields() {
        let entry = StoredEntry {
            id: 9,
            lesson: GeneratedEntry {
                time_slot_id: 1,
                grade_id: 1,
                subject_id: 2,
                teacher_id: 3,
                room_id: None,
                period_index: 0,
                is_double_period: false,
                combined_lesson_id: None,
                group_ids: vec![4],
            },
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], 9);
        assert_eq!(value["teacherId"], 3);
        assert_eq!(value["groupIds"][0], 4);
    }

    #[test]
    fn related_entity_is_tagged() {
        let value = serde_json::to_value(RelatedEntity::Teacher(4)).unwrap();
        assert_eq!(value["type"], "Teacher");
        assert_eq!(value["id"], 4);
    }
}
