//! The scheduling engine: variable construction, hard and soft constraints,
//! backtracking search and post-solve reports, orchestrated by [`generate`].

pub mod catalog;
pub mod constraints;
pub mod control;
pub mod propagation;
pub mod report;
pub mod scoring;
pub mod search;
pub mod state;
pub mod variables;

pub use control::{CancellationToken, ProgressSink};
pub use search::SearchStats;

use crate::data::{
    GeneratedEntry, GeneratedReport, GenerationResult, RelatedEntity, ReportCategory,
    ReportSeverity, SchedulingInput,
};
use crate::error::GenerationError;
use catalog::Catalog;
use log::{info, warn};
use search::BacktrackingSearch;
use state::SchedulingState;
use std::time::Instant;

/// Generates a timetable for `input`.
///
/// `progress` is called synchronously after every committed assignment with
/// `assigned * 100 / total`. Backtracking retracts assignments, so the values
/// are **not monotonic**.
///
/// Returns `Err(GenerationError::Cancelled)` once `cancellation` is set and the
/// search notices it; no partial result is produced. An infeasible input is not
/// an error: it yields `success == false` with the reasons in `reports`.
pub fn generate(
    input: &SchedulingInput,
    progress: Option<&dyn ProgressSink>,
    cancellation: &CancellationToken,
) -> Result<GenerationResult, GenerationError> {
    let start_time = Instant::now();
    let catalog = Catalog::new(input)?;

    info!(
        "Building lesson variables for {} requirements, {} teachers and {} teaching slots...",
        input.requirements.len(),
        input.teachers.len(),
        catalog.teaching_slots().len()
    );
    let mut state = propagation::build_state(&catalog);

    if let Some(empty) = state.variables.iter().find(|v| v.domain.is_empty()) {
        let subject = catalog
            .subject(empty.subject_id)
            .map(|s| s.name.as_str())
            .unwrap_or_default();
        warn!(
            "Subject '{}' period {} has no candidate assignments; skipping search.",
            subject, empty.period_index
        );
        let mut reports = vec![GeneratedReport::new(
            ReportSeverity::Error,
            ReportCategory::InfeasibleConstraint,
            format!(
                "No feasible assignments exist for subject '{}', period index {}. Check teacher qualifications and time slot configuration.",
                subject, empty.period_index
            ),
            Some(RelatedEntity::GradeSubjectRequirement(empty.requirement_id)),
        )];
        reports.extend(report::generate_reports(&catalog, &state));
        return Ok(GenerationResult {
            success: false,
            quality_score: None,
            entries: Vec::new(),
            reports,
        });
    }

    info!("Starting backtracking search over {} lesson variables...", state.len());
    let mut search = BacktrackingSearch::new(&catalog, progress, cancellation);
    let solved = search.solve(&mut state)? && constraints::all_scheduled(&state);
    info!(
        "Search {} in {:.2?} ({}).",
        if solved { "succeeded" } else { "exhausted" },
        start_time.elapsed(),
        search.stats()
    );

    let quality_score = solved.then(|| scoring::quality_score(&catalog, &state));
    if let Some(score) = quality_score {
        info!("Timetable quality score: {score:.2}.");
    }
    let entries = collect_entries(&state);
    let reports = report::generate_reports(&catalog, &state);

    Ok(GenerationResult {
        success: solved,
        quality_score,
        entries,
        reports,
    })
}

fn collect_entries(state: &SchedulingState) -> Vec<GeneratedEntry> {
    state
        .variables
        .iter()
        .filter_map(|v| {
            let assignment = v.current?;
            Some(GeneratedEntry {
                time_slot_id: assignment.time_slot_id,
                grade_id: v.grade_id,
                subject_id: v.subject_id,
                teacher_id: assignment.teacher_id,
                room_id: assignment.room_id,
                period_index: v.period_index,
                is_double_period: v.is_double_period,
                combined_lesson_id: v.combined_lesson_id,
                group_ids: v.group_ids.clone(),
            })
        })
        .collect()
}
