use crate::api::{db_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use loafly_core::timeline::{
    format_relative_time, generate_bake_timeline, minutes_until_next_event, overdue_events,
    update_timeline_progress, upcoming_events, TimelineEvent,
};
use loafly_core::{BakeTimeline, StepExecutionStatus, StepProgress, TimelineStep};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detail::{load_bake_steps, BakeStepResponse};
use super::find_bake;

const UPCOMING_EVENT_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeTimelineResponse {
    pub timeline: BakeTimeline,
    pub upcoming: Vec<TimelineEvent>,
    pub overdue: Vec<TimelineEvent>,
    pub minutes_until_next_event: Option<i64>,
    /// e.g. "in 15min" or "5min ago"
    pub next_event_relative: Option<String>,
}

/// Lay the bake's steps out from its start and replay what has been recorded.
fn project_timeline(steps: &[BakeStepResponse], start: DateTime<Utc>) -> BakeTimeline {
    let planned: Vec<TimelineStep> = steps
        .iter()
        .map(|step| TimelineStep {
            step_id: step.id,
            name: Some(step.step_name.clone()),
            parameters: step
                .parameter_values
                .iter()
                .filter_map(|v| {
                    v.planned_value
                        .clone()
                        .map(|value| (v.parameter_name.clone(), value))
                })
                .collect(),
        })
        .collect();

    let mut timeline = generate_bake_timeline(&planned, start);

    for step in steps {
        if let Some(at) = step.start_timestamp {
            timeline = update_timeline_progress(timeline, step.id, StepProgress::Started, at);
        }
        let finished = match StepExecutionStatus::from_str(&step.status) {
            Some(StepExecutionStatus::Completed) => Some(StepProgress::Completed),
            Some(StepExecutionStatus::Skipped) => Some(StepProgress::Skipped),
            _ => None,
        };
        if let (Some(progress), Some(at)) = (finished, step.finish_timestamp) {
            timeline = update_timeline_progress(timeline, step.id, progress, at);
        }
    }

    timeline
}

fn timeline_response(timeline: BakeTimeline, now: DateTime<Utc>) -> BakeTimelineResponse {
    let upcoming = upcoming_events(&timeline, now, UPCOMING_EVENT_COUNT)
        .into_iter()
        .cloned()
        .collect();
    let overdue = overdue_events(&timeline, now).into_iter().cloned().collect();
    let minutes_until_next_event = minutes_until_next_event(&timeline, now);
    let next_event_relative = timeline
        .next_event
        .as_ref()
        .map(|e| format_relative_time(e.scheduled_at, now));

    BakeTimelineResponse {
        timeline,
        upcoming,
        overdue,
        minutes_until_next_event,
        next_event_relative,
    }
}

#[utoipa::path(
    get,
    path = "/api/bakes/{id}/timeline",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID")
    ),
    responses(
        (status = 200, description = "Projected schedule with recorded progress", body = BakeTimelineResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_bake_timeline(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let bake = match find_bake(&mut conn, user.id, id) {
        Ok(b) => b,
        Err(response) => return response,
    };

    let steps = match load_bake_steps(&mut conn, &[bake.id]) {
        Ok(mut s) => s.remove(&bake.id).unwrap_or_default(),
        Err(e) => return db_error_response(&e, "Failed to fetch bake steps"),
    };

    let timeline = project_timeline(&steps, bake.start_timestamp);
    (StatusCode::OK, Json(timeline_response(timeline, Utc::now()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::bakes::detail::BakeParameterValueResponse;
    use chrono::{Duration, TimeZone};
    use loafly_core::timeline::{TimelineEventKind, TimelineEventStatus};
    use serde_json::json;

    fn step(n: u128, name: &str, status: &str) -> BakeStepResponse {
        BakeStepResponse {
            id: Uuid::from_u128(n),
            bake_id: Uuid::from_u128(100),
            recipe_step_id: None,
            order: n as i32,
            step_name: name.to_string(),
            description: None,
            status: status.to_string(),
            start_timestamp: None,
            finish_timestamp: None,
            deviations: None,
            notes: None,
            parameter_values: vec![],
            ingredients: vec![],
        }
    }

    fn duration(step_id: Uuid, minutes: i64) -> BakeParameterValueResponse {
        BakeParameterValueResponse {
            id: Uuid::new_v4(),
            bake_step_id: step_id,
            parameter_id: Uuid::new_v4(),
            parameter_name: "duration".to_string(),
            parameter_type: "DURATION".to_string(),
            planned_value: Some(json!(minutes)),
            actual_value: None,
            notes: None,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_recorded_progress_is_replayed() {
        let mut mix = step(1, "Mix", "COMPLETED");
        mix.parameter_values = vec![duration(mix.id, 15)];
        mix.start_timestamp = Some(start());
        mix.finish_timestamp = Some(start() + Duration::minutes(20));
        let mut shape = step(2, "Shape", "SKIPPED");
        shape.finish_timestamp = Some(start() + Duration::minutes(21));
        let proof = step(3, "Proof", "PENDING");

        let timeline = project_timeline(&[mix, shape, proof], start());

        let statuses: Vec<(TimelineEventKind, TimelineEventStatus)> = timeline
            .events
            .iter()
            .map(|e| (e.kind, e.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (TimelineEventKind::StepStart, TimelineEventStatus::Completed),
                (TimelineEventKind::StepComplete, TimelineEventStatus::Completed),
                (TimelineEventKind::StepStart, TimelineEventStatus::Skipped),
                (TimelineEventKind::StepComplete, TimelineEventStatus::Skipped),
                (TimelineEventKind::StepStart, TimelineEventStatus::Pending),
                (TimelineEventKind::StepComplete, TimelineEventStatus::Pending),
            ]
        );
        assert_eq!(
            timeline.events[1].actual_at,
            Some(start() + Duration::minutes(20))
        );
        let next = timeline.next_event.as_ref().unwrap();
        assert_eq!(next.step_id, Uuid::from_u128(3));
    }

    #[test]
    fn test_response_splits_overdue_and_upcoming() {
        let mut mix = step(1, "Mix", "PENDING");
        mix.parameter_values = vec![duration(mix.id, 15)];
        let timeline = project_timeline(&[mix], start());

        let response = timeline_response(timeline, start() + Duration::minutes(5));
        assert_eq!(response.overdue.len(), 1);
        assert_eq!(response.overdue[0].kind, TimelineEventKind::StepStart);
        assert_eq!(response.upcoming.len(), 1);
        assert_eq!(response.upcoming[0].kind, TimelineEventKind::StepComplete);
        // The next pending event is the overdue start
        assert_eq!(response.minutes_until_next_event, Some(0));
        assert_eq!(response.next_event_relative.as_deref(), Some("5min ago"));
    }
}
