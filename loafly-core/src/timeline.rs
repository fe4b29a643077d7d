//! Projected timeline for an active bake.
//!
//! Steps are laid end to end from the bake start. Each step contributes a
//! start event, any stretch-and-fold events from its timing plan, and a
//! completion event after its estimated duration.

use crate::timing::{
    add_minutes, event_time, parse_timing_plan, TimingEventKind, MAX_PLAN_MINUTES,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Parameters whose planned value is a free-form fold schedule.
pub const TIMING_PLAN_PARAMETERS: [&str; 2] = ["Timing Plan", "Custom Fold Schedule"];

const DEFAULT_STEP_MINUTES: i64 = 30;

/// Default duration by step name, checked in order.
const DURATION_BY_NAME: [(&str, i64); 7] = [
    ("autolyse", 30),
    ("mix", 15),
    ("bulk", 240),
    ("shape", 20),
    ("proof", 120),
    ("bake", 45),
    ("rest", 60),
];

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineStep {
    pub step_id: Uuid,
    pub name: Option<String>,
    /// Planned parameter values keyed by parameter name
    pub parameters: Vec<(String, Value)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    StepStart,
    StepComplete,
    Fold,
    /// A non-fold clock event from a timing plan, e.g. "shape at 2pm"
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventStatus {
    Pending,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimelineEvent {
    pub id: String,
    pub kind: TimelineEventKind,
    pub step_id: Uuid,
    pub step_name: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub actual_at: Option<DateTime<Utc>>,
    pub status: TimelineEventStatus,
    pub fold_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BakeTimeline {
    pub events: Vec<TimelineEvent>,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub total_duration_minutes: i64,
    pub current_event_index: usize,
    pub next_event: Option<TimelineEvent>,
}

/// What happened to a step, for [`update_timeline_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepProgress {
    Started,
    Completed,
    Skipped,
}

pub fn generate_bake_timeline(steps: &[TimelineStep], start: DateTime<Utc>) -> BakeTimeline {
    let mut events = Vec::new();
    let mut cursor = start;

    for (index, step) in steps.iter().enumerate() {
        let step_name = step
            .name
            .clone()
            .unwrap_or_else(|| format!("Step {}", index + 1));

        events.push(TimelineEvent {
            id: format!("step-{}-start", step.step_id),
            kind: TimelineEventKind::StepStart,
            step_id: step.step_id,
            step_name: step_name.clone(),
            description: format!("Begin {step_name}"),
            scheduled_at: cursor,
            actual_at: None,
            status: TimelineEventStatus::Pending,
            fold_number: None,
        });

        if let Some(plan) = timing_plan(step) {
            let schedule = parse_timing_plan(plan);
            let mut fold_number = 0;
            for event in &schedule.events {
                let kind = if event.kind == TimingEventKind::Fold {
                    fold_number += 1;
                    TimelineEventKind::Fold
                } else {
                    TimelineEventKind::Milestone
                };
                events.push(TimelineEvent {
                    id: format!("step-{}-sf-{}", step.step_id, event.id),
                    kind,
                    step_id: step.step_id,
                    step_name: step_name.clone(),
                    description: event.description.clone(),
                    scheduled_at: event_time(event, cursor),
                    actual_at: None,
                    status: TimelineEventStatus::Pending,
                    fold_number: (kind == TimelineEventKind::Fold).then_some(fold_number),
                });
            }
        }

        cursor = add_minutes(cursor, estimate_step_duration(step));

        events.push(TimelineEvent {
            id: format!("step-{}-complete", step.step_id),
            kind: TimelineEventKind::StepComplete,
            step_id: step.step_id,
            step_name: step_name.clone(),
            description: format!("Complete {step_name}"),
            scheduled_at: cursor,
            actual_at: None,
            status: TimelineEventStatus::Pending,
            fold_number: None,
        });
    }

    events.sort_by_key(|e| e.scheduled_at);
    let next_event = events.first().cloned();

    BakeTimeline {
        events,
        start_time: start,
        estimated_end_time: cursor,
        total_duration_minutes: (cursor - start).num_minutes(),
        current_event_index: 0,
        next_event,
    }
}

/// Minutes a step is expected to take.
///
/// Uses a numeric duration parameter when present (a parameter named
/// `Duration...` first, then any name containing "duration" or "time"),
/// otherwise a default for the kind of step. Parameter values are capped at
/// one week.
pub fn estimate_step_duration(step: &TimelineStep) -> i64 {
    let by_prefix = step
        .parameters
        .iter()
        .find(|(name, _)| name.to_lowercase().starts_with("duration"));
    let by_keyword = || {
        step.parameters.iter().find(|(name, _)| {
            let name = name.to_lowercase();
            name.contains("duration") || name.contains("time")
        })
    };

    if let Some(minutes) = by_prefix
        .or_else(by_keyword)
        .and_then(|(_, value)| minutes_from_value(value))
    {
        return minutes;
    }

    let name = step.name.as_deref().unwrap_or_default().to_lowercase();
    DURATION_BY_NAME
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|(_, minutes)| *minutes)
        .unwrap_or(DEFAULT_STEP_MINUTES)
}

/// Record what actually happened to a step.
///
/// Starting or completing marks the matching event completed at `at`.
/// Completing also skips that step's folds that were due by then; skipping
/// a step skips all of its pending events.
pub fn update_timeline_progress(
    mut timeline: BakeTimeline,
    step_id: Uuid,
    progress: StepProgress,
    at: DateTime<Utc>,
) -> BakeTimeline {
    for event in timeline.events.iter_mut().filter(|e| e.step_id == step_id) {
        match (progress, event.kind) {
            (StepProgress::Started, TimelineEventKind::StepStart)
            | (StepProgress::Completed, TimelineEventKind::StepComplete) => {
                event.status = TimelineEventStatus::Completed;
                event.actual_at = Some(at);
            }
            (StepProgress::Completed, TimelineEventKind::Fold | TimelineEventKind::Milestone)
                if event.status == TimelineEventStatus::Pending && event.scheduled_at <= at =>
            {
                event.status = TimelineEventStatus::Skipped;
            }
            (StepProgress::Skipped, _) if event.status == TimelineEventStatus::Pending => {
                event.status = TimelineEventStatus::Skipped;
                event.actual_at = Some(at);
            }
            _ => {}
        }
    }

    if let Some(index) = timeline
        .events
        .iter()
        .position(|e| e.status == TimelineEventStatus::Pending)
    {
        timeline.current_event_index = index;
    }
    timeline.next_event = timeline
        .events
        .iter()
        .find(|e| e.status == TimelineEventStatus::Pending)
        .cloned();

    timeline
}

/// Pending events still in the future, soonest first.
pub fn upcoming_events(
    timeline: &BakeTimeline,
    now: DateTime<Utc>,
    count: usize,
) -> Vec<&TimelineEvent> {
    timeline
        .events
        .iter()
        .filter(|e| e.status == TimelineEventStatus::Pending && e.scheduled_at > now)
        .take(count)
        .collect()
}

/// Pending events whose scheduled time has passed.
pub fn overdue_events(timeline: &BakeTimeline, now: DateTime<Utc>) -> Vec<&TimelineEvent> {
    timeline
        .events
        .iter()
        .filter(|e| e.status == TimelineEventStatus::Pending && e.scheduled_at <= now)
        .collect()
}

pub fn minutes_until_next_event(timeline: &BakeTimeline, now: DateTime<Utc>) -> Option<i64> {
    let next = timeline.next_event.as_ref()?;
    let seconds = (next.scheduled_at - now).num_seconds();
    Some(((seconds as f64) / 60.0).round().max(0.0) as i64)
}

/// "now", "in 15min", "in 2h", "5min ago" or "3h ago".
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = ((at - now).num_seconds() as f64 / 60.0).round() as i64;

    if minutes == 0 {
        "now".to_string()
    } else if minutes > 0 {
        if minutes < 60 {
            format!("in {minutes}min")
        } else {
            format!("in {}h", (minutes as f64 / 60.0).round() as i64)
        }
    } else if minutes > -60 {
        format!("{}min ago", -minutes)
    } else {
        format!("{}h ago", (-minutes as f64 / 60.0).round() as i64)
    }
}

fn timing_plan(step: &TimelineStep) -> Option<&str> {
    step.parameters
        .iter()
        .find(|(name, _)| TIMING_PLAN_PARAMETERS.contains(&name.as_str()))
        .and_then(|(_, value)| value.as_str())
        .filter(|plan| !plan.trim().is_empty())
}

fn minutes_from_value(value: &Value) -> Option<i64> {
    let minutes = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (minutes.is_finite() && minutes >= 0.0)
        .then(|| minutes.min(MAX_PLAN_MINUTES as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 8, 0, 0).unwrap()
    }

    fn step(name: &str, parameters: Vec<(&str, Value)>) -> TimelineStep {
        TimelineStep {
            step_id: Uuid::new_v4(),
            name: Some(name.to_string()),
            parameters: parameters
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn test_default_durations_by_name() {
        assert_eq!(estimate_step_duration(&step("Autolyse", vec![])), 30);
        assert_eq!(estimate_step_duration(&step("Final Mix", vec![])), 15);
        assert_eq!(estimate_step_duration(&step("Bulk Ferment", vec![])), 240);
        assert_eq!(estimate_step_duration(&step("Final Proof", vec![])), 120);
        assert_eq!(estimate_step_duration(&step("Lamination", vec![])), 30);

        let unnamed = TimelineStep {
            step_id: Uuid::new_v4(),
            name: None,
            parameters: vec![],
        };
        assert_eq!(estimate_step_duration(&unnamed), 30);
    }

    #[test]
    fn test_duration_parameter_wins() {
        let bake = step(
            "Bake",
            vec![
                ("Steam Duration (min)", json!(20)),
                ("Duration (minutes)", json!("50")),
            ],
        );
        assert_eq!(estimate_step_duration(&bake), 50);

        let proof = step("Final Proof", vec![("Proof time", json!(90))]);
        assert_eq!(estimate_step_duration(&proof), 90);

        let bogus = step("Final Proof", vec![("Duration (minutes)", json!("overnight"))]);
        assert_eq!(estimate_step_duration(&bogus), 120);
    }

    #[test]
    fn test_huge_duration_is_capped() {
        let proof = step("Final Proof", vec![("Duration (minutes)", json!(1e12))]);
        assert_eq!(estimate_step_duration(&proof), MAX_PLAN_MINUTES);

        let timeline = generate_bake_timeline(&[proof], start());
        assert_eq!(timeline.total_duration_minutes, MAX_PLAN_MINUTES);
    }

    #[test]
    fn test_timeline_event_ids_are_unique() {
        let bulk = step(
            "Bulk Ferment",
            vec![(
                "Timing Plan",
                json!("mix at 8am\nshape at 8am\nS&F at 30, 30\nfirst fold after 30 min"),
            )],
        );
        let timeline = generate_bake_timeline(&[step("Final Mix", vec![]), bulk], start());

        let mut ids: Vec<&str> = timeline.events.iter().map(|e| e.id.as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 7);
    }

    #[test]
    fn test_timeline_lays_steps_end_to_end() {
        let mix = step("Final Mix", vec![]);
        let bulk = step(
            "Bulk Ferment",
            vec![("Timing Plan", json!("S&F at 30, 60, 90"))],
        );
        let timeline = generate_bake_timeline(&[mix.clone(), bulk.clone()], start());

        assert_eq!(timeline.total_duration_minutes, 15 + 240);
        assert_eq!(
            timeline.estimated_end_time,
            start() + Duration::minutes(255)
        );
        assert_eq!(timeline.events.len(), 7);

        let folds: Vec<&TimelineEvent> = timeline
            .events
            .iter()
            .filter(|e| e.kind == TimelineEventKind::Fold)
            .collect();
        assert_eq!(folds.len(), 3);
        assert_eq!(folds[0].scheduled_at, start() + Duration::minutes(45));
        assert_eq!(folds[2].fold_number, Some(3));
        assert_eq!(folds[0].step_id, bulk.step_id);

        // Events are sorted by time
        let mut sorted = timeline.events.clone();
        sorted.sort_by_key(|e| e.scheduled_at);
        assert_eq!(sorted, timeline.events);
        assert_eq!(timeline.next_event.as_ref().unwrap().kind, TimelineEventKind::StepStart);
    }

    #[test]
    fn test_progress_skips_missed_folds() {
        let bulk = step(
            "Bulk Ferment",
            vec![("Custom Fold Schedule", json!("S&F at 30, 60, 90"))],
        );
        let timeline = generate_bake_timeline(&[bulk.clone()], start());

        let timeline =
            update_timeline_progress(timeline, bulk.step_id, StepProgress::Started, start());
        assert_eq!(timeline.events[0].status, TimelineEventStatus::Completed);
        assert_eq!(timeline.current_event_index, 1);

        let done_at = start() + Duration::minutes(70);
        let timeline =
            update_timeline_progress(timeline, bulk.step_id, StepProgress::Completed, done_at);
        let statuses: Vec<TimelineEventStatus> =
            timeline.events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                TimelineEventStatus::Completed,
                TimelineEventStatus::Skipped,
                TimelineEventStatus::Skipped,
                TimelineEventStatus::Pending,
                TimelineEventStatus::Completed,
            ]
        );
        assert_eq!(timeline.next_event.as_ref().unwrap().description, "Stretch & Fold 3");
    }

    #[test]
    fn test_skipping_a_step() {
        let shape = step("Shape", vec![]);
        let timeline = generate_bake_timeline(&[shape.clone()], start());
        let timeline =
            update_timeline_progress(timeline, shape.step_id, StepProgress::Skipped, start());
        assert!(timeline
            .events
            .iter()
            .all(|e| e.status == TimelineEventStatus::Skipped));
        assert!(timeline.next_event.is_none());
    }

    #[test]
    fn test_upcoming_and_overdue() {
        let bulk = step("Bulk Ferment", vec![("Timing Plan", json!("S&F at 30, 60"))]);
        let timeline = generate_bake_timeline(&[bulk], start());
        let now = start() + Duration::minutes(40);

        let overdue = overdue_events(&timeline, now);
        assert_eq!(overdue.len(), 2);

        let upcoming = upcoming_events(&timeline, now, 5);
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].description, "Stretch & Fold 2");

        assert_eq!(minutes_until_next_event(&timeline, start() - Duration::minutes(10)), Some(10));
        assert_eq!(minutes_until_next_event(&timeline, now), Some(0));
    }

    #[test]
    fn test_format_relative_time() {
        let now = start();
        assert_eq!(format_relative_time(now, now), "now");
        assert_eq!(format_relative_time(now + Duration::minutes(15), now), "in 15min");
        assert_eq!(format_relative_time(now + Duration::minutes(130), now), "in 2h");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5min ago");
        assert_eq!(format_relative_time(now - Duration::minutes(190), now), "3h ago");
    }
}
