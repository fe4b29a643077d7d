//! Parser for free-form stretch-and-fold timing plans.
//!
//! Bakers write plans like `S&F at 30, 60, 90, 120` or
//! `every 30 min for 4 folds` or `mix at 8am`. Each line is matched against a
//! handful of patterns and turned into timed events. Relative events count
//! minutes from the start of the step; absolute events are clock times.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Number of hourly folds when the plan does not say how long.
const DEFAULT_HOURLY_FOLDS: i64 = 4;

/// Latest relative offset a plan may schedule: one week.
pub const MAX_PLAN_MINUTES: i64 = 7 * 24 * 60;

/// Most folds a single repeating line may produce.
pub const MAX_REPEATED_FOLDS: i64 = 200;

static INTERVAL_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:s&f|fold|folds).*?(?:at\s+)?(\d+(?:\s*,\s*\d+)*)").unwrap()
});
static FIRST_FOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:start|first|begin).*?(?:at|after)\s+(\d+)\s*min").unwrap()
});
static BULK_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:bulk|ferment).*?(\d+)\s*(?:hours?|hrs?)\b").unwrap()
});
static EVERY_N_MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"every\s+(\d+)\s*min(?:ute)?s?\s+for\s+(\d+)").unwrap()
});
static HOURLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:hourly|every\s+hour)").unwrap());
static HOURS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:hours?|hrs?)\b").unwrap());
static CLOCK_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b|\b(\d{1,2}):(\d{2})\b").unwrap()
});
static HOURS_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:h|hr|hrs|hour|hours)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TimingEventKind {
    Fold,
    Mix,
    Shape,
    Bake,
    Other,
}

impl TimingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingEventKind::Fold => "fold",
            TimingEventKind::Mix => "mix",
            TimingEventKind::Shape => "shape",
            TimingEventKind::Bake => "bake",
            TimingEventKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimingEvent {
    pub id: String,
    pub kind: TimingEventKind,
    /// Minutes after the start for relative events, minutes after midnight otherwise
    pub time_minutes: i64,
    pub description: String,
    pub is_relative: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimingSchedule {
    pub events: Vec<TimingEvent>,
    pub total_duration: Option<i64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alarm {
    pub at: DateTime<Utc>,
    pub event: TimingEvent,
}

/// Parse a free-form timing plan into a sorted schedule.
pub fn parse_timing_plan(text: &str) -> TimingSchedule {
    let mut schedule = TimingSchedule::default();
    let mut bulk_duration = None;

    let lowered = text.to_lowercase();
    let lines = lowered.lines().map(str::trim).filter(|l| !l.is_empty());

    for line in lines {
        let before = schedule.events.len();
        let warnings_before = schedule.warnings.len();

        // Repeating patterns already describe every fold on the line, so the
        // number list pattern would only pick up their interval as a bogus fold.
        if !parse_repeating(line, &mut schedule) {
            parse_fold_list(line, &mut schedule);
        }
        parse_first_fold(line, &mut schedule);
        parse_clock_times(line, &mut schedule);

        let line_duration = parse_bulk_duration(line, &mut schedule.warnings);
        if line_duration.is_some() {
            bulk_duration = line_duration;
        }

        if schedule.events.len() == before
            && line_duration.is_none()
            && schedule.warnings.len() == warnings_before
        {
            schedule
                .warnings
                .push(format!("Could not interpret \"{line}\""));
        }
    }

    dedupe_events(&mut schedule.events);
    schedule.events.sort_by_key(|e| e.time_minutes);
    schedule.total_duration = bulk_duration.or_else(|| span_of(&schedule.events));

    schedule
}

fn parse_fold_list(line: &str, schedule: &mut TimingSchedule) {
    let Some(caps) = INTERVAL_LIST_RE.captures(line) else {
        return;
    };
    let Some(list) = caps.get(1) else {
        return;
    };
    // "fold for 3hrs" names a duration, not a fold time
    if HOURS_SUFFIX_RE.is_match(&line[list.end()..]) {
        return;
    }

    for (index, raw) in list.as_str().split(',').map(str::trim).enumerate() {
        match plan_minutes(raw) {
            Some(minutes) => schedule.events.push(relative_fold(
                minutes,
                format!("Stretch & Fold {}", index + 1),
            )),
            None => schedule.warnings.push(beyond_plan(raw)),
        }
    }
}

fn parse_repeating(line: &str, schedule: &mut TimingSchedule) -> bool {
    let mut matched = false;

    if let Some(caps) = EVERY_N_MINUTES_RE.captures(line) {
        // Digits that overflow i64 are far past any limit below
        let interval: i64 = caps[1].parse().unwrap_or(i64::MAX);
        let count: i64 = caps[2].parse().unwrap_or(i64::MAX);
        if interval > 0 {
            let allowed = (MAX_PLAN_MINUTES / interval).min(MAX_REPEATED_FOLDS);
            if count > allowed {
                schedule.warnings.push(truncated_repeat(&caps[0], allowed));
            }
            for i in 1..=count.min(allowed) {
                schedule
                    .events
                    .push(relative_fold(i * interval, format!("Stretch & Fold {i}")));
            }
            matched = true;
        }
    }

    if let Some(hourly) = HOURLY_RE.find(line) {
        let hours = HOURS_RE
            .captures(line)
            .map(|caps| caps[1].parse::<i64>().unwrap_or(i64::MAX))
            .unwrap_or(DEFAULT_HOURLY_FOLDS);
        let allowed = (MAX_PLAN_MINUTES / 60).min(MAX_REPEATED_FOLDS);
        if hours > allowed {
            schedule.warnings.push(truncated_repeat(hourly.as_str(), allowed));
        }
        for i in 1..=hours.min(allowed) {
            schedule.events.push(relative_fold(
                i * 60,
                format!("Hourly Stretch & Fold {i}"),
            ));
        }
        matched = true;
    }

    matched
}

fn parse_first_fold(line: &str, schedule: &mut TimingSchedule) {
    if let Some(caps) = FIRST_FOLD_RE.captures(line) {
        match plan_minutes(&caps[1]) {
            Some(minutes) => schedule
                .events
                .push(relative_fold(minutes, "First Stretch & Fold".to_string())),
            None => schedule.warnings.push(beyond_plan(&caps[1])),
        }
    }
}

fn parse_bulk_duration(line: &str, warnings: &mut Vec<String>) -> Option<i64> {
    let caps = BULK_DURATION_RE.captures(line)?;
    let minutes = caps[1]
        .parse::<i64>()
        .ok()
        .and_then(|hours| hours.checked_mul(60))
        .filter(|minutes| *minutes <= MAX_PLAN_MINUTES);
    if minutes.is_none() {
        warnings.push(beyond_plan(&caps[0]));
    }
    minutes
}

/// Minutes from a run of digits, if within one week.
fn plan_minutes(digits: &str) -> Option<i64> {
    digits
        .parse::<i64>()
        .ok()
        .filter(|minutes| *minutes <= MAX_PLAN_MINUTES)
}

fn beyond_plan(text: &str) -> String {
    format!("Ignored \"{text}\": plans cover at most one week")
}

fn truncated_repeat(text: &str, allowed: i64) -> String {
    format!("Only the first {allowed} folds of \"{text}\" were scheduled")
}

fn parse_clock_times(line: &str, schedule: &mut TimingSchedule) {
    for (index, caps) in CLOCK_TIME_RE.captures_iter(line).enumerate() {
        let (hours, minutes, period) = match (caps.get(1), caps.get(4)) {
            (Some(h), _) => (h.as_str(), caps.get(2).map(|m| m.as_str()), caps.get(3)),
            (None, Some(h)) => (h.as_str(), caps.get(5).map(|m| m.as_str()), None),
            (None, None) => continue,
        };

        let Some(time) = to_clock_minutes(hours, minutes, period.map(|p| p.as_str())) else {
            schedule
                .warnings
                .push(format!("Ignored invalid time \"{}\"", &caps[0]));
            continue;
        };

        let (kind, description) = infer_action(line, index);
        schedule.events.push(TimingEvent {
            id: format!("time-{}-{}-{}", time / 60, time % 60, kind.as_str()),
            kind,
            time_minutes: time,
            description,
            is_relative: false,
        });
    }
}

fn to_clock_minutes(hours: &str, minutes: Option<&str>, period: Option<&str>) -> Option<i64> {
    let mut hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.map(str::parse::<i64>).transpose().ok()?.unwrap_or(0);
    if minutes > 59 {
        return None;
    }

    match period {
        Some(p) => {
            if !(1..=12).contains(&hours) {
                return None;
            }
            if p == "pm" && hours != 12 {
                hours += 12;
            }
            if p == "am" && hours == 12 {
                hours = 0;
            }
        }
        None if hours > 23 => return None,
        None => {}
    }

    Some(hours * 60 + minutes)
}

fn infer_action(line: &str, index: usize) -> (TimingEventKind, String) {
    if line.contains("mix") {
        (TimingEventKind::Mix, "Mix dough".to_string())
    } else if line.contains("shape") {
        (TimingEventKind::Shape, "Shape loaves".to_string())
    } else if line.contains("bake") {
        (TimingEventKind::Bake, "Start baking".to_string())
    } else if line.contains("fold") || line.contains("s&f") {
        (TimingEventKind::Fold, format!("Stretch & Fold {}", index + 1))
    } else {
        (TimingEventKind::Other, "Scheduled action".to_string())
    }
}

fn relative_fold(minutes: i64, description: String) -> TimingEvent {
    TimingEvent {
        id: format!("fold-{minutes}"),
        kind: TimingEventKind::Fold,
        time_minutes: minutes,
        description,
        is_relative: true,
    }
}

/// Keep the first event for each id. Relative folds are keyed by offset and
/// clock events by time and kind, so an id names one slot of the plan.
fn dedupe_events(events: &mut Vec<TimingEvent>) {
    let mut seen = HashSet::new();
    events.retain(|e| seen.insert(e.id.clone()));
}

fn span_of(events: &[TimingEvent]) -> Option<i64> {
    let relative_max = events
        .iter()
        .filter(|e| e.is_relative)
        .map(|e| e.time_minutes)
        .max();

    let clock = events.iter().filter(|e| !e.is_relative).map(|e| e.time_minutes);
    let clock_span = clock.clone().min().zip(clock.max()).map(|(first, last)| last - first);

    match (relative_max, clock_span.filter(|span| *span > 0)) {
        (Some(relative), Some(span)) => Some(relative.max(span)),
        (relative, span) => relative.or(span),
    }
}

/// Wall-clock alarms for every event of a schedule.
///
/// Relative events are offset from `start`; clock times land on their next
/// occurrence at or after `start`.
pub fn generate_alarms(schedule: &TimingSchedule, start: DateTime<Utc>) -> Vec<Alarm> {
    schedule
        .events
        .iter()
        .map(|event| Alarm {
            at: event_time(event, start),
            event: event.clone(),
        })
        .collect()
}

pub(crate) fn event_time(event: &TimingEvent, start: DateTime<Utc>) -> DateTime<Utc> {
    if event.is_relative {
        return add_minutes(start, event.time_minutes);
    }

    let seconds = u32::try_from(event.time_minutes.rem_euclid(24 * 60) * 60).unwrap_or(0);
    let clock = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN);
    let same_day = start.date_naive().and_time(clock).and_utc();
    if same_day >= start {
        same_day
    } else {
        add_minutes(same_day, 24 * 60)
    }
}

/// `at` plus `minutes`, pinned to the representable range.
pub(crate) fn add_minutes(at: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    Duration::try_minutes(minutes)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(if minutes < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Human readable rendering of a schedule, one event per line.
pub fn format_schedule(schedule: &TimingSchedule) -> String {
    if schedule.events.is_empty() {
        return "No timing events parsed".to_string();
    }

    let mut lines: Vec<String> = schedule
        .events
        .iter()
        .map(|event| {
            let time = if event.is_relative {
                format!("{}min", event.time_minutes)
            } else {
                format!("{}:{:02}", event.time_minutes / 60, event.time_minutes % 60)
            };
            format!("• {time}: {}", event.description)
        })
        .collect();

    if let Some(total) = schedule.total_duration.filter(|t| *t > 0) {
        lines.push(String::new());
        lines.push(format!("Total duration: {}h {}m", total / 60, total % 60));
    }

    if !schedule.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        lines.extend(schedule.warnings.iter().map(|w| format!("- {w}")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn times(schedule: &TimingSchedule) -> Vec<i64> {
        schedule.events.iter().map(|e| e.time_minutes).collect()
    }

    #[test]
    fn test_empty_plan() {
        let schedule = parse_timing_plan("   \n  ");
        assert!(schedule.events.is_empty());
        assert!(schedule.warnings.is_empty());
        assert_eq!(schedule.total_duration, None);
    }

    #[test]
    fn test_fold_list() {
        let schedule = parse_timing_plan("S&F at 30, 60, 90, 120 minutes");
        assert_eq!(times(&schedule), vec![30, 60, 90, 120]);
        assert_eq!(schedule.events[2].description, "Stretch & Fold 3");
        assert_eq!(schedule.events[0].id, "fold-30");
        assert_eq!(schedule.total_duration, Some(120));
    }

    #[test]
    fn test_every_n_minutes() {
        let schedule = parse_timing_plan("folds every 30 min for 4");
        assert_eq!(times(&schedule), vec![30, 60, 90, 120]);
    }

    #[test]
    fn test_hourly_folds() {
        let schedule = parse_timing_plan("hourly folds for 3hrs");
        assert_eq!(times(&schedule), vec![60, 120, 180]);
        assert_eq!(schedule.events[0].description, "Hourly Stretch & Fold 1");

        let default = parse_timing_plan("fold every hour");
        assert_eq!(default.events.len(), 4);
    }

    #[test]
    fn test_bulk_duration_wins_over_event_span() {
        let schedule = parse_timing_plan("S&F at 30, 60\nbulk 5 hrs");
        assert_eq!(schedule.total_duration, Some(300));
        let hours = parse_timing_plan("ferment for 3 hours");
        assert_eq!(hours.total_duration, Some(180));
    }

    #[test]
    fn test_first_fold_dedupes_with_list() {
        let schedule = parse_timing_plan("first fold after 45min");
        assert_eq!(times(&schedule), vec![45]);
    }

    #[test]
    fn test_clock_times() {
        let schedule = parse_timing_plan("mix at 8am\nshape at 2:30pm\n14:00 bake");
        let kinds: Vec<TimingEventKind> = schedule.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TimingEventKind::Mix, TimingEventKind::Bake, TimingEventKind::Shape]
        );
        assert_eq!(times(&schedule), vec![480, 840, 870]);
        assert!(schedule.events.iter().all(|e| !e.is_relative));
        assert_eq!(schedule.total_duration, Some(390));
    }

    #[test]
    fn test_plain_numbers_are_not_clock_times() {
        let schedule = parse_timing_plan("s&f at 30, 60, 90");
        assert!(schedule.events.iter().all(|e| e.is_relative));
    }

    #[test]
    fn test_invalid_clock_time_warns() {
        let schedule = parse_timing_plan("mix at 13pm");
        assert!(schedule.events.is_empty());
        assert!(schedule.warnings.iter().any(|w| w.contains("13pm")));
    }

    #[test]
    fn test_uninterpretable_line_warns() {
        let schedule = parse_timing_plan("S&F at 30\nwhen it feels right");
        assert_eq!(schedule.events.len(), 1);
        assert_eq!(schedule.warnings, vec!["Could not interpret \"when it feels right\""]);
    }

    #[test]
    fn test_fold_times_beyond_a_week_are_dropped() {
        let schedule = parse_timing_plan("S&F at 30, 999999999999, 99999999999999999999");
        assert_eq!(times(&schedule), vec![30]);
        assert_eq!(schedule.warnings.len(), 2);
        assert!(schedule.warnings[0].contains("999999999999"));

        let late = parse_timing_plan("first fold after 20000 min");
        assert!(late.events.is_empty());
        assert_eq!(late.warnings.len(), 1);
    }

    #[test]
    fn test_bulk_duration_overflow_is_ignored() {
        let schedule = parse_timing_plan("bulk 999999999999999999 hrs");
        assert_eq!(schedule.total_duration, None);
        assert_eq!(schedule.warnings.len(), 1);
        assert!(schedule.warnings[0].contains("one week"));

        let week = parse_timing_plan("bulk 168 hrs");
        assert_eq!(week.total_duration, Some(MAX_PLAN_MINUTES));
    }

    #[test]
    fn test_repeat_counts_are_capped() {
        let schedule = parse_timing_plan("every 1 min for 5000000");
        assert_eq!(schedule.events.len() as i64, MAX_REPEATED_FOLDS);
        assert_eq!(
            schedule.warnings,
            vec!["Only the first 200 folds of \"every 1 min for 5000000\" were scheduled"]
        );

        let wide = parse_timing_plan("every 6000 min for 3");
        assert_eq!(times(&wide), vec![6000]);

        let hourly = parse_timing_plan("hourly folds for 99999999999999999999 hrs");
        assert_eq!(hourly.events.len(), 168);
        assert_eq!(hourly.events.last().map(|e| e.time_minutes), Some(MAX_PLAN_MINUTES));
        assert_eq!(hourly.warnings.len(), 1);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let schedule = parse_timing_plan("mix at 8am\nshape at 8am\nmix at 8:00am\nS&F at 30, 30");
        let ids: Vec<&str> = schedule.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["fold-30", "time-8-0-mix", "time-8-0-shape"]);
    }

    #[test]
    fn test_alarms_saturate_instead_of_overflowing() {
        let event = TimingEvent {
            id: "fold-huge".to_string(),
            kind: TimingEventKind::Fold,
            time_minutes: i64::MAX,
            description: "Stretch & Fold 1".to_string(),
            is_relative: true,
        };
        let schedule = TimingSchedule {
            events: vec![event],
            ..TimingSchedule::default()
        };
        let alarms = generate_alarms(&schedule, Utc::now());
        assert_eq!(alarms[0].at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_generate_alarms() {
        let start = Utc.with_ymd_and_hms(2024, 5, 4, 9, 0, 0).unwrap();
        let schedule = parse_timing_plan("s&f at 30\nshape at 8am");
        let alarms = generate_alarms(&schedule, start);

        assert_eq!(alarms[0].at, start + Duration::minutes(30));
        // 8am has already passed on the start day, so the alarm is the next morning
        assert_eq!(
            alarms[1].at,
            Utc.with_ymd_and_hms(2024, 5, 5, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_format_schedule() {
        let schedule = parse_timing_plan("S&F at 30, 60\nbulk 4 hrs\nshape at 2:30pm");
        let formatted = format_schedule(&schedule);
        assert!(formatted.contains("• 30min: Stretch & Fold 1"));
        assert!(formatted.contains("• 14:30: Shape loaves"));
        assert!(formatted.contains("Total duration: 4h 0m"));

        assert_eq!(
            format_schedule(&TimingSchedule::default()),
            "No timing events parsed"
        );
    }
}
