//! Profile persistence shared with the recipe and bake handlers, which
//! record actions as a side effect.

use crate::models::{NewUserAction, NewUserProfile, UserAction, UserProfile};
use crate::schema::{user_actions, user_profiles};
use diesel::prelude::*;
use loafly_core::experience::apply_action;
use loafly_core::{ActivityCounters, ExperienceLevel, TrackedAction};
use uuid::Uuid;

/// Fetch the user's profile, creating one with default settings first if needed.
pub fn ensure_profile(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<UserProfile> {
    diesel::insert_into(user_profiles::table)
        .values(&NewUserProfile { user_id })
        .on_conflict(user_profiles::user_id)
        .do_nothing()
        .execute(conn)?;

    user_profiles::table
        .filter(user_profiles::user_id.eq(user_id))
        .select(UserProfile::as_select())
        .first(conn)
}

pub fn counters(profile: &UserProfile) -> ActivityCounters {
    ActivityCounters {
        recipes_created: profile.recipes_created,
        bakes_completed: profile.bakes_completed,
        total_bake_time_minutes: profile.total_bake_time_minutes,
        advanced_features_used: profile.advanced_features_used.iter().flatten().cloned().collect(),
    }
}

pub fn experience_level(profile: &UserProfile) -> ExperienceLevel {
    ExperienceLevel::from_str(&profile.experience_level).unwrap_or(ExperienceLevel::Beginner)
}

/// Store an action and fold it into the profile's counters and level.
///
/// Must run inside a transaction: the profile row stays locked until commit
/// so concurrent actions are counted one after another.
pub fn record_action(
    conn: &mut PgConnection,
    user_id: Uuid,
    action: &str,
    details: Option<serde_json::Value>,
    session_id: Option<&str>,
) -> QueryResult<UserAction> {
    ensure_profile(conn, user_id)?;
    let profile: UserProfile = user_profiles::table
        .filter(user_profiles::user_id.eq(user_id))
        .select(UserProfile::as_select())
        .for_update()
        .first(conn)?;
    let tracked = TrackedAction::parse(action, details.as_ref());

    let mut counters = counters(&profile);
    let level = apply_action(&mut counters, experience_level(&profile), &tracked);
    let features: Vec<Option<String>> = counters
        .advanced_features_used
        .into_iter()
        .map(Some)
        .collect();

    diesel::update(user_profiles::table.find(profile.id))
        .set((
            user_profiles::recipes_created.eq(counters.recipes_created),
            user_profiles::bakes_completed.eq(counters.bakes_completed),
            user_profiles::total_bake_time_minutes.eq(counters.total_bake_time_minutes),
            user_profiles::advanced_features_used.eq(features),
            user_profiles::experience_level.eq(level.as_str()),
            user_profiles::last_active_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;

    if level != experience_level(&profile) {
        tracing::info!(%user_id, level = level.as_str(), "experience level increased");
    }

    diesel::insert_into(user_actions::table)
        .values(&NewUserAction {
            user_id,
            action: tracked.as_str(),
            details,
            session_id,
        })
        .returning(UserAction::as_returning())
        .get_result(conn)
}
