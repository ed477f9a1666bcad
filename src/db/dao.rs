//! Module for Data Acess Objects

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Data Access Object for [`crate::app_state::ledger::XpRecord`].
#[derive(FromRow, Debug)]
pub(crate) struct XpRecord {
    pub(crate) xp: i64,
    pub(crate) username: String,
    pub(crate) display_name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) message_count: i64,
    pub(crate) last_update: DateTime<Utc>,
}

/// Data Access Object for [`crate::db::MemberStanding`].
#[derive(FromRow, Debug)]
pub(crate) struct MemberStanding {
    pub(crate) user_id: i64,
    pub(crate) xp: i64,
    pub(crate) username: String,
    pub(crate) display_name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) message_count: i64,
    pub(crate) last_update: DateTime<Utc>,
    pub(crate) position: i64,
}
