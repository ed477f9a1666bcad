use chrono::{DateTime, Utc};
use serenity::{
    async_trait,
    model::prelude::{GuildId, UserId},
};
use sqlx::{Executor, PgPool};

use crate::{
    app_state::{
        exp::Exp,
        guild_cfg::GuildCfg,
        ledger::{MemberProfile, XpRecord},
        resolver::normalize,
    },
    error::Result,
    immut_data::consts::SCHEMA,
    util::macros::{i64_from_id, id_from_i64},
};

pub(crate) mod dao;
#[cfg(test)]
pub(crate) mod mem;

/// A member's record together with their place on the guild's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberStanding {
    pub(crate) user_id: UserId,
    pub(crate) profile: MemberProfile,
    pub(crate) exp: Exp,
    pub(crate) message_count: u64,
    pub(crate) last_update: DateTime<Utc>,
    /// 1-based; members with equal exp share a position.
    pub(crate) position: u64,
}

/// Everything the bot and the web side need from persistence.
///
/// Implementations must make each call atomic for its key.
#[async_trait]
pub(crate) trait Store: Send + Sync {
    async fn xp_record(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<XpRecord>>;

    async fn put_xp_record(&self, guild_id: GuildId, user_id: UserId, record: &XpRecord)
        -> Result<()>;

    async fn guild_cfg(&self, guild_id: GuildId) -> Result<Option<GuildCfg>>;

    async fn put_guild_cfg(&self, guild_id: GuildId, cfg: &GuildCfg) -> Result<()>;

    /// Members whose normalized display name equals `name_norm`, most exp first.
    async fn members_by_normalized_name(
        &self,
        guild_id: GuildId,
        name_norm: &str,
        limit: usize,
    ) -> Result<Vec<MemberStanding>>;

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<MemberStanding>>;
}

/// [`Store`] backed by the shared PostgreSQL database.
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Applies the schema and wraps the pool.
    pub(crate) async fn new(pool: PgPool) -> Result<Self> {
        pool.execute(SCHEMA).await?;
        Ok(Self { pool })
    }
}

impl From<dao::XpRecord> for XpRecord {
    fn from(dao: dao::XpRecord) -> Self {
        let dao::XpRecord {
            xp,
            username,
            display_name,
            avatar_url,
            message_count,
            last_update,
        } = dao;
        let exp = Exp::from_i64(xp);
        XpRecord {
            exp,
            level: exp.level(),
            profile: MemberProfile {
                username,
                display_name,
                avatar_url,
            },
            message_count: count_from_i64(message_count),
            last_update,
        }
    }
}

impl From<dao::MemberStanding> for MemberStanding {
    fn from(dao: dao::MemberStanding) -> Self {
        let dao::MemberStanding {
            user_id,
            xp,
            username,
            display_name,
            avatar_url,
            message_count,
            last_update,
            position,
        } = dao;
        let position = u64::try_from(position).unwrap_or(0).max(1);
        MemberStanding {
            user_id: id_from_i64!(UserId, user_id),
            profile: MemberProfile {
                username,
                display_name,
                avatar_url,
            },
            exp: Exp::from_i64(xp),
            message_count: count_from_i64(message_count),
            last_update,
            position,
        }
    }
}

fn count_from_i64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

const STANDING_COLUMNS: &str = "r.user_id, r.xp, r.username, r.display_name, r.avatar_url, \
    r.message_count, r.last_update, \
    (SELECT COUNT(*) FROM xp_records o WHERE o.guild_id = r.guild_id AND o.xp > r.xp) + 1 AS position";

#[async_trait]
impl Store for PgStore {
    async fn xp_record(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<XpRecord>> {
        let record = sqlx::query_as::<_, dao::XpRecord>(
            "SELECT xp, username, display_name, avatar_url, message_count, last_update FROM xp_records \
            WHERE guild_id = $1 AND user_id = $2",
        )
        .bind(i64_from_id!(guild_id))
        .bind(i64_from_id!(user_id))
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(XpRecord::from))
    }

    async fn put_xp_record(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        record: &XpRecord,
    ) -> Result<()> {
        #[allow(clippy::cast_possible_wrap)]
        let level = record.level.0 as i64;
        let message_count = i64::try_from(record.message_count).unwrap_or(i64::MAX);
        sqlx::query(
            "INSERT INTO xp_records \
            (guild_id, user_id, xp, level, username, display_name, display_name_norm, avatar_url, \
            last_update, message_count) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
            ON CONFLICT (guild_id, user_id) \
            DO UPDATE SET xp = $3, level = $4, username = $5, display_name = $6, \
            display_name_norm = $7, avatar_url = $8, last_update = $9, message_count = $10",
        )
        .bind(i64_from_id!(guild_id))
        .bind(i64_from_id!(user_id))
        .bind(record.exp.to_i64())
        .bind(level)
        .bind(&record.profile.username)
        .bind(&record.profile.display_name)
        .bind(normalize(&record.profile.display_name))
        .bind(&record.profile.avatar_url)
        .bind(record.last_update)
        .bind(message_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn guild_cfg(&self, guild_id: GuildId) -> Result<Option<GuildCfg>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT config FROM guild_configs WHERE guild_id = $1")
                .bind(i64_from_id!(guild_id))
                .fetch_optional(&self.pool)
                .await?;
        json.as_deref().map(GuildCfg::from_json).transpose()
    }

    async fn put_guild_cfg(&self, guild_id: GuildId, cfg: &GuildCfg) -> Result<()> {
        let json = serde_json::to_string(cfg)?;
        sqlx::query(
            "INSERT INTO guild_configs (guild_id, config) VALUES ($1, $2) \
            ON CONFLICT (guild_id) DO UPDATE SET config = $2",
        )
        .bind(i64_from_id!(guild_id))
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn members_by_normalized_name(
        &self,
        guild_id: GuildId,
        name_norm: &str,
        limit: usize,
    ) -> Result<Vec<MemberStanding>> {
        let query = format!(
            "SELECT {STANDING_COLUMNS} FROM xp_records r \
            WHERE r.guild_id = $1 AND r.display_name_norm = $2 \
            ORDER BY r.xp DESC, r.user_id \
            LIMIT $3"
        );
        let rows = sqlx::query_as::<_, dao::MemberStanding>(&query)
            .bind(i64_from_id!(guild_id))
            .bind(name_norm)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(MemberStanding::from).collect())
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<MemberStanding>> {
        let query = format!(
            "SELECT {STANDING_COLUMNS} FROM xp_records r \
            WHERE r.guild_id = $1 AND r.user_id = $2"
        );
        let row = sqlx::query_as::<_, dao::MemberStanding>(&query)
            .bind(i64_from_id!(guild_id))
            .bind(i64_from_id!(user_id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(MemberStanding::from))
    }
}
