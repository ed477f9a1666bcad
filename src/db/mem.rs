//! In-memory [`Store`] used by the tests.

use std::collections::HashMap;

use serenity::{
    async_trait,
    model::prelude::{GuildId, UserId},
};
use tokio::sync::Mutex;

use super::{MemberStanding, Store};
use crate::{
    app_state::{guild_cfg::GuildCfg, ledger::XpRecord, resolver::normalize},
    error::Result,
};

#[derive(Default)]
pub(crate) struct MemStore {
    records: Mutex<HashMap<(GuildId, UserId), XpRecord>>,
    cfgs: Mutex<HashMap<GuildId, GuildCfg>>,
}

fn standing(
    records: &HashMap<(GuildId, UserId), XpRecord>,
    guild_id: GuildId,
    user_id: UserId,
    record: &XpRecord,
) -> MemberStanding {
    let ahead = records
        .iter()
        .filter(|((g, _), other)| *g == guild_id && other.exp > record.exp)
        .count();
    MemberStanding {
        user_id,
        profile: record.profile.clone(),
        exp: record.exp,
        message_count: record.message_count,
        last_update: record.last_update,
        position: ahead as u64 + 1,
    }
}

#[async_trait]
impl Store for MemStore {
    async fn xp_record(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<XpRecord>> {
        Ok(self.records.lock().await.get(&(guild_id, user_id)).cloned())
    }

    async fn put_xp_record(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        record: &XpRecord,
    ) -> Result<()> {
        // yield so that unserialized read-modify-write cycles would interleave
        tokio::task::yield_now().await;
        self.records
            .lock()
            .await
            .insert((guild_id, user_id), record.clone());
        Ok(())
    }

    async fn guild_cfg(&self, guild_id: GuildId) -> Result<Option<GuildCfg>> {
        Ok(self.cfgs.lock().await.get(&guild_id).cloned())
    }

    async fn put_guild_cfg(&self, guild_id: GuildId, cfg: &GuildCfg) -> Result<()> {
        self.cfgs.lock().await.insert(guild_id, cfg.clone());
        Ok(())
    }

    async fn members_by_normalized_name(
        &self,
        guild_id: GuildId,
        name_norm: &str,
        limit: usize,
    ) -> Result<Vec<MemberStanding>> {
        let records = self.records.lock().await;
        let mut found: Vec<MemberStanding> = records
            .iter()
            .filter(|((g, _), record)| {
                *g == guild_id && normalize(&record.profile.display_name) == name_norm
            })
            .map(|((_, u), record)| standing(&records, guild_id, *u, record))
            .collect();
        found.sort_by(|a, b| b.exp.cmp(&a.exp).then(a.user_id.cmp(&b.user_id)));
        found.truncate(limit);
        Ok(found)
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<MemberStanding>> {
        let records = self.records.lock().await;
        Ok(records
            .get(&(guild_id, user_id))
            .map(|record| standing(&records, guild_id, user_id, record)))
    }
}
