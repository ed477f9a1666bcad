use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serenity::model::prelude::{GuildId, UserId};
use tokio::sync::broadcast;

use super::exp::{Exp, Level};
use crate::{db::Store, error::Error};

/// How a member was last seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberProfile {
    pub(crate) username: String,
    pub(crate) display_name: String,
    pub(crate) avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XpRecord {
    pub(crate) exp: Exp,
    /// Always `exp.level()`.
    pub(crate) level: Level,
    pub(crate) profile: MemberProfile,
    /// Messages that earned exp.
    pub(crate) message_count: u64,
    pub(crate) last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct XpGrant {
    pub(crate) exp: Exp,
    pub(crate) level: Level,
    pub(crate) previous_level: Level,
}

impl XpGrant {
    pub(crate) fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Published after every successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LedgerChange {
    pub(crate) guild_id: GuildId,
    pub(crate) user_id: UserId,
}

type Key = (GuildId, UserId);

type KeyLocks = Mutex<HashMap<Key, Arc<tokio::sync::Mutex<()>>>>;

/// A member's entry in [`XpLedger`]'s lock map.
///
/// The entry is removed when its last holder drops, even if the grant was
/// cancelled while waiting.
struct KeyLock<'l> {
    locks: &'l KeyLocks,
    key: Key,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'l> KeyLock<'l> {
    fn acquire(locks: &'l KeyLocks, key: Key) -> Self {
        let lock = Arc::clone(
            locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default(),
        );
        Self { locks, key, lock }
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference is held by the map and one by us
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Exp bookkeeping on top of a [`Store`].
///
/// Read-modify-write cycles are serialized per (guild, member) key, so
/// concurrent grants for the same member are never lost.
pub(crate) struct XpLedger {
    store: Arc<dyn Store>,
    locks: KeyLocks,
    changes: broadcast::Sender<LedgerChange>,
}

impl XpLedger {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        let (changes, _) = broadcast::channel(1024);
        Self {
            store,
            locks: Mutex::default(),
            changes,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.changes.subscribe()
    }

    /// Adds `amount` to the member's exp and persists the refreshed record.
    ///
    /// A zero `amount` reads the current standing while refreshing the
    /// profile; only grants above zero count as a message.
    pub(crate) async fn grant_xp(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        amount: Exp,
        profile: &MemberProfile,
    ) -> crate::error::Result<XpGrant> {
        let key_lock = KeyLock::acquire(&self.locks, (guild_id, user_id));
        let res = {
            let _guard = key_lock.lock.lock().await;
            self.grant_locked(guild_id, user_id, amount, profile).await
        };
        drop(key_lock);

        if res.is_ok() {
            // nobody listening is fine
            let _ = self.changes.send(LedgerChange { guild_id, user_id });
        }
        res
    }

    async fn grant_locked(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        amount: Exp,
        profile: &MemberProfile,
    ) -> crate::error::Result<XpGrant> {
        let previous = self.store.xp_record(guild_id, user_id).await?;
        let old_exp = previous.as_ref().map_or(Exp(0), |r| r.exp);
        let exp = old_exp
            .checked_add(amount)
            .ok_or(Error::ExpOverflow(old_exp.0))?;
        let mut message_count = previous.as_ref().map_or(0, |r| r.message_count);
        if amount > Exp(0) {
            message_count = message_count.saturating_add(1);
        }
        let record = XpRecord {
            exp,
            level: exp.level(),
            profile: profile.clone(),
            message_count,
            last_update: Utc::now(),
        };
        self.store.put_xp_record(guild_id, user_id, &record).await?;
        Ok(XpGrant {
            exp,
            level: record.level,
            previous_level: old_exp.level(),
        })
    }
}
