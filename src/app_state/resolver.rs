//! Display-name lookups behind the web rank card.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serenity::model::prelude::{GuildId, UserId};
use tokio::sync::broadcast::{self, error::RecvError};
use unicode_normalization::UnicodeNormalization;

use super::{
    exp::{Exp, Level, LevelProgress, RankTier, TierBadge, TierCutoffs},
    ledger::{LedgerChange, XpLedger},
};
use crate::{
    db::{MemberStanding, Store},
    immut_data::{consts::MAX_CANDIDATES, dynamic::WHITESPACE},
};

/// NFKC, trimmed, inner whitespace collapsed, lowercase.
///
/// Applied both when a display name is stored and when one is looked up.
pub(crate) fn normalize(name: &str) -> String {
    let nfkc: String = name.nfkc().collect();
    WHITESPACE.replace_all(nfkc.trim(), " ").to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MemberCandidate {
    #[serde(serialize_with = "serialize_user_id")]
    pub(crate) user_id: UserId,
    pub(crate) display_name: String,
    pub(crate) username: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) xp: Exp,
    pub(crate) level: Level,
    pub(crate) tier: RankTier,
    pub(crate) tier_badge: TierBadge,
    /// Leaderboard position inside the guild.
    pub(crate) position: u64,
    pub(crate) progress: LevelProgress,
    pub(crate) message_count: u64,
    pub(crate) last_update: DateTime<Utc>,
}

// Snowflakes exceed the integer range of JavaScript.
fn serialize_user_id<S: serde::Serializer>(id: &UserId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&id.0.to_string())
}

impl MemberCandidate {
    fn new(standing: MemberStanding, cutoffs: &TierCutoffs) -> Self {
        let MemberStanding {
            user_id,
            profile,
            exp,
            message_count,
            last_update,
            position,
        } = standing;
        let level = exp.level();
        let tier = cutoffs.tier(level);
        MemberCandidate {
            user_id,
            display_name: profile.display_name,
            username: profile.username,
            avatar_url: profile.avatar_url,
            xp: exp,
            level,
            tier,
            tier_badge: tier.into(),
            position,
            progress: exp.progress(),
            message_count,
            last_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum Resolution {
    NotFound { query: String },
    #[serde(rename = "ready")]
    Unique { member: MemberCandidate },
    Ambiguous { candidates: Vec<MemberCandidate> },
}

pub(crate) struct Resolver {
    store: Arc<dyn Store>,
    ledger: Arc<XpLedger>,
}

impl Resolver {
    pub(crate) fn new(store: Arc<dyn Store>, ledger: Arc<XpLedger>) -> Self {
        Self { store, ledger }
    }

    async fn cutoffs(&self, guild_id: GuildId) -> crate::error::Result<TierCutoffs> {
        let cfg = self.store.guild_cfg(guild_id).await?;
        Ok(cfg.map(|cfg| cfg.tiers).unwrap_or_default())
    }

    pub(crate) async fn resolve(
        &self,
        guild_id: GuildId,
        display_name: &str,
    ) -> crate::error::Result<Resolution> {
        let name_norm = normalize(display_name);
        if name_norm.is_empty() {
            return Ok(Resolution::NotFound {
                query: display_name.trim().to_owned(),
            });
        }
        let found = self
            .store
            .members_by_normalized_name(guild_id, &name_norm, MAX_CANDIDATES)
            .await?;
        let cutoffs = self.cutoffs(guild_id).await?;
        let mut candidates: Vec<MemberCandidate> = found
            .into_iter()
            .map(|standing| MemberCandidate::new(standing, &cutoffs))
            .collect();
        let resolution = match candidates.len() {
            0 => Resolution::NotFound {
                query: display_name.trim().to_owned(),
            },
            1 => Resolution::Unique {
                member: candidates.remove(0),
            },
            _ => Resolution::Ambiguous { candidates },
        };
        Ok(resolution)
    }

    pub(crate) async fn member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> crate::error::Result<Option<MemberCandidate>> {
        let Some(standing) = self.store.member(guild_id, user_id).await? else {
            return Ok(None);
        };
        let cutoffs = self.cutoffs(guild_id).await?;
        Ok(Some(MemberCandidate::new(standing, &cutoffs)))
    }

    /// Live variant of [`Resolver::resolve`].
    pub(crate) fn watch(self: &Arc<Self>, guild_id: GuildId, display_name: &str) -> RankCardWatch {
        RankCardWatch {
            resolver: Arc::clone(self),
            changes: self.ledger.subscribe(),
            guild_id,
            display_name: display_name.to_owned(),
            last: None,
        }
    }
}

/// Re-resolves a display name whenever the guild's records change.
///
/// Dropping the watch ends the subscription.
pub(crate) struct RankCardWatch {
    resolver: Arc<Resolver>,
    changes: broadcast::Receiver<LedgerChange>,
    guild_id: GuildId,
    display_name: String,
    last: Option<Resolution>,
}

impl RankCardWatch {
    /// Waits until a write touches the watched guild.
    ///
    /// Returns `false` once the ledger is gone. Cancel safe.
    pub(crate) async fn changed(&mut self) -> bool {
        loop {
            match self.changes.recv().await {
                Ok(LedgerChange { guild_id, .. }) if guild_id == self.guild_id => return true,
                Ok(_) => {}
                // missed some writes; one of them might have been ours
                Err(RecvError::Lagged(_)) => return true,
                Err(RecvError::Closed) => return false,
            }
        }
    }

    /// Resolves again and returns the result if it differs from the last
    /// one delivered.
    pub(crate) async fn refresh(&mut self) -> crate::error::Result<Option<Resolution>> {
        let resolution = self
            .resolver
            .resolve(self.guild_id, &self.display_name)
            .await?;
        if self.last.as_ref() == Some(&resolution) {
            return Ok(None);
        }
        self.last = Some(resolution.clone());
        Ok(Some(resolution))
    }

    /// The current resolution first, then every change of it.
    pub(crate) async fn next(&mut self) -> Option<crate::error::Result<Resolution>> {
        if self.last.is_some() && !self.changed().await {
            return None;
        }
        loop {
            match self.refresh().await {
                Ok(Some(resolution)) => return Some(Ok(resolution)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
            if !self.changed().await {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        app_state::{guild_cfg::GuildCfg, ledger::tests::profile},
        db::mem::MemStore,
    };

    const G: GuildId = GuildId(1);

    fn setup() -> (Arc<MemStore>, Arc<XpLedger>, Arc<Resolver>) {
        let store = Arc::new(MemStore::default());
        let ledger = Arc::new(XpLedger::new(Arc::clone(&store) as Arc<dyn Store>));
        let resolver = Arc::new(Resolver::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&ledger),
        ));
        (store, ledger, resolver)
    }

    #[test]
    fn normalization_folds_case_width_and_spaces() {
        assert_eq!(normalize("  AKI "), "aki");
        assert_eq!(normalize("Ａｋｉ"), "aki");
        assert_eq!(normalize("Aki\t  Tanaka"), "aki tanaka");
        assert_eq!(normalize("ｶﾞｰﾄﾞ"), normalize("ガード"));
    }

    #[tokio::test]
    async fn same_name_in_different_case_is_ambiguous() {
        let (_store, ledger, resolver) = setup();
        ledger.grant_xp(G, UserId(10), Exp(30), &profile("Aki")).await.unwrap();
        ledger.grant_xp(G, UserId(11), Exp(90), &profile("aki")).await.unwrap();

        for query in ["AKI", "aki", "  Aki  ", "ＡＫＩ"] {
            let Resolution::Ambiguous { candidates } = resolver.resolve(G, query).await.unwrap()
            else {
                panic!("expected an ambiguous result for {query:?}");
            };
            let ids: Vec<UserId> = candidates.iter().map(|c| c.user_id).collect();
            assert_eq!(ids, vec![UserId(11), UserId(10)]);
            assert_eq!(candidates[0].position, 1);
            assert_eq!(candidates[1].position, 2);
        }
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let (_store, ledger, resolver) = setup();
        ledger.grant_xp(G, UserId(10), Exp(30), &profile("Aki")).await.unwrap();
        assert_eq!(
            resolver.resolve(G, "Nobody").await.unwrap(),
            Resolution::NotFound {
                query: "Nobody".to_owned()
            }
        );
        assert!(matches!(
            resolver.resolve(G, "   ").await.unwrap(),
            Resolution::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn names_are_scoped_to_the_guild() {
        let (_store, ledger, resolver) = setup();
        ledger.grant_xp(G, UserId(10), Exp(30), &profile("Aki")).await.unwrap();
        ledger
            .grant_xp(GuildId(2), UserId(11), Exp(30), &profile("Aki"))
            .await
            .unwrap();
        assert!(matches!(
            resolver.resolve(G, "aki").await.unwrap(),
            Resolution::Unique { .. }
        ));
    }

    #[tokio::test]
    async fn single_match_is_unique_with_tier() {
        let (store, ledger, resolver) = setup();
        store
            .put_guild_cfg(
                G,
                &GuildCfg {
                    tiers: TierCutoffs {
                        arcadia: Level(1),
                        apex: Level(2),
                        legendary: Level(3),
                    },
                    ..GuildCfg::default()
                },
            )
            .await
            .unwrap();
        ledger.grant_xp(G, UserId(10), Exp(450), &profile("Aki")).await.unwrap();

        let Resolution::Unique { member } = resolver.resolve(G, "aki").await.unwrap() else {
            panic!("expected a unique result");
        };
        assert_eq!(member.user_id, UserId(10));
        assert_eq!(member.level, Level(2));
        assert_eq!(member.tier, RankTier::Apex);
        assert_eq!(member.tier_badge.emoji, RankTier::Apex.emoji());
        assert_eq!(member.display_name, "Aki");
        assert_eq!(member.message_count, 1);
    }

    #[tokio::test]
    async fn candidates_are_bounded() {
        let (_store, ledger, resolver) = setup();
        for user in 0..8 {
            ledger
                .grant_xp(G, UserId(100 + user), Exp(user), &profile("Aki"))
                .await
                .unwrap();
        }
        let Resolution::Ambiguous { candidates } = resolver.resolve(G, "aki").await.unwrap() else {
            panic!("expected an ambiguous result");
        };
        assert_eq!(candidates.len(), MAX_CANDIDATES);
        assert_eq!(candidates[0].xp, Exp(7));
    }

    #[tokio::test]
    async fn watch_redelivers_on_change() {
        let (_store, ledger, resolver) = setup();
        let mut watch = resolver.watch(G, "Aki");

        let first = watch.next().await.unwrap().unwrap();
        assert!(matches!(first, Resolution::NotFound { .. }));

        ledger.grant_xp(G, UserId(10), Exp(30), &profile("Aki")).await.unwrap();
        let Resolution::Unique { member } = watch.next().await.unwrap().unwrap() else {
            panic!("expected a unique result");
        };
        assert_eq!(member.xp, Exp(30));

        // a write elsewhere does not change the result
        ledger.grant_xp(G, UserId(20), Exp(1), &profile("Bo")).await.unwrap();
        ledger.grant_xp(G, UserId(10), Exp(5), &profile("Aki")).await.unwrap();
        let Resolution::Unique { member } = watch.next().await.unwrap().unwrap() else {
            panic!("expected a unique result");
        };
        assert_eq!(member.xp, Exp(35));

        ledger.grant_xp(G, UserId(11), Exp(1), &profile("AKI")).await.unwrap();
        assert!(matches!(
            watch.next().await.unwrap().unwrap(),
            Resolution::Ambiguous { .. }
        ));
    }

    #[tokio::test]
    async fn watch_ignores_other_guilds() {
        let (_store, ledger, resolver) = setup();
        let mut watch = resolver.watch(G, "Aki");
        watch.next().await.unwrap().unwrap();

        ledger
            .grant_xp(GuildId(2), UserId(10), Exp(30), &profile("Aki"))
            .await
            .unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), watch.next()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn resolution_serializes_with_status_tags() {
        let json = serde_json::to_value(Resolution::NotFound {
            query: "Aki".to_owned(),
        })
        .unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["query"], "Aki");
    }
}
