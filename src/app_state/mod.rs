use std::sync::Arc;

use serenity::{model::prelude::GuildId, prelude::Context};

use crate::{
    db::Store,
    error::{Error, Result},
    immut_data::consts::EXP_COOLDOWN,
    rules::stepper::RulesStepper,
};

use self::{
    cooldown::Cooldowns, guild_cfg::GuildCfg, ledger::XpLedger, resolver::Resolver,
    type_map_keys::AppStateKey,
};

pub(crate) mod cooldown;
pub(crate) mod exp;
pub(crate) mod guild_cfg;
pub(crate) mod ledger;
pub(crate) mod resolver;
pub(crate) mod type_map_keys;

/// Run-time state shared by the event handler, the commands and the web
/// server.
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) ledger: Arc<XpLedger>,
    pub(crate) cooldowns: Cooldowns,
    pub(crate) resolver: Arc<Resolver>,
    pub(crate) rules: RulesStepper,
}

impl AppState {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        let ledger = Arc::new(XpLedger::new(Arc::clone(&store)));
        let resolver = Arc::new(Resolver::new(Arc::clone(&store), Arc::clone(&ledger)));
        AppState {
            store,
            ledger,
            cooldowns: Cooldowns::new(EXP_COOLDOWN),
            resolver,
            rules: RulesStepper::default(),
        }
    }

    /// The stored configuration, or the default one with every feature off.
    pub(crate) async fn guild_cfg(&self, guild_id: GuildId) -> Result<GuildCfg> {
        Ok(self.store.guild_cfg(guild_id).await?.unwrap_or_default())
    }

    /// Commands and handlers reach the state through [`Context::data`].
    pub(crate) async fn from_ctx(ctx: &Context) -> Result<Arc<Self>> {
        let rlock = ctx.data.read().await;
        rlock
            .get::<AppStateKey>()
            .cloned()
            .ok_or(Error::TypeMap("AppStateKey"))
    }
}
