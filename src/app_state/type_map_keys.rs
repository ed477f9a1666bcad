use std::sync::Arc;

use serenity::prelude::TypeMapKey;

use crate::immut_data::dynamic::BotCfg;

use super::AppState;

pub(crate) struct AppStateKey;
pub(crate) struct BotCfgKey;

impl TypeMapKey for AppStateKey {
    type Value = Arc<AppState>;
}

impl TypeMapKey for BotCfgKey {
    type Value = Arc<BotCfg>;
}
