use std::sync::Arc;

use serenity::{
    model::prelude::{Message, User},
    prelude::Context,
};

use crate::{
    app_state::{ledger::MemberProfile, type_map_keys::BotCfgKey},
    error::{Error, Result},
    immut_data::dynamic::BotCfg,
};

pub(crate) mod macros;

/// How the author of `msg` currently appears in the guild.
pub(crate) fn profile_of(msg: &Message) -> MemberProfile {
    let nick = msg.member.as_ref().and_then(|m| m.nick.clone());
    profile(&msg.author, nick)
}

/// The guild nickname, else the account name. serenity 0.11 does not expose
/// the global display name.
pub(crate) fn profile(user: &User, nick: Option<String>) -> MemberProfile {
    MemberProfile {
        username: user.name.clone(),
        display_name: nick.unwrap_or_else(|| user.name.clone()),
        avatar_url: Some(user.face()),
    }
}

pub(crate) async fn bot_cfg(ctx: &Context) -> Result<Arc<BotCfg>> {
    let rlock = ctx.data.read().await;
    rlock
        .get::<BotCfgKey>()
        .cloned()
        .ok_or(Error::TypeMap("BotCfgKey"))
}
