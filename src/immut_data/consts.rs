use std::time::Duration;

use serenity::prelude::GatewayIntents;

use crate::app_state::exp::Exp;

pub(crate) const SCHEMA: &str = include_str!("../../schema.pgsql");

pub(crate) const DISCORD_INTENTS: GatewayIntents = {
    let guilds = GatewayIntents::GUILDS.bits();
    let messages = GatewayIntents::GUILD_MESSAGES.bits();
    let content = GatewayIntents::MESSAGE_CONTENT.bits();
    match GatewayIntents::from_bits(guilds | messages | content) {
        Some(intents) => intents,
        None => panic!("Invalid intents"),
    }
};

pub(crate) const EXP_PER_MSG: Exp = Exp(15);

pub(crate) const EXP_COOLDOWN: Duration = Duration::from_secs(60);

/// Upper bound of candidates shown for an ambiguous display name.
pub(crate) const MAX_CANDIDATES: usize = 5;

/// Fallback polling period of the rank card page.
pub(crate) const RANK_CARD_POLL_MS: u64 = 3000;
