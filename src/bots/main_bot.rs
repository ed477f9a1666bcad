use std::sync::Arc;

use serenity::{
    async_trait,
    model::{
        application::interaction::Interaction,
        prelude::{GuildId, Message, Ready},
    },
    prelude::{Context, EventHandler},
    utils::MessageBuilder,
};
use tracing::{debug, error, info};
use url::Url;

use crate::{
    app_state::{exp::Level, AppState},
    error::Result,
    immut_data::{consts::EXP_PER_MSG, dynamic::BotCfg},
    interactions,
    util::profile_of,
    web::member_card_url,
};

use super::bot::{impl_bot, Bot};

/// The event handler of the bot.
///
/// Commands do not have direct access to the [MainBot] struct and use
/// [Context::data] instead, which holds the same [AppState].
pub(crate) struct MainBot {
    /// Deployment configuration.
    pub(crate) cfg: Arc<BotCfg>,
    /// Ledger, cooldowns, resolver and the rules stepper.
    pub(crate) state: Arc<AppState>,
}

impl MainBot {
    pub(crate) fn new(cfg: Arc<BotCfg>, state: Arc<AppState>) -> Self {
        Self { cfg, state }
    }

    /// Grants the exp for one chat message and announces level ups.
    async fn reward_message(&self, ctx: &Context, guild_id: GuildId, msg: &Message) -> Result<()> {
        let state = self.state();
        if !state.cooldowns.try_consume(msg.author.id) {
            return Ok(());
        }
        let profile = profile_of(msg);
        let grant = state
            .ledger
            .grant_xp(guild_id, msg.author.id, EXP_PER_MSG, &profile)
            .await?;
        debug!(%guild_id, user_id = %msg.author.id, exp = %grant.exp, "Granted exp");

        if !grant.leveled_up() {
            return Ok(());
        }
        info!(%guild_id, user_id = %msg.author.id, level = %grant.level, "Member leveled up");
        let url = member_card_url(&self.cfg().web_base_url, guild_id, msg.author.id)?;
        let notice = level_up_notice(&profile.display_name, grant.level, &url);
        msg.channel_id.say(&ctx.http, notice).await?;
        Ok(())
    }
}

/// Pings nobody, whatever the display name contains.
fn level_up_notice(display_name: &str, level: Level, card_url: &Url) -> String {
    MessageBuilder::new()
        .push("🎉 ")
        .push_bold_safe(display_name)
        .push(" reached level ")
        .push_bold(level)
        .push("! ")
        .push(format!("[Rank card](<{card_url}>)"))
        .build()
}

impl_bot!(MainBot);

#[async_trait]
impl EventHandler for MainBot {
    async fn ready(&self, _: Context, ready: Ready) {
        let bot_name: &str = &ready.user.name;
        info!(guilds = ready.guilds.len(), "{bot_name} is at your service! 🌸");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.content.starts_with(self.discord_prefix()) {
            return;
        }
        // no exp for direct messages
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        if let Err(e) = self.reward_message(&ctx, guild_id, &msg).await {
            error!(%guild_id, user_id = %msg.author.id, error = %e, "Failed to reward a message");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        interactions::handle(&ctx, interaction).await;
    }
}
