use serenity::{
    framework::standard::{macros::command, CommandResult},
    model::prelude::Message,
    prelude::Context,
    utils::Colour,
};

use super::{guild_of, user_error};
use crate::{
    app_state::{exp::Exp, AppState},
    util::{bot_cfg, profile_of},
    web::member_card_url,
};

#[command]
#[only_in(guilds)]
#[description = "Show your level, rank tier and place on the leaderboard."]
async fn rank(ctx: &Context, msg: &Message) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let state = AppState::from_ctx(ctx).await?;
    let cfg = bot_cfg(ctx).await?;

    // a zero grant refreshes the profile without touching the exp
    let profile = profile_of(msg);
    state
        .ledger
        .grant_xp(guild_id, msg.author.id, Exp(0), &profile)
        .await?;
    let Some(card) = state.resolver.member(guild_id, msg.author.id).await? else {
        return Err(user_error("I couldn't find your record, please try again."));
    };
    let url = member_card_url(&cfg.web_base_url, guild_id, msg.author.id)?;
    let next_level = card.level.0 + 1;

    msg.channel_id
        .send_message(&ctx.http, |m| {
            m.reference_message(msg).embed(|e| {
                e.author(|a| a.name(&card.display_name).icon_url(msg.author.face()))
                    .title("Rank card")
                    .url(url.as_str())
                    .field("Level", card.level, true)
                    .field("XP", card.xp, true)
                    .field("Rank", format!("#{}", card.position), true)
                    .field(
                        "Tier",
                        format!("{} {}", card.tier_badge.emoji, card.tier_badge.name),
                        true,
                    )
                    .field("Messages", card.message_count, true)
                    .field(
                        "Last active",
                        card.last_update.format("%Y-%m-%d %H:%M UTC"),
                        true,
                    )
                    .field(
                        format!("Progress to level {next_level}"),
                        format!(
                            "{} / {} ({}%)",
                            card.progress.into_level,
                            card.progress.level_span,
                            card.progress.percent()
                        ),
                        false,
                    )
                    .colour(Colour::BLURPLE)
            })
        })
        .await?;
    Ok(())
}
