use core::str::FromStr;

use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::Message,
    prelude::Context,
    utils::Colour,
};
use tracing::info;

use super::{ensure_guild_channel, guild_of, parse_channel_arg, user_error};

const COLOR_NAMES: &str = "blue, green, red, yellow, purple";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnnounceColor {
    Blue,
    Green,
    Red,
    Yellow,
    Purple,
}

impl AnnounceColor {
    pub(crate) fn colour(self) -> Colour {
        match self {
            AnnounceColor::Blue => Colour::new(0x3498db),
            AnnounceColor::Green => Colour::new(0x2ecc71),
            AnnounceColor::Red => Colour::new(0xe74c3c),
            AnnounceColor::Yellow => Colour::new(0xf1c40f),
            AnnounceColor::Purple => Colour::new(0x9b59b6),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown color `{0}`, pick one of: {}", COLOR_NAMES)]
pub(crate) struct UnknownColor(String);

impl FromStr for AnnounceColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blue" => Ok(AnnounceColor::Blue),
            "green" => Ok(AnnounceColor::Green),
            "red" => Ok(AnnounceColor::Red),
            "yellow" => Ok(AnnounceColor::Yellow),
            "purple" => Ok(AnnounceColor::Purple),
            _ => Err(UnknownColor(s.to_owned())),
        }
    }
}

/// Splits `<title> | <body>`; both parts must be non-empty.
fn title_and_body(rest: &str) -> Option<(&str, &str)> {
    let (title, body) = rest.split_once('|')?;
    let (title, body) = (title.trim(), body.trim());
    (!title.is_empty() && !body.is_empty()).then_some((title, body))
}

#[command]
#[only_in(guilds)]
#[required_permissions("ADMINISTRATOR")]
#[description = "Post an announcement embed."]
#[usage = "<#channel> <color> <title> | <body>"]
#[example = "#news blue Movie night | Join us on Friday at 8pm!"]
#[min_args(3)]
async fn announce(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let channel_id = parse_channel_arg(&mut args)?;
    let color = args
        .single::<String>()
        .map_err(|_| user_error(format!("Please pick a color: {COLOR_NAMES}.")))?
        .parse::<AnnounceColor>()
        .map_err(|e| user_error(e.to_string()))?;
    let Some((title, body)) = title_and_body(args.rest()) else {
        return Err(user_error("Separate the title and the body with `|`."));
    };
    ensure_guild_channel(ctx, guild_id, channel_id).await?;

    channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title(title)
                    .description(body)
                    .colour(color.colour())
                    .timestamp(msg.timestamp)
            })
        })
        .await?;
    info!(%guild_id, %channel_id, ?color, "Posted an announcement");

    if channel_id != msg.channel_id {
        msg.reply(ctx, "Announced! :loudspeaker:").await?;
    }
    Ok(())
}
