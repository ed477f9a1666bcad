use std::collections::HashSet;

use serenity::{
    framework::{
        standard::{
            help_commands,
            macros::{group, help, hook},
            Args, CommandError, CommandGroup, CommandResult, DispatchError, HelpOptions,
        },
        StandardFramework,
    },
    model::prelude::{ChannelId, GuildId, Message, UserId},
    prelude::Context,
};
use tracing::{error, info, warn};

use crate::immut_data::dynamic::BotCfg;

mod announce;
mod config;
mod ping;
mod rank;
mod role_panel;
mod rules;
mod translator;
mod voice;

use announce::ANNOUNCE_COMMAND;
use config::CONFIG_COMMAND;
use ping::PING_COMMAND;
use rank::RANK_COMMAND;
use role_panel::ROLEPANEL_COMMAND;
use rules::RULES_COMMAND;
use translator::TRANSLATOR_COMMAND;
use voice::VCJOIN_COMMAND;

#[group]
#[commands(ping, rank, rules, announce, translator, rolepanel, vcjoin, config)]
struct General;

#[help]
#[individual_command_tip = "Hello! こんにちは！Hola! Bonjour! 您好! 안녕하세요~\n\n\
If you want more information about a specific command, just pass the command as argument."]
#[command_not_found_text = "Could not find: `{}`."]
#[max_levenshtein_distance(3)]
#[indention_prefix = "+"]
#[lacking_permissions = "Hide"]
#[lacking_role = "Hide"]
#[wrong_channel = "Strike"]
async fn my_help(
    context: &Context,
    msg: &Message,
    args: Args,
    help_options: &'static HelpOptions,
    groups: &[&'static CommandGroup],
    owners: HashSet<UserId>,
) -> CommandResult {
    let _ = help_commands::with_embeds(context, msg, args, help_options, groups, owners).await;
    Ok(())
}

pub(crate) fn framework(cfg: &BotCfg) -> StandardFramework {
    StandardFramework::new()
        .configure(|c| {
            c.prefix(&cfg.discord_prefix)
                .owners(cfg.owners.clone())
                .case_insensitivity(true)
        })
        .on_dispatch_error(on_dispatch_error)
        .after(after)
        .help(&MY_HELP)
        .group(&GENERAL_GROUP)
}

/// Rejections by the framework, before any command ran.
#[hook]
async fn on_dispatch_error(
    ctx: &Context,
    msg: &Message,
    error: DispatchError,
    command_name: &str,
) {
    let reply = match error {
        DispatchError::LackingPermissions(_) | DispatchError::LackingRole => {
            "You don't have the permissions for this command.".to_owned()
        }
        DispatchError::OnlyForGuilds => "This command only works inside a server.".to_owned(),
        DispatchError::OnlyForOwners => "Only the bot owners can do that.".to_owned(),
        DispatchError::NotEnoughArguments { min, given } => {
            format!("`{command_name}` needs {min} arguments, but {given} were given.")
        }
        other => {
            warn!(command = command_name, error = ?other, "Command was not dispatched");
            return;
        }
    };
    info!(command = command_name, user_id = %msg.author.id, "Rejected a command");
    if let Err(e) = msg.reply(ctx, reply).await {
        error!(error = %e, "Failed to explain a rejected command");
    }
}

/// Logs failed commands and tells the invoker what went wrong.
#[hook]
async fn after(ctx: &Context, msg: &Message, command_name: &str, res: CommandResult) {
    let Err(e) = res else {
        return;
    };
    let reply = if let Some(input) = e.downcast_ref::<UserInputError>() {
        input.0.as_str()
    } else {
        error!(
            command = command_name,
            user_id = %msg.author.id,
            guild_id = ?msg.guild_id,
            error = %e,
            "Command failed"
        );
        "Something went wrong. Please try again in a moment."
    };
    if let Err(e) = msg.reply(ctx, reply).await {
        error!(error = %e, "Failed to report a command failure");
    }
}

/// Failure caused by the arguments of a command or by the guild's
/// configuration. Replied to the invoker as is.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct UserInputError(pub(crate) String);

fn user_error(text: impl Into<String>) -> CommandError {
    Box::new(UserInputError(text.into()))
}

/// `#[only_in(guilds)]` has already been checked.
fn guild_of(msg: &Message) -> Result<GuildId, CommandError> {
    msg.guild_id
        .ok_or_else(|| user_error("This command only works inside a server."))
}

/// Optional channel argument; defaults to the channel of the invocation.
fn target_channel(msg: &Message, args: &mut Args) -> Result<ChannelId, CommandError> {
    if args.is_empty() {
        return Ok(msg.channel_id);
    }
    parse_channel_arg(args)
}

fn parse_channel_arg(args: &mut Args) -> Result<ChannelId, CommandError> {
    let raw = args
        .single::<String>()
        .map_err(|_| user_error("Please mention a channel, like #general."))?;
    serenity::utils::parse_channel(&raw)
        .or_else(|| raw.parse::<u64>().ok())
        .map(ChannelId)
        .ok_or_else(|| user_error(format!("`{raw}` is not a channel.")))
}

/// The channel must belong to the guild the command was used in.
async fn ensure_guild_channel(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<(), CommandError> {
    let channels = guild_id.channels(&ctx.http).await?;
    if channels.contains_key(&channel_id) {
        Ok(())
    } else {
        Err(user_error("That channel is not part of this server."))
    }
}

#[cfg(test)]
mod tests {
    use serenity::framework::standard::Delimiter;

    use super::*;

    fn args(raw: &str) -> Args {
        Args::new(raw, &[Delimiter::Single(' ')])
    }

    #[test]
    fn channels_parse_from_mentions_and_ids() {
        let mut a = args("<#1100000000000000004> rest");
        assert_eq!(
            parse_channel_arg(&mut a).unwrap(),
            ChannelId(1100000000000000004)
        );
        assert_eq!(a.rest(), "rest");

        assert_eq!(parse_channel_arg(&mut args("42")).unwrap(), ChannelId(42));
    }

    #[test]
    fn non_channels_are_user_errors() {
        let err = parse_channel_arg(&mut args("general")).unwrap_err();
        let input = err.downcast_ref::<UserInputError>().unwrap();
        assert_eq!(input.0, "`general` is not a channel.");
    }
}
