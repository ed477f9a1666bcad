//! Button, select menu and modal handling.
//!
//! Every custom id is parsed into a [`CustomId`] first; ids the bot did not
//! render are answered with [`STALE_CONTROL`] and never reach a handler.

use serenity::{
    builder::CreateComponents,
    http::Http,
    model::application::{
        component::ActionRowComponent,
        interaction::{
            message_component::MessageComponentInteraction, modal::ModalSubmitInteraction,
            Interaction, InteractionResponseType,
        },
    },
    prelude::Context,
};
use tracing::{debug, error, warn};

use crate::{app_state::AppState, custom_id::CustomId, error::Result};

mod role_panel;
mod rules;
mod translator;
mod voice;

pub(crate) const STALE_CONTROL: &str = "This control is no longer valid.";
pub(crate) const GENERIC_FAILURE: &str = "Something went wrong. Please try again in a moment.";
pub(crate) const GUILD_ONLY: &str = "This only works inside a server.";

pub(crate) async fn handle(ctx: &Context, interaction: Interaction) {
    match interaction {
        Interaction::MessageComponent(component) => {
            if let Err(e) = on_component(ctx, &component).await {
                error!(
                    custom_id = %component.data.custom_id,
                    user_id = %component.user.id,
                    error = %e,
                    "Failed to handle a component interaction"
                );
                if let Err(e) = reply_ephemeral(&ctx.http, &component, GENERIC_FAILURE).await {
                    debug!(error = %e, "Could not report the failure");
                }
            }
        }
        Interaction::ModalSubmit(modal) => {
            if let Err(e) = on_modal(ctx, &modal).await {
                error!(
                    custom_id = %modal.data.custom_id,
                    user_id = %modal.user.id,
                    error = %e,
                    "Failed to handle a modal submission"
                );
                if let Err(e) = reply_modal_ephemeral(&ctx.http, &modal, GENERIC_FAILURE).await {
                    debug!(error = %e, "Could not report the failure");
                }
            }
        }
        _ => {}
    }
}

fn parse(raw: &str, user_id: impl std::fmt::Display) -> Option<CustomId> {
    match raw.parse::<CustomId>() {
        Ok(custom_id) => Some(custom_id),
        Err(e) => {
            warn!(custom_id = raw, %user_id, error = %e, "Rejected a custom id");
            None
        }
    }
}

async fn on_component(ctx: &Context, component: &MessageComponentInteraction) -> Result<()> {
    let Some(custom_id) = parse(&component.data.custom_id, component.user.id) else {
        return reply_ephemeral(&ctx.http, component, STALE_CONTROL).await;
    };
    let Some(guild_id) = component.guild_id else {
        return reply_ephemeral(&ctx.http, component, GUILD_ONLY).await;
    };
    let state = AppState::from_ctx(ctx).await?;
    match custom_id {
        CustomId::Rules(token) => {
            rules::on_component(ctx, &state, guild_id, component, token).await
        }
        CustomId::TranslatorApply => translator::open_form(ctx, &state, guild_id, component).await,
        CustomId::VoiceDecision {
            approve,
            channel_id,
            user_id,
        } => {
            let decision = voice::Decision {
                approve,
                channel_id,
                user_id,
            };
            voice::decide(ctx, &state, guild_id, component, decision).await
        }
        CustomId::RolePanel => role_panel::on_select(ctx, &state, guild_id, component).await,
        CustomId::TranslatorForm => reply_ephemeral(&ctx.http, component, STALE_CONTROL).await,
    }
}

async fn on_modal(ctx: &Context, modal: &ModalSubmitInteraction) -> Result<()> {
    let Some(custom_id) = parse(&modal.data.custom_id, modal.user.id) else {
        return reply_modal_ephemeral(&ctx.http, modal, STALE_CONTROL).await;
    };
    let Some(guild_id) = modal.guild_id else {
        return reply_modal_ephemeral(&ctx.http, modal, GUILD_ONLY).await;
    };
    let state = AppState::from_ctx(ctx).await?;
    match custom_id {
        CustomId::Rules(token) => rules::on_modal(ctx, &state, guild_id, modal, token).await,
        CustomId::TranslatorForm => translator::submit(ctx, &state, guild_id, modal).await,
        CustomId::TranslatorApply | CustomId::VoiceDecision { .. } | CustomId::RolePanel => {
            reply_modal_ephemeral(&ctx.http, modal, STALE_CONTROL).await
        }
    }
}

/// Answers with a new ephemeral message, leaving the clicked controls intact.
pub(crate) async fn reply_ephemeral(
    http: &Http,
    component: &MessageComponentInteraction,
    text: &str,
) -> Result<()> {
    component
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|d| d.ephemeral(true).content(text))
        })
        .await?;
    Ok(())
}

pub(crate) async fn reply_modal_ephemeral(
    http: &Http,
    modal: &ModalSubmitInteraction,
    text: &str,
) -> Result<()> {
    modal
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|d| d.ephemeral(true).content(text))
        })
        .await?;
    Ok(())
}

/// Replaces the message carrying the clicked component with plain text.
pub(crate) async fn replace_with_text(
    http: &Http,
    component: &MessageComponentInteraction,
    text: &str,
) -> Result<()> {
    component
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|d| {
                    d.content(text)
                        .set_embeds(Vec::new())
                        .set_components(CreateComponents::default())
                })
        })
        .await?;
    Ok(())
}

/// Value of the text input `input_id` of a submitted modal.
pub(crate) fn input_value<'m>(modal: &'m ModalSubmitInteraction, input_id: &str) -> Option<&'m str> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| &row.components)
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == input_id => {
                Some(input.value.as_str())
            }
            _ => None,
        })
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
