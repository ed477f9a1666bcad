use serenity::{
    model::{
        application::{
            component::InputTextStyle,
            interaction::{
                message_component::MessageComponentInteraction, modal::ModalSubmitInteraction,
                InteractionResponseType,
            },
        },
        prelude::GuildId,
    },
    prelude::{Context, Mentionable},
    utils::Colour,
};
use tracing::info;

use super::{input_value, reply_ephemeral, reply_modal_ephemeral};
use crate::{
    app_state::AppState,
    custom_id::{inputs, TRANSLATOR_FORM},
    error::Result,
};

const CLOSED: &str = "Translator applications are closed in this server.";
const INCOMPLETE: &str = "Please fill in every field of the application.";
const RECEIVED: &str = "Thank you! Your application was sent to the team.";

pub(super) async fn open_form(
    ctx: &Context,
    state: &AppState,
    guild_id: GuildId,
    component: &MessageComponentInteraction,
) -> Result<()> {
    if state.guild_cfg(guild_id).await?.translator.is_none() {
        return reply_ephemeral(&ctx.http, component, CLOSED).await;
    }
    component
        .create_interaction_response(&ctx.http, |r| {
            r.kind(InteractionResponseType::Modal)
                .interaction_response_data(|d| {
                    d.custom_id(TRANSLATOR_FORM)
                        .title("Translator application")
                        .components(|c| {
                            c.create_action_row(|row| {
                                row.create_input_text(|input| {
                                    input
                                        .custom_id(inputs::LANGUAGES)
                                        .label("Which languages do you translate between?")
                                        .style(InputTextStyle::Short)
                                        .max_length(100)
                                        .required(true)
                                })
                            })
                            .create_action_row(|row| {
                                row.create_input_text(|input| {
                                    input
                                        .custom_id(inputs::EXPERIENCE)
                                        .label("Tell us about your experience")
                                        .style(InputTextStyle::Paragraph)
                                        .max_length(1000)
                                        .required(true)
                                })
                            })
                        })
                })
        })
        .await?;
    Ok(())
}

pub(super) async fn submit(
    ctx: &Context,
    state: &AppState,
    guild_id: GuildId,
    modal: &ModalSubmitInteraction,
) -> Result<()> {
    let Some(translator) = state.guild_cfg(guild_id).await?.translator else {
        return reply_modal_ephemeral(&ctx.http, modal, CLOSED).await;
    };
    let (Some(languages), Some(experience)) = (
        input_value(modal, inputs::LANGUAGES),
        input_value(modal, inputs::EXPERIENCE),
    ) else {
        return reply_modal_ephemeral(&ctx.http, modal, INCOMPLETE).await;
    };

    translator
        .review_channel
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title("Translator application")
                    .field("Applicant", modal.user.mention(), false)
                    .field("Languages", languages, false)
                    .field("Experience", experience, false)
                    .thumbnail(modal.user.face())
                    .colour(Colour::GOLD)
            })
        })
        .await?;
    info!(%guild_id, user_id = %modal.user.id, "Received a translator application");

    reply_modal_ephemeral(&ctx.http, modal, RECEIVED).await
}
