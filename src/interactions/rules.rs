use std::{sync::Arc, time::Duration};

use serenity::{
    builder::{CreateComponents, CreateEmbed},
    http::Http,
    model::{
        application::{
            component::{ButtonStyle, InputTextStyle},
            interaction::{
                message_component::MessageComponentInteraction, modal::ModalSubmitInteraction,
                InteractionResponseType,
            },
        },
        prelude::GuildId,
    },
    prelude::Context,
    utils::Colour,
};
use tracing::{error, info, warn};

use super::{input_value, reply_ephemeral, reply_modal_ephemeral, STALE_CONTROL};
use crate::{
    app_state::{
        guild_cfg::{RulesCfg, RulesLanguage, RulesTexts},
        AppState,
    },
    custom_id::inputs,
    error::Result,
    rules::{
        stepper::{Screen, Step, StepError},
        token::RuleToken,
    },
    util::profile,
};

const NOT_CONFIGURED: &str = "The rules are not set up in this server.";
const INTRO_MAX_LEN: u64 = 1000;

pub(super) async fn on_component(
    ctx: &Context,
    state: &AppState,
    guild_id: GuildId,
    component: &MessageComponentInteraction,
    token: RuleToken,
) -> Result<()> {
    let cfg = state.guild_cfg(guild_id).await?;
    let Some(rules) = cfg.rules.as_ref() else {
        return reply_ephemeral(&ctx.http, component, NOT_CONFIGURED).await;
    };
    if let RuleToken::FollowUp { lang } = &token {
        return open_followup_form(ctx, component, rules, lang).await;
    }

    let user_id = component.user.id;
    let selected = component.data.values.first().map(String::as_str);
    // the entry button lives on a public message; later steps edit the
    // member's own ephemeral message
    let kind = if token == RuleToken::Start {
        InteractionResponseType::ChannelMessageWithSource
    } else {
        InteractionResponseType::UpdateMessage
    };

    let step = state
        .rules
        .advance(rules, &*ctx.http, guild_id, user_id, &token, selected)
        .await;
    match step {
        Ok(Step::Show(screen)) => {
            let (embed, components) = render(rules, &screen);
            component
                .create_interaction_response(&ctx.http, |r| {
                    r.kind(kind).interaction_response_data(|d| {
                        d.ephemeral(true)
                            .content("")
                            .set_embed(embed)
                            .set_components(components)
                    })
                })
                .await?;
        }
        Ok(Step::AlreadyCompleted(texts)) => {
            component
                .create_interaction_response(&ctx.http, |r| {
                    r.kind(kind).interaction_response_data(|d| {
                        d.ephemeral(true)
                            .content(&texts.already_completed)
                            .set_embeds(Vec::new())
                            .set_components(CreateComponents::default())
                    })
                })
                .await?;
        }
        Ok(Step::InProgress(texts)) => {
            reply_ephemeral(&ctx.http, component, &texts.in_progress).await?;
        }
        Ok(Step::Complete(ticket)) => {
            let lang = ticket.lang();
            let retry = ticket.retry_screen();
            component
                .create_interaction_response(&ctx.http, |r| {
                    r.kind(kind).interaction_response_data(|d| {
                        d.ephemeral(true)
                            .content("")
                            .embed(|e| {
                                e.title(&lang.texts.title)
                                    .description(&lang.texts.completed)
                                    .colour(Colour::DARK_GREEN)
                            })
                            .set_components(CreateComponents::default())
                    })
                })
                .await?;

            match ticket.finish(&*ctx.http).await {
                Ok(completion) => info!(
                    %guild_id,
                    %user_id,
                    lang = %lang.code,
                    added = completion.added.len(),
                    removed = completion.removed.len(),
                    "Member accepted the rules"
                ),
                Err(e) => {
                    error!(%guild_id, %user_id, error = %e, "Failed to apply the rules roles");
                    // back to the last rule, so agreeing again retries
                    let (embed, components) = render(rules, &retry);
                    component
                        .edit_original_interaction_response(&ctx.http, |r| {
                            r.content(&lang.texts.error)
                                .set_embed(embed)
                                .set_components(components)
                        })
                        .await?;
                    return Ok(());
                }
            }

            if let Some(followup) = &rules.followup {
                schedule_followup(
                    Arc::clone(&ctx.http),
                    component.clone(),
                    lang,
                    followup.delay(),
                );
            }
        }
        Err(StepError::Platform(e)) => {
            error!(%guild_id, %user_id, token = %token, error = %e, "Rules step failed");
            let texts = texts_for(rules, &token);
            reply_ephemeral(&ctx.http, component, &texts.error).await?;
        }
        Err(e) => {
            warn!(%guild_id, %user_id, token = %token, error = %e, "Rejected a rules step");
            reply_ephemeral(&ctx.http, component, STALE_CONTROL).await?;
        }
    }
    Ok(())
}

/// Texts in the language the token was issued for, if it still exists.
fn texts_for<'c>(rules: &'c RulesCfg, token: &RuleToken) -> &'c RulesTexts {
    let lang = match token {
        RuleToken::Agree { lang, .. }
        | RuleToken::Back { lang, .. }
        | RuleToken::FollowUp { lang }
        | RuleToken::Intro { lang } => rules.language(lang),
        RuleToken::Start | RuleToken::Language => None,
    };
    lang.map_or_else(|| rules.default_texts(), |lang| &lang.texts)
}

fn render(rules: &RulesCfg, screen: &Screen<'_>) -> (CreateEmbed, CreateComponents) {
    let mut embed = CreateEmbed::default();
    let mut components = CreateComponents::default();
    match screen {
        Screen::LanguageSelect { languages } => {
            let texts = rules.default_texts();
            embed
                .title(&texts.title)
                .description(&texts.choose_language)
                .colour(Colour::BLURPLE);
            components.create_action_row(|row| {
                row.create_select_menu(|menu| {
                    menu.custom_id(RuleToken::Language)
                        .placeholder(&texts.choose_language)
                        .options(|opts| {
                            for lang in languages.iter() {
                                opts.create_option(|o| o.label(&lang.label).value(&lang.code));
                            }
                            opts
                        })
                })
            });
        }
        Screen::Rule { lang, index, .. } => {
            let rule = lang.rules.get(*index).map_or("", String::as_str);
            embed
                .title(&lang.texts.title)
                .description(rule)
                .colour(Colour::BLURPLE);
            if let Some(progress) = screen.progress() {
                embed.footer(|f| f.text(progress));
            }
            let back = screen.back_token();
            let agree = screen.agree_token();
            components.create_action_row(|row| {
                if let Some(back) = back {
                    row.create_button(|b| {
                        b.custom_id(back)
                            .label(&lang.texts.back)
                            .style(ButtonStyle::Secondary)
                    });
                }
                if let Some(agree) = agree {
                    row.create_button(|b| {
                        b.custom_id(agree)
                            .label(&lang.texts.agree)
                            .style(ButtonStyle::Success)
                    });
                }
                row
            });
        }
    }
    (embed, components)
}

fn schedule_followup(
    http: Arc<Http>,
    component: MessageComponentInteraction,
    lang: &RulesLanguage,
    delay: Duration,
) {
    let token = RuleToken::FollowUp {
        lang: lang.code.clone(),
    };
    let texts = lang.texts.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let res = component
            .create_followup_message(&http, |f| {
                f.ephemeral(true)
                    .content(&texts.followup_prompt)
                    .components(|c| {
                        c.create_action_row(|row| {
                            row.create_button(|b| {
                                b.custom_id(&token)
                                    .label(&texts.followup_button)
                                    .style(ButtonStyle::Primary)
                            })
                        })
                    })
            })
            .await;
        if let Err(e) = res {
            warn!(user_id = %component.user.id, error = %e, "Failed to send the rules follow-up");
        }
    });
}

async fn open_followup_form(
    ctx: &Context,
    component: &MessageComponentInteraction,
    rules: &RulesCfg,
    lang: &str,
) -> Result<()> {
    let (Some(_), Some(language)) = (rules.followup.as_ref(), rules.language(lang)) else {
        return reply_ephemeral(&ctx.http, component, STALE_CONTROL).await;
    };
    let texts = &language.texts;
    let token = RuleToken::Intro {
        lang: language.code.clone(),
    };
    component
        .create_interaction_response(&ctx.http, |r| {
            r.kind(InteractionResponseType::Modal)
                .interaction_response_data(|d| {
                    d.custom_id(&token)
                        .title(&texts.followup_button)
                        .components(|c| {
                            c.create_action_row(|row| {
                                row.create_input_text(|input| {
                                    input
                                        .custom_id(inputs::INTRO)
                                        .label(&texts.followup_prompt)
                                        .style(InputTextStyle::Paragraph)
                                        .max_length(INTRO_MAX_LEN)
                                        .required(true)
                                })
                            })
                        })
                })
        })
        .await?;
    Ok(())
}

pub(super) async fn on_modal(
    ctx: &Context,
    state: &AppState,
    guild_id: GuildId,
    modal: &ModalSubmitInteraction,
    token: RuleToken,
) -> Result<()> {
    let RuleToken::Intro { lang } = &token else {
        return reply_modal_ephemeral(&ctx.http, modal, STALE_CONTROL).await;
    };
    let cfg = state.guild_cfg(guild_id).await?;
    let Some(rules) = cfg.rules.as_ref() else {
        return reply_modal_ephemeral(&ctx.http, modal, NOT_CONFIGURED).await;
    };
    let (Some(followup), Some(language)) = (rules.followup.as_ref(), rules.language(lang)) else {
        return reply_modal_ephemeral(&ctx.http, modal, STALE_CONTROL).await;
    };
    let Some(intro) = input_value(modal, inputs::INTRO) else {
        return reply_modal_ephemeral(&ctx.http, modal, &language.texts.error).await;
    };

    let nick = modal.member.as_ref().and_then(|m| m.nick.clone());
    let author = profile(&modal.user, nick);
    followup
        .channel
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.author(|a| {
                    if let Some(avatar) = &author.avatar_url {
                        a.icon_url(avatar);
                    }
                    a.name(&author.display_name)
                })
                .description(intro)
                .footer(|f| f.text(&language.label))
                .colour(Colour::BLURPLE)
            })
        })
        .await?;
    info!(%guild_id, user_id = %modal.user.id, "Posted a member introduction");

    reply_modal_ephemeral(&ctx.http, modal, &language.texts.followup_thanks).await
}
