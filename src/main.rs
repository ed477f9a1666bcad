use std::sync::Arc;

use serenity::Client;
use shuttle_secrets::SecretStore;
use sqlx::PgPool;
use tracing::info;

mod app_state;
mod bots;
mod commands;
mod custom_id;
mod db;
mod error;
mod immut_data;
mod interactions;
mod rules;
mod self_roles;
mod service;
mod util;
mod web;

use app_state::{
    type_map_keys::{AppStateKey, BotCfgKey},
    AppState,
};
use bots::MainBot;
use db::PgStore;
use immut_data::{consts::DISCORD_INTENTS, dynamic::BotCfg};
use service::BotService;

#[shuttle_runtime::main]
async fn azure_supporter(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_secrets::Secrets] secret_store: SecretStore,
) -> Result<BotService, shuttle_runtime::Error> {
    let cfg = Arc::new(BotCfg::new(&secret_store).map_err(anyhow::Error::new)?);
    let store = PgStore::new(pool).await.map_err(anyhow::Error::new)?;
    let state = Arc::new(AppState::new(Arc::new(store)));
    info!(prefix = %cfg.discord_prefix, web = %cfg.web_base_url, "Starting up");

    let framework = commands::framework(&cfg);
    let router = web::router(Arc::clone(&state.resolver));
    let client = Client::builder(&cfg.discord_token, DISCORD_INTENTS)
        .framework(framework)
        .event_handler(MainBot::new(Arc::clone(&cfg), Arc::clone(&state)))
        .type_map_insert::<AppStateKey>(state)
        .type_map_insert::<BotCfgKey>(cfg)
        .await
        .map_err(anyhow::Error::new)?;

    Ok(BotService { client, router })
}
