//! HTTP side: rank card pages, their JSON/WebSocket feeds and a health check.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use once_cell::sync::Lazy;
use serenity::model::prelude::{GuildId, UserId};
use tracing::error;
use url::Url;

use crate::{
    app_state::resolver::Resolver,
    error::{Error, Result},
};

mod page;
mod rank_card;

static PATH_BASE: Lazy<Url> = Lazy::new(|| Url::parse("http://localhost/").unwrap());

#[derive(Clone)]
pub(crate) struct WebState {
    pub(crate) resolver: Arc<Resolver>,
}

pub(crate) fn router(resolver: Arc<Resolver>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/guilds/{guild_id}/rank-card/{display_name}",
            get(rank_card::page_by_name),
        )
        .route(
            "/guilds/{guild_id}/members/{user_id}/rank-card",
            get(rank_card::page_by_member),
        )
        .route(
            "/api/guilds/{guild_id}/rank-card/{display_name}",
            get(rank_card::resolve_by_name),
        )
        .route(
            "/api/guilds/{guild_id}/rank-card/{display_name}/live",
            get(rank_card::live_by_name),
        )
        .route(
            "/api/guilds/{guild_id}/members/{user_id}/rank-card",
            get(rank_card::resolve_member),
        )
        .with_state(WebState { resolver })
}

async fn health() -> &'static str {
    "ok"
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // details stay in the logs
        error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred").into_response()
    }
}

/// Absolute, percent-encoded path made of `segments`.
pub(crate) fn encoded_path(segments: &[&str]) -> String {
    let mut url = PATH_BASE.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(segments);
    }
    url.path().to_owned()
}

/// Public link to a member's rank card.
pub(crate) fn member_card_url(base: &Url, guild_id: GuildId, user_id: UserId) -> Result<Url> {
    let (guild, user) = (guild_id.0.to_string(), user_id.0.to_string());
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::Secret("WEB_BASE_URL"))?
        .pop_if_empty()
        .extend(["guilds", guild.as_str(), "members", user.as_str(), "rank-card"]);
    Ok(url)
}
