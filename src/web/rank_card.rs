use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serenity::model::prelude::{GuildId, UserId};
use tracing::{debug, warn};

use super::{page, WebState};
use crate::{
    app_state::resolver::{RankCardWatch, Resolution},
    error::Result,
};

pub(super) async fn page_by_name(
    State(state): State<WebState>,
    Path((guild_id, display_name)): Path<(u64, String)>,
) -> Result<Response> {
    let guild_id = GuildId(guild_id);
    let resolution = state.resolver.resolve(guild_id, &display_name).await?;
    let status = match resolution {
        Resolution::NotFound { .. } => StatusCode::NOT_FOUND,
        Resolution::Unique { .. } | Resolution::Ambiguous { .. } => StatusCode::OK,
    };
    let html = page::render_resolution(guild_id, &display_name, &resolution);
    Ok((status, Html(html)).into_response())
}

pub(super) async fn page_by_member(
    State(state): State<WebState>,
    Path((guild_id, user_id)): Path<(u64, u64)>,
) -> Result<Response> {
    let guild_id = GuildId(guild_id);
    let response = match state.resolver.member(guild_id, UserId(user_id)).await? {
        Some(member) => Html(page::render_member(guild_id, &member)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html(page::render_not_found(&user_id.to_string())),
        )
            .into_response(),
    };
    Ok(response)
}

pub(super) async fn resolve_by_name(
    State(state): State<WebState>,
    Path((guild_id, display_name)): Path<(u64, String)>,
) -> Result<Json<Resolution>> {
    let resolution = state
        .resolver
        .resolve(GuildId(guild_id), &display_name)
        .await?;
    Ok(Json(resolution))
}

/// Same shape as a name lookup, so pages can share the update script.
pub(super) async fn resolve_member(
    State(state): State<WebState>,
    Path((guild_id, user_id)): Path<(u64, u64)>,
) -> Result<Json<Resolution>> {
    let resolution = match state
        .resolver
        .member(GuildId(guild_id), UserId(user_id))
        .await?
    {
        Some(member) => Resolution::Unique { member },
        None => Resolution::NotFound {
            query: user_id.to_string(),
        },
    };
    Ok(Json(resolution))
}

pub(super) async fn live_by_name(
    ws: WebSocketUpgrade,
    State(state): State<WebState>,
    Path((guild_id, display_name)): Path<(u64, String)>,
) -> Response {
    let watch = state.resolver.watch(GuildId(guild_id), &display_name);
    ws.on_upgrade(move |socket| stream_rank_card(socket, watch))
}

/// Sends the current resolution, then every change, until the client leaves.
async fn stream_rank_card(socket: WebSocket, mut watch: RankCardWatch) {
    let (mut sender, mut receiver) = socket.split();

    // incoming frames only matter for noticing the close
    let mut closed = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut closed => break,
            next = watch.next() => {
                let resolution = match next {
                    Some(Ok(resolution)) => resolution,
                    Some(Err(e)) => {
                        warn!(error = %e, "Live rank card failed to resolve");
                        break;
                    }
                    None => break,
                };
                let text = match serde_json::to_string(&resolution) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize a rank card");
                        break;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }
    closed.abort();
    debug!("Live rank card closed");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        app_state::{exp::Exp, ledger::tests::profile, AppState},
        db::{mem::MemStore, Store},
    };

    fn state() -> (Arc<AppState>, WebState) {
        let store: Arc<dyn Store> = Arc::new(MemStore::default());
        let app = Arc::new(AppState::new(store));
        let web = WebState {
            resolver: Arc::clone(&app.resolver),
        };
        (app, web)
    }

    #[tokio::test]
    async fn unknown_names_are_404_pages() {
        let (_app, web) = state();
        let response = page_by_name(State(web), Path((1, "nobody".to_owned())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn json_lookup_reports_the_status() {
        let (app, web) = state();
        app.ledger
            .grant_xp(GuildId(1), UserId(7), Exp(2500), &profile("Aki"))
            .await
            .unwrap();

        let Json(resolution) =
            resolve_by_name(State(web.clone()), Path((1, "  aki ".to_owned())))
                .await
                .unwrap();
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["member"]["user_id"], "7");
        assert_eq!(json["member"]["level"], 5);
        assert_eq!(json["member"]["tier"], "accordian");
        assert_eq!(json["member"]["tier_badge"]["emoji"], "🥉");
        assert_eq!(json["member"]["tier_badge"]["color"], "#d97706");
        assert_eq!(json["member"]["message_count"], 1);
        assert!(json["member"]["last_update"].is_string());

        let Json(resolution) = resolve_member(State(web), Path((1, 8))).await.unwrap();
        assert!(matches!(resolution, Resolution::NotFound { query } if query == "8"));
    }

    #[tokio::test]
    async fn member_pages_render_for_known_members() {
        let (app, web) = state();
        app.ledger
            .grant_xp(GuildId(1), UserId(7), Exp(15), &profile("Aki"))
            .await
            .unwrap();
        let response = page_by_member(State(web.clone()), Path((1, 7))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = page_by_member(State(web), Path((2, 7))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
