//! Server-rendered rank card pages.

use std::{borrow::Cow, fmt::Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serenity::model::prelude::GuildId;

use super::encoded_path;
use crate::{
    app_state::{
        exp::TierBadge,
        resolver::{MemberCandidate, Resolution},
    },
    immut_data::consts::RANK_CARD_POLL_MS,
};

const STYLE: &str = r#"
body { margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center;
       background: #111827; color: #f9fafb; font-family: system-ui, sans-serif; }
main { width: min(32rem, 92vw); }
.card { background: #1f2937; border-radius: 1rem; padding: 1.5rem; }
.head { display: flex; gap: 1rem; align-items: center; }
.head img { width: 4rem; height: 4rem; border-radius: 50%; }
.muted { color: #9ca3af; }
.tier { border: 1px solid currentColor; border-radius: 999px; padding: 0.1rem 0.6rem; }
.stats { display: flex; justify-content: space-between; margin: 1.25rem 0 0.5rem; }
.bar { height: 0.6rem; background: #374151; border-radius: 999px; overflow: hidden; }
.bar > div { height: 100%; background: #6366f1; }
ul { list-style: none; padding: 0; }
li a { display: flex; gap: 0.75rem; align-items: center; padding: 0.5rem; color: inherit; }
li img { width: 2rem; height: 2rem; border-radius: 50%; }
"#;

/// Keeps the card in sync. Pages marked `data-live` use the WebSocket and
/// fall back to polling.
const LIVE_SCRIPT: &str = r##"
(() => {
  const body = document.body;
  const api = body.dataset.api;
  const pollMs = Number(body.dataset.pollMs);
  let socket = null;
  let timer = null;
  let leaving = false;

  const apply = (res) => {
    if (res.status !== "ready") { location.reload(); return; }
    const m = res.member;
    document.getElementById("display-name").textContent = m.display_name;
    document.getElementById("level").textContent = m.level;
    document.getElementById("xp").textContent = m.xp;
    document.getElementById("position").textContent = "#" + m.position;
    document.getElementById("messages").textContent = m.message_count;
    const tier = document.getElementById("tier");
    tier.style.color = m.tier_badge.color;
    document.getElementById("tier-emoji").textContent = m.tier_badge.emoji;
    document.getElementById("tier-name").textContent = m.tier_badge.name;
    const updated = document.getElementById("last-update");
    updated.setAttribute("datetime", m.last_update);
    updated.textContent = new Date(m.last_update).toISOString().slice(0, 16).replace("T", " ") + " UTC";
    const span = m.progress.level_span || 1;
    document.getElementById("progress").style.width =
      Math.min(100, Math.floor(m.progress.into_level * 100 / span)) + "%";
  };

  const poll = () => {
    if (timer !== null) return;
    timer = setInterval(() => {
      fetch(api).then((r) => r.json()).then(apply).catch(() => {});
    }, pollMs);
  };

  if (body.dataset.live === "true") {
    try {
      const scheme = location.protocol === "https:" ? "wss:" : "ws:";
      socket = new WebSocket(scheme + "//" + location.host + api + "/live");
      socket.onmessage = (ev) => apply(JSON.parse(ev.data));
      socket.onclose = () => { if (!leaving) poll(); };
    } catch (_) {
      poll();
    }
  } else {
    poll();
  }

  addEventListener("pagehide", () => {
    leaving = true;
    if (socket) socket.close();
    if (timer !== null) clearInterval(timer);
  });
})();
"##;

const LIVE_SCRIPT_TAG: &str = const_str::concat!("<script>", LIVE_SCRIPT, "</script>");

/// Escapes text for element content and double-quoted attributes.
pub(crate) fn escape(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 16);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn tier_badge(badge: TierBadge) -> String {
    format!(
        r#"<span id="tier" class="tier" style="color: {}"><span id="tier-emoji">{}</span> <span id="tier-name">{}</span></span>"#,
        badge.color, badge.emoji, badge.name
    )
}

fn last_update(at: DateTime<Utc>) -> String {
    format!(
        r#"<time id="last-update" datetime="{}">{}</time>"#,
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn document(title: &str, body_attrs: &str, main: &str, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body{body_attrs}>
<main>{main}</main>
{script}
</body>
</html>
"#,
        title = escape(title),
    )
}

fn avatar(candidate: &MemberCandidate) -> String {
    match &candidate.avatar_url {
        Some(url) => format!(r#"<img src="{}" alt="">"#, escape(url)),
        None => String::new(),
    }
}

fn card(member: &MemberCandidate) -> String {
    format!(
        r#"<section class="card">
<div class="head">{avatar}<div><h1 id="display-name">{display_name}</h1>
<div class="muted">@{username}</div></div></div>
<div class="stats">
<span>Level <strong id="level">{level}</strong></span>
{tier}
<span>Rank <strong id="position">#{position}</strong></span>
</div>
<div class="bar"><div id="progress" style="width: {percent}%"></div></div>
<p class="muted"><span id="xp">{xp}</span> XP · <span id="messages">{messages}</span> messages</p>
<p class="muted">Last updated {updated}</p>
</section>"#,
        avatar = avatar(member),
        display_name = escape(&member.display_name),
        username = escape(&member.username),
        level = member.level,
        tier = tier_badge(member.tier_badge),
        position = member.position,
        percent = member.progress.percent(),
        xp = member.xp,
        messages = member.message_count,
        updated = last_update(member.last_update),
    )
}

/// Page for a name lookup. A unique match is kept up to date.
pub(crate) fn render_resolution(guild_id: GuildId, query: &str, resolution: &Resolution) -> String {
    match resolution {
        Resolution::NotFound { query } => render_not_found(query),
        Resolution::Unique { member } => {
            let guild = guild_id.0.to_string();
            let api = encoded_path(&["api", "guilds", guild.as_str(), "rank-card", query]);
            document(
                &member.display_name,
                &script_attrs(&api, true),
                &card(member),
                LIVE_SCRIPT_TAG,
            )
        }
        Resolution::Ambiguous { candidates } => {
            let guild = guild_id.0.to_string();
            let mut list = String::new();
            for candidate in candidates {
                let user = candidate.user_id.0.to_string();
                let href = encoded_path(&[
                    "guilds",
                    guild.as_str(),
                    "members",
                    user.as_str(),
                    "rank-card",
                ]);
                let _ = write!(
                    list,
                    r#"<li><a href="{href}">{avatar}<span>{display_name} <span class="muted">@{username} · level {level}</span></span></a></li>"#,
                    href = escape(&href),
                    avatar = avatar(candidate),
                    display_name = escape(&candidate.display_name),
                    username = escape(&candidate.username),
                    level = candidate.level,
                );
            }
            let main = format!(
                r#"<section class="card"><h1>Which {query}?</h1>
<p class="muted">Several members go by this name.</p><ul>{list}</ul></section>"#,
                query = escape(query.trim()),
            );
            document(query, "", &main, "")
        }
    }
}

/// Page for one member, reached from the disambiguation list.
pub(crate) fn render_member(guild_id: GuildId, member: &MemberCandidate) -> String {
    let (guild, user) = (guild_id.0.to_string(), member.user_id.0.to_string());
    let api = encoded_path(&[
        "api",
        "guilds",
        guild.as_str(),
        "members",
        user.as_str(),
        "rank-card",
    ]);
    document(
        &member.display_name,
        &script_attrs(&api, false),
        &card(member),
        LIVE_SCRIPT_TAG,
    )
}

fn script_attrs(api: &str, live: bool) -> String {
    format!(
        r#" data-api="{}" data-live="{live}" data-poll-ms="{RANK_CARD_POLL_MS}""#,
        escape(api)
    )
}

pub(crate) fn render_not_found(query: &str) -> String {
    let main = format!(
        r#"<section class="card"><h1>No member named “{query}”</h1>
<p class="muted">Names are matched ignoring case and extra spaces. Members appear here after their first message.</p></section>"#,
        query = escape(query.trim()),
    );
    document("Member not found", "", &main, "")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serenity::model::prelude::UserId;

    use super::*;
    use crate::app_state::exp::{Exp, Level, RankTier};

    fn candidate(id: u64, name: &str) -> MemberCandidate {
        let xp = Exp(2600);
        MemberCandidate {
            user_id: UserId(id),
            display_name: name.to_owned(),
            username: name.to_lowercase(),
            avatar_url: Some("https://cdn.example.com/a.png?size=64&x=1".to_owned()),
            xp,
            level: xp.level(),
            tier: RankTier::Accordian,
            tier_badge: RankTier::Accordian.into(),
            position: 3,
            progress: xp.progress(),
            message_count: 42,
            last_update: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn escaping() {
        assert_eq!(escape("plain name"), "plain name");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn unique_page_is_live_and_escaped() {
        let member = candidate(7, "<b>Aki</b>");
        let html = render_resolution(
            GuildId(1),
            "<b>Aki</b>",
            &Resolution::Unique {
                member: member.clone(),
            },
        );
        assert!(html.contains("&lt;b&gt;Aki&lt;/b&gt;"));
        assert!(!html.contains("<b>Aki</b>"));
        assert!(html.contains(r#"data-api="/api/guilds/1/rank-card/%3Cb%3EAki%3C%2Fb%3E""#));
        assert!(html.contains(r#"data-poll-ms="3000""#));
        assert!(html.contains(r#"data-live="true""#));
        assert!(html.contains("pagehide"));
        assert!(html.contains(r#"<strong id="level">5</strong>"#));
        assert!(html.contains("size=64&amp;x=1"));
        assert_eq!(member.level, Level(5));
    }

    #[test]
    fn card_shows_activity_and_keeps_it_live() {
        let html = render_member(GuildId(1), &candidate(10, "Aki"));
        assert!(html.contains(r#"<span id="messages">42</span> messages"#));
        assert!(html.contains(
            r#"<time id="last-update" datetime="2024-05-01T12:30:00Z">2024-05-01 12:30 UTC</time>"#
        ));
        assert!(html.contains(r#"<span id="tier-emoji">🥉</span> <span id="tier-name">Accordian</span>"#));
        // the whole script made it into the page
        assert!(html.contains(r##"textContent = "#" + m.position;"##));
        assert!(html.contains("m.tier_badge.color"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn ambiguous_page_links_every_candidate() {
        let html = render_resolution(
            GuildId(1),
            " aki ",
            &Resolution::Ambiguous {
                candidates: vec![candidate(10, "Aki"), candidate(11, "aki")],
            },
        );
        assert!(html.contains(r#"href="/guilds/1/members/10/rank-card""#));
        assert!(html.contains(r#"href="/guilds/1/members/11/rank-card""#));
        assert!(html.contains("Which aki?"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn not_found_page_echoes_the_query() {
        let html = render_resolution(
            GuildId(1),
            "nobody",
            &Resolution::NotFound {
                query: "no\"body".to_owned(),
            },
        );
        assert!(html.contains("No member named “no&quot;body”"));
    }

    #[test]
    fn member_page_polls() {
        let html = render_member(GuildId(1), &candidate(10, "Aki"));
        assert!(html.contains(r#"data-api="/api/guilds/1/members/10/rank-card""#));
        assert!(html.contains(r#"data-live="false""#));
    }
}
