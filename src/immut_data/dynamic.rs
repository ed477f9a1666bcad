use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serenity::model::prelude::UserId;
use shuttle_secrets::SecretStore;
use url::Url;

use crate::error::{Error, Result};

pub(crate) static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\n\r\t]+").unwrap());

/// Deployment configuration, read from `Secrets.toml`.
#[derive(Debug, Clone)]
pub(crate) struct BotCfg {
    pub(crate) discord_token: String,
    pub(crate) discord_prefix: String,
    /// Users allowed to run `#[owners_only]` commands.
    pub(crate) owners: HashSet<UserId>,
    /// Public address of the web server, used for rank card links.
    pub(crate) web_base_url: Url,
}

impl BotCfg {
    pub(crate) fn new(secret_store: &SecretStore) -> Result<Self> {
        let discord_token = secret_store
            .get("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(Error::Secret("DISCORD_TOKEN"))?;
        let discord_prefix = secret_store
            .get("DISCORD_PREFIX")
            .unwrap_or_else(|| "~".to_owned());
        let owners = parse_owners(secret_store.get("DISCORD_OWNERS").as_deref())?;
        let web_base_url = secret_store
            .get("WEB_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_owned());
        let web_base_url = Url::parse(&web_base_url)?;
        if web_base_url.cannot_be_a_base() {
            return Err(Error::Secret("WEB_BASE_URL"));
        }

        Ok(Self {
            discord_token,
            discord_prefix,
            owners,
            web_base_url,
        })
    }
}

fn parse_owners(raw: Option<&str>) -> Result<HashSet<UserId>> {
    let Some(raw) = raw else {
        return Ok(HashSet::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .map(UserId)
                .map_err(|_| Error::Secret("DISCORD_OWNERS"))
        })
        .collect()
}
