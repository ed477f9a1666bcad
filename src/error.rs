use crate::{app_state::guild_cfg::GuildCfgError, custom_id::TokenError};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Missing or invalid secret `{0}`")]
    Secret(&'static str),
    #[error("Invalid guild configuration: {0}")]
    GuildCfg(#[from] GuildCfgError),
    #[error("Invalid component id: {0}")]
    Token(#[from] TokenError),
    #[error("`{0}` is missing from the typemap")]
    TypeMap(&'static str),
    #[error("Experience overflow for a record that already holds {0} exp")]
    ExpOverflow(u64),
}

pub(crate) type Result<T> = core::result::Result<T, Error>;
