//! Typed custom ids of message components and modals.
//!
//! Every id is `namespace:stage[:arg...]`. Anything the bot did not render
//! itself is rejected here, before any handler sees it.

use core::{fmt, str::FromStr};

use serenity::model::prelude::{ChannelId, UserId};

use crate::rules::token::RuleToken;

pub(crate) const RULES_NS: &str = "rules";
pub(crate) const TRANSLATOR_NS: &str = "translator";
pub(crate) const VOICE_NS: &str = "voice";
pub(crate) const ROLES_NS: &str = "roles";

pub(crate) const TRANSLATOR_APPLY: &str = const_str::concat!(TRANSLATOR_NS, ":apply");
pub(crate) const TRANSLATOR_FORM: &str = const_str::concat!(TRANSLATOR_NS, ":form");
pub(crate) const ROLE_PANEL: &str = const_str::concat!(ROLES_NS, ":panel");

/// Ids of the text inputs inside modals.
pub(crate) mod inputs {
    pub(crate) const INTRO: &str = "intro";
    pub(crate) const LANGUAGES: &str = "languages";
    pub(crate) const EXPERIENCE: &str = "experience";
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum TokenError {
    #[error("malformed id")]
    Malformed,
    #[error("unknown namespace `{0}`")]
    Namespace(String),
    #[error("unknown stage `{0}`")]
    Stage(String),
    #[error("invalid index")]
    Index,
    #[error("invalid snowflake")]
    Snowflake,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CustomId {
    Rules(RuleToken),
    TranslatorApply,
    TranslatorForm,
    VoiceDecision {
        approve: bool,
        channel_id: ChannelId,
        user_id: UserId,
    },
    /// Select menu of self-assignable roles.
    RolePanel,
}

fn snowflake(part: Option<&str>) -> Result<u64, TokenError> {
    part.ok_or(TokenError::Malformed)?
        .parse::<u64>()
        .map_err(|_| TokenError::Snowflake)
}

impl FromStr for CustomId {
    type Err = TokenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (ns, rest) = raw.split_once(':').ok_or(TokenError::Malformed)?;
        match ns {
            RULES_NS => RuleToken::parse_rest(rest).map(CustomId::Rules),
            TRANSLATOR_NS => match rest {
                "apply" => Ok(CustomId::TranslatorApply),
                "form" => Ok(CustomId::TranslatorForm),
                other => Err(TokenError::Stage(other.to_owned())),
            },
            VOICE_NS => {
                let mut parts = rest.split(':');
                let approve = match parts.next() {
                    Some("approve") => true,
                    Some("deny") => false,
                    Some(other) => return Err(TokenError::Stage(other.to_owned())),
                    None => return Err(TokenError::Malformed),
                };
                let channel_id = ChannelId(snowflake(parts.next())?);
                let user_id = UserId(snowflake(parts.next())?);
                if parts.next().is_some() {
                    return Err(TokenError::Malformed);
                }
                Ok(CustomId::VoiceDecision {
                    approve,
                    channel_id,
                    user_id,
                })
            }
            ROLES_NS => match rest {
                "panel" => Ok(CustomId::RolePanel),
                other => Err(TokenError::Stage(other.to_owned())),
            },
            other => Err(TokenError::Namespace(other.to_owned())),
        }
    }
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomId::Rules(token) => token.fmt(f),
            CustomId::TranslatorApply => f.write_str(TRANSLATOR_APPLY),
            CustomId::TranslatorForm => f.write_str(TRANSLATOR_FORM),
            CustomId::RolePanel => f.write_str(ROLE_PANEL),
            CustomId::VoiceDecision {
                approve,
                channel_id,
                user_id,
            } => {
                let stage = if *approve { "approve" } else { "deny" };
                write!(f, "{VOICE_NS}:{stage}:{}:{}", channel_id.0, user_id.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_decisions_carry_their_targets() {
        let id = CustomId::VoiceDecision {
            approve: false,
            channel_id: ChannelId(7),
            user_id: UserId(8),
        };
        assert_eq!(id.to_string(), "voice:deny:7:8");
        assert_eq!("voice:deny:7:8".parse::<CustomId>(), Ok(id));
        assert_eq!(
            "voice:approve:7:x".parse::<CustomId>(),
            Err(TokenError::Snowflake)
        );
    }

    #[test]
    fn translator_ids() {
        assert_eq!(TRANSLATOR_APPLY, "translator:apply");
        assert_eq!(
            TRANSLATOR_FORM.parse::<CustomId>(),
            Ok(CustomId::TranslatorForm)
        );
    }

    #[test]
    fn role_panel_id() {
        assert_eq!(CustomId::RolePanel.to_string(), "roles:panel");
        assert_eq!(ROLE_PANEL.parse::<CustomId>(), Ok(CustomId::RolePanel));
        assert_eq!(
            "roles:pick".parse::<CustomId>(),
            Err(TokenError::Stage("pick".to_owned()))
        );
    }

    #[test]
    fn foreign_ids_are_rejected() {
        assert_eq!(
            "rules_en_3".parse::<CustomId>(),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            "poll:vote:1".parse::<CustomId>(),
            Err(TokenError::Namespace("poll".to_owned()))
        );
    }
}
