use core::fmt;

use crate::custom_id::{TokenError, RULES_NS};

/// State of one member's walk through the rules, carried by the component
/// that triggers the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RuleToken {
    /// Public entry button.
    Start,
    /// Language select menu; the language arrives as the selected value.
    Language,
    /// Accept rule `index` of `lang`.
    Agree { lang: String, index: usize },
    /// Go back from rule `index` of `lang`.
    Back { lang: String, index: usize },
    /// Opens the follow-up form.
    FollowUp { lang: String },
    /// Submission of the follow-up form.
    Intro { lang: String },
}

impl RuleToken {
    /// Parses everything after `rules:`.
    pub(crate) fn parse_rest(rest: &str) -> Result<Self, TokenError> {
        let mut parts = rest.split(':');
        let stage = parts.next().unwrap_or_default();
        let token = match stage {
            "start" => RuleToken::Start,
            "lang" => RuleToken::Language,
            "agree" | "back" => {
                let lang = parse_lang(parts.next())?;
                let index = parts
                    .next()
                    .ok_or(TokenError::Malformed)?
                    .parse::<usize>()
                    .map_err(|_| TokenError::Index)?;
                if stage == "agree" {
                    RuleToken::Agree { lang, index }
                } else {
                    RuleToken::Back { lang, index }
                }
            }
            "followup" => RuleToken::FollowUp {
                lang: parse_lang(parts.next())?,
            },
            "intro" => RuleToken::Intro {
                lang: parse_lang(parts.next())?,
            },
            other => return Err(TokenError::Stage(other.to_owned())),
        };
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }
        Ok(token)
    }
}

fn parse_lang(part: Option<&str>) -> Result<String, TokenError> {
    match part {
        Some(lang) if !lang.is_empty() => Ok(lang.to_owned()),
        _ => Err(TokenError::Malformed),
    }
}

impl fmt::Display for RuleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleToken::Start => write!(f, "{RULES_NS}:start"),
            RuleToken::Language => write!(f, "{RULES_NS}:lang"),
            RuleToken::Agree { lang, index } => write!(f, "{RULES_NS}:agree:{lang}:{index}"),
            RuleToken::Back { lang, index } => write!(f, "{RULES_NS}:back:{lang}:{index}"),
            RuleToken::FollowUp { lang } => write!(f, "{RULES_NS}:followup:{lang}"),
            RuleToken::Intro { lang } => write!(f, "{RULES_NS}:intro:{lang}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_id::CustomId;

    fn parse(raw: &str) -> Result<RuleToken, TokenError> {
        match raw.parse::<CustomId>()? {
            CustomId::Rules(token) => Ok(token),
            other => panic!("not a rules id: {other:?}"),
        }
    }

    #[test]
    fn tokens_survive_formatting() {
        for token in [
            RuleToken::Start,
            RuleToken::Language,
            RuleToken::Agree {
                lang: "en".to_owned(),
                index: 0,
            },
            RuleToken::Back {
                lang: "ja".to_owned(),
                index: 12,
            },
            RuleToken::FollowUp {
                lang: "en".to_owned(),
            },
            RuleToken::Intro {
                lang: "pt-BR".to_owned(),
            },
        ] {
            assert_eq!(parse(&token.to_string()), Ok(token));
        }
    }

    #[test]
    fn agree_token_layout() {
        let token = RuleToken::Agree {
            lang: "en".to_owned(),
            index: 2,
        };
        assert_eq!(token.to_string(), "rules:agree:en:2");
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(parse("rules:agree:en"), Err(TokenError::Malformed));
        assert_eq!(parse("rules:agree::1"), Err(TokenError::Malformed));
        assert_eq!(parse("rules:agree:en:-1"), Err(TokenError::Index));
        assert_eq!(parse("rules:agree:en:one"), Err(TokenError::Index));
        assert_eq!(parse("rules:agree:en:1:2"), Err(TokenError::Malformed));
        assert_eq!(parse("rules:start:now"), Err(TokenError::Malformed));
        assert_eq!(
            parse("rules:skip:en:1"),
            Err(TokenError::Stage("skip".to_owned()))
        );
    }
}
