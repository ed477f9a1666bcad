//! Per-guild configuration, stored as JSON by [`crate::db::Store`].
//!
//! Every feature block is optional; a missing block disables the feature in
//! that guild.

use std::{collections::HashSet, time::Duration};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serenity::model::prelude::{ChannelId, RoleId};

use super::exp::TierCutoffs;

const MAX_FOLLOWUP_DELAY_SECS: u64 = 600;

/// Discord's limit of options in one select menu.
pub(crate) const MAX_PANEL_ROLES: usize = 25;

static FALLBACK_TEXTS: Lazy<RulesTexts> = Lazy::new(RulesTexts::default);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GuildCfg {
    pub(crate) tiers: TierCutoffs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) rules: Option<RulesCfg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) translator: Option<TranslatorCfg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) voice: Option<VoiceCfg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role_panel: Option<RolePanelCfg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RulesCfg {
    pub(crate) languages: Vec<RulesLanguage>,
    /// Marks members who completed the verification.
    pub(crate) verified_role: RoleId,
    /// Swapped for `member_role` on completion, if the member holds it.
    #[serde(default)]
    pub(crate) pre_member_role: Option<RoleId>,
    #[serde(default)]
    pub(crate) member_role: Option<RoleId>,
    /// Either empty or one role per rule, mirroring the progress.
    #[serde(default)]
    pub(crate) progress_roles: Vec<RoleId>,
    #[serde(default)]
    pub(crate) allow_back: bool,
    #[serde(default)]
    pub(crate) followup: Option<FollowupCfg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RulesLanguage {
    /// Short code used in component ids, e.g. `en`.
    pub(crate) code: String,
    /// Shown in the language select menu.
    pub(crate) label: String,
    pub(crate) rules: Vec<String>,
    /// Granted on completion to members who chose this language.
    #[serde(default)]
    pub(crate) role: Option<RoleId>,
    #[serde(default)]
    pub(crate) texts: RulesTexts,
}

/// Localized strings of the verification flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RulesTexts {
    pub(crate) title: String,
    /// Label of the public entry button.
    pub(crate) start: String,
    pub(crate) choose_language: String,
    pub(crate) agree: String,
    pub(crate) back: String,
    pub(crate) completed: String,
    pub(crate) already_completed: String,
    pub(crate) in_progress: String,
    pub(crate) error: String,
    pub(crate) followup_prompt: String,
    pub(crate) followup_button: String,
    pub(crate) followup_thanks: String,
}

impl Default for RulesTexts {
    fn default() -> Self {
        Self {
            title: "Server rules".to_owned(),
            start: "Read the rules".to_owned(),
            choose_language: "Choose your language".to_owned(),
            agree: "I agree".to_owned(),
            back: "Back".to_owned(),
            completed: "Thank you! You now have access to the server.".to_owned(),
            already_completed: "You have already accepted the rules.".to_owned(),
            in_progress: "Your roles are still being applied, please wait a moment.".to_owned(),
            error: "Something went wrong. Please try again in a moment.".to_owned(),
            followup_prompt: "Would you like to introduce yourself?".to_owned(),
            followup_button: "Introduce myself".to_owned(),
            followup_thanks: "Thanks, your introduction was posted!".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FollowupCfg {
    pub(crate) delay_secs: u64,
    /// Where submitted introductions are posted.
    pub(crate) channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TranslatorCfg {
    /// Where applications are posted for review.
    pub(crate) review_channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VoiceCfg {
    /// Where join requests are posted for approval.
    pub(crate) request_channel: ChannelId,
    /// Members allowed to approve or deny requests.
    pub(crate) admin_role: RoleId,
}

/// Self-assignable roles offered in one select menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RolePanelCfg {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    pub(crate) roles: Vec<PanelRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PanelRole {
    pub(crate) role: RoleId,
    pub(crate) label: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum GuildCfgError {
    #[error("tier cutoffs must be strictly ascending")]
    TierCutoffs,
    #[error("at least one rules language is required")]
    NoLanguages,
    #[error("language `{0}` is listed twice")]
    DuplicateLanguage(String),
    #[error("language code `{0}` may only contain letters, digits, `-` and `_`")]
    LanguageCode(String),
    #[error("language `{0}` has no rules")]
    NoRules(String),
    #[error("language `{code}` has {rules} rules but {roles} progress roles are configured")]
    ProgressRoles {
        code: String,
        rules: usize,
        roles: usize,
    },
    #[error("the follow-up delay may not exceed {} seconds", MAX_FOLLOWUP_DELAY_SECS)]
    FollowupDelay,
    #[error("the role panel needs between 1 and {} roles", MAX_PANEL_ROLES)]
    PanelSize,
    #[error("role {0} is listed twice in the role panel")]
    DuplicatePanelRole(RoleId),
}

impl GuildCfg {
    pub(crate) fn validate(&self) -> Result<(), GuildCfgError> {
        if !self.tiers.is_ascending() {
            return Err(GuildCfgError::TierCutoffs);
        }
        if let Some(rules) = &self.rules {
            rules.validate()?;
        }
        if let Some(panel) = &self.role_panel {
            panel.validate()?;
        }
        Ok(())
    }

    pub(crate) fn from_json(json: &str) -> crate::error::Result<Self> {
        let cfg: GuildCfg = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl RulesCfg {
    fn validate(&self) -> Result<(), GuildCfgError> {
        if self.languages.is_empty() {
            return Err(GuildCfgError::NoLanguages);
        }
        let mut seen = HashSet::with_capacity(self.languages.len());
        for lang in &self.languages {
            let code_is_valid = !lang.code.is_empty()
                && lang
                    .code
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !code_is_valid {
                return Err(GuildCfgError::LanguageCode(lang.code.clone()));
            }
            if !seen.insert(lang.code.as_str()) {
                return Err(GuildCfgError::DuplicateLanguage(lang.code.clone()));
            }
            if lang.rules.is_empty() {
                return Err(GuildCfgError::NoRules(lang.code.clone()));
            }
            if !self.progress_roles.is_empty() && self.progress_roles.len() != lang.rules.len() {
                return Err(GuildCfgError::ProgressRoles {
                    code: lang.code.clone(),
                    rules: lang.rules.len(),
                    roles: self.progress_roles.len(),
                });
            }
        }
        if let Some(followup) = &self.followup {
            if followup.delay_secs > MAX_FOLLOWUP_DELAY_SECS {
                return Err(GuildCfgError::FollowupDelay);
            }
        }
        Ok(())
    }

    pub(crate) fn language(&self, code: &str) -> Option<&RulesLanguage> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Texts used before a language is chosen.
    pub(crate) fn default_texts(&self) -> &RulesTexts {
        self.languages
            .first()
            .map_or(&*FALLBACK_TEXTS, |lang| &lang.texts)
    }
}

impl RolePanelCfg {
    fn validate(&self) -> Result<(), GuildCfgError> {
        if self.roles.is_empty() || self.roles.len() > MAX_PANEL_ROLES {
            return Err(GuildCfgError::PanelSize);
        }
        let mut seen = HashSet::with_capacity(self.roles.len());
        for panel_role in &self.roles {
            if !seen.insert(panel_role.role) {
                return Err(GuildCfgError::DuplicatePanelRole(panel_role.role));
            }
        }
        Ok(())
    }

    pub(crate) fn contains(&self, role_id: RoleId) -> bool {
        self.roles.iter().any(|r| r.role == role_id)
    }
}

impl FollowupCfg {
    pub(crate) fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}
