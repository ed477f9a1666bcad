use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use serenity::model::prelude::{GuildId, RoleId, UserId};

use super::{roles::MemberRoles, token::RuleToken};
use crate::app_state::guild_cfg::{RulesCfg, RulesLanguage, RulesTexts};

#[derive(Debug, thiserror::Error)]
pub(crate) enum StepError {
    #[error("unknown rules language `{0}`")]
    UnknownLanguage(String),
    #[error("rule {index} does not exist, there are {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no language was selected")]
    NoSelection,
    #[error("going back is disabled")]
    BackDisabled,
    #[error("`{0}` is not a step of the rules walk")]
    NotAStep(RuleToken),
    #[error(transparent)]
    Platform(#[from] crate::error::Error),
}

/// What the member sees next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Screen<'c> {
    LanguageSelect {
        languages: &'c [RulesLanguage],
    },
    Rule {
        lang: &'c RulesLanguage,
        index: usize,
        allow_back: bool,
    },
}

impl<'c> Screen<'c> {
    pub(crate) fn progress(&self) -> Option<String> {
        match self {
            Screen::LanguageSelect { .. } => None,
            Screen::Rule { lang, index, .. } => Some(format!("{} of {}", index + 1, lang.rules.len())),
        }
    }

    /// The only forward control of a rule screen.
    pub(crate) fn agree_token(&self) -> Option<RuleToken> {
        match self {
            Screen::LanguageSelect { .. } => None,
            Screen::Rule { lang, index, .. } => Some(RuleToken::Agree {
                lang: lang.code.clone(),
                index: *index,
            }),
        }
    }

    pub(crate) fn back_token(&self) -> Option<RuleToken> {
        match self {
            Screen::Rule {
                lang,
                index,
                allow_back: true,
            } if *index > 0 => Some(RuleToken::Back {
                lang: lang.code.clone(),
                index: *index,
            }),
            _ => None,
        }
    }
}

pub(crate) enum Step<'c> {
    Show(Screen<'c>),
    /// The member holds the verified role.
    AlreadyCompleted(&'c RulesTexts),
    /// Another click of the same member is applying the roles right now.
    InProgress(&'c RulesTexts),
    /// The last rule was accepted. Render the completion message, then
    /// [`CompletionTicket::finish`].
    Complete(CompletionTicket<'c>),
}

type Key = (GuildId, UserId);

/// Walks members through the rules.
///
/// The walk's state lives in the tokens; the stepper only tracks members
/// whose completion is being applied right now.
#[derive(Debug, Default)]
pub(crate) struct RulesStepper {
    completing: Arc<Mutex<HashSet<Key>>>,
}

impl RulesStepper {
    pub(crate) async fn advance<'c>(
        &self,
        cfg: &'c RulesCfg,
        roles: &dyn MemberRoles,
        guild_id: GuildId,
        user_id: UserId,
        token: &RuleToken,
        selected: Option<&str>,
    ) -> Result<Step<'c>, StepError> {
        match token {
            RuleToken::Start => {
                let held = roles.member_roles(guild_id, user_id).await?;
                if held.contains(&cfg.verified_role) {
                    return Ok(Step::AlreadyCompleted(cfg.default_texts()));
                }
                Ok(Step::Show(Screen::LanguageSelect {
                    languages: &cfg.languages,
                }))
            }
            RuleToken::Language => {
                let code = selected.ok_or(StepError::NoSelection)?;
                let lang = language(cfg, code)?;
                show_rule(cfg, roles, guild_id, user_id, lang, 0).await
            }
            RuleToken::Agree { lang, index } => {
                let lang = language(cfg, lang)?;
                let len = lang.rules.len();
                if *index >= len {
                    return Err(StepError::IndexOutOfRange { index: *index, len });
                }
                if index + 1 < len {
                    show_rule(cfg, roles, guild_id, user_id, lang, index + 1).await
                } else {
                    self.begin_completion(cfg, roles, guild_id, user_id, lang)
                        .await
                }
            }
            RuleToken::Back { lang, index } => {
                if !cfg.allow_back {
                    return Err(StepError::BackDisabled);
                }
                let lang = language(cfg, lang)?;
                let len = lang.rules.len();
                if *index == 0 || *index >= len {
                    return Err(StepError::IndexOutOfRange { index: *index, len });
                }
                show_rule(cfg, roles, guild_id, user_id, lang, index - 1).await
            }
            RuleToken::FollowUp { .. } | RuleToken::Intro { .. } => {
                Err(StepError::NotAStep(token.clone()))
            }
        }
    }

    async fn begin_completion<'c>(
        &self,
        cfg: &'c RulesCfg,
        roles: &dyn MemberRoles,
        guild_id: GuildId,
        user_id: UserId,
        lang: &'c RulesLanguage,
    ) -> Result<Step<'c>, StepError> {
        let key = (guild_id, user_id);
        let fresh = self
            .completing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        if !fresh {
            return Ok(Step::InProgress(&lang.texts));
        }
        let mut ticket = CompletionTicket {
            completing: Arc::clone(&self.completing),
            key,
            cfg,
            lang,
            held: Vec::new(),
        };
        ticket.held = roles.member_roles(guild_id, user_id).await?;
        if ticket.held.contains(&cfg.verified_role) {
            return Ok(Step::AlreadyCompleted(&lang.texts));
        }
        Ok(Step::Complete(ticket))
    }
}

fn language<'c>(cfg: &'c RulesCfg, code: &str) -> Result<&'c RulesLanguage, StepError> {
    cfg.language(code)
        .ok_or_else(|| StepError::UnknownLanguage(code.to_owned()))
}

async fn show_rule<'c>(
    cfg: &'c RulesCfg,
    roles: &dyn MemberRoles,
    guild_id: GuildId,
    user_id: UserId,
    lang: &'c RulesLanguage,
    index: usize,
) -> Result<Step<'c>, StepError> {
    if !cfg.progress_roles.is_empty() {
        let held = roles.member_roles(guild_id, user_id).await?;
        if held.contains(&cfg.verified_role) {
            return Ok(Step::AlreadyCompleted(&lang.texts));
        }
        for (i, role) in cfg.progress_roles.iter().enumerate() {
            let has = held.contains(role);
            if i == index && !has {
                roles.add_role(guild_id, user_id, *role).await?;
            } else if i != index && has {
                roles.remove_role(guild_id, user_id, *role).await?;
            }
        }
    }
    Ok(Step::Show(Screen::Rule {
        lang,
        index,
        allow_back: cfg.allow_back,
    }))
}

/// Exclusive right to apply one member's completion.
///
/// Released on drop, so a failed completion can be retried.
#[derive(Debug)]
pub(crate) struct CompletionTicket<'c> {
    completing: Arc<Mutex<HashSet<Key>>>,
    key: Key,
    cfg: &'c RulesCfg,
    lang: &'c RulesLanguage,
    /// Roles the member held when the ticket was issued.
    held: Vec<RoleId>,
}

/// Role changes applied by a completion.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Completion {
    pub(crate) added: Vec<RoleId>,
    pub(crate) removed: Vec<RoleId>,
}

impl<'c> CompletionTicket<'c> {
    pub(crate) fn lang(&self) -> &'c RulesLanguage {
        self.lang
    }

    /// The last rule again, offered when [`CompletionTicket::finish`] fails.
    pub(crate) fn retry_screen(&self) -> Screen<'c> {
        Screen::Rule {
            lang: self.lang,
            index: self.lang.rules.len().saturating_sub(1),
            allow_back: self.cfg.allow_back,
        }
    }

    pub(crate) async fn finish(self, roles: &dyn MemberRoles) -> crate::error::Result<Completion> {
        let (guild_id, user_id) = self.key;
        let mut completion = Completion::default();

        roles
            .add_role(guild_id, user_id, self.cfg.verified_role)
            .await?;
        completion.added.push(self.cfg.verified_role);

        if let Some(lang_role) = self.lang.role {
            if !self.held.contains(&lang_role) {
                roles.add_role(guild_id, user_id, lang_role).await?;
                completion.added.push(lang_role);
            }
        }

        if let Some(pre_member) = self.cfg.pre_member_role {
            if self.held.contains(&pre_member) {
                roles.remove_role(guild_id, user_id, pre_member).await?;
                completion.removed.push(pre_member);
                if let Some(member) = self.cfg.member_role {
                    roles.add_role(guild_id, user_id, member).await?;
                    completion.added.push(member);
                }
            }
        }

        for role in &self.cfg.progress_roles {
            if self.held.contains(role) {
                roles.remove_role(guild_id, user_id, *role).await?;
                completion.removed.push(*role);
            }
        }
        Ok(completion)
    }
}

impl Drop for CompletionTicket<'_> {
    fn drop(&mut self) {
        self.completing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        app_state::guild_cfg::tests::rules_cfg,
        rules::roles::tests::{FakeRoles, MEMBER},
    };

    const G: GuildId = GuildId(1);
    const U: UserId = MEMBER;

    fn agree(lang: &str, index: usize) -> RuleToken {
        RuleToken::Agree {
            lang: lang.to_owned(),
            index,
        }
    }

    fn shown_index(step: &Step<'_>) -> usize {
        match step {
            Step::Show(Screen::Rule { index, .. }) => *index,
            Step::Show(Screen::LanguageSelect { .. }) => panic!("language select shown"),
            Step::AlreadyCompleted(_) => panic!("already completed"),
            Step::InProgress(_) => panic!("in progress"),
            Step::Complete(_) => panic!("completed"),
        }
    }

    #[tokio::test]
    async fn full_walk_completes_once() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();

        let step = stepper
            .advance(&cfg, &roles, G, U, &RuleToken::Start, None)
            .await
            .unwrap();
        assert!(matches!(step, Step::Show(Screen::LanguageSelect { languages }) if languages.len() == 2));

        let step = stepper
            .advance(&cfg, &roles, G, U, &RuleToken::Language, Some("ja"))
            .await
            .unwrap();
        assert_eq!(shown_index(&step), 0);
        let Step::Show(screen) = step else { unreachable!() };
        assert_eq!(screen.progress().as_deref(), Some("1 of 3"));
        assert_eq!(screen.agree_token(), Some(agree("ja", 0)));
        assert_eq!(screen.back_token(), None);

        for i in 0..2 {
            let step = stepper
                .advance(&cfg, &roles, G, U, &agree("ja", i), None)
                .await
                .unwrap();
            assert_eq!(shown_index(&step), i + 1);
        }

        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("ja", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(ticket.lang().code, "ja");
        ticket.finish(&roles).await.unwrap();
        assert_eq!(roles.adds_of(cfg.verified_role), 1);

        // stale final button clicked again
        let step = stepper
            .advance(&cfg, &roles, G, U, &agree("ja", 2), None)
            .await
            .unwrap();
        assert!(matches!(step, Step::AlreadyCompleted(texts) if texts.agree == "同意する"));
        assert_eq!(roles.adds_of(cfg.verified_role), 1);
    }

    #[tokio::test]
    async fn verified_members_cannot_start_again() {
        let cfg = rules_cfg();
        let roles = FakeRoles::holding(&[cfg.verified_role]);
        let step = RulesStepper::default()
            .advance(&cfg, &roles, G, U, &RuleToken::Start, None)
            .await
            .unwrap();
        assert!(matches!(step, Step::AlreadyCompleted(_)));
    }

    #[tokio::test]
    async fn pre_member_is_swapped_for_member() {
        let cfg = rules_cfg();
        let pre = cfg.pre_member_role.unwrap();
        let member = cfg.member_role.unwrap();
        let roles = FakeRoles::holding(&[pre, RoleId(7)]);
        let stepper = RulesStepper::default();

        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        let completion = ticket.finish(&roles).await.unwrap();

        assert_eq!(completion.added, vec![cfg.verified_role, member]);
        assert_eq!(completion.removed, vec![pre]);
        let held = roles.held();
        assert!(held.contains(&member));
        assert!(held.contains(&RoleId(7)));
        assert!(!held.contains(&pre));
    }

    #[tokio::test]
    async fn member_role_needs_the_pre_member_marker() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let Step::Complete(ticket) = RulesStepper::default()
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        let completion = ticket.finish(&roles).await.unwrap();
        assert_eq!(completion.added, vec![cfg.verified_role]);
        assert!(completion.removed.is_empty());
    }

    #[tokio::test]
    async fn progress_roles_mirror_the_walk() {
        let mut cfg = rules_cfg();
        cfg.progress_roles = vec![RoleId(50), RoleId(51), RoleId(52)];
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();

        stepper
            .advance(&cfg, &roles, G, U, &RuleToken::Language, Some("en"))
            .await
            .unwrap();
        assert_eq!(roles.held(), vec![RoleId(50)]);

        stepper
            .advance(&cfg, &roles, G, U, &agree("en", 0), None)
            .await
            .unwrap();
        assert_eq!(roles.held(), vec![RoleId(51)]);

        stepper
            .advance(&cfg, &roles, G, U, &agree("en", 1), None)
            .await
            .unwrap();
        assert_eq!(roles.held(), vec![RoleId(52)]);

        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        let completion = ticket.finish(&roles).await.unwrap();
        assert_eq!(completion.removed, vec![RoleId(52)]);
        assert_eq!(roles.held(), vec![cfg.verified_role]);
    }

    #[tokio::test]
    async fn back_navigation() {
        let mut cfg = rules_cfg();
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();
        let back = |index| RuleToken::Back {
            lang: "en".to_owned(),
            index,
        };

        let err = stepper
            .advance(&cfg, &roles, G, U, &back(1), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::BackDisabled));

        cfg.allow_back = true;
        let step = stepper
            .advance(&cfg, &roles, G, U, &back(2), None)
            .await
            .unwrap();
        assert_eq!(shown_index(&step), 1);
        let Step::Show(screen) = step else { unreachable!() };
        assert_eq!(screen.back_token(), Some(back(1)));

        let err = stepper
            .advance(&cfg, &roles, G, U, &back(0), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::IndexOutOfRange { index: 0, len: 3 }));
    }

    #[tokio::test]
    async fn invalid_tokens_are_rejected() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();

        let err = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 3), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::IndexOutOfRange { index: 3, len: 3 }));

        let err = stepper
            .advance(&cfg, &roles, G, U, &agree("de", 0), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::UnknownLanguage(code) if code == "de"));

        let err = stepper
            .advance(&cfg, &roles, G, U, &RuleToken::Language, None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::NoSelection));
        assert!(roles.adds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_completions_collapse() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();

        let first = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap();
        let second = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap();
        assert!(matches!(second, Step::InProgress(_)));

        let Step::Complete(ticket) = first else {
            panic!("expected completion");
        };
        ticket.finish(&roles).await.unwrap();
        assert_eq!(roles.adds_of(cfg.verified_role), 1);
    }

    #[tokio::test]
    async fn failed_completion_can_be_retried() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();

        roles.fail_adds.store(true, Ordering::SeqCst);
        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        assert!(ticket.finish(&roles).await.is_err());

        roles.fail_adds.store(false, Ordering::SeqCst);
        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected the retry to complete");
        };
        ticket.finish(&roles).await.unwrap();
        assert_eq!(roles.adds_of(cfg.verified_role), 1);
    }

    #[tokio::test]
    async fn clicks_during_a_failing_completion_are_not_told_it_succeeded() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();
        roles.fail_adds.store(true, Ordering::SeqCst);

        let first = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap();
        let second = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap();
        assert!(matches!(second, Step::InProgress(_)));

        let Step::Complete(ticket) = first else {
            panic!("expected completion");
        };
        assert!(ticket.finish(&roles).await.is_err());
        assert!(!roles.held().contains(&cfg.verified_role));

        // only a held verified role counts as done
        roles.fail_adds.store(false, Ordering::SeqCst);
        let retry = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap();
        assert!(matches!(retry, Step::Complete(_)));
    }

    #[tokio::test]
    async fn failed_completion_offers_the_last_rule_again() {
        let mut cfg = rules_cfg();
        cfg.allow_back = true;
        let roles = FakeRoles::default();
        let stepper = RulesStepper::default();
        roles.fail_adds.store(true, Ordering::SeqCst);

        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("ja", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        let screen = ticket.retry_screen();
        assert!(ticket.finish(&roles).await.is_err());

        assert_eq!(screen.progress().as_deref(), Some("3 of 3"));
        assert_eq!(screen.agree_token(), Some(agree("ja", 2)));
        assert!(screen.back_token().is_some());

        roles.fail_adds.store(false, Ordering::SeqCst);
        let token = screen.agree_token().unwrap();
        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &token, None)
            .await
            .unwrap()
        else {
            panic!("expected the retry to complete");
        };
        ticket.finish(&roles).await.unwrap();
        assert!(roles.held().contains(&cfg.verified_role));
    }

    #[tokio::test]
    async fn chosen_language_grants_its_role() {
        let mut cfg = rules_cfg();
        cfg.languages[1].role = Some(RoleId(200));
        let roles = FakeRoles::holding(&[]);
        let stepper = RulesStepper::default();

        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("ja", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        let completion = ticket.finish(&roles).await.unwrap();
        assert_eq!(completion.added, vec![cfg.verified_role, RoleId(200)]);

        // the other language has no role
        let roles = FakeRoles::default();
        let Step::Complete(ticket) = stepper
            .advance(&cfg, &roles, G, U, &agree("en", 2), None)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        let completion = ticket.finish(&roles).await.unwrap();
        assert_eq!(completion.added, vec![cfg.verified_role]);
    }

    #[tokio::test]
    async fn follow_up_tokens_are_not_steps() {
        let cfg = rules_cfg();
        let roles = FakeRoles::default();
        let token = RuleToken::FollowUp {
            lang: "en".to_owned(),
        };
        let err = RulesStepper::default()
            .advance(&cfg, &roles, G, U, &token, None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::NotAStep(_)));
    }
}
