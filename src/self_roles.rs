//! Self-assignable roles offered through a select menu panel.
//!
//! A public panel can't show which roles a member already holds, so every
//! selected role is toggled: held roles are removed, missing ones added.

use serenity::model::prelude::{GuildId, RoleId, UserId};

use crate::{app_state::guild_cfg::RolePanelCfg, rules::roles::MemberRoles};

#[derive(Debug, thiserror::Error)]
pub(crate) enum PanelError {
    #[error("`{0}` is not a role of the panel")]
    UnknownRole(String),
    #[error(transparent)]
    Platform(#[from] crate::error::Error),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PanelChange {
    pub(crate) added: Vec<RoleId>,
    pub(crate) removed: Vec<RoleId>,
}

impl PanelChange {
    pub(crate) fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Decides the role changes for the selected option values.
///
/// Values the panel does not offer reject the whole selection.
pub(crate) fn plan(
    panel: &RolePanelCfg,
    held: &[RoleId],
    selected: &[String],
) -> Result<PanelChange, PanelError> {
    let mut change = PanelChange::default();
    for value in selected {
        let role_id = value
            .parse::<u64>()
            .ok()
            .map(RoleId)
            .filter(|role_id| panel.contains(*role_id))
            .ok_or_else(|| PanelError::UnknownRole(value.clone()))?;
        if change.added.contains(&role_id) || change.removed.contains(&role_id) {
            continue;
        }
        if held.contains(&role_id) {
            change.removed.push(role_id);
        } else {
            change.added.push(role_id);
        }
    }
    Ok(change)
}

pub(crate) async fn apply_selection(
    panel: &RolePanelCfg,
    roles: &dyn MemberRoles,
    guild_id: GuildId,
    user_id: UserId,
    selected: &[String],
) -> Result<PanelChange, PanelError> {
    let held = roles.member_roles(guild_id, user_id).await?;
    let change = plan(panel, &held, selected)?;
    for role_id in &change.added {
        roles.add_role(guild_id, user_id, *role_id).await?;
    }
    for role_id in &change.removed {
        roles.remove_role(guild_id, user_id, *role_id).await?;
    }
    Ok(change)
}
