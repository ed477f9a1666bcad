use serenity::{
    async_trait,
    http::Http,
    model::prelude::{GuildId, RoleId, UserId},
};

use crate::error::Result;

/// Role operations the verification flow needs from the platform.
#[async_trait]
pub(crate) trait MemberRoles: Send + Sync {
    /// Freshly fetched, never from a cache.
    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleId>>;

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()>;

    async fn remove_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId)
        -> Result<()>;
}

const AUDIT_REASON: Option<&str> = Some("Requested by the member through the bot");

#[async_trait]
impl MemberRoles for Http {
    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleId>> {
        let member = self.get_member(guild_id.0, user_id.0).await?;
        Ok(member.roles)
    }

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.add_member_role(guild_id.0, user_id.0, role_id.0, AUDIT_REASON)
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        self.remove_member_role(guild_id.0, user_id.0, role_id.0, AUDIT_REASON)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
    };

    use super::*;
    use crate::error::Error;

    /// The member every [`FakeRoles`] helper talks about.
    pub(crate) const MEMBER: UserId = UserId(2);

    #[derive(Default)]
    pub(crate) struct FakeRoles {
        held: Mutex<HashMap<UserId, Vec<RoleId>>>,
        pub(crate) adds: Mutex<Vec<RoleId>>,
        pub(crate) fail_adds: AtomicBool,
    }

    impl FakeRoles {
        pub(crate) fn holding(roles: &[RoleId]) -> Self {
            let fake = Self::default();
            fake.held.lock().unwrap().insert(MEMBER, roles.to_vec());
            fake
        }

        pub(crate) fn held(&self) -> Vec<RoleId> {
            self.held.lock().unwrap().get(&MEMBER).cloned().unwrap_or_default()
        }

        pub(crate) fn adds_of(&self, role: RoleId) -> usize {
            self.adds.lock().unwrap().iter().filter(|r| **r == role).count()
        }
    }

    #[async_trait]
    impl MemberRoles for FakeRoles {
        async fn member_roles(&self, _: GuildId, user_id: UserId) -> Result<Vec<RoleId>> {
            Ok(self.held.lock().unwrap().get(&user_id).cloned().unwrap_or_default())
        }

        async fn add_role(&self, _: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
            if self.fail_adds.load(Ordering::SeqCst) {
                return Err(Error::Secret("simulated platform failure"));
            }
            self.adds.lock().unwrap().push(role_id);
            let mut held = self.held.lock().unwrap();
            let roles = held.entry(user_id).or_default();
            if !roles.contains(&role_id) {
                roles.push(role_id);
            }
            Ok(())
        }

        async fn remove_role(&self, _: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
            let mut held = self.held.lock().unwrap();
            held.entry(user_id).or_default().retain(|r| *r != role_id);
            Ok(())
        }
    }
}
