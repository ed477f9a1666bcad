use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serenity::model::prelude::UserId;
use tokio::time::Instant;

/// Time-boxed suppression of exp grants.
///
/// Keyed by user only: a member on cooldown in one guild is on cooldown in
/// every guild served by this process.
#[derive(Debug, Clone)]
pub(crate) struct Cooldowns {
    window: Duration,
    active: Arc<Mutex<HashMap<UserId, Instant>>>,
}

impl Cooldowns {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            active: Arc::default(),
        }
    }

    /// Returns `true` and opens a new window if `user` is eligible.
    ///
    /// Must be called from within a tokio runtime: every opened window
    /// schedules its own removal.
    pub(crate) fn try_consume(&self, user: UserId) -> bool {
        let now = Instant::now();
        let until = now + self.window;
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            match active.get(&user) {
                Some(deadline) if *deadline > now => return false,
                _ => {
                    active.insert(user, until);
                }
            }
        }

        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            tokio::time::sleep_until(until).await;
            let mut active = active.lock().unwrap_or_else(PoisonError::into_inner);
            // a newer window may have replaced ours in the meantime
            if active.get(&user) == Some(&until) {
                active.remove(&user);
            }
        });
        true
    }

    #[cfg(test)]
    pub(crate) fn active_len(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
