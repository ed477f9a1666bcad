use std::sync::Arc;

use crate::{app_state::AppState, immut_data::dynamic::BotCfg};

/// Accessors shared by every event handler of the bot.
pub(crate) trait Bot {
    fn discord_prefix(&self) -> &str;
    fn cfg(&self) -> Arc<BotCfg>;
    fn state(&self) -> Arc<AppState>;
}

macro_rules! impl_bot {
    ($t:ty) => {
        impl crate::bots::Bot for $t {
            fn discord_prefix(&self) -> &str {
                &self.cfg.discord_prefix
            }

            fn cfg(&self) -> ::std::sync::Arc<crate::immut_data::dynamic::BotCfg> {
                ::std::sync::Arc::clone(&self.cfg)
            }

            fn state(&self) -> ::std::sync::Arc<crate::app_state::AppState> {
                ::std::sync::Arc::clone(&self.state)
            }
        }
    };
}

pub(super) use impl_bot;
