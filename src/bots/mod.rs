mod bot;
mod main_bot;

pub(crate) use bot::Bot;
pub(crate) use main_bot::MainBot;
