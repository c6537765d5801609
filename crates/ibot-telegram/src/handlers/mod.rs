//! Telegram update handlers.
//!
//! Only slash commands are answered; the channel feed itself is driven by the
//! background poller and digest jobs.

use std::sync::Arc;

use teloxide::{prelude::*, types::BotCommand};

use crate::router::AppState;

mod commands;

/// Command menu registered with `setMyCommands` at startup.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("latest_injuries", "Most recent injury updates"),
        BotCommand::new("team_injuries", "Injuries mentioning a team"),
        BotCommand::new("injuries_today", "Injuries reported today"),
        BotCommand::new("status", "Poller and digest status"),
        BotCommand::new("help", "Show available commands"),
    ]
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }
    Ok(())
}
