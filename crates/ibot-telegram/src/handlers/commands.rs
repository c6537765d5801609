use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;

use ibot_core::{
    config::Config,
    domain::ChatId,
    formatting::escape_html,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, Notice},
    },
    poller::PollerStatsSnapshot,
};

use crate::router::AppState;

const TEAM_USAGE: &str = "Usage: <code>/team_injuries &lt;team&gt;</code>\n\
Example: <code>/team_injuries Lakers</code>";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        return format!("{days}d {hours}h {mins}m");
    }
    if hours > 0 {
        return format!("{hours}h {mins}m {secs}s");
    }
    if mins > 0 {
        return format!("{mins}m {secs}s");
    }
    format!("{secs}s")
}

fn help_text(cfg: &Config, recent_limit: usize) -> String {
    format!(
        "🏀 <b>NBA Injury Wire</b>\n\n\
New injury reports are posted to the channel as they appear.\n\
A daily summary goes out at {digest} {tz}.\n\n\
<b>📋 Commands:</b>\n\
/latest_injuries - Latest {recent_limit} injury updates\n\
/team_injuries &lt;team&gt; - Injuries mentioning a team\n\
/injuries_today - Injuries reported today\n\
/status - Poller and digest status\n\
/help - Show this help message",
        digest = cfg.digest_time.format("%H:%M"),
        tz = escape_html(cfg.timezone.name()),
    )
}

fn status_text(cfg: &Config, stats: PollerStatsSnapshot, uptime_secs: i64) -> String {
    format!(
        "📊 <b>Bot Status</b>\n\n\
Uptime: {uptime}\n\
Feed: <code>{feed}</code>\n\n\
<b>Poller</b> (every {poll}s)\n\
Ticks: {ticks}\n\
Posted: {emitted}\n\
Failed sends: {failed}\n\
Seen ids: {seen}\n\n\
<b>Digest</b>\n\
Daily at {digest} {tz}",
        uptime = format_duration(uptime_secs),
        feed = escape_html(&cfg.feed_url),
        poll = cfg.poll_interval.as_secs(),
        ticks = stats.ticks,
        emitted = stats.emitted,
        failed = stats.failed,
        seen = stats.seen,
        digest = cfg.digest_time.format("%H:%M"),
        tz = escape_html(cfg.timezone.name()),
    )
}

async fn reply_html(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}

async fn reply_notice(state: &AppState, chat_id: ChatId, notice: &Notice) {
    if let Err(e) = state.messenger.send_notice(chat_id, notice).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send notice");
    }
}

async fn typing(state: &AppState, chat_id: ChatId) {
    let _ = state
        .messenger
        .send_chat_action(chat_id, ChatAction::Typing)
        .await;
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    let (cmd, arg) = parse_command(text);
    tracing::debug!(chat_id = chat_id.0, %cmd, "command");

    match cmd.as_str() {
        "start" | "help" => {
            let body = help_text(&state.cfg, state.queries.recent_limit());
            reply_html(&state, chat_id, &body).await;
        }
        "latest_injuries" => {
            typing(&state, chat_id).await;
            let notice = state.queries.latest_injuries().await;
            reply_notice(&state, chat_id, &notice).await;
        }
        "team_injuries" => {
            if arg.is_empty() {
                reply_html(&state, chat_id, TEAM_USAGE).await;
                return Ok(());
            }
            typing(&state, chat_id).await;
            let notice = state.queries.team_injuries(&arg).await;
            reply_notice(&state, chat_id, &notice).await;
        }
        "injuries_today" => {
            typing(&state, chat_id).await;
            let notice = state.queries.injuries_today().await;
            reply_notice(&state, chat_id, &notice).await;
        }
        "status" => {
            let uptime = Utc::now()
                .signed_duration_since(state.started_at)
                .num_seconds();
            let body = status_text(&state.cfg, state.poller_stats.snapshot(), uptime);
            reply_html(&state, chat_id, &body).await;
        }
        // Commands meant for other bots in a group.
        _ => {}
    }

    Ok(())
}
