//! Daily summary posted once at a fixed local time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};

use crate::{
    clock::LocalClock,
    config::Config,
    domain::ChatId,
    feed::{FeedSource, NewsItem},
    messaging::{port::MessagingPort, types::Notice},
    queries::on_date,
    scheduler::PeriodicJob,
    Result,
};

pub const DIGEST_TITLE: &str = "📝 Daily NBA Injury Summary";
pub const DIGEST_COLOR: u32 = 0x3498DB;
pub const DIGEST_EMPTY: &str = "No injuries reported today.";

/// Checked every tick; fires when the local wall-clock minute equals the
/// trigger minute. A missed minute is not made up.
pub struct DailyDigest {
    feed: Arc<dyn FeedSource>,
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
    clock: LocalClock,
    trigger: NaiveTime,
    last_sent: Option<NaiveDate>,
}

impl DailyDigest {
    pub fn new(
        cfg: &Config,
        feed: Arc<dyn FeedSource>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            feed,
            messenger,
            chat_id: ChatId(cfg.channel_id),
            clock: LocalClock::new(cfg.timezone),
            trigger: cfg.digest_time,
            last_sent: None,
        }
    }

    pub fn should_fire(&self, now: DateTime<Utc>) -> bool {
        let local = self.clock.local_now(now);
        local.hour() == self.trigger.hour()
            && local.minute() == self.trigger.minute()
            && self.last_sent != Some(local.date_naive())
    }

    /// Returns whether a digest was sent.
    pub async fn check_at(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if !self.should_fire(now) {
            return Ok(false);
        }

        let items = self.feed.fetch().await;
        let today = self.clock.today(now);
        let notice = digest_notice(&items, &self.clock, today);
        self.messenger.send_notice(self.chat_id, &notice).await?;

        // Only a delivered digest counts for the day.
        self.last_sent = Some(today);
        tracing::info!(date = %today, items = items.len(), "daily digest sent");
        Ok(true)
    }
}

#[async_trait]
impl PeriodicJob for DailyDigest {
    fn name(&self) -> &'static str {
        "digest"
    }

    async fn run_tick(&mut self) -> Result<()> {
        self.check_at(Utc::now()).await.map(|_| ())
    }
}

/// Bullet list of today's titles, or the placeholder.
pub fn digest_notice(items: &[NewsItem], clock: &LocalClock, today: NaiveDate) -> Notice {
    let lines: Vec<String> = on_date(items, clock, today)
        .into_iter()
        .map(|it| format!("• {}", it.title))
        .collect();

    let description = if lines.is_empty() {
        DIGEST_EMPTY.to_string()
    } else {
        lines.join("\n")
    };
    Notice::new(DIGEST_TITLE, DIGEST_COLOR).description(description)
}
