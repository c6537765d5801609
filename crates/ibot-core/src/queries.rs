//! On-demand feed queries: latest N, by team, reported today.
//!
//! Each query does its own fetch and never touches the poller's seen set.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    clock::LocalClock,
    config::Config,
    feed::{FeedSource, NewsItem},
    formatting::title_case,
    messaging::types::Notice,
};

pub const LATEST_TITLE: &str = "🔔 Latest NBA Injury Updates";
pub const LATEST_COLOR: u32 = 0x9B59B6;
pub const LATEST_EMPTY: &str = "No injury updates found.";

pub const TEAM_COLOR: u32 = 0x1ABC9C;
pub const TEAM_EMPTY: &str = "No team-specific injuries found.";

pub const TODAY_TITLE: &str = "📅 Today's NBA Injuries";
pub const TODAY_COLOR: u32 = 0xE74C3C;
pub const TODAY_EMPTY: &str = "No injuries reported yet today.";

/// First `n` items in feed order (newest first).
pub fn recent(items: &[NewsItem], n: usize) -> &[NewsItem] {
    &items[..n.min(items.len())]
}

/// Items whose title contains `team`, case-insensitively.
pub fn by_team<'a>(items: &'a [NewsItem], team: &str) -> Vec<&'a NewsItem> {
    let needle = team.trim().to_lowercase();
    items
        .iter()
        .filter(|it| it.title.to_lowercase().contains(&needle))
        .collect()
}

/// Items reported on `date` in the clock's timezone.
///
/// Items with a missing or malformed timestamp are skipped.
pub fn on_date<'a>(items: &'a [NewsItem], clock: &LocalClock, date: NaiveDate) -> Vec<&'a NewsItem> {
    items
        .iter()
        .filter(|it| {
            let Some(ts) = it.created_at.as_deref() else {
                tracing::warn!(id = ?it.id, "item has no created_at, skipping");
                return false;
            };
            match clock.to_local_date(ts) {
                Ok(d) => d == date,
                Err(e) => {
                    tracing::warn!(id = ?it.id, error = %e, "skipping item");
                    false
                }
            }
        })
        .collect()
}

/// One field per item (title → local time), or the placeholder when empty.
///
/// At most `max_fields` fields are added; the rest are counted in the
/// description.
pub fn items_notice(
    title: impl Into<String>,
    color: u32,
    placeholder: &str,
    items: &[&NewsItem],
    clock: &LocalClock,
    max_fields: usize,
) -> Notice {
    let mut notice = Notice::new(title, color);
    if items.is_empty() {
        return notice.description(placeholder);
    }

    let max_fields = max_fields.max(1);
    if items.len() > max_fields {
        notice = notice.description(format!("Showing {max_fields} of {}.", items.len()));
    }
    for it in items.iter().take(max_fields) {
        notice = notice.field(
            it.title.clone(),
            clock.display_or_unknown(it.created_at.as_deref()),
            false,
        );
    }
    notice
}

#[derive(Clone)]
pub struct InjuryQueries {
    feed: Arc<dyn FeedSource>,
    clock: LocalClock,
    recent_limit: usize,
    max_fields: usize,
}

impl InjuryQueries {
    pub fn new(cfg: &Config, feed: Arc<dyn FeedSource>) -> Self {
        Self {
            feed,
            clock: LocalClock::new(cfg.timezone),
            recent_limit: cfg.recent_limit,
            max_fields: cfg.max_notice_fields,
        }
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    pub async fn latest_injuries(&self) -> Notice {
        let items = self.feed.fetch().await;
        let latest: Vec<&NewsItem> = recent(&items, self.recent_limit).iter().collect();
        items_notice(
            LATEST_TITLE,
            LATEST_COLOR,
            LATEST_EMPTY,
            &latest,
            &self.clock,
            self.max_fields,
        )
    }

    pub async fn team_injuries(&self, team: &str) -> Notice {
        let items = self.feed.fetch().await;
        let matches = by_team(&items, team);
        items_notice(
            format!("🛡️ Injury Report — {}", title_case(team.trim())),
            TEAM_COLOR,
            TEAM_EMPTY,
            &matches,
            &self.clock,
            self.max_fields,
        )
    }

    pub async fn injuries_today(&self) -> Notice {
        self.injuries_today_at(Utc::now()).await
    }

    pub async fn injuries_today_at(&self, now: DateTime<Utc>) -> Notice {
        let items = self.feed.fetch().await;
        let today = self.clock.today(now);
        let matches = on_date(&items, &self.clock, today);
        items_notice(
            TODAY_TITLE,
            TODAY_COLOR,
            TODAY_EMPTY,
            &matches,
            &self.clock,
            self.max_fields,
        )
    }
}
