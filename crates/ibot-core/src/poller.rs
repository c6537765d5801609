//! Deduplicating feed poller.
//!
//! Every tick fetches the feed and posts items the poller has not delivered
//! before, oldest first. Ids are marked seen only after a successful send, so
//! a failed delivery is retried on the next tick (at-least-once).

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    clock::LocalClock,
    config::Config,
    domain::{ChatId, ItemId},
    feed::{FeedSource, NewsItem},
    formatting::player_image_url,
    messaging::{port::MessagingPort, types::Notice},
    scheduler::PeriodicJob,
    severity::Severity,
    Result,
};

/// Ids already delivered by the poller.
///
/// Process-lifetime and unbounded: it is never persisted or evicted, so a
/// restart re-posts whatever is still live in the feed.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<ItemId>,
}

impl SeenSet {
    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: ItemId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub fetched: usize,
    pub emitted: usize,
    pub failed: usize,
    pub suppressed: usize,
}

/// Counters readable from outside the poller task (e.g. `/status`).
#[derive(Debug, Default)]
pub struct PollerStats {
    ticks: AtomicU64,
    emitted: AtomicU64,
    failed: AtomicU64,
    seen: AtomicUsize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollerStatsSnapshot {
    pub ticks: u64,
    pub emitted: u64,
    pub failed: u64,
    pub seen: usize,
}

impl PollerStats {
    pub fn snapshot(&self) -> PollerStatsSnapshot {
        PollerStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            seen: self.seen.load(Ordering::Relaxed),
        }
    }

    fn record(&self, report: &PollReport, seen: usize) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.emitted
            .fetch_add(report.emitted as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        self.seen.store(seen, Ordering::Relaxed);
    }
}

pub struct DedupPoller {
    feed: Arc<dyn FeedSource>,
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
    clock: LocalClock,
    image_template: String,
    seen: SeenSet,
    stats: Arc<PollerStats>,
}

impl DedupPoller {
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
            image_template: cfg.player_image_url.clone(),
            seen: SeenSet::default(),
            stats: Arc::new(PollerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<PollerStats> {
        self.stats.clone()
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub async fn poll_once(&mut self) -> PollReport {
        self.poll_once_at(Utc::now()).await
    }

    pub async fn poll_once_at(&mut self, now: DateTime<Utc>) -> PollReport {
        let items = self.feed.fetch().await;
        let mut report = PollReport {
            fetched: items.len(),
            ..PollReport::default()
        };

        // Guards against an id appearing twice in one response while the
        // first copy failed to send.
        let mut attempted: HashSet<ItemId> = HashSet::new();

        // Feed is newest-first; post oldest-first.
        for item in items.iter().rev() {
            if let Some(id) = &item.id {
                if self.seen.contains(id) || !attempted.insert(id.clone()) {
                    report.suppressed += 1;
                    continue;
                }
            }

            let notice = item_notice(item, &self.clock, &self.image_template, now);
            match self.messenger.send_notice(self.chat_id, &notice).await {
                Ok(_) => {
                    if let Some(id) = &item.id {
                        self.seen.insert(id.clone());
                    }
                    report.emitted += 1;
                    tracing::debug!(
                        id = ?item.id,
                        severity = Severity::classify(&item.title).label(),
                        "posted"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        id = ?item.id,
                        title = %item.title,
                        error = %e,
                        "delivery failed, will retry next tick"
                    );
                }
            }
        }

        self.stats.record(&report, self.seen.len());
        report
    }
}

#[async_trait]
impl PeriodicJob for DedupPoller {
    fn name(&self) -> &'static str {
        "poller"
    }

    async fn run_tick(&mut self) -> Result<()> {
        let report = self.poll_once().await;
        if report.emitted > 0 || report.failed > 0 {
            tracing::info!(
                fetched = report.fetched,
                emitted = report.emitted,
                failed = report.failed,
                seen = self.seen.len(),
                "poll tick"
            );
        } else {
            tracing::debug!(fetched = report.fetched, "poll tick, nothing new");
        }
        Ok(())
    }
}

/// Real-time alert for one item: severity colour, local report time, player
/// thumbnail.
pub fn item_notice(
    item: &NewsItem,
    clock: &LocalClock,
    image_template: &str,
    now: DateTime<Utc>,
) -> Notice {
    let severity = Severity::classify(&item.title);
    Notice::new(item.title.clone(), severity.color())
        .field(
            "Reported",
            clock.display_or_unknown(item.created_at.as_deref()),
            false,
        )
        .thumbnail(player_image_url(image_template, &item.title))
        .timestamp(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, FakeFeed, FakeMessenger};
    use chrono::TimeZone;

    fn test_config() -> Config {
        Config {
            telegram_bot_token: "x".to_string(),
            channel_id: -100,
            feed_url: "http://localhost/".to_string(),
            feed_timeout: std::time::Duration::from_secs(1),
            poll_interval: std::time::Duration::from_secs(20),
            digest_check_interval: std::time::Duration::from_secs(60),
            digest_time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            timezone: chrono_tz::US::Eastern,
            recent_limit: 10,
            max_notice_fields: 25,
            player_image_url: String::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap()
    }

    /// Newest first, like the upstream feed.
    fn feed_items() -> Vec<NewsItem> {
        vec![
            item(3, "C QUESTIONABLE", "2024-01-15T19:00:00Z"),
            item(2, "B DOUBTFUL", "2024-01-15T18:00:00Z"),
            item(1, "A OUT", "2024-01-15T17:00:00Z"),
        ]
    }

    fn titles_in_order(messenger: &FakeMessenger) -> Vec<String> {
        messenger
            .sent_html()
            .iter()
            .map(|h| {
                ["A OUT", "B DOUBTFUL", "C QUESTIONABLE", "D cleared"]
                    .into_iter()
                    .find(|t| h.contains(t))
                    .unwrap_or("?")
                    .to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn emits_unseen_items_oldest_first_then_nothing() {
        let feed = Arc::new(FakeFeed::new(feed_items()));
        let messenger = Arc::new(FakeMessenger::default());
        let mut poller = DedupPoller::new(&test_config(), feed.clone(), messenger.clone());

        let first = poller.poll_once_at(now()).await;
        assert_eq!(first.emitted, 3);
        assert_eq!(
            titles_in_order(&messenger),
            vec!["A OUT", "B DOUBTFUL", "C QUESTIONABLE"]
        );
        assert!(messenger.sent_to().iter().all(|c| *c == ChatId(-100)));

        let second = poller.poll_once_at(now()).await;
        assert_eq!(second.emitted, 0);
        assert_eq!(second.suppressed, 3);
        assert_eq!(messenger.sent_html().len(), 3);
    }

    #[tokio::test]
    async fn emits_exactly_the_k_new_items() {
        let feed = Arc::new(FakeFeed::new(feed_items()));
        let messenger = Arc::new(FakeMessenger::default());
        let mut poller = DedupPoller::new(&test_config(), feed.clone(), messenger.clone());
        poller.poll_once_at(now()).await;

        let mut next = vec![
            item(5, "E OUT", "2024-01-15T19:40:00Z"),
            item(4, "D cleared", "2024-01-15T19:30:00Z"),
        ];
        next.extend(feed_items());
        feed.set(next);

        let report = poller.poll_once_at(now()).await;
        assert_eq!(report.fetched, 5);
        assert_eq!(report.emitted, 2);
        let sent = messenger.sent_html();
        assert!(sent[3].contains("D cleared"));
        assert!(sent[4].contains("E OUT"));
        assert_eq!(poller.seen().len(), 5);
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_next_tick() {
        let feed = Arc::new(FakeFeed::new(feed_items()));
        let messenger = Arc::new(FakeMessenger::default());
        messenger.fail_when_contains("B DOUBTFUL");
        let mut poller = DedupPoller::new(&test_config(), feed.clone(), messenger.clone());

        let first = poller.poll_once_at(now()).await;
        assert_eq!((first.emitted, first.failed), (2, 1));
        assert!(!poller.seen().contains(&ItemId::Int(2)));

        messenger.heal();
        let second = poller.poll_once_at(now()).await;
        assert_eq!(second.emitted, 1);
        assert!(messenger.sent_html().last().unwrap().contains("B DOUBTFUL"));

        let snap = poller.stats().snapshot();
        assert_eq!(snap.ticks, 2);
        assert_eq!(snap.emitted, 3);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.seen, 3);
    }

    #[tokio::test]
    async fn items_without_id_are_never_suppressed() {
        let mut anon = item(0, "Anon update", "2024-01-15T19:00:00Z");
        anon.id = None;
        let feed = Arc::new(FakeFeed::new(vec![anon]));
        let messenger = Arc::new(FakeMessenger::default());
        let mut poller = DedupPoller::new(&test_config(), feed, messenger.clone());

        poller.poll_once_at(now()).await;
        poller.poll_once_at(now()).await;
        assert_eq!(messenger.sent_html().len(), 2);
        assert!(poller.seen().is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_in_one_response_post_once() {
        let feed = Arc::new(FakeFeed::new(vec![
            item(9, "A OUT (update)", "2024-01-15T19:00:00Z"),
            item(9, "A OUT", "2024-01-15T18:00:00Z"),
        ]));
        let messenger = Arc::new(FakeMessenger::default());
        let mut poller = DedupPoller::new(&test_config(), feed, messenger.clone());

        let report = poller.poll_once_at(now()).await;
        assert_eq!((report.emitted, report.suppressed), (1, 1));
    }

    #[test]
    fn item_notice_uses_severity_and_local_time() {
        let clock = LocalClock::new(chrono_tz::US::Eastern);
        let it = item(1, "LeBron James OUT (ankle)", "2024-01-15T23:05:00Z");
        let n = item_notice(&it, &clock, "https://p/{last}/{first}", now());

        assert_eq!(n.color, Severity::Out.color());
        assert_eq!(n.fields[0].name, "Reported");
        assert_eq!(n.fields[0].value, "06:05 PM EST");
        assert_eq!(n.thumbnail_url.as_deref(), Some("https://p/James/LeBron"));
        assert_eq!(n.timestamp, Some(now()));

        let mut bad = it.clone();
        bad.created_at = Some("garbage".to_string());
        let n = item_notice(&bad, &clock, "", now());
        assert_eq!(n.fields[0].value, crate::clock::UNKNOWN_TIME);
        assert_eq!(n.thumbnail_url, None);
    }
}
