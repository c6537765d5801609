use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use ibot_core::{
    config::Config,
    digest::DailyDigest,
    feed::{FeedClient, FeedSource},
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    poller::{DedupPoller, PollerStats},
    queries::InjuryQueries,
    scheduler::spawn_periodic,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub queries: Arc<InjuryQueries>,
    pub poller_stats: Arc<PollerStats>,
    pub started_at: DateTime<Utc>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "logged in"),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }
    tracing::info!(
        channel_id = cfg.channel_id,
        feed = %cfg.feed_url,
        poll_secs = cfg.poll_interval.as_secs(),
        digest_time = %cfg.digest_time.format("%H:%M"),
        timezone = %cfg.timezone,
        "starting injury wire"
    );

    // Command menu is best-effort; the handlers work without it.
    if let Err(e) = bot.set_my_commands(handlers::bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    // Throttle outbound sends so a burst of poller items stays under flood limits.
    // The Telegram adapter still retries once on 429 RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let feed: Arc<dyn FeedSource> =
        Arc::new(FeedClient::new(cfg.feed_url.clone(), cfg.feed_timeout)?);

    let poller = DedupPoller::new(&cfg, feed.clone(), messenger.clone());
    let poller_stats = poller.stats();
    let digest = DailyDigest::new(&cfg, feed.clone(), messenger.clone());

    let cancel = CancellationToken::new();
    let jobs = vec![
        spawn_periodic(poller, cfg.poll_interval, cancel.clone()),
        spawn_periodic(digest, cfg.digest_check_interval, cancel.clone()),
    ];

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        messenger,
        queries: Arc::new(InjuryQueries::new(&cfg, feed)),
        poller_stats,
        started_at: Utc::now(),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped, shutting down jobs");
    cancel.cancel();
    for job in jobs {
        let _ = job.await;
    }

    Ok(())
}
