//! Hand-rolled fakes shared by the unit tests.

use std::sync::{
    atomic::{AtomicI32, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, ItemId, MessageId, MessageRef},
    errors::Error,
    feed::{FeedSource, NewsItem},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities},
    },
    Result,
};

pub fn item(id: i64, title: &str, created_at: &str) -> NewsItem {
    NewsItem {
        id: Some(ItemId::Int(id)),
        title: title.to_string(),
        created_at: Some(created_at.to_string()),
    }
}

/// Feed with a fixed response that tests can swap between ticks.
#[derive(Default)]
pub struct FakeFeed {
    items: Mutex<Vec<NewsItem>>,
    calls: AtomicUsize,
}

impl FakeFeed {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, items: Vec<NewsItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self) -> Vec<NewsItem> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.items.lock().unwrap().clone()
    }
}

/// Records sends; can be told to fail sends whose html contains a marker.
#[derive(Default)]
pub struct FakeMessenger {
    next_id: AtomicI32,
    sends: Mutex<Vec<(ChatId, String)>>,
    fail_on: Mutex<Option<String>>,
    actions: AtomicUsize,
}

impl FakeMessenger {
    pub fn fail_when_contains(&self, marker: &str) {
        *self.fail_on.lock().unwrap() = Some(marker.to_string());
    }

    pub fn heal(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn sent_html(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|(_, html)| html.clone())
            .collect()
    }

    pub fn sent_to(&self) -> Vec<ChatId> {
        self.sends.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub fn chat_actions(&self) -> usize {
        self.actions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        if let Some(marker) = self.fail_on.lock().unwrap().as_deref() {
            if html.contains(marker) {
                return Err(Error::External("fake send failure".to_string()));
            }
        }
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }

    async fn send_chat_action(&self, _chat_id: ChatId, _action: ChatAction) -> Result<()> {
        self.actions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
