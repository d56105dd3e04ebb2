//! Test doubles for the outbound seams.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::{ApiError, RequestError};

use crate::commands::{CommandRouter, RouterSettings, Sender};
use crate::notifier::{Messenger, MessengerError};
use crate::shortener::{GatewayError, Shortener};
use crate::store::memory_store;

pub const TEST_TARGET_BASE: &str = "https://earn.example/page";

pub type TestRouter = CommandRouter<ScriptedShortener, RecordingMessenger>;

/// Router over a fresh in-memory store. Replies land in its `RecordingMessenger`.
pub async fn test_router(shortener: ScriptedShortener, admin_ids: Vec<i64>) -> TestRouter {
    test_router_with(shortener, RecordingMessenger::default(), admin_ids).await
}

pub async fn test_router_with(
    shortener: ScriptedShortener,
    messenger: RecordingMessenger,
    admin_ids: Vec<i64>,
) -> TestRouter {
    let settings = RouterSettings {
        admin_ids,
        target_base_url: TEST_TARGET_BASE.to_string(),
    };
    CommandRouter::new(Arc::new(memory_store().await), shortener, messenger, settings)
}

/// A private-chat sender, so replies go to the user's own id.
pub fn sender(user_id: i64) -> Sender {
    Sender {
        user_id,
        chat_id: user_id,
        username: Some(format!("user{user_id}")),
        first_name: format!("First{user_id}"),
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(i64, String)>>,
    unreachable: HashSet<i64>,
}

impl RecordingMessenger {
    pub fn failing_for(chats: impl IntoIterator<Item = i64>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            unreachable: chats.into_iter().collect(),
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().expect("messenger lock").clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("messenger lock").clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), MessengerError> {
        if self.unreachable.contains(&chat_id) {
            return Err(MessengerError::Telegram(RequestError::Api(ApiError::BotBlocked)));
        }
        self.sent
            .lock()
            .expect("messenger lock")
            .push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Hands out the scripted URLs in order, then fails every call.
#[derive(Default)]
pub struct ScriptedShortener {
    outcomes: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedShortener {
    pub fn succeeding(urls: &[&str]) -> Self {
        Self {
            outcomes: Mutex::new(urls.iter().map(|url| url.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("shortener lock").clone()
    }
}

#[async_trait]
impl Shortener for ScriptedShortener {
    async fn shorten(&self, long_url: &str) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .expect("shortener lock")
            .push(long_url.to_string());
        self.outcomes
            .lock()
            .expect("shortener lock")
            .pop_front()
            .ok_or_else(|| GatewayError::Api("scripted failure".to_string()))
    }
}
