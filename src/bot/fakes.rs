//! In-process doubles for the platform client and account source.

use crate::error::{BotError, PlatformError};
use crate::platform::{Account, Comment, Media, PlatformClient};
use crate::source::{AccountRef, AccountSource};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const SESSION_USERNAME: &str = "engager_bot";
pub(crate) const SESSION_ACCOUNT_ID: &str = "me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    GetMedias(String),
    Follow(String),
    Like(String),
    Comment { media_id: String, text: String },
}

pub(crate) fn account(id: &str, is_private: bool) -> Account {
    Account {
        id: id.to_string(),
        username: format!("user_{id}"),
        is_private,
    }
}

pub(crate) fn media(id: &str, liked: bool, comments_disabled: bool) -> Media {
    Media {
        id: id.to_string(),
        is_liked_by_viewer: liked,
        is_comment_disabled: comments_disabled,
        owner_id: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeClient {
    accounts: HashMap<String, Account>,
    medias: HashMap<String, Vec<Media>>,
    calls: Mutex<Vec<Call>>,
    comment_ids: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_account(mut self, account: Account, medias: Vec<Media>) -> Self {
        self.medias.insert(account.username.clone(), medias);
        self.accounts.insert(account.id.clone(), account);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn liked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Like(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn followed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Follow(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn commented(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Comment { media_id, text } => Some((media_id, text)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn not_found(what: &str) -> PlatformError {
        PlatformError::Request {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn get_account_by_id(&self, id: &str) -> Result<Account, PlatformError> {
        self.accounts
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn get_account(&self, username: &str) -> Result<Account, PlatformError> {
        if username == SESSION_USERNAME {
            return Ok(Account {
                id: SESSION_ACCOUNT_ID.to_string(),
                username: SESSION_USERNAME.to_string(),
                is_private: false,
            });
        }
        self.accounts
            .values()
            .find(|account| account.username == username)
            .cloned()
            .ok_or_else(|| Self::not_found(username))
    }

    async fn get_session_username(&self) -> Result<String, PlatformError> {
        Ok(SESSION_USERNAME.to_string())
    }

    async fn get_medias(&self, username: &str, limit: usize) -> Result<Vec<Media>, PlatformError> {
        self.record(Call::GetMedias(username.to_string()));
        Ok(self
            .medias
            .get(username)
            .map(|medias| medias.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_medias_by_tag(
        &self,
        _tag: &str,
        limit: usize,
    ) -> Result<Vec<Media>, PlatformError> {
        Ok(self
            .accounts
            .keys()
            .take(limit)
            .map(|id| Media {
                owner_id: Some(id.clone()),
                ..media(&format!("tagged_{id}"), false, false)
            })
            .collect())
    }

    async fn follow(&self, account_id: &str) -> Result<(), PlatformError> {
        self.record(Call::Follow(account_id.to_string()));
        Ok(())
    }

    async fn like(&self, media_id: &str) -> Result<(), PlatformError> {
        self.record(Call::Like(media_id.to_string()));
        Ok(())
    }

    async fn comment(&self, media_id: &str, text: &str) -> Result<Comment, PlatformError> {
        self.record(Call::Comment {
            media_id: media_id.to_string(),
            text: text.to_string(),
        });
        let id = self.comment_ids.fetch_add(1, Ordering::SeqCst);
        Ok(Comment {
            id: format!("comment_{id}"),
            owner_id: SESSION_ACCOUNT_ID.to_string(),
            media_id: media_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Replays scripted failures, then keeps returning the same batch
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<PlatformError>>,
    batch: Vec<AccountRef>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(failures: Vec<PlatformError>, batch: Vec<AccountRef>) -> Self {
        Self {
            script: Mutex::new(failures.into()),
            batch,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountSource for ScriptedSource {
    async fn next_batch(
        &self,
        _client: &dyn PlatformClient,
        _rng: &mut StdRng,
    ) -> Result<Vec<AccountRef>, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next_failure = self.script.lock().pop_front();
        match next_failure {
            Some(error) => Err(error.into()),
            None => Ok(self.batch.clone()),
        }
    }
}

/// Shared-handle wrapper so tests can inspect a source owned by the bot
#[async_trait]
impl<T: AccountSource> AccountSource for std::sync::Arc<T> {
    async fn next_batch(
        &self,
        client: &dyn PlatformClient,
        rng: &mut StdRng,
    ) -> Result<Vec<AccountRef>, BotError> {
        self.as_ref().next_batch(client, rng).await
    }
}
