use crate::bot::comments::MediaCommentSelector;
use crate::bot::likes::MediaLikeSelector;
use crate::bot::processor::{AccountProcessor, BotSettings};
use crate::bot::stats::RunStatistics;
use crate::config::{
    RetryConfig, DEFAULT_BACKOFF_SECS, DEFAULT_MAX_FAILS, DEFAULT_MAX_TRANSPORT_RETRIES,
};
use crate::error::{BotError, ErrorRecovery, FailureKind};
use crate::platform::{resolve_session, PlatformClient, SessionIdentity};
use crate::source::{AccountRef, AccountSource};
use crate::storage::{CommentsRepository, FollowsRepository};
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Bounds and pacing for the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_fails: u32,
    pub backoff: Duration,
    pub max_transport_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_fails: DEFAULT_MAX_FAILS,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            max_transport_retries: DEFAULT_MAX_TRANSPORT_RETRIES,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_fails: config.max_fails.unwrap_or(DEFAULT_MAX_FAILS),
            backoff: Duration::from_secs(config.backoff_secs.unwrap_or(DEFAULT_BACKOFF_SECS)),
            max_transport_retries: config
                .max_transport_retries
                .unwrap_or(DEFAULT_MAX_TRANSPORT_RETRIES),
        }
    }
}

/// Bot engine: pulls accounts from its source and retries the whole pass on
/// transient platform failures.
pub struct Bot<C, S, R> {
    client: C,
    source: S,
    repository: R,
    settings: BotSettings,
    retry: RetryPolicy,
    like_selector: MediaLikeSelector,
    comment_selector: MediaCommentSelector,
    rng: StdRng,
    cancellation: Option<CancellationToken>,
    stats: RunStatistics,
    last_run: Option<RunStatistics>,
    fails_count: u32,
    session: Option<SessionIdentity>,
}

impl<C, S, R> Bot<C, S, R>
where
    C: PlatformClient,
    S: AccountSource,
    R: CommentsRepository + FollowsRepository,
{
    pub fn new(client: C, source: S, repository: R, settings: BotSettings, rng: StdRng) -> Self {
        Self {
            client,
            source,
            repository,
            settings,
            retry: RetryPolicy::default(),
            like_selector: MediaLikeSelector::default(),
            comment_selector: MediaCommentSelector::default(),
            rng,
            cancellation: None,
            stats: RunStatistics::default(),
            last_run: None,
            fails_count: 0,
            session: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_like_selector(mut self, selector: MediaLikeSelector) -> Self {
        self.like_selector = selector;
        self
    }

    pub fn with_comment_selector(mut self, selector: MediaCommentSelector) -> Self {
        self.comment_selector = selector;
        self
    }

    /// Live counters of the run in progress
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Counters of the most recently finished run, whatever its outcome
    pub fn last_run_statistics(&self) -> Option<&RunStatistics> {
        self.last_run.as_ref()
    }

    pub fn fails_count(&self) -> u32 {
        self.fails_count
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Run one bot pass to completion, retrying on transient failures.
    ///
    /// Failure counters, statistics and the cached session identity are reset
    /// on every exit path; the finished statistics stay readable through
    /// [`Bot::last_run_statistics`].
    pub async fn run(&mut self) -> Result<(), BotError> {
        self.stats = RunStatistics::default();
        self.fails_count = 0;
        self.session = None;

        let outcome = if self.settings.any_enabled() {
            self.run_attempts().await
        } else {
            info!("No actions enabled, skipping bot run");
            Ok(())
        };

        self.finish_run(&outcome);
        outcome
    }

    async fn run_attempts(&mut self) -> Result<(), BotError> {
        let mut attempt: u32 = 0;
        let mut transport_retries: u32 = 0;

        loop {
            if self.is_cancelled() {
                return Err(BotError::Cancelled);
            }
            attempt += 1;
            debug!("Starting bot attempt {}", attempt);

            let error = match self.start().await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            match ErrorRecovery::classify(&error) {
                FailureKind::Transient => {
                    error!("Bot crash on attempt {}: {}", attempt, error);
                    if self.fails_count >= self.retry.max_fails {
                        error!(
                            "Transient failures persisted through {} retries, giving up",
                            self.fails_count
                        );
                        return Err(BotError::RetriesExhausted { attempts: attempt });
                    }
                    warn!(
                        "Backing off for {}s before retry {}/{}",
                        self.retry.backoff.as_secs(),
                        self.fails_count + 1,
                        self.retry.max_fails
                    );
                    self.backoff().await?;
                    self.fails_count += 1;
                }
                FailureKind::Transport => {
                    error!("Bot crash on attempt {}: {}", attempt, error);
                    if transport_retries >= self.retry.max_transport_retries {
                        error!(
                            "Transport failures persisted through {} retries, giving up",
                            transport_retries
                        );
                        return Err(BotError::RetriesExhausted { attempts: attempt });
                    }
                    transport_retries += 1;
                    warn!(
                        "Retrying immediately after transport failure ({}/{})",
                        transport_retries, self.retry.max_transport_retries
                    );
                }
                FailureKind::Fatal => return Err(error),
            }
        }
    }

    /// One pass: fetch a batch of accounts and process each in order
    async fn start(&mut self) -> Result<(), BotError> {
        let session = match &self.session {
            Some(session) => session.clone(),
            None => {
                let session = resolve_session(&self.client).await?;
                info!(
                    "Session account: {} ({})",
                    session.username, session.account_id
                );
                self.session = Some(session.clone());
                session
            }
        };

        let batch = self.source.next_batch(&self.client, &mut self.rng).await?;
        info!("Processing batch of {} accounts", batch.len());

        let processor = AccountProcessor::new(
            &self.client,
            &self.repository,
            &self.settings,
            &session,
            &self.like_selector,
            &self.comment_selector,
        );

        for account_ref in batch {
            if self.is_cancelled() {
                return Err(BotError::Cancelled);
            }

            let account = match account_ref {
                AccountRef::Resolved(account) => account,
                AccountRef::Id(id) => self.client.get_account_by_id(&id).await?,
            };
            processor
                .process(&account, &mut self.rng, &mut self.stats)
                .await?;
        }

        Ok(())
    }

    async fn backoff(&self) -> Result<(), BotError> {
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(BotError::Cancelled),
                    _ = sleep(self.retry.backoff) => Ok(()),
                }
            }
            None => {
                sleep(self.retry.backoff).await;
                Ok(())
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn finish_run(&mut self, outcome: &Result<(), BotError>) {
        let stats = std::mem::take(&mut self.stats);
        match outcome {
            Ok(()) => info!("Bot run finished: {}", stats),
            Err(e) => error!("Bot run aborted: {} ({})", e, stats),
        }
        self.last_run = Some(stats);
        self.fails_count = 0;
        self.session = None;
    }
}
