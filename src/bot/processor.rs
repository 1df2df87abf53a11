use crate::bot::comments::MediaCommentSelector;
use crate::bot::likes::MediaLikeSelector;
use crate::bot::stats::RunStatistics;
use crate::config::BotConfig;
use crate::error::BotError;
use crate::platform::{Account, FollowedUser, PlatformClient, SessionIdentity};
use crate::storage::{CommentsRepository, FollowsRepository};
use rand::Rng;
use tracing::{debug, info};

/// Which actions a bot instance may perform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotSettings {
    pub likes_enabled: bool,
    pub comments_enabled: bool,
    pub following_enabled: bool,
}

impl BotSettings {
    pub fn any_enabled(&self) -> bool {
        self.likes_enabled || self.comments_enabled || self.following_enabled
    }
}

impl From<&BotConfig> for BotSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            likes_enabled: config.likes_enabled,
            comments_enabled: config.comments_enabled,
            following_enabled: config.following_enabled,
        }
    }
}

/// Decides and performs follow/like/comment for one account
pub struct AccountProcessor<'a, C: ?Sized, R: ?Sized> {
    client: &'a C,
    repository: &'a R,
    settings: &'a BotSettings,
    session: &'a SessionIdentity,
    like_selector: &'a MediaLikeSelector,
    comment_selector: &'a MediaCommentSelector,
}

impl<'a, C, R> AccountProcessor<'a, C, R>
where
    C: PlatformClient + ?Sized,
    R: CommentsRepository + FollowsRepository + ?Sized,
{
    pub fn new(
        client: &'a C,
        repository: &'a R,
        settings: &'a BotSettings,
        session: &'a SessionIdentity,
        like_selector: &'a MediaLikeSelector,
        comment_selector: &'a MediaCommentSelector,
    ) -> Self {
        Self {
            client,
            repository,
            settings,
            session,
            like_selector,
            comment_selector,
        }
    }

    pub async fn process<G: Rng>(
        &self,
        account: &Account,
        rng: &mut G,
        stats: &mut RunStatistics,
    ) -> Result<(), BotError> {
        info!("Processing account {}", account.username);

        if account.username == self.session.username {
            debug!("Skipping own account {}", account.username);
            return Ok(());
        }

        if self.settings.following_enabled && rng.random_range(0..=1) == 1 {
            self.follow(account, stats).await?;
        }

        if account.is_private {
            debug!("{} is private, only following is possible", account.username);
            return Ok(());
        }

        if self.settings.likes_enabled && rng.random_range(0..=1) == 1 {
            self.like_selector
                .like_account_media(self.client, account, rng, stats)
                .await?;
        }

        if self.settings.comments_enabled && rng.random_range(0..=3) == 1 {
            self.comment_selector
                .comment_account_media(self.client, self.repository, self.session, account, rng, stats)
                .await?;
        }

        Ok(())
    }

    async fn follow(&self, account: &Account, stats: &mut RunStatistics) -> Result<(), BotError> {
        self.client.follow(&account.id).await?;
        stats.record_follow();

        FollowsRepository::add(
            self.repository,
            &FollowedUser {
                followed_account_id: account.id.clone(),
                follower_account_id: self.session.account_id.clone(),
            },
        )?;

        info!("Followed {} ({})", account.username, account.id);
        Ok(())
    }
}
