use crate::bot::stats::RunStatistics;
use crate::error::BotError;
use crate::platform::{Account, PlatformClient};
use rand::Rng;
use std::ops::RangeInclusive;
use tracing::{debug, info};

pub const LIKE_FETCH_LIMIT: usize = 15;
pub const MIN_LIKE_QUOTA: usize = 3;
pub const MAX_LIKE_QUOTA: usize = 5;

/// Picks which recent media of an account receive a like
#[derive(Debug, Clone)]
pub struct MediaLikeSelector {
    fetch_limit: usize,
    quota: RangeInclusive<usize>,
}

impl Default for MediaLikeSelector {
    fn default() -> Self {
        Self::new(LIKE_FETCH_LIMIT, MIN_LIKE_QUOTA, MAX_LIKE_QUOTA)
    }
}

impl MediaLikeSelector {
    pub fn new(fetch_limit: usize, min_quota: usize, max_quota: usize) -> Self {
        Self {
            fetch_limit,
            quota: min_quota..=max_quota.max(min_quota),
        }
    }

    /// Like up to a random quota of distinct media; returns how many were liked.
    ///
    /// When the quota covers every fetched item, all of them are liked without
    /// looking at `is_liked_by_viewer`. Otherwise items are drawn uniformly
    /// from the remaining pool, skipping ones the viewer already liked.
    pub async fn like_account_media<C, G>(
        &self,
        client: &C,
        account: &Account,
        rng: &mut G,
        stats: &mut RunStatistics,
    ) -> Result<usize, BotError>
    where
        C: PlatformClient + ?Sized,
        G: Rng,
    {
        let mut pool = client.get_medias(&account.username, self.fetch_limit).await?;
        if pool.is_empty() {
            debug!("{} has no media to like", account.username);
            return Ok(0);
        }

        let mut quota = rng.random_range(self.quota.clone());
        info!(
            "Liking media of {} (quota {}, fetched {})",
            account.username,
            quota,
            pool.len()
        );

        if quota >= pool.len() {
            for media in &pool {
                client.like(&media.id).await?;
                stats.record_like();
            }
            return Ok(pool.len());
        }

        let mut liked = 0;
        while quota > 0 {
            // Redraws only terminate while an unliked item remains
            if pool.iter().all(|media| media.is_liked_by_viewer) {
                debug!(
                    "Only already-liked media left for {}, stopping with {} of quota unused",
                    account.username, quota
                );
                break;
            }

            let index = rng.random_range(0..pool.len());
            if pool[index].is_liked_by_viewer {
                continue;
            }

            let media = pool.remove(index);
            client.like(&media.id).await?;
            stats.record_like();
            debug!("Liked media {}", media.id);
            quota -= 1;
            liked += 1;
        }

        Ok(liked)
    }
}
