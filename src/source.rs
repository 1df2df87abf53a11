use crate::config::BotConfig;
use crate::error::BotError;
use crate::platform::{Account, PlatformClient};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, info};

/// An account to process, either already fetched or known only by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Resolved(Account),
    Id(String),
}

/// Strategy that produces the next batch of accounts for a bot run
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn next_batch(
        &self,
        client: &dyn PlatformClient,
        rng: &mut StdRng,
    ) -> Result<Vec<AccountRef>, BotError>;
}

/// Owners of the top media for one randomly chosen hashtag
pub struct HashtagSource {
    hashtags: Vec<String>,
    media_limit: usize,
}

impl HashtagSource {
    pub fn new(hashtags: Vec<String>, media_limit: usize) -> Self {
        Self {
            hashtags,
            media_limit,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.hashtags.clone(), config.tag_media_limit)
    }
}

#[async_trait]
impl AccountSource for HashtagSource {
    async fn next_batch(
        &self,
        client: &dyn PlatformClient,
        rng: &mut StdRng,
    ) -> Result<Vec<AccountRef>, BotError> {
        if self.hashtags.is_empty() {
            return Err(BotError::InvalidData("No hashtags configured".to_string()));
        }

        let tag = &self.hashtags[rng.random_range(0..self.hashtags.len())];
        info!("Fetching top {} media for #{}", self.media_limit, tag);

        let medias = client.get_medias_by_tag(tag, self.media_limit).await?;
        let total = medias.len();

        let mut seen = HashSet::new();
        let owners: Vec<AccountRef> = medias
            .into_iter()
            .filter_map(|media| media.owner_id)
            .filter(|owner_id| seen.insert(owner_id.clone()))
            .map(AccountRef::Id)
            .collect();

        debug!(
            "#{} yielded {} media from {} distinct accounts",
            tag,
            total,
            owners.len()
        );
        Ok(owners)
    }
}
