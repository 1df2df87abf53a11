use crate::bot::dedup::DedupChecker;
use crate::bot::stats::RunStatistics;
use crate::error::BotError;
use crate::platform::{Account, Comment, PlatformClient, SessionIdentity};
use crate::storage::CommentsRepository;
use rand::Rng;
use tracing::{debug, info, warn};

pub const COMMENT_FETCH_LIMIT: usize = 5;

pub const COMMENT_PHRASES: [&str; 8] = [
    "Like it!",
    "Nice pic",
    "Awesome ☺",
    "Nice image!!!",
    "Cute ♥",
    "👍👍👍",
    "🔝🔝🔝",
    "🔥🔥🔥",
];

/// Picks one commentable media item and one canned phrase
#[derive(Debug, Clone)]
pub struct MediaCommentSelector {
    fetch_limit: usize,
    phrases: Vec<String>,
}

impl Default for MediaCommentSelector {
    fn default() -> Self {
        Self::new(
            COMMENT_FETCH_LIMIT,
            COMMENT_PHRASES.iter().map(|p| p.to_string()).collect(),
        )
    }
}

impl MediaCommentSelector {
    pub fn new(fetch_limit: usize, phrases: Vec<String>) -> Self {
        Self {
            fetch_limit,
            phrases,
        }
    }

    /// Post one comment on a recent media item the session has not commented on yet
    pub async fn comment_account_media<C, R, G>(
        &self,
        client: &C,
        repository: &R,
        session: &SessionIdentity,
        account: &Account,
        rng: &mut G,
        stats: &mut RunStatistics,
    ) -> Result<Option<Comment>, BotError>
    where
        C: PlatformClient + ?Sized,
        R: CommentsRepository + ?Sized,
        G: Rng,
    {
        if self.phrases.is_empty() {
            return Err(BotError::InvalidData(
                "No comment phrases configured".to_string(),
            ));
        }

        let medias = client.get_medias(&account.username, self.fetch_limit).await?;
        let dedup = DedupChecker::new(repository);

        let mut candidates = Vec::with_capacity(medias.len());
        for media in medias {
            if media.is_comment_disabled {
                continue;
            }
            if dedup.has_commented(&session.account_id, &media.id)? {
                debug!("Already commented on media {}, skipping", media.id);
                continue;
            }
            candidates.push(media);
        }

        if candidates.is_empty() {
            debug!("{} has no commentable media", account.username);
            return Ok(None);
        }

        let media = &candidates[rng.random_range(0..candidates.len())];
        let text = &self.phrases[rng.random_range(0..self.phrases.len())];

        let posted = client.comment(&media.id, text).await?;
        stats.record_comment();

        if posted.owner_id != session.account_id || posted.media_id != media.id {
            warn!(
                "Platform returned comment {} for owner {} on media {}, storing it under {} on {}",
                posted.id, posted.owner_id, posted.media_id, session.account_id, media.id
            );
        }
        let comment = Comment {
            owner_id: session.account_id.clone(),
            media_id: media.id.clone(),
            ..posted
        };
        repository.add(&comment)?;

        info!(
            "Comment {} on media {} of {}: {}",
            comment.id, comment.media_id, account.username, comment.text
        );
        Ok(Some(comment))
    }
}
