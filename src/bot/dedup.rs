use crate::error::StorageError;
use crate::storage::CommentsRepository;

/// Answers whether an account already commented on a media item
pub struct DedupChecker<'a, R: CommentsRepository + ?Sized> {
    repository: &'a R,
}

impl<'a, R: CommentsRepository + ?Sized> DedupChecker<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    pub fn has_commented(&self, account_id: &str, media_id: &str) -> Result<bool, StorageError> {
        Ok(self
            .repository
            .count_by_owner_and_media(account_id, media_id)?
            > 0)
    }
}
