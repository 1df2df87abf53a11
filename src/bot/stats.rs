use std::fmt;

/// Counts of actions taken during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub likes_count: u32,
    pub comments_count: u32,
    pub follows_count: u32,
}

impl RunStatistics {
    pub fn total_actions(&self) -> u32 {
        self.likes_count + self.comments_count + self.follows_count
    }

    pub(crate) fn record_like(&mut self) {
        self.likes_count += 1;
    }

    pub(crate) fn record_comment(&mut self) {
        self.comments_count += 1;
    }

    pub(crate) fn record_follow(&mut self) {
        self.follows_count += 1;
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} likes, {} comments, {} follows",
            self.likes_count, self.comments_count, self.follows_count
        )
    }
}
