use serde::{Deserialize, Serialize};

/// Canned posts shown to visitors who are not signed in.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SamplePost {
    pub content: &'static str,
    pub author: &'static str,
    pub timestamp: &'static str,
    pub votes: i64,
    pub comments: i64,
}

pub const SAMPLE_POSTS: [SamplePost; 3] = [
    SamplePost {
        content: "Why do people still use Comic Sans in professional emails? It's 2024!",
        author: "FontEnthusiast",
        timestamp: "2 hours ago",
        votes: 42,
        comments: 15,
    },
    SamplePost {
        content: "My neighbor's cat keeps judging me through the window. I can feel its disapproval.",
        author: "CatParanoid",
        timestamp: "4 hours ago",
        votes: 128,
        comments: 32,
    },
    SamplePost {
        content: "Just spent 3 hours debugging only to find a missing semicolon. I need a vacation.",
        author: "TiredDev",
        timestamp: "6 hours ago",
        votes: 256,
        comments: 45,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VotePreview {
    pub vote: Option<Vote>,
    pub votes: i64,
}

/// Local-only voting on a sample post. The count is always derived from the
/// sample's initial count, so repeated presses never drift.
pub fn preview_vote(initial: i64, current: Option<Vote>, pressed: Vote) -> VotePreview {
    if current == Some(pressed) {
        return VotePreview {
            vote: None,
            votes: initial,
        };
    }

    let delta = match pressed {
        Vote::Up => 1,
        Vote::Down => -1,
    };
    VotePreview {
        vote: Some(pressed),
        votes: initial + delta,
    }
}
