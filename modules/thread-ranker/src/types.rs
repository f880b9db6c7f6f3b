use std::fmt;

use serde::{Deserialize, Serialize};

/// One organic hit from the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
}

/// Title and body of a thread's opening post. `None` means extraction failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDocument {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl ThreadDocument {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn title_or_placeholder(&self) -> &str {
        self.title.as_deref().unwrap_or("Title not found")
    }

    pub fn body_or_placeholder(&self) -> &str {
        self.body.as_deref().unwrap_or("Body not found")
    }
}

/// A comment and its reply subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub score: i64,
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(text: impl Into<String>, score: i64) -> Self {
        Self {
            text: text.into(),
            score,
            replies: Vec::new(),
        }
    }

    pub fn with_replies(mut self, replies: Vec<Comment>) -> Self {
        self.replies = replies;
        self
    }

    /// Number of comments in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.replies.iter().map(Comment::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevanceVerdict {
    Yes,
    No,
}

impl RelevanceVerdict {
    /// Containment test on the raw model output. Case-sensitive: "Yes" is `No`.
    pub fn from_response(raw: &str) -> Self {
        if raw.contains("YES") {
            RelevanceVerdict::Yes
        } else {
            RelevanceVerdict::No
        }
    }

    pub fn is_yes(self) -> bool {
        self == RelevanceVerdict::Yes
    }
}

impl fmt::Display for RelevanceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelevanceVerdict::Yes => write!(f, "YES"),
            RelevanceVerdict::No => write!(f, "NO"),
        }
    }
}
