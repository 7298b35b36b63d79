//! Comments and abuse reports attached to reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de::null_as_default;
use crate::ids::{CommentId, ReviewId, UserId};
use crate::profile::Profile;
use crate::validate::require;
use crate::ValidationError;

/// Longest accepted comment body.
pub const MAX_COMMENT_LEN: usize = 1000;

/// A comment on a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub review_id: ReviewId,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Profile>,
}

impl Comment {
    /// Authors and moderators may delete a comment.
    pub fn can_be_deleted_by(&self, user: &UserId, is_moderator: bool) -> bool {
        is_moderator || &self.user_id == user
    }
}

/// A comment as typed by its author.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentDraft {
    pub review_id: ReviewId,
    pub content: String,
}

impl CommentDraft {
    pub fn new(review_id: ReviewId, content: impl Into<String>) -> Self {
        Self {
            review_id,
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("Comment", &self.content)?;
        if self.content.chars().count() > MAX_COMMENT_LEN {
            return Err(ValidationError::TooLong {
                field: "Comment",
                max: MAX_COMMENT_LEN,
            });
        }
        Ok(())
    }
}

/// Row written when a comment is posted.
#[derive(Debug, Serialize)]
pub struct CommentInsert<'a> {
    pub review_id: &'a ReviewId,
    pub user_id: &'a UserId,
    pub content: &'a str,
}

/// Row written when a reader flags a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportInsert {
    pub review_id: ReviewId,
    pub reason: String,
    pub details: String,
    pub reported_by: UserId,
}

impl ReportInsert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("Reason", &self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_draft_validation() {
        let review = ReviewId::new("1");
        assert!(CommentDraft::new(review.clone(), "Nice").validate().is_ok());
        assert_eq!(
            CommentDraft::new(review.clone(), "  ").validate(),
            Err(ValidationError::MissingField("Comment"))
        );
        assert!(matches!(
            CommentDraft::new(review, "x".repeat(MAX_COMMENT_LEN + 1)).validate(),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_comment_delete_permission() {
        let comment: Comment = serde_json::from_value(serde_json::json!({
            "id": 3, "review_id": 1, "user_id": "author",
            "content": "hi", "created_at": "2025-05-02T08:00:00Z"
        }))
        .unwrap();

        assert!(comment.can_be_deleted_by(&UserId::new("author"), false));
        assert!(!comment.can_be_deleted_by(&UserId::new("other"), false));
        assert!(comment.can_be_deleted_by(&UserId::new("other"), true));
    }

    #[test]
    fn test_report_requires_reason() {
        let report = ReportInsert {
            review_id: ReviewId::new("1"),
            reason: String::new(),
            details: "spam link".to_string(),
            reported_by: UserId::new("u1"),
        };
        assert_eq!(report.validate(), Err(ValidationError::MissingField("Reason")));
    }
}
