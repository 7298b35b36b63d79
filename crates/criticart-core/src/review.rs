//! Review types and moderation lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::de::null_as_default;
use crate::ids::{ReviewId, UserId};
use crate::profile::Profile;
use crate::validate::require;
use crate::{Comment, ValidationError};

/// Highest rating a review can carry.
pub const MAX_RATING: f64 = 5.0;

/// Longest accepted product name.
pub const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Moderation status of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Submitted, waiting for a moderator.
    #[default]
    Pending,
    /// Published.
    Approved,
    /// Refused by a moderator.
    Rejected,
    /// Owner contested a rejection.
    Appealed,
}

impl ReviewStatus {
    /// Get status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Appealed => "appealed",
        }
    }

    /// Check whether moving from this status to `next` is allowed.
    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Rejected)
                | (Rejected, Approved)
                | (Rejected, Appealed)
                | (Appealed, Approved)
                | (Appealed, Rejected)
        )
    }

    /// Validate a transition, returning the target status.
    pub fn transition_to(&self, next: ReviewStatus) -> Result<ReviewStatus, ValidationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ValidationError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "appealed" => Ok(ReviewStatus::Appealed),
            _ => Err(()),
        }
    }
}

/// Outcome of an appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppealStatus {
    Accepted,
    Rejected,
}

/// A moderator's verdict on a queued review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Status the review lands in.
    pub fn target_status(&self) -> ReviewStatus {
        match self {
            Decision::Approve => ReviewStatus::Approved,
            Decision::Reject => ReviewStatus::Rejected,
        }
    }
}

/// Check a rating is within 0-5 in half steps.
pub fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    let doubled = rating * 2.0;
    if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) || doubled.fract() != 0.0 {
        return Err(ValidationError::InvalidRating(rating));
    }
    Ok(())
}

/// Combine the price and quality scores from the submit form.
pub fn rating_from_scores(price: u8, quality: u8) -> f64 {
    (f64::from(price) + f64::from(quality)) / 2.0
}

/// Split the comma-separated tag input into clean tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// A review row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    #[serde(alias = "title")]
    pub product_name: String,
    #[serde(default)]
    pub product_link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub shop_provider: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub appeal_status: Option<AppealStatus>,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes_count: u32,
    pub created_at: DateTime<Utc>,
    /// Author profile, when the read embedded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Profile>,
}

impl Review {
    /// Owners may only edit while the review waits for moderation.
    pub fn is_editable_by_owner(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Whether the review shows up in public listings.
    pub fn is_published(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    /// Check whether `user` wrote this review.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    /// First image, used as the card thumbnail.
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// A review together with its comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

/// A review as submitted by its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewDraft {
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_link: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_provider: Option<String>,
    pub rating: f64,
    pub description: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub video: Option<String>,
}

impl ReviewDraft {
    /// Create a draft with the required fields.
    pub fn new(
        product_name: impl Into<String>,
        category: impl Into<String>,
        rating: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            category: category.into(),
            rating,
            description: description.into(),
            ..Default::default()
        }
    }

    /// Attach uploaded image URLs.
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Attach an uploaded video URL.
    pub fn with_video(mut self, video: impl Into<String>) -> Self {
        self.video = Some(video.into());
        self
    }

    /// Set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the product link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.product_link = Some(link.into());
        self
    }

    /// Set the shop the product was bought from.
    pub fn with_shop(mut self, shop: impl Into<String>) -> Self {
        self.shop_provider = Some(shop.into());
        self
    }

    /// Check required fields and the rating.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("Product name", &self.product_name)?;
        if self.product_name.chars().count() > MAX_PRODUCT_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "Product name",
                max: MAX_PRODUCT_NAME_LEN,
            });
        }
        require("Category", &self.category)?;
        require("Description", &self.description)?;
        validate_rating(self.rating)
    }
}

/// Row written on insert: the draft plus author and initial status.
#[derive(Debug, Serialize)]
pub struct ReviewInsert<'a> {
    #[serde(flatten)]
    pub draft: &'a ReviewDraft,
    pub user_id: &'a UserId,
    pub status: ReviewStatus,
}

impl<'a> ReviewInsert<'a> {
    /// New submissions always enter the moderation queue.
    pub fn pending(draft: &'a ReviewDraft, user_id: &'a UserId) -> Self {
        Self {
            draft,
            user_id,
            status: ReviewStatus::Pending,
        }
    }
}

/// Partial update of a review. Unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appeal_status: Option<AppealStatus>,
}

impl ReviewPatch {
    /// Patch that only moves the status.
    pub fn status(status: ReviewStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch closing an appeal.
    pub fn appeal_outcome(accept: bool) -> Self {
        Self {
            status: Some(if accept {
                ReviewStatus::Approved
            } else {
                ReviewStatus::Rejected
            }),
            appeal_status: Some(if accept {
                AppealStatus::Accepted
            } else {
                AppealStatus::Rejected
            }),
            ..Default::default()
        }
    }

    /// True when nothing would be written.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check any fields that are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.product_name {
            require("Product name", name)?;
        }
        if let Some(category) = &self.category {
            require("Category", category)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_json(status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "product_name": "Noise Cancelling Headphones",
            "category": "Electronics",
            "rating": 4.5,
            "description": "Great battery life",
            "images": null,
            "tags": ["audio"],
            "status": status,
            "user_id": "6f1c3c1e-0000-4000-8000-000000000001",
            "created_at": "2025-05-01T12:00:00Z"
        })
    }

    // === Status Tests ===

    #[test]
    fn test_status_transitions() {
        use ReviewStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Appealed));
        assert!(Appealed.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Appealed));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Approved));
    }

    #[test]
    fn test_status_transition_error() {
        let err = ReviewStatus::Pending
            .transition_to(ReviewStatus::Appealed)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                from: "pending".to_string(),
                to: "appealed".to_string(),
            }
        );
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("appealed".parse::<ReviewStatus>(), Ok(ReviewStatus::Appealed));
        assert!("archived".parse::<ReviewStatus>().is_err());
    }

    // === Rating Tests ===

    #[test]
    fn test_rating_half_steps() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(3.5).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(3.2).is_err());
        assert!(validate_rating(5.5).is_err());
        assert!(validate_rating(-0.5).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }

    #[test]
    fn test_rating_from_scores() {
        assert_eq!(rating_from_scores(4, 5), 4.5);
        assert_eq!(rating_from_scores(3, 3), 3.0);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags(" audio, wireless ,, travel"),
            vec!["audio", "wireless", "travel"]
        );
        assert!(parse_tags("").is_empty());
    }

    // === Row Tests ===

    #[test]
    fn test_review_from_row() {
        let review: Review = serde_json::from_value(review_json("pending")).unwrap();
        assert_eq!(review.id.as_str(), "7");
        assert!(review.images.is_empty());
        assert_eq!(review.likes_count, 0);
        assert!(review.is_editable_by_owner());
        assert!(!review.is_published());
    }

    #[test]
    fn test_review_accepts_title_alias() {
        let mut row = review_json("approved");
        let obj = row.as_object_mut().unwrap();
        let name = obj.remove("product_name").unwrap();
        obj.insert("title".to_string(), name);

        let review: Review = serde_json::from_value(row).unwrap();
        assert_eq!(review.product_name, "Noise Cancelling Headphones");
        assert!(review.is_published());
    }

    #[test]
    fn test_review_detail_embeds_author_and_comments() {
        let mut row = review_json("approved");
        let obj = row.as_object_mut().unwrap();
        obj.insert(
            "author".to_string(),
            serde_json::json!({"id": "p1", "user_id": "u1", "username": "gadget_fan"}),
        );
        obj.insert(
            "comments".to_string(),
            serde_json::json!([{
                "id": 1, "review_id": 7, "user_id": "u2",
                "content": "Agreed", "created_at": "2025-05-02T08:00:00Z"
            }]),
        );

        let detail: ReviewDetail = serde_json::from_value(row).unwrap();
        assert_eq!(detail.review.author.unwrap().username, "gadget_fan");
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.review.category, "Electronics");
    }

    // === Draft Tests ===

    #[test]
    fn test_draft_validation() {
        let draft = ReviewDraft::new("Phone", "Electronics", 4.0, "Solid");
        assert!(draft.validate().is_ok());

        let missing = ReviewDraft::new("", "Electronics", 4.0, "Solid");
        assert_eq!(
            missing.validate(),
            Err(ValidationError::MissingField("Product name"))
        );

        let bad_rating = ReviewDraft::new("Phone", "Electronics", 4.3, "Solid");
        assert_eq!(
            bad_rating.validate(),
            Err(ValidationError::InvalidRating(4.3))
        );
    }

    #[test]
    fn test_insert_row_is_pending() {
        let draft = ReviewDraft::new("Phone", "Electronics", 4.0, "Solid");
        let user = UserId::new("u1");
        let row = serde_json::to_value(ReviewInsert::pending(&draft, &user)).unwrap();
        assert_eq!(row["status"], "pending");
        assert_eq!(row["user_id"], "u1");
        assert_eq!(row["product_name"], "Phone");
        assert!(row.get("product_link").is_none());
    }

    // === Patch Tests ===

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = ReviewPatch {
            description: Some("Updated".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"description": "Updated"}));
        assert!(!patch.is_empty());
        assert!(ReviewPatch::default().is_empty());
    }

    #[test]
    fn test_appeal_outcome_patch() {
        let accepted = serde_json::to_value(ReviewPatch::appeal_outcome(true)).unwrap();
        assert_eq!(
            accepted,
            serde_json::json!({"status": "approved", "appeal_status": "accepted"})
        );
        let refused = serde_json::to_value(ReviewPatch::appeal_outcome(false)).unwrap();
        assert_eq!(
            refused,
            serde_json::json!({"status": "rejected", "appeal_status": "rejected"})
        );
    }
}
