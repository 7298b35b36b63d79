//! Moderation, comments and reports.

use criticart_core::{
    Comment, CommentDraft, CommentInsert, Decision, PageRequest, ReportInsert, Review,
    ReviewFilters, ReviewId, ReviewPage, ReviewPatch, ReviewStatus, ValidationError,
};
use criticart_data::{Backend, Query};
use tracing::info;

use crate::access::{decode, first_row, to_row, DataAccess, REVIEWS_TABLE};
use crate::error::{DataError, DataResult};

const COMMENTS_TABLE: &str = "comments";
const REPORTS_TABLE: &str = "reports";
const COMMENT_SELECT: &str = "*, author:profiles(*)";

impl<B: Backend> DataAccess<B> {
    // === Moderation ===

    /// Reviews in a moderation state. Admin only; never cached.
    pub async fn list_moderation_queue(
        &self,
        status: ReviewStatus,
        page: PageRequest,
    ) -> DataResult<ReviewPage> {
        self.session.require_admin()?;
        PageRequest::new(page.page, page.page_size)?;
        self.fetch_page(&ReviewFilters::new().status(status), page)
            .await
    }

    /// Approve or reject a review.
    pub async fn moderate_review(&self, id: &ReviewId, decision: Decision) -> DataResult<Review> {
        let session = self.session.require_admin()?;
        let current = self.fetch_review(id).await?;
        let next = current.status.transition_to(decision.target_status())?;

        let review = self
            .write_status(id, &ReviewPatch::status(next), &session.access_token)
            .await?;
        info!(
            review = %id,
            from = %current.status,
            to = %next,
            moderator = %session.user_id(),
            "review moderated"
        );
        Ok(review)
    }

    /// Close an appeal: accepted appeals publish the review.
    pub async fn resolve_appeal(&self, id: &ReviewId, accept: bool) -> DataResult<Review> {
        let session = self.session.require_admin()?;
        let current = self.fetch_review(id).await?;
        let patch = ReviewPatch::appeal_outcome(accept);
        if current.status != ReviewStatus::Appealed {
            return Err(ValidationError::InvalidTransition {
                from: current.status.to_string(),
                to: patch
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            }
            .into());
        }

        let review = self.write_status(id, &patch, &session.access_token).await?;
        info!(review = %id, accept, moderator = %session.user_id(), "appeal resolved");
        Ok(review)
    }

    /// The author asks moderators to look at a rejected review again.
    pub async fn appeal_review(&self, id: &ReviewId) -> DataResult<Review> {
        let session = self.session.require()?;
        let current = self.fetch_review(id).await?;
        if !current.is_owned_by(session.user_id()) {
            return Err(DataError::permission_denied());
        }
        let next = current.status.transition_to(ReviewStatus::Appealed)?;

        let review = self
            .write_status(id, &ReviewPatch::status(next), &session.access_token)
            .await?;
        info!(review = %id, "review appealed");
        Ok(review)
    }

    async fn write_status(
        &self,
        id: &ReviewId,
        patch: &ReviewPatch,
        token: &str,
    ) -> DataResult<Review> {
        let query = Query::from(REVIEWS_TABLE).eq("id", id);
        let updated = self
            .backend
            .update(&query, to_row(patch)?, Some(token))
            .await?;
        self.evict_review(id);
        decode(first_row(updated)?)
    }

    // === Comments ===

    /// Comments on a review, newest first, with their authors.
    pub async fn list_comments(&self, review_id: &ReviewId) -> DataResult<Vec<Comment>> {
        let query = Query::from(COMMENTS_TABLE)
            .select(COMMENT_SELECT)
            .eq("review_id", review_id)
            .order("created_at", false);
        let rows = self
            .backend
            .select(&query, self.bearer().as_deref())
            .await?;
        Ok(rows.decode()?)
    }

    pub async fn add_comment(&self, draft: &CommentDraft) -> DataResult<Comment> {
        let session = self.session.require()?;
        draft.validate()?;

        let row = to_row(&CommentInsert {
            review_id: &draft.review_id,
            user_id: session.user_id(),
            content: draft.content.trim(),
        })?;
        let stored = self
            .backend
            .insert(COMMENTS_TABLE, row, Some(&session.access_token))
            .await?;
        self.evict_review(&draft.review_id);

        let comment: Comment = decode(stored)?;
        info!(review = %draft.review_id, comment = %comment.id, "comment added");
        Ok(comment)
    }

    /// Delete a comment. Allowed for its author and for admins.
    pub async fn delete_comment(&self, comment: &Comment) -> DataResult<()> {
        let session = self.session.require()?;
        if !comment.can_be_deleted_by(session.user_id(), session.user.is_admin()) {
            return Err(DataError::permission_denied());
        }

        let query = Query::from(COMMENTS_TABLE).eq("id", &comment.id);
        self.backend
            .delete(&query, Some(&session.access_token))
            .await?;

        self.evict_review(&comment.review_id);
        info!(review = %comment.review_id, comment = %comment.id, "comment deleted");
        Ok(())
    }

    // === Reports ===

    /// Flag a review for moderators.
    pub async fn report_review(
        &self,
        review_id: &ReviewId,
        reason: &str,
        details: &str,
    ) -> DataResult<()> {
        let session = self.session.require()?;
        let report = ReportInsert {
            review_id: review_id.clone(),
            reason: reason.trim().to_string(),
            details: details.trim().to_string(),
            reported_by: session.user_id().clone(),
        };
        report.validate()?;

        self.backend
            .insert(REPORTS_TABLE, to_row(&report)?, Some(&session.access_token))
            .await?;
        info!(review = %review_id, "review reported");
        Ok(())
    }
}
