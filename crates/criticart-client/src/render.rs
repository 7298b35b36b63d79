//! Listing grid markup.

use criticart_core::{Review, ReviewPage};

/// Shown in place of the grid when a listing has no matches.
pub const NO_REVIEWS_HTML: &str =
    r#"<p class="no-reviews">No reviews found matching your criteria.</p>"#;

const PLACEHOLDER_IMAGE: &str = "assets/images/placeholder.jpg";
const DEFAULT_AVATAR: &str = "assets/icons/default-avatar.png";
const DESCRIPTION_PREVIEW_CHARS: usize = 150;

/// Render one listing page as a card grid with pagination.
pub fn render_review_grid(page: &ReviewPage) -> String {
    if page.is_empty() {
        return NO_REVIEWS_HTML.to_string();
    }

    let cards: String = page.items.iter().map(render_review_card).collect();
    format!(
        r#"<div class="reviews-grid">{}</div>{}"#,
        cards,
        render_pagination(page)
    )
}

fn render_review_card(review: &Review) -> String {
    let (avatar, author) = match &review.author {
        Some(profile) => (
            profile.avatar_url.as_deref().unwrap_or(DEFAULT_AVATAR),
            profile.display_name(),
        ),
        None => (DEFAULT_AVATAR, "Anonymous"),
    };

    format!(
        r#"<div class="review-card" data-id="{id}">
    <div class="review-image"><img src="{image}" alt="{title}"></div>
    <div class="review-content">
        <h3>{title}</h3>
        <div class="review-meta"><span class="category">{category}</span>{stars}</div>
        <p class="description">{description}</p>
        <div class="review-footer">
            <div class="author"><img src="{avatar}" alt="{author}" class="author-avatar"><span class="author-name">{author}</span></div>
            <span class="likes">{likes}</span>
        </div>
    </div>
</div>"#,
        id = html_escape(review.id.as_str()),
        image = html_escape(review.cover_image().unwrap_or(PLACEHOLDER_IMAGE)),
        title = html_escape(&review.product_name),
        category = html_escape(&review.category),
        stars = render_stars(review.rating),
        description = html_escape(&truncate(&review.description, DESCRIPTION_PREVIEW_CHARS)),
        avatar = html_escape(avatar),
        author = html_escape(author),
        likes = review.likes_count,
    )
}

fn render_stars(rating: f64) -> String {
    let rating = rating.clamp(0.0, 5.0);
    let full = rating.floor() as usize;
    let half = rating.fract() >= 0.5;
    let empty = 5 - full - usize::from(half);

    format!(
        r#"<span class="stars">{}{}{}<span class="rating-value">{:.1}</span></span>"#,
        "★".repeat(full),
        if half { "½" } else { "" },
        "☆".repeat(empty),
        rating
    )
}

fn render_pagination(page: &ReviewPage) -> String {
    let total_pages = page.total_pages();
    if total_pages <= 1 {
        return String::new();
    }

    let mut html = String::from(r#"<nav class="pagination">"#);
    if page.has_previous() {
        html.push_str(&format!(
            r#"<a href="?page={}" class="prev">Previous</a>"#,
            page.page - 1
        ));
    }
    for n in 1..=total_pages {
        if n == u64::from(page.page) {
            html.push_str(&format!(r#"<span class="current">{}</span>"#, n));
        } else {
            html.push_str(&format!(r#"<a href="?page={}">{}</a>"#, n, n));
        }
    }
    if page.has_next() {
        html.push_str(&format!(
            r#"<a href="?page={}" class="next">Next</a>"#,
            page.page + 1
        ));
    }
    html.push_str("</nav>");
    html
}

/// First `max` characters, with `...` appended when cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use criticart_core::PageRequest;

    fn review(id: u32, name: &str, description: &str) -> Review {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "product_name": name,
            "category": "Electronics",
            "rating": 3.5,
            "description": description,
            "images": [],
            "status": "approved",
            "user_id": "u1",
            "created_at": "2025-05-01T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_page_renders_indicator() {
        let page = ReviewPage::new(Vec::new(), 0, PageRequest::first());
        assert_eq!(render_review_grid(&page), NO_REVIEWS_HTML);
    }

    #[test]
    fn test_cards_escape_text() {
        let page = ReviewPage::new(
            vec![review(1, "<script>alert(1)</script>", "Fast & quiet")],
            1,
            PageRequest::first(),
        );
        let html = render_review_grid(&page);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Fast &amp; quiet"));
        assert!(html.contains(PLACEHOLDER_IMAGE));
        assert!(html.contains("Anonymous"));
        assert!(!html.contains("pagination"));
    }

    #[test]
    fn test_stars() {
        assert_eq!(
            render_stars(3.5),
            r#"<span class="stars">★★★½☆<span class="rating-value">3.5</span></span>"#
        );
        assert!(render_stars(0.0).contains("☆☆☆☆☆"));
    }

    #[test]
    fn test_pagination_links() {
        let request = PageRequest::new(2, 1).unwrap();
        let page = ReviewPage::new(vec![review(2, "Phone", "Solid")], 3, request);
        let html = render_review_grid(&page);
        assert!(html.contains(r#"<a href="?page=1" class="prev">Previous</a>"#));
        assert!(html.contains(r#"<span class="current">2</span>"#));
        assert!(html.contains(r#"<a href="?page=3" class="next">Next</a>"#));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 150), "short");
        let long = "é".repeat(151);
        assert_eq!(truncate(&long, 150), format!("{}...", "é".repeat(150)));
    }
}
