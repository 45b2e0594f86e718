use crate::dates;
use crate::listing::PostListing;
use crate::navigation::NavigationLinks;
use crate::post::PostDetail;
use crate::reading;
use anyhow::Result;

/// Render the accumulated listing as a Markdown document: one block per
/// post in arrival order, a "more posts" note while the cursor is live.
pub fn render_listing(listing: &PostListing) -> Result<String> {
    let mut out = String::new();

    out.push_str("# spacetraveling.\n\n");

    for post in listing.items() {
        out.push_str(&format!("## {}\n\n", post.title));
        out.push_str(&format!("{}\n\n", post.subtitle));
        if let Some(date) = &post.first_publication_date {
            out.push_str(&format!("🗓 {}  ", dates::format_date(date)?));
        }
        out.push_str(&format!("👤 {}\n\n", post.author));
        if let Some(uid) = &post.uid {
            out.push_str(&format!("→ `{}`\n\n", uid));
        }
        out.push_str("---\n\n");
    }

    if listing.has_more() {
        out.push_str("Carregar mais posts\n");
    }

    Ok(out)
}

/// Render one post page: banner, byline with reading time, the content
/// sections as Markdown, the edit note, and the prev/next footer links.
pub fn render_post(detail: &PostDetail, links: &NavigationLinks) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", detail.title));
    out.push_str(&format!("![banner]({})\n\n", detail.banner_url));

    if let Some(date) = &detail.first_publication_date {
        out.push_str(&format!("🗓 {}  ", dates::format_date(date)?));
    }
    out.push_str(&format!("👤 {}  ", detail.author));
    out.push_str(&format!(
        "🕐 {} min\n\n",
        reading::estimate_minutes(&detail.content)
    ));

    if detail.was_edited() {
        if let Some(edited) = &detail.last_publication_date {
            out.push_str(&format!(
                "*editado em {}, às {}*\n\n",
                dates::format_date(edited)?,
                dates::format_hour(edited)?
            ));
        }
    }

    for section in &detail.content {
        out.push_str(&format!("## {}\n\n", section.heading));
        for paragraph in &section.body {
            out.push_str(&format!("{}\n\n", paragraph.text));
        }
    }

    if links.previous.is_some() || links.next.is_some() {
        out.push_str("---\n\n");
        if let Some(previous) = &links.previous {
            out.push_str(&format!("← {} (`{}`)\n", previous.title, previous.uid));
        }
        if let Some(next) = &links.next {
            out.push_str(&format!("→ {} (`{}`)\n", next.title, next.uid));
        }
    }

    Ok(out)
}
