//! Print one rendered post

use anyhow::Result;

use crate::Site;

/// Print a post as JSON, or only its HTML body
pub async fn run(site: &Site, slug: &str, html_only: bool) -> Result<()> {
    let repo = site.repository()?;
    let Some(post) = repo.get_by_slug(slug).await? else {
        anyhow::bail!("No post with slug: {}", slug);
    };

    if html_only {
        println!("{}", post.html);
    } else {
        println!("{}", serde_json::to_string_pretty(&post)?);
    }

    Ok(())
}
