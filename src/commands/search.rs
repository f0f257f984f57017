//! Search posts from the command line

use anyhow::Result;

use super::post_line;
use crate::Site;

pub async fn run(site: &Site, query: &str) -> Result<()> {
    let hits = site.repository()?.search(query).await?;
    println!("Matches for {:?} ({}):", query, hits.len());
    for post in &hits {
        println!("{}", post_line(post));
    }
    Ok(())
}
