//! List site content

use anyhow::Result;
use std::collections::HashMap;

use super::post_line;
use crate::Site;

/// List site content by type
pub async fn run(site: &Site, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let posts = site.repository()?.load_all().await?;
            println!("Posts ({}):", posts.len());
            for post in posts.iter() {
                println!("{}", post_line(post));
            }
        }
        "tag" | "tags" => {
            let posts = site.repository()?.load_all().await?;
            let mut tags: HashMap<String, usize> = HashMap::new();
            for post in posts.iter() {
                for tag in &post.tag_names {
                    *tags.entry(tag.clone()).or_insert(0) += 1;
                }
            }
            print_counts("Tags", tags);
        }
        "category" | "categories" => {
            let posts = site.repository()?.load_all().await?;
            let mut categories: HashMap<String, usize> = HashMap::new();
            for post in posts.iter() {
                if let Some(category) = &post.category {
                    *categories.entry(category.clone()).or_insert(0) += 1;
                }
            }
            print_counts("Categories", categories);
        }
        "humor" => {
            let images = site.gallery().images().await?;
            println!("Humor images ({}):", images.len());
            for image in images.iter() {
                println!("  {}", image);
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, tag, category, humor",
                content_type
            );
        }
    }

    Ok(())
}

fn print_counts(label: &str, counts: HashMap<String, usize>) {
    println!("{} ({}):", label, counts.len());
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (name, count) in counts {
        println!("  {} ({})", name, count);
    }
}
