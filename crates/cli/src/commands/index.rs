//! `medroute index`: Load the catalog and report what was indexed.

use std::path::PathBuf;

use medroute_config::AppConfig;

use crate::runtime::build_index;

pub async fn run(data_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(&config.index.data_dir));

    let provider = medroute_providers::build_from_config(&config);
    let index = build_index(&config, provider, &data_dir).await?;

    println!();
    println!("  Data directory: {}", data_dir.display());
    println!();
    println!("  {:<20} {:>8}", "CATEGORY", "DOCS");
    let mut total = 0;
    for (category, count) in index.category_counts().await {
        println!("  {:<20} {:>8}", category.as_str(), count);
        total += count;
    }
    println!("  {:<20} {:>8}", "total", total);
    println!();

    Ok(())
}
