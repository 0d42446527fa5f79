//! `medroute doctor`: Diagnose configuration and data.

use std::path::Path;

use medroute_config::AppConfig;
use medroute_core::provider::Provider;
use medroute_index::{ChunkOptions, load_catalog};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 MedRoute Doctor: System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, run `medroute onboard` (using defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running other checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else if config.model.provider == "ollama" {
        println!("  ✅ No API key needed for ollama");
    } else {
        println!("  ⚠️  No API key, set MEDROUTE_API_KEY or add api_key under [model]");
        issues += 1;
    }

    let provider = medroute_providers::build_from_config(&config);
    match check_provider(provider.as_ref()).await {
        Ok(()) => println!("  ✅ Provider reachable: {}", provider.name()),
        Err(reason) => {
            println!("  ⚠️  Provider {} not reachable: {reason}", provider.name());
            issues += 1;
        }
    }

    println!("  Model:     {} ({})", config.model.name, config.model.provider);
    match &config.index.embedding_model {
        Some(model) => println!("  Embedding: {model}"),
        None => println!("  Embedding: none (lexical similarity)"),
    }

    let data_dir = Path::new(&config.index.data_dir);
    if data_dir.is_dir() {
        println!("  ✅ Data directory exists: {}", data_dir.display());
        let chunking = ChunkOptions {
            size: config.index.chunk_size,
            overlap: config.index.chunk_overlap,
        };
        match load_catalog(data_dir, chunking) {
            Ok(docs) if docs.is_empty() => {
                println!("  ⚠️  Catalog is empty");
                issues += 1;
            }
            Ok(docs) => println!("  ✅ Catalog loads ({} documents)", docs.len()),
            Err(e) => {
                println!("  ❌ Catalog failed to load: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ Data directory missing: {}", data_dir.display());
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

async fn check_provider(provider: &dyn Provider) -> Result<(), String> {
    match provider.health_check().await {
        Ok(true) => Ok(()),
        Ok(false) => Err("endpoint answered with an error status".into()),
        Err(e) => Err(e.to_string()),
    }
}
