//! `medroute onboard`: First-time setup.

use medroute_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("MedRoute: First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set MEDROUTE_API_KEY (or OPENAI_API_KEY), or add api_key under [model]");
    println!("   2. Point index.data_dir at your medicines.json / medical_personnel.json / symptoms.json");
    println!("   3. Run `medroute doctor` to verify, then `medroute chat`");
    println!();

    Ok(())
}
