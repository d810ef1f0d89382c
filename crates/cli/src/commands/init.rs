//! `documentor init`: Write a default config file.

use std::path::Path;

use documentor_config::AppConfig;

pub fn run(path: Option<&Path>) -> anyhow::Result<()> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set DOCUMENTOR_API_KEY (or add generation.api_key to the file)");
    println!("   2. Point retrieval.corpus_path at a JSONL corpus, or configure Chroma");
    println!("   3. Run: documentor ask \"How do I authenticate?\"");
    Ok(())
}
