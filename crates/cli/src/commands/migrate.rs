//! `documentor migrate`: Create the history schema.
//!
//! Persistent stores migrate when they open, so opening one is enough.

use documentor_config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    if !config.history.backend.is_persistent() {
        println!("History backend is in-memory; nothing to migrate.");
        return Ok(());
    }

    let history = documentor_history::build_from_config(&config).await?;
    println!("Schema ready for the {} history store.", history.name());
    Ok(())
}
