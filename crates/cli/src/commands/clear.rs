//! `documentor clear`: Drop every message in a session.

use documentor_config::AppConfig;
use documentor_engine::SessionLocks;

pub async fn run(config: AppConfig, session: &str) -> anyhow::Result<()> {
    let history = documentor_history::build_from_config(&config).await?;
    let removed = SessionLocks::new().clear(history.as_ref(), session).await?;
    println!("Cleared session '{session}' ({removed} messages)");
    Ok(())
}
