//! `documentor serve`: Start the HTTP gateway.

use documentor_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Documentor gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   History:   {:?}", config.history.backend);
    println!("   Retriever: {:?}", config.retrieval.kind);

    documentor_gateway::start(config).await?;
    Ok(())
}
