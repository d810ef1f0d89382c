//! `documentor ask`: One turn from the terminal.

use std::io::Write;

use documentor_config::AppConfig;
use documentor_core::history::SessionId;
use documentor_gateway::Services;
use futures::StreamExt;

pub async fn run(
    config: AppConfig,
    question: &str,
    session: Option<&str>,
    agent: bool,
    stream: bool,
) -> anyhow::Result<()> {
    if config.generation.api_key.is_none() && config.generation.provider != "ollama" {
        anyhow::bail!(
            "No API key configured. Set DOCUMENTOR_API_KEY or add generation.api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        );
    }

    let services = Services::from_config(&config).await?;
    let session = SessionId::resolve(session, &services.default_session);

    if stream {
        let mut fragments = if agent {
            services.agent.stream_agent_answer(question, session.as_str())
        } else {
            services.query.stream_answer(question, session.as_str())
        };
        let mut stdout = std::io::stdout();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            write!(stdout, "{fragment}")?;
            if agent {
                writeln!(stdout)?;
            }
            stdout.flush()?;
        }
        if !agent {
            writeln!(stdout)?;
        }
        return Ok(());
    }

    let response = if agent {
        services.agent.run_agent_query(question, session.as_str()).await?
    } else {
        services.query.answer(question, session.as_str()).await?
    };

    println!("{}", response.answer);
    if let Some(sources) = response.sources {
        println!("\nSources:");
        for (i, source) in sources.iter().enumerate() {
            println!("  [{}] {}", i + 1, source.lines().next().unwrap_or_default());
        }
    }
    Ok(())
}
