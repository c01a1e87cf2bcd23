//! Interactive driver: reads questions and prints answers.

use anyhow::Context as _;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use gspatial_agent::prelude::*;

/// Records printed after each answer.
const SHOWN_RECORDS: usize = 5;

#[derive(Debug, Parser)]
#[command(name = "gspatial")]
#[command(author, version, about = "Ask spatial questions of a gSpatial-enabled Neo4j graph", long_about = None)]
struct Cli {
    /// Chat model identifier (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Neo4j HTTP endpoint (overrides NEO4J_URI)
    #[arg(long, value_name = "URI")]
    neo4j_uri: Option<String>,

    /// Neo4j user (overrides NEO4J_USERNAME)
    #[arg(long, value_name = "USER")]
    neo4j_user: Option<String>,

    /// Neo4j password (overrides NEO4J_PASSWORD)
    #[arg(long, value_name = "PASSWORD")]
    neo4j_password: Option<String>,

    /// Neo4j database name (overrides NEO4J_DATABASE)
    #[arg(long)]
    database: Option<String>,

    /// Cap on tokens generated per model call
    #[arg(long, env = "GSPATIAL_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Failed executions allowed per question
    #[arg(long, env = "GSPATIAL_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Answer a single question and exit
    #[arg(short, long)]
    question: Option<String>,

    /// Print the final Cypher query
    #[arg(long)]
    show_query: bool,

    /// Emit logs as JSON
    #[arg(long, env = "GSPATIAL_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn apply(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(model) = &self.model {
            config.llm = config.llm.with_model(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm = config.llm.with_max_tokens(max_tokens);
        }
        if let Some(uri) = &self.neo4j_uri {
            config.neo4j = config.neo4j.with_uri(uri.clone());
        }
        if let Some(user) = &self.neo4j_user {
            config.neo4j.username.clone_from(user);
        }
        if let Some(password) = &self.neo4j_password {
            config.neo4j.password.clone_from(password);
        }
        if let Some(database) = &self.database {
            config.neo4j = config.neo4j.with_database(database.clone());
        }
        if let Some(attempts) = self.max_attempts {
            config.pipeline = config.pipeline.with_max_attempts(attempts);
        }
        config
    }
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn render(state: &PipelineState, show_query: bool) -> String {
    let rule = "=".repeat(50);
    let mut out = format!(
        "\n{rule}\nResponse:\n{rule}\n{}\n",
        state.response_text.as_deref().unwrap_or("No response generated.")
    );
    if let Some(error) = &state.error {
        out.push_str(&format!("\nError: {error}\n"));
    }
    if show_query {
        if let Some(query) = &state.query_text {
            out.push_str(&format!("\nQuery:\n{query}\n"));
        }
    }
    if let Some(records) = &state.result_records {
        let thin = "-".repeat(50);
        out.push_str(&format!("\n{thin}\nResults (up to {SHOWN_RECORDS}):\n{thin}\n"));
        for (i, record) in records.iter().take(SHOWN_RECORDS).enumerate() {
            let line = serde_json::to_string(record).unwrap_or_default();
            out.push_str(&format!("{}. {line}\n", i + 1));
        }
        if records.len() > SHOWN_RECORDS {
            out.push_str(&format!("\n...showing {SHOWN_RECORDS} of {} records\n", records.len()));
        }
    }
    out.push_str(&format!("\n{rule}\n"));
    out
}

async fn repl(orchestrator: &Orchestrator, show_query: bool) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"gSpatial Cypher agent\nType 'exit' to quit\n\n").await?;
    loop {
        stdout.write_all(b"Question: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let state = orchestrator.run(question).await;
        stdout.write_all(render(&state, show_query).as_bytes()).await?;
    }
    stdout.write_all(b"Bye.\n").await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = cli.apply(AgentConfig::from_env().context("loading configuration from environment")?);
    let orchestrator = Orchestrator::from_config(&config)
        .context("building collaborators")?
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    tracing::info!(
        model = %config.llm.model,
        neo4j = %config.neo4j.uri,
        max_attempts = config.pipeline.max_attempts,
        "Agent ready"
    );

    if let Some(question) = &cli.question {
        let state = orchestrator.run(question).await;
        print!("{}", render(&state, cli.show_query));
        return Ok(());
    }

    repl(&orchestrator, cli.show_query).await
}
