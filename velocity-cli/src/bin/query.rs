//! `velocity-query`: answer one question from the ingested collection and
//! list the files the answer drew on.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use velocity_cli::args::require_api_key;
use velocity_cli::factory::{build_chunker, build_embedder, build_pipeline};
use velocity_cli::{ChunkerKind, QueryArgs, output, telemetry};
use velocity_rag::{GROQ_API_KEY_ENV, GroqChatModel, SalesAssistant};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = QueryArgs::parse();
    telemetry::init();

    let Some(api_key) = require_api_key(args.api_key.as_deref()) else {
        eprintln!("Error: {GROQ_API_KEY_ENV} not found in .env file");
        return Ok(ExitCode::FAILURE);
    };

    let config = args.rag_config()?;
    let embedder = build_embedder(&args.store)?;
    // Queries never chunk; the pipeline still wants one.
    let chunker = build_chunker(ChunkerKind::Fixed, &config);
    let pipeline = Arc::new(build_pipeline(&args.store, config, embedder, chunker)?);

    let model = GroqChatModel::new(api_key)?
        .with_model(&args.chat_model)
        .with_base_url(&args.llm_base_url);
    let assistant = SalesAssistant::new(pipeline, Arc::new(model));

    let question = args.question();
    let mut stdout = io::stdout().lock();
    output::write_banner(&mut stdout, &question)?;
    stdout.flush()?;

    let answer = assistant.ask(&args.store.collection, &question).await?;
    output::write_answer(&mut stdout, &answer)?;
    Ok(ExitCode::SUCCESS)
}
