use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use rag_ai::backend::BackendClient;
use rag_ai::chain::{ChainOptions, ChainRunner, DEFAULT_SYSTEM_PROMPT};
use rag_ai::collections::{default_collection, CollectionLister, HttpCollectionDirectory};
use rag_ai::llm::{Llm, OpenAiChatLlm};
use rag_ai::retrieve::HttpRetriever;
use rag_core::config::Config;
use rag_core::domain::{AnswerWithSources, Collection, ConversationHistory};
use rag_core::error::{codes, AppError};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./ragchain.toml";

/// Citation-backed answers from a retrieval backend and a chat-completion backend.
#[derive(Debug, Parser)]
#[command(name = "ragchain", version)]
pub struct Cli {
    /// TOML config file. Defaults to ./ragchain.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the retrieval backend root URL.
    #[arg(long, global = true)]
    retrieval_url: Option<String>,

    /// Override the OpenAI-compatible generation root URL.
    #[arg(long, global = true)]
    generation_url: Option<String>,

    #[arg(long, global = true)]
    model: Option<String>,

    /// Log debug events to stderr (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print results and errors as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List collections known to the retrieval backend.
    Collections,

    /// Answer a question from a collection.
    Ask {
        question: String,

        /// Collection to search; defaults to the first one listed.
        #[arg(long, short)]
        collection: Option<String>,

        #[arg(long, value_enum, default_value_t = StrategyArg::Both)]
        strategy: StrategyArg,

        #[arg(long)]
        top_k: Option<u32>,

        #[arg(long)]
        temperature: Option<f32>,

        /// System prompt for the composed strategy.
        #[arg(long)]
        system: Option<String>,
    },

    /// Multi-turn chat with the generation backend, one question per stdin line.
    Chat {
        #[arg(long)]
        system: Option<String>,

        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Check that both backends are reachable.
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Managed,
    Composed,
    Both,
}

struct Backends {
    retriever: HttpRetriever,
    collections: HttpCollectionDirectory,
    llm: OpenAiChatLlm,
    retrieval_client: BackendClient,
    generation_client: BackendClient,
}

impl Backends {
    fn from_config(cfg: &Config) -> Result<Self, AppError> {
        let retrieval_client = BackendClient::new(&cfg.retrieval.base_url)?
            .with_timeout(Duration::from_secs(cfg.retrieval.timeout_secs));
        let generation_client = BackendClient::new(&cfg.generation.base_url)?
            .with_timeout(Duration::from_secs(cfg.generation.timeout_secs));
        Ok(Self {
            retriever: HttpRetriever::new(retrieval_client.clone()),
            collections: HttpCollectionDirectory::new(retrieval_client.clone()),
            llm: OpenAiChatLlm::new(
                generation_client.clone(),
                cfg.generation.model.clone(),
                cfg.generation.api_key.clone(),
            ),
            retrieval_client,
            generation_client,
        })
    }
}

pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (e.g. from tests) is harmless; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
    };
    cfg.apply_env();
    if let Some(url) = &cli.retrieval_url {
        cfg.retrieval.base_url = url.clone();
    }
    if let Some(url) = &cli.generation_url {
        cfg.generation.base_url = url.clone();
    }
    if let Some(model) = &cli.model {
        cfg.generation.model = model.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn run(cli: Cli) -> Result<(), AppError> {
    let mut cfg = load_config(&cli)?;
    let backends = Backends::from_config(&cfg)?;

    match cli.command {
        Commands::Collections => {
            let cols = backends.collections.list()?;
            print_collections(&cols, cli.json)
        }
        Commands::Ask {
            ref question,
            ref collection,
            strategy,
            top_k,
            temperature,
            ref system,
        } => {
            apply_overrides(&mut cfg, temperature, top_k)?;

            let collection_id = match collection {
                Some(c) => c.clone(),
                None => pick_default_collection(&backends.collections)?,
            };
            let system_prompt = system
                .clone()
                .or_else(|| cfg.chain.system_prompt.clone())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

            let runner = ChainRunner::new(
                &backends.retriever,
                &backends.llm,
                ChainOptions {
                    temperature: cfg.generation.temperature,
                    max_context_chars: cfg.chain.max_context_chars,
                },
            );

            let mut answers = Vec::new();
            if matches!(strategy, StrategyArg::Managed | StrategyArg::Both) {
                answers.push(runner.run_managed(question, &collection_id, cfg.chain.top_k)?);
            }
            if matches!(strategy, StrategyArg::Composed | StrategyArg::Both) {
                answers.push(runner.run_composed(
                    question,
                    &collection_id,
                    &system_prompt,
                    cfg.chain.top_k,
                )?);
            }
            print_answers(question, &collection_id, &answers, cli.json)
        }
        Commands::Chat {
            ref system,
            temperature,
        } => {
            apply_overrides(&mut cfg, temperature, None)?;
            let temperature = cfg.generation.temperature;
            let system_prompt = system
                .clone()
                .or_else(|| cfg.chain.system_prompt.clone())
                .unwrap_or_else(|| "You are a helpful assistant. Be concise.".to_string());
            chat_loop(&backends.llm, &system_prompt, temperature, io::stdin().lock(), cli.json)
        }
        Commands::Health => {
            backends.retrieval_client.health_check()?;
            // OpenAI-compatible servers expose the model list under the same root.
            backends.generation_client.check_endpoint("/models")?;
            println!("retrieval: ok ({})", backends.retrieval_client.base_url());
            println!(
                "generation: ok ({}, model={})",
                backends.generation_client.base_url(),
                backends.llm.model()
            );
            Ok(())
        }
    }
}

/// Per-command flags go through the same checks as the config file.
fn apply_overrides(
    cfg: &mut Config,
    temperature: Option<f32>,
    top_k: Option<u32>,
) -> Result<(), AppError> {
    if let Some(t) = temperature {
        cfg.generation.temperature = t;
    }
    if let Some(k) = top_k {
        cfg.chain.top_k = k;
    }
    cfg.validate()
}

fn pick_default_collection(dir: &dyn CollectionLister) -> Result<String, AppError> {
    let cols = dir.list()?;
    let first = default_collection(&cols).ok_or_else(|| {
        AppError::new(codes::COLLECTIONS_EMPTY, "No collections found")
            .with_details("create and populate a collection on the retrieval backend first")
    })?;
    tracing::info!(collection = %first.name, "using default collection");
    eprintln!("Using collection: {}", first.name);
    Ok(first.name.clone())
}

/// Caller-owned conversation: each turn is sent as a grown copy and only kept once the
/// backend has answered, so the history never holds a question without its reply.
fn chat_loop<R: BufRead>(
    llm: &dyn Llm,
    system_prompt: &str,
    temperature: f32,
    input: R,
    json: bool,
) -> Result<(), AppError> {
    let mut history = ConversationHistory::with_system(system_prompt);
    prompt_marker();
    for line in input.lines() {
        let line = line.map_err(|e| {
            AppError::new(codes::INPUT_READ_FAILED, "Failed to read stdin").with_details(e.to_string())
        })?;
        let question = line.trim();
        if question == "/exit" {
            break;
        }
        if !question.is_empty() {
            let mut next = history.clone();
            next.append_user(question);
            let reply = llm.generate(&next, temperature)?;
            next.append_assistant(reply.clone());
            history = next;

            if json {
                println!("{}", to_json(&serde_json::json!({ "reply": reply, "turns": history.len() }))?);
            } else {
                println!("{reply}\n");
            }
        }
        prompt_marker();
    }
    Ok(())
}

fn prompt_marker() {
    eprint!("> ");
    let _ = io::stderr().flush();
}

fn print_collections(cols: &[Collection], json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", to_json(&cols)?);
        return Ok(());
    }
    if cols.is_empty() {
        println!("No collections found.");
        return Ok(());
    }
    for c in cols {
        println!("  - {} ({} docs, {} chunks)", c.name, c.document_count, c.chunk_count);
    }
    Ok(())
}

fn print_answers(
    question: &str,
    collection_id: &str,
    answers: &[AnswerWithSources],
    json: bool,
) -> Result<(), AppError> {
    if json {
        let v = serde_json::json!({
            "question": question,
            "collection_id": collection_id,
            "answers": answers,
        });
        println!("{}", to_json(&v)?);
        return Ok(());
    }

    println!("Question: {question}");
    for a in answers {
        println!("\n[{}]\n{}", a.strategy.as_str(), a.answer);
        if !a.sources.is_empty() {
            println!("\nSources:");
            for (i, s) in a.sources.iter().enumerate() {
                println!("  {}. {} (score: {:.2})", i + 1, s.document_path, s.score);
            }
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(v: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(v).map_err(|e| {
        AppError::new(codes::OUTPUT_ENCODE_FAILED, "Failed to encode output").with_details(e.to_string())
    })
}

pub fn report_error(err: &AppError, json: bool) {
    if json {
        if let Ok(s) = serde_json::to_string(err) {
            eprintln!("{s}");
            return;
        }
    }
    match &err.details {
        Some(d) => eprintln!("error: {err} ({d})"),
        None => eprintln!("error: {err}"),
    }
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn json(&self) -> bool {
        self.json
    }
}
