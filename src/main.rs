//! # supportdesk CLI Application
//!
//! This module implements the command-line interface for supportdesk,
//! providing access to ingestion, retrieval and ticket handling through a set
//! of subcommands.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands for the pipeline stages:
//!   - `crawl`: Documentation crawling only
//!   - `ingest`: Crawl (or load crawled pages), chunk, embed and index
//!   - `search`: Nearest chunks for a query
//!   - `answer`: Retrieval plus answer synthesis
//!   - `classify` / `route` / `triage`: Ticket handling
//!   - `chat`: Interactive live chat that turns a conversation into a ticket
//!   - `list`: Index inspection
//!
//! Both text and JSON output formats are supported. Logs go to stderr, or to
//! `.supportdesk/chat.log` during a chat session.

mod telemetry;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rig::{completion::CompletionModel, embeddings::EmbeddingModel};
use supportdesk::crawler::{CrawledPage, CrawlerConfig, crawl_website};
use supportdesk::index::{Database, EmbeddingSpace};
use supportdesk::model::{Client, GeminiClient, RouterClient};
use supportdesk::processor::{IndexProgress, ProcessorConfig, index_pages};
use supportdesk::search::{AnswerOptions, SearchOptions, SearchSystem};
use supportdesk::support::{
    ChatTurn, LiveChat, SessionStore, Ticket, TriageOutcome, classify_ticket, route_ticket,
    triage_ticket,
};
use telemetry::OtelGuard;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Answer support tickets from your product documentation", long_about = None)]
struct Cli {
    /// Model provider for completions (embeddings always use Gemini)
    #[arg(long, global = true, value_enum, env = "SUPPORTDESK_PROVIDER", default_value = "gemini")]
    provider: Provider,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Provider {
    /// Gemini via GEMINI_API_KEY
    Gemini,
    /// OpenAI-compatible router via HF_TOKEN and HF_MODEL
    Router,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl documentation sites and print or save the accepted pages
    Crawl(CrawlArgs),

    /// Crawl (or load crawled pages), then chunk, embed and index them
    Ingest(IngestArgs),

    /// Search the indexed documentation
    Search(SearchArgs),

    /// Answer a question from the indexed documentation
    Answer(AnswerArgs),

    /// Classify a ticket by topic, sentiment and priority
    Classify(TicketArgs),

    /// Decide who handles a ticket topic
    Route(RouteArgs),

    /// Classify a ticket, then answer or route it
    Triage(TriageArgs),

    /// Describe an issue interactively until a ticket can be filed
    Chat(ChatArgs),

    /// List indexed sources
    List(ListArgs),
}

#[derive(Args, Debug)]
struct CrawlOptions {
    /// Seed URLs to start crawling from
    seeds: Vec<String>,

    /// Allowed network locations (defaults to the seed hosts)
    #[arg(short, long, value_delimiter = ',')]
    allow: Vec<String>,

    /// Maximum accepted pages per domain
    #[arg(short = 'p', long, default_value = "200")]
    max_pages_per_domain: usize,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value = "500")]
    rate: u64,

    /// Request timeout in seconds
    #[arg(long, default_value = "12")]
    timeout: u64,

    /// Pages need more words than this to be kept
    #[arg(long, default_value = "50")]
    min_words: usize,
}

impl CrawlOptions {
    fn to_config(&self) -> anyhow::Result<CrawlerConfig> {
        Ok(CrawlerConfig::builder()
            .seed_urls(self.seeds.clone())
            .allowed_domains(self.allow.clone())
            .max_pages_per_domain(self.max_pages_per_domain)
            .request_delay_ms(self.rate)
            .request_timeout_secs(self.timeout)
            .min_words(self.min_words)
            .build()?)
    }
}

#[derive(Args, Debug)]
struct CrawlArgs {
    #[command(flatten)]
    crawl: CrawlOptions,

    /// Save accepted pages as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IngestArgs {
    #[command(flatten)]
    crawl: CrawlOptions,

    /// Index pages saved by `crawl --output` instead of crawling
    #[arg(long, conflicts_with = "seeds")]
    pages: Option<PathBuf>,

    /// Chunk size in words
    #[arg(short, long, default_value = "400")]
    chunk_size: usize,

    /// Words shared by consecutive chunks
    #[arg(short, long, default_value = "80")]
    overlap: usize,

    /// Chunks embedded per request
    #[arg(short, long, default_value = "64")]
    batch_size: usize,

    /// Database path
    #[arg(long, default_value = "index.db")]
    database: PathBuf,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: String,

    /// Only return chunks whose URL contains this string
    #[arg(short, long)]
    source: Option<String>,

    /// Limit results
    #[arg(short, long, default_value = "5")]
    limit: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Database path
    #[arg(short, long, default_value = "index.db")]
    database: PathBuf,
}

#[derive(Args, Debug)]
struct AnswerArgs {
    /// Question to answer
    #[arg(required = true)]
    query: String,

    /// Ticket id attached to the answer
    #[arg(long, default_value = "cli")]
    ticket_id: String,

    /// Topic the question belongs to
    #[arg(short, long, default_value = "How-to")]
    topic: String,

    #[command(flatten)]
    answer: AnswerArgsCommon,
}

#[derive(Args, Debug)]
struct AnswerArgsCommon {
    /// Chunks retrieved as context
    #[arg(short = 'k', long, default_value = "5")]
    top_k: usize,

    /// Sources attached to the answer
    #[arg(long, default_value = "3")]
    max_sources: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Database path
    #[arg(short, long, default_value = "index.db")]
    database: PathBuf,
}

impl AnswerArgsCommon {
    fn options(&self) -> AnswerOptions {
        AnswerOptions {
            top_k: self.top_k,
            max_sources: self.max_sources,
        }
    }
}

#[derive(Args, Debug)]
struct TicketArgs {
    /// Ticket id
    #[arg(long, default_value = "cli")]
    id: String,

    /// Ticket subject
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Ticket body
    #[arg(short, long, required = true)]
    body: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

impl TicketArgs {
    fn ticket(&self) -> Ticket {
        Ticket::new(&self.id, &self.subject, &self.body)
    }
}

#[derive(Args, Debug)]
struct RouteArgs {
    /// Ticket id
    ticket_id: String,

    /// Topic tag of the ticket
    topic: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct TriageArgs {
    /// Ticket id
    #[arg(long, default_value = "cli")]
    id: String,

    /// Ticket subject
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Ticket body
    #[arg(short, long, required = true)]
    body: String,

    /// Chunks retrieved as context
    #[arg(short = 'k', long, default_value = "5")]
    top_k: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Database path
    #[arg(short, long, default_value = "index.db")]
    database: PathBuf,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Session id for the conversation
    #[arg(long, default_value = "cli")]
    session: String,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Show detailed information
    #[arg(short, long)]
    details: bool,

    /// Database path
    #[arg(long, default_value = "index.db")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let mut _otel: Option<OtelGuard> = None;
    if matches!(cli.command, Some(Commands::Chat(_))) {
        telemetry::init_chat_logging()?;
    } else {
        _otel = Some(telemetry::init_tracing_subscriber()?);
    }

    let Some(command) = cli.command else {
        // If no command is provided, show help
        let _ = Cli::parse_from(["supportdesk", "--help"]);
        return Ok(());
    };

    match command {
        Commands::Crawl(args) => crawl_command(args).await,
        Commands::Route(args) => route_command(args),
        Commands::List(args) => list_command(args).await,
        command => match cli.provider {
            Provider::Gemini => run_model_command(GeminiClient::new_gemini_from_env()?, command).await,
            Provider::Router => run_model_command(RouterClient::new_router_from_env()?, command).await,
        },
    }
}

/// Commands that need the model oracles
async fn run_model_command<C, E>(client: Client<C, E>, command: Commands) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    match command {
        Commands::Ingest(args) => ingest_command(client, args).await,
        Commands::Search(args) => search_command(client, args).await,
        Commands::Answer(args) => answer_command(client, args).await,
        Commands::Classify(args) => classify_command(client, args).await,
        Commands::Triage(args) => triage_command(client, args).await,
        Commands::Chat(args) => chat_command(client, args).await,
        Commands::Crawl(_) | Commands::Route(_) | Commands::List(_) => Ok(()),
    }
}

async fn open_index<C, E>(client: &Client<C, E>, path: &Path) -> anyhow::Result<Database>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let space = EmbeddingSpace::new(client.embedding_model_name(), client.embedding_dimensions());
    Ok(Database::new_from_path(&path.to_string_lossy(), space).await?)
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let config = args.crawl.to_config()?;
    println!("Crawling {}...", config.seed_urls.join(", "));

    let report = crawl_website(&config).await?;

    println!(
        "Crawled {} pages: {} accepted, {} too short, {} failed",
        report.visited,
        report.pages.len(),
        report.skipped_short.len(),
        report.failed.len()
    );

    // Save to file if output is specified
    if let Some(output_file) = args.output {
        let json = serde_json::to_string_pretty(&report.pages)?;
        tokio::fs::write(&output_file, json).await?;
        println!("Saved crawled pages to {}", output_file.display());
    } else {
        for page in &report.pages {
            println!("{} - {} ({} words)", page.url, page.title, page.word_count());
        }
    }

    Ok(())
}

#[instrument(skip(client))]
async fn ingest_command<C, E>(client: Client<C, E>, args: IngestArgs) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let processor_config = ProcessorConfig::builder()
        .chunk_size_words(args.chunk_size)
        .overlap_words(args.overlap)
        .embedding_batch_size(args.batch_size)
        .build()?;
    let db = open_index(&client, &args.database).await?;

    let pages: Vec<CrawledPage> = match &args.pages {
        Some(path) => {
            println!("Loading pages from {}...", path.display());
            let content = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&content)?
        }
        None => {
            let config = args.crawl.to_config()?;
            println!("Crawling {}...", config.seed_urls.join(", "));
            let report = crawl_website(&config).await?;
            println!(
                "Accepted {} of {} fetched pages",
                report.pages.len(),
                report.visited
            );
            report.pages
        }
    };

    println!("Processing {} pages...", pages.len());

    // Create a channel for progress updates
    let (progress_sender, mut progress_receiver) = mpsc::channel(100);

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} batches ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Embedding chunks...");

    let start_time = std::time::Instant::now();

    // Spawn a task to process progress updates
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(event) = progress_receiver.recv().await {
                match event {
                    IndexProgress::Started { chunks, batches, .. } => {
                        progress_bar.set_length(batches as u64);
                        progress_bar.set_message(format!("{chunks} chunks"));
                    }
                    IndexProgress::BatchIndexed { done, .. } => {
                        progress_bar.set_position(done as u64);
                    }
                    IndexProgress::Finished { chunks, pruned } => {
                        progress_bar.finish_with_message(format!(
                            "{chunks} chunks indexed, {pruned} stale removed"
                        ));
                    }
                }
            }
            // The sender is gone either way; leave the bar where it stopped
            if !progress_bar.is_finished() {
                progress_bar.abandon();
            }
        }
    });

    let result = index_pages(&client, &db, &pages, &processor_config, Some(progress_sender)).await;

    // Wait for progress task to complete (it will end when all senders are dropped)
    if let Err(e) = progress_handle.await {
        warn!(error = %e, "progress reporting task failed");
    }
    let report = result?;

    println!(
        "Indexed {} chunks from {} pages in {:.2?} ({} stale chunks removed)",
        report.chunks,
        report.pages,
        start_time.elapsed(),
        report.pruned
    );
    Ok(())
}

#[instrument(skip(client))]
async fn search_command<C, E>(client: Client<C, E>, args: SearchArgs) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let db = open_index(&client, &args.database).await?;
    let system = SearchSystem::new(db, client);

    let options = SearchOptions {
        limit: args.limit,
        source_filter: args.source,
    };
    let results = system.search(&args.query, &options).await?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        _ => {
            println!("Found {} results", results.len());
            for (i, result) in results.iter().enumerate() {
                println!("{}. [{:.3}] {}", i + 1, result.score, result.metadata.title);
                println!("   URL: {}", result.metadata.source);
                println!("   {}", preview(&result.text, 200));
                println!();
            }
        }
    }

    Ok(())
}

#[instrument(skip(client))]
async fn answer_command<C, E>(client: Client<C, E>, args: AnswerArgs) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let db = open_index(&client, &args.answer.database).await?;
    let system = SearchSystem::new(db, client);

    let answer = system
        .answer(&args.ticket_id, &args.topic, &args.query, args.answer.options())
        .await?;

    match args.answer.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&answer)?),
        _ => {
            println!("{}", answer.response);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for (i, source) in answer.sources.iter().enumerate() {
                    println!("{}. {}", i + 1, source);
                }
            }
        }
    }

    Ok(())
}

#[instrument(skip(client))]
async fn classify_command<C, E>(client: Client<C, E>, args: TicketArgs) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let classification = classify_ticket(&client, &args.ticket()).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&classification)?),
        _ => {
            let category = &classification.category;
            println!("Ticket: {}", classification.id);
            println!("Topics: {}", category.topic_tags.join(", "));
            println!("Sentiment: {:?}", category.sentiment);
            println!("Priority: {}", category.priority);
        }
    }

    Ok(())
}

fn route_command(args: RouteArgs) -> anyhow::Result<()> {
    let decision = route_ticket(&args.ticket_id, &args.topic);
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&decision)?),
        _ => println!("{}", decision.routing_message),
    }
    Ok(())
}

#[instrument(skip(client))]
async fn triage_command<C, E>(client: Client<C, E>, args: TriageArgs) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let db = open_index(&client, &args.database).await?;
    let system = SearchSystem::new(db, client);
    let ticket = Ticket::new(&args.id, &args.subject, &args.body);
    let options = AnswerOptions {
        top_k: args.top_k,
        ..AnswerOptions::default()
    };

    let outcome = triage_ticket(&system, &ticket, options).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        _ => {
            let category = &outcome.classification().category;
            println!(
                "Topics: {} | Sentiment: {:?} | Priority: {}",
                category.topic_tags.join(", "),
                category.sentiment,
                category.priority
            );
            println!();
            match &outcome {
                TriageOutcome::Answered { answer, .. } => {
                    println!("{}", answer.response);
                    if !answer.sources.is_empty() {
                        println!("\nSources:");
                        for source in &answer.sources {
                            println!("- {source}");
                        }
                    }
                }
                TriageOutcome::Routed { routing, .. } => println!("{}", routing.routing_message),
            }
        }
    }

    Ok(())
}

#[instrument(skip(client))]
async fn chat_command<C, E>(client: Client<C, E>, args: ChatArgs) -> anyhow::Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let chat = LiveChat::new(client, SessionStore::new());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Describe your issue. Type 'done' when finished.");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(input) = lines.next_line().await? else {
            // stdin closed; file whatever we have
            if chat.sessions().contains(&args.session).await {
                let ticket = chat.finish(&args.session).await?;
                print_ticket(&ticket.subject, &ticket.body);
            }
            return Ok(());
        };
        if input.trim().is_empty() {
            continue;
        }

        match chat.turn(&args.session, &input).await? {
            ChatTurn::InProgress { reply } => println!("{reply}"),
            ChatTurn::Completed { ticket } => {
                print_ticket(&ticket.subject, &ticket.body);
                return Ok(());
            }
        }
    }
}

fn print_ticket(subject: &str, body: &str) {
    println!("\nTicket created");
    println!("Subject: {subject}");
    println!("Body: {body}");
}

#[instrument]
async fn list_command(args: ListArgs) -> anyhow::Result<()> {
    let db = Database::open_existing(&args.database.to_string_lossy()).await?;
    let sources = db.list_sources().await?;
    let total = db.count_chunks().await?;

    println!(
        "Indexed sources: {} ({} chunks, {})",
        sources.len(),
        total,
        db.embedding_space()
    );

    for source in sources {
        let last_indexed = source.last_indexed.format("%Y-%m-%d %H:%M:%S");
        if args.details {
            println!("URL: {}", source.url);
            println!("Title: {}", source.title);
            println!("Chunks: {}", source.chunk_count);
            println!("Last indexed: {last_indexed}");
            println!();
        } else {
            println!(
                "{} - {} chunks (Last indexed: {last_indexed})",
                source.url, source.chunk_count
            );
        }
    }

    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}
