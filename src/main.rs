mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_sentence_search::config::{Config, EmbedderKind};
use pdf_sentence_search::logging::init_cli_logger;

#[derive(Parser)]
#[command(name = "pss")]
#[command(about = "Scrape sentences from PDFs and search them by meaning", long_about = None)]
#[command(version)]
struct Cli {
    /// Corpus directory (default: $PSS_CORPUS_DIR or current directory)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Embedding backend: htp or onnx (default: $PSS_EMBEDDER or htp)
    #[arg(long, global = true)]
    embedder: Option<EmbedderKind>,

    /// Directory with model.onnx and tokenizer.json
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index data directory
    Init,

    /// Build or update the sentence index
    Index {
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "Force rebuild index")]
        rebuild: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Find sentences semantically similar to a query
    #[command(alias = "ss")]
    Search {
        query: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "Drop hits scoring below this cosine similarity")]
        min_score: Option<f32>,
        #[arg(long, help = "Only search one document (id as shown by `pss list`)")]
        doc: Option<String>,
        #[arg(long, short, default_value = "0", help = "Neighbouring sentences to show")]
        context: usize,
        #[arg(long, help = "JSON output")]
        json: bool,
        #[arg(long, help = "Use keyword matching (no embeddings)")]
        fallback: bool,
    },

    /// Keyword search over indexed sentences (no embeddings needed)
    Grep {
        query: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Find sentences similar to an indexed sentence
    Similar {
        doc: String,
        position: usize,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Print the sentences scraped from one file
    Extract {
        file: PathBuf,
        #[arg(long, help = "Print the cleaned text instead of sentences")]
        raw: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// List indexed documents
    List {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Corpus and index status
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Start MCP server for AI assistant integration
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show client configuration instructions")]
        install: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    let mut config = Config::load()?;
    if let Some(corpus) = cli.corpus {
        config.corpus_dir = corpus;
    }
    if let Some(embedder) = cli.embedder {
        config.embedder = embedder;
    }
    if let Some(model_dir) = cli.model_dir {
        config.model_dir = Some(model_dir);
    }

    match cli.command {
        Commands::Init => commands::init::run(&config),
        Commands::Index {
            status,
            rebuild,
            json,
        } => commands::index::run(&config, status, rebuild, json),
        Commands::Search {
            query,
            limit,
            min_score,
            doc,
            context,
            json,
            fallback,
        } => commands::semantic_search::run(
            &config,
            &query,
            commands::semantic_search::Flags {
                limit,
                min_score,
                doc,
                context,
                json,
                fallback,
            },
        ),
        Commands::Grep { query, limit, json } => commands::search::run(&config, &query, limit, json),
        Commands::Similar {
            doc,
            position,
            limit,
            json,
        } => commands::similar::run(&config, &doc, position, limit, json),
        Commands::Extract { file, raw, json } => commands::extract::run(&config, &file, raw, json),
        Commands::List { json } => commands::list::run(&config, json),
        Commands::Status { json } => commands::status::run(&config, json),

        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            if install {
                print_mcp_install_instructions(&config);
                Ok(())
            } else {
                run_mcp_server(config)
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(pdf_sentence_search::mcp::run_mcp_server(config))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(config: &Config) {
    use colored::Colorize;

    let corpus_path = std::fs::canonicalize(&config.corpus_dir)
        .unwrap_or_else(|_| config.corpus_dir.clone())
        .to_string_lossy()
        .to_string();

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "pss".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(
        r#"{{
  "mcpServers": {{
    "pdf-search": {{
      "command": "{}",
      "args": ["mcp", "--corpus", "{}"]
    }}
  }}
}}"#,
        binary_path, corpus_path
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Semantic sentence search", "corpus_search".green());
    println!("  • {} - Sentences similar to an indexed sentence", "corpus_similar".green());
    println!("  • {} - List indexed documents", "corpus_list_documents".green());
    println!("  • {} - Sentences of one document", "corpus_get_document".green());
    println!("  • {} - Index statistics", "corpus_status".green());
}
