use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sectionseek_core::{load_config, RetrievalPipeline, SearchOutcome};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sectionseek", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file; built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted artifact bundle.
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk a PDF by section headings and build the hybrid index.
    Build {
        /// Source PDF; the configured path is used when omitted.
        #[arg(long)]
        pdf: Option<PathBuf>,
        /// Build in memory only, without writing the artifact bundle.
        #[arg(long, default_value_t = false)]
        no_persist: bool,
    },
    /// Run a hybrid query against the persisted index.
    Search {
        /// Query text.
        #[arg(long)]
        query: String,
        /// Keyword filter; repeat the flag, all keywords must match.
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Number of hits to return.
        #[arg(long)]
        top_k: Option<usize>,
        /// Nearest-neighbor pool fetched before keyword filtering.
        #[arg(long)]
        pool_k: Option<usize>,
    },
    /// Print one chunk by its id.
    Chunk {
        chunk_id: String,
    },
    /// Print extractive context excerpts for a question.
    Context {
        /// Question text.
        #[arg(long)]
        question: String,
        /// Number of context excerpts.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(index_dir) = cli.index_dir {
        config.index_dir = index_dir;
    }

    let mut pipeline = RetrievalPipeline::with_defaults(config)?;

    match cli.command {
        Command::Build { pdf, no_persist } => {
            let report = pipeline.build(pdf.as_deref(), !no_persist)?;

            info!(
                source = %report.source_file,
                chunks = report.chunk_count,
                keywords = report.keyword_count,
                "index built"
            );
            println!(
                "{} chunks, {} keywords from {} at {}",
                report.chunk_count,
                report.keyword_count,
                report.source_file,
                report.built_at.to_rfc3339()
            );
            println!(
                "pages: {} total, {} empty, {} failed; headings: {} rejected, {} fragments dropped, {} pages merged",
                report.stats.total_pages,
                report.stats.empty_pages,
                report.stats.failed_pages,
                report.stats.rejected_titles,
                report.stats.dropped_fragments,
                report.stats.merged_pages
            );
            if report.persisted {
                println!("artifacts written to {}", pipeline.config().index_dir.display());
            }
        }
        Command::Search {
            query,
            keywords,
            top_k,
            pool_k,
        } => {
            pipeline.load().context("loading artifact bundle")?;

            match pipeline.search(&query, &keywords, top_k, pool_k)? {
                SearchOutcome::EmptyFilter { keywords } => {
                    println!("no chunks contain all keywords: {}", keywords.join(", "));
                }
                SearchOutcome::Ranked(hits) => {
                    if hits.is_empty() {
                        println!("no results");
                    }
                    for hit in hits {
                        println!(
                            "[{:.4}] {} (pages {}-{}) chunk={}",
                            hit.score,
                            hit.chunk.section_title,
                            hit.chunk.page_start,
                            hit.chunk.page_end,
                            hit.chunk.chunk_id
                        );
                        if !hit.chunk.keywords.is_empty() {
                            println!("  keywords: {}", hit.chunk.keywords.join(", "));
                        }
                    }
                }
            }
        }
        Command::Chunk { chunk_id } => {
            pipeline.load().context("loading artifact bundle")?;

            match pipeline.get_chunk(&chunk_id)? {
                Some(chunk) => {
                    println!(
                        "{} (pages {}-{}) source={}",
                        chunk.section_title, chunk.page_start, chunk.page_end, chunk.source_file
                    );
                    if !chunk.keywords.is_empty() {
                        println!("keywords: {}", chunk.keywords.join(", "));
                    }
                    println!("{}", chunk.text);
                }
                None => println!("chunk not found: {chunk_id}"),
            }
        }
        Command::Context { question, top_k } => {
            pipeline.load().context("loading artifact bundle")?;

            let answer = pipeline.answer_context(&question, top_k)?;
            println!("question: {}", answer.question);
            for context in answer.contexts {
                println!(
                    "[{:.4}] {} (pages {}-{}) chunk={}",
                    context.score,
                    context.section_title,
                    context.page_start,
                    context.page_end,
                    context.chunk_id
                );
                println!("  {}", context.excerpt.replace('\n', "\n  "));
            }
        }
    }

    Ok(())
}
