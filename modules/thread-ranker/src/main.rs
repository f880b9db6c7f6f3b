use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ai_client::Claude;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use thread_ranker::{
    render_markdown, CommentTreeScraper, Config, DelayStrategy, GoogleSearcher,
    HttpThreadExtractor, Pipeline, RandomDelay, RelevanceClassifier, RunOutcome, RunRequest,
    Runner, WebDriverLauncher, TOKEN_LIMIT,
};

#[derive(Parser)]
#[command(
    name = "thread-ranker",
    about = "Rank what Reddit threads recommend for a search query"
)]
struct Cli {
    /// Google search query used to find threads
    #[arg(long)]
    search_query: Option<String>,

    /// Thread URLs to consider after the search results
    #[arg(long, num_args = 1..)]
    url_list: Vec<String>,

    /// How many search results to request
    #[arg(long, default_value_t = 10)]
    num_links_from_search: usize,

    /// Send a saved prompt file instead of running the pipeline
    #[arg(long)]
    cache_prompt: Option<PathBuf>,

    /// Directory for the generated prompt file (overrides PROMPT_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Leave replies out of the report
    #[arg(long)]
    no_replies: bool,

    /// Claude model (overrides CLAUDE_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Extra attempts for rate-limited relevance checks
    #[arg(long, default_value_t = 0)]
    classifier_retries: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("thread_ranker=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = cli.model.clone() {
        config.model = model;
    }
    if let Some(dir) = cli.output_dir.clone() {
        config.output_dir = dir;
    }
    config.log_redacted();

    let claude = Claude::new(config.anthropic_api_key.clone(), config.model.clone());
    let runner = Runner::new(&claude, &claude, config.output_dir.clone());

    let outcome = if let Some(path) = cli.cache_prompt.clone() {
        runner
            .run(RunRequest::Cached(path.clone()))
            .await
            .with_context(|| format!("Failed to run with cached prompt {}", path.display()))?
    } else {
        let searcher = match cli.search_query.as_deref() {
            Some(_) => {
                let (key, cse_id) = config.search_credentials()?;
                Some(GoogleSearcher::new(key, cse_id)?)
            }
            None => None,
        };
        let extractor = HttpThreadExtractor::new()?;
        let launcher = Arc::new(WebDriverLauncher::new(&config.webdriver_url, cli.headless)?);
        let delay: Arc<dyn DelayStrategy> = Arc::new(RandomDelay);
        let scraper = CommentTreeScraper::new(launcher, Arc::clone(&delay));
        let classifier = RelevanceClassifier::new(&claude)
            .with_retries(cli.classifier_retries, Duration::from_secs(2));

        let mut pipeline = Pipeline::new(&extractor, classifier, &scraper)
            .with_delay(delay)
            .include_replies(!cli.no_replies);
        if let Some(searcher) = &searcher {
            pipeline = pipeline.with_searcher(searcher);
        }

        runner
            .run(RunRequest::Pipeline {
                pipeline: &pipeline,
                query: cli.search_query.clone(),
                extra_urls: cli.url_list.clone(),
                desired_search_count: cli.num_links_from_search,
            })
            .await
            .context("Pipeline run failed")?
    };

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!("{}", outcome.prompt);
    if let Some(path) = &outcome.prompt_path {
        println!("Prompt saved to {}", path.display());
    }
    match outcome.token_count {
        Some(count) if outcome.over_limit => {
            println!("Token count: {count} (OVER LIMIT of {TOKEN_LIMIT})")
        }
        Some(count) => println!("Token count: {count}"),
        None => println!("Token count: unavailable"),
    }
    println!();
    let styled = std::io::stdout().is_terminal();
    println!("{}", render_markdown(&outcome.response, styled));
}
