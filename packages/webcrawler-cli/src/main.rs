use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webcrawler_api::{
    ClientConfig, CrawlRequest, Job, ScrapeRequest, ScrapeType, WebCrawlerClient,
};

#[derive(Parser)]
#[command(name = "webcrawler", about = "WebCrawler API command line client")]
struct Cli {
    /// Override WEBCRAWLERAPI_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override WEBCRAWLERAPI_MAX_POLLS for blocking commands
    #[arg(long, global = true)]
    max_polls: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a crawl and wait until it finishes
    Crawl(CrawlArgs),
    /// Start a crawl and print the job id without waiting
    Start(CrawlArgs),
    /// Show a job snapshot
    Job { job_id: String },
    /// Cancel a job
    Cancel { job_id: String },
    /// Print the stored content of every item in a job
    Content {
        job_id: String,
        #[arg(long, default_value = "markdown")]
        scrape_type: ScrapeType,
    },
    /// Run a custom scraper and wait for its structured data
    Scrape(ScrapeArgs),
    /// Show a scraper run snapshot
    ScrapeStatus { scrape_id: String },
}

#[derive(Args)]
struct CrawlArgs {
    url: String,
    #[arg(long, default_value = "html")]
    scrape_type: ScrapeType,
    #[arg(long, default_value_t = 10)]
    items_limit: u32,
    #[arg(long)]
    allow_subdomains: bool,
    #[arg(long)]
    webhook_url: Option<String>,
    #[arg(long)]
    whitelist_regexp: Option<String>,
    #[arg(long)]
    blacklist_regexp: Option<String>,
}

impl CrawlArgs {
    fn into_request(self) -> CrawlRequest {
        let mut request = CrawlRequest::new(self.url)
            .scrape_type(self.scrape_type)
            .items_limit(self.items_limit)
            .allow_subdomains(self.allow_subdomains);
        request.webhook_url = self.webhook_url;
        request.whitelist_regexp = self.whitelist_regexp;
        request.blacklist_regexp = self.blacklist_regexp;
        request
    }
}

#[derive(Args)]
struct ScrapeArgs {
    crawler_id: String,
    /// Scraper input as a JSON object
    #[arg(long, default_value = "{}")]
    input: String,
    #[arg(long)]
    webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,webcrawler_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("WEBCRAWLERAPI_API_KEY must be set")?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(max_polls) = cli.max_polls {
        config = config.with_max_polls(max_polls);
    }
    let client = WebCrawlerClient::from_config(config)?;

    match cli.command {
        Command::Crawl(args) => {
            print_json(&client.crawl(&args.into_request()).await?)?;
        }
        Command::Start(args) => {
            let started = client.start_crawl(&args.into_request()).await?;
            println!("{}", started.id);
        }
        Command::Job { job_id } => print_json(&client.get_job(&job_id).await?)?,
        Command::Cancel { job_id } => {
            let response = client.cancel_job(&job_id).await?;
            println!("{}", response.message.as_deref().unwrap_or("cancellation requested"));
        }
        Command::Content { job_id, scrape_type } => {
            let job: Job = client.get_job(&job_id).await?;
            for item in &job.job_items {
                match client.get_item_content(item, scrape_type).await? {
                    Some(content) => println!("==> {}\n{}\n", item.original_url, content),
                    None => println!("==> {} (no {} content)\n", item.original_url, scrape_type),
                }
            }
        }
        Command::Scrape(args) => {
            let input: Value =
                serde_json::from_str(&args.input).context("--input must be valid JSON")?;
            let mut request = ScrapeRequest::new(args.crawler_id, input);
            request.webhook_url = args.webhook_url;
            print_json(&client.scrape(&request).await?)?;
        }
        Command::ScrapeStatus { scrape_id } => print_json(&client.get_scrape(&scrape_id).await?)?,
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
