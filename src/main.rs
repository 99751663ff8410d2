use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;

mod config;
mod logger;
mod monitors;
mod notifiers;
mod runner;
mod server;
mod utils;

#[cfg(test)]
mod test_support;

use config::{validate_target, Config, TargetArgs, WatchArgs};
use monitors::fetcher::HttpFetcher;
use monitors::fragment_monitor::{compare, Comparison, FragmentMonitor};
use monitors::MissPolicy;
use notifiers::twilio::TwilioNotifier;
use runner::Runner;
use server::StatusInfo;

/// Watches one element of a web page and sends a WhatsApp/SMS alert when it changes
#[derive(Parser)]
#[command(name = "page_watch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the page until the watched element changes, then notify and exit
    Watch(WatchArgs),
    /// Fetch the page once and print the watched element
    Check(TargetArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables
    dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => watch(Config::try_from(args)?).await,
        Commands::Check(target) => check(target).await,
    }
}

async fn watch(config: Config) -> Result<()> {
    let logs = logger::init(&config.server.log_dir)?;

    let address = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding status server on {}", address))?;
    info!("Status server listening on {}", address);

    tokio::spawn(server::serve(
        listener,
        StatusInfo {
            region: config.server.region.clone(),
            url: config.target.url.clone(),
            selector: config.target.selector.clone(),
            interval_secs: config.target.interval_secs,
            logs,
        },
    ));

    let target = &config.target;
    let monitor = FragmentMonitor::new(
        HttpFetcher::new()?,
        &target.url,
        &target.selector,
        &target.baseline,
        target.miss_policy,
        target.interval_secs,
    )?;
    let notifier = TwilioNotifier::new(
        &config.twilio.account_sid,
        &config.twilio.auth_token,
        &config.twilio.sender,
    )?
    .with_base_url(&config.twilio.api_base);

    let completion = Runner::new(monitor, &notifier, config.alert.notification())
        .run()
        .await;

    info!("Monitoring finished: {}", completion);
    log::logger().flush();

    Ok(())
}

async fn check(target: TargetArgs) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    validate_target(&target)?;

    let monitor = FragmentMonitor::new(
        HttpFetcher::new()?,
        &target.url,
        &target.selector,
        &target.baseline,
        MissPolicy::default(),
        0,
    )?;

    match monitor.current_fragment().await? {
        Some(fragment) => {
            println!("{}", fragment);
            match compare(&target.baseline, &fragment) {
                Comparison::Unchanged => eprintln!("matches baseline"),
                Comparison::Changed => eprintln!("differs from baseline"),
            }
        }
        None => eprintln!("no element matches `{}`", target.selector),
    }

    Ok(())
}
