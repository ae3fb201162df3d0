use anyhow::Result;
use api_client::auth::{login, UserCredentials};
use api_client::ApiClient;
use clap::Parser;
use colored::*;
use sse::StreamOptions;
use std::time::Duration;
use testing_tools::output::print_test_summary;
use testing_tools::probe::Probe;
use testing_tools::scenarios;

#[derive(Parser)]
#[command(name = "stream-probe")]
#[command(about = "Realtime stream integration probe")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:8080)
    #[arg(long)]
    base_url: String,

    /// Path of the realtime endpoint
    #[arg(long, default_value = "api/realtime.php")]
    realtime_path: String,

    /// Path of the CSRF token endpoint
    #[arg(long, default_value = "api/csrf_token.php")]
    csrf_path: String,

    /// Path of the login endpoint
    #[arg(long, default_value = "api/login.php")]
    login_path: String,

    /// Staff credentials (format: email:password)
    #[arg(long)]
    credentials: Option<String>,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Seconds to wait for each expected event
    #[arg(long, default_value_t = 45)]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Wait for the stream to report connected
    ConnectionTest,
    /// Wait for a server heartbeat
    HeartbeatTest,
    /// Fetch a CSRF token
    CsrfTest,
    /// Run every scenario
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let api = ApiClient::builder(&cli.base_url)
        .with_csrf_path(&cli.csrf_path)
        .build()?;

    if let Some(raw) = &cli.credentials {
        println!("{} Authenticating...", "→".blue());
        let credentials = UserCredentials::parse(raw)?;
        let user = login(&api, &cli.login_path, &credentials).await?;
        println!("{} Authenticated (ID: {})", "✓".green(), user.user_id);
    }

    let timeout = Duration::from_secs(cli.timeout_secs);
    let needs_stream = !matches!(cli.scenario, ScenarioChoice::CsrfTest);
    let mut probe = if needs_stream {
        println!("\n{} Opening the realtime stream...", "→".blue());
        let url = api.endpoint(&cli.realtime_path);
        Some(Probe::connect(
            &url,
            api.cookie_header().as_deref(),
            StreamOptions::default(),
        ))
    } else {
        None
    };

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match (&cli.scenario, probe.as_mut()) {
        (ScenarioChoice::ConnectionTest, Some(probe)) => {
            results.push(scenarios::test_connection(probe, timeout).await?);
        }
        (ScenarioChoice::HeartbeatTest, Some(probe)) => {
            results.push(scenarios::test_heartbeat(probe, timeout).await?);
        }
        (ScenarioChoice::All, Some(probe)) => {
            results.push(scenarios::test_connection(probe, timeout).await?);
            results.push(scenarios::test_heartbeat(probe, timeout).await?);
            results.push(scenarios::test_csrf(&api).await?);
        }
        _ => {
            results.push(scenarios::test_csrf(&api).await?);
        }
    }

    if let Some(probe) = probe {
        probe.close().await;
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
