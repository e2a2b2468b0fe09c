// ABOUTME: Command-line entry point for uploading X-rays and tracking analysis
// ABOUTME: Wires the HTTP client, progress poller, theme store, and terminal display

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use xray_progress::display::ProgressDisplay;
use xray_progress::progress::{self, BrowserNavigator, PollOutcome, PollerConfig, ProgressPoller};
use xray_progress::remote::{
    InterpretRequest, InterpretationMethod, ModelType, RemoteClient, ResultsView, UploadForm,
};
use xray_progress::theme::{self, Theme, ThemePreference, ThemeStore};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "xray-progress")]
#[command(about = "Upload X-ray images for analysis and follow processing progress", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, env = "XRAY_SERVER_URL", default_value = DEFAULT_SERVER_URL, global = true)]
    server: String,

    /// Print the results URL instead of opening it in a browser
    #[arg(long, global = true)]
    no_open: bool,

    /// Theme for this run, overriding the stored preference
    #[arg(long, value_enum, global = true)]
    theme: Option<ThemePreference>,

    /// Milliseconds between progress checks
    #[arg(long, default_value_t = 500, global = true)]
    interval_ms: u64,

    /// Milliseconds before retrying a failed progress check
    #[arg(long, default_value_t = 1000, global = true)]
    error_interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and wait for the analysis result
    Submit(SubmitArgs),
    /// Follow an existing upload until it completes
    Watch {
        /// Upload id returned by a previous submission
        upload_id: String,
    },
    /// Show the current progress of an upload once
    Status {
        /// Upload id returned by a previous submission
        upload_id: String,
    },
    /// Re-run interpretability visualizations for an analyzed image
    Interpret {
        /// Id of the analyzed image
        xray_id: String,
        #[arg(long, value_enum, default_value_t = InterpretationMethod::Gradcam)]
        method: InterpretationMethod,
        #[arg(long, value_enum, default_value_t = ModelType::Densenet)]
        model_type: ModelType,
        /// Pathology to explain; defaults to the highest scoring one
        #[arg(long)]
        target_class: Option<String>,
    },
    /// Show or change the light/dark theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Args, Clone)]
struct SubmitArgs {
    /// X-ray image to upload
    image: PathBuf,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    patient_id: Option<String>,
    #[arg(long)]
    gender: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    date_of_birth: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    date_of_xray: Option<String>,
    #[arg(long)]
    additional_info: Option<String>,
    #[arg(long, value_enum, default_value_t = ModelType::Densenet)]
    model_type: ModelType,
}

impl From<SubmitArgs> for UploadForm {
    fn from(args: SubmitArgs) -> Self {
        UploadForm {
            image: args.image,
            first_name: args.first_name,
            last_name: args.last_name,
            patient_id: args.patient_id,
            gender: args.gender,
            date_of_birth: args.date_of_birth,
            date_of_xray: args.date_of_xray,
            additional_info: args.additional_info,
            model_type: args.model_type,
        }
    }
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Print the theme that would be used
    Show,
    /// Switch between light and dark and remember the choice
    Toggle,
    /// Store a preference; prompts when no value is given
    Set {
        #[arg(value_enum)]
        value: Option<ThemePreference>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xray_progress=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Theme { action } => run_theme(action, cli.theme),
        Commands::Status { upload_id } => {
            let client = RemoteClient::new(cli.server.clone())?;
            let report = client.get_progress(upload_id).await?;
            println!(
                "upload {}: {}% ({})",
                upload_id,
                report.progress,
                report.status.as_deref().unwrap_or("unknown")
            );
            if report.progress >= 100 {
                if let Some(xray_id) = report.xray_id.as_deref() {
                    println!("{}", client.results_url(ResultsView::Xray, xray_id));
                }
            }
            Ok(())
        }
        Commands::Watch { upload_id } => {
            let client = Arc::new(RemoteClient::new(cli.server.clone())?);
            track(&cli, client, upload_id.clone(), ResultsView::Xray).await
        }
        Commands::Interpret {
            xray_id,
            method,
            model_type,
            target_class,
        } => {
            let client = Arc::new(RemoteClient::new(cli.server.clone())?);
            let request = InterpretRequest {
                method: *method,
                model_type: *model_type,
                target_class: target_class.clone(),
            };
            client.generate_interpretability(xray_id, &request).await?;
            tracing::info!(xray_id = %xray_id, method = method.as_str(), "Interpretability run started");
            track(&cli, client, xray_id.clone(), ResultsView::Interpretability).await
        }
        Commands::Submit(args) => {
            let client = Arc::new(RemoteClient::new(cli.server.clone())?);
            let form = UploadForm::from(args.clone());
            // No polling starts unless the server handed back an upload id.
            let upload_id = progress::submit(&client, &form).await?;
            println!("Upload id: {}", upload_id);
            track(&cli, client, upload_id, ResultsView::Xray).await
        }
    }
}

/// Poll `upload_id` with a progress bar, then open the results page.
async fn track(
    cli: &Cli,
    client: Arc<RemoteClient>,
    upload_id: String,
    view: ResultsView,
) -> Result<()> {
    let theme = resolve_theme(cli.theme);
    let display = ProgressDisplay::new(theme)?;

    let config = PollerConfig {
        interval: Duration::from_millis(cli.interval_ms),
        error_interval: Duration::from_millis(cli.error_interval_ms),
        ..PollerConfig::default()
    };
    let poller = ProgressPoller::new(Arc::clone(&client), config).with_view(view);

    let mut handle = poller.spawn(upload_id.clone());
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    while let Some(update) = handle.next_update().await {
        display.apply(&update);
    }

    let outcome = handle.finish().await?;
    match &outcome {
        PollOutcome::Complete { .. } => {}
        PollOutcome::MissingResultId => display.abandon("No result returned"),
        PollOutcome::Cancelled { percent } => {
            display.abandon("Cancelled");
            display.println(format!(
                "Stopped watching upload {} at {}%. Resume with: xray-progress watch {}",
                upload_id, percent, upload_id
            ));
        }
    }

    let mut navigator = BrowserNavigator::new(!cli.no_open);
    progress::conclude(&outcome, client.base_url(), &upload_id, &mut navigator)?;
    Ok(())
}

/// Resolved theme for progress output; an unreadable settings file falls back to the system scheme.
fn resolve_theme(explicit: Option<ThemePreference>) -> Theme {
    let stored = ThemeStore::default_location()
        .and_then(|store| store.load())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{:#}", e), "Ignoring stored theme preference");
            None
        });
    theme::resolve(explicit, stored, Theme::system())
}

fn run_theme(action: &ThemeAction, explicit: Option<ThemePreference>) -> Result<()> {
    let store = ThemeStore::default_location()?;

    match action {
        ThemeAction::Show => {
            let stored = store.load()?;
            let resolved = theme::resolve(explicit, stored, Theme::system());
            println!(
                "{} (stored: {}, settings: {})",
                resolved.as_str(),
                stored.map(|p| p.as_str()).unwrap_or("none"),
                store.path().display()
            );
        }
        ThemeAction::Toggle => {
            let next = store.toggle(explicit, Theme::system())?;
            println!("{}", next.as_str());
        }
        ThemeAction::Set { value } => {
            let preference = match value {
                Some(value) => *value,
                None => prompt_preference(store.load()?.unwrap_or_default())?,
            };
            store
                .save(preference)
                .context("Failed to store theme preference")?;
            println!("{}", preference.as_str());
        }
    }

    Ok(())
}

fn prompt_preference(current: ThemePreference) -> Result<ThemePreference> {
    let labels: Vec<&str> = ThemePreference::ALL.iter().map(|p| p.as_str()).collect();
    let default = ThemePreference::ALL
        .iter()
        .position(|p| *p == current)
        .unwrap_or(0);

    let selection = dialoguer::Select::new()
        .with_prompt("Theme")
        .items(&labels)
        .default(default)
        .interact()
        .context("Failed to read theme selection")?;

    Ok(ThemePreference::ALL[selection])
}
