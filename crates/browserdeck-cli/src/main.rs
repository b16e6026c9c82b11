//! Browserdeck CLI - submit and observe browser-automation agent tasks.

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use browserdeck_client::{ApiClient, ClientConfig};
use browserdeck_core::{ResearchRequest, RunTaskRequest, StatusPatch, TaskId};

mod watch;

/// Browserdeck - control panel for a browser-automation agent backend
#[derive(Parser)]
#[command(name = "browserdeck")]
#[command(about = "Submit browser-agent tasks and watch them live", long_about = None)]
#[command(version)]
struct Cli {
    /// Agent backend base URL
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    backend: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a browser-automation task and watch it run
    Run {
        /// Task description for the agent
        task: String,

        /// LLM provider (e.g. openai, anthropic)
        #[arg(short, long, default_value = "openai")]
        provider: String,

        /// Model name
        #[arg(short, long, default_value = "gpt-4-turbo")]
        model: String,

        /// Sampling temperature
        #[arg(long, default_value_t = 0.6)]
        temperature: f64,

        /// Run the browser headless
        #[arg(long)]
        headless: bool,

        /// Disable vision input for the agent
        #[arg(long)]
        no_vision: bool,

        /// Disable session recording
        #[arg(long)]
        no_recording: bool,

        /// Maximum number of agent steps
        #[arg(long, default_value_t = 50)]
        max_steps: u32,

        /// Attach to your own browser instead of launching one
        #[arg(long)]
        own_browser: bool,

        /// Additional context for the agent
        #[arg(long)]
        add_info: Option<String>,

        /// Submit without watching
        #[arg(long)]
        no_watch: bool,
    },

    /// Submit a deep-research job and watch it run
    Research {
        /// Research topic
        task: String,

        /// LLM provider (e.g. openai, anthropic)
        #[arg(short, long, default_value = "openai")]
        provider: String,

        /// Model name
        #[arg(short, long, default_value = "gpt-4-turbo")]
        model: String,

        /// Maximum search iterations
        #[arg(long, default_value_t = 3)]
        iterations: u32,

        /// Maximum queries per iteration
        #[arg(long, default_value_t = 1)]
        queries_per_iteration: u32,

        /// Run the browser headless
        #[arg(long)]
        headless: bool,

        /// Submit without watching
        #[arg(long)]
        no_watch: bool,
    },

    /// Watch a running task
    Watch {
        /// Task ID
        id: String,
    },

    /// Fetch the current status of a task
    Status {
        /// Task ID
        id: String,
    },

    /// Stop a running task
    Stop {
        /// Task ID
        id: String,
    },

    /// List stored recordings
    Recordings,

    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing; RUST_LOG overrides the default level.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = ClientConfig::new(cli.backend);
    let api = Arc::new(ApiClient::from_config(&config));

    match cli.command {
        Commands::Run {
            task,
            provider,
            model,
            temperature,
            headless,
            no_vision,
            no_recording,
            max_steps,
            own_browser,
            add_info,
            no_watch,
        } => {
            let mut request = RunTaskRequest::new(task, provider, model)
                .with_temperature(temperature)
                .with_headless(headless);
            request.use_vision = !no_vision;
            request.enable_recording = !no_recording;
            request.max_steps = max_steps;
            request.use_own_browser = own_browser;
            if let Some(info) = add_info {
                request = request.with_add_infos(info);
            }

            let accepted = api.run_task(&request).await?;
            println!("Task submitted: {} ({})", accepted.task_id, accepted.status);

            if !no_watch {
                watch::watch_task(config, api, accepted.task_id).await?;
            }
        }

        Commands::Research {
            task,
            provider,
            model,
            iterations,
            queries_per_iteration,
            headless,
            no_watch,
        } => {
            let mut request = ResearchRequest::new(task, provider, model)
                .with_iterations(iterations, queries_per_iteration);
            request.headless = headless;

            let accepted = api.run_research(&request).await?;
            println!("Research submitted: {} ({})", accepted.task_id, accepted.status);

            if !no_watch {
                watch::watch_task(config, api, accepted.task_id).await?;
            }
        }

        Commands::Watch { id } => {
            watch::watch_task(config, api, TaskId::new(id)).await?;
        }

        Commands::Status { id } => {
            let patch = api.task_status(&TaskId::new(id)).await?;
            print_status(&patch);
        }

        Commands::Stop { id } => {
            api.stop_task(&TaskId::new(id)).await?;
            println!("Stop requested");
        }

        Commands::Recordings => {
            let recordings = api.recordings().await?;
            println!("Recordings ({}):", recordings.len());
            println!("{:<40}  {:>12}  {:<20}  {}", "FILENAME", "SIZE", "CREATED", "URL");
            println!("{}", "-".repeat(100));
            for recording in recordings {
                println!(
                    "{:<40}  {:>12}  {:<20}  {}",
                    recording.filename, recording.size, recording.created_at, recording.url
                );
            }
        }

        Commands::Health => {
            if api.health().await? {
                println!("Backend is healthy");
            } else {
                println!("Backend responded, but reports unhealthy");
            }
        }
    }

    Ok(())
}

fn print_status(patch: &StatusPatch) {
    let status = patch
        .status
        .as_ref()
        .map(|s| s.as_str())
        .unwrap_or("unknown");
    println!("  Status:     {status}");

    if let Some(progress) = patch.progress {
        println!("  Progress:   {:.0}%", progress * 100.0);
    }
    if let Some(thoughts) = &patch.model_thoughts {
        println!("  Thoughts:   {}", last_line(thoughts));
    }
    if let Some(actions) = &patch.model_actions {
        println!("  Actions:    {}", last_line(actions));
    }
    if let Some(result) = &patch.final_result {
        println!("  Result:     {result}");
    }
    if let Some(errors) = &patch.errors {
        println!("  Errors:     {errors}");
    }
    if let Some(path) = &patch.recording_path {
        println!("  Recording:  {path}");
    }
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or("").trim()
}
