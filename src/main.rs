//! vitalcoach - Main CLI entry point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use vitalcoach::config::Config;
use vitalcoach::pipeline::HealthPipeline;
use vitalcoach::rag::{QdrantIndex, SimilaritySearch};
use vitalcoach::streaming::OllamaClient;
use vitalcoach::types::{MetricsRecord, SessionState};
use vitalcoach::weather::WeatherAdvisor;

/// Personalized, streamed health recommendations from local Ollama models
#[derive(Parser, Debug)]
#[command(name = "vitalcoach")]
#[command(version)]
#[command(about = "Personalized health recommendations from local Ollama models", long_about = None)]
struct Args {
    /// Folder (or single file) of medical documents to index
    #[arg(long)]
    docs: Option<PathBuf>,

    /// JSON file with a telemetry record; synthetic data when omitted
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Ollama model to use (overrides the config file)
    #[arg(short, long)]
    model: Option<String>,

    /// Latitude for the weather advisory
    #[arg(long)]
    lat: Option<f64>,

    /// Longitude for the weather advisory
    #[arg(long)]
    lon: Option<f64>,

    /// Log pipeline phase transitions
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }

    println!("{}", "vitalcoach".bold());

    let llm = Arc::new(OllamaClient::with_config(&config.llm)?);
    if !llm.health_check().await? {
        eprintln!(
            "{}",
            format!(
                "Warning: Ollama is not reachable at {} (start it with: ollama serve)",
                llm.base_url()
            )
            .yellow()
        );
    }

    let index = init_index(&llm, &config, args.docs.as_deref()).await;

    let metrics = match &args.metrics {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        }
        None => {
            println!("{}", "Using synthetic telemetry data".dimmed());
            MetricsRecord::synthetic()
        }
    };

    let advisor = Arc::new(WeatherAdvisor::new(llm.clone(), config.weather.clone())?);

    let mut session = SessionState::new(metrics);

    // Pre-pipeline weather seed; the vitals stage re-checks reactively
    let latitude = args.lat.unwrap_or(config.weather.default_latitude);
    let longitude = args.lon.unwrap_or(config.weather.default_longitude);
    session.weather_context = Some(advisor.advise(latitude, longitude).await);

    // Print streamed output as it grows; the channel carries running totals
    let (observer, mut partials) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(full) = partials.recv().await {
            let chars: Vec<char> = full.chars().collect();
            if chars.len() > printed {
                let delta: String = chars[printed..].iter().collect();
                print!("{}", delta.green());
                let _ = std::io::stdout().flush();
                printed = chars.len();
            }
        }
        printed
    });

    println!("\n{}\n", "Your recommendation:".cyan().bold());

    let pipeline = HealthPipeline::standard(
        llm.clone(),
        advisor,
        index,
        &config,
        Some(observer),
    )
    .with_verbose(args.verbose);

    pipeline.run(&mut session).await?;

    // Dropping the pipeline closes the observer channel
    drop(pipeline);
    let printed = printer.await.unwrap_or(0);

    if printed == 0 {
        // Nothing streamed (generation failed); show the placeholder entry
        if let Some(entry) = session.recommendations.last() {
            println!("{}", entry.content.red());
        }
    }

    println!("\n");
    print_summary(&session);

    Ok(())
}

/// Connect to the knowledge index, building it from `docs` when the
/// collection does not exist yet. `None` means the pipeline runs without
/// retrieval.
async fn init_index(
    llm: &Arc<OllamaClient>,
    config: &Config,
    docs: Option<&Path>,
) -> Option<Arc<dyn SimilaritySearch>> {
    let index = match QdrantIndex::connect(llm.clone(), config.rag.clone()) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("{}", format!("Knowledge index unavailable: {}", e).yellow());
            return None;
        }
    };

    match index.has_persisted_state().await {
        Ok(true) => {
            println!("{}", "Loaded existing knowledge index".dimmed());
            Some(Arc::new(index))
        }
        Ok(false) => match docs {
            Some(path) => match index.build_from_path(path).await {
                Ok(0) => {
                    eprintln!(
                        "{}",
                        format!("No documents found in {}", path.display()).yellow()
                    );
                    None
                }
                Ok(chunks) => {
                    println!("{}", format!("Indexed {} document chunks", chunks).dimmed());
                    Some(Arc::new(index))
                }
                Err(e) => {
                    eprintln!("{}", format!("Index build failed: {}", e).yellow());
                    None
                }
            },
            None => {
                println!(
                    "{}",
                    "No knowledge index (pass --docs to build one)".dimmed()
                );
                None
            }
        },
        Err(e) => {
            eprintln!(
                "{}",
                format!("Knowledge index unavailable: {}", e).yellow()
            );
            None
        }
    }
}

fn print_summary(session: &SessionState) {
    println!("{}", "Session summary".cyan().bold());

    if let Some(status) = &session.health_metrics.vitals_status {
        println!(
            "  Vitals: HR {} | Sleep {} | Activity {}",
            status.heart_rate, status.sleep, status.activity
        );
    }

    if let Some(weather) = &session.weather_context {
        println!(
            "  Weather: {} at {}°C, humidity {}%",
            weather.condition, weather.temperature, weather.humidity
        );
        if let Some(advisory) = &weather.advisory {
            println!(
                "  Advisory: {} exercise at {} intensity{}",
                advisory.exercise_recommendation,
                advisory.intensity_level,
                if advisory.weather_alert {
                    " (weather alert)"
                } else {
                    ""
                }
            );
        }
    }

    let mut notes: Vec<_> = session.stage_notes.iter().collect();
    notes.sort();
    for (stage, note) in notes {
        println!("  {} {}", format!("[{}]", stage).dimmed(), note);
    }
}
