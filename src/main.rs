use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use souschef_import::export::{recipe_to_json, recipes_to_csv, write_outputs};
use souschef_import::extraction::extract_json_payload;
use souschef_import::model::RECIPE_KEYS;
use souschef_import::providers::ProviderFactory;
use souschef_import::validation::{parse_recipe, quality_issues};
use souschef_import::{AppConfig, RateLimiter, RecipeTransformer, RecipeWorkflow, WorkflowOutcome};

#[derive(Parser)]
#[command(name = "souschef-import")]
#[command(about = "Turn recipe text into SousChef recipe records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a recipe from a web page, a text file or pasted text
    Transform {
        /// Recipe page to scrape
        #[arg(long)]
        url: Option<String>,
        /// Local .txt document
        #[arg(long)]
        file: Option<PathBuf>,
        /// Recipe text
        #[arg(long)]
        text: Option<String>,
        /// LLM provider (groq, openai, ollama, anthropic)
        #[arg(long)]
        provider: Option<String>,
        /// Model name for the provider
        #[arg(long)]
        model: Option<String>,
        /// Number of repair passes before giving up
        #[arg(long)]
        max_repairs: Option<u32>,
        /// Write <name>.json and <name>.csv into this directory instead of printing
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Check an existing recipe JSON file
    Validate {
        file: PathBuf,
        /// Apply deterministic repairs and print the fixed recipe
        #[arg(long)]
        repair: bool,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// List supported LLM providers
    Providers,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform {
            url,
            file,
            text,
            provider,
            model,
            max_repairs,
            output_dir,
            format,
        } => {
            let config = match AppConfig::load() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let limiter = Arc::new(RateLimiter::from_config(&config.retry));
            let mut builder = RecipeTransformer::builder()
                .rate_limiter(limiter)
                .config(config);
            builder = match (url, file, text) {
                (Some(url), None, None) => builder.url(url),
                (None, Some(file), None) => builder.file(file),
                (None, None, Some(text)) => builder.text(text),
                _ => {
                    eprintln!("Error: specify exactly one of --url, --file or --text");
                    return ExitCode::FAILURE;
                }
            };
            if let Some(provider) = provider {
                builder = builder.provider(provider);
            }
            if let Some(model) = model {
                builder = builder.model(model);
            }
            if let Some(max) = max_repairs {
                builder = builder.max_repair_iterations(max);
            }
            match builder.build().await {
                Ok(outcome) => report(&outcome, output_dir.as_deref(), format),
                Err(e) => Err(e.into()),
            }
        }
        Commands::Validate {
            file,
            repair,
            format,
        } => validate(&file, repair, format).await,
        Commands::Providers => {
            for name in ProviderFactory::available_providers() {
                println!(
                    "{:<10} {}",
                    name,
                    ProviderFactory::default_model(name).unwrap_or_default()
                );
            }
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print or write the recipe of a successful run; print the failure otherwise.
fn report(
    outcome: &WorkflowOutcome,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<bool, Box<dyn Error>> {
    let recipe = match &outcome.recipe {
        Some(recipe) if outcome.is_success() => recipe,
        _ => {
            eprintln!("Status: {}", outcome.status);
            if let Some(message) = &outcome.error_message {
                eprintln!("Error: {}", message);
            }
            for line in outcome
                .validation_errors
                .iter()
                .chain(&outcome.quality_issues)
            {
                eprintln!("  - {}", line);
            }
            return Ok(false);
        }
    };

    if let Some(dir) = output_dir {
        let (json_path, csv_path) = write_outputs(recipe, dir)?;
        println!("{}", json_path.display());
        println!("{}", csv_path.display());
        return Ok(true);
    }
    match format {
        OutputFormat::Json => println!("{}", recipe_to_json(recipe)?),
        OutputFormat::Csv => print!("{}", recipes_to_csv(std::slice::from_ref(recipe))),
    }
    Ok(true)
}

async fn validate(file: &Path, repair: bool, format: OutputFormat) -> Result<bool, Box<dyn Error>> {
    let text = tokio::fs::read_to_string(file).await?;
    let payload = extract_json_payload(&text, &RECIPE_KEYS)?;

    if repair {
        let config = AppConfig::load()?;
        let outcome = RecipeWorkflow::new(None, &config)
            .run_from_payload(payload)
            .await;
        return report(&outcome, None, format);
    }

    let recipe = match parse_recipe(&payload) {
        Ok(recipe) => recipe,
        Err(e) => {
            eprintln!("Status: schema_failed");
            eprintln!("Error: {}", e);
            return Ok(false);
        }
    };
    let issues = quality_issues(&recipe);
    if issues.is_empty() {
        println!(
            "OK: {} step(s), {} variant(s)",
            recipe.steps_part_1.len(),
            recipe.recipe_variant_content.len()
        );
        return Ok(true);
    }
    for issue in &issues {
        println!("- {}", issue);
    }
    Ok(false)
}
