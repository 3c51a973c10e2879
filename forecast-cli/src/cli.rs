use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use forecast_core::{City, Config, Dataset, ModelBundle, source::source_for};
use inquire::{Select, Text};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "7-day weather forecast for German cities")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the locations stored in the config file.
#[derive(Debug, Args, Default)]
pub struct Locations {
    /// Historical CSV: a file path or an http(s) URL.
    #[arg(long)]
    pub data: Option<String>,

    /// Model artifact path.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Feature-order artifact path.
    #[arg(long)]
    pub features: Option<PathBuf>,
}

impl Locations {
    fn apply(self, cfg: &mut Config) {
        if let Some(data) = self.data {
            cfg.data_location = data;
        }
        if let Some(model) = self.model {
            cfg.model_path = model;
        }
        if let Some(features) = self.features {
            cfg.features_path = features;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train the model on historical data and save both artifacts.
    Train {
        #[command(flatten)]
        locations: Locations,
    },

    /// Show the 7-day forecast for a city.
    Show {
        /// City name; falls back to the configured default, then to a prompt.
        city: Option<String>,

        #[command(flatten)]
        locations: Locations,

        /// Print the forecast rows as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the cities present in the historical data.
    Cities {
        /// Historical CSV: a file path or an http(s) URL.
        #[arg(long)]
        data: Option<String>,
    },

    /// Interactively set data location, artifact paths and default city.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut cfg = Config::load()?;

        match self.command {
            Command::Train { locations } => {
                locations.apply(&mut cfg);
                train(&cfg).await
            }
            Command::Show { city, locations, json } => {
                locations.apply(&mut cfg);
                show(&cfg, city, json).await
            }
            Command::Cities { data } => {
                Locations { data, ..Locations::default() }.apply(&mut cfg);
                let dataset = load_dataset(&cfg).await?;
                for city in dataset.cities() {
                    println!("{city}");
                }
                Ok(())
            }
            Command::Configure => configure(cfg),
        }
    }
}

async fn load_dataset(cfg: &Config) -> Result<Dataset> {
    source_for(&cfg.data_location)?.load().await
}

async fn train(cfg: &Config) -> Result<()> {
    let dataset = load_dataset(cfg).await?;
    let outcome = forecast_core::train(&dataset, &cfg.training).context("Training failed")?;

    ModelBundle::new(outcome.model, outcome.schema)?
        .save(&cfg.model_path, &cfg.features_path)
        .context("Failed to save model artifacts")?;

    print!("{}", render::report_text(&outcome.report, &cfg.model_path, &cfg.features_path));
    Ok(())
}

async fn show(cfg: &Config, city: Option<String>, json: bool) -> Result<()> {
    let bundle = ModelBundle::load(&cfg.model_path, &cfg.features_path).with_context(|| {
        format!(
            "Failed to load model artifacts ({}, {}).\n\
             Hint: run `forecast train` first.",
            cfg.model_path.display(),
            cfg.features_path.display()
        )
    })?;
    let dataset = load_dataset(cfg).await?;

    let city = match city {
        Some(name) => name,
        None => match cfg.default_city()? {
            Some(city) => city.to_string(),
            None => Select::new("Select city", dataset.cities())
                .prompt()
                .context("City selection cancelled")?,
        },
    };

    tracing::debug!(%city, "resolved city");
    let rows = forecast_core::forecast(&city, &dataset, &bundle.model, &bundle.schema)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let today = chrono::Local::now().date_naive();
        let name = forecast_core::city::canonical_name(&city);
        print!("{}", render::forecast_text(&name, &rows, today));
    }
    Ok(())
}

fn configure(mut cfg: Config) -> Result<()> {
    let data = Text::new("Weather data (path or URL):")
        .with_default(&cfg.data_location)
        .prompt()?;
    cfg.data_location = data;

    let model = cfg.model_path.display().to_string();
    cfg.model_path = Text::new("Model artifact path:").with_default(&model).prompt()?.into();

    let features = cfg.features_path.display().to_string();
    cfg.features_path = Text::new("Feature-order artifact path:")
        .with_default(&features)
        .prompt()?
        .into();

    const NO_DEFAULT: &str = "(ask every time)";
    let options: Vec<&str> = std::iter::once(NO_DEFAULT)
        .chain(City::all().iter().map(City::as_str))
        .collect();
    let choice = Select::new("Default city:", options).prompt()?;
    match City::from_name(choice) {
        Some(city) => cfg.set_default_city(city),
        None => cfg.default_city = None,
    }

    cfg.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}
