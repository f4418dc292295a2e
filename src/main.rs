use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use skyboard_core::{CommitMode, Config};
use skyboard_dashboard::{Dashboard, ResolutionState, UserHistory, ViewState};
use skyboard_weather::{CurrentConditions, DayForecast, ExportFilters, ExportFormat};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Skyboard: weather dashboard for the terminal
///
/// Looks up current conditions and daily forecasts by place name, saves
/// readings to the weather service and exports stored data.
///
/// Examples:
///   skyboard current Berlin
///   skyboard forecast Oslo --days 3
///   skyboard save Berlin --user alice
///   skyboard export csv --location Berlin --start 2024-05-01
///   skyboard watch
#[derive(Parser)]
#[command(name = "skyboard", version, about, long_about = None)]
struct Cli {
    /// Weather API base URL (overrides config and SKYBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current conditions for a location
    Current {
        /// Place name; defaults to the configured location
        location: Option<String>,
    },

    /// Show the daily forecast for a location
    Forecast {
        location: Option<String>,

        /// Number of days, starting today
        #[arg(long, short = 'd')]
        days: Option<u32>,
    },

    /// Resolve a place name to coordinates and a map link
    Resolve { location: String },

    /// Interactive dashboard: each stdin line updates the location input
    Watch {
        /// Commit only on Enter instead of after a quiet period
        #[arg(long)]
        submit: bool,
    },

    /// Fetch current conditions and save them as a reading
    Save {
        location: Option<String>,

        /// User to attribute the reading to; a session token when omitted
        #[arg(long, short = 'u')]
        user: Option<String>,
    },

    /// List saved readings for a user
    History {
        #[arg(long, short = 'u')]
        user: Option<String>,
    },

    /// Delete a saved reading
    Delete { id: i64 },

    /// Download an export from the weather service
    Export {
        /// json, csv, xml, locations or weather
        #[arg(value_parser = parse_format)]
        format: ExportFormat,

        #[arg(long)]
        location: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Directory to write the file into
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,
    },

    /// Print a user name, or generate a random one
    User {
        #[arg(long)]
        random: bool,
    },

    /// Show the configuration file location and validation results
    Config,
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    skyboard_core::init(if cli.verbose { "debug" } else { "info" })?;

    let (mut config, validation) = Config::load_validated_with(|config| {
        if let Some(url) = &cli.api_url {
            config.api.base_url = url.clone();
        }
    })?;

    if let Command::Config = cli.command {
        return show_config(&config, &validation);
    }

    let mut dashboard = Dashboard::from_config(&config)?;
    tracing::debug!("Using weather API at {}", dashboard.client().base_url());

    match cli.command {
        Command::Current { location } => {
            let name = location.unwrap_or_else(|| config.dashboard.default_location.clone());
            match dashboard.current.set_location(&name).await {
                ViewState::Ready(conditions) => print_current(&name, &conditions),
                ViewState::Failed(message) => bail!(message),
                _ => bail!("No location given"),
            }
        }
        Command::Forecast { location, days } => {
            let name = location.unwrap_or_else(|| config.dashboard.default_location.clone());
            if let Some(days) = days {
                config.dashboard.forecast_days = days;
                dashboard = Dashboard::from_config(&config)?;
            }
            match dashboard.forecast.set_location(&name).await {
                ViewState::Ready(rows) => print_forecast(&name, &rows),
                ViewState::Failed(message) => bail!(message),
                _ => bail!("No location given"),
            }
        }
        Command::Resolve { location } => {
            let state = dashboard.resolver.resolve_now(location).await;
            print_resolution(&state);
            if let Some(error) = state.error() {
                bail!(error.to_string());
            }
        }
        Command::Watch { submit } => {
            if submit {
                config.dashboard.commit_mode = CommitMode::Submit;
                dashboard = Dashboard::from_config(&config)?;
            }
            watch(dashboard, &config.dashboard.default_location).await?;
        }
        Command::Save { location, user } => {
            if let Some(user) = user {
                dashboard.identity.set(user);
            }
            let name = location.unwrap_or_else(|| config.dashboard.default_location.clone());
            if let ViewState::Failed(message) = dashboard.current.set_location(&name).await {
                bail!(message);
            }
            let user = dashboard.identity.effective().to_string();
            if dashboard.current.save(&user).await? {
                println!("Saved reading for {} as {}", name, user);
            } else {
                bail!("Nothing to save for '{}'", name);
            }
        }
        Command::History { user } => {
            if let Some(user) = user {
                dashboard.identity.set(user);
            }
            let mut history = dashboard.history();
            let user = dashboard.identity.effective().to_string();
            let loaded = history.load(&user).await.map(|records| records.len());
            if let Err(e) = loaded {
                bail!(history.error().map(str::to_string).unwrap_or_else(|| e.to_string()));
            }
            history.resolve_location_names().await;
            print_history(&history);
        }
        Command::Delete { id } => {
            let mut history = dashboard.history();
            if let Err(e) = history.delete(id).await {
                bail!(history.error().map(str::to_string).unwrap_or_else(|| e.to_string()));
            }
            println!("Deleted reading {}", id);
        }
        Command::Export {
            format,
            location,
            start,
            end,
            output,
        } => {
            let filters = ExportFilters {
                location: location.unwrap_or_default(),
                start_date: start.unwrap_or_default(),
                end_date: end.unwrap_or_default(),
            };
            if !format.accepts_filters() && !filters.is_empty() {
                tracing::warn!("The {} export ignores location and date filters", format);
            }
            let path = dashboard
                .exporter
                .export_to_dir(format, &filters, &output)
                .await
                .with_context(|| format!("Export {} failed", format))?;
            println!("Wrote {}", path.display());
        }
        Command::User { random } => {
            if random {
                println!("{}", dashboard.identity.randomize());
            } else {
                println!("{}", dashboard.identity.effective());
            }
        }
        Command::Config => {}
    }

    Ok(())
}

fn show_config(config: &Config, validation: &skyboard_core::ValidationResult) -> Result<()> {
    println!("Config file: {}", Config::config_path()?.display());
    println!("API URL:     {}", config.api.base_url);
    println!("Location:    {}", config.dashboard.default_location);
    println!("Commit mode: {:?}", config.dashboard.commit_mode);
    println!("Forecast:    {} days", config.dashboard.forecast_days);
    if validation.warnings.is_empty() {
        println!("No warnings");
    }
    for warning in &validation.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}

/// Drive the dashboard from stdin until EOF, starting at `initial`.
///
/// At EOF the last input is committed and its results are shown before
/// returning, so piped input works.
async fn watch(mut dashboard: Dashboard, initial: &str) -> Result<()> {
    let follower = dashboard.follow_commits();
    let mut resolution = dashboard.resolver.subscribe();
    let mut current = dashboard.current.subscribe();
    let mut forecast = dashboard.forecast.subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    dashboard.resolver.set_input(initial);
    dashboard.resolver.submit();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                dashboard.resolver.set_input(line);
                if dashboard.resolver.mode() == CommitMode::Submit {
                    dashboard.resolver.submit();
                }
            }
            Ok(()) = resolution.changed() => {
                print_resolution(&resolution.borrow_and_update().clone());
            }
            Ok(()) = current.changed() => {
                let state = current.borrow_and_update().clone();
                print_current_state(&dashboard.current.location(), state);
            }
            Ok(()) = forecast.changed() => {
                print_forecast_state(forecast.borrow_and_update().clone());
            }
        }
    }

    dashboard.settle().await;
    if resolution.has_changed().unwrap_or(false) {
        print_resolution(&resolution.borrow_and_update().clone());
    }
    if current.has_changed().unwrap_or(false) {
        let state = current.borrow_and_update().clone();
        print_current_state(&dashboard.current.location(), state);
    }
    if forecast.has_changed().unwrap_or(false) {
        print_forecast_state(forecast.borrow_and_update().clone());
    }

    follower.abort();
    Ok(())
}

fn print_current_state(name: &str, state: ViewState<CurrentConditions>) {
    match state {
        ViewState::Ready(conditions) => print_current(name, &conditions),
        ViewState::Failed(message) => println!("Current weather: {}", message),
        ViewState::Loading => println!("Loading current weather for {}...", name),
        ViewState::Empty => {}
    }
}

fn print_forecast_state(state: ViewState<Vec<DayForecast>>) {
    match state {
        ViewState::Ready(rows) => print_forecast("", &rows),
        ViewState::Failed(message) => println!("Forecast: {}", message),
        ViewState::Loading | ViewState::Empty => {}
    }
}

fn print_resolution(state: &ResolutionState) {
    match state {
        ResolutionState::Idle => println!("No location"),
        ResolutionState::Pending { name } => println!("Resolving {}...", name),
        ResolutionState::Resolved { name, coordinates } => {
            println!(
                "{}: {:.4}, {:.4}",
                name, coordinates.latitude, coordinates.longitude
            );
            if let Some(url) = state.map_url() {
                println!("  Map: {}", url);
            }
        }
        ResolutionState::Failed { name, error } => println!("{}: {}", name, error),
    }
}

fn fmt_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "-".to_string(),
    }
}

fn print_current(name: &str, conditions: &CurrentConditions) {
    println!("Current weather in {}", name);
    println!("  Condition:   {}", conditions.condition_text());
    println!("  Temperature: {:.1}°C", conditions.temperature_2m);
    println!(
        "  Feels like:  {}",
        fmt_value(conditions.apparent_temperature, "°C")
    );
    println!(
        "  Humidity:    {}",
        fmt_value(conditions.relative_humidity_2m, "%")
    );
    println!(
        "  Wind:        {}",
        fmt_value(conditions.wind_speed_10m, " km/h")
    );
    println!("  Pressure:    {}", fmt_value(conditions.pressure_msl, " hPa"));
    println!("  Cloud cover: {}", fmt_value(conditions.cloud_cover, "%"));
}

fn print_forecast(name: &str, rows: &[DayForecast]) {
    if name.is_empty() {
        println!("Daily forecast");
    } else {
        println!("Daily forecast for {}", name);
    }
    if rows.is_empty() {
        println!("  No forecast data");
    }
    for row in rows {
        let day = row
            .day()
            .map(|d| d.format("%a %Y-%m-%d").to_string())
            .unwrap_or_else(|| row.date.clone());
        println!(
            "  {:<15} {:<22} max {:>7}  min {:>7}  wind {}",
            day,
            row.description,
            fmt_value(row.temperature_max, "°C"),
            fmt_value(row.temperature_min, "°C"),
            fmt_value(row.wind_speed_mean, " km/h"),
        );
    }
}

fn print_history(history: &UserHistory) {
    println!("Saved readings for {}", history.user());
    if history.records().is_empty() {
        println!("  None");
    }
    for record in history.records() {
        let when = record
            .date
            .as_deref()
            .or(record.created_at.as_deref())
            .unwrap_or("-");
        println!(
            "  #{:<5} {:<20} {:>7}  {:<16} {}",
            record.id,
            history.display_location(record),
            format!("{:.1}°C", record.temp),
            record.condition.as_deref().unwrap_or("-"),
            when,
        );
    }
}
