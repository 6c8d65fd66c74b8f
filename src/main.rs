//! CLI entry point for the route survey pipeline.
//!
//! Loads the survey CSV and the area and bus-line GeoJSON files, then runs
//! one of the subcommands: a load summary, a filter query, area statistics,
//! the line catalog, or the JSON-lines action loop used by the agent.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use route_survey::{
    actions::{dispatch, parse_action},
    district::SHANGHAI_DISTRICTS,
    fetch::{BasicClient, read_source_text},
    filter::FilterCriteria,
    lines::{LineCatalog, LineInfo},
    loader::load_respondents,
    output::{append_town_stats, print_json, print_pretty},
    parser::ParseMode,
    scoring::summarize,
    session::{RespondentSummary, SurveySession},
    spatial::{AreaCollection, DEFAULT_ATTITUDE_THRESHOLD, TownStatsReport},
};
use std::ffi::OsStr;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "route_survey")]
#[command(about = "Explore the bus-route adjustment survey", long_about = None)]
struct Cli {
    /// Survey CSV path or URL [env: SURVEY_CSV]
    #[arg(long, global = true)]
    survey: Option<String>,

    /// Administrative-area GeoJSON path or URL [env: TOWNS_GEOJSON]
    #[arg(long, global = true)]
    towns: Option<String>,

    /// Bus-line GeoJSON path or URL [env: BUSLINE_GEOJSON]
    #[arg(long, global = true)]
    lines: Option<String>,

    /// How CSV lines are split into fields
    #[arg(long, global = true, default_value = "strict")]
    parse_mode: ParseMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the survey and report how many rows were kept
    Load,
    /// Print the respondents matching every given criterion
    Filter(FilterArgs),
    /// Count respondents per administrative area
    TownStats {
        /// Attitude score below which a respondent counts as low-attitude
        #[arg(short, long, default_value_t = DEFAULT_ATTITUDE_THRESHOLD)]
        threshold: f64,

        /// Only aggregate respondents matching these criteria
        #[command(flatten)]
        filter: FilterArgs,

        /// CSV file to append per-area rows to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the bus lines in the line catalog
    Lines {
        /// Only show directions of this route (e.g. "浦东59路")
        #[arg(short, long)]
        bus_name: Option<String>,
    },
    /// Answer JSON action requests read line by line from stdin
    Serve,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    occupation: Option<String>,
    /// 男 or 女
    #[arg(long)]
    gender: Option<String>,
    /// e.g. "18-25", "50-" or "50以上"
    #[arg(long)]
    age_range: Option<String>,
    #[arg(long)]
    min_attitude: Option<f64>,
    #[arg(long)]
    max_attitude: Option<f64>,
    #[arg(long)]
    min_intention: Option<f64>,
    #[arg(long)]
    max_intention: Option<f64>,
    #[arg(long)]
    awareness: Option<String>,
    #[arg(long)]
    plan_to_use: Option<String>,
    #[arg(long)]
    commute_change: Option<String>,
    #[arg(long)]
    residence_district: Option<String>,
    #[arg(long)]
    work_district: Option<String>,
}

impl From<FilterArgs> for FilterCriteria {
    fn from(args: FilterArgs) -> Self {
        FilterCriteria {
            occupation: args.occupation,
            gender: args.gender,
            age_range: args.age_range,
            min_attitude_score: args.min_attitude,
            max_attitude_score: args.max_attitude,
            min_behavioral_intention_score: args.min_intention,
            max_behavioral_intention_score: args.max_intention,
            awareness_of_route_adjustment: args.awareness,
            plan_to_use_adjusted_route: args.plan_to_use,
            commute_change: args.commute_change,
            residence_district: args.residence_district,
            work_district: args.work_district,
            reset_filter: None,
        }
    }
}

/// Resolved data sources: flag, then environment, then the bundled default.
struct Sources {
    survey: String,
    towns: String,
    lines: String,
}

impl Sources {
    fn resolve(cli: &Cli) -> Self {
        let pick = |flag: &Option<String>, var: &str, default: &str| {
            flag.clone()
                .or_else(|| std::env::var(var).ok())
                .unwrap_or_else(|| default.to_string())
        };
        Sources {
            survey: pick(&cli.survey, "SURVEY_CSV", "data/llm_data.csv"),
            towns: pick(&cli.towns, "TOWNS_GEOJSON", "data/towns.geojson"),
            lines: pick(&cli.lines, "BUSLINE_GEOJSON", "data/busline.json"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/route_survey.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("route_survey.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let sources = Sources::resolve(&cli);
    let client = BasicClient::new()?;

    match cli.command {
        Commands::Load => {
            let session = load_session(&client, &sources.survey, cli.parse_mode).await?;
            let respondents = session.original();

            for district in SHANGHAI_DISTRICTS {
                let residents = respondents
                    .iter()
                    .filter(|r| r.profile.residence_district == district)
                    .count();
                if residents > 0 {
                    info!(district, residents, "Residence district");
                }
            }
            let unclassified = respondents
                .iter()
                .filter(|r| r.profile.residence_district.is_empty())
                .count();

            for summary in summarize(respondents.iter().map(|r| &r.survey)) {
                info!(
                    dimension = ?summary.dimension,
                    answered = summary.answered,
                    mean = summary.mean,
                    "Dimension score"
                );
            }

            info!(
                respondents = respondents.len(),
                columns = session.header().columns().len(),
                unclassified,
                "Survey summary"
            );
        }
        Commands::Filter(args) => {
            let mut session = load_session(&client, &sources.survey, cli.parse_mode).await?;
            session.apply_filter(&args.into());

            let matches: Vec<RespondentSummary> = session.view().map(RespondentSummary::new).collect();
            print_json(&matches)?;
        }
        Commands::TownStats {
            threshold,
            filter,
            output,
        } => {
            let mut session = load_session(&client, &sources.survey, cli.parse_mode).await?;
            let areas = load_areas(&client, &sources.towns).await?;

            session.apply_filter(&filter.into());
            let report = session.town_stats(&areas, threshold);

            info!(
                respondents = report.respondents,
                unassigned = report.unassigned,
                most_users = TownStatsReport::label(&report.most_users),
                most_low_attitude = TownStatsReport::label(&report.most_low_attitude),
                most_commute_change = TownStatsReport::label(&report.most_commute_change),
                "Town stats"
            );
            print_pretty(&report);
            print_json(&report)?;

            if let Some(path) = output {
                append_town_stats(&path, &report)?;
                info!(path, rows = report.areas.len(), "Area rows appended");
            }
        }
        Commands::Lines { bus_name } => {
            let catalog = load_lines(&client, &sources.lines).await?;

            let bus_name = bus_name.unwrap_or_else(|| LineInfo::survey_default().bus_name);
            let mut shown = 0;
            for line in catalog.by_bus_name(&bus_name) {
                shown += 1;
                info!(
                    layer = %line.info.layer,
                    from = %line.info.start_station,
                    to = %line.info.end_station,
                    recorded_m = line.info.length,
                    measured_m = line.measured_length(),
                    segments = line.paths.len(),
                    "Line"
                );
            }
            info!(bus_name, shown, total = catalog.len(), "Line catalog");
        }
        Commands::Serve => {
            let session = load_session(&client, &sources.survey, cli.parse_mode).await?;
            let areas = load_areas(&client, &sources.towns).await?;
            let lines = load_lines(&client, &sources.lines).await?;
            serve(session, &areas, &lines).await?;
        }
    }

    Ok(())
}

/// Loads the survey into a session. A CSV the loader rejects yields an
/// empty session; an unreadable source is an error.
async fn load_session(client: &BasicClient, source: &str, mode: ParseMode) -> Result<SurveySession> {
    let text = read_source_text(client, source).await?;
    Ok(SurveySession::from_load(load_respondents(&text, mode)))
}

async fn load_areas(client: &BasicClient, source: &str) -> Result<AreaCollection> {
    let text = read_source_text(client, source).await?;
    let areas = AreaCollection::from_geojson_str(&text)
        .with_context(|| format!("failed to decode {source}"))?;
    info!(areas = areas.len(), "Administrative areas loaded");
    Ok(areas)
}

async fn load_lines(client: &BasicClient, source: &str) -> Result<LineCatalog> {
    let text = read_source_text(client, source).await?;
    let catalog = LineCatalog::from_geojson_str(&text)
        .with_context(|| format!("failed to decode {source}"))?;
    info!(lines = catalog.len(), "Bus-line catalog loaded");
    Ok(catalog)
}

/// Reads one JSON action per stdin line and writes one JSON outcome per
/// stdout line. Malformed requests get an `{"error": ...}` reply.
#[tracing::instrument(skip_all, fields(respondents = session.original().len()))]
async fn serve(
    mut session: SurveySession,
    areas: &AreaCollection,
    lines: &LineCatalog,
) -> Result<()> {
    let mut requests = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0usize;

    info!("Waiting for action requests on stdin");
    while let Some(request) = requests.next_line().await? {
        if request.trim().is_empty() {
            continue;
        }

        let reply = match parse_action(&request) {
            Ok(action) => serde_json::to_string(&dispatch(&mut session, areas, lines, &action))?,
            Err(e) => {
                warn!(error = %e, "Rejected action request");
                serde_json::json!({ "error": e.to_string() }).to_string()
            }
        };

        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        handled += 1;
    }

    info!(handled, "Input closed, stopping");
    Ok(())
}
