use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use scorekeeper::context::{Flash, RequestContext};
use scorekeeper::error::StoreError;
use scorekeeper::store::{DataStore, RestStore};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Validate scoring rules and report overlapping bands
    Check,
}

#[derive(Subcommand, Debug)]
enum FixturesCommand {
    /// List fixtures with their current status (default)
    List,
    /// Record the final score of a fixture
    Result {
        /// Fixture id, as shown in the list
        #[arg(long)]
        id: i64,
        #[arg(long)]
        home: u32,
        #[arg(long)]
        away: u32,
    },
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Data store url (prompted for when omitted)
        #[arg(long)]
        url: Option<String>,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Record assessment answers and calculate category scores
    Submit {
        /// User the answers belong to
        #[arg(long)]
        user: i64,
        /// Assessment being answered
        #[arg(long)]
        assessment: i64,
        /// YAML or JSON file with `[{question_id, value}]`
        #[arg(long)]
        answers: PathBuf,
    },
    /// Show the categories the user scored lowest in
    Focus {
        #[arg(long)]
        user: i64,
    },
    /// List fixtures or record their results
    Fixtures {
        #[command(subcommand)]
        command: Option<FixturesCommand>,
    },
    /// Submit score predictions for upcoming fixtures
    Predict {
        #[arg(long)]
        user: i64,
        /// YAML or JSON file with `[{fixture_id, home_score, away_score}]`
        #[arg(long)]
        file: PathBuf,
        /// Tournament the predictions count towards
        #[arg(long)]
        tournament: Option<i64>,
    },
    /// Run the prediction points procedure on a schedule
    Points {
        /// Invoke the procedure once and exit
        #[arg(long)]
        once: bool,
    },
    /// Scoring rule maintenance
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Parser, Debug)]
#[command(name = "scorekeeper")]
#[command(about = "Assessment scoring and fixture predictions CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/scorekeeper/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "scorekeeper=debug"
    } else {
        "scorekeeper=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Map a failed command to an exit code by looking for a store error in the chain.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|e| e.downcast_ref::<StoreError>()) {
        Some(store_err) if store_err.is_auth() => EXIT_AUTH,
        Some(_) => EXIT_NETWORK,
        None => EXIT_CONFIG,
    }
}

fn is_auth_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .find_map(|e| e.downcast_ref::<StoreError>())
        .is_some_and(StoreError::is_auth)
}

fn print_flashes(ctx: &mut RequestContext) {
    for flash in ctx.take_flashes() {
        match flash {
            Flash::Success(_) => println!("{}", flash),
            Flash::Error(_) => eprintln!("{}", flash),
        }
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.map(PathBuf::from);

    if let Commands::Init { url, force } = &cli.command {
        match scorekeeper::config::init::run_init(config_path.clone(), url.clone(), *force) {
            Ok(path) => {
                println!("Config written to {}", path.display());
                std::process::exit(EXIT_SUCCESS);
            }
            Err(e) => {
                eprintln!("Init failed: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        }
    }

    // Load config
    let config = match scorekeeper::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = scorekeeper::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    // Setup credentials (prompts for the key on first run)
    let key = match scorekeeper::credentials::setup_key_if_missing(&config.store.url).await {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Credential error: {:#}", e);
            std::process::exit(EXIT_AUTH);
        }
    };

    let store = match RestStore::new(&config.store.url, &key, config.store.schema.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to create data store client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    };

    let mut ctx = match &cli.command {
        Commands::Submit { user, .. } | Commands::Focus { user } | Commands::Predict { user, .. } => {
            RequestContext::for_user(*user)
        }
        _ => RequestContext::new(),
    };

    let use_colors = scorekeeper::output::should_use_colors();
    let result = run(cli.command, &config, &store, &mut ctx, use_colors).await;
    print_flashes(&mut ctx);

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if is_auth_failure(&e)
                && scorekeeper::credentials::get_key_from_env().is_none()
                && std::io::stdin().is_terminal()
            {
                match scorekeeper::credentials::reprompt_for_key(&config.store.url).await {
                    Ok(_) => eprintln!("Run the command again to use the new key."),
                    Err(err) => eprintln!("Credential error: {:#}", err),
                }
            }
            std::process::exit(exit_code_for(&e));
        }
    }
}

async fn run(
    command: Commands,
    config: &scorekeeper::config::Config,
    store: &dyn DataStore,
    ctx: &mut RequestContext,
    use_colors: bool,
) -> anyhow::Result<i32> {
    use scorekeeper::{fixtures, output, recorder, scoring};

    match command {
        // Handled before the store is built
        Commands::Init { .. } => Ok(EXIT_SUCCESS),
        Commands::Submit {
            user,
            assessment,
            answers,
        } => {
            let answers = recorder::load_answers(&answers)?;
            let submission = recorder::AssessmentSubmission {
                user_id: user,
                assessment_id: assessment,
                answers,
            };
            let today = chrono::Local::now().date_naive();
            let outcome = recorder::submit_assessment(store, ctx, &submission, today).await?;

            let ids: Vec<i64> = outcome.scores.iter().map(|s| s.category_id).collect();
            let categories = store.categories(&ids).await.unwrap_or_else(|e| {
                tracing::warn!("could not load category names: {}", e);
                Vec::new()
            });
            let table = scoring::lowest_categories(&outcome.scores, &categories, usize::MAX);
            println!("Response set {}", outcome.response_set_id);
            println!("{}", output::format_category_scores(&table, use_colors));

            let unmatched = outcome.result.unmatched().count();
            if unmatched > 0 {
                eprintln!("{} response(s) matched no scoring rule", unmatched);
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::Focus { user } => {
            match scoring::focus_for_user(store, user, config.focus_count()).await? {
                Some(focus) => println!("{}", output::format_category_scores(&focus, use_colors)),
                None => println!("No assessment results for user {}.", user),
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::Fixtures { command } => match command.unwrap_or(FixturesCommand::List) {
            FixturesCommand::List => {
                let views = fixtures::list_fixtures(store, chrono::Utc::now()).await?;
                println!("{}", output::format_fixtures(&views, use_colors));
                Ok(EXIT_SUCCESS)
            }
            FixturesCommand::Result { id, home, away } => {
                fixtures::record_result(store, ctx, id, home, away, chrono::Utc::now()).await?;
                Ok(EXIT_SUCCESS)
            }
        },
        Commands::Predict { file, tournament, .. } => {
            let inputs = fixtures::load_predictions(&file)?;
            let review =
                fixtures::submit_predictions(store, ctx, tournament, &inputs, chrono::Utc::now()).await?;
            println!("{}", output::format_prediction_review(&review, use_colors));
            Ok(EXIT_SUCCESS)
        }
        Commands::Points { once } => {
            let procedure = config.points_procedure();
            if once {
                let value = fixtures::run_once(store, procedure).await?;
                if !value.is_null() {
                    println!("{}", value);
                }
                return Ok(EXIT_SUCCESS);
            }

            let every = config.points_interval()?;
            tracing::info!(
                procedure,
                interval = config.points_interval_str(),
                "starting points schedule (ctrl-c to stop)"
            );
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("failed to listen for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            let summary = fixtures::run_every(store, procedure, every, None, shutdown).await;
            println!(
                "Points procedure ran {} time(s), {} failed",
                summary.runs, summary.failures
            );
            if summary.runs > 0 && summary.failures == summary.runs {
                return Ok(EXIT_NETWORK);
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::Rules {
            command: RulesCommand::Check,
        } => {
            let rules = store.all_scoring_rules().await?;
            println!("Checked {} scoring rule(s)", rules.len());

            let mut code = EXIT_SUCCESS;
            if let Err(errors) = scoring::validate_rules(&rules) {
                eprintln!("Scoring rule errors:");
                for error in errors {
                    eprintln!("  - {}", error);
                }
                code = EXIT_CONFIG;
            }

            let overlaps = scoring::find_overlaps(&rules);
            println!("{}", output::format_overlaps(&overlaps, use_colors));
            Ok(code)
        }
    }
}
