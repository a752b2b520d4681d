use clap::{Args, Parser, Subcommand};
use recipe_timer::adapters::{
    FileStore, HttpTimerApi, RelayPushPlatform, StdinConfirmer, TerminalView, TokioTimeProvider,
};
use recipe_timer::config::{
    self, ClientConfig, ConfigError, DEFAULT_COUNTDOWN_TICK, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL, FileConfig, WorkerConfig,
};
use recipe_timer::ports::TimerView;
use recipe_timer::timers::CancelAllOutcome;
use recipe_timer::{Client, ClientError, ClientEvent, SubscriptionStatus, recipes, worker};
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::warn;

const STATE_FILE: &str = "client.json";
const DEFAULT_STATE_DIR: &str = ".recipe-timer";

type CliClient = Client<RelayPushPlatform<FileStore>, HttpTimerApi, FileStore, TokioTimeProvider>;

pub(crate) enum RunOutcome {
    Execute(Invocation),
    Exit(i32),
}

pub(crate) struct Invocation {
    command: Command,
    config: ClientConfig,
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match &cli.command {
        Command::Recipes => return RunOutcome::Exit(run_recipes()),
        Command::RenderPush(args) => return RunOutcome::Exit(run_render_push(args)),
        _ => {}
    }

    match resolve_config(&cli) {
        Ok(config) => RunOutcome::Execute(Invocation {
            command: cli.command,
            config,
        }),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "recipe-timer",
    version,
    about = "Push-notified recipe timers kept in sync with a timer server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// TOML file with defaults for the options below.
    #[arg(long, env = "RECIPE_TIMER_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "RECIPE_TIMER_SERVER_URL")]
    server_url: Option<String>,
    #[arg(long, env = "RECIPE_TIMER_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "RECIPE_TIMER_RELAY_ENDPOINT")]
    relay_endpoint: Option<String>,
    #[arg(long, env = "RECIPE_TIMER_STATE_DIR")]
    state_dir: Option<PathBuf>,
    #[arg(long, env = "RECIPE_TIMER_POLL_INTERVAL")]
    poll_interval: Option<String>,
    #[arg(long, env = "RECIPE_TIMER_REQUEST_TIMEOUT")]
    request_timeout: Option<String>,
    #[arg(long, env = "RECIPE_TIMER_WORKER_SCRIPT")]
    worker_script: Option<String>,
    /// Answer the notification permission prompt with "deny".
    #[arg(long, env = "RECIPE_TIMER_DENY_NOTIFICATIONS")]
    deny_notifications: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a push subscription and register it with the server.
    Subscribe,
    /// Show the subscription state and every step's timer.
    Status,
    /// List the recipe catalogue.
    Recipes,
    /// Start a timer for any step id.
    Start(StartArgs),
    /// Start the catalogue timer of a recipe step.
    StartStep { step_id: String },
    Cancel { timer_id: i64 },
    CancelAll {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Keep polling and show live countdowns. Press Enter to poll now.
    Watch,
    Diagnose,
    /// Unsubscribe and drop all local push state.
    Reset,
    /// Show the notification a push payload would produce.
    RenderPush(RenderPushArgs),
}

#[derive(Args, Debug)]
struct StartArgs {
    step_id: String,
    #[arg(long)]
    minutes: u32,
    #[arg(long)]
    message: Option<String>,
}

#[derive(Args, Debug)]
struct RenderPushArgs {
    payload: Option<String>,
    #[arg(long)]
    icon: Option<String>,
}

fn run_recipes() -> i32 {
    for recipe in &recipes::RECIPES {
        println!("{}", recipe.title);
        for step in recipe.steps {
            println!("  {:<10} {:>4} min  {}", step.id, step.minutes, step.text);
        }
    }
    0
}

fn run_render_push(args: &RenderPushArgs) -> i32 {
    let content = worker::notification_for_push(args.payload.as_deref(), args.icon.as_deref());
    println!("title: {}", content.title);
    println!("body:  {}", content.body);
    if let Some(icon) = content.icon {
        println!("icon:  {icon}");
    }
    0
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig, ConfigError> {
    let file = match cli.config.as_deref() {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let file_worker = file.worker.unwrap_or_default();

    let server_url = cli
        .server_url
        .as_deref()
        .or(file.server_url.as_deref())
        .unwrap_or(DEFAULT_SERVER_URL);
    let relay_endpoint = cli
        .relay_endpoint
        .as_deref()
        .or(file.relay_endpoint.as_deref())
        .map(|raw| config::parse_url("relay endpoint", raw))
        .transpose()?;
    let poll_interval = match cli.poll_interval.as_deref().or(file.poll_interval.as_deref()) {
        Some(raw) => config::parse_duration("poll interval", raw)?,
        None => DEFAULT_POLL_INTERVAL,
    };
    let request_timeout = match cli
        .request_timeout
        .as_deref()
        .or(file.request_timeout.as_deref())
    {
        Some(raw) => config::parse_duration("request timeout", raw)?,
        None => DEFAULT_REQUEST_TIMEOUT,
    };

    let defaults = WorkerConfig::default();
    let worker = WorkerConfig {
        script: cli
            .worker_script
            .clone()
            .or(file_worker.script)
            .unwrap_or(defaults.script),
        scope: file_worker.scope.unwrap_or(defaults.scope),
        activation_timeout: match file_worker.activation_timeout.as_deref() {
            Some(raw) => config::parse_duration("activation timeout", raw)?,
            None => defaults.activation_timeout,
        },
        registration_attempts: match file_worker.registration_attempts {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    field: "registration attempts",
                    value: "0".to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
            Some(attempts) => attempts,
            None => defaults.registration_attempts,
        },
        registration_backoff: match file_worker.registration_backoff.as_deref() {
            Some(raw) => config::parse_duration("registration backoff", raw)?,
            None => defaults.registration_backoff,
        },
        ..defaults
    };

    Ok(ClientConfig {
        server_url: config::parse_server_url(server_url)?,
        vapid_public_key: cli
            .vapid_public_key
            .clone()
            .or(file.vapid_public_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()),
        worker,
        poll_interval,
        countdown_tick: DEFAULT_COUNTDOWN_TICK,
        request_timeout,
        state_dir: cli
            .state_dir
            .clone()
            .or(file.state_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
        relay_endpoint,
        notifications_allowed: !cli.deny_notifications
            && file.notifications_allowed.unwrap_or(true),
    })
}

fn build_client(config: ClientConfig) -> Result<CliClient, ClientError> {
    let store = FileStore::new(config.state_dir.join(STATE_FILE));
    let platform = RelayPushPlatform::new(
        store.clone(),
        config.relay_endpoint.clone(),
        config.notifications_allowed,
    );
    let api = HttpTimerApi::new(config.server_url.clone(), config.request_timeout)?;
    Ok(Client::new(config, platform, api, store, TokioTimeProvider))
}

fn default_message(step_id: &str, minutes: u32) -> String {
    match recipes::find_step(step_id) {
        Some((recipe, _)) => recipes::timer_message(recipe, minutes),
        None => worker::DEFAULT_BODY.to_string(),
    }
}

pub(crate) async fn execute(invocation: Invocation) -> i32 {
    let Invocation { command, config } = invocation;
    let mut client = match build_client(config) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("error: {err}");
            return 2;
        }
    };
    let status = client.initialize().await;
    let mut view = TerminalView::stdout();

    let result = match command {
        Command::Subscribe => client.enable_notifications().await.map(|subscription| {
            println!("subscribed: {}", subscription.endpoint);
        }),
        Command::Status => {
            match status {
                SubscriptionStatus::Subscribed(subscription) => {
                    println!("subscribed: {}", subscription.endpoint);
                }
                SubscriptionStatus::NotSubscribed => println!("not subscribed"),
            }
            view.render(&client.rows());
            Ok(())
        }
        Command::Start(args) => {
            let message = args
                .message
                .unwrap_or_else(|| default_message(&args.step_id, args.minutes));
            client
                .start_timer(&args.step_id, args.minutes, &message)
                .await
                .map(|started| println!("started timer {}", started.timer_id))
        }
        Command::StartStep { step_id } => client
            .start_step(&step_id)
            .await
            .map(|started| println!("started timer {}", started.timer_id)),
        Command::Cancel { timer_id } => client
            .cancel_timer(timer_id)
            .await
            .map(|()| println!("cancelled timer {timer_id}")),
        Command::CancelAll { yes } => {
            let outcome = if yes {
                client.cancel_all(&mut |_: &str| true).await
            } else {
                client.cancel_all(&mut StdinConfirmer).await
            };
            outcome.map(|outcome| match outcome {
                CancelAllOutcome::Cancelled => println!("all timers cancelled"),
                CancelAllOutcome::Declined => println!("nothing cancelled"),
            })
        }
        Command::Watch => {
            run_watch(&mut client, &mut view).await;
            Ok(())
        }
        Command::Diagnose => {
            let report = client.diagnostics().await;
            print!("{report}");
            if report.healthy() {
                Ok(())
            } else {
                return finish(&mut client, &mut view, 1);
            }
        }
        Command::Reset => client.reset().await,
        Command::Recipes | Command::RenderPush(_) => Ok(()),
    };

    let code = if result.is_ok() { 0 } else { 1 };
    finish(&mut client, &mut view, code)
}

fn finish(client: &mut CliClient, view: &mut impl TimerView, code: i32) -> i32 {
    for notice in client.notices() {
        view.notice(&notice);
    }
    code
}

async fn run_watch(client: &mut CliClient, view: &mut impl TimerView) {
    let (events, receiver) = mpsc::channel(8);

    let shutdown = events.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
        }
        let _ = shutdown.send(ClientEvent::Shutdown).await;
    });

    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if events.send(ClientEvent::VisibilityRegained).await.is_err() {
                break;
            }
        }
    });

    client.watch(view, receiver).await;
}
