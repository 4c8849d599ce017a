use analytics::{tags, Analytics, FileOpter, LogSink};
use chrono::Utc;
use compose::ComposeCli;
use devloop_cloud::{HttpCloudClient, TokenResolver};
use devloop_config::{paths, AppConfig, FilePrefs};
use devloop_store::actions::{ConfigLoadedAction, InitAction};
use devloop_store::state::BuildInfo;
use devloop_store::{Action, Store};
use metrics::SwappableExporter;
use std::io::Write;
use std::sync::{Arc, Mutex};
use subscribers::{
    AnalyticsReporter, AnalyticsUpdater, CloudStatusManager, DisableWatcher,
    MetricsModeController, PodMonitor, TerminalPrompt,
};
use tokio_util::sync::CancellationToken;
use utils::browser::SystemBrowser;
use utils::terminal_input::CrosstermInput;

mod analytics;
mod compose;
mod logger;
mod metrics;
mod subscribers;
mod utils;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_file = logger::init()?;
    log::info!("Starting devloop {}, logging to {}", VERSION, log_file.display());

    // A broken config file still starts the engine, so the error can be shown
    let (config, config_error) = match AppConfig::try_load() {
        Ok(config) => (config, None),
        Err(e) => {
            log::warn!("{:#}", e);
            (AppConfig::default(), Some(format!("{:#}", e)))
        }
    };
    let token = TokenResolver::new(paths::token_path().ok()).resolve();
    let web_url = config.web_url();

    let opter = FileOpter::open_default()?;
    let analytics_opt = opter.load().unwrap_or(config.analytics_opt);
    let analytics = Arc::new(
        Analytics::new(Arc::new(LogSink), Arc::new(opter), analytics_opt)
            .with_global_tag("version", VERSION),
    );
    let exporter = Arc::new(SwappableExporter::default());
    let prefs = Arc::new(FilePrefs::open_default()?);
    let stdout = Arc::new(Mutex::new(
        Box::new(std::io::stdout()) as Box<dyn Write + Send>
    ));

    let mut store = Store::new();
    store.add_subscriber(AnalyticsReporter::new(analytics.clone()));
    store.add_subscriber(AnalyticsUpdater::new(
        analytics.clone(),
        tags([("mode", config.terminal_mode.to_string())]),
    ));
    store.add_subscriber(CloudStatusManager::new(Arc::new(HttpCloudClient::new())));
    store.add_subscriber(PodMonitor::new());
    let metrics = MetricsModeController::new(
        config.web_host.clone(),
        prefs,
        exporter,
        MetricsModeController::env_mode(),
    );
    store.add_subscriber(metrics.clone());
    store.add_subscriber(
        TerminalPrompt::new(
            analytics.clone(),
            Box::new(CrosstermInput::open),
            Arc::new(SystemBrowser),
            stdout,
            config.web_host.clone(),
            web_url.clone(),
        )
        .with_metrics(metrics),
    );
    store.add_subscriber(DisableWatcher::new(Arc::new(ComposeCli::new(
        config.compose_files.clone(),
    ))));

    let dispatcher = store.dispatcher();
    dispatcher.dispatch(Action::Init(InitAction {
        start_time: Utc::now(),
        terminal_mode: config.terminal_mode,
        analytics_user_opt: analytics_opt,
        cloud_address: config.cloud_address.clone(),
        token,
        team_id: String::new(),
        build_info: BuildInfo {
            version: VERSION.to_string(),
            date: option_env!("DEVLOOP_BUILD_DATE").unwrap_or_default().to_string(),
        },
        web_url,
        env: config.env.clone(),
    }));
    dispatcher.dispatch(Action::ConfigLoaded(ConfigLoadedAction {
        error: config_error,
        ..Default::default()
    }));

    let ctx = CancellationToken::new();
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted");
                ctx.cancel();
            }
        });
    }

    let result = store.run(ctx).await;
    analytics.flush();

    match result {
        Ok(()) => {
            log::info!("Exiting devloop");
            Ok(())
        }
        Err(e) => {
            log::error!("{}", e);
            Err(e.into())
        }
    }
}
