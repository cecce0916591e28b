use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use spaceman::common::config::{Config, config_file};

#[cfg(target_os = "macos")]
embed_plist::embed_info_plist!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/Info.plist"));

#[derive(Parser)]
#[command(version, about = "Names and tracks macOS Spaces")]
struct Cli {
    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep space names in memory only. Nothing is read from or written to
    /// the names file.
    #[arg(long)]
    ephemeral_names: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current spaces once and exit.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Rename the current space. A running instance picks the change up from
    /// the names file.
    Rename { name: String },
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();

    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let issues = match Config::read(&config_path) {
            Ok(config) => config.validate(),
            Err(e) => vec![format!("{e:#}")],
        };
        if issues.is_empty() {
            println!("Config validation passed");
            return;
        }
        for issue in issues {
            eprintln!("{}", issue);
        }
        process::exit(1);
    }

    let config = match Config::read_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    };

    if let Err(e) = platform::run(opt, config) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use super::*;

    pub fn run(_opt: Cli, _config: Config) -> anyhow::Result<()> {
        anyhow::bail!("spaceman needs the macOS window server; only --validate works here")
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use anyhow::{Context, bail};
    use objc2::MainThreadMarker;
    use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
    use spaceman::actor::menu_bar::Menu;
    use spaceman::actor::name_watcher::NameWatcher;
    use spaceman::actor::notification_center::NotificationCenter;
    use spaceman::actor::space_observer::{self, Event, SpaceObserver};
    use spaceman::common::log;
    use spaceman::model::space::current_space;
    use spaceman::model::{FileNameStore, MemoryNameStore, NameStore, Space, SpaceStateReconciler};
    use spaceman::sys::display_server::Actual;
    use spaceman::sys::skylight::displays_have_separate_spaces;
    use spaceman::ui::LogPresenter;
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::{info, warn};

    use super::*;

    pub fn run(opt: Cli, config: Config) -> anyhow::Result<()> {
        log::init_logging();
        if opt.ephemeral_names {
            dispatch(opt, config, MemoryNameStore::new(), false)
        } else {
            let store = FileNameStore::new(config.settings.names_file());
            let watch = config.settings.watch_names_file;
            dispatch(opt, config, store, watch)
        }
    }

    fn dispatch<N: NameStore + Send + 'static>(
        opt: Cli,
        config: Config,
        names: N,
        watch_names: bool,
    ) -> anyhow::Result<()> {
        match opt.command {
            Some(Commands::List { json }) => list(names, json),
            Some(Commands::Rename { name }) => rename(names, &name),
            None => daemon(config, names, watch_names),
        }
    }

    fn snapshot<N: NameStore>(names: N) -> anyhow::Result<(Vec<Space>, N)> {
        let mut reconciler = SpaceStateReconciler::new(Actual, names);
        let spaces = reconciler.reconcile().context("could not read spaces")?;
        Ok((spaces, reconciler.into_names()))
    }

    fn list<N: NameStore>(names: N, json: bool) -> anyhow::Result<()> {
        let (spaces, _) = snapshot(names)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&spaces)?);
            return Ok(());
        }
        for s in &spaces {
            let desktop = match s.desktop_number {
                Some(n) => n.to_string(),
                None => "F".to_string(),
            };
            let marker = if s.is_current_space { "*" } else { " " };
            println!("{marker} {:>2}  {:<4} {}  ({})", s.space_number, desktop, s.space_name, s.display_id);
        }
        Ok(())
    }

    fn rename<N: NameStore>(names: N, name: &str) -> anyhow::Result<()> {
        let (spaces, names) = snapshot(names)?;
        let Some(space) = current_space(&spaces) else {
            bail!("no current space");
        };
        let record = names.rename(&space.space_id, space.space_number, name)?;
        println!("{}", record.space_name);
        Ok(())
    }

    fn daemon<N: NameStore + Send + 'static>(
        config: Config,
        names: N,
        watch_names: bool,
    ) -> anyhow::Result<()> {
        install_panic_hook();

        for issue in config.validate() {
            warn!("config: {issue}");
        }
        if !displays_have_separate_spaces() {
            warn!(
                "\"Displays have separate Spaces\" is disabled; all screens share one space list"
            );
        }

        let Some(mtm) = MainThreadMarker::new() else {
            bail!("spaceman must be started on the main thread");
        };
        let app = NSApplication::sharedApplication(mtm);
        let _ = app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);

        let (observer_tx, observer_rx) = spaceman::actor::channel();
        let (menu_tx, menu_rx) = spaceman::actor::channel();

        let _notification_center = NotificationCenter::new(observer_tx.clone());

        let stop_tx = observer_tx.clone();
        ctrlc::set_handler(move || stop_tx.send(Event::Stop))
            .context("could not install Ctrl+C handler")?;

        let settings = config.settings.clone();
        std::thread::Builder::new()
            .name("space-observer".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        eprintln!("could not start runtime: {e}");
                        process::exit(1);
                    }
                };
                runtime.block_on(async move {
                    let observer = SpaceObserver::new(
                        SpaceStateReconciler::new(Actual, names),
                        &settings,
                        menu_tx,
                    );
                    let menu = Menu::new(&settings, menu_rx, LogPresenter);
                    let watcher = watch_names.then(|| {
                        NameWatcher::new(settings.names_file(), observer_tx.clone())
                    });

                    let background = async {
                        tokio::join!(watch_names_file(watcher), forward_refresh_signals(observer_tx));
                    };
                    tokio::select! {
                        _ = async { tokio::join!(observer.run(observer_rx), menu.run()) } => {}
                        _ = background => {}
                    }
                });
                info!("exiting");
                process::exit(0);
            })
            .context("could not spawn observer thread")?;

        app.run();
        Ok(())
    }

    async fn watch_names_file(watcher: Option<NameWatcher>) {
        let Some(watcher) = watcher else {
            return std::future::pending().await;
        };
        if let Err(e) = watcher.run().await {
            warn!("not watching the names file: {e}");
        }
        std::future::pending().await
    }

    /// `SIGUSR1` asks for an immediate refresh, e.g. from a hotkey daemon.
    async fn forward_refresh_signals(tx: space_observer::Sender) {
        let mut usr1 = match signal(SignalKind::user_defined1()) {
            Ok(s) => s,
            Err(e) => {
                warn!("could not listen for SIGUSR1: {e}");
                return std::future::pending().await;
            }
        };
        while usr1.recv().await.is_some() {
            tx.send(Event::Refresh);
        }
    }

    #[cfg(panic = "unwind")]
    fn install_panic_hook() {
        // Abort on panic instead of leaving the AppKit thread running without
        // an observer.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            original_hook(info);
            std::process::abort();
        }));
    }

    #[cfg(not(panic = "unwind"))]
    fn install_panic_hook() {}
}
