use clap::Parser;
mod commands;
use commands::cli;
use statekeep_core::config::RepositoryProvider;
use statekeep_core::context::AppContext;
use statekeep_core::error;
use statekeep_core::event::LifecycleEvent;
use statekeep_plugins::factory::StandardRepositoryFactory;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let mut cfg = match args.config.as_deref() {
        Some(path) => statekeep_core::config::load_file(path),
        None => statekeep_core::config::load_default(),
    }
    .map_err(|e| error::CliError::Config(e.to_string()))?;

    if args.memory {
        cfg.repository.provider = RepositoryProvider::Memory;
    } else if let Some(dir) = args.dir.as_ref() {
        match cfg.repository.provider {
            RepositoryProvider::File(ref mut file_cfg) => file_cfg.directory = dir.clone(),
            RepositoryProvider::Memory => {
                return Err(error::CliError::Config(
                    "--dir requires the file repository provider".to_string(),
                ))
            }
        }
    }

    init_tracing(&cfg.logging).map_err(error::CliError::Config)?;

    let ctx = AppContext::new(cfg, Arc::new(StandardRepositoryFactory)).await?;

    let mut event_rx = ctx.manager().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            log_event(&event);
        }
    });

    dispatch(args.command, args.json, &ctx).await
}

fn log_event(event: &LifecycleEvent) {
    tracing::debug!(
        event_id = %event.event_id(),
        event_type = %event.event_type(),
        priority = ?event.priority(),
        "event broadcast"
    );
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 1: requested memento not found (returned as a normal exit code)
    // 11: config error
    // 20: repository / IO error
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Repository(_) => 20,
        error::CliError::Lifecycle(le) => match le {
            error::LifecycleError::Repository(_) => 20,
            error::LifecycleError::NotInitialized | error::LifecycleError::Disposed => 50,
        },
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Anyhow(_) => 50,
    }
}

async fn dispatch(
    cmd: cli::Commands,
    json: bool,
    ctx: &AppContext,
) -> Result<i32, error::CliError> {
    match cmd {
        cli::Commands::Stats => commands::repo::handle_stats(ctx, json).await.map(|_| 0),
        cli::Commands::List => commands::repo::handle_list(ctx, json).await.map(|_| 0),
        cli::Commands::Latest => commands::repo::handle_latest(ctx, json).await,
        cli::Commands::Show(args) => commands::repo::handle_show(args, ctx, json).await,
        cli::Commands::Delete(args) => commands::repo::handle_delete(args, ctx).await,
        cli::Commands::Clear(args) => commands::repo::handle_clear(args, ctx).await.map(|_| 0),
        cli::Commands::Simulate(args) => {
            commands::simulate::handle_simulate(args, ctx, json).await
        }
    }
}

fn init_tracing(logging: &statekeep_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("statekeep"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("statekeep.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
