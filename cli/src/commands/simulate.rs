//! Scripted lifecycle run against demo slice observers.

use chrono::Utc;
use statekeep_core::api as core_api;
use statekeep_core::api::{
    ConfigSlice, CycleReport, LifecyclePhase, NavigationSlice, SessionSlice, SliceObserver,
};
use std::sync::Arc;

use crate::commands::cli::SimulateArgs;

const ROUND: [LifecyclePhase; 4] = [
    LifecyclePhase::Resumed,
    LifecyclePhase::Inactive,
    LifecyclePhase::Paused,
    LifecyclePhase::Resumed,
];

struct DemoObservers {
    session: Arc<SliceObserver<SessionSlice>>,
    navigation: Arc<SliceObserver<NavigationSlice>>,
    config: Arc<SliceObserver<ConfigSlice>>,
}

impl DemoObservers {
    fn new() -> Self {
        Self {
            session: Arc::new(SliceObserver::new(
                "demo.session",
                SessionSlice {
                    user_id: Some("demo-user".to_string()),
                    session_id: Some(demo_session_id()),
                    is_authenticated: true,
                    last_activity: Some(Utc::now()),
                    ..Default::default()
                },
            )),
            navigation: Arc::new(SliceObserver::new(
                "demo.navigation",
                NavigationSlice {
                    current_route: Some("/".to_string()),
                    navigation_stack: vec!["/".to_string()],
                },
            )),
            config: Arc::new(SliceObserver::new("demo.config", ConfigSlice::default())),
        }
    }

    /// Move the demo state forward so each save differs from the last.
    fn advance(&self, round: u32) {
        let route = format!("/level/{round}");
        self.navigation.update(|nav| {
            nav.navigation_stack.push(route.clone());
            nav.current_route = Some(route);
        });
        self.session.update(|s| s.last_activity = Some(Utc::now()));
        self.config
            .update(|c| c.theme = Some(if round % 2 == 0 { "dark" } else { "light" }.to_string()));
    }
}

fn demo_session_id() -> String {
    format!("sim-{}", Utc::now().timestamp_millis())
}

fn print_report(report: &CycleReport, json: bool) -> Result<(), core_api::CliError> {
    if json {
        let line = serde_json::to_string(report)
            .map_err(|e| core_api::CliError::Command(format!("encode report: {e}")))?;
        println!("{line}");
        return Ok(());
    }

    let mut line = format!("{:<20}", report.event_type.as_str());
    if let Some(id) = &report.persisted {
        line.push_str(&format!(" saved={id} [{}]", report.captured.join(",")));
    }
    if let Some(err) = &report.persist_error {
        line.push_str(&format!(" save_error={err}"));
    }
    if !report.restored.is_empty() {
        line.push_str(&format!(" restored=[{}]", report.restored.join(",")));
    }
    if !report.validation_skipped.is_empty() {
        line.push_str(&format!(" invalid=[{}]", report.validation_skipped.join(",")));
    }
    if !report.is_clean() {
        line.push_str(" (with failures)");
    }
    println!("{line}");
    Ok(())
}

pub async fn handle_simulate(
    args: SimulateArgs,
    ctx: &core_api::AppContext,
    json: bool,
) -> Result<i32, core_api::CliError> {
    let manager = ctx.manager();
    let demo = DemoObservers::new();
    manager.register_state_observer(demo.session.clone()).await?;
    manager.register_state_observer(demo.navigation.clone()).await?;
    manager.register_state_observer(demo.config.clone()).await?;
    manager.initialize().await?;

    let cold = manager.restore_now().await?;
    print_report(&cold, json)?;

    let mut failures = 0usize;
    for round in 1..=args.cycles {
        demo.advance(round);
        for phase in ROUND {
            let report = manager.handle_phase_change(phase).await?;
            if !report.is_clean() {
                failures += 1;
            }
            print_report(&report, json)?;
        }
    }

    if args.terminate {
        let report = manager.handle_phase_change(LifecyclePhase::Detached).await?;
        print_report(&report, json)?;
    }

    if !json {
        let nav = demo.navigation.get();
        println!(
            "final route: {}",
            nav.current_route.as_deref().unwrap_or("-")
        );
    }

    manager.dispose().await?;
    Ok(if failures == 0 { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use statekeep_core::api::{AppConfig, AppContext, InMemoryRepository, RepositoryProvider};

    #[tokio::test]
    async fn test_simulation_against_memory_repository() {
        let mut cfg = AppConfig::default();
        cfg.repository.provider = RepositoryProvider::Memory;
        let repo = Arc::new(InMemoryRepository::new());
        let ctx = AppContext::with_repository(cfg, repo.clone()).await.unwrap();

        let exit = handle_simulate(
            SimulateArgs {
                cycles: 2,
                terminate: false,
            },
            &ctx,
            true,
        )
        .await
        .unwrap();
        assert_eq!(exit, 0);
    }
}
