//! Walk an app through one background/foreground round trip and print what
//! the lifecycle manager does.

use anyhow::Result;
use serde_json::json;
use statekeep_core::api::{
    ClosureStateObserver, InMemoryRepository, LifecycleConfig, LifecycleManager, LifecyclePhase,
    NavigationSlice, SliceObserver, StateKey,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let manager = LifecycleManager::new(
        Arc::new(InMemoryRepository::new()),
        LifecycleConfig::default(),
    );

    let mut event_rx = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            println!(
                "event {} ({:?} -> {}), persist={}",
                event.event_type(),
                event.previous_state(),
                event.current_state(),
                event.should_persist_state()
            );
        }
    });

    let navigation = Arc::new(SliceObserver::new(
        "router",
        NavigationSlice {
            current_route: Some("/levels/3".into()),
            navigation_stack: vec!["/".into(), "/levels".into(), "/levels/3".into()],
        },
    ));
    manager.register_state_observer(navigation.clone()).await?;

    let settings = ClosureStateObserver::builder("settings", StateKey::Config)
        .capture(|| match json!({ "theme": "dark", "soundEnabled": false }) {
            serde_json::Value::Object(map) => map,
            _ => Default::default(),
        })
        .restore_sync(|state| {
            println!("settings restored: {}", serde_json::Value::Object(state));
            Ok(())
        })
        .build();
    manager.register_state_observer(Arc::new(settings)).await?;

    manager.initialize().await?;

    for phase in [
        LifecyclePhase::Resumed,
        LifecyclePhase::Inactive,
        LifecyclePhase::Paused,
    ] {
        let report = manager.handle_phase_change(phase).await?;
        if let Some(id) = &report.persisted {
            println!("saved memento {id} with {:?}", report.captured);
        }
    }

    // the app lost its navigation state while in the background
    navigation.set(NavigationSlice::default());

    let report = manager.handle_phase_change(LifecyclePhase::Resumed).await?;
    println!("restored: {:?}", report.restored);
    println!("route after restore: {:?}", navigation.get().current_route);

    manager.dispose().await?;
    Ok(())
}
