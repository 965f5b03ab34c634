mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{map, session_state};
use pretty_assertions::assert_eq;
use serde_json::json;
use statekeep_core::error::RepositoryError;
use statekeep_core::event::LifecyclePhase;
use statekeep_core::memento::{AppStateMemento, StateMemento};
use statekeep_core::repository::{
    is_compressed_record, InMemoryRepository, MementoRepository, RepositoryStatistics,
};
use std::time::Duration;

fn memento_at(id: &str, secs: i64, uid: &str) -> AppStateMemento {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap();
    let mut m = AppStateMemento::new(LifecyclePhase::Paused)
        .with_id(id)
        .with_timestamp(t0 + ChronoDuration::seconds(secs));
    m.user_session = map(session_state(uid));
    m
}

#[tokio::test]
async fn latest_and_listing_follow_timestamps() {
    let repo = InMemoryRepository::new();
    repo.initialize().await.unwrap();

    repo.save_memento(&memento_at("s2", 60, "u2")).await.unwrap();
    repo.save_memento(&memento_at("s1", 0, "u1")).await.unwrap();

    let latest = repo.get_latest_memento().await.unwrap().unwrap();
    assert_eq!(latest.id, "s2");
    assert_eq!(latest.user_session.get("userId"), Some(&json!("u2")));

    let ids: Vec<String> = repo
        .get_all_mementos()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
}

#[tokio::test]
async fn large_payload_round_trips_through_compression() {
    let repo = InMemoryRepository::new();
    repo.initialize().await.unwrap();

    let text: String = "abcdefghij".repeat(200);
    assert_eq!(text.len(), 2000);
    let mut m = memento_at("big", 0, "u1");
    m.pattern_states.insert("transcript".into(), json!(text));
    repo.save_memento(&m).await.unwrap();

    let raw = repo.raw_record("big").await.unwrap();
    assert!(is_compressed_record(&raw));

    let loaded = repo.get_memento_by_id("big").await.unwrap().unwrap();
    assert_eq!(loaded, m);
    assert_eq!(repo.get_statistics().await.unwrap().compressed_count, 1);
}

#[tokio::test]
async fn missing_ids_are_not_errors() {
    let repo = InMemoryRepository::new();
    repo.initialize().await.unwrap();
    assert!(repo.get_memento_by_id("nope").await.unwrap().is_none());
    assert!(!repo.delete_memento("nope").await.unwrap());
    assert!(repo.get_latest_memento().await.unwrap().is_none());
}

#[tokio::test]
async fn empty_repository_statistics_are_zero() {
    let repo = InMemoryRepository::new();
    repo.initialize().await.unwrap();
    assert_eq!(
        repo.get_statistics().await.unwrap(),
        RepositoryStatistics::default()
    );
}

#[tokio::test]
async fn statistics_cover_every_record() {
    let repo = InMemoryRepository::new();
    repo.initialize().await.unwrap();
    repo.save_memento(&memento_at("a", 0, "u1")).await.unwrap();
    repo.save_memento(&memento_at("b", 30, "u2").with_originator("user"))
        .await
        .unwrap();

    let stats = repo.get_statistics().await.unwrap();
    assert_eq!(stats.total_mementos, 2);
    assert_eq!(stats.oldest_timestamp, Some(memento_at("a", 0, "u").timestamp));
    assert_eq!(stats.newest_timestamp, Some(memento_at("b", 30, "u").timestamp));
    assert!(stats.total_size_bytes > 0);
    assert!(stats.average_age_secs > 0.0);
    assert_eq!(stats.originator_counts.get("app"), Some(&1));
    assert_eq!(stats.originator_counts.get("user"), Some(&1));
}

#[tokio::test]
async fn disposed_repository_reports_not_initialized() {
    let repo = InMemoryRepository::new();
    repo.initialize().await.unwrap();
    repo.dispose().await.unwrap();
    assert!(matches!(
        repo.get_all_mementos().await,
        Err(RepositoryError::NotInitialized)
    ));
}

#[test]
fn staleness_is_relative_to_now() {
    let now = Utc::now();
    let m = AppStateMemento::new(LifecyclePhase::Paused)
        .with_timestamp(now - ChronoDuration::minutes(5));

    assert!(m.is_stale_at(Duration::from_secs(60), now));
    assert!(!m.is_stale_at(Duration::from_secs(600), now));
    assert!(StateMemento::age(&m) >= Duration::from_secs(300));
}
