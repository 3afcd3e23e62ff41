use chrono::{Duration, Utc};
use std::sync::Arc;

use crypto_alert_engine::admission::AdmissionController;
use crypto_alert_engine::models::{AdmittedAlert, AlertLevel, AlertType, CandidateAlert};
use crypto_alert_engine::store::{AlertFilter, AlertStore, InMemoryAlertStore};
use crypto_alert_engine::utils::CooldownHours;

fn candidate(symbol: &str, alert_type: AlertType, level: AlertLevel) -> CandidateAlert {
    CandidateAlert {
        symbol: symbol.to_string(),
        alert_type,
        level,
        title: format!("{} test alert", symbol),
        description: "test".to_string(),
        change_percent: None,
        timeframe: None,
        volume: None,
        details: serde_json::json!({}),
        timestamp: Utc::now(),
    }
}

fn admitted(symbol: &str, alert_type: AlertType, level: AlertLevel, minutes_ago: i64) -> AdmittedAlert {
    let mut alert = AdmittedAlert::from_candidate(candidate(symbol, alert_type, level));
    alert.timestamp = Utc::now() - Duration::minutes(minutes_ago);
    alert
}

fn cooldowns() -> CooldownHours {
    CooldownHours {
        low: 24.0,
        medium: 4.0,
        high: 1.0,
    }
}

fn controller(store: Arc<InMemoryAlertStore>, per_symbol: usize, global: usize) -> AdmissionController {
    AdmissionController::new(store, cooldowns(), per_symbol, global)
}

#[tokio::test]
async fn price_change_in_cooldown_is_dropped() {
    let store = Arc::new(InMemoryAlertStore::new());
    store
        .create(&[admitted("BTC", AlertType::PriceChange, AlertLevel::High, 30)])
        .await
        .unwrap();

    let controller = controller(Arc::clone(&store), 10, 50);
    let result = controller
        .admit(vec![candidate("BTC", AlertType::PriceChange, AlertLevel::High)])
        .await
        .unwrap();

    assert!(result.is_empty(), "candidate inside the 1h cooldown must be dropped");
}

#[tokio::test]
async fn price_change_outside_cooldown_is_admitted() {
    let store = Arc::new(InMemoryAlertStore::new());
    store
        .create(&[admitted("BTC", AlertType::PriceChange, AlertLevel::High, 90)])
        .await
        .unwrap();

    let controller = controller(Arc::clone(&store), 10, 50);
    let result = controller
        .admit(vec![candidate("BTC", AlertType::PriceChange, AlertLevel::High)])
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].symbol, "BTC");
}

#[tokio::test]
async fn cooldown_is_keyed_by_level() {
    let store = Arc::new(InMemoryAlertStore::new());
    store
        .create(&[admitted("BTC", AlertType::PriceChange, AlertLevel::High, 30)])
        .await
        .unwrap();

    // Medium cooldown only conflicts with a prior Medium alert
    let controller = controller(Arc::clone(&store), 10, 50);
    let result = controller
        .admit(vec![candidate("BTC", AlertType::PriceChange, AlertLevel::Medium)])
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn per_symbol_daily_cap_is_enforced() {
    let store = Arc::new(InMemoryAlertStore::new());
    store
        .create(&[
            admitted("BTC", AlertType::VolumeSpike, AlertLevel::Medium, 200),
            admitted("BTC", AlertType::VolumeSpike, AlertLevel::Medium, 100),
        ])
        .await
        .unwrap();

    let controller = controller(Arc::clone(&store), 2, 50);
    let result = controller
        .admit(vec![
            candidate("BTC", AlertType::VolumeSpike, AlertLevel::High),
            candidate("ETH", AlertType::VolumeSpike, AlertLevel::Medium),
        ])
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].symbol, "ETH");
}

#[tokio::test]
async fn per_symbol_cap_counts_same_batch_admissions() {
    let store = Arc::new(InMemoryAlertStore::new());
    let controller = controller(Arc::clone(&store), 2, 50);

    let result = controller
        .admit(vec![
            candidate("SOL", AlertType::VolumeSpike, AlertLevel::Medium),
            candidate("SOL", AlertType::VolumeSpike, AlertLevel::High),
            candidate("SOL", AlertType::Sentiment, AlertLevel::High),
        ])
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
}

#[tokio::test]
async fn exhausted_global_cap_admits_nothing() {
    let store = Arc::new(InMemoryAlertStore::new());
    let existing: Vec<AdmittedAlert> = (0..50)
        .map(|i| {
            admitted(
                &format!("COIN{}", i),
                AlertType::VolumeSpike,
                AlertLevel::Medium,
                60,
            )
        })
        .collect();
    store.create(&existing).await.unwrap();

    let controller = controller(Arc::clone(&store), 10, 50);
    let result = controller
        .admit(vec![
            candidate("A", AlertType::VolumeSpike, AlertLevel::High),
            candidate("B", AlertType::VolumeSpike, AlertLevel::High),
            candidate("C", AlertType::VolumeSpike, AlertLevel::High),
            candidate("D", AlertType::VolumeSpike, AlertLevel::High),
            candidate("E", AlertType::VolumeSpike, AlertLevel::High),
        ])
        .await
        .unwrap();

    assert!(result.is_empty());

    let today = store
        .count(AlertFilter::since(Utc::now() - Duration::hours(12)))
        .await
        .unwrap();
    assert_eq!(today, 50, "store must still hold exactly the 50 prior alerts");
}

#[tokio::test]
async fn remaining_slots_go_to_highest_levels_in_detection_order() {
    let store = Arc::new(InMemoryAlertStore::new());
    let existing: Vec<AdmittedAlert> = (0..48)
        .map(|i| {
            admitted(
                &format!("COIN{}", i),
                AlertType::VolumeSpike,
                AlertLevel::Medium,
                60,
            )
        })
        .collect();
    store.create(&existing).await.unwrap();

    let controller = controller(Arc::clone(&store), 10, 50);
    let result = controller
        .admit(vec![
            candidate("LOW1", AlertType::VolumeSpike, AlertLevel::Low),
            candidate("HIGH1", AlertType::VolumeSpike, AlertLevel::High),
            candidate("MED1", AlertType::VolumeSpike, AlertLevel::Medium),
            candidate("HIGH2", AlertType::VolumeSpike, AlertLevel::High),
        ])
        .await
        .unwrap();

    // Two slots left: exactly the two High candidates, original order kept
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].symbol, "HIGH1");
    assert_eq!(result[1].symbol, "HIGH2");
}

#[tokio::test]
async fn per_symbol_cap_keeps_the_highest_levels() {
    let store = Arc::new(InMemoryAlertStore::new());
    let controller = controller(Arc::clone(&store), 1, 50);

    let result = controller
        .admit(vec![
            candidate("SOL", AlertType::VolumeSpike, AlertLevel::Low),
            candidate("SOL", AlertType::VolumeSpike, AlertLevel::High),
        ])
        .await
        .unwrap();

    // The symbol's single slot must go to the High candidate, not to
    // whichever one the detectors happened to emit first
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].level, AlertLevel::High);
}

#[tokio::test]
async fn global_truncation_does_not_consume_per_symbol_slots() {
    let store = Arc::new(InMemoryAlertStore::new());
    let existing: Vec<AdmittedAlert> = (0..49)
        .map(|i| {
            admitted(
                &format!("COIN{}", i),
                AlertType::VolumeSpike,
                AlertLevel::Medium,
                60,
            )
        })
        .collect();
    store.create(&existing).await.unwrap();

    // One global slot left, per-symbol cap of two. Candidates the global
    // cap drops must not count against SOL's daily allowance, so the
    // High candidate still gets the slot.
    let controller = controller(Arc::clone(&store), 2, 50);
    let result = controller
        .admit(vec![
            candidate("SOL", AlertType::VolumeSpike, AlertLevel::Medium),
            candidate("SOL", AlertType::VolumeSpike, AlertLevel::Low),
            candidate("SOL", AlertType::Sentiment, AlertLevel::High),
        ])
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].level, AlertLevel::High);
    assert_eq!(result[0].alert_type, AlertType::Sentiment);
}

#[tokio::test]
async fn admitted_alerts_are_persisted_and_dismissable() {
    let store = Arc::new(InMemoryAlertStore::new());
    let controller = controller(Arc::clone(&store), 10, 50);

    let result = controller
        .admit(vec![candidate("BTC", AlertType::PriceChange, AlertLevel::High)])
        .await
        .unwrap();
    assert_eq!(result.len(), 1);

    let recent = store.find_recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert!(!recent[0].dismissed);

    assert!(store.mark_dismissed(result[0].id).await.unwrap());
    let recent = store.find_recent(10).await.unwrap();
    assert!(recent[0].dismissed);

    assert!(!store.mark_dismissed(uuid::Uuid::new_v4()).await.unwrap());
}
