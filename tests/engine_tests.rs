use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crypto_alert_engine::broadcast::ServerEvent;
use crypto_alert_engine::collector::{CoinMarket, GlobalMarketData, MarketDataProvider};
use crypto_alert_engine::engine::AlertEngine;
use crypto_alert_engine::errors::{AlertError, Result};
use crypto_alert_engine::models::{AlertLevel, AlertType, CollectionStatus, MetricSnapshot};
use crypto_alert_engine::store::{AlertStore, InMemoryAlertStore, InMemoryMetricStore, MetricStore};
use crypto_alert_engine::utils::Config;

/// Provider returning a fixed market, counting fetches
struct ScriptedProvider {
    btc_price: f64,
    fear_greed: f64,
    fetch_count: AtomicUsize,
}

impl ScriptedProvider {
    fn new(btc_price: f64, fear_greed: f64) -> Self {
        Self {
            btc_price,
            fear_greed,
            fetch_count: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn fetch_markets(&self, _limit: usize) -> Result<Vec<CoinMarket>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(vec![CoinMarket {
            symbol: "btc".to_string(),
            current_price: self.btc_price,
            total_volume: Some(100.0),
            market_cap: Some(1_000_000_000.0),
            market_cap_rank: Some(1),
            price_change_percentage_24h: Some(0.0),
        }])
    }

    async fn fetch_global(&self) -> Result<GlobalMarketData> {
        Ok(GlobalMarketData {
            total_market_cap: Decimal::from(2_000_000),
            btc_dominance: 50.0,
        })
    }

    async fn fetch_fear_greed(&self) -> Result<f64> {
        Ok(self.fear_greed)
    }
}

/// Provider whose market fetch always errors
struct FailingProvider;

#[async_trait]
impl MarketDataProvider for FailingProvider {
    async fn fetch_markets(&self, _limit: usize) -> Result<Vec<CoinMarket>> {
        Err(AlertError::collection("provider unreachable"))
    }

    async fn fetch_global(&self) -> Result<GlobalMarketData> {
        Err(AlertError::collection("provider unreachable"))
    }

    async fn fetch_fear_greed(&self) -> Result<f64> {
        Err(AlertError::collection("provider unreachable"))
    }
}

fn test_config() -> Config {
    Config {
        collection_interval_ms: 100,
        detection_interval_ms: 5_000,
        stats_interval_ms: 5_000,
        ..Config::default()
    }
}

#[tokio::test]
async fn big_1h_move_is_admitted_and_broadcast() {
    let provider = Arc::new(ScriptedProvider::new(60_000.0, 50.0));
    let metric_store = Arc::new(InMemoryMetricStore::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    // BTC was at $50k one hour ago; the provider reports $60k now
    metric_store
        .append(MetricSnapshot {
            symbol: "BTC".to_string(),
            timestamp: Utc::now() - ChronoDuration::hours(1),
            price: Decimal::from(50_000),
            volume: Decimal::from(100),
            market_cap: Decimal::from(1_000_000_000u64),
            rank: 1,
        })
        .await
        .unwrap();

    let engine = AlertEngine::new(
        test_config(),
        metric_store,
        Arc::clone(&alert_store) as Arc<dyn AlertStore>,
        provider,
    );
    let (_id, mut rx) = engine.broadcaster().connect().await;

    engine.start().await.unwrap();

    let mut market_alert = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while market_alert.is_none() && tokio::time::Instant::now() < deadline {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(ServerEvent::MarketAlert(alert))) => market_alert = Some(alert),
            Ok(Some(_)) => {}
            _ => break,
        }
    }
    engine.stop().await;

    let alert = market_alert.expect("expected a market_alert event");
    assert_eq!(alert.symbol, "BTC");
    assert_eq!(alert.alert_type, AlertType::PriceChange);
    assert_eq!(alert.level, AlertLevel::High);
    assert!((alert.change_percent.unwrap() - 20.0).abs() < 0.01);

    // Persisted exactly once
    let recent = alert_store.find_recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);

    let stats = engine.system_stats().await.unwrap();
    assert_eq!(stats.alerts_today, 1);
}

#[tokio::test]
async fn double_start_keeps_a_single_timer_set() {
    let provider = Arc::new(ScriptedProvider::new(100.0, 50.0));
    let metric_store = Arc::new(InMemoryMetricStore::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let engine = AlertEngine::new(
        test_config(),
        metric_store,
        alert_store,
        Arc::clone(&provider) as Arc<dyn MarketDataProvider>,
    );

    engine.start().await.unwrap();
    engine.start().await.unwrap();
    assert!(engine.status().await.is_running);

    // ~1 immediate + ~5 ticks at 100ms; a duplicated timer set would
    // roughly double this
    tokio::time::sleep(Duration::from_millis(550)).await;
    engine.stop().await;

    let fetches = provider.fetches();
    assert!(
        (3..=8).contains(&fetches),
        "expected a single collection timer, saw {} fetches",
        fetches
    );
}

#[tokio::test]
async fn stop_is_idempotent_and_halts_cycles() {
    let provider = Arc::new(ScriptedProvider::new(100.0, 50.0));
    let engine = AlertEngine::new(
        test_config(),
        Arc::new(InMemoryMetricStore::new()),
        Arc::new(InMemoryAlertStore::new()),
        Arc::clone(&provider) as Arc<dyn MarketDataProvider>,
    );

    engine.start().await.unwrap();
    engine.stop().await;
    engine.stop().await;
    assert!(!engine.status().await.is_running);

    let fetches_after_stop = provider.fetches();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(provider.fetches(), fetches_after_stop, "no cycles may run after stop");
}

#[tokio::test]
async fn extreme_fear_produces_one_market_alert_via_pipeline() {
    let provider = Arc::new(ScriptedProvider::new(100.0, 10.0));
    let alert_store = Arc::new(InMemoryAlertStore::new());
    let engine = AlertEngine::new(
        test_config(),
        Arc::new(InMemoryMetricStore::new()),
        Arc::clone(&alert_store) as Arc<dyn AlertStore>,
        provider,
    );

    engine.start().await.unwrap();
    engine.stop().await;

    let recent = alert_store.find_recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].symbol, "MARKET");
    assert_eq!(recent[0].alert_type, AlertType::Sentiment);
    assert_eq!(recent[0].level, AlertLevel::High);
}

#[tokio::test]
async fn failed_collection_surfaces_as_degraded_in_stats() {
    let engine = AlertEngine::new(
        test_config(),
        Arc::new(InMemoryMetricStore::new()),
        Arc::new(InMemoryAlertStore::new()),
        Arc::new(FailingProvider),
    );

    // The immediate collection pass fails; the engine keeps running and
    // reports the degraded backend through its stats
    engine.start().await.unwrap();
    assert!(engine.status().await.is_running);

    let stats = engine.system_stats().await.unwrap();
    assert_eq!(stats.data_collection_status, CollectionStatus::Degraded);
    assert!(stats.last_collection.is_none());
    assert_eq!(stats.alerts_today, 0);

    engine.stop().await;
}

#[tokio::test]
async fn subscribers_receive_connected_ack_and_stats() {
    let provider = Arc::new(ScriptedProvider::new(100.0, 50.0));
    let engine = AlertEngine::new(
        test_config(),
        Arc::new(InMemoryMetricStore::new()),
        Arc::new(InMemoryAlertStore::new()),
        provider,
    );

    let (id, mut rx) = engine.broadcaster().connect().await;
    assert!(matches!(rx.recv().await, Some(ServerEvent::Connected { .. })));
    assert_eq!(engine.status().await.connected_subscribers, 1);

    let stats = engine.system_stats().await.unwrap();
    engine.broadcaster().broadcast_system_stats(stats).await;
    assert!(matches!(rx.recv().await, Some(ServerEvent::SystemStats(_))));

    engine.broadcaster().disconnect(id).await;
    assert_eq!(engine.status().await.connected_subscribers, 0);
}
