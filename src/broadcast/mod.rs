use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{AdmittedAlert, MarketOverview, SystemStats};

pub type SubscriberId = Uuid;

/// Named events pushed to subscribers over the real-time channel
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected { subscriber_id: SubscriberId },
    MarketAlert(AdmittedAlert),
    MarketUpdate(MarketOverview),
    SystemStats(SystemStats),
}

/// Stateless real-time fan-out to all connected subscribers.
///
/// Holds only the subscriber set; no alert history and no per-subscriber
/// queues. The set is the single shared mutable resource of the pipeline
/// and is only ever touched through these methods. Delivery is
/// fire-and-forget: a subscriber whose channel is gone is pruned, never
/// retried.
#[derive(Clone, Default)]
pub struct Broadcaster {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and hand back its event channel. The new
    /// subscriber receives a `connected` ack as its first event.
    pub async fn connect(&self) -> (SubscriberId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let _ = tx.send(ServerEvent::Connected { subscriber_id: id });

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, tx);
        info!("Subscriber {} connected ({} total)", id, subscribers.len());

        (id, rx)
    }

    pub async fn disconnect(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            info!("Subscriber {} disconnected ({} total)", id, subscribers.len());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Push one `market_alert` event per admitted alert to every subscriber
    pub async fn broadcast_alerts(&self, alerts: &[AdmittedAlert]) {
        for alert in alerts {
            self.emit(ServerEvent::MarketAlert(alert.clone())).await;
        }
    }

    pub async fn broadcast_market_snapshot(&self, overview: MarketOverview) {
        self.emit(ServerEvent::MarketUpdate(overview)).await;
    }

    pub async fn broadcast_system_stats(&self, stats: SystemStats) {
        self.emit(ServerEvent::SystemStats(stats)).await;
    }

    async fn emit(&self, event: ServerEvent) {
        let dead: Vec<SubscriberId> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .filter_map(|(id, tx)| tx.send(event.clone()).err().map(|_| *id))
                .collect()
        };

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in dead {
                subscribers.remove(&id);
                debug!("Pruned dead subscriber {}", id);
            }
        }
    }
}
