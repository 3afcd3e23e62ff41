use chrono::{DateTime, NaiveTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::models::{AdmittedAlert, AlertType, CandidateAlert};
use crate::store::{AlertFilter, AlertStore};
use crate::utils::CooldownHours;

/// Turns detector candidates into admitted alerts under cooldown,
/// per-symbol daily cap and the priority-ordered global daily cap.
///
/// The only component allowed to write to the alert store. All admission
/// decisions are serialized through one internal lock so two overlapping
/// detection cycles cannot interleave their check-then-insert sequences.
pub struct AdmissionController {
    alert_store: Arc<dyn AlertStore>,
    cooldown_hours: CooldownHours,
    max_alerts_per_symbol_per_day: usize,
    max_global_alerts_per_day: usize,
    cycle_lock: Mutex<()>,
}

impl AdmissionController {
    pub fn new(
        alert_store: Arc<dyn AlertStore>,
        cooldown_hours: CooldownHours,
        max_alerts_per_symbol_per_day: usize,
        max_global_alerts_per_day: usize,
    ) -> Self {
        Self {
            alert_store,
            cooldown_hours,
            max_alerts_per_symbol_per_day,
            max_global_alerts_per_day,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Admit and persist one cycle's candidates. Everything not admitted
    /// is dropped silently; nothing is retried.
    pub async fn admit(&self, candidates: Vec<CandidateAlert>) -> Result<Vec<AdmittedAlert>> {
        let _guard = self.cycle_lock.lock().await;

        let now = Utc::now();
        let day_start = day_start(now);

        let mut survivors = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if candidate.alert_type == AlertType::PriceChange {
                let since = now - self.cooldown_hours.for_level(candidate.level);
                let conflicting = self
                    .alert_store
                    .most_recent(&candidate.symbol, candidate.level, AlertType::PriceChange, since)
                    .await?;
                if let Some(existing) = conflicting {
                    debug!(
                        "Dropping {} {:?} candidate: cooldown active since {}",
                        candidate.symbol, candidate.level, existing.timestamp
                    );
                    continue;
                }
            }

            survivors.push(candidate);
        }

        if survivors.is_empty() {
            return Ok(Vec::new());
        }

        let today_global = self.alert_store.count(AlertFilter::since(day_start)).await?;
        let remaining_slots = self.max_global_alerts_per_day.saturating_sub(today_global);
        if remaining_slots == 0 {
            warn!(
                "Global daily alert cap of {} exhausted, dropping {} candidates",
                self.max_global_alerts_per_day,
                survivors.len()
            );
            return Ok(Vec::new());
        }

        // Stable sort: ties keep original detection order
        survivors.sort_by_key(|c| Reverse(c.level.priority()));

        // Fill the remaining global slots in priority order. The per-symbol
        // cap is charged only against alerts that actually make the final
        // batch, so a candidate skipped here frees its slot for the next one.
        let mut symbol_counts: HashMap<String, usize> = HashMap::new();
        let mut admitted: Vec<AdmittedAlert> = Vec::with_capacity(remaining_slots.min(survivors.len()));

        for candidate in survivors {
            if admitted.len() == remaining_slots {
                debug!(
                    "Global slots for today filled, dropping lower-priority {} candidate",
                    candidate.symbol
                );
                continue;
            }

            if !symbol_counts.contains_key(&candidate.symbol) {
                let today_for_symbol = self
                    .alert_store
                    .count(AlertFilter::symbol_since(candidate.symbol.clone(), day_start))
                    .await?;
                symbol_counts.insert(candidate.symbol.clone(), today_for_symbol);
            }

            let count = symbol_counts.entry(candidate.symbol.clone()).or_insert(0);
            if *count >= self.max_alerts_per_symbol_per_day {
                debug!(
                    "Dropping {} candidate: daily per-symbol cap of {} reached",
                    candidate.symbol, self.max_alerts_per_symbol_per_day
                );
                continue;
            }

            *count += 1;
            admitted.push(AdmittedAlert::from_candidate(candidate));
        }

        if admitted.is_empty() {
            return Ok(Vec::new());
        }

        self.alert_store.create(&admitted).await?;

        info!("Admitted {} alert(s) this cycle", admitted.len());
        Ok(admitted)
    }
}

/// Start of the current UTC calendar day, the boundary both daily caps use
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
