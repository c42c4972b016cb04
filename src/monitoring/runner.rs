//! The per-tick check pipeline: re-verify, probe, persist, evaluate, publish.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use super::probe::{CheckResult, Prober};
use super::scheduler::{TickOutcome, TickRunner};
use crate::alerting::AlertEngine;
use crate::db::entities::endpoint_metric;
use crate::db::services::{endpoint_service, metric_service};
use crate::realtime::{EventHub, WsMessage};

pub struct MonitorTickRunner {
    db: DatabaseConnection,
    prober: Arc<Prober>,
    engine: Arc<AlertEngine>,
    hub: Arc<EventHub>,
}

impl MonitorTickRunner {
    pub fn new(
        db: DatabaseConnection,
        prober: Arc<Prober>,
        engine: Arc<AlertEngine>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            db,
            prober,
            engine,
            hub,
        }
    }

    /// One out-of-schedule check cycle, used by the debug endpoint: probes,
    /// records the metric and pushes the live event, without touching alert
    /// state.
    pub async fn run_manual_check(
        &self,
        endpoint: &crate::db::entities::endpoint::Model,
    ) -> Result<(CheckResult, endpoint_metric::Model), sea_orm::DbErr> {
        let result = self.prober.probe(&endpoint.url).await;
        let metric = metric_service::insert_metric(&self.db, endpoint.id, &result).await?;
        if let Some(owner_id) = endpoint.user_id {
            self.hub
                .publish(owner_id, WsMessage::MetricRecorded(metric.clone()));
        }
        Ok((result, metric))
    }
}

#[async_trait]
impl TickRunner for MonitorTickRunner {
    async fn run_tick(&self, endpoint_id: i32) -> TickOutcome {
        // State may have moved since this entry was scheduled; re-check at
        // fire time.
        let ctx = match endpoint_service::find_endpoint_for_check(&self.db, endpoint_id).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => {
                info!(endpoint_id, "Endpoint deleted; dropping its schedule.");
                return TickOutcome::Stale;
            }
            Err(e) => {
                // Leave the schedule alone; the store may just be briefly
                // unavailable.
                error!(endpoint_id, error = %e, "Failed to load endpoint for tick.");
                return TickOutcome::Completed;
            }
        };

        if !ctx.endpoint.is_active {
            info!(endpoint_id, "Endpoint paused; dropping its schedule.");
            return TickOutcome::Stale;
        }
        if ctx.owner.is_none() {
            info!(endpoint_id, "Endpoint has no owner; dropping its schedule.");
            return TickOutcome::Stale;
        }

        let result = self.prober.probe(&ctx.endpoint.url).await;

        let metric = match metric_service::insert_metric(&self.db, endpoint_id, &result).await {
            Ok(metric) => metric,
            Err(e) => {
                // No alert evaluation without a persisted metric.
                error!(endpoint_id, error = %e, "Failed to persist metric; aborting tick.");
                return TickOutcome::Completed;
            }
        };

        if let Some(owner) = &ctx.owner {
            self.hub
                .publish(owner.id, WsMessage::MetricRecorded(metric));
        }

        self.engine.process(&ctx, &result).await;
        TickOutcome::Completed
    }
}
