//! Applies alert-state decisions to the store and fans the results out.

use std::sync::Arc;

use sea_orm::{DatabaseConnection, DbErr};
use tracing::{error, info, warn};

use super::transitions::{on_failure, on_success, RecoveryAction};
use crate::db::services::{alert_service, endpoint_service};
use crate::db::services::endpoint_service::EndpointForCheck;
use crate::monitoring::probe::CheckResult;
use crate::notifications::{NotificationDispatcher, NotificationKind};
use crate::realtime::{EndpointStatePayload, EventHub, WsMessage};

pub struct AlertEngine {
    db: DatabaseConnection,
    hub: Arc<EventHub>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl AlertEngine {
    pub fn new(
        db: DatabaseConnection,
        hub: Arc<EventHub>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            db,
            hub,
            dispatcher,
        }
    }

    /// Consumes one check result for an endpoint whose metric has already
    /// been persisted. Store errors abort this endpoint's evaluation and are
    /// logged; they never propagate into the scheduler.
    pub async fn process(&self, ctx: &EndpointForCheck, result: &CheckResult) {
        if let Err(e) = self.process_inner(ctx, result).await {
            error!(
                endpoint_id = ctx.endpoint.id,
                error = %e,
                "Alert evaluation aborted for this tick."
            );
        }
    }

    async fn process_inner(&self, ctx: &EndpointForCheck, result: &CheckResult) -> Result<(), DbErr> {
        let ep = &ctx.endpoint;
        let Some(owner) = &ctx.owner else {
            // Ownerless endpoints keep their metrics, but there is nobody to
            // alert or notify.
            warn!(endpoint_id = ep.id, "Skipping alert evaluation: endpoint has no owner.");
            return Ok(());
        };

        if result.status.is_failure() {
            self.handle_failure(ctx, owner.id, result).await
        } else if ep.consecutive_fails > 0 {
            self.handle_recovery(ctx, owner.id).await
        } else {
            // Steady healthy state.
            Ok(())
        }
    }

    async fn handle_failure(
        &self,
        ctx: &EndpointForCheck,
        owner_id: i32,
        result: &CheckResult,
    ) -> Result<(), DbErr> {
        let ep = &ctx.endpoint;
        let new_count = endpoint_service::increment_failure_counter(&self.db, ep.id).await?;
        let open_alert = alert_service::find_open_alert(&self.db, ep.id).await?;

        if !on_failure(new_count, ep.alert_on_consecutive_fails, open_alert.is_some()) {
            info!(
                endpoint_id = ep.id,
                fails = new_count,
                threshold = ep.alert_on_consecutive_fails,
                "Failure recorded; no alert transition."
            );
            return Ok(());
        }

        // The endpoint may have been paused while this tick was in flight;
        // don't open an alert for something nobody is monitoring anymore.
        if !endpoint_service::is_endpoint_active(&self.db, ep.id).await? {
            info!(endpoint_id = ep.id, "Endpoint paused mid-check; suppressing alert.");
            return Ok(());
        }

        let message = format!("Endpoint is down (status code: {})", result.status_code);
        let alert = alert_service::create_alert(&self.db, ep.id, message).await?;
        info!(endpoint_id = ep.id, alert_id = alert.id, "Alert TRIGGERED.");

        self.hub.publish(owner_id, WsMessage::AlertTriggered(alert));
        self.hub.publish(
            owner_id,
            WsMessage::EndpointStateChanged(EndpointStatePayload {
                endpoint_id: ep.id,
                is_active: ep.is_active,
                consecutive_fails: new_count,
                has_open_alert: true,
            }),
        );

        self.notify(ctx, NotificationKind::Failure).await;
        Ok(())
    }

    async fn handle_recovery(&self, ctx: &EndpointForCheck, owner_id: i32) -> Result<(), DbErr> {
        let ep = &ctx.endpoint;
        let open_alert = alert_service::find_open_alert(&self.db, ep.id).await?;

        match on_success(ep.consecutive_fails, open_alert.is_some()) {
            RecoveryAction::Nothing => Ok(()),
            RecoveryAction::ResetCounter => {
                endpoint_service::reset_failure_counter(&self.db, ep.id).await?;
                info!(endpoint_id = ep.id, "Recovered below threshold; counter reset.");
                Ok(())
            }
            RecoveryAction::ResetAndResolve => {
                endpoint_service::reset_failure_counter(&self.db, ep.id).await?;

                if !endpoint_service::is_endpoint_active(&self.db, ep.id).await? {
                    info!(endpoint_id = ep.id, "Endpoint paused mid-check; suppressing resolution.");
                    return Ok(());
                }

                let Some(open) = open_alert else {
                    return Ok(());
                };
                let resolved = alert_service::resolve_alert(&self.db, open.id).await?;
                info!(endpoint_id = ep.id, alert_id = resolved.id, "Alert RESOLVED.");

                self.hub.publish(owner_id, WsMessage::AlertResolved(resolved));
                self.hub.publish(
                    owner_id,
                    WsMessage::EndpointStateChanged(EndpointStatePayload {
                        endpoint_id: ep.id,
                        is_active: ep.is_active,
                        consecutive_fails: 0,
                        has_open_alert: false,
                    }),
                );

                self.notify(ctx, NotificationKind::Recovery).await;
                Ok(())
            }
        }
    }

    async fn notify(&self, ctx: &EndpointForCheck, kind: NotificationKind) {
        if ctx.endpoint.is_muted {
            info!(
                endpoint_id = ctx.endpoint.id,
                "Endpoint is muted; skipping {kind:?} notification."
            );
            return;
        }
        self.dispatcher
            .dispatch(&ctx.endpoint, &ctx.channels, kind)
            .await;
    }
}
