//! Subcommand dispatch.
//!
//! Every command opens the configured database; only `serve` keeps it open.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use reshare_core::providers::QuotaSnapshotProvider;
use reshare_core::{
    AgentIdentity, AllocationService, Clock, QuotaSnapshot, QuotaStatus, Store, SystemClock,
};

use crate::audit::{AuditEvent, AuditLogger};
use crate::config::{Command, IdentityCommand, QuotaCommand, Settings};
use crate::web::{ApiState, WebServer};

/// Run one subcommand to completion
pub async fn run(command: Command, settings: Settings) -> Result<()> {
    let store = Arc::new(open_store(&settings)?);

    match command {
        Command::Serve => serve(settings, store).await,
        Command::Recommend {
            name,
            current_interval,
        } => {
            let service = build_service(&settings, store)?;
            let recommendation = service
                .recommend_interval(&name, current_interval)
                .with_context(|| format!("Failed to compute interval for {}", name))?;
            AuditLogger::from_settings(&settings.audit).log(&AuditEvent::interval_recommended(
                &name,
                current_interval,
                &recommendation,
            ));
            print_json(&recommendation)
        }
        Command::Aggregate { date } => {
            let date = date.unwrap_or_else(yesterday);
            let agents = store
                .aggregate_day(date, Utc::now())
                .with_context(|| format!("Failed to aggregate {}", date))?;
            println!("Aggregated {} agent(s) for {}", agents, date);
            Ok(())
        }
        Command::Identity { action } => identity(action, &store),
        Command::Quota { action } => quota(action, &store, &settings),
    }
}

fn open_store(settings: &Settings) -> Result<Store> {
    Store::open(&settings.database_path)
        .with_context(|| format!("Failed to open database: {:?}", settings.database_path))
}

fn build_service(
    settings: &Settings,
    store: Arc<Store>,
) -> Result<AllocationService<Arc<Store>, Arc<dyn Clock>>> {
    let config = settings.allocation.to_config();
    config.validate().context("Invalid allocation settings")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(AllocationService::new(config, store, clock)
        .with_usage_window_hours(settings.usage_window_hours))
}

async fn serve(settings: Settings, store: Arc<Store>) -> Result<()> {
    let service = build_service(&settings, store)?;
    let audit = AuditLogger::from_settings(&settings.audit);
    if audit.is_enabled() {
        tracing::info!("Decision audit log: {:?}", settings.audit.path);
    }
    let state = Arc::new(ApiState::new(service, audit));
    WebServer::new(settings, state).run().await
}

fn identity(action: IdentityCommand, store: &Store) -> Result<()> {
    match action {
        IdentityCommand::Set {
            name,
            model,
            cost_multiplier,
            collab_pref,
            inactive,
        } => {
            let mut identity = AgentIdentity::new(name, cost_multiplier, collab_pref)
                .context("Invalid identity")?;
            identity.model = model;
            identity.active = !inactive;
            store
                .upsert_identity(&identity, Utc::now())
                .context("Failed to save identity")?;
            tracing::info!("Registered {}", identity.name);
            print_json(&identity)
        }
        IdentityCommand::List => {
            let identities = store
                .list_identities()
                .context("Failed to list identities")?;
            print_json(&identities)
        }
    }
}

fn quota(action: QuotaCommand, store: &Store, settings: &Settings) -> Result<()> {
    match action {
        QuotaCommand::Record {
            session,
            week,
            week_sonnet,
            session_reset,
            week_reset,
        } => {
            let snapshot = QuotaSnapshot {
                session_percent_used: session,
                week_percent_used: week,
                week_sonnet_percent_used: week_sonnet,
                session_reset,
                week_reset,
                observed_at: Utc::now(),
            }
            .normalized();
            store
                .insert_quota_snapshot(&snapshot)
                .context("Failed to store quota reading")?;
            AuditLogger::from_settings(&settings.audit)
                .log(&AuditEvent::quota_recorded(&snapshot));
            println!(
                "Recorded quota: session {}%, week {}% ({})",
                snapshot.session_percent_used,
                snapshot.week_percent_used,
                QuotaStatus::from_week_percent(snapshot.week_percent_used)
            );
            Ok(())
        }
        QuotaCommand::Latest => match store
            .latest_quota_snapshot()
            .context("Failed to read quota")?
        {
            Some(snapshot) => print_json(&snapshot),
            None => {
                println!("No quota data available");
                Ok(())
            }
        },
    }
}

fn yesterday() -> NaiveDate {
    (Utc::now() - Duration::days(1)).date_naive()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
