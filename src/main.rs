mod auction;
mod config;
mod event;
mod event_log;
mod persistence;
mod progress;
mod service;
mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cfg = config::Config::get().context("failed to read configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cfg.log).context("invalid log directives")?)
        .init();

    let rules = Arc::new(cfg.rules()?);
    let listen_addr = cfg.listen_addr()?;
    let deadline = cfg.deadline()?;
    info!(
        pricing_rule = %rules.pricing_rule,
        contribution = ?rules.non_bidder_contribution,
        split = ?rules.adjustment_split,
        target_total = %rules.precision.format(rules.target_total),
        positions = rules.positions,
        deadline = ?cfg.deadline,
        "starting room auction"
    );

    let persistence = persistence::InMemoryPersistence::new_shared();
    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let progress_store = progress::InMemoryProgressTracker::new_shared();
    let auction_store = store::InMemoryAuctionStore::new_shared();

    let svc_ctr = service::ServiceControl::new(persistence.clone(), progress_store);

    ctrlc::set_handler({
        let svc_ctr = svc_ctr.clone();
        move || {
            eprintln!("Stopping all services...");
            svc_ctr.stop_all();
        }
    })?;

    let mut handles = vec![
        svc_ctr.spawn_log_follower(
            service::Registrar::new(
                auction_store.clone(),
                event_writer.clone(),
                rules.clone(),
            ),
            event_reader.clone(),
        ),
        svc_ctr.spawn_log_follower(
            service::ClearingHouse::new(
                auction_store.clone(),
                event_writer.clone(),
                rules.clone(),
                cfg.tie_break_seed,
            ),
            event_reader.clone(),
        ),
        svc_ctr.spawn_loop(service::Ui::new(
            service::UiState {
                persistence: persistence.clone(),
                event_writer: event_writer.clone(),
                store: auction_store,
                rules,
            },
            listen_addr,
        )?),
    ];
    if let Some(at) = deadline {
        handles.push(svc_ctr.spawn_loop(service::Deadline::new(
            at,
            persistence,
            event_writer,
        )));
    }

    for handle in handles {
        handle.join()?
    }

    Ok(())
}
