//! Ui
//!
//! The HTTP side: the bid form posts here, operators trigger clearing and
//! everybody can look at the status and, once cleared, the results.
use super::LoopService;
use crate::{
    auction::{Auction, BidForm, Phase, Rules},
    event::{Event, UiEvent},
    event_log,
    persistence::SharedPersistence,
    store::SharedAuctionStore,
};
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{debug, error, info};
use uuid::Uuid;

pub const UI_SERVICE_ID: &str = "ui";

#[derive(Clone)]
pub struct UiState {
    pub persistence: SharedPersistence,
    pub event_writer: event_log::SharedWriter,
    pub store: SharedAuctionStore,
    pub rules: Arc<Rules>,
}

impl UiState {
    fn load_auction(&self) -> Result<Auction> {
        let mut connection = self.persistence.get_connection()?;
        self.store.load(&mut *connection)
    }

    fn write(&self, event: Event) -> Result<()> {
        let mut connection = self.persistence.get_connection()?;
        self.event_writer.write(&mut *connection, &[event])?;
        Ok(())
    }
}

/// Anything unexpected; details go to the log, not to the client
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f)
        .await
        .context("blocking task failed")??)
}

pub fn router(state: UiState) -> Router {
    Router::new()
        .route("/", get(|| async { "Room auction: POST your bids to /bids" }))
        .route("/bids", post(submit_bids))
        .route("/clear", post(request_clearing))
        .route("/status", get(status))
        .route("/results", get(results))
        .with_state(state)
}

async fn submit_bids(
    State(state): State<UiState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let submission = match BidForm::from_fields(&fields, state.rules.positions)
        .into_submission(&state.rules)
    {
        Ok(Some(submission)) => submission,
        Ok(None) => {
            debug!("dropping form with the honeypot field filled in");
            return Ok(StatusCode::ACCEPTED.into_response());
        }
        Err(errors) => {
            debug!(%errors, "invalid bid form");
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response());
        }
    };

    let participant = submission.participant.id.clone();
    let refusal = blocking({
        let state = state.clone();
        move || {
            let auction = state.load_auction()?;
            if auction.phase() == Phase::Cleared {
                return Ok(Some("bidding is closed"));
            }
            // the registrar checks this again against the stored auction
            if submission.bids().is_some()
                && auction.snapshot().bidders().count() >= state.rules.positions
            {
                return Ok(Some("all positions already have a bidder"));
            }
            state.write(Event::Ui(UiEvent::BidSubmitted(submission)))?;
            Ok(None)
        }
    })
    .await?;

    if let Some(reason) = refusal {
        debug!(%participant, reason, "bid form refused");
        return Ok((StatusCode::CONFLICT, reason).into_response());
    }
    info!(%participant, "bid form received");
    Ok(StatusCode::ACCEPTED.into_response())
}

async fn request_clearing(State(state): State<UiState>) -> Result<StatusCode, ApiError> {
    blocking(move || state.write(Event::Ui(UiEvent::ClearRequested))).await?;
    info!("clearing requested");
    Ok(StatusCode::ACCEPTED)
}

#[derive(Serialize)]
struct Status {
    phase: Phase,
    participants: usize,
    bidders: usize,
    positions: usize,
    run_id: Option<Uuid>,
}

async fn status(State(state): State<UiState>) -> Result<Json<Status>, ApiError> {
    let positions = state.rules.positions;
    let auction = blocking(move || state.load_auction()).await?;
    Ok(Json(Status {
        phase: auction.phase(),
        participants: auction.snapshot().len(),
        bidders: auction.snapshot().bidders().count(),
        positions,
        run_id: auction.outcome().map(|o| o.run_id),
    }))
}

async fn results(State(state): State<UiState>) -> Result<Response, ApiError> {
    let auction = blocking(move || state.load_auction()).await?;
    Ok(match auction.outcome() {
        Some(outcome) => Json(outcome).into_response(),
        None => (StatusCode::NOT_FOUND, "auction not cleared yet").into_response(),
    })
}

pub struct Ui {
    // cancels all tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

async fn run_http_server(state: UiState, addr: SocketAddr) -> Result<()> {
    info!(%addr, "http server listening");
    axum::Server::try_bind(&addr)?
        .serve(router(state).into_make_service())
        .await?;

    Ok(())
}

impl Ui {
    pub fn new(state: UiState, addr: SocketAddr) -> Result<Self> {
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();

        runtime.spawn(async move {
            let res = run_http_server(state, addr)
                .await
                .with_context(|| format!("Failed to run http server on {addr}"));
            // the receiver is gone only when the service was dropped
            let _ = tx.send(res);
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

impl LoopService for Ui {
    fn get_service_id(&self) -> String {
        UI_SERVICE_ID.to_owned()
    }

    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(std::time::Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("ui server died without leaving a response?!"))
            }
        }
    }
}
