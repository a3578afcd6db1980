//! Actix Web server exposing the map page, its event API and Prometheus metrics.
//!
//! The server runs on a dedicated thread; the main thread only waits for
//! Ctrl+C. Controller work happens on the blocking pool because the HTTP
//! repository and the mutex it sits behind are both blocking.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, Once, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use actix_web::{App, HttpResponse, HttpServer, web};
use anyhow::{Context, Result};
use map_core::{ControllerError, RegistryError};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::{
    bootstrap::{self, MapController},
    commands::RenderCommand,
    config::{MapConfig, Viewport},
    dispatch::{ClientEvent, dispatch},
    html::page::MAP_INDEX_HTML,
    telemetry,
};

/// Controller plus the last event sequence number it has applied.
struct Sequenced {
    controller: MapController,
    last_seq: u64,
}

/// Shared state backing HTTP handlers.
pub(crate) struct ServerState {
    inner: Mutex<Sequenced>,
    viewport: Viewport,
}

impl ServerState {
    fn new(controller: MapController, viewport: Viewport) -> Self {
        Self {
            inner: Mutex::new(Sequenced {
                controller,
                last_seq: 0,
            }),
            viewport,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sequenced> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_controller<T>(&self, f: impl FnOnce(&mut MapController) -> Result<T>) -> Result<T> {
        f(&mut self.lock().controller)
    }

    /// Events numbered at or below the last applied one arrived out of order
    /// and are dropped.
    fn dispatch(&self, event: ClientEvent) -> Result<Vec<RenderCommand>> {
        let mut guard = self.lock();
        if let Some(seq) = event.seq {
            if seq <= guard.last_seq {
                debug!(seq, last = guard.last_seq, "dropping out-of-order event");
                return Ok(Vec::new());
            }
            guard.last_seq = seq;
        }
        dispatch(&mut guard.controller, event)
    }

    fn pending(&self) -> Result<Vec<RenderCommand>> {
        self.with_controller(|controller| {
            controller.pump();
            Ok(controller.surface_mut().drain())
        })
    }

    /// A freshly loaded page starts its event numbering again.
    fn snapshot(&self) -> Result<Vec<RenderCommand>> {
        let mut guard = self.lock();
        guard.last_seq = 0;
        guard.controller.pump();
        Ok(guard.controller.surface_mut().snapshot())
    }
}

/// Handle for the map server thread.
pub(crate) struct MapServer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MapServer {
    fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the server to stop and block until the thread exits.
    pub(crate) fn stop(self) {
        if let Some(tx) = self.shutdown {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle {
            let _ = handle.join();
        }
    }
}

/// Bootstrap the controller and serve until Ctrl+C.
pub fn run(config: MapConfig) -> Result<()> {
    static CTRL_HANDLER: Once = Once::new();

    telemetry::init_metrics_recorder()?;
    let repository = bootstrap::http_repository(&config)?;
    let controller = bootstrap::build_controller(&config, repository, config.loader)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    CTRL_HANDLER.call_once(move || {
        if let Err(err) = ctrlc::set_handler(move || {
            handler_shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    });

    let layers = controller.surface().layer_count();
    let state = web::Data::new(ServerState::new(controller, config.viewport.clone()));
    let server = spawn_map_server(state, config.bind.clone(), config.port)?;
    info!(layers, "carbon map listening on http://{}:{}", config.bind, config.port);

    while !shutdown.load(Ordering::SeqCst) && server.is_running() {
        thread::sleep(Duration::from_millis(200));
    }
    info!("shutting down");
    server.stop();
    Ok(())
}

/// Spawn the server thread and return a handle that can stop it.
pub(crate) fn spawn_map_server(
    state: web::Data<ServerState>,
    bind: String,
    port: u16,
) -> Result<MapServer> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = thread::Builder::new()
        .name("carbon-map-server".into())
        .spawn(move || {
            if let Err(err) = actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(state.clone())
                        .route("/", web::get().to(index_route))
                        .route("/config", web::get().to(config_route))
                        .route("/snapshot", web::get().to(snapshot_route))
                        .route("/commands", web::get().to(commands_route))
                        .route("/events", web::post().to(events_route))
                        .route("/metrics", web::get().to(metrics_route))
                })
                .bind((bind.as_str(), port))?
                .run();

                let srv_handle = server.handle();
                actix_web::rt::spawn(async move {
                    let _ = shutdown_rx.await;
                    srv_handle.stop(true).await;
                });

                server.await
            }) {
                error!("HTTP server error: {err}");
            }
        })
        .context("Failed to spawn map server thread")?;
    Ok(MapServer {
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

/// Serve the map page.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(MAP_INDEX_HTML)
}

async fn config_route(state: web::Data<ServerState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.viewport)
}

/// Every rendered layer, for a page that has just loaded.
async fn snapshot_route(state: web::Data<ServerState>) -> HttpResponse {
    respond(web::block(move || state.snapshot()).await)
}

/// Commands queued since the last request, including children delivered by
/// background fetches.
async fn commands_route(state: web::Data<ServerState>) -> HttpResponse {
    respond(web::block(move || state.pending()).await)
}

async fn events_route(
    state: web::Data<ServerState>,
    event: web::Json<ClientEvent>,
) -> HttpResponse {
    let event = event.into_inner();
    respond(web::block(move || state.dispatch(event)).await)
}

async fn metrics_route() -> HttpResponse {
    match telemetry::prometheus_handle() {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::ServiceUnavailable().body("metrics recorder not installed"),
    }
}

fn respond(
    outcome: Result<Result<Vec<RenderCommand>>, actix_web::error::BlockingError>,
) -> HttpResponse {
    match outcome {
        Ok(Ok(commands)) => HttpResponse::Ok().json(commands),
        Ok(Err(err)) => {
            error!("{err:#}");
            match err.downcast_ref::<ControllerError>() {
                Some(ControllerError::Registry(RegistryError::UnknownEntity(_))) => {
                    HttpResponse::NotFound().body(format!("{err:#}"))
                }
                Some(ControllerError::Registry(_)) => {
                    HttpResponse::InternalServerError().body(format!("{err:#}"))
                }
                Some(_) => HttpResponse::UnprocessableEntity().body(format!("{err:#}")),
                None => HttpResponse::BadRequest().body(format!("{err:#}")),
            }
        }
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}
