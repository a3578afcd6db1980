//! Builds a ready controller: resolves the root set, renders every root that
//! loads, and wires the configured child loader.

use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use entity_source::{BackgroundLoader, Endpoints, HttpEntityRepository};
use map_core::{
    BlockingLoader, ChildLoader, EntityRepository, InteractionController, LoadOutcome,
    LoadRequest, load_entity,
};
use metrics::counter;
use tracing::{info, warn};

use crate::{
    commands::CommandBuffer,
    config::{IndexSource, LoaderMode, MapConfig},
    telemetry::FETCH_FAILURES_TOTAL,
};

pub type MapController = InteractionController<CommandBuffer, Box<dyn ChildLoader + Send>>;

/// Counts failed child fetches on their way to the controller.
struct CountingLoader<L> {
    inner: L,
}

impl<L: ChildLoader> ChildLoader for CountingLoader<L> {
    fn request(&mut self, request: LoadRequest) {
        self.inner.request(request);
    }

    fn poll(&mut self) -> Vec<LoadOutcome> {
        let outcomes = self.inner.poll();
        let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();
        if failed > 0 {
            counter!(FETCH_FAILURES_TOTAL).increment(failed as u64);
        }
        outcomes
    }
}

pub fn http_repository(config: &MapConfig) -> Result<Arc<dyn EntityRepository>> {
    let endpoints = Endpoints::new(&config.data_root)?.with_index_path(&config.index_path);
    let repository = HttpEntityRepository::new(endpoints, config.timeout)
        .context("Failed to build the entity repository")?;
    Ok(Arc::new(repository))
}

pub fn build_controller(
    config: &MapConfig,
    repository: Arc<dyn EntityRepository>,
    mode: LoaderMode,
) -> Result<MapController> {
    let span = tracing::info_span!("carbon_map.bootstrap", data_root = %config.data_root);
    let _guard = span.enter();
    let started = Instant::now();

    let roots = match &config.index {
        IndexSource::Static(roots) => roots.clone(),
        IndexSource::Remote => repository
            .fetch_index()
            .context("Failed to fetch the root index")?,
    };
    info!(roots = roots.len(), "root index resolved");

    let loader: Box<dyn ChildLoader + Send> = match mode {
        LoaderMode::Blocking => Box::new(CountingLoader {
            inner: BlockingLoader::new(repository.clone()),
        }),
        LoaderMode::Background => Box::new(CountingLoader {
            inner: BackgroundLoader::spawn(repository.clone(), config.fetch_workers)?,
        }),
    };

    let mut controller = InteractionController::new(
        CommandBuffer::default(),
        loader,
        roots.clone(),
        config.detail.clone(),
    );

    let mut rendered = 0usize;
    for id in &roots {
        match load_entity(repository.as_ref(), id) {
            Ok(loaded) => match controller.render_root(loaded) {
                Ok(Some(_)) => rendered += 1,
                Ok(None) => {}
                Err(err) => warn!("failed to render root {id}: {err}"),
            },
            Err(err) => {
                counter!(FETCH_FAILURES_TOTAL).increment(1);
                warn!("skipping root {id}: {err}");
            }
        }
    }
    info!(
        rendered,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "initial layers rendered"
    );

    Ok(controller)
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use map_core::{DisplayMode, Entity, EntityId, EventKind, LatLng, MapEvent};

    use super::*;
    use crate::testing::{MemoryRepository, campus, controller_for};

    #[test]
    fn renders_every_root_that_loads() {
        let repository = MemoryRepository::with_roots(&["X", "Y", "Z"])
            .insert(Entity::new("X", "Ex"))
            .insert(Entity::new("Y", "Why"))
            .insert_without_geometry(Entity::new("Z", "Zed"));
        let controller = controller_for(Arc::new(repository), LoaderMode::Blocking);

        assert_eq!(controller.registry().len(), 2);
        assert_eq!(
            controller.mode_of(&EntityId::from("Y")).unwrap(),
            DisplayMode::ParentIdle
        );
        assert!(controller.mode_of(&EntityId::from("Z")).is_err());
        assert_eq!(controller.surface().layer_count(), 2);
    }

    #[test]
    fn static_roots_skip_the_index() {
        let mut config = MapConfig::default();
        config.index = IndexSource::Static(vec![EntityId::from("X")]);
        let repository = Arc::new(MemoryRepository::with_roots(&[]).insert(Entity::new("X", "Ex")));
        let controller = build_controller(&config, repository, LoaderMode::Blocking).unwrap();
        assert_eq!(controller.session().hierarchy().roots(), &[EntityId::from("X")]);
    }

    #[test]
    fn background_loader_delivers_children_on_pump() {
        let mut controller = controller_for(Arc::new(campus()), LoaderMode::Background);
        controller
            .handle(&MapEvent::new(EventKind::Click, "X", LatLng::default()))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.registry().len() < 3 && Instant::now() < deadline {
            controller.pump();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(
            controller.mode_of(&EntityId::from("X.b")).unwrap(),
            DisplayMode::ChildVisibleIdle
        );
    }
}
