use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use map_core::{
    ChildLoader, EntityRepository, LoadOutcome, LoadRequest, RepositoryError, load_entity,
};
use tracing::{debug, warn};

/// Child loader backed by a pool of fetch threads.
///
/// Requests return immediately; outcomes accumulate on a channel until the
/// controller polls. Dropping the loader closes the request channel and lets
/// the workers wind down once their current fetch returns.
pub struct BackgroundLoader {
    requests: Sender<LoadRequest>,
    outcomes: Receiver<LoadOutcome>,
    rejected: Vec<LoadOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl BackgroundLoader {
    pub fn spawn(repository: Arc<dyn EntityRepository>, workers: usize) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (outcome_tx, outcome_rx) = unbounded::<LoadOutcome>();

        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let repository = repository.clone();
            let request_rx = request_rx.clone();
            let outcome_tx = outcome_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("entity-fetch-{index}"))
                .spawn(move || fetch_loop(repository, request_rx, outcome_tx))
                .context("Failed to spawn entity fetch worker")?;
            handles.push(handle);
        }

        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
            rejected: Vec::new(),
            workers: handles,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl ChildLoader for BackgroundLoader {
    fn request(&mut self, request: LoadRequest) {
        if let Err(err) = self.requests.send(request) {
            let request = err.into_inner();
            warn!("fetch workers are gone; dropping request for {}", request.child);
            self.rejected.push(LoadOutcome {
                result: Err(RepositoryError::Network {
                    target: request.child.to_string(),
                    message: "fetch workers stopped".to_string(),
                }),
                parent: request.parent,
                child: request.child,
            });
        }
    }

    fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut ready = std::mem::take(&mut self.rejected);
        ready.extend(self.outcomes.try_iter());
        ready
    }
}

fn fetch_loop(
    repository: Arc<dyn EntityRepository>,
    requests: Receiver<LoadRequest>,
    outcomes: Sender<LoadOutcome>,
) {
    for request in requests.iter() {
        let span = tracing::debug_span!("fetch.child", child = %request.child);
        let _guard = span.enter();
        let result = load_entity(repository.as_ref(), &request.child);
        debug!(ok = result.is_ok(), "child fetch finished");
        if outcomes
            .send(LoadOutcome {
                parent: request.parent,
                child: request.child,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        time::{Duration, Instant},
    };

    use map_core::{Entity, EntityId, Feature, FeatureCollection};

    use super::*;

    struct StaticRepository {
        entities: HashMap<EntityId, Entity>,
    }

    impl EntityRepository for StaticRepository {
        fn fetch_index(&self) -> Result<Vec<EntityId>, RepositoryError> {
            Ok(self.entities.keys().cloned().collect())
        }

        fn fetch_entity(&self, id: &EntityId) -> Result<Entity, RepositoryError> {
            self.entities
                .get(id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound {
                    target: id.to_string(),
                })
        }

        fn fetch_geometry(&self, _id: &EntityId) -> Result<FeatureCollection, RepositoryError> {
            Ok(FeatureCollection::new(vec![Feature::new(serde_json::json!({
                "type": "Point",
                "coordinates": [0.12, 52.2]
            }))]))
        }
    }

    fn poll_until(loader: &mut BackgroundLoader, expected: usize) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut collected = Vec::new();
        while collected.len() < expected && Instant::now() < deadline {
            collected.extend(loader.poll());
            thread::sleep(Duration::from_millis(5));
        }
        collected
    }

    #[test]
    fn delivers_outcomes_from_workers() {
        let mut entities = HashMap::new();
        entities.insert(EntityId::from("X.a"), Entity::new("X.a", "Library"));
        let repository: Arc<dyn EntityRepository> = Arc::new(StaticRepository { entities });
        let mut loader = BackgroundLoader::spawn(repository, 2).unwrap();
        assert_eq!(loader.worker_count(), 2);

        loader.request(LoadRequest {
            parent: EntityId::from("X"),
            child: EntityId::from("X.a"),
        });
        loader.request(LoadRequest {
            parent: EntityId::from("X"),
            child: EntityId::from("X.missing"),
        });

        let mut outcomes = poll_until(&mut loader, 2);
        outcomes.sort_by(|a, b| a.child.cmp(&b.child));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0].result.as_ref().unwrap().entity.display_name(),
            "Library"
        );
        assert!(matches!(
            outcomes[1].result,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
