//! Load pipeline orchestrator.
//!
//! ```text
//! Idle → Provisioning → Fetching → Clearing → Loading → Deriving → Closing → Done
//!             └────────────┴──────────┴─────────┴──────────┴──────────┴──→ Failed
//! ```
//!
//! Provisioning opens the store connection before creating anything, so an
//! unreachable database fails the run in that state. Each state starts only
//! after every operation of the previous state has settled. Loading must
//! complete before Deriving because edges reference vertices. On failure the
//! pipeline moves to `Failed`, closes the store if it was opened, and returns
//! the stage error. Nothing is rolled back.

use crate::api::{Character, Episode, Location, ResourceFetcher};
use crate::edges::{DerivationSummary, EdgeDeriver};
use crate::error::{PipelineError, ProvisioningError, StoreError};
use crate::graph::{ClassHandle, DatabaseSpec, GraphStore, StoreConnector, VertexWrite};
use crate::loader::{project_character, project_episode, project_location, EntityLoader};
use crate::schema::SchemaProvisioner;
use citadel_config::{LoaderConfig, RunMode};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Not started yet
    Idle,
    Provisioning,
    Fetching,
    Clearing,
    Loading,
    Deriving,
    Closing,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Provisioning => "provisioning",
            PipelineState::Fetching => "fetching",
            PipelineState::Clearing => "clearing",
            PipelineState::Loading => "loading",
            PipelineState::Deriving => "deriving",
            PipelineState::Closing => "closing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub database: DatabaseSpec,
    pub mode: RunMode,
    /// Bound on concurrent writes per class during Loading, and on
    /// concurrent edge requests per edge class during Deriving
    pub write_concurrency: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            database: DatabaseSpec::graph(config.database.name.clone(), config.database.storage),
            mode: config.run.mode,
            write_concurrency: config.run.write_concurrency,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub characters: usize,
    pub episodes: usize,
    pub locations: usize,
    pub mentions: DerivationSummary,
    pub visited: DerivationSummary,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode:       {}", self.mode)?;
        writeln!(f, "characters: {}", self.characters)?;
        writeln!(f, "episodes:   {}", self.episodes)?;
        writeln!(f, "locations:  {}", self.locations)?;
        writeln!(
            f,
            "MENTIONS:   {} edges from {} requests",
            self.mentions.edges, self.mentions.requests
        )?;
        write!(
            f,
            "VISITED:    {} edges from {} requests",
            self.visited.edges, self.visited.requests
        )
    }
}

pub struct Pipeline {
    connector: Box<dyn StoreConnector>,
    /// Set once Provisioning has connected
    store: Option<Arc<dyn GraphStore>>,
    fetcher: ResourceFetcher,
    options: PipelineOptions,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Pipeline {
    pub fn new(
        connector: impl StoreConnector + 'static,
        fetcher: ResourceFetcher,
        options: PipelineOptions,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            store: None,
            fetcher,
            options,
            state: PipelineState::Idle,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered since `Idle`, in order.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Run the whole pipeline once.
    #[instrument(skip_all, fields(database = %self.options.database.name, mode = %self.options.mode))]
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        match self.run_stages().await {
            Ok(report) => {
                self.enter(PipelineState::Closing);
                if let Err(e) = self.close_store().await {
                    self.enter(PipelineState::Failed);
                    return Err(PipelineError::Close(e));
                }
                self.enter(PipelineState::Done);
                info!("Load finished\n{}", report);
                Ok(report)
            }
            Err(err) => {
                self.enter(PipelineState::Failed);
                error!("Load failed: {}", err);
                if let Err(close_err) = self.close_store().await {
                    warn!("Failed to close the database connection: {}", close_err);
                }
                Err(err)
            }
        }
    }

    fn enter(&mut self, state: PipelineState) {
        info!("Pipeline state: {} -> {}", self.state, state);
        self.state = state;
        self.history.push(state);
    }

    /// Close the store if Provisioning got as far as connecting.
    async fn close_store(&self) -> Result<(), StoreError> {
        match &self.store {
            Some(store) => store.close().await,
            None => Ok(()),
        }
    }

    async fn run_stages(&mut self) -> Result<RunReport, PipelineError> {
        let mode = self.options.mode;
        let concurrency = self.options.write_concurrency;

        self.enter(PipelineState::Provisioning);
        let store = self
            .connector
            .connect()
            .await
            .map_err(|source| PipelineError::Provisioning {
                state: PipelineState::Provisioning,
                source: ProvisioningError::Connect(source),
            })?;
        self.store = Some(Arc::clone(&store));
        let schema = SchemaProvisioner::new(store.as_ref())
            .provision(&self.options.database)
            .await
            .map_err(|source| PipelineError::Provisioning {
                state: PipelineState::Provisioning,
                source,
            })?;

        self.enter(PipelineState::Fetching);
        let (characters, episodes, locations) = tokio::try_join!(
            self.fetcher.fetch_all::<Character>(),
            self.fetcher.fetch_all::<Episode>(),
            self.fetcher.fetch_all::<Location>(),
        )
        .map_err(|source| PipelineError::Fetch {
            state: PipelineState::Fetching,
            source,
        })?;

        let write = match mode {
            RunMode::Fresh => VertexWrite::Create,
            RunMode::Upsert => VertexWrite::Upsert,
        };
        let loader = EntityLoader::new(store.as_ref(), write, concurrency);

        self.enter(PipelineState::Clearing);
        // Edges are derived data and always rebuilt; vertices only on a fresh load
        let mut to_clear: Vec<&ClassHandle> = schema.edge_classes().to_vec();
        if mode == RunMode::Fresh {
            to_clear.extend(schema.vertex_classes());
        }
        for class in to_clear {
            loader
                .clear(class)
                .await
                .map_err(|source| PipelineError::Load {
                    state: PipelineState::Clearing,
                    source,
                })?;
        }

        self.enter(PipelineState::Loading);
        let (character_count, episode_count, location_count) = tokio::try_join!(
            loader.load_entities(&schema.character, &characters, project_character),
            loader.load_entities(&schema.episode, &episodes, project_episode),
            loader.load_entities(&schema.location, &locations, project_location),
        )
        .map_err(|source| PipelineError::Load {
            state: PipelineState::Loading,
            source,
        })?;

        self.enter(PipelineState::Deriving);
        let deriver = EdgeDeriver::new(store.as_ref(), &schema, concurrency);
        let (mentions, visited) = tokio::try_join!(
            deriver.derive_mentions(&characters),
            deriver.derive_visited(&locations),
        )
        .map_err(|source| PipelineError::Derivation {
            state: PipelineState::Deriving,
            source,
        })?;

        Ok(RunReport {
            mode,
            characters: character_count,
            episodes: episode_count,
            locations: location_count,
            mentions,
            visited,
        })
    }
}
