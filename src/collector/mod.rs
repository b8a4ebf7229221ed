pub mod classify;
pub mod snapshot;

use chrono::Utc;
use log::{debug, info};

use crate::error::{CistatError, Result};
use crate::providers::buildkite::client::{BuildFilter, BuildkiteClient};
use crate::providers::buildkite::types::{Agent, Build};

use self::classify::{agent_queue, agent_status, build_queue, normalize_build_state};
use self::snapshot::Snapshot;

/// Immutable configuration for a collector. Nothing here changes between
/// cycles; all per-cycle state lives in the [`Snapshot`].
#[derive(Debug, Clone)]
pub struct Opts {
    /// Organization slug to collect for
    pub org: String,
    /// Only count records on this queue, when set
    pub queue: Option<String>,
    /// How far back finished builds are still counted
    pub history: std::time::Duration,
    /// Log every classified record
    pub debug: bool,
}

/// Drives one collection pass over the organization's agents and builds
/// and aggregates them into a [`Snapshot`].
pub struct Collector {
    client: BuildkiteClient,
    opts: Opts,
}

impl Collector {
    pub fn new(client: BuildkiteClient, opts: Opts) -> Self {
        Self { client, opts }
    }

    /// Run one full collection pass.
    ///
    /// Lists agents, then unfinished builds, then builds that finished
    /// within the history window. The two build listings use disjoint
    /// state predicates, so no build is counted twice. Any page fetch
    /// error aborts the whole pass; no partial snapshot is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if any API listing fails (network, auth, rate
    /// limit). There is no retry within a pass: the scheduling loop
    /// retries on its next tick.
    pub async fn collect(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();

        let agents = self.client.list_agents(&self.opts.org).await?;
        info!("Fetched {} agents", agents.len());
        for agent in &agents {
            self.classify_agent(agent, &mut snapshot);
        }

        let unfinished = self
            .client
            .list_builds(&self.opts.org, &BuildFilter::unfinished())
            .await?;
        info!("Fetched {} unfinished builds", unfinished.len());

        let window = chrono::Duration::from_std(self.opts.history)
            .map_err(|e| CistatError::Config(format!("Invalid history window: {e}")))?;
        let cutoff = Utc::now() - window;
        let finished = self
            .client
            .list_builds(&self.opts.org, &BuildFilter::finished_from(cutoff))
            .await?;
        info!("Fetched {} builds finished since {}", finished.len(), cutoff);

        for build in unfinished.iter().chain(finished.iter()) {
            self.classify_build(build, &mut snapshot);
        }

        Ok(snapshot)
    }

    fn classify_build(&self, build: &Build, snapshot: &mut Snapshot) {
        let queue = build_queue(build);
        if !self.matches_queue(queue) {
            return;
        }

        let state = normalize_build_state(&build.state);
        if self.opts.debug {
            debug!(
                "Build {} state={} queue={} pipeline={}",
                build.id, state, queue, build.pipeline.slug
            );
        }
        snapshot.record_build(queue, &build.pipeline.slug, state);
    }

    fn classify_agent(&self, agent: &Agent, snapshot: &mut Snapshot) {
        let queue = agent_queue(agent);
        if !self.matches_queue(queue) {
            return;
        }

        let status = agent_status(agent);
        if self.opts.debug {
            debug!("Agent {} status={} queue={}", agent.name, status, queue);
        }
        snapshot.record_agent(queue, status);
    }

    // The filter narrows the whole snapshot, totals included
    fn matches_queue(&self, queue: &str) -> bool {
        self.opts.queue.as_deref().map_or(true, |filter| filter == queue)
    }
}
