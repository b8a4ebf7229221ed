use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One execution of a pipeline, as returned by the REST builds listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    /// Unique identifier for the build
    pub id: String,
    /// Lifecycle state (scheduled, running, passed, failed, ...)
    pub state: String,
    /// Pipeline this build belongs to
    pub pipeline: Pipeline,
    /// When the build was created
    pub created_at: Option<DateTime<Utc>>,
    /// When the build finished, if it has
    pub finished_at: Option<DateTime<Utc>>,
    /// Jobs in this build, each with its own state and agent targeting rules
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Pipeline summary embedded in a build.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    /// URL-safe pipeline identifier
    pub slug: String,
    /// Human-readable pipeline name
    pub name: Option<String>,
}

/// Job within a build.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// Unique identifier for the job
    pub id: Option<String>,
    /// Lifecycle state of the job
    pub state: Option<String>,
    /// Agent targeting rules, e.g. ["queue=deploy"]
    #[serde(default)]
    pub agent_query_rules: Vec<String>,
}

/// Worker process registered with the organization.
#[derive(Debug, Clone, Deserialize)]
pub struct Agent {
    /// Unique identifier for the agent
    pub id: String,
    /// Agent name
    pub name: String,
    /// Connection state reported by the platform
    pub connection_state: Option<String>,
    /// Agent tags, e.g. ["queue=deploy"]; may be absent
    pub meta_data: Option<Vec<String>>,
    /// Job the agent is currently running, if any
    pub job: Option<Job>,
}
