use crate::providers::buildkite::types::{Agent, Build};

/// Queue assigned to builds and agents that carry no queue tag. Every
/// record lands in exactly one queue bucket, never dropped.
pub const DEFAULT_QUEUE: &str = "default";

/// Bucket for lifecycle states this version does not know about.
pub const UNKNOWN_STATE: &str = "unknown";

const BUILD_STATES: &[&str] = &[
    "scheduled",
    "running",
    "passed",
    "failed",
    "canceled",
    "canceling",
    "skipped",
    "not_run",
];

/// Map a reported build state onto the closed set of counted states.
///
/// Unrecognized states classify as [`UNKNOWN_STATE`] rather than failing
/// the pass: an upstream API that grows a new state should degrade the
/// breakdown, not break collection.
pub fn normalize_build_state(state: &str) -> &'static str {
    BUILD_STATES
        .iter()
        .copied()
        .find(|known| *known == state)
        .unwrap_or(UNKNOWN_STATE)
}

/// Queue a build is attributed to: the first `queue=` agent targeting
/// rule across its jobs, or [`DEFAULT_QUEUE`].
pub fn build_queue(build: &Build) -> &str {
    build
        .jobs
        .iter()
        .find_map(|job| queue_tag(&job.agent_query_rules))
        .unwrap_or(DEFAULT_QUEUE)
}

/// Queue an agent is attributed to: the first `queue=` tag in its
/// metadata, or [`DEFAULT_QUEUE`].
pub fn agent_queue(agent: &Agent) -> &str {
    agent
        .meta_data
        .as_deref()
        .and_then(queue_tag)
        .unwrap_or(DEFAULT_QUEUE)
}

/// An agent with a job attached is busy, otherwise idle.
pub fn agent_status(agent: &Agent) -> &'static str {
    if agent.job.is_some() {
        "busy"
    } else {
        "idle"
    }
}

fn queue_tag(tags: &[String]) -> Option<&str> {
    tags.iter().find_map(|tag| tag.strip_prefix("queue="))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::buildkite::types::{Job, Pipeline};

    fn build_with_rules(state: &str, rules: Vec<&str>) -> Build {
        Build {
            id: "build-1".to_string(),
            state: state.to_string(),
            pipeline: Pipeline {
                slug: "app".to_string(),
                name: None,
            },
            created_at: None,
            finished_at: None,
            jobs: vec![Job {
                id: None,
                state: Some(state.to_string()),
                agent_query_rules: rules.into_iter().map(String::from).collect(),
            }],
        }
    }

    fn agent(meta_data: Option<Vec<&str>>, busy: bool) -> Agent {
        Agent {
            id: "agent-1".to_string(),
            name: "agent-1".to_string(),
            connection_state: Some("connected".to_string()),
            meta_data: meta_data.map(|tags| tags.into_iter().map(String::from).collect()),
            job: busy.then(|| Job {
                id: None,
                state: Some("running".to_string()),
                agent_query_rules: vec![],
            }),
        }
    }

    #[test]
    fn test_known_states_pass_through() {
        for state in [
            "scheduled",
            "running",
            "passed",
            "failed",
            "canceled",
            "canceling",
            "skipped",
            "not_run",
        ] {
            assert_eq!(normalize_build_state(state), state);
        }
    }

    #[test]
    fn test_unrecognized_states_classify_as_unknown() {
        assert_eq!(normalize_build_state("blocked"), UNKNOWN_STATE);
        assert_eq!(normalize_build_state(""), UNKNOWN_STATE);
        assert_eq!(normalize_build_state("RUNNING"), UNKNOWN_STATE);
    }

    #[test]
    fn test_build_queue_from_agent_query_rules() {
        let build = build_with_rules("running", vec!["docker=true", "queue=deploy"]);
        assert_eq!(build_queue(&build), "deploy");
    }

    #[test]
    fn test_build_without_queue_rule_uses_default_queue() {
        let build = build_with_rules("running", vec!["docker=true"]);
        assert_eq!(build_queue(&build), DEFAULT_QUEUE);

        let mut no_jobs = build_with_rules("running", vec![]);
        no_jobs.jobs.clear();
        assert_eq!(build_queue(&no_jobs), DEFAULT_QUEUE);
    }

    #[test]
    fn test_agent_queue_from_meta_data() {
        assert_eq!(agent_queue(&agent(Some(vec!["queue=deploy"]), false)), "deploy");
        assert_eq!(agent_queue(&agent(Some(vec!["os=linux"]), false)), DEFAULT_QUEUE);
        assert_eq!(agent_queue(&agent(None, false)), DEFAULT_QUEUE);
    }

    #[test]
    fn test_agent_status_follows_attached_job() {
        assert_eq!(agent_status(&agent(None, true)), "busy");
        assert_eq!(agent_status(&agent(None, false)), "idle");
    }
}
