use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use concord_cache::DatasetProvider;
use concord_models::{
    AgentOutcome, AgentReport, Dataset, FailureKind, OrchestratorConfig, RunReport,
    REPORT_SCHEMA_VERSION,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::Agent;
use crate::consensus::aggregate;
use crate::error::{AgentError, OrchestratorError};
use crate::registry::AgentRegistry;

/// Which registered agents a run should invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSelection {
    /// Every agent currently enabled in the registry.
    Enabled,
    /// These agents, in this order, whether enabled or not.
    Named(Vec<String>),
}

impl AgentSelection {
    pub fn named<S: AsRef<str>>(names: &[S]) -> Self {
        AgentSelection::Named(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

fn failure_kind(error: &AgentError) -> FailureKind {
    match error {
        AgentError::Analysis(_) => FailureKind::Analysis,
        AgentError::Dependency(_) => FailureKind::Dependency,
        AgentError::Validation(_) => FailureKind::Validation,
    }
}

/// The orchestrator fans a subject out to registered agents and collects one
/// outcome per agent. Agent problems never abort a run.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.config.agent_timeout_ms)
    }

    /// Run the named agents concurrently. Outcomes come back in `agent_names` order.
    pub async fn run(
        &self,
        subject_id: &str,
        dataset: Arc<Dataset>,
        agent_names: &[String],
    ) -> Result<Vec<AgentOutcome>, OrchestratorError> {
        self.run_with_cancel(subject_id, dataset, agent_names, CancellationToken::new())
            .await
    }

    /// Run every enabled agent, in registration order.
    pub async fn run_enabled(
        &self,
        subject_id: &str,
        dataset: Arc<Dataset>,
    ) -> Result<Vec<AgentOutcome>, OrchestratorError> {
        let bindings = self.resolve(&AgentSelection::Enabled)?;
        let reports = self
            .execute(subject_id, dataset, bindings, CancellationToken::new())
            .await;
        Ok(reports.into_iter().map(|r| r.outcome).collect())
    }

    /// Like [`run`](Self::run), but cancelling `token` turns every unfinished
    /// agent into a `cancelled` failure. Outcomes already produced are kept.
    pub async fn run_with_cancel(
        &self,
        subject_id: &str,
        dataset: Arc<Dataset>,
        agent_names: &[String],
        token: CancellationToken,
    ) -> Result<Vec<AgentOutcome>, OrchestratorError> {
        let bindings = self.resolve(&AgentSelection::Named(agent_names.to_vec()))?;
        let reports = self.execute(subject_id, dataset, bindings, token).await;
        Ok(reports.into_iter().map(|r| r.outcome).collect())
    }

    /// Run the selected agents and reduce their outcomes into a [`RunReport`].
    pub async fn analyze(
        &self,
        subject_id: &str,
        dataset: Arc<Dataset>,
        selection: &AgentSelection,
    ) -> Result<RunReport, OrchestratorError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let bindings = self.resolve(selection)?;
        info!(run_id = %run_id, subject = %subject_id, agents = bindings.len(), "Starting analysis");

        let agents = self
            .execute(subject_id, dataset, bindings, CancellationToken::new())
            .await;
        let outcomes: Vec<AgentOutcome> = agents.iter().map(|r| r.outcome.clone()).collect();
        let consensus = aggregate(&outcomes);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            subject = %subject_id,
            signal = %consensus.signal,
            confidence = consensus.confidence,
            agreement = consensus.agreement,
            failed = consensus.failed,
            elapsed_ms = processing_time_ms,
            "Analysis complete"
        );

        Ok(RunReport {
            run_id,
            schema_version: REPORT_SCHEMA_VERSION,
            subject_id: subject_id.to_string(),
            started_at,
            consensus,
            agents,
            processing_time_ms,
        })
    }

    /// Fetch the subject's dataset from `provider`, then [`analyze`](Self::analyze).
    pub async fn fetch_and_analyze(
        &self,
        provider: &dyn DatasetProvider,
        subject_id: &str,
        selection: &AgentSelection,
    ) -> Result<RunReport, OrchestratorError> {
        let dataset = provider.fetch(subject_id).await?;
        self.analyze(subject_id, dataset, selection).await
    }

    /// Snapshot the selected bindings under one registry read.
    fn resolve(
        &self,
        selection: &AgentSelection,
    ) -> Result<Vec<(String, Arc<dyn Agent>)>, OrchestratorError> {
        let bindings = match selection {
            AgentSelection::Enabled => self.registry.snapshot_enabled(),
            AgentSelection::Named(names) => self.registry.snapshot(names)?,
        };
        if bindings.is_empty() && self.config.require_agents {
            return Err(OrchestratorError::EmptyRequest);
        }
        Ok(bindings)
    }

    async fn execute(
        &self,
        subject_id: &str,
        dataset: Arc<Dataset>,
        bindings: Vec<(String, Arc<dyn Agent>)>,
        token: CancellationToken,
    ) -> Vec<AgentReport> {
        let run_token = token.child_token();
        // Dropping this future cancels every task it spawned.
        let _guard = run_token.clone().drop_guard();
        let timeout = self.agent_timeout();
        let run_start = Instant::now();

        // 1. Fan out: every agent starts before any is awaited
        let handles: Vec<(String, JoinHandle<(AgentOutcome, Duration)>)> = bindings
            .into_iter()
            .map(|(name, agent)| {
                let handle = tokio::spawn(invoke(
                    name.clone(),
                    agent,
                    subject_id.to_string(),
                    Arc::clone(&dataset),
                    timeout,
                    run_token.clone(),
                ));
                (name, handle)
            })
            .collect();

        // 2. Collect in request order
        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let (outcome, elapsed) = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(agent = %name, error = %e, "Agent task panicked");
                    let message = if e.is_panic() {
                        "agent panicked during analysis".to_string()
                    } else {
                        format!("agent task aborted: {e}")
                    };
                    (
                        AgentOutcome::failure(FailureKind::Analysis, &name, message),
                        run_start.elapsed(),
                    )
                }
            };

            match &outcome {
                AgentOutcome::Success(signal) => info!(
                    agent = %name,
                    direction = %signal.direction(),
                    confidence = signal.confidence(),
                    elapsed_ms = elapsed.as_millis(),
                    "Agent succeeded"
                ),
                AgentOutcome::Failure(failure) => warn!(
                    agent = %name,
                    kind = %failure.kind,
                    error = %failure.message,
                    elapsed_ms = elapsed.as_millis(),
                    "Agent failed"
                ),
            }

            reports.push(AgentReport {
                agent_name: name,
                outcome,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        reports
    }
}

/// One agent invocation, bounded by the timeout and the run's cancellation token.
async fn invoke(
    name: String,
    agent: Arc<dyn Agent>,
    subject_id: String,
    dataset: Arc<Dataset>,
    timeout: Duration,
    token: CancellationToken,
) -> (AgentOutcome, Duration) {
    let start = Instant::now();
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => {
            AgentOutcome::failure(FailureKind::Cancelled, &name, "run cancelled before agent finished")
        }
        result = tokio::time::timeout(timeout, agent.analyze(&subject_id, &dataset)) => match result {
            Ok(Ok(signal)) => AgentOutcome::Success(signal),
            Ok(Err(e)) => AgentOutcome::failure(failure_kind(&e), &name, e.to_string()),
            Err(_) => AgentOutcome::failure(
                FailureKind::Timeout,
                &name,
                format!("no result within {} ms", timeout.as_millis()),
            ),
        },
    };
    (outcome, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedAgent;
    use concord_models::Direction;

    fn orchestrator(agents: Vec<ScriptedAgent>) -> Orchestrator {
        let registry = Arc::new(AgentRegistry::new());
        for agent in agents {
            let name = agent.name().to_string();
            registry.register(&name, Arc::new(agent)).unwrap();
        }
        Orchestrator::new(registry, OrchestratorConfig::default())
    }

    fn dataset() -> Arc<Dataset> {
        Arc::new(Dataset::new("ACME"))
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn failure_and_success_come_back_in_order() {
        let orch = orchestrator(vec![
            ScriptedAgent::failing("broken", "no data"),
            ScriptedAgent::fixed("steady", Direction::Bullish, 0.7),
        ]);

        let outcomes = orch
            .run("ACME", dataset(), &names(&["broken", "steady"]))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Analysis));
        assert_eq!(outcomes[1].signal().unwrap().direction(), Direction::Bullish);
    }

    #[tokio::test]
    async fn error_kinds_map_to_failure_kinds() {
        let orch = orchestrator(vec![
            ScriptedAgent::missing_dependency("offline", "chat down"),
            ScriptedAgent::invalid("overconfident"),
            ScriptedAgent::panicking("crashy"),
        ]);

        let outcomes = orch
            .run("ACME", dataset(), &names(&["offline", "overconfident", "crashy"]))
            .await
            .unwrap();

        let kinds: Vec<_> = outcomes.iter().map(|o| o.failure_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(FailureKind::Dependency),
                Some(FailureKind::Validation),
                Some(FailureKind::Analysis),
            ]
        );
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let orch = orchestrator(vec![ScriptedAgent::fixed("a", Direction::Neutral, 0.5)]);
        let err = orch.run("ACME", dataset(), &[]).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::EmptyRequest));
    }

    #[tokio::test]
    async fn empty_request_allowed_when_configured() {
        let orch = Orchestrator::new(
            Arc::new(AgentRegistry::new()),
            OrchestratorConfig {
                require_agents: false,
                ..OrchestratorConfig::default()
            },
        );
        let outcomes = orch.run("ACME", dataset(), &[]).await.unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn unknown_agent_is_a_registry_error() {
        let orch = orchestrator(vec![ScriptedAgent::fixed("a", Direction::Neutral, 0.5)]);
        let err = orch
            .run("ACME", dataset(), &names(&["a", "ghost"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(crate::error::RegistryError::NotFound(ref n)) if n == "ghost"
        ));
    }

    #[tokio::test]
    async fn run_enabled_skips_disabled_but_named_disabled_runs() {
        let orch = orchestrator(vec![
            ScriptedAgent::fixed("on", Direction::Bullish, 0.6),
            ScriptedAgent::fixed("off", Direction::Bearish, 0.6),
        ]);
        orch.registry().disable("off").unwrap();

        let enabled = orch.run_enabled("ACME", dataset()).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].signal().unwrap().direction(), Direction::Bullish);

        let named = orch.run("ACME", dataset(), &names(&["off"])).await.unwrap();
        assert_eq!(named[0].signal().unwrap().direction(), Direction::Bearish);
    }

    #[tokio::test]
    async fn analyze_builds_report() {
        let orch = orchestrator(vec![
            ScriptedAgent::fixed("a", Direction::Bullish, 0.8),
            ScriptedAgent::fixed("b", Direction::Bullish, 0.6),
            ScriptedAgent::failing("c", "nope"),
        ]);

        let report = orch
            .analyze("ACME", dataset(), &AgentSelection::Enabled)
            .await
            .unwrap();

        assert_eq!(report.subject_id, "ACME");
        assert_eq!(report.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(report.agents.len(), 3);
        assert_eq!(report.agents[2].agent_name, "c");
        assert_eq!(report.consensus.signal, Direction::Bullish);
        assert_eq!(report.consensus.failed, 1);
        assert!((report.consensus.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn selection_from_str_slice() {
        assert_eq!(
            AgentSelection::named(&["a", "b"]),
            AgentSelection::Named(names(&["a", "b"]))
        );
    }
}
