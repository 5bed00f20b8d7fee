//! End-to-end orchestration tests.
//!
//! Scripted agents cover ordering, isolation, timeouts and cancellation; the
//! built-in agents run against datasets served by a static provider and by an
//! in-memory SQLite cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use concord_agents::test_support::ScriptedAgent;
use concord_agents::{
    build_agent, calculator_from_config, Agent, AgentDeps, AgentError, AgentRegistry,
    AgentSelection, Orchestrator, OrchestratorError, RegistryError, SentimentScorer,
};
use concord_cache::{CacheReader, SqliteReader, StaticProvider};
use concord_models::cache_schema::{key_patterns, CacheCategory, CacheRow};
use concord_models::{
    AgentConfig, AgentKind, CalibrationConfig, ChatConfig, Dataset, Direction, FailureKind,
    OrchestratorConfig, SeriesPoint, Signal,
};
use tokio_util::sync::CancellationToken;

fn orchestrator_with(agents: Vec<ScriptedAgent>, agent_timeout_ms: u64) -> Orchestrator {
    let registry = Arc::new(AgentRegistry::new());
    for agent in agents {
        let name = agent.name().to_string();
        registry.register(&name, Arc::new(agent)).unwrap();
    }
    Orchestrator::new(
        registry,
        OrchestratorConfig {
            agent_timeout_ms,
            ..OrchestratorConfig::default()
        },
    )
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn empty_dataset() -> Arc<Dataset> {
    Arc::new(Dataset::new("ACME"))
}

#[tokio::test]
async fn outcomes_follow_request_order_not_completion_order() {
    let orch = orchestrator_with(
        vec![
            ScriptedAgent::fixed("slow", Direction::Bearish, 0.6).delayed(Duration::from_millis(150)),
            ScriptedAgent::fixed("fast", Direction::Bullish, 0.7),
        ],
        5_000,
    );

    let outcomes = orch
        .run("ACME", empty_dataset(), &names(&["slow", "fast"]))
        .await
        .unwrap();

    assert_eq!(outcomes[0].signal().unwrap().direction(), Direction::Bearish);
    assert_eq!(outcomes[1].signal().unwrap().direction(), Direction::Bullish);

    // Reversed request, reversed outcomes.
    let outcomes = orch
        .run("ACME", empty_dataset(), &names(&["fast", "slow"]))
        .await
        .unwrap();
    assert_eq!(outcomes[0].signal().unwrap().direction(), Direction::Bullish);
}

#[tokio::test]
async fn agents_run_concurrently() {
    let orch = orchestrator_with(
        vec![
            ScriptedAgent::fixed("a", Direction::Bullish, 0.6).delayed(Duration::from_millis(200)),
            ScriptedAgent::fixed("b", Direction::Bullish, 0.6).delayed(Duration::from_millis(200)),
            ScriptedAgent::fixed("c", Direction::Bullish, 0.6).delayed(Duration::from_millis(200)),
        ],
        5_000,
    );

    let start = Instant::now();
    let outcomes = orch
        .run("ACME", empty_dataset(), &names(&["a", "b", "c"]))
        .await
        .unwrap();
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(start.elapsed() < Duration::from_millis(550), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn slow_agent_times_out_without_holding_the_run() {
    let orch = orchestrator_with(
        vec![
            ScriptedAgent::fixed("stuck", Direction::Bullish, 0.9).delayed(Duration::from_secs(10)),
            ScriptedAgent::fixed("quick", Direction::Bearish, 0.6),
        ],
        100,
    );

    let start = Instant::now();
    let outcomes = orch
        .run("ACME", empty_dataset(), &names(&["stuck", "quick"]))
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2), "took {:?}", start.elapsed());
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Timeout));
    assert!(outcomes[1].is_success());
}

#[tokio::test]
async fn failures_are_isolated() {
    let orch = orchestrator_with(
        vec![
            ScriptedAgent::failing("broken", "boom"),
            ScriptedAgent::panicking("crashy"),
            ScriptedAgent::fixed("fine", Direction::Neutral, 0.5),
        ],
        5_000,
    );

    let outcomes = orch
        .run("ACME", empty_dataset(), &names(&["broken", "crashy", "fine"]))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Analysis));
    assert_eq!(outcomes[1].failure_kind(), Some(FailureKind::Analysis));
    assert!(outcomes[2].is_success());
}

#[tokio::test]
async fn cancellation_keeps_finished_outcomes() {
    let orch = orchestrator_with(
        vec![
            ScriptedAgent::fixed("done", Direction::Bullish, 0.7),
            ScriptedAgent::fixed("pending", Direction::Bearish, 0.7).delayed(Duration::from_secs(10)),
        ],
        30_000,
    );

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let outcomes = orch
        .run_with_cancel("ACME", empty_dataset(), &names(&["done", "pending"]), token)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[1].failure_kind(), Some(FailureKind::Cancelled));
}

/// Flags whether its analysis ran to completion.
struct CompletionProbe {
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl Agent for CompletionProbe {
    fn name(&self) -> &str {
        "probe"
    }

    async fn analyze(&self, _subject_id: &str, _dataset: &Dataset) -> Result<Signal, AgentError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(Signal::new(Direction::Neutral, 0.5, "probe finished")?)
    }
}

#[tokio::test]
async fn dropping_the_run_cancels_in_flight_agents() {
    let finished = Arc::new(AtomicBool::new(false));
    let registry = Arc::new(AgentRegistry::new());
    registry
        .register(
            "probe",
            Arc::new(CompletionProbe {
                finished: Arc::clone(&finished),
            }),
        )
        .unwrap();
    let orch = Orchestrator::new(registry, OrchestratorConfig::default());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        orch.run("ACME", empty_dataset(), &names(&["probe"])),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn request_errors_are_returned_directly() {
    let orch = orchestrator_with(vec![ScriptedAgent::fixed("a", Direction::Bullish, 0.6)], 1_000);

    let err = orch.run("ACME", empty_dataset(), &[]).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::EmptyRequest));

    let err = orch
        .run("ACME", empty_dataset(), &names(&["missing"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Registry(RegistryError::NotFound(ref n)) if n == "missing"
    ));
}

fn deps() -> AgentDeps {
    AgentDeps {
        scorer: Arc::new(SentimentScorer::default()),
        calculator: calculator_from_config(&CalibrationConfig::default()),
        chat: ChatConfig::default(),
    }
}

fn builtin_registry() -> Arc<AgentRegistry> {
    let deps = deps();
    let registry = Arc::new(AgentRegistry::new());
    for config in [
        AgentConfig::new("sentiment", AgentKind::Sentiment),
        AgentConfig::new("fundamentals", AgentKind::Fundamentals),
        AgentConfig::new("momentum", AgentKind::Momentum),
    ] {
        registry.register(&config.name, build_agent(&config, &deps)).unwrap();
    }
    registry
}

fn rising_closes() -> Vec<SeriesPoint> {
    let start = Utc::now() - ChronoDuration::days(10);
    [100.0, 101.0, 103.0, 104.0, 106.0, 108.0, 112.0]
        .iter()
        .enumerate()
        .map(|(i, &value)| SeriesPoint {
            timestamp: start + ChronoDuration::days(i as i64),
            value,
        })
        .collect()
}

#[tokio::test]
async fn builtin_agents_reach_bullish_consensus() {
    let dataset = Dataset::new("ACME")
        .with_metric("return_on_equity", 0.21)
        .with_metric("debt_to_equity", 0.4)
        .with_metric("revenue_growth", 0.12)
        .with_metric("pe_ratio", 18.0)
        .with_series("close", rising_closes())
        .with_text("wire", "ACME reported exceptional growth and record profits")
        .with_text("blog", "Analysts upgraded ACME after a strong quarter");
    let provider = StaticProvider::new().with_dataset(dataset);
    let orch = Orchestrator::new(builtin_registry(), OrchestratorConfig::default());

    let report = orch
        .fetch_and_analyze(&provider, "ACME", &AgentSelection::Enabled)
        .await
        .unwrap();

    assert_eq!(report.agents.len(), 3);
    assert!(report.agents.iter().all(|a| a.outcome.is_success()));
    assert_eq!(report.consensus.signal, Direction::Bullish);
    assert!((report.consensus.agreement - 1.0).abs() < 1e-9);
    assert!(report.consensus.confidence > 0.0 && report.consensus.confidence <= 1.0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["agents"][0]["outcome"]["status"], "success");
}

#[tokio::test]
async fn unknown_subject_is_a_dataset_error() {
    let orch = Orchestrator::new(builtin_registry(), OrchestratorConfig::default());
    let err = orch
        .fetch_and_analyze(&StaticProvider::new(), "NOPE", &AgentSelection::Enabled)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Dataset(_)));
}

fn cache_row(key: String, category: CacheCategory, value_json: String) -> CacheRow {
    let now = Utc::now();
    CacheRow {
        key,
        category: category.as_str().to_string(),
        value_json,
        source: "test".to_string(),
        subject: "ACME".to_string(),
        created_at: now.to_rfc3339(),
        expires_at: (now + ChronoDuration::hours(1)).to_rfc3339(),
    }
}

#[tokio::test]
async fn sqlite_backed_run_reports_missing_data_per_agent() {
    let sqlite = SqliteReader::open_in_memory().unwrap();
    sqlite
        .insert(&cache_row(
            key_patterns::metric("pe_ratio", "ACME"),
            CacheCategory::Metric,
            r#"{"value": 45.0}"#.to_string(),
        ))
        .unwrap();
    sqlite
        .insert(&cache_row(
            key_patterns::metric("debt_to_equity", "ACME"),
            CacheCategory::Metric,
            r#"{"value": 2.1}"#.to_string(),
        ))
        .unwrap();
    sqlite
        .insert(&cache_row(
            key_patterns::text("wire", "ACME"),
            CacheCategory::Text,
            r#"[{"text": "ACME missed estimates and cut guidance"}, {"text": "Layoffs announced at ACME"}]"#
                .to_string(),
        ))
        .unwrap();
    let reader = CacheReader::new(sqlite, 100, Duration::from_secs(60));
    let orch = Orchestrator::new(builtin_registry(), OrchestratorConfig::default());

    let report = orch
        .fetch_and_analyze(&reader, "ACME", &AgentSelection::named(&["fundamentals", "momentum", "sentiment"]))
        .await
        .unwrap();

    assert_eq!(report.agents[0].outcome.signal().unwrap().direction(), Direction::Bearish);
    assert_eq!(report.agents[1].outcome.failure_kind(), Some(FailureKind::Analysis));
    assert_eq!(report.agents[2].outcome.signal().unwrap().direction(), Direction::Bearish);
    assert_eq!(report.consensus.signal, Direction::Bearish);
    assert_eq!(report.consensus.failed, 1);
}
