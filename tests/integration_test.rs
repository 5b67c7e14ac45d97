use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use grade_submission::clients::{DocumentExtractor, TextGenerator};
use grade_submission::error::LlmError;
use grade_submission::infrastructure::GradeStore;
use grade_submission::models::{GradeBand, RequirementRecord, StageKind, SubmissionRequest};
use grade_submission::orchestrator::{process_submission, SubmissionOutcome};
use grade_submission::services::{
    RequirementCatalog, RequirementMatcher, SimilarityScorer, SubmissionService,
};
use grade_submission::utils::logging;
use grade_submission::{App, Config, PipelineOrchestrator, WorkflowStatus};

/// 所有阶段都能解析的固定回复
const REPLY: &str = r#"Here you go:
{
  "total_score": 82,
  "grade": "B",
  "grade_band": "Merit",
  "contents": ["tables"],
  "strengths": ["Well structured"],
  "weaknesses": ["Thin references"],
  "grading_details": {"data": "8/10", "summary": "7/10"},
  "red_flags": [],
  "next_steps": "Expand the reference list.",
  "resources": [{"topic": "references", "resource": "Library citation guide"}],
  "encouragement": "Solid work."
}"#;

const REPORT: &str = "\
Introduction
Rainfall in the region over ten years.

Data
Annual rainfall rose by 10%.

Tables
Table 1 lists yearly totals.

Summary
Rainfall is trending upward.";

struct ScriptedGenerator(String);

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

fn seeded_store() -> Arc<GradeStore> {
    let store = GradeStore::open_in_memory().unwrap();
    store
        .seed_requirements(&[
            RequirementRecord {
                id: 1,
                title: "Presents data in tables".to_string(),
                location: "Unit 3 / LO1".to_string(),
                grade_band: GradeBand::Merit,
                requirements: ["data", "tables", "summary"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            RequirementRecord {
                id: 2,
                title: "Cites sources".to_string(),
                location: "Unit 3 / LO2".to_string(),
                grade_band: GradeBand::Merit,
                requirements: ["references", "citations", "data"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        ])
        .unwrap();
    store
        .seed_baseline(&["A textbook chapter about ocean currents.".to_string()])
        .unwrap();
    Arc::new(store)
}

fn orchestrator(store: &Arc<GradeStore>, reply: &str) -> PipelineOrchestrator {
    PipelineOrchestrator::with_defaults(
        Arc::new(DocumentExtractor::new()),
        Arc::new(ScriptedGenerator(reply.to_string())),
        RequirementMatcher::new(RequirementCatalog::new(store.clone())),
    )
}

#[tokio::test]
async fn test_full_pipeline_produces_report() {
    logging::init();
    let store = seeded_store();

    let ctx = orchestrator(&store, REPLY)
        .process(SubmissionRequest::from_text("S-100", REPORT))
        .await;

    assert_eq!(ctx.status(), WorkflowStatus::Completed);
    assert!(!ctx.has_degraded());

    let extraction = ctx.extraction().unwrap();
    assert_eq!(extraction.sections_found(), 4);

    let report = ctx.match_report().unwrap();
    assert_eq!(report.grade_band, GradeBand::Merit);
    assert_eq!(report.matches[0].title, "Presents data in tables");
    assert_eq!(report.matches[0].match_score, 100);
    assert_eq!(report.matches[1].match_score, 33);

    // 0.4·0.82 + 0.3·(4/9) + 0.25·1.0 = 0.7113
    let marking = ctx.marking().unwrap();
    assert_eq!(marking.student_score, 71);
    assert_eq!(marking.grade_band, GradeBand::Distinction);

    let rec = ctx.recommendation().unwrap();
    assert_eq!(rec.resources.len(), 1);

    let json: serde_json::Value = serde_json::from_str(&ctx.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["results"]["mark"]["payload"]["data"]["student_score"], 71);
}

#[tokio::test]
async fn test_unparsable_replies_degrade_but_complete() {
    let store = seeded_store();
    let ctx = orchestrator(&store, "The model is unavailable today.")
        .process(SubmissionRequest::from_text("S-101", REPORT))
        .await;

    assert_eq!(ctx.status(), WorkflowStatus::Completed);
    for stage in [StageKind::Analyze, StageKind::Mark, StageKind::Recommend] {
        assert!(ctx.result(stage).unwrap().is_degraded(), "{} not degraded", stage);
    }
    let analysis = ctx.analysis().unwrap();
    assert_eq!(analysis.total_score, 0);
    assert_eq!(analysis.grade, "F");
}

#[tokio::test]
async fn test_resubmission_keeps_one_record() {
    let store = seeded_store();
    let pipeline = orchestrator(&store, REPLY);
    let ingestion =
        SubmissionService::new(SimilarityScorer::new(store.clone(), None), store.clone());
    let results = tempfile::tempdir().unwrap();

    for text in [REPORT, "Summary\nA completely rewritten second attempt."] {
        let outcome = process_submission(
            &pipeline,
            &ingestion,
            SubmissionRequest::from_text("S-200", text),
            results.path(),
            false,
        )
        .await
        .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Completed);
    }

    assert_eq!(store.count_submissions().unwrap(), 1);
    let stored = store.find_submission("S-200").unwrap().unwrap();
    assert_eq!(stored.text, "Summary\nA completely rewritten second attempt.");
}

#[test]
fn test_copied_submission_scores_originality_floor() {
    let store = seeded_store();
    let scorer = SimilarityScorer::new(store, None);
    assert_eq!(scorer.score("A textbook chapter about ocean currents."), 10);
}

#[test]
fn test_batch_run_with_fakes() {
    tokio_test::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let submissions = dir.path().join("submissions");
        let results = dir.path().join("results");
        fs::create_dir_all(&submissions).unwrap();
        fs::write(submissions.join("report.md"), REPORT).unwrap();
        fs::write(
            submissions.join("a.toml"),
            "student_id = \"S-1\"\nstudent_name = \"Ada\"\nfile_path = \"report.md\"\n",
        )
        .unwrap();
        fs::write(
            submissions.join("b.toml"),
            "student_id = \"S-2\"\ntext = \"Summary\\nShort answer.\"\n",
        )
        .unwrap();
        fs::write(submissions.join("c.toml"), "student_id = \"S-3\"\ntext = \"   \"\n").unwrap();

        let config = Config {
            submissions_folder: submissions.display().to_string(),
            results_folder: results.display().to_string(),
            output_log_file: dir.path().join("output.txt").display().to_string(),
            max_concurrent_submissions: 2,
            ..Config::default()
        };
        let store = seeded_store();
        let app = App::with_parts(
            config,
            store.clone(),
            Arc::new(ScriptedGenerator(REPLY.to_string())),
            Arc::new(DocumentExtractor::new()),
        );

        let stats = app.run().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(store.count_submissions().unwrap(), 2);
        assert_eq!(fs::read_dir(&results).unwrap().count(), 3);
    });
}

#[tokio::test]
#[ignore] // 需要真实的 LLM 服务：cargo test -- --ignored
async fn test_live_app_run() {
    logging::init();
    let config = Config::from_env().expect("配置加载失败");
    let stats = App::initialize(config)
        .await
        .expect("初始化失败")
        .run()
        .await
        .expect("运行失败");
    assert_eq!(stats.failed, 0);
}
