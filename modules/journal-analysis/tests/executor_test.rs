use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use journal_analysis::{AnalysisExecutor, AnalysisPipeline, AnalysisSettings};
use journal_common::{AnalysisError, AnalysisRequest, EmotionLabel, ErrorKind};
use journal_models::testing::{CountingLoader, FixedClassifier, GatedClassifier};
use journal_models::{LabelScore, ModelRegistry, TextClassifier};

struct PanickingClassifier;

impl TextClassifier for PanickingClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        if text.contains("boom") {
            panic!("kernel exploded");
        }
        Ok(vec![LabelScore::new("joy", 1.0)])
    }
}

fn executor_with(emotion: Arc<dyn TextClassifier>, workers: usize) -> AnalysisExecutor {
    let loader = CountingLoader::new()
        .sarcasm(Arc::new(FixedClassifier::sarcasm(0.1)))
        .emotion(emotion);
    let registry = Arc::new(ModelRegistry::new(Arc::new(loader)));
    let pipeline = Arc::new(AnalysisPipeline::new(registry, AnalysisSettings::default()));
    AnalysisExecutor::new(pipeline, workers).unwrap()
}

fn request(text: &str) -> AnalysisRequest {
    AnalysisRequest::new(text).unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn submitted_request_resolves() {
    let executor = executor_with(Arc::new(FixedClassifier::single("love")), 2);
    assert_eq!(executor.size(), 2);

    let result = executor.submit(request("dinner with my partner")).await.unwrap();
    assert_eq!(result.emotion(), &EmotionLabel::Love);
    executor.shutdown();
}

#[tokio::test]
async fn zero_workers_is_clamped_to_one() {
    let executor = executor_with(Arc::new(FixedClassifier::single("joy")), 0);
    assert_eq!(executor.size(), 1);
    assert!(executor.submit(request("sunny")).await.is_ok());
    executor.shutdown();
}

#[tokio::test]
async fn concurrent_requests_each_get_their_own_result() {
    let executor = executor_with(Arc::new(FixedClassifier::single("neutral")), 2);

    let tickets: Vec<_> = (0..8)
        .map(|i| executor.submit(request(&format!("entry number {i} about gardening"))))
        .collect();
    let results = futures::future::join_all(tickets).await;

    assert_eq!(results.len(), 8);
    for result in results {
        let result = result.unwrap();
        assert_eq!(result.emotion(), &EmotionLabel::Neutral);
        assert!(result.keywords().iter().any(|k| *k == "garden"));
    }
    executor.shutdown();
}

#[tokio::test]
async fn idle_workers_pick_up_jobs_while_another_is_busy() {
    let gate = Arc::new(GatedClassifier::new(FixedClassifier::single("sadness")));
    let executor = executor_with(gate.clone(), 3);

    let tickets: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|text| executor.submit(request(text)))
        .collect();

    // every worker is blocked in the model at the same time
    wait_until(|| gate.entered() == 3).await;

    gate.open();
    for result in futures::future::join_all(tickets).await {
        assert_eq!(result.unwrap().emotion(), &EmotionLabel::Sadness);
    }
    executor.shutdown();
}

#[tokio::test]
async fn shutdown_drains_queued_jobs() {
    let gate = Arc::new(GatedClassifier::new(FixedClassifier::single("joy")));
    let executor = Arc::new(executor_with(gate.clone(), 1));

    let running = executor.submit(request("first"));
    wait_until(|| gate.entered() == 1).await;
    let queued = executor.submit(request("second"));

    let closer = {
        let executor = executor.clone();
        tokio::task::spawn_blocking(move || executor.shutdown())
    };
    wait_until(|| executor.is_closed()).await;
    gate.open();

    assert!(running.await.is_ok());
    assert!(queued.await.is_ok());
    closer.await.unwrap();
    assert_eq!(gate.calls(), 2);
}

#[tokio::test]
async fn abandoned_tickets_deliver_nothing_and_queued_ones_are_skipped() {
    let gate = Arc::new(GatedClassifier::new(FixedClassifier::single("fear")));
    let executor = executor_with(gate.clone(), 1);

    // The only worker blocks inside the emotion model.
    let running = executor.submit(request("first"));
    wait_until(|| gate.entered() == 1).await;
    let timed_out = tokio::time::timeout(Duration::from_millis(20), running).await;
    assert!(timed_out.is_err());

    // Queued behind the running job, then abandoned.
    drop(executor.submit(request("second")));

    gate.open();
    let result = executor.submit(request("third")).await.unwrap();
    assert_eq!(result.emotion(), &EmotionLabel::Fear);

    // first ran to completion, second was skipped, third ran
    assert_eq!(gate.calls(), 2);
    assert_eq!(gate.entered(), 2);
    executor.shutdown();
}

#[tokio::test]
async fn shut_down_executor_rejects_work() {
    let executor = executor_with(Arc::new(FixedClassifier::single("joy")), 1);
    executor.shutdown();
    assert!(executor.is_closed());

    let err = executor.submit(request("too late")).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ExecutorClosed));
    assert_eq!(err.kind(), ErrorKind::ExecutorUnavailable);
}

#[tokio::test]
async fn panicking_job_fails_alone() {
    let executor = executor_with(Arc::new(PanickingClassifier), 1);

    let err = executor.submit(request("boom")).await.unwrap_err();
    match err {
        AnalysisError::WorkerFailed(message) => assert!(message.contains("kernel exploded")),
        other => panic!("unexpected error: {other}"),
    }

    // the worker survives
    let result = executor.submit(request("calm evening")).await.unwrap();
    assert_eq!(result.emotion(), &EmotionLabel::Joy);
    executor.shutdown();
}
