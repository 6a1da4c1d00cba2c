mod common;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use common::{ScriptedGateway, configured, image_reply, library_store, unconfigured};
use readaloud::error::StoreError;
use readaloud::store::{PAGES_TABLE, Query, Row, RowStore, library};
use readaloud::{
    CallProfiles, DifficultyLevel, EvaluationRequest, FailurePolicy, FallbackReason,
    GatewayError, ImageContext, ImageRequest, Orchestrator, ResultSource, RetryPolicy,
    SideEffect, VocabularyRequest,
};

fn orchestrator(gateway: Arc<ScriptedGateway>, config: &readaloud::AiConfig) -> Orchestrator {
    Orchestrator::new(gateway, config)
        .with_profiles(CallProfiles::default().with_retry(RetryPolicy::disabled()))
}

fn reading() -> EvaluationRequest {
    EvaluationRequest::new("the cat sat", "the cat sat", Some(0.9))
}

#[tokio::test]
async fn ai_evaluation_is_used_and_clamped() {
    let gateway = Arc::new(ScriptedGateway::replying(
        json!({
            "pronunciationScore": 120,
            "fluencyScore": 88.4,
            "accuracyScore": 95,
            "suggestions": ["Great reading!"]
        })
        .to_string(),
    ));
    let result = orchestrator(gateway.clone(), &configured())
        .evaluate_pronunciation(&reading())
        .await;

    assert_eq!(result.source, ResultSource::Ai);
    assert_eq!(result.fallback_reason, None);
    assert_eq!(result.value.pronunciation_score, 100);
    assert_eq!(result.value.fluency_score, 88);
    assert_eq!(result.value.suggestions, vec!["Great reading!"]);
    assert_eq!(gateway.operations(), vec!["pronunciation"]);
}

#[tokio::test]
async fn code_fenced_json_is_accepted() {
    let fenced = "```json\n{\"pronunciationScore\": 70, \"fluencyScore\": 80, \
                  \"accuracyScore\": 90, \"suggestions\": []}\n```";
    let gateway = Arc::new(ScriptedGateway::replying(fenced));
    let result = orchestrator(gateway, &configured())
        .evaluate_pronunciation(&reading())
        .await;
    assert_eq!(result.source, ResultSource::Ai);
    assert_eq!(result.value.accuracy_score, 90);
}

#[tokio::test]
async fn fenced_image_replies_with_prose_or_one_line_are_accepted() {
    let fenced = format!("```json\n{}\n```\nHope this helps!", image_reply("A fox naps."));
    let gateway = Arc::new(ScriptedGateway::replying(fenced).then(Ok(
        "```{\"description\": \"A fox wakes.\"}```".to_string(),
    )));
    let orchestrator = orchestrator(gateway, &configured());
    let request = ImageRequest::new("https://img.test/1.png", ImageContext::Story);

    let first = orchestrator
        .analyze_image(&request, FailurePolicy::FailOnError)
        .await
        .expect("one-line fence parses");
    assert_eq!(first.value.description, "A fox wakes.");

    let second = orchestrator
        .analyze_image(&request, FailurePolicy::FailOnError)
        .await
        .expect("fence followed by prose parses");
    assert_eq!(second.source, ResultSource::Ai);
    assert_eq!(second.value.description, "A fox naps.");
}

#[tokio::test]
async fn malformed_reply_falls_back_to_heuristic() {
    let gateway = Arc::new(ScriptedGateway::replying("The child read very well!"));
    let result = orchestrator(gateway, &configured())
        .evaluate_pronunciation(&reading())
        .await;

    assert_eq!(result.source, ResultSource::Heuristic);
    assert_eq!(result.fallback_reason, Some(FallbackReason::Malformed));
    assert_eq!(result.value.accuracy_score, 100);
    assert_eq!(result.value.pronunciation_score, 90);
    assert!(!result.value.suggestions.is_empty());
}

#[tokio::test]
async fn http_error_falls_back_to_heuristic() {
    let gateway = Arc::new(ScriptedGateway::failing(GatewayError::Http {
        status: 500,
        body: "oops".into(),
    }));
    let result = orchestrator(gateway.clone(), &configured())
        .evaluate_pronunciation(&reading())
        .await;

    assert_eq!(result.source, ResultSource::Heuristic);
    assert_eq!(result.fallback_reason, Some(FallbackReason::Http));
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn retries_happen_before_falling_back() {
    let gateway = Arc::new(ScriptedGateway::failing(GatewayError::Network("reset".into())));
    let orchestrator = Orchestrator::new(gateway.clone(), &configured());
    let result = orchestrator.evaluate_pronunciation(&reading()).await;

    assert_eq!(result.fallback_reason, Some(FallbackReason::Transport));
    assert_eq!(gateway.call_count(), 3);
}

#[tokio::test]
async fn unconfigured_never_calls_the_gateway() {
    let gateway = Arc::new(ScriptedGateway::replying("{}"));
    let orchestrator = orchestrator(gateway.clone(), &unconfigured());

    let evaluation = orchestrator.evaluate_pronunciation(&reading()).await;
    let vocabulary = orchestrator
        .extract_vocabulary(&VocabularyRequest::new(
            "The brave little fox jumped over the fence",
            DifficultyLevel::Beginner,
            Some(3),
        ))
        .await;
    let image = orchestrator
        .analyze_image(
            &ImageRequest::new("https://img.test/1.png", ImageContext::Cover),
            FailurePolicy::FallbackOnError,
        )
        .await
        .unwrap();

    assert_eq!(gateway.call_count(), 0);
    for reason in [
        evaluation.fallback_reason,
        vocabulary.fallback_reason,
        image.fallback_reason,
    ] {
        assert_eq!(reason, Some(FallbackReason::Unconfigured));
    }
    let words: Vec<&str> = vocabulary.value.iter().map(|i| i.word.as_str()).collect();
    assert_eq!(words, vec!["brave", "little", "jumped"]);
}

#[tokio::test]
async fn fail_on_error_surfaces_the_gateway_error() {
    let gateway = Arc::new(ScriptedGateway::failing(GatewayError::Timeout(
        std::time::Duration::from_secs(30),
    )));
    let err = orchestrator(gateway, &configured())
        .analyze_image(
            &ImageRequest::new("https://img.test/1.png", ImageContext::Story),
            FailurePolicy::FailOnError,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)));

    let err = orchestrator(Arc::new(ScriptedGateway::replying("{}")), &unconfigured())
        .analyze_image(
            &ImageRequest::new("https://img.test/1.png", ImageContext::Story),
            FailurePolicy::FailOnError,
        )
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Unconfigured);
}

#[tokio::test]
async fn ai_vocabulary_is_normalized_and_capped() {
    let reply = json!([
        {"word": "Meadow", "definition": "a grassy field", "partOfSpeech": "noun",
         "exampleSentence": "Cows graze in the meadow."},
        {"word": "meadow", "definition": "dup", "partOfSpeech": "noun", "exampleSentence": "x"},
        {"word": "Gallop", "definition": "run fast", "partOfSpeech": "verb",
         "exampleSentence": "Horses gallop."},
        {"word": "Shimmer", "definition": "shine softly", "partOfSpeech": "verb",
         "exampleSentence": "The lake shimmers."}
    ]);
    let gateway = Arc::new(ScriptedGateway::replying(reply.to_string()));
    let result = orchestrator(gateway, &configured())
        .extract_vocabulary(&VocabularyRequest::new(
            "horses in a meadow",
            DifficultyLevel::Intermediate,
            Some(2),
        ))
        .await;

    assert_eq!(result.source, ResultSource::Ai);
    let words: Vec<&str> = result.value.iter().map(|i| i.word.as_str()).collect();
    assert_eq!(words, vec!["meadow", "gallop"]);
    assert!(result
        .value
        .iter()
        .all(|i| i.difficulty_level == DifficultyLevel::Intermediate));
}

#[tokio::test]
async fn describe_page_persists_description() {
    let store = library_store();
    let gateway = Arc::new(ScriptedGateway::replying(image_reply("A fox in the snow.")));
    let described = orchestrator(gateway, &configured())
        .describe_page(
            &store,
            "p1",
            &ImageRequest::new("https://img.test/1.png", ImageContext::Story),
            FailurePolicy::FallbackOnError,
        )
        .await
        .unwrap();

    assert_eq!(described.analysis.source, ResultSource::Ai);
    assert_eq!(described.persistence, SideEffect::Applied);
    let page = library::find_page(&store, "p1").await.unwrap().unwrap();
    assert_eq!(page.description.as_deref(), Some("A fox in the snow."));
}

/// Row store whose writes always fail.
struct ReadOnlyStore;

#[async_trait]
impl RowStore for ReadOnlyStore {
    fn name(&self) -> &str {
        "read-only"
    }

    async fn select(&self, _query: &Query) -> Result<Vec<Row>, StoreError> {
        Ok(Vec::new())
    }

    async fn insert(&self, _table: &str, _row: Row) -> Result<Row, StoreError> {
        Err(StoreError::Backend("read-only".into()))
    }

    async fn update(&self, _table: &str, _id: &str, _patch: Row) -> Result<Row, StoreError> {
        Err(StoreError::Backend("disk full".into()))
    }

    async fn delete(&self, _table: &str, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("read-only".into()))
    }
}

#[tokio::test]
async fn failed_persistence_still_returns_the_analysis() {
    let gateway = Arc::new(ScriptedGateway::replying(image_reply("A fox in the snow.")));
    let described = orchestrator(gateway, &configured())
        .describe_page(
            &ReadOnlyStore,
            "p1",
            &ImageRequest::new("https://img.test/1.png", ImageContext::Story),
            FailurePolicy::FallbackOnError,
        )
        .await
        .unwrap();

    assert_eq!(described.analysis.value.description, "A fox in the snow.");
    match described.persistence {
        SideEffect::Failed(message) => assert!(message.contains("disk full")),
        other => panic!("expected failed persistence, got {other:?}"),
    }
}

#[tokio::test]
async fn persistence_to_missing_page_is_reported() {
    let store = library_store();
    let gateway = Arc::new(ScriptedGateway::replying(image_reply("Snow.")));
    let described = orchestrator(gateway, &configured())
        .describe_page(
            &store,
            "missing",
            &ImageRequest::new("https://img.test/x.png", ImageContext::Default),
            FailurePolicy::FallbackOnError,
        )
        .await
        .unwrap();
    assert!(!described.persistence.is_applied());
    assert_eq!(store.rows(PAGES_TABLE).await.len(), 3);
}
