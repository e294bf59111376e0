mod test_utils;

use marketplace::error::ServiceError;
use marketplace::evaluation::{build_evaluation_prompt, EvaluationService};
use marketplace::model::{EvaluationRequest, ProductInfo};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use test_utils::{test_user, MockEvaluationStorage, MockInferenceClient};

const VALID_RESPONSE: &str = r#"{
    "estimatedPrice": { "min": 180, "max": 260, "recommended": 220 },
    "confidenceScore": 0.82,
    "conditionAssessment": "Good condition with light wear",
    "keyFactors": ["GPU generation", "mining history unknown"],
    "marketDemand": "High",
    "recommendations": ["List with benchmark screenshots"],
    "summary": "A solid mid-range card."
}"#;

fn gpu_request() -> EvaluationRequest {
    let mut questions_answers = BTreeMap::new();
    questions_answers.insert(
        "Was it used for mining?".to_string(),
        "No, gaming only".to_string(),
    );
    questions_answers.insert(
        "Original box included?".to_string(),
        "Yes".to_string(),
    );

    EvaluationRequest {
        product_info: ProductInfo {
            category: "gpu".to_string(),
            brand: "NVIDIA".to_string(),
            model: "RTX 3070".to_string(),
            condition: "used".to_string(),
            specifications: serde_json::json!({ "vram_gb": 8 }),
        },
        images: vec![],
        questions_answers,
    }
}

#[test]
fn prompt_contains_product_fields_and_qa_pairs() {
    let request = gpu_request();
    let prompt = build_evaluation_prompt(&request.product_info, &request.questions_answers);

    assert!(prompt.contains("Product Category: gpu"));
    assert!(prompt.contains("Brand: NVIDIA"));
    assert!(prompt.contains("Model: RTX 3070"));
    assert!(prompt.contains("Condition: used"));
    assert!(prompt.contains("\"vram_gb\": 8"));
    assert!(prompt.contains("Q: Was it used for mining?"));
    assert!(prompt.contains("A: No, gaming only"));
    assert!(prompt.contains("Respond in JSON format"));
}

#[tokio::test]
async fn successful_evaluation_is_parsed_and_persisted() {
    let inference = Arc::new(MockInferenceClient::returning(VALID_RESPONSE));
    let store = Arc::new(MockEvaluationStorage::default());
    let service = EvaluationService::new(inference.clone(), store.clone());

    let user = test_user();
    let outcome = service
        .evaluate(Some(&user), gpu_request())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.result.confidence_score, 0.82);
    assert_eq!(inference.calls.load(Ordering::SeqCst), 1);

    let completed = store.completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].0, outcome.evaluation_id);
}

#[tokio::test]
async fn unauthenticated_caller_is_rejected_without_side_effects() {
    let inference = Arc::new(MockInferenceClient::returning(VALID_RESPONSE));
    let store = Arc::new(MockEvaluationStorage::default());
    let service = EvaluationService::new(inference.clone(), store.clone());

    let err = service.evaluate(None, gpu_request()).await.unwrap_err();

    assert!(matches!(err, ServiceError::Unauthenticated));
    assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    assert!(store.inserted_for.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_json_inference_content_is_an_upstream_parse_error() {
    let inference = Arc::new(MockInferenceClient::returning(
        "Sure! Here's my evaluation: it's worth about $220.",
    ));
    let store = Arc::new(MockEvaluationStorage::default());
    let service = EvaluationService::new(inference, store.clone());

    let user = test_user();
    let err = service
        .evaluate(Some(&user), gpu_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::UpstreamParse(_)));
    // The record stays in `processing`; nothing was marked completed.
    assert!(store.completed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn inference_transport_failure_is_an_upstream_request_error() {
    let inference = Arc::new(MockInferenceClient {
        content: String::new(),
        fail: true,
        calls: std::sync::atomic::AtomicUsize::new(0),
    });
    let store = Arc::new(MockEvaluationStorage::default());
    let service = EvaluationService::new(inference, store);

    let user = test_user();
    let err = service
        .evaluate(Some(&user), gpu_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::UpstreamRequest(_)));
}

#[tokio::test]
async fn record_insert_failure_stops_before_inference() {
    let inference = Arc::new(MockInferenceClient::returning(VALID_RESPONSE));
    let store = Arc::new(MockEvaluationStorage {
        fail_insert: true,
        ..Default::default()
    });
    let service = EvaluationService::new(inference.clone(), store);

    let user = test_user();
    let err = service
        .evaluate(Some(&user), gpu_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::StoreWrite(_)));
    assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
}
