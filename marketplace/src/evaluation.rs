use crate::auth::AuthenticatedUser;
use crate::error::ServiceError;
use crate::inference::InferenceClient;
use crate::model::{EvaluationRequest, EvaluationResult, ProductInfo};
use crate::storage::EvaluationStorage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const SYSTEM_PROMPT: &str = "You are a professional PC hardware evaluator with \
extensive market knowledge. Provide accurate, detailed evaluations based on current \
market conditions.";

/// Render the structured product description and Q&A into the evaluation
/// prompt. The response-shape instructions pin the JSON structure the
/// service parses afterwards.
pub fn build_evaluation_prompt(
    product_info: &ProductInfo,
    questions_answers: &BTreeMap<String, String>,
) -> String {
    let specifications = serde_json::to_string_pretty(&product_info.specifications)
        .unwrap_or_else(|_| "{}".to_string());

    let mut qa_block = String::new();
    for (question, answer) in questions_answers {
        let _ = write!(qa_block, "Q: {question}\nA: {answer}\n\n");
    }

    format!(
        "You are an expert PC component evaluator. Analyze the following information \
and provide a detailed evaluation:\n\n\
Product Category: {category}\n\
Brand: {brand}\n\
Model: {model}\n\
Condition: {condition}\n\
Specifications: {specifications}\n\n\
User Q&A:\n{qa_block}\
Based on this information, provide:\n\
1. Estimated market value range (min-max USD)\n\
2. Key factors affecting price\n\
3. Condition assessment\n\
4. Market demand analysis\n\
5. Recommendations for selling\n\
6. Confidence score (0-1)\n\n\
Respond in JSON format with the following structure:\n\
{{\n\
  \"estimatedPrice\": {{ \"min\": number, \"max\": number, \"recommended\": number }},\n\
  \"confidenceScore\": number,\n\
  \"conditionAssessment\": string,\n\
  \"keyFactors\": string[],\n\
  \"marketDemand\": string,\n\
  \"recommendations\": string[],\n\
  \"summary\": string\n\
}}",
        category = product_info.category,
        brand = product_info.brand,
        model = product_info.model,
        condition = product_info.condition,
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub success: bool,
    pub evaluation_id: Uuid,
    pub result: EvaluationResult,
}

/// Builds the evaluation prompt, forwards it to the inference API and
/// persists the parsed response.
pub struct EvaluationService {
    inference: Arc<dyn InferenceClient>,
    store: Arc<dyn EvaluationStorage>,
}

impl EvaluationService {
    pub fn new(inference: Arc<dyn InferenceClient>, store: Arc<dyn EvaluationStorage>) -> Self {
        Self { inference, store }
    }

    pub async fn evaluate(
        &self,
        identity: Option<&AuthenticatedUser>,
        request: EvaluationRequest,
    ) -> Result<EvaluationOutcome, ServiceError> {
        let Some(user) = identity else {
            return Err(ServiceError::Unauthenticated);
        };

        let evaluation_id = self
            .store
            .insert_processing(user.id, &request)
            .await
            .map_err(|e| ServiceError::StoreWrite(e.to_string()))?;

        let prompt = build_evaluation_prompt(&request.product_info, &request.questions_answers);
        let content = self
            .inference
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| ServiceError::UpstreamRequest(e.to_string()))?;

        let result: EvaluationResult = serde_json::from_str(&content).map_err(|e| {
            warn!(%evaluation_id, error = %e, "inference response was not parseable JSON");
            ServiceError::UpstreamParse(e.to_string())
        })?;

        self.store
            .mark_completed(evaluation_id, &result)
            .await
            .map_err(|e| ServiceError::StoreWrite(e.to_string()))?;

        info!(%evaluation_id, confidence = result.confidence_score, "evaluation completed");

        Ok(EvaluationOutcome {
            success: true,
            evaluation_id,
            result,
        })
    }
}
