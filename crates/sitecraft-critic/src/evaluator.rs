use async_trait::async_trait;
use sitecraft_llm::{CompletionRequest, LlmClient};
use tracing::{debug, info};

use crate::cleanup::{looks_like_html, strip_code_fences};
use crate::{
    CriticPrompts, Evaluation, EvaluationError, Judge, RefinementContext, RefinementError,
    RefinementInput, Refiner,
};

const JUDGE_MAX_TOKENS: u32 = 2048;
const REFINER_MAX_TOKENS: u32 = 16_000;

/// Judge backed by an LLM provider
pub struct LlmJudge<'a> {
    client: &'a dyn LlmClient,
}

impl<'a> LlmJudge<'a> {
    pub fn new(client: &'a dyn LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Judge for LlmJudge<'_> {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn evaluate(
        &self,
        artifact: &str,
        context: &RefinementContext,
    ) -> Result<Evaluation, EvaluationError> {
        let prompt = CriticPrompts::build_evaluation_prompt(artifact, context);
        debug!(
            prompt_len = prompt.len(),
            model = self.client.model(),
            "Running judge evaluation"
        );

        let request = CompletionRequest::new(prompt)
            .with_system(CriticPrompts::judge_system_prompt())
            .with_max_tokens(JUDGE_MAX_TOKENS)
            .with_temperature(0.0);
        let reply = self.client.complete(&request).await?;

        let evaluation = Evaluation::parse(&reply)?;
        info!(
            score = evaluation.overall_score,
            suggestions = evaluation.suggestions.len(),
            "Judge completed"
        );
        Ok(evaluation)
    }
}

/// Refiner backed by an LLM provider
pub struct LlmRefiner<'a> {
    client: &'a dyn LlmClient,
}

impl<'a> LlmRefiner<'a> {
    pub fn new(client: &'a dyn LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Refiner for LlmRefiner<'_> {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn refine(&self, input: RefinementInput<'_>) -> Result<String, RefinementError> {
        let prompt = CriticPrompts::build_refinement_prompt(
            input.artifact,
            input.evaluation,
            input.focus,
            input.context,
        );
        debug!(
            prompt_len = prompt.len(),
            iteration = input.iteration,
            model = self.client.model(),
            "Running refiner"
        );

        let request = CompletionRequest::new(prompt)
            .with_system(CriticPrompts::refiner_system_prompt())
            .with_max_tokens(REFINER_MAX_TOKENS);
        let reply = self.client.complete(&request).await?;

        let html = strip_code_fences(&reply);
        if html.is_empty() {
            return Err(RefinementError::EmptyOutput);
        }
        if !looks_like_html(html) {
            let preview: String = html.chars().take(80).collect();
            return Err(RefinementError::InvalidOutput(format!(
                "no HTML document found (starts with {:?})",
                preview
            )));
        }

        info!(
            iteration = input.iteration,
            output_len = html.len(),
            "Refiner completed"
        );
        Ok(html.to_string())
    }
}
