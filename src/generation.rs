use std::sync::Arc;

use crate::config::ANSWER_TEMPERATURE;
use crate::error::{ChatError, ChatResult};
use crate::providers::TextGenerator;

const SYSTEM_PROMPT: &str = "You are a study assistant for a nutrition textbook.\n\
Rules:\n\
- Answer only with information found in the numbered context passages. Do not use outside knowledge.\n\
- After every claim, cite the passage(s) supporting it with their number in square brackets, e.g. [1] or [2][3].\n\
- Only use numbers that appear in the context.\n\
- If the context does not contain the answer, say that the textbook passages provided do not cover it.\n\
- Keep the answer concise and do not wrap it in code fences.";

#[derive(Clone)]
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    /// Generates an answer grounded in `context`. The text may cite any number of
    /// passages, including numbers that do not exist.
    pub async fn generate(&self, question: &str, context: &str) -> ChatResult<String> {
        let user = build_user_message(question, context);
        self.generator
            .generate(&self.model, SYSTEM_PROMPT, &user, ANSWER_TEMPERATURE)
            .await
            .map_err(ChatError::Generation)
    }
}

fn build_user_message(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGenerator;

    #[tokio::test]
    async fn sends_context_question_and_low_temperature() {
        let fake = Arc::new(FakeGenerator::replying("Fiber aids digestion [1]."));
        let generator = AnswerGenerator::new(fake.clone(), "gpt-4o-mini");

        let answer = generator
            .generate("What does fiber do?", "[1] (Page 80) Fiber aids digestion.")
            .await
            .unwrap();

        assert_eq!(answer, "Fiber aids digestion [1].");
        let (system, user, temperature) = fake.last_prompt.lock().unwrap().clone().unwrap();
        assert!(system.contains("[1]"));
        assert!(system.contains("Answer only with information found"));
        assert_eq!(
            user,
            "Context:\n[1] (Page 80) Fiber aids digestion.\n\nQuestion: What does fiber do?"
        );
        assert!((temperature - ANSWER_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() {
        let generator = AnswerGenerator::new(Arc::new(FakeGenerator::failing()), "m");
        let err = generator.generate("q", "[1] (Page ?) c").await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));
        assert!(err.to_string().contains("503"));
    }
}
