//! Multi-query retrieval-augmented answering

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::retrieval::{parse_paraphrases, Corpus, MultiQueryRetriever, ScoredChunk};

use super::prompt::PromptBuilder;

/// Result of answering one question
#[derive(Debug, Clone)]
pub struct Answer {
    /// Model output
    pub text: String,
    /// Queries searched: the question itself, then its paraphrases
    pub queries: Vec<String>,
    /// Unique chunks the answer was grounded on
    pub context: Vec<ScoredChunk>,
}

/// Expands a question into paraphrases, retrieves for all of them and asks
/// the model to answer from the merged context only
pub struct AnswerEngine {
    llm: Arc<dyn LlmProvider>,
    retriever: MultiQueryRetriever,
    paraphrase_count: usize,
}

impl AnswerEngine {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        retriever: MultiQueryRetriever,
        paraphrase_count: usize,
    ) -> Self {
        Self {
            llm,
            retriever,
            paraphrase_count,
        }
    }

    /// Answer `question` against one corpus snapshot
    pub async fn answer(&self, corpus: &Corpus, question: &str) -> Result<Answer> {
        let start = Instant::now();

        let expansion = self
            .llm
            .generate(&PromptBuilder::paraphrase_prompt(question, self.paraphrase_count))
            .await
            .map_err(as_generation_error)?;

        let mut queries = vec![question.to_string()];
        queries.extend(
            parse_paraphrases(&expansion)
                .into_iter()
                .filter(|q| q != question),
        );
        tracing::debug!("Expanded question into {} queries", queries.len());

        let context = self.retriever.retrieve(corpus, &queries).await?;

        let context_text = PromptBuilder::build_context(&context);
        let prompt = PromptBuilder::build_answer_prompt(question, &context_text);
        let text = self.llm.generate(&prompt).await.map_err(as_generation_error)?;

        tracing::info!(
            "Answered from {} chunks of '{}' with {} in {}ms",
            context.len(),
            corpus.document(),
            self.llm.model(),
            start.elapsed().as_millis()
        );

        Ok(Answer {
            text,
            queries,
            context,
        })
    }
}

fn as_generation_error(e: Error) -> Error {
    match e {
        Error::Generation(_) | Error::Timeout { .. } => e,
        other => Error::generation(other.to_string()),
    }
}
