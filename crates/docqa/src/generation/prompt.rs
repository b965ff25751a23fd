//! Prompt templates for query expansion and grounded answering

use crate::retrieval::ScoredChunk;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Ask the model for alternative phrasings of a question, one per line
    pub fn paraphrase_prompt(question: &str, count: usize) -> String {
        format!(
            "You are an AI language model assistant. Your task is to generate {count} \
different versions of the user's question to retrieve relevant documents from the database. \
By generating multiple perspectives on the user question, your goal is to help the user \
overcome some of the limitations of the distance-based similarity search. Provide these \
alternative questions separated by new lines.\nOriginal Question: {question}",
            count = number_word(count),
            question = question
        )
    }

    /// Build context from retrieved chunks
    pub fn build_context(results: &[ScoredChunk]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                result.chunk.source.format_reference(),
                result.chunk.content
            ));
        }

        context
    }

    /// Final prompt restricting the model to the retrieved context
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        format!(
            "Answer the questions based on only the following context:\n{context}\n\
             Question: {question}\n",
            context = context,
            question = question
        )
    }
}

fn number_word(n: usize) -> String {
    const WORDS: [&str; 11] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    WORDS.get(n).map(|w| w.to_string()).unwrap_or_else(|| n.to_string())
}
