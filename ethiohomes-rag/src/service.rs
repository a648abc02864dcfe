//! The question-answering entry point.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::composer::AnswerComposer;
use crate::retriever::Retriever;

/// Reply to an empty or whitespace-only question.
pub const EMPTY_QUERY_MESSAGE: &str =
    "Please ask me something about properties in Addis Ababa or Bahir Dar!";

/// Reply when the listing search itself failed.
pub const SEARCH_UNAVAILABLE_MESSAGE: &str =
    "Sorry, I couldn't search the listings right now. Please try again in a moment.";

/// Answers free-text questions about the listings.
///
/// Holds no per-query state, so a single instance can serve concurrent
/// callers.
///
/// # Example
///
/// ```rust,ignore
/// let service = QueryService::new(Arc::new(retriever), Arc::new(composer));
/// let reply = service.answer_query("3 bedroom villa in Addis Ababa").await;
/// ```
#[derive(Clone)]
pub struct QueryService {
    retriever: Arc<Retriever>,
    composer: Arc<AnswerComposer>,
}

impl QueryService {
    pub fn new(retriever: Arc<Retriever>, composer: Arc<AnswerComposer>) -> Self {
        Self { retriever, composer }
    }

    /// Answer `question`. Always returns user-facing text.
    #[instrument(skip(self), fields(question_len = question.len()))]
    pub async fn answer_query(&self, question: &str) -> String {
        let question = question.trim();
        if question.is_empty() {
            return EMPTY_QUERY_MESSAGE.to_string();
        }

        let results = match self.retriever.retrieve(question).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "listing search failed");
                return SEARCH_UNAVAILABLE_MESSAGE.to_string();
            }
        };

        let answer = self.composer.compose(question, &results).await;
        info!(result_count = results.len(), generated = answer.is_generated(), "answered query");
        answer.to_string()
    }
}
