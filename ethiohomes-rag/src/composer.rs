//! Turns retrieved listings into the agent's reply.
//!
//! The composer renders up to [`MAX_LISTED`] results as a numbered context
//! block, wraps it in the agent prompt and asks the [`GenerationProvider`] for
//! the final text. A failed generation never fails the request: the caller
//! gets [`Answer::Degraded`] with the formatted listings instead.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::document::{DocumentMetadata, SearchResult};
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::invoke::{CallPolicy, call_with_policy};

/// Most listings ever placed in the context block.
pub const MAX_LISTED: usize = 5;

/// Reply when retrieval found nothing.
pub const NO_RESULTS_MESSAGE: &str = "Sorry, I couldn't find any properties right now. \
     Try: 'houses in Addis Ababa' or 'apartments in Bahir Dar'";

const FALLBACK_HIGHLIGHT: &str = "Great option!";

/// The reply to one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Text produced by the generation provider.
    Generated(String),
    /// Retrieval returned no listings; generation was not attempted.
    NoResults,
    /// Generation failed; the formatted listings are returned as-is.
    Degraded {
        /// Description of the generation failure.
        error: String,
        /// The numbered listing block that would have been sent to the model.
        context: String,
    },
}

impl Answer {
    /// Whether the answer came from the model.
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated(text) => f.write_str(text),
            Self::NoResults => f.write_str(NO_RESULTS_MESSAGE),
            Self::Degraded { error, context } => {
                write!(f, "AI error: {error}. But your properties are ready!\n\n{context}")
            }
        }
    }
}

/// Formats retrieved listings and drives the generation step.
pub struct AnswerComposer {
    generator: Arc<dyn GenerationProvider>,
    policy: CallPolicy,
    max_listed: usize,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn GenerationProvider>) -> Self {
        Self { generator, policy: CallPolicy::generation(), max_listed: MAX_LISTED }
    }

    /// Override the timeout/retry policy for generation calls.
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap the number of listings placed in the context block (at least one).
    pub fn with_max_listed(mut self, max_listed: usize) -> Self {
        self.max_listed = max_listed.max(1);
        self
    }

    /// Compose the reply to `question` from `results`.
    ///
    /// Never fails; see [`Answer`] for the possible outcomes.
    pub async fn compose(&self, question: &str, results: &[SearchResult]) -> Answer {
        if results.is_empty() {
            info!("no listings matched, returning fallback suggestions");
            return Answer::NoResults;
        }

        let context = self.build_context(results);
        let prompt = build_prompt(question, &context, self.max_listed);

        match self.generate(&prompt).await {
            Ok(text) => {
                info!(model = self.generator.model_name(), "generated answer");
                Answer::Generated(text)
            }
            Err(e) => {
                error!(error = %e, "generation failed, returning listings without commentary");
                Answer::Degraded { error: e.to_string(), context }
            }
        }
    }

    /// Render up to `max_listed` results as numbered blocks separated by a blank line.
    pub fn build_context(&self, results: &[SearchResult]) -> String {
        results
            .iter()
            .take(self.max_listed)
            .enumerate()
            .map(|(i, result)| render_listing(i + 1, &result.document.metadata))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let generator = self.generator.as_ref();
        let text =
            call_with_policy(&self.policy, "generate answer", move || generator.generate(prompt))
                .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(RagError::GenerationError {
                provider: generator.model_name().to_string(),
                message: "model returned an empty response".to_string(),
            });
        }
        Ok(text.to_string())
    }
}

/// The agent prompt: persona, the user's question, the listings and reply rules.
pub fn build_prompt(question: &str, context: &str, max_listed: usize) -> String {
    format!(
        r#"You are a friendly, professional real estate agent in Ethiopia (Addis Ababa & Bahir Dar).

User asked: "{question}"

Here are the top matching properties from the database:
{context}

INSTRUCTIONS:
- List up to {max_listed} properties in a clean, numbered format
- For each: Property ID, type, bedrooms/bathrooms, price, location, status
- Highlight the best feature (from title/description)
- Prioritize "Available" properties
- End with: "My top recommendation: Property #X — best match for you!"
- Finally ask: "Which one interests you? Want photos or more details?"

Be natural, warm, and exciting. Never make up details."#
    )
}

fn render_listing(position: usize, meta: &DocumentMetadata) -> String {
    let property_type = if meta.property_type.is_empty() {
        "Home".to_string()
    } else {
        title_case(&meta.property_type)
    };
    let location = if meta.location.is_empty() { "Ethiopia" } else { meta.location.as_str() };

    format!(
        "{position}. Property #{id} — {property_type}\n   \
         📍 {location} • {bedrooms} bed • {bathrooms} bath\n   \
         💰 {price} ETB • Status: {status}\n   \
         → {highlight}",
        id = meta.property_id,
        bedrooms = meta.bedrooms,
        bathrooms = meta.bathrooms,
        price = format_thousands(meta.price),
        status = meta.status,
        highlight = highlight(meta),
    )
}

/// First sentence of the description, else the title, else a stock phrase.
fn highlight(meta: &DocumentMetadata) -> &str {
    let first_sentence = meta
        .description
        .as_deref()
        .and_then(|d| d.split('.').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let title = meta.title.as_deref().map(str::trim).filter(|s| !s.is_empty());
    first_sentence.or(title).unwrap_or(FALLBACK_HIGHLIGHT)
}

/// Capitalise the first letter of every word and lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// `2500000` → `2,500,000`.
fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::document::Document;
    use crate::record::PropertyStatus;

    struct EchoGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EchoGenerator {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail }
        }
    }

    #[async_trait]
    impl GenerationProvider for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RagError::GenerationError {
                    provider: "echo".into(),
                    message: "model not loaded".into(),
                });
            }
            Ok(format!("  {prompt}  "))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct StalledGenerator;

    #[async_trait]
    impl GenerationProvider for StalledGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("too late".to_string())
        }

        fn model_name(&self) -> &str {
            "stalled"
        }
    }

    fn result(id: &str, description: Option<&str>, title: Option<&str>) -> SearchResult {
        SearchResult {
            document: Document {
                id: id.into(),
                body: String::new(),
                metadata: DocumentMetadata {
                    property_id: id.into(),
                    title: title.map(String::from),
                    description: description.map(String::from),
                    location: "Bahir Dar".into(),
                    property_type: "apartment".into(),
                    price: 2_500_000,
                    bedrooms: 2,
                    bathrooms: 1,
                    status: PropertyStatus::Available,
                },
            },
            score: 0.9,
        }
    }

    fn composer(generator: Arc<EchoGenerator>) -> AnswerComposer {
        AnswerComposer::new(generator).with_policy(
            CallPolicy::generation().with_retries(0).with_timeout(Duration::from_secs(5)),
        )
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(2_500_000), "2,500,000");
        assert_eq!(format_thousands(12_345_678), "12,345,678");
    }

    #[test]
    fn title_cases_like_labels() {
        assert_eq!(title_case("apartment"), "Apartment");
        assert_eq!(title_case("VILLA house"), "Villa House");
        assert_eq!(title_case("g+1 building"), "G+1 Building");
    }

    #[test]
    fn highlight_falls_back() {
        let with_desc = result("1", Some("Lake view. New kitchen."), Some("Flat"));
        assert_eq!(highlight(&with_desc.document.metadata), "Lake view");

        let title_only = result("2", None, Some("Cozy Studio"));
        assert_eq!(highlight(&title_only.document.metadata), "Cozy Studio");

        let neither = result("3", Some("   "), None);
        assert_eq!(highlight(&neither.document.metadata), FALLBACK_HIGHLIGHT);
    }

    #[test]
    fn renders_numbered_block() {
        let listing = result("101", Some("Near the lake."), None);
        let block = render_listing(1, &listing.document.metadata);
        assert_eq!(
            block,
            "1. Property #101 — Apartment\n   \
             📍 Bahir Dar • 2 bed • 1 bath\n   \
             💰 2,500,000 ETB • Status: Available\n   \
             → Near the lake"
        );
    }

    #[test]
    fn context_caps_at_five() {
        let composer = composer(Arc::new(EchoGenerator::new(false)));
        let results: Vec<SearchResult> =
            (1..=7).map(|i| result(&i.to_string(), None, None)).collect();
        let context = composer.build_context(&results);
        assert!(context.contains("5. Property #5"));
        assert!(!context.contains("6. Property #6"));
        assert_eq!(context.matches("\n\n").count(), 4);
    }

    #[test]
    fn max_listed_is_configurable() {
        let composer = composer(Arc::new(EchoGenerator::new(false))).with_max_listed(2);
        let results: Vec<SearchResult> =
            (1..=4).map(|i| result(&i.to_string(), None, None)).collect();
        let context = composer.build_context(&results);
        assert!(context.contains("2. Property #2"));
        assert!(!context.contains("3. Property #3"));

        let floor = composer.with_max_listed(0).build_context(&results);
        assert!(floor.contains("1. Property #1"));
        assert!(!floor.contains("2. Property #2"));
    }

    #[tokio::test]
    async fn prompt_asks_for_configured_count() {
        let generator = Arc::new(EchoGenerator::new(false));
        let answer = composer(Arc::clone(&generator))
            .with_max_listed(3)
            .compose("flats", &[result("1", None, None)])
            .await;
        assert!(answer.to_string().contains("List up to 3 properties"));
    }

    #[test]
    fn prompt_embeds_question_and_context() {
        let prompt = build_prompt("villas in Bole", "1. Property #9", 5);
        assert!(prompt.contains("real estate agent in Ethiopia"));
        assert!(prompt.contains("User asked: \"villas in Bole\""));
        assert!(prompt.contains("1. Property #9"));
        assert!(prompt.contains("My top recommendation: Property #X"));
        assert!(prompt.contains("Want photos or more details?"));
    }

    #[tokio::test]
    async fn empty_results_skip_generation() {
        let generator = Arc::new(EchoGenerator::new(false));
        let answer = composer(Arc::clone(&generator)).compose("anything", &[]).await;
        assert_eq!(answer, Answer::NoResults);
        assert_eq!(answer.to_string(), NO_RESULTS_MESSAGE);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generated_text_is_trimmed() {
        let generator = Arc::new(EchoGenerator::new(false));
        let answer =
            composer(Arc::clone(&generator)).compose("flats", &[result("1", None, None)]).await;
        assert!(answer.is_generated());
        let text = answer.to_string();
        assert!(text.starts_with("You are a friendly"));
        assert!(text.ends_with("Never make up details."));
    }

    #[tokio::test]
    async fn generation_failure_degrades() {
        let generator = Arc::new(EchoGenerator::new(true));
        let answer =
            composer(Arc::clone(&generator)).compose("flats", &[result("7", None, None)]).await;
        let text = answer.to_string();
        assert!(matches!(answer, Answer::Degraded { .. }));
        assert!(text.starts_with("AI error: Generation error (echo): model not loaded."));
        assert!(text.contains("But your properties are ready!"));
        assert!(text.contains("1. Property #7"));
    }

    #[tokio::test(start_paused = true)]
    async fn generation_timeout_degrades() {
        let composer = AnswerComposer::new(Arc::new(StalledGenerator)).with_policy(
            CallPolicy::generation().with_timeout(Duration::from_millis(100)),
        );
        let answer = composer.compose("flats", &[result("9", None, None)]).await;

        match &answer {
            Answer::Degraded { error, context } => {
                assert!(error.contains("timed out after 100ms"), "{error}");
                assert!(context.contains("1. Property #9"));
            }
            other => panic!("expected degraded answer, got {other:?}"),
        }
        assert!(answer.to_string().starts_with("AI error: generate answer timed out"));
    }
}
