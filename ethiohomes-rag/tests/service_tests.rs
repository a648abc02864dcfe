//! End-to-end question answering against a small listing table.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{AgentGenerator, KeywordEmbedder, listings};
use ethiohomes_rag::composer::NO_RESULTS_MESSAGE;
use ethiohomes_rag::service::{EMPTY_QUERY_MESSAGE, SEARCH_UNAVAILABLE_MESSAGE};
use ethiohomes_rag::{
    AnswerComposer, CallPolicy, QueryService, RetrievalConfig, Retriever, VectorIndex,
};

struct Harness {
    service: QueryService,
    embedder: Arc<KeywordEmbedder>,
    generator: Arc<AgentGenerator>,
    _dir: tempfile::TempDir,
}

async fn harness_with(generator: AgentGenerator, indexed: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let generator = Arc::new(generator);
    let policy = CallPolicy::default().with_retries(0).with_timeout(Duration::from_secs(5));

    let index = VectorIndex::open_or_create(dir.path(), embedder.clone())
        .await
        .unwrap()
        .with_policy(policy);
    if indexed {
        index.ensure_indexed(&listings()).await.unwrap();
    }

    let retriever = Retriever::with_config(Arc::new(index), RetrievalConfig::default()).unwrap();
    let composer = AnswerComposer::new(generator.clone()).with_policy(policy);

    Harness {
        service: QueryService::new(Arc::new(retriever), Arc::new(composer)),
        embedder,
        generator,
        _dir: dir,
    }
}

async fn harness() -> Harness {
    harness_with(AgentGenerator::default(), true).await
}

#[tokio::test]
async fn blank_questions_get_guidance_without_searching() {
    let h = harness().await;
    let calls_after_build = h.embedder.calls();

    assert_eq!(h.service.answer_query("").await, EMPTY_QUERY_MESSAGE);
    assert_eq!(h.service.answer_query("   ").await, EMPTY_QUERY_MESSAGE);
    assert_eq!(h.service.answer_query("\n\t").await, EMPTY_QUERY_MESSAGE);

    assert_eq!(h.embedder.calls(), calls_after_build);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn answers_with_numbered_listings_and_recommendation() {
    let h = harness().await;
    let reply = h.service.answer_query("apartments in Bahir Dar").await;

    let listed: Vec<&str> = reply
        .lines()
        .filter_map(|line| line.split_once(". Property #"))
        .map(|(_, rest)| rest.split_whitespace().next().unwrap_or_default())
        .collect();
    assert!(!listed.is_empty());
    assert!(listed.len() <= 3);
    assert!(reply.starts_with("Here is what I found for you"));
    assert!(reply.contains("1. Property #"));
    assert!(reply.contains(" ETB"));

    let recommendation = reply
        .lines()
        .find_map(|line| line.strip_prefix("My top recommendation: Property #"))
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap();
    assert!(listed.contains(&recommendation));
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn prices_use_thousands_separators() {
    let h = harness().await;
    let reply = h.service.answer_query("Bole Penthouse panoramic city views").await;
    assert!(reply.contains("15,000,000 ETB"), "{reply}");
}

#[tokio::test]
async fn question_is_trimmed_before_searching() {
    let h = harness().await;
    let padded = h.service.answer_query("   villa with garden   ").await;
    let plain = h.service.answer_query("villa with garden").await;
    assert_eq!(padded, plain);
}

#[tokio::test]
async fn empty_index_returns_fallback_without_generation() {
    let h = harness_with(AgentGenerator::default(), false).await;
    let reply = h.service.answer_query("houses in Addis Ababa").await;
    assert_eq!(reply, NO_RESULTS_MESSAGE);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn generation_failure_is_not_fatal() {
    let h = harness_with(AgentGenerator::failing(), true).await;
    let reply = h.service.answer_query("apartments in Bahir Dar").await;

    assert!(!reply.is_empty());
    assert!(reply.starts_with("AI error:"));
    assert!(reply.contains("llama3.2"));
    assert!(reply.contains("1. Property #"));
}

#[tokio::test]
async fn search_failure_returns_apology() {
    let h = harness().await;
    h.embedder.set_failing(true);
    let reply = h.service.answer_query("villa").await;
    assert_eq!(reply, SEARCH_UNAVAILABLE_MESSAGE);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn non_finite_query_embedding_returns_apology() {
    let h = harness().await;
    h.embedder.set_poisoned(true);
    let reply = h.service.answer_query("apartments in Bahir Dar").await;
    assert_eq!(reply, SEARCH_UNAVAILABLE_MESSAGE);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_share_the_index() {
    let h = harness().await;
    let service = h.service.clone();

    let questions = ["apartments in Bahir Dar", "villa", "condominium in Addis Ababa", "house"];
    let handles: Vec<_> = questions
        .iter()
        .map(|q| {
            let service = service.clone();
            let q = q.to_string();
            tokio::spawn(async move { service.answer_query(&q).await })
        })
        .collect();

    for handle in handles {
        let reply = handle.await.unwrap();
        assert!(reply.contains("My top recommendation: Property #"));
    }
    assert_eq!(h.generator.calls(), questions.len());
}
