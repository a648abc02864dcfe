//! Shared fixtures: a small listing table and deterministic mock providers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use ethiohomes_rag::{
    Document, EmbeddingProvider, GenerationProvider, RagError, Result, document, record,
};

pub const LISTINGS_CSV: &str = "\
property_id,title,description,location,type,price,bedrooms,bathrooms,size,status
101,Lakeside Apartment,Walking distance to Lake Tana. Modern kitchen.,Bahir Dar,apartment,2500000,2,1,85,Available
102,Family Villa,Large garden with fruit trees. Quiet street.,Bahir Dar,villa,9800000,5,4,400,Available
103,Studio Near University,Ideal for students. Furnished.,Bahir Dar,apartment,1200000,1,1,40,Reserved
104,Bole Penthouse,Panoramic city views. Private elevator.,Addis Ababa,apartment,15000000,3,3,210,Available
105,CMC Townhouse,Gated community with security. Close to schools.,Addis Ababa,house,7300000,4,3,250,Sold
106,Kazanchis Office Flat,,Addis Ababa,apartment,4100000,2,2,95,Available
107,,,Bahir Dar,house,n/a,3,,150,Available
108,Summit Condo,Affordable condominium unit. Second floor.,Addis Ababa,condominium,\"3,200,000\",2,1,70,Available
";

pub fn listings() -> Vec<Document> {
    let records = record::load_from_reader(LISTINGS_CSV.as_bytes(), "listings.csv").unwrap();
    document::build_all(&records)
}

const DIMENSIONS: usize = 64;

/// Bag-of-words embedder: each lowercase word adds weight to a hashed bucket.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
    pub batches: AtomicUsize,
    pub texts_embedded: AtomicUsize,
    pub fail: AtomicBool,
    pub poison: AtomicBool,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every vector start with NaN while still reporting success.
    pub fn set_poisoned(&self, poison: bool) {
        self.poison.store(poison, Ordering::SeqCst);
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMENSIONS];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x100_0000_01b3));
        v[(hash % DIMENSIONS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RagError::EmbeddingError {
                provider: "keyword".into(),
                message: "connection refused".into(),
            });
        }
        self.texts_embedded.fetch_add(1, Ordering::SeqCst);
        let mut vector = keyword_vector(text);
        if self.poison.load(Ordering::SeqCst) {
            vector[0] = f32::NAN;
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Generator that answers with the listing block from the prompt and a
/// recommendation naming the first listed property.
#[derive(Default)]
pub struct AgentGenerator {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl AgentGenerator {
    pub fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), fail: AtomicBool::new(true) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for AgentGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RagError::GenerationError {
                provider: "agent".into(),
                message: "model 'llama3.2' not found".into(),
            });
        }

        let listings = prompt
            .split("Here are the top matching properties from the database:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nINSTRUCTIONS:").next())
            .unwrap_or_default();
        let top = listings
            .split("Property #")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or("?");

        Ok(format!(
            "Here is what I found for you:\n\n{listings}\n\n\
             My top recommendation: Property #{top} — best match for you!\n\
             Which one interests you? Want photos or more details?"
        ))
    }

    fn model_name(&self) -> &str {
        "agent-test"
    }
}
