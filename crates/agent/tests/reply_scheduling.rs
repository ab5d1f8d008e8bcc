//! Integration tests for debounced reply scheduling
//!
//! Drive the scheduler end to end (store → classifier → retrieval → tool
//! loop → validator → delivery) on paused tokio time.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use support_agent_agent::{
    InMemoryConversationStore, Outcome, ReplyComposer, ResponseScheduler, TokioClock,
};
use support_agent_config::{AgentConfig, IntentConfig, RetrievalConfig, SchedulerConfig};
use support_agent_core::{
    Channel, Clock, ConversationMessage, CorpusRecord, Embedder, Error, GenerateRequest,
    GenerateResponse, LanguageModel, Outbound, Product, ReplySink, Result, ToolCall,
    ToolDefinition,
};
use support_agent_rag::{HybridRetriever, InMemoryCorpusStore, RetrieverConfig};
use support_agent_text_processing::{IntentClassifier, ResponseValidator};
use support_agent_tools::{SearchProductsConfig, SearchProductsTool, ToolRegistry};

const CONVERSATION: &str = "c1";
const DEFAULT_REPLY: &str = "İade süremiz teslimattan itibaren 14 gündür. [GÜVEN: ORTA]";

#[derive(Default)]
struct TestLlm {
    responses: Mutex<VecDeque<GenerateResponse>>,
    requests: Mutex<Vec<GenerateRequest>>,
    /// Hold the first call until `release` is notified
    gated: AtomicBool,
    started: Notify,
    release: Notify,
    fail: bool,
}

impl TestLlm {
    fn scripted(responses: Vec<GenerateResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    fn gated() -> Self {
        Self {
            gated: AtomicBool::new(true),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    async fn respond(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.requests.lock().push(request);
        if self.fail {
            return Err(Error::Llm("service unavailable".into()));
        }
        if self.gated.swap(false, Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
        let next = self.responses.lock().pop_front();
        Ok(next.unwrap_or_else(|| GenerateResponse::text(DEFAULT_REPLY)))
    }
}

#[async_trait]
impl LanguageModel for TestLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.respond(request).await
    }

    async fn generate_with_tools(
        &self,
        request: GenerateRequest,
        _tools: &[ToolDefinition],
    ) -> Result<GenerateResponse> {
        self.respond(request).await
    }

    fn model_name(&self) -> &str {
        "test"
    }
}

struct FlatEmbedder;

#[async_trait]
impl Embedder for FlatEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn model_id(&self) -> &str {
        "flat"
    }

    fn dimensions(&self) -> usize {
        2
    }
}

struct Harness {
    store: Arc<InMemoryConversationStore>,
    scheduler: ResponseScheduler,
    llm: Arc<TestLlm>,
    clock: Arc<TokioClock>,
}

impl Harness {
    fn new(llm: TestLlm) -> Self {
        Self::with_products(llm, Vec::new())
    }

    fn with_products(llm: TestLlm, products: Vec<Product>) -> Self {
        let clock = Arc::new(TokioClock::new());
        let llm = Arc::new(llm);
        let store = Arc::new(InMemoryConversationStore::with_clock(clock.clone()));

        let corpus = InMemoryCorpusStore::new();
        for product in products {
            corpus.insert(CorpusRecord::Product(product), None);
        }
        let retriever = Arc::new(HybridRetriever::new(
            RetrieverConfig::default(),
            Arc::new(FlatEmbedder),
            Arc::new(corpus),
        ));

        let mut registry = ToolRegistry::new();
        registry.register(SearchProductsTool::new(
            retriever.clone(),
            None,
            SearchProductsConfig::default(),
        ));

        let composer = ReplyComposer::new(
            AgentConfig::default(),
            RetrievalConfig::default(),
            llm.clone(),
            Arc::new(IntentClassifier::lexicon_only(IntentConfig::default())),
            retriever,
            Arc::new(registry),
            ResponseValidator::default(),
        );

        let scheduler = ResponseScheduler::new(
            SchedulerConfig::default(),
            store.clone(),
            store.clone(),
            Arc::new(composer),
            clock.clone(),
        );

        Self {
            store,
            scheduler,
            llm,
            clock,
        }
    }

    /// Store an inbound message and hand it to the scheduler
    async fn receive(&self, id: &str, content: &str) -> JoinHandle<Outcome> {
        let message = ConversationMessage::inbound(id, CONVERSATION, content, self.clock.now());
        self.store.append(message.clone());
        self.scheduler
            .on_inbound(&message)
            .await
            .unwrap()
            .expect("public inbound messages are scheduled")
    }

    fn public_replies(&self) -> Vec<ConversationMessage> {
        self.store
            .outbound(CONVERSATION)
            .into_iter()
            .filter(|m| !m.private)
            .collect()
    }

    fn private_notes(&self) -> Vec<ConversationMessage> {
        self.store
            .outbound(CONVERSATION)
            .into_iter()
            .filter(|m| m.private)
            .collect()
    }
}

async fn outcomes(handles: Vec<JoinHandle<Outcome>>) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}

fn product(id: &str, title: &str) -> Product {
    Product {
        id: id.into(),
        title: title.into(),
        description: String::new(),
        vendor: None,
        product_type: Some("Kolye".into()),
        min_price: Some(249.0),
        max_price: Some(249.0),
        stock: Some(3),
        variants: vec![],
        image_url: Some(format!("https://cdn.example/{}.jpg", id)),
        url: Some(format!("https://shop.example/products/{}", id)),
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_produces_single_reply() {
    let h = Harness::new(TestLlm::default());

    let mut handles = vec![h.receive("m1", "merhaba").await];
    tokio::time::advance(Duration::from_secs(1)).await;
    handles.push(h.receive("m2", "iade süresi ne kadar").await);
    tokio::time::advance(Duration::from_secs(1)).await;
    handles.push(h.receive("m3", "kargo ücretini de öğrenmek istiyorum").await);

    assert_eq!(
        outcomes(handles).await,
        vec![Outcome::Stale, Outcome::Stale, Outcome::Sent]
    );

    let replies = h.public_replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, "İade süremiz teslimattan itibaren 14 gündür.");

    let requests = h.llm.requests.lock();
    assert_eq!(requests.len(), 1);
    let user = &requests[0].messages.last().unwrap().content;
    assert_eq!(
        user,
        "merhaba\n\niade süresi ne kadar\n\nkargo ücretini de öğrenmek istiyorum"
    );
}

#[tokio::test(start_paused = true)]
async fn test_reply_metadata_carries_validation() {
    let h = Harness::new(TestLlm::default());
    let handle = h.receive("m1", "iade süresi nedir?").await;
    assert_eq!(handle.await.unwrap(), Outcome::Sent);

    let reply = &h.public_replies()[0];
    assert_eq!(reply.metadata["kind"], "reply");
    assert_eq!(reply.metadata["validation"]["confidence"], "medium");
}

#[tokio::test(start_paused = true)]
async fn test_continuous_typing_still_gets_answered() {
    let h = Harness::new(TestLlm::default());

    // A message every 2s never lets the 3s debounce settle
    let mut handles = Vec::new();
    for i in 0..=10 {
        handles.push(h.receive(&format!("m{}", i), &format!("soru {}: iade nasıl?", i)).await);
        tokio::time::advance(Duration::from_secs(2)).await;
    }
    let outcomes = outcomes(handles).await;
    assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Sent).count(), 2);
    assert_eq!(outcomes[6], Outcome::Sent);
    assert_eq!(outcomes[10], Outcome::Sent);

    // One reply once the burst hit max wait, one after the typing stopped
    assert_eq!(h.public_replies().len(), 2);
    let log: Vec<String> = h
        .store
        .messages(CONVERSATION)
        .into_iter()
        .map(|m| if m.is_public_inbound() { m.id } else { "reply".to_string() })
        .collect();
    assert_eq!(
        log,
        vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6", "m7", "reply", "m8", "m9", "m10", "reply"]
    );

    let requests = h.llm.requests.lock();
    assert_eq!(requests.len(), 2);
    assert!(requests[0]
        .messages
        .last()
        .unwrap()
        .content
        .starts_with("soru 0: iade nasıl?"));
    assert_eq!(
        requests[1].messages.last().unwrap().content,
        "soru 8: iade nasıl?\n\nsoru 9: iade nasıl?\n\nsoru 10: iade nasıl?"
    );
}

#[tokio::test(start_paused = true)]
async fn test_newer_message_during_generation_cancels_commit() {
    let h = Harness::new(TestLlm::gated());

    let first = h.receive("m1", "iade süresi nedir?").await;
    h.llm.started.notified().await;

    let second = h.receive("m2", "bir de kargo ücreti ne kadar?").await;
    h.llm.release.notify_one();

    assert_eq!(first.await.unwrap(), Outcome::Stale);
    assert_eq!(second.await.unwrap(), Outcome::Sent);
    assert_eq!(h.public_replies().len(), 1);

    let requests = h.llm.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].messages.last().unwrap().content,
        "iade süresi nedir?\n\nbir de kargo ücreti ne kadar?"
    );
}

#[tokio::test(start_paused = true)]
async fn test_handoff_request() {
    let h = Harness::new(TestLlm::default());
    let handle = h
        .receive("m1", "müşteri temsilcisi ile görüşmek istiyorum")
        .await;

    assert_eq!(handle.await.unwrap(), Outcome::Handoff);
    assert_eq!(h.public_replies().len(), 1);
    assert_eq!(h.private_notes().len(), 1);
    assert!(h.llm.requests.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_non_public_messages_do_not_schedule() {
    let h = Harness::new(TestLlm::default());

    let mut note = ConversationMessage::inbound("n1", CONVERSATION, "internal", h.clock.now());
    note.private = true;
    assert!(h.scheduler.on_inbound(&note).await.unwrap().is_none());

    let outbound = ConversationMessage::outbound("o1", CONVERSATION, "Merhaba", h.clock.now());
    assert!(h.scheduler.on_inbound(&outbound).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_already_answered_burst_is_a_no_op() {
    let h = Harness::new(TestLlm::default());
    let handle = h.receive("m1", "iade süresi nedir?").await;

    // a human agent answers before the evaluation fires
    h.store
        .deliver(CONVERSATION, Outbound::reply("14 gün içinde iade edebilirsiniz."))
        .await
        .unwrap();

    assert_eq!(handle.await.unwrap(), Outcome::EmptyBatch);
    assert_eq!(h.public_replies().len(), 1);
    assert!(h.llm.requests.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_product_cards_on_instagram() {
    let search = GenerateResponse::tool_calls(vec![ToolCall {
        id: "call_1".into(),
        name: "search_products".into(),
        arguments: HashMap::from([("query".to_string(), json!("siyah kolye"))]),
    }]);
    let llm = TestLlm::scripted(vec![
        search,
        GenerateResponse::text("İki model buldum. [GÜVEN: YÜKSEK]"),
    ]);
    let h = Harness::with_products(
        llm,
        vec![
            product("p1", "Siyah Taşlı Kolye"),
            product("p2", "Gümüş Kolye"),
        ],
    );
    h.store.set_channel(CONVERSATION, Channel::Instagram);

    let handle = h.receive("m1", "siyah taşlı kolye var mı").await;
    assert_eq!(handle.await.unwrap(), Outcome::Sent);

    let replies = h.public_replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].metadata["kind"], "product_cards");
    assert_eq!(
        replies[0].metadata["intro"],
        "Aradığınız ürünlerden 2 tanesini buldum 👇"
    );
    assert_eq!(replies[0].metadata["cards"][0]["title"], "Siyah Taşlı Kolye");
    assert_eq!(replies[0].metadata["validation"]["confidence"], "high");
    assert_eq!(
        replies[0].metadata["validation"]["cleaned_text"],
        "İki model buldum."
    );
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_is_swallowed() {
    let h = Harness::new(TestLlm::failing());
    let handle = h.receive("m1", "iade süresi nedir?").await;

    assert_eq!(handle.await.unwrap(), Outcome::Error);
    assert!(h.store.outbound(CONVERSATION).is_empty());
}
