//! Reply composition
//!
//! Turns a pending batch into the outbound payloads for one reply:
//! classify, pick a plan, ground the model in FAQ and document excerpts,
//! run the tool loop, validate, and decide between a text reply and
//! product cards.

use std::collections::HashMap;
use std::sync::Arc;
use support_agent_config::{AgentConfig, RetrievalConfig};
use support_agent_core::{
    Channel, ConversationMessage, Corpus, DocumentChunk, FaqEntry, GenerateRequest,
    IntentResult, LanguageModel, Message, MessageDirection, Outbound, Product, ProductCard,
    ToolDefinition,
};
use support_agent_rag::HybridRetriever;
use support_agent_text_processing::{is_handoff_request, IntentClassifier, ResponseValidator};
use support_agent_tools::{ToolExecutor, LOOKUP_ORDER, SEARCH_PRODUCTS};

use crate::plan::{plan, Grounding, ReplyPlan};
use crate::AgentError;

const HANDOFF_ACK: &str =
    "Sizi hemen bir müşteri temsilcimize aktarıyorum. En kısa sürede size dönüş yapılacaktır.";
const HANDOFF_NOTE: &str = "🙋 Müşteri, müşteri temsilcisi ile görüşmek istedi. Konuşma ekibe devredildi.";
const NEEDS_HUMAN_NOTE: &str =
    "🤖 AI asistan bu soruyu yanıtlayamadı. Müşteri temsilcisi müdahalesi gerekiyor.";

const GENERAL_INSTRUCTIONS: &str = r#"# Genel Talimatlar

Sen yardımcı, samimi ve bilgili bir müşteri destek asistanısın. Kullanıcılara doğru bilgi sağlayarak sorularını yanıtlarsın.

## Temel Prensipler

- Doğal, nazik ve anlaşılması kolay bir dil kullan. Cümleleri kısa tut.
- Kullanıcının dilini algıla ve aynı dilde yanıt ver.
- Yanıtların çoğu bir veya iki cümle olmalı.
- Belirsizlik olduğunda varsayım yapmak yerine kısa bir netleştirme sorusu sor.

## 🚫 HALÜSİNASYON KURALLARI (ÇOK ÖNEMLİ!)

1. **SADECE VERİLEN BİLGİLERİ KULLAN**: Yanıtlarını YALNIZCA aşağıdaki SSS, doküman ve tool sonuçlarına dayandır.
2. **BİLMİYORSAN SÖYLE**: Soru verilen bilgilerle yanıtlanamıyorsa şöyle yanıt ver:
   "Bu konuda elimde yeterli bilgi bulunmuyor. Size daha doğru bilgi verebilmem için müşteri hizmetlerimize ulaşmanızı öneririm."
3. **ASLA UYDURMA**: Fiyat, tarih, süre, miktar gibi sayısal bilgileri tahmin etme. "Genellikle", "muhtemelen", "sanırım" gibi belirsiz ifadeler kullanma.
4. **KAYNAK GÖSTER**: SSS'ten aldığın bilgi için [SSS_X], dokümandan aldığın bilgi için [DOKÜMAN_X] etiketi kullan.
5. **GÜVENİLİRLİK**: Yanıtının sonuna güven seviyeni ekle: [GÜVEN: YÜKSEK], [GÜVEN: ORTA] veya [GÜVEN: DÜŞÜK].

## Yanıt Kuralları

- Konuşmayı açıkça bitirmeye çalışma.
- "Başka nasıl yardımcı olabilirim?" gibi sorular sorma."#;

const PRODUCT_TOOL_INSTRUCTIONS: &str = r#"### 🛍️ ÜRÜN ARAMA (search_products)

Müşteri ürün, renk, malzeme veya kategori sorduğunda ya da takip sorusu sorduğunda ("başka renk var mı?", "daha ucuzu var mı?") `search_products` kullan.

⚠️ BAĞLAM KURALI: Takip sorularında önceki konuşmadaki kategoriyi sorguya ekle. Önceki: "yüzük var mı", şimdi: "siyah taşlı olsun" → query: "siyah taşlı yüzük".

⚠️ NEGATİF KOŞUL KURALI: "X olmasın", "Y hariç", "Z dışında" denildiğinde `exclude_terms` parametresini kullan. Örnek: "altın kaplama olmasın" → exclude_terms: "altın kaplama"."#;

const ORDER_TOOL_INSTRUCTIONS: &str = r#"### 📦 SİPARİŞ SORGULAMA (lookup_order)

Müşteri sipariş durumunu sorduğunda önce email adresini ve sipariş numarasını iste, ikisi de alındıktan sonra `lookup_order` kullan ve sonucu olduğu gibi paylaş.

⚠️ GÜVENLİK: Sipariş sorgulamak için HEM email HEM sipariş numarası gerekli."#;

/// Payloads for one committed reply, in delivery order
#[derive(Debug, Clone)]
pub struct ComposedReply {
    pub intent: IntentResult,
    pub outbound: Vec<Outbound>,
    /// The conversation was routed to a human
    pub handoff: bool,
}

/// Output of the tool loop
#[derive(Debug, Default)]
struct Generation {
    text: String,
    products: Vec<Product>,
    rounds: usize,
}

pub struct ReplyComposer {
    config: AgentConfig,
    retrieval: RetrievalConfig,
    llm: Arc<dyn LanguageModel>,
    classifier: Arc<IntentClassifier>,
    retriever: Arc<HybridRetriever>,
    tools: Arc<dyn ToolExecutor>,
    validator: ResponseValidator,
}

impl ReplyComposer {
    pub fn new(
        config: AgentConfig,
        retrieval: RetrievalConfig,
        llm: Arc<dyn LanguageModel>,
        classifier: Arc<IntentClassifier>,
        retriever: Arc<HybridRetriever>,
        tools: Arc<dyn ToolExecutor>,
        validator: ResponseValidator,
    ) -> Self {
        Self {
            config,
            retrieval,
            llm,
            classifier,
            retriever,
            tools,
            validator,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Compose the reply for a pending batch
    ///
    /// `history` holds the public messages that precede the batch, oldest
    /// first.
    pub async fn compose(
        &self,
        batch: &[ConversationMessage],
        history: &[ConversationMessage],
        channel: Channel,
    ) -> Result<ComposedReply, AgentError> {
        let texts: Vec<String> = batch.iter().map(|m| m.content.clone()).collect();
        let combined = texts.join("\n");

        if self.config.handoff_enabled && is_handoff_request(&combined) {
            return Ok(self.handoff(IntentResult::new([], combined)));
        }

        let context: Vec<String> = history.iter().map(render_turn).collect();
        let intent = self.classifier.classify(&texts, &context).await;

        let outbound = match plan(&intent, self.config.handoff_enabled) {
            ReplyPlan::Handoff => return Ok(self.handoff(intent)),
            ReplyPlan::Clarify(question) => vec![Outbound::reply(question)],
            ReplyPlan::Template(template) => vec![Outbound::reply(template.text())],
            ReplyPlan::Generate(grounding) => {
                self.generate(&texts, history, channel, grounding).await?
            },
        };

        Ok(ComposedReply {
            intent,
            outbound,
            handoff: false,
        })
    }

    fn handoff(&self, intent: IntentResult) -> ComposedReply {
        ComposedReply {
            intent,
            outbound: vec![Outbound::reply(HANDOFF_ACK), Outbound::note(HANDOFF_NOTE)],
            handoff: true,
        }
    }

    async fn generate(
        &self,
        texts: &[String],
        history: &[ConversationMessage],
        channel: Channel,
        grounding: Grounding,
    ) -> Result<Vec<Outbound>, AgentError> {
        let history = tail(history, self.config.max_history_messages);
        let user_message = texts.join("\n\n");
        let query = context_aware_query(history, &user_message);

        let (faqs, documents) = futures::join!(
            self.find_faqs(&query, grounding.faq),
            self.find_documents(&query, grounding.documents),
        );

        let tools = self.offered_tools(grounding);
        let system_prompt = self.build_system_prompt(&faqs, &documents, &tools);

        let mut messages = vec![Message::system(system_prompt)];
        messages.extend(history.iter().map(|m| match m.direction {
            MessageDirection::Inbound => Message::user(m.content.clone()),
            MessageDirection::Outbound => Message::assistant(m.content.clone()),
        }));
        messages.push(Message::user(user_message));

        let generation = self.run_tool_loop(messages, &tools).await?;
        tracing::debug!(
            faqs = faqs.len(),
            documents = documents.len(),
            tools = tools.len(),
            rounds = generation.rounds,
            products = generation.products.len(),
            "Generated reply"
        );

        let faq_ids: Vec<usize> = (1..=faqs.len()).collect();
        let document_ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        let validation = self.validator.validate(&generation.text, &faq_ids, &document_ids);

        if validation.cleaned_text.trim().is_empty() {
            return Err(AgentError::EmptyReply);
        }

        let needs_human = validation.no_info_response;
        let mut outbound = Vec::with_capacity(2);

        if !generation.products.is_empty() && channel.supports_product_cards() {
            let limit = match channel {
                Channel::Whatsapp => self.config.whatsapp_card_limit,
                _ => self.config.product_card_limit,
            };
            let cards: Vec<ProductCard> = generation
                .products
                .iter()
                .take(limit)
                .map(product_card)
                .collect();
            outbound.push(Outbound::ProductCards {
                intro: product_intro(cards.len()),
                cards,
                validation: Some(validation),
            });
        } else {
            outbound.push(Outbound::Reply {
                content: validation.cleaned_text.clone(),
                validation: Some(validation),
            });
        }

        if needs_human {
            outbound.push(Outbound::note(NEEDS_HUMAN_NOTE));
        }

        Ok(outbound)
    }

    /// Bounded tool-calling loop
    ///
    /// Each round either ends with text or executes the requested calls and
    /// feeds their output back. When the model still asks for tools after
    /// `max_tool_rounds`, one last call without tools forces an answer.
    async fn run_tool_loop(
        &self,
        mut messages: Vec<Message>,
        tools: &[ToolDefinition],
    ) -> Result<Generation, AgentError> {
        let mut generation = Generation::default();
        let max_rounds = self.config.max_tool_rounds;

        loop {
            let final_round = tools.is_empty() || generation.rounds >= max_rounds;
            let request = self.request(messages.clone());
            let response = if final_round {
                self.llm.generate(request).await?
            } else {
                self.llm.generate_with_tools(request, tools).await?
            };

            if !response.has_tool_calls() {
                generation.text = response.text;
                return Ok(generation);
            }
            if final_round {
                return Err(AgentError::ToolLoopExhausted(max_rounds));
            }
            generation.rounds += 1;

            tracing::info!(
                round = generation.rounds,
                tool_calls = response.tool_calls.len(),
                "LLM requested tool calls"
            );
            messages.push(Message::assistant_tool_calls(
                response.text.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let content = match self.tools.execute(call).await {
                    Ok(output) => {
                        if !output.products.is_empty() {
                            generation.products = output.products;
                        }
                        output.content
                    },
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                        format!("Tool '{}' failed: {}", call.name, e)
                    },
                };
                messages.push(Message::tool(content, call.id.clone()));
            }
        }
    }

    fn request(&self, messages: Vec<Message>) -> GenerateRequest {
        GenerateRequest::from_messages(messages).with_temperature(self.config.temperature)
    }

    async fn find_faqs(&self, query: &str, enabled: bool) -> Vec<FaqEntry> {
        if !enabled {
            return Vec::new();
        }
        self.retriever
            .search(Corpus::Faq, query, self.retrieval.faq_limit)
            .await
            .into_iter()
            .filter_map(|c| c.record.as_faq().cloned())
            .collect()
    }

    async fn find_documents(&self, query: &str, enabled: bool) -> Vec<DocumentChunk> {
        if !enabled {
            return Vec::new();
        }
        self.retriever
            .search(Corpus::Document, query, self.retrieval.document_limit)
            .await
            .into_iter()
            .filter_map(|c| c.record.as_document().cloned())
            .collect()
    }

    /// Tools the plan allows and the configuration enables
    fn offered_tools(&self, grounding: Grounding) -> Vec<ToolDefinition> {
        self.tools
            .definitions()
            .into_iter()
            .filter(|d| match d.name.as_str() {
                SEARCH_PRODUCTS => grounding.product_search && self.config.product_search_enabled,
                LOOKUP_ORDER => grounding.order_lookup && self.config.order_lookup_enabled,
                _ => true,
            })
            .collect()
    }

    fn build_system_prompt(
        &self,
        faqs: &[FaqEntry],
        documents: &[DocumentChunk],
        tools: &[ToolDefinition],
    ) -> String {
        let mut sections = vec![
            GENERAL_INSTRUCTIONS.to_string(),
            format!(
                "## Kimliğin\n\nSen {}, yardımcı bir AI asistanısın.",
                self.config.assistant_name
            ),
        ];

        if let Some(description) = self.config.business_description.as_deref() {
            sections.push(format!("## Açıklama\n\n{}", description));
        }

        if !faqs.is_empty() {
            let mut text = String::from(
                "## Sık Sorulan Sorular (SSS)\n\nSADECE aşağıdaki SSS bilgilerini kullan:\n\n",
            );
            for (i, faq) in faqs.iter().enumerate() {
                text.push_str(&format!(
                    "[SSS_{}] **Soru**: {}\n**Cevap**: {}\n\n",
                    i + 1,
                    faq.question,
                    faq.answer
                ));
            }
            text.push_str("Bu SSS'lerden bilgi kullandığında [SSS_X] formatında kaynak göster.");
            sections.push(text);
        }

        if !documents.is_empty() {
            let mut text = String::from("## Referans Dokümanlar\n\n");
            for doc in documents {
                text.push_str(&format!(
                    "### [DOKÜMAN_{}] {}\n\n{}\n\n",
                    doc.id,
                    doc.document_name.as_deref().unwrap_or(""),
                    doc.content
                ));
            }
            text.push_str(
                "ÖNEMLİ: Hangi dokümandan bilgi kullandıysan yanıtının sonunda [DOKÜMAN_X] formatında kaynak göster.",
            );
            sections.push(text);
        }

        let offered: HashMap<&str, &str> = [
            (SEARCH_PRODUCTS, PRODUCT_TOOL_INSTRUCTIONS),
            (LOOKUP_ORDER, ORDER_TOOL_INSTRUCTIONS),
        ]
        .into_iter()
        .collect();
        let instructions: Vec<&str> = tools
            .iter()
            .filter_map(|t| offered.get(t.name.as_str()).copied())
            .collect();
        if !instructions.is_empty() {
            sections.push(format!(
                "## Mağaza Yetenekleri (Tool Calling)\n\n{}",
                instructions.join("\n\n")
            ));
        }

        sections.join("\n\n")
    }
}

/// History rendered as `Kullanıcı:`/`Asistan:` lines followed by the batch
pub fn context_aware_query(history: &[ConversationMessage], batch: &str) -> String {
    if history.is_empty() {
        return batch.to_string();
    }
    let mut lines: Vec<String> = history.iter().map(render_turn).collect();
    lines.push(format!("Kullanıcı: {}", batch));
    lines.join("\n")
}

fn render_turn(message: &ConversationMessage) -> String {
    match message.direction {
        MessageDirection::Inbound => format!("Kullanıcı: {}", message.content),
        MessageDirection::Outbound => format!("Asistan: {}", message.content),
    }
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn product_card(product: &Product) -> ProductCard {
    ProductCard {
        title: product.title.clone(),
        price: product.price_label(),
        image_url: product.image_url.clone(),
        link: product.url.clone(),
    }
}

fn product_intro(count: usize) -> String {
    if count == 1 {
        "Aradığınız ürünü buldum 👇".to_string()
    } else {
        format!("Aradığınız ürünlerden {} tanesini buldum 👇", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use support_agent_core::{
        ConfidenceLevel, CorpusRecord, Embedder, GenerateResponse, Result, ToolCall,
    };
    use support_agent_rag::{InMemoryCorpusStore, RetrieverConfig};
    use support_agent_tools::{ToolError, ToolOutput};

    use crate::plan::Template;

    /// Replays scripted responses and records every request
    struct ScriptedLlm {
        responses: Mutex<VecDeque<GenerateResponse>>,
        requests: Mutex<Vec<(GenerateRequest, usize)>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<GenerateResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, request: GenerateRequest, tools: usize) -> Result<GenerateResponse> {
            self.requests.lock().push((request, tools));
            Ok(self
                .responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| GenerateResponse::text("")))
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
            self.next(request, 0)
        }

        async fn generate_with_tools(
            &self,
            request: GenerateRequest,
            tools: &[ToolDefinition],
        ) -> Result<GenerateResponse> {
            self.next(request, tools.len())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FakeTools {
        products: Vec<Product>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolExecutor for FakeTools {
        async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolOutput, ToolError> {
            self.calls.lock().push(call.name.clone());
            match call.name.as_str() {
                SEARCH_PRODUCTS => Ok(ToolOutput::text("[ÜRÜN_1] **Kolye**")
                    .with_products(self.products.clone())),
                other => Err(ToolError::not_found(other)),
            }
        }

        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new(LOOKUP_ORDER, "orders", serde_json::json!({})),
                ToolDefinition::new(SEARCH_PRODUCTS, "products", serde_json::json!({})),
            ]
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

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            title: format!("Kolye {}", id),
            description: String::new(),
            vendor: None,
            product_type: None,
            min_price: Some(100.0),
            max_price: Some(100.0),
            stock: Some(1),
            variants: vec![],
            image_url: Some(format!("https://cdn.example/{}.jpg", id)),
            url: None,
        }
    }

    fn composer(llm: Arc<ScriptedLlm>, products: Vec<Product>) -> (ReplyComposer, Arc<FakeTools>) {
        let store = InMemoryCorpusStore::new();
        store.insert(
            CorpusRecord::Faq(FaqEntry {
                id: "f1".into(),
                question: "Kargo ücreti ne kadar?".into(),
                answer: "500 TL üzeri kargo ücretsizdir.".into(),
            }),
            None,
        );
        let retriever = HybridRetriever::new(
            RetrieverConfig::default(),
            Arc::new(FlatEmbedder),
            Arc::new(store),
        );
        let tools = Arc::new(FakeTools {
            products,
            calls: Mutex::new(Vec::new()),
        });
        let composer = ReplyComposer::new(
            AgentConfig::default(),
            RetrievalConfig::default(),
            llm,
            Arc::new(IntentClassifier::lexicon_only(Default::default())),
            Arc::new(retriever),
            tools.clone(),
            ResponseValidator::default(),
        );
        (composer, tools)
    }

    fn batch(texts: &[&str]) -> Vec<ConversationMessage> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ConversationMessage::inbound(format!("m{}", i), "c1", *t, Utc::now()))
            .collect()
    }

    fn tool_call(name: &str) -> GenerateResponse {
        GenerateResponse::tool_calls(vec![ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: HashMap::from([("query".to_string(), serde_json::json!("kolye"))]),
        }])
    }

    #[tokio::test]
    async fn test_greeting_uses_template() {
        let llm = ScriptedLlm::new(vec![]);
        let (composer, _) = composer(llm.clone(), vec![]);

        let reply = composer.compose(&batch(&["merhaba"]), &[], Channel::Web).await.unwrap();
        assert_eq!(reply.outbound, vec![Outbound::reply(Template::Greeting.text())]);
        assert!(llm.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_handoff_pattern_skips_generation() {
        let llm = ScriptedLlm::new(vec![]);
        let (composer, _) = composer(llm.clone(), vec![]);

        let reply = composer
            .compose(&batch(&["canlı destek istiyorum"]), &[], Channel::Web)
            .await
            .unwrap();
        assert!(reply.handoff);
        assert_eq!(reply.outbound.len(), 2);
        assert!(!reply.outbound[1].is_public());
        assert!(llm.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_generated_reply_is_validated() {
        let llm = ScriptedLlm::new(vec![GenerateResponse::text(
            "[SSS_1] 500 TL üzeri kargo ücretsizdir. [GÜVEN: YÜKSEK]",
        )]);
        let (composer, _) = composer(llm.clone(), vec![]);

        let reply = composer
            .compose(&batch(&["kargo ücreti ne kadar?"]), &[], Channel::Web)
            .await
            .unwrap();

        let Outbound::Reply { content, validation } = &reply.outbound[0] else {
            panic!("expected text reply");
        };
        assert_eq!(content, "500 TL üzeri kargo ücretsizdir.");
        let validation = validation.as_ref().unwrap();
        assert!(!validation.citations.has_invalid());

        let requests = llm.requests.lock();
        assert!(requests[0].0.messages[0].content.contains("[SSS_1] **Soru**: Kargo ücreti ne kadar?"));
    }

    #[tokio::test]
    async fn test_tool_loop_collects_products_for_cards() {
        let llm = ScriptedLlm::new(vec![
            tool_call(SEARCH_PRODUCTS),
            GenerateResponse::text("Size uygun kolyeler buldum. [GÜVEN: YÜKSEK]"),
        ]);
        let products: Vec<Product> = (1..=5).map(|i| product(&i.to_string())).collect();
        let (composer, tools) = composer(llm.clone(), products);

        let reply = composer
            .compose(&batch(&["siyah taşlı kolye var mı"]), &[], Channel::Whatsapp)
            .await
            .unwrap();

        assert_eq!(*tools.calls.lock(), vec![SEARCH_PRODUCTS.to_string()]);
        let Outbound::ProductCards {
            intro,
            cards,
            validation,
        } = &reply.outbound[0]
        else {
            panic!("expected product cards");
        };
        assert_eq!(cards.len(), 3);
        assert_eq!(intro, "Aradığınız ürünlerden 3 tanesini buldum 👇");
        assert_eq!(cards[0].price.as_deref(), Some("100.00 TL"));
        let validation = validation.as_ref().unwrap();
        assert_eq!(validation.confidence, ConfidenceLevel::High);
        assert_eq!(validation.cleaned_text, "Size uygun kolyeler buldum.");

        let requests = llm.requests.lock();
        let tool_message = requests[1].0.messages.last().unwrap();
        assert_eq!(tool_message.content, "[ÜRÜN_1] **Kolye**");
    }

    #[tokio::test]
    async fn test_cards_fall_back_to_text_on_web() {
        let llm = ScriptedLlm::new(vec![
            tool_call(SEARCH_PRODUCTS),
            GenerateResponse::text("Kolye 1 stokta. [GÜVEN: YÜKSEK]"),
        ]);
        let (composer, _) = composer(llm, vec![product("1")]);

        let reply = composer
            .compose(&batch(&["siyah taşlı kolye var mı"]), &[], Channel::Web)
            .await
            .unwrap();
        assert!(matches!(reply.outbound[0], Outbound::Reply { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fed_back() {
        let llm = ScriptedLlm::new(vec![
            tool_call("track_parcel"),
            GenerateResponse::text("Bu konuda elimde yeterli bilgi bulunmuyor."),
        ]);
        let (composer, _) = composer(llm.clone(), vec![]);

        let reply = composer
            .compose(&batch(&["kargom nerede acaba?"]), &[], Channel::Web)
            .await
            .unwrap();

        let requests = llm.requests.lock();
        assert!(requests[1]
            .0
            .messages
            .last()
            .unwrap()
            .content
            .contains("Tool not found: track_parcel"));
        assert_eq!(reply.outbound.len(), 2);
        assert_eq!(reply.outbound[1], Outbound::note(NEEDS_HUMAN_NOTE));
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let llm = ScriptedLlm::new(vec![
            tool_call(SEARCH_PRODUCTS),
            tool_call(SEARCH_PRODUCTS),
            tool_call(SEARCH_PRODUCTS),
            GenerateResponse::text("Kolyeleri listeledim. [GÜVEN: ORTA]"),
        ]);
        let (composer, tools) = composer(llm.clone(), vec![]);

        composer
            .compose(&batch(&["siyah taşlı kolye"]), &[], Channel::Web)
            .await
            .unwrap();

        assert_eq!(tools.calls.lock().len(), 3);
        let requests = llm.requests.lock();
        assert_eq!(requests.len(), 4);
        // the final round is offered no tools
        assert_eq!(requests[3].1, 0);
    }

    #[tokio::test]
    async fn test_exhausted_loop_is_an_error() {
        let llm = ScriptedLlm::new(vec![tool_call(SEARCH_PRODUCTS); 4]);
        let (composer, _) = composer(llm, vec![]);

        let err = composer
            .compose(&batch(&["siyah taşlı kolye"]), &[], Channel::Web)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolLoopExhausted(3)));
    }

    #[tokio::test]
    async fn test_empty_generation_is_an_error() {
        let llm = ScriptedLlm::new(vec![GenerateResponse::text("   ")]);
        let (composer, _) = composer(llm, vec![]);

        let err = composer
            .compose(&batch(&["iade nasıl yapılır?"]), &[], Channel::Web)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::EmptyReply));
    }

    #[test]
    fn test_context_aware_query() {
        let now = Utc::now();
        let history = vec![
            ConversationMessage::inbound("m1", "c1", "yüzük var mı", now),
            ConversationMessage::outbound("m2", "c1", "Evet, 3 model var.", now),
        ];
        assert_eq!(
            context_aware_query(&history, "siyah taşlı olsun"),
            "Kullanıcı: yüzük var mı\nAsistan: Evet, 3 model var.\nKullanıcı: siyah taşlı olsun"
        );
        assert_eq!(context_aware_query(&[], "kolye"), "kolye");
    }

    #[test]
    fn test_product_intro() {
        assert_eq!(product_intro(1), "Aradığınız ürünü buldum 👇");
        assert_eq!(product_intro(4), "Aradığınız ürünlerden 4 tanesini buldum 👇");
    }
}
