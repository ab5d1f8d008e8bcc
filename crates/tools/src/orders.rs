//! Order status tool and its HTTP commerce backend
//!
//! Both the email address and the order number are required for every
//! lookup; the backend only answers when the pair matches.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use support_agent_config::CommerceConfig;
use support_agent_core::{
    Error, FulfillmentStatus, OrderLookup, OrderSummary, Result, ToolDefinition,
};
use support_agent_llm::ToolBuilder;

use crate::{string_arg, Tool, ToolError, ToolOutput};

pub const LOOKUP_ORDER: &str = "lookup_order";

const MISSING_CREDENTIALS: &str = "Sipariş durumunu sorgulamak için hem email adresinizi hem de sipariş numaranızı vermeniz gerekmektedir. Lütfen bu bilgileri paylaşır mısınız?";
const INVALID_EMAIL: &str = "Geçerli bir email adresi giriniz.";
const INVALID_ORDER_NUMBER: &str = "Geçerli bir sipariş numarası giriniz.";
const LOOKUP_FAILED: &str = "Sipariş sorgulanırken hata oluştu. Lütfen daha sonra tekrar deneyiniz.";

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\w+\-.]+@[a-z\d\-]+(\.[a-z\d\-]+)*\.[a-z]+$").unwrap());

/// Order status lookup offered to the model
pub struct LookupOrderTool {
    lookup: Arc<dyn OrderLookup>,
}

impl LookupOrderTool {
    pub fn new(lookup: Arc<dyn OrderLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Tool for LookupOrderTool {
    fn name(&self) -> &str {
        LOOKUP_ORDER
    }

    fn definition(&self) -> ToolDefinition {
        ToolBuilder::new(
            LOOKUP_ORDER,
            "Müşterinin sipariş durumunu sorgular. GÜVENLİK: Hem email adresi hem de sipariş numarası birlikte gereklidir. \
             Müşteri siparişini veya kargosunu sorduğunda önce bu iki bilgiyi iste, sonra bu tool'u kullan.",
        )
        .param(
            "email",
            "string",
            "Müşterinin sipariş verirken kullandığı email adresi (örn: ornek@email.com)",
            true,
        )
        .param(
            "order_number",
            "string",
            "Sipariş numarası (örn: #1001 veya 1001)",
            true,
        )
        .build()
    }

    async fn execute(&self, arguments: Value) -> std::result::Result<ToolOutput, ToolError> {
        let (email, order_number) = match (
            string_arg(&arguments, "email"),
            string_arg(&arguments, "order_number"),
        ) {
            (Some(email), Some(order_number)) => (email, order_number),
            _ => return Ok(ToolOutput::text(MISSING_CREDENTIALS)),
        };

        if !EMAIL.is_match(email) {
            return Ok(ToolOutput::text(INVALID_EMAIL));
        }

        let digits: String = order_number.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Ok(ToolOutput::text(INVALID_ORDER_NUMBER));
        }

        let content = match self.lookup.lookup(email, &digits).await {
            Ok(Some(order)) => format_order(&order),
            Ok(None) => {
                tracing::info!(order_number = %digits, "Order not found or email mismatch");
                format!(
                    "{} numaralı sipariş bulunamadı veya email adresi eşleşmiyor. Lütfen bilgilerinizi kontrol ediniz.",
                    order_number
                )
            },
            Err(e) => {
                tracing::error!(error = %e, order_number = %digits, "Order lookup failed");
                LOOKUP_FAILED.to_string()
            },
        };

        Ok(ToolOutput::text(content))
    }

    fn timeout_secs(&self) -> u64 {
        15
    }
}

/// Customer-facing status summary with tracking lines
pub fn format_order(order: &OrderSummary) -> String {
    let number = &order.order_number;
    let mut lines = Vec::new();

    if order.cancelled {
        lines.push(format!("{} no'lu siparişiniz iptal edilmiştir.", number));
        if let Some(reason) = order.cancel_reason.as_deref().filter(|r| !r.is_empty()) {
            lines.push(format!("İptal sebebi: {}", reason));
        }
        return lines.join("\n");
    }

    match &order.status {
        FulfillmentStatus::Delivered => {
            lines.push(format!("{} no'lu siparişiniz teslim edilmiştir.", number));
        },
        FulfillmentStatus::Preparing => {
            lines.push(format!(
                "{} no'lu siparişiniz hazırlanıyor, henüz kargoya verilmedi.",
                number
            ));
        },
        FulfillmentStatus::Shipped | FulfillmentStatus::PartiallyShipped => {
            lines.push(format!("{} no'lu siparişiniz kargoya verilmiştir.", number));
        },
        FulfillmentStatus::Other(status) => {
            lines.push(format!("{} no'lu siparişiniz işleme alınmıştır.", number));
            lines.push(format!("Durum: {}", status));
        },
    }

    if !order.tracking.is_empty() {
        lines.push(String::new());
        for tracking in &order.tracking {
            lines.push(format!(
                "Kargo Şirketi: {}",
                tracking.company.as_deref().unwrap_or("Kargo Firması")
            ));
            lines.push(format!("Takip Numarası: {}", tracking.tracking_number));
            if let Some(url) = &tracking.tracking_url {
                lines.push(format!("Takip Linki: {}", url));
            }
        }
    }

    lines.join("\n")
}

/// [`OrderLookup`] over a commerce REST endpoint
///
/// `GET {endpoint}/orders?email=..&order_number=..` answers with an
/// [`OrderSummary`] or 404.
pub struct HttpOrderLookup {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpOrderLookup {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// `None` when no orders endpoint is configured
    pub fn from_config(config: &CommerceConfig) -> Result<Option<Self>> {
        config
            .orders_endpoint
            .as_deref()
            .map(|endpoint| {
                Self::new(
                    endpoint,
                    config.api_key.clone(),
                    Duration::from_secs(config.timeout_secs),
                )
            })
            .transpose()
    }
}

#[async_trait]
impl OrderLookup for HttpOrderLookup {
    async fn lookup(&self, email: &str, order_number: &str) -> Result<Option<OrderSummary>> {
        let url = format!("{}/orders", self.endpoint);
        let mut request = self
            .client
            .get(&url)
            .query(&[("email", email), ("order_number", order_number)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Tool(format!("Order request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<OrderSummary>()
                .await
                .map(Some)
                .map_err(|e| Error::Tool(format!("Invalid order response: {}", e))),
            status => Err(Error::Tool(format!("Order backend returned {}", status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use support_agent_core::TrackingInfo;

    struct FakeLookup {
        order: Option<OrderSummary>,
        fail: bool,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeLookup {
        fn new(order: Option<OrderSummary>, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                order,
                fail,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl OrderLookup for FakeLookup {
        async fn lookup(&self, email: &str, order_number: &str) -> Result<Option<OrderSummary>> {
            self.calls.lock().push((email.to_string(), order_number.to_string()));
            if self.fail {
                return Err(Error::Tool("backend down".into()));
            }
            Ok(self.order.clone())
        }
    }

    fn order(status: FulfillmentStatus) -> OrderSummary {
        OrderSummary {
            order_number: "#1001".into(),
            status,
            cancelled: false,
            cancel_reason: None,
            tracking: vec![],
        }
    }

    #[tokio::test]
    async fn test_requires_both_arguments() {
        let lookup = FakeLookup::new(None, false);
        let tool = LookupOrderTool::new(lookup.clone());

        let output = tool.execute(json!({"email": "a@b.com"})).await.unwrap();
        assert_eq!(output.content, MISSING_CREDENTIALS);
        assert!(lookup.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_validates_inputs() {
        let tool = LookupOrderTool::new(FakeLookup::new(None, false));

        let output = tool
            .execute(json!({"email": "not-an-email", "order_number": "1001"}))
            .await
            .unwrap();
        assert_eq!(output.content, INVALID_EMAIL);

        let output = tool
            .execute(json!({"email": "a@b.com", "order_number": "#abc"}))
            .await
            .unwrap();
        assert_eq!(output.content, INVALID_ORDER_NUMBER);
    }

    #[tokio::test]
    async fn test_lookup_passes_clean_order_number() {
        let lookup = FakeLookup::new(Some(order(FulfillmentStatus::Delivered)), false);
        let tool = LookupOrderTool::new(lookup.clone());

        let output = tool
            .execute(json!({"email": "ayse@example.com", "order_number": "#1001"}))
            .await
            .unwrap();

        assert_eq!(output.content, "#1001 no'lu siparişiniz teslim edilmiştir.");
        assert_eq!(
            lookup.calls.lock()[0],
            ("ayse@example.com".to_string(), "1001".to_string())
        );
    }

    #[tokio::test]
    async fn test_not_found_and_failure() {
        let tool = LookupOrderTool::new(FakeLookup::new(None, false));
        let output = tool
            .execute(json!({"email": "a@b.com", "order_number": "#42"}))
            .await
            .unwrap();
        assert!(output.content.starts_with("#42 numaralı sipariş bulunamadı"));

        let tool = LookupOrderTool::new(FakeLookup::new(None, true));
        let output = tool
            .execute(json!({"email": "a@b.com", "order_number": "42"}))
            .await
            .unwrap();
        assert_eq!(output.content, LOOKUP_FAILED);
    }

    #[test]
    fn test_format_cancelled() {
        let mut o = order(FulfillmentStatus::Shipped);
        o.cancelled = true;
        o.cancel_reason = Some("customer".into());
        assert_eq!(
            format_order(&o),
            "#1001 no'lu siparişiniz iptal edilmiştir.\nİptal sebebi: customer"
        );
    }

    #[test]
    fn test_format_shipped_with_tracking() {
        let mut o = order(FulfillmentStatus::Shipped);
        o.tracking = vec![TrackingInfo {
            company: None,
            tracking_number: "TR123".into(),
            tracking_url: Some("https://kargo.example/TR123".into()),
        }];
        assert_eq!(
            format_order(&o),
            "#1001 no'lu siparişiniz kargoya verilmiştir.\n\nKargo Şirketi: Kargo Firması\nTakip Numarası: TR123\nTakip Linki: https://kargo.example/TR123"
        );
    }

    #[test]
    fn test_format_other_status() {
        let text = format_order(&order(FulfillmentStatus::Other("Beklemede".into())));
        assert!(text.ends_with("Durum: Beklemede"));
        assert!(format_order(&order(FulfillmentStatus::Preparing)).contains("hazırlanıyor"));
    }

    #[test]
    fn test_from_config_without_endpoint() {
        assert!(HttpOrderLookup::from_config(&CommerceConfig::default())
            .unwrap()
            .is_none());
    }
}
