use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel counterparty used when a sale arrives without a named customer.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Fixed intent taxonomy a parsed command may carry.
///
/// `Unknown` absorbs any intent value the remote interpreter invents that
/// this build does not recognize (schema drift), so deserialization never
/// fails on a new intent string. The dispatcher refuses to act on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Sale,
    Expense,
    Customer,
    Inventory,
    Conversation,
    #[serde(other)]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Expense => "expense",
            Self::Customer => "customer",
            Self::Inventory => "inventory",
            Self::Conversation => "conversation",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One interpreted operator submission.
///
/// Produced by either the remote interpreter or the fallback rule matcher,
/// and discarded after dispatch. The field names double as the wire schema
/// the inference endpoint is asked to fill in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub intent: Intent,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub counterparty_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub conversational_reply: Option<String>,
}

impl Command {
    /// A conversational command carrying a canned reply.
    pub fn conversation(reply: impl Into<String>, confidence: f32) -> Self {
        Self {
            intent: Intent::Conversation,
            amount: None,
            counterparty_name: None,
            description: None,
            category: None,
            quantity: None,
            confidence,
            conversational_reply: Some(reply.into()),
        }
    }

    /// An empty command of the given intent, for extractors to fill in.
    pub fn with_intent(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            amount: None,
            counterparty_name: None,
            description: None,
            category: None,
            quantity: None,
            confidence,
            conversational_reply: None,
        }
    }

    /// Clamp confidence into the documented 0.0..=1.0 band.
    pub fn clamp_confidence(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Command, Intent};

    #[test]
    fn wire_payload_parses_with_camel_case_slots() {
        let payload = r#"{
            "intent": "sale",
            "amount": 5000,
            "counterpartyName": "John",
            "confidence": 0.92
        }"#;

        let command: Command = serde_json::from_str(payload).expect("parse wire command");
        assert_eq!(command.intent, Intent::Sale);
        assert_eq!(command.amount, Some(Decimal::from(5000)));
        assert_eq!(command.counterparty_name.as_deref(), Some("John"));
        assert!(command.quantity.is_none());
    }

    #[test]
    fn unrecognized_intent_deserializes_as_unknown() {
        let payload = r#"{"intent": "payroll_run", "confidence": 0.9}"#;
        let command: Command = serde_json::from_str(payload).expect("schema drift must not fail");
        assert_eq!(command.intent, Intent::Unknown);
    }

    #[test]
    fn missing_confidence_defaults_to_zero() {
        let payload = r#"{"intent": "expense", "amount": "12.50"}"#;
        let command: Command = serde_json::from_str(payload).expect("parse");
        assert_eq!(command.confidence, 0.0);
    }

    #[test]
    fn confidence_is_clamped_into_unit_band() {
        let command = Command::with_intent(Intent::Sale, 1.7).clamp_confidence();
        assert_eq!(command.confidence, 1.0);
        let command = Command::with_intent(Intent::Sale, -0.4).clamp_confidence();
        assert_eq!(command.confidence, 0.0);
    }
}
