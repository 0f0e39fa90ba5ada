use crate::error::{AttributionError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Customer-level identifier grouping every debt and contact of one person (`cod_luna`).
pub type UnitId = String;

/// Document/account identifier as it appears in debt and payment extracts.
pub type DocumentId = String;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 366;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactOutcome {
    #[schemars(description = "The debtor was reached and engaged (contact, promise, commitment, acceptance)")]
    EffectiveContact,

    #[schemars(description = "Someone was reached but the contact did not engage the debtor")]
    IneffectiveContact,

    #[schemars(description = "Nobody was reached (no answer, busy, switched off, voicemail)")]
    NoContact,
}

impl ContactOutcome {
    /// Attribution priority: lower ranks win.
    pub fn rank(self) -> u8 {
        match self {
            ContactOutcome::EffectiveContact => 0,
            ContactOutcome::IneffectiveContact => 1,
            ContactOutcome::NoContact => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    #[schemars(description = "Outbound call handled by a human agent or the dialer")]
    Call,

    #[schemars(description = "Automated voice campaign")]
    Voicebot,
}

impl Channel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CALL" => Some(Channel::Call),
            "VOICEBOT" => Some(Channel::Voicebot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Call => "CALL",
            Channel::Voicebot => "VOICEBOT",
        }
    }
}

/// Outcome carried by an attribution record. `SinGestion` marks a payment with
/// no contact inside the lookback window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributedOutcome {
    EffectiveContact,
    IneffectiveContact,
    NoContact,
    SinGestion,
}

impl From<ContactOutcome> for AttributedOutcome {
    fn from(outcome: ContactOutcome) -> Self {
        match outcome {
            ContactOutcome::EffectiveContact => AttributedOutcome::EffectiveContact,
            ContactOutcome::IneffectiveContact => AttributedOutcome::IneffectiveContact,
            ContactOutcome::NoContact => AttributedOutcome::NoContact,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ContactEvent {
    #[schemars(description = "Unit the contacted document belongs to")]
    pub unit_id: UnitId,

    #[schemars(description = "Contact date (time of day truncated). Absent when the source timestamp could not be read.")]
    pub timestamp: Option<NaiveDate>,

    pub channel: Channel,

    #[schemars(description = "Agent name, DISCADOR for unattended dialer calls, VOICEBOT for the automated channel")]
    pub agent: String,

    pub outcome: ContactOutcome,

    #[serde(default)]
    #[schemars(description = "Call duration in seconds, when reported")]
    pub duration_seconds: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Amount the debtor promised to pay during the contact, when any")]
    pub promised_amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PaymentEvent {
    pub document_id: DocumentId,
    pub paid_amount: f64,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AttributionRecord {
    pub document_id: DocumentId,
    pub unit_id: UnitId,
    pub payment_date: NaiveDate,
    pub paid_amount: f64,
    pub attributed_agent: Option<String>,
    pub attributed_channel: Option<Channel>,
    pub attributed_contact_timestamp: Option<NaiveDate>,
    pub attributed_outcome: AttributedOutcome,
    pub elapsed_days: Option<u32>,
}

impl AttributionRecord {
    pub fn is_attributed(&self) -> bool {
        self.attributed_outcome != AttributedOutcome::SinGestion
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[schemars(description = "Reject the whole batch on the first invalid record")]
    Strict,

    #[default]
    #[schemars(description = "Skip invalid records and report how many were skipped")]
    Lenient,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AttributionConfig {
    #[serde(default = "default_window_days")]
    #[schemars(description = "Lookback in days within which a contact can be credited for a payment (inclusive)")]
    pub window_days: u32,

    #[serde(default)]
    #[schemars(description = "How invalid contacts and payments are handled")]
    pub validation: ValidationMode,
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            validation: ValidationMode::Lenient,
        }
    }
}

impl AttributionConfig {
    pub fn strict() -> Self {
        Self {
            validation: ValidationMode::Strict,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(AttributionError::InvalidConfig(format!(
                "window_days {} exceeds the maximum of {}",
                self.window_days, MAX_WINDOW_DAYS
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AttributionConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Counters describing what an attribution run did with its input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributionDiagnostics {
    pub payments_received: usize,
    /// Payments whose document has no unit; they produce no record.
    pub payments_unmapped: usize,
    /// Invalid payments skipped in lenient mode.
    pub payments_skipped: usize,
    /// Contacts without a timestamp skipped in lenient mode.
    pub contacts_skipped: usize,
    pub attributed: usize,
    pub unattributed: usize,
}

impl AttributionDiagnostics {
    pub fn records_emitted(&self) -> usize {
        self.attributed + self.unattributed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttributionOutput {
    pub records: Vec<AttributionRecord>,
    pub diagnostics: AttributionDiagnostics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum PortfolioType {
    #[serde(rename = "Altas_Nuevas")]
    AltasNuevas,
    Temprana,
    Fraccionamiento,
    Otro,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum ServiceLine {
    Movil,
    Fijo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = AttributionConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("window_days"));
        assert!(schema_json.contains("validation"));
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config = AttributionConfig::from_json_str("{}").unwrap();
        assert_eq!(config.window_days, 30);
        assert_eq!(config.validation, ValidationMode::Lenient);
    }

    #[test]
    fn test_config_rejects_oversized_window() {
        let result = AttributionConfig::from_json_str(r#"{"window_days": 400}"#);
        assert!(matches!(result, Err(AttributionError::InvalidConfig(_))));
    }

    #[test]
    fn test_outcome_wire_names() {
        let json = serde_json::to_string(&AttributedOutcome::SinGestion).unwrap();
        assert_eq!(json, "\"SIN_GESTION\"");

        let outcome: ContactOutcome = serde_json::from_str("\"EFFECTIVE_CONTACT\"").unwrap();
        assert_eq!(outcome, ContactOutcome::EffectiveContact);
        assert_eq!(serde_json::to_string(&Channel::Voicebot).unwrap(), "\"VOICEBOT\"");
    }

    #[test]
    fn test_rank_orders_effective_first() {
        assert!(ContactOutcome::EffectiveContact.rank() < ContactOutcome::IneffectiveContact.rank());
        assert!(ContactOutcome::IneffectiveContact.rank() < ContactOutcome::NoContact.rank());

        let mut outcomes = vec![
            ContactOutcome::NoContact,
            ContactOutcome::EffectiveContact,
            ContactOutcome::IneffectiveContact,
        ];
        outcomes.sort_by_key(|o| o.rank());
        assert_eq!(
            outcomes,
            vec![
                ContactOutcome::EffectiveContact,
                ContactOutcome::IneffectiveContact,
                ContactOutcome::NoContact,
            ]
        );
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!(Channel::parse(" call "), Some(Channel::Call));
        assert_eq!(Channel::parse("VOICEBOT"), Some(Channel::Voicebot));
        assert_eq!(Channel::parse("SMS"), None);
    }
}
