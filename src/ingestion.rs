use crate::homologation::homologate_outcome;
use crate::schema::{Channel, ContactEvent, PaymentEvent};
use crate::universe::DocumentUnitMap;
use crate::utils::parse_warehouse_date;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DIALER_AGENT: &str = "DISCADOR";
pub const VOICEBOT_AGENT: &str = "VOICEBOT";

/// A management record as exported from the call or voicebot tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContactRow {
    pub channel: String,
    pub document: String,
    /// Date or date-time of the attempt.
    pub date: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    pub management: String,
    #[serde(default)]
    pub sub_management: Option<String>,
    /// Voicebot commitment answer ("SI"/"NO").
    #[serde(default)]
    pub commitment_flag: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub promised_amount: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactIngestion {
    pub contacts: Vec<ContactEvent>,
    /// Rows whose document belongs to no unit.
    pub unmapped: usize,
    pub unknown_channel: usize,
}

/// Turns raw management rows into contact events placed on their unit.
///
/// Rows with an unreadable date are kept with an absent timestamp so the engine's
/// validation mode decides what happens to them.
pub fn convert_contact_rows(rows: &[RawContactRow], map: &DocumentUnitMap) -> ContactIngestion {
    let mut ingestion = ContactIngestion::default();

    for row in rows {
        let Some(channel) = Channel::parse(&row.channel) else {
            warn!(
                "Unknown contact channel '{}' for document {}",
                row.channel, row.document
            );
            ingestion.unknown_channel += 1;
            continue;
        };

        let Some(unit_id) = map.unit_for(row.document.trim()) else {
            ingestion.unmapped += 1;
            continue;
        };

        let timestamp = parse_warehouse_date(&row.date);
        if timestamp.is_none() {
            debug!("Unreadable contact date '{}' for document {}", row.date, row.document);
        }

        let agent = match channel {
            Channel::Voicebot => VOICEBOT_AGENT.to_string(),
            Channel::Call => row
                .agent_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DIALER_AGENT)
                .to_string(),
        };

        ingestion.contacts.push(ContactEvent {
            unit_id: unit_id.clone(),
            timestamp,
            channel,
            agent,
            outcome: homologate_outcome(channel, &row.management, row.commitment_flag.as_deref()),
            duration_seconds: row.duration_seconds,
            promised_amount: row.promised_amount,
        });
    }

    debug!(
        "Converted {} of {} contact rows ({} unmapped, {} unknown channel)",
        ingestion.contacts.len(),
        rows.len(),
        ingestion.unmapped,
        ingestion.unknown_channel
    );

    ingestion
}

/// A payment row as exported from the payments batch table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPaymentRow {
    pub system_code: String,
    pub document: String,
    pub amount: f64,
    pub date: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentIngestion {
    pub payments: Vec<PaymentEvent>,
    pub rejected: usize,
    pub non_positive: usize,
}

/// Keeps accepted payments with a positive amount.
pub fn convert_payment_rows(rows: &[RawPaymentRow]) -> PaymentIngestion {
    let mut ingestion = PaymentIngestion::default();

    for row in rows {
        if row
            .rejection_reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty())
        {
            ingestion.rejected += 1;
            continue;
        }

        if row.amount.is_nan() || row.amount <= 0.0 {
            ingestion.non_positive += 1;
            continue;
        }

        ingestion.payments.push(PaymentEvent {
            document_id: row.document.trim().to_string(),
            paid_amount: row.amount,
            payment_date: parse_warehouse_date(&row.date),
        });
    }

    debug!(
        "Converted {} of {} payment rows ({} rejected, {} non-positive)",
        ingestion.payments.len(),
        rows.len(),
        ingestion.rejected,
        ingestion.non_positive
    );

    ingestion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ContactOutcome;
    use chrono::NaiveDate;

    fn contact_row(channel: &str, document: &str, agent: Option<&str>, management: &str) -> RawContactRow {
        RawContactRow {
            channel: channel.to_string(),
            document: document.to_string(),
            date: "2025-07-02 10:15:00".to_string(),
            agent_name: agent.map(str::to_string),
            management: management.to_string(),
            sub_management: None,
            commitment_flag: None,
            duration_seconds: Some(120.0),
            promised_amount: None,
        }
    }

    #[test]
    fn test_convert_contact_rows() {
        let map = DocumentUnitMap::from_pairs(vec![("D1", "U1")]);
        let rows = vec![
            contact_row("CALL", "D1", Some("ANA"), "Promesa de pago"),
            contact_row("CALL", "D1", None, "No contesta"),
            contact_row("VOICEBOT", "D1", Some("ignored"), "Ocupado"),
            contact_row("CALL", "D7", Some("ANA"), "Promesa de pago"),
            contact_row("SMS", "D1", None, "Enviado"),
        ];

        let ingestion = convert_contact_rows(&rows, &map);
        assert_eq!(ingestion.contacts.len(), 3);
        assert_eq!(ingestion.unmapped, 1);
        assert_eq!(ingestion.unknown_channel, 1);

        let first = &ingestion.contacts[0];
        assert_eq!(first.unit_id, "U1");
        assert_eq!(first.timestamp, NaiveDate::from_ymd_opt(2025, 7, 2));
        assert_eq!(first.outcome, ContactOutcome::EffectiveContact);

        assert_eq!(ingestion.contacts[1].agent, DIALER_AGENT);
        assert_eq!(ingestion.contacts[1].outcome, ContactOutcome::NoContact);
        assert_eq!(ingestion.contacts[2].agent, VOICEBOT_AGENT);
        assert_eq!(ingestion.contacts[2].channel, Channel::Voicebot);
    }

    #[test]
    fn test_unreadable_contact_date_kept_without_timestamp() {
        let map = DocumentUnitMap::from_pairs(vec![("D1", "U1")]);
        let mut row = contact_row("CALL", "D1", Some("ANA"), "Contacto");
        row.date = "yesterday".to_string();

        let ingestion = convert_contact_rows(&[row], &map);
        assert_eq!(ingestion.contacts.len(), 1);
        assert!(ingestion.contacts[0].timestamp.is_none());
    }

    #[test]
    fn test_convert_payment_rows() {
        let row = |amount: f64, rejection: Option<&str>| RawPaymentRow {
            system_code: "SYS".to_string(),
            document: " D1 ".to_string(),
            amount,
            date: "2025-07-10".to_string(),
            rejection_reason: rejection.map(str::to_string),
        };
        let rows = vec![
            row(50.0, None),
            row(50.0, Some("DUPLICADO")),
            row(0.0, None),
            row(-10.0, None),
            row(25.0, Some("  ")),
        ];

        let ingestion = convert_payment_rows(&rows);
        assert_eq!(ingestion.payments.len(), 2);
        assert_eq!(ingestion.rejected, 1);
        assert_eq!(ingestion.non_positive, 2);
        assert_eq!(ingestion.payments[0].document_id, "D1");
        assert_eq!(
            ingestion.payments[0].payment_date,
            NaiveDate::from_ymd_opt(2025, 7, 10)
        );
    }
}
