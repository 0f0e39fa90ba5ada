use crate::error::{AttributionError, Result};
use crate::schema::*;
use crate::universe::DocumentUnitMap;
use crate::utils::{days_between, window_start};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A contact placed in its unit bucket, remembering where it sat in the input.
#[derive(Debug, Clone, Copy)]
pub struct IndexedContact<'a> {
    pub date: NaiveDate,
    pub order: usize,
    pub event: &'a ContactEvent,
}

/// Contacts grouped per unit, each bucket sorted by (date, input order).
pub struct ContactIndex<'a> {
    buckets: HashMap<&'a str, Vec<IndexedContact<'a>>>,
    skipped: usize,
}

impl<'a> ContactIndex<'a> {
    pub fn build(contacts: &'a [ContactEvent], mode: ValidationMode) -> Result<Self> {
        let mut buckets: HashMap<&'a str, Vec<IndexedContact<'a>>> = HashMap::new();
        let mut skipped = 0;

        for (order, event) in contacts.iter().enumerate() {
            let Some(date) = event.timestamp else {
                let err = AttributionError::InvalidInput {
                    record: format!("contact #{} (unit {})", order, event.unit_id),
                    details: "missing contact timestamp".to_string(),
                };
                match mode {
                    ValidationMode::Strict => return Err(err),
                    ValidationMode::Lenient => {
                        warn!("Skipping {}", err);
                        skipped += 1;
                        continue;
                    }
                }
            };

            buckets
                .entry(event.unit_id.as_str())
                .or_default()
                .push(IndexedContact { date, order, event });
        }

        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|c| (c.date, c.order));
        }

        debug!(
            "Indexed {} contacts across {} units ({} skipped)",
            contacts.len() - skipped,
            buckets.len(),
            skipped
        );

        Ok(Self { buckets, skipped })
    }

    /// Contacts of `unit` dated within `[from, to]`, oldest first.
    pub fn window(&self, unit: &str, from: NaiveDate, to: NaiveDate) -> &[IndexedContact<'a>] {
        let Some(bucket) = self.buckets.get(unit) else {
            return &[];
        };
        let lo = bucket.partition_point(|c| c.date < from);
        let hi = bucket.partition_point(|c| c.date <= to);
        if lo >= hi {
            return &[];
        }
        &bucket[lo..hi]
    }

    pub fn unit_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Candidate ordering: outcome rank ascending, then most recent first, then agent
/// identifier ascending, then earliest input position.
fn compare_candidates(a: &IndexedContact<'_>, b: &IndexedContact<'_>) -> Ordering {
    a.event
        .outcome
        .rank()
        .cmp(&b.event.outcome.rank())
        .then_with(|| b.date.cmp(&a.date))
        .then_with(|| a.event.agent.cmp(&b.event.agent))
        .then_with(|| a.order.cmp(&b.order))
}

pub fn select_best<'c, 'a>(candidates: &'c [IndexedContact<'a>]) -> Option<&'c IndexedContact<'a>> {
    candidates.iter().min_by(|a, b| compare_candidates(a, b))
}

pub struct AttributionEngine {
    config: AttributionConfig,
}

impl Default for AttributionEngine {
    fn default() -> Self {
        Self::new(AttributionConfig::default())
    }
}

impl AttributionEngine {
    pub fn new(config: AttributionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttributionConfig {
        &self.config
    }

    /// Attributes every mappable payment to at most one prior contact of its unit.
    ///
    /// Payments whose document has no unit are dropped. Invalid records abort the
    /// run in strict mode and are skipped (and counted) in lenient mode.
    pub fn attribute(
        &self,
        contacts: &[ContactEvent],
        payments: &[PaymentEvent],
        document_to_unit: &DocumentUnitMap,
    ) -> Result<AttributionOutput> {
        self.config.validate()?;

        let mut diagnostics = AttributionDiagnostics {
            payments_received: payments.len(),
            ..Default::default()
        };

        if contacts.is_empty() || payments.is_empty() {
            debug!(
                "Nothing to attribute: {} contacts, {} payments",
                contacts.len(),
                payments.len()
            );
            return Ok(AttributionOutput {
                records: Vec::new(),
                diagnostics,
            });
        }

        let index = ContactIndex::build(contacts, self.config.validation)?;
        diagnostics.contacts_skipped = index.skipped();

        let mut records = Vec::with_capacity(payments.len());

        for (position, payment) in payments.iter().enumerate() {
            let payment_date = match validate_payment(position, payment) {
                Ok(date) => date,
                Err(err) => match self.config.validation {
                    ValidationMode::Strict => return Err(err),
                    ValidationMode::Lenient => {
                        warn!("Skipping {}", err);
                        diagnostics.payments_skipped += 1;
                        continue;
                    }
                },
            };

            let Some(unit_id) = document_to_unit.unit_for(&payment.document_id) else {
                diagnostics.payments_unmapped += 1;
                continue;
            };

            let record = self.attribute_payment(&index, payment, unit_id, payment_date);
            if record.is_attributed() {
                diagnostics.attributed += 1;
            } else {
                diagnostics.unattributed += 1;
            }
            records.push(record);
        }

        info!(
            "Attributed {} of {} payments ({} without contact, {} unmapped, {} skipped)",
            diagnostics.attributed,
            diagnostics.payments_received,
            diagnostics.unattributed,
            diagnostics.payments_unmapped,
            diagnostics.payments_skipped
        );

        Ok(AttributionOutput {
            records,
            diagnostics,
        })
    }

    fn attribute_payment(
        &self,
        index: &ContactIndex<'_>,
        payment: &PaymentEvent,
        unit_id: &UnitId,
        payment_date: NaiveDate,
    ) -> AttributionRecord {
        let from = window_start(payment_date, self.config.window_days);
        let candidates = index.window(unit_id, from, payment_date);

        match select_best(candidates) {
            Some(best) => AttributionRecord {
                document_id: payment.document_id.clone(),
                unit_id: unit_id.clone(),
                payment_date,
                paid_amount: payment.paid_amount,
                attributed_agent: Some(best.event.agent.clone()),
                attributed_channel: Some(best.event.channel),
                attributed_contact_timestamp: Some(best.date),
                attributed_outcome: best.event.outcome.into(),
                elapsed_days: u32::try_from(days_between(best.date, payment_date)).ok(),
            },
            None => AttributionRecord {
                document_id: payment.document_id.clone(),
                unit_id: unit_id.clone(),
                payment_date,
                paid_amount: payment.paid_amount,
                attributed_agent: None,
                attributed_channel: None,
                attributed_contact_timestamp: None,
                attributed_outcome: AttributedOutcome::SinGestion,
                elapsed_days: None,
            },
        }
    }
}

fn validate_payment(position: usize, payment: &PaymentEvent) -> Result<NaiveDate> {
    let record = || format!("payment #{} (document {})", position, payment.document_id);

    if !payment.paid_amount.is_finite() || payment.paid_amount <= 0.0 {
        return Err(AttributionError::InvalidInput {
            record: record(),
            details: format!("paid amount {} is not positive", payment.paid_amount),
        });
    }

    payment.payment_date.ok_or_else(|| AttributionError::InvalidInput {
        record: record(),
        details: "missing payment date".to_string(),
    })
}

/// Runs attribution with the default 30-day lenient configuration.
pub fn attribute(
    contacts: &[ContactEvent],
    payments: &[PaymentEvent],
    document_to_unit: &DocumentUnitMap,
) -> Result<AttributionOutput> {
    AttributionEngine::default().attribute(contacts, payments, document_to_unit)
}
