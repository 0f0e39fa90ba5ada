//! # Collections Attribution
//!
//! A library for crediting collection payments to the outreach that most plausibly
//! produced them, and for turning the result into weekly collections KPIs.
//!
//! ## Core Concepts
//!
//! - **Unit**: the customer-level identifier (`cod_luna`) grouping every document and contact of one person
//! - **Contact event**: one outreach attempt by a human agent, the dialer or the voicebot
//! - **Attribution window**: the inclusive 30-day lookback in which a contact may be credited
//! - **SIN_GESTION**: the outcome of a payment with no contact inside the window
//!
//! The attribution engine is a pure function over materialized rows: it performs no I/O,
//! and everything it skipped or dropped is reported back in [`AttributionDiagnostics`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use collections_attribution::*;
//! use chrono::NaiveDate;
//!
//! let map = DocumentUnitMap::from_pairs(vec![("DOC-1", "U1")]);
//! let contacts = vec![ContactEvent {
//!     unit_id: "U1".to_string(),
//!     timestamp: NaiveDate::from_ymd_opt(2025, 7, 1),
//!     channel: Channel::Call,
//!     agent: "ANA".to_string(),
//!     outcome: ContactOutcome::EffectiveContact,
//!     duration_seconds: None,
//!     promised_amount: None,
//! }];
//! let payments = vec![PaymentEvent {
//!     document_id: "DOC-1".to_string(),
//!     paid_amount: 50.0,
//!     payment_date: NaiveDate::from_ymd_opt(2025, 7, 11),
//! }];
//!
//! let output = attribute(&contacts, &payments, &map).unwrap();
//! assert_eq!(output.records[0].elapsed_days, Some(10));
//! ```

pub mod engine;
pub mod error;
pub mod homologation;
pub mod ingestion;
pub mod kpi;
pub mod schema;
pub mod universe;
pub mod utils;

pub use engine::{attribute, AttributionEngine, ContactIndex};
pub use error::{AttributionError, Result};
pub use homologation::{classify_portfolio, classify_service, homologate_outcome};
pub use ingestion::*;
pub use kpi::{AgentPerformance, KpiCalculator, SummaryMetrics};
pub use schema::*;
pub use universe::*;
pub use utils::{days_between, parse_warehouse_date, window_start};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Number of agents surfaced in the weekly summary.
pub const TOP_AGENTS: usize = 5;

/// Raw rows for one reporting period, as handed over by the warehouse extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyInput {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub assignments: Vec<AssignmentRow>,
    pub debts: Vec<DebtRow>,
    pub contacts: Vec<RawContactRow>,
    pub payments: Vec<RawPaymentRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedCounts {
    pub assignments: usize,
    pub manageable_universe: usize,
    pub contacts: usize,
    pub payments: usize,
    pub attributions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub processed: ProcessedCounts,
    pub duplication: DuplicationSummary,
    pub universe: UniverseStats,
    pub diagnostics: AttributionDiagnostics,
    pub metrics: SummaryMetrics,
    pub top_agents: Vec<AgentPerformance>,
    pub attributions: Vec<AttributionRecord>,
}

impl WeeklyReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct WeeklyProcessor;

impl WeeklyProcessor {
    pub fn process(input: &WeeklyInput, config: &AttributionConfig) -> Result<WeeklyReport> {
        config.validate()?;
        if input.period_end < input.period_start {
            return Err(AttributionError::DateError(format!(
                "Period end {} is before period start {}",
                input.period_end, input.period_start
            )));
        }

        info!(
            "Processing period {} to {}",
            input.period_start, input.period_end
        );

        let duplication = summarize_duplicated_units(&input.assignments);
        let debts = current_debt(&input.debts, input.period_end);
        let universe = build_manageable_universe(&input.assignments, &debts);
        let map = universe.document_unit_map();

        let contacts = convert_contact_rows(&input.contacts, &map);
        let mut payments = convert_payment_rows(&input.payments);

        // Undated payments are left in so the engine's validation mode decides on them.
        payments.payments.retain(|p| {
            p.payment_date
                .map_or(true, |d| d >= input.period_start && d <= input.period_end)
        });
        debug!(
            "{} payments inside the reporting period",
            payments.payments.len()
        );

        let output = AttributionEngine::new(config.clone()).attribute(
            &contacts.contacts,
            &payments.payments,
            &map,
        )?;

        // Attribution looks back past the period start; KPIs only count the week's contacts.
        let period_contacts: Vec<ContactEvent> = contacts
            .contacts
            .iter()
            .filter(|c| {
                c.timestamp
                    .is_some_and(|d| d >= input.period_start && d <= input.period_end)
            })
            .cloned()
            .collect();
        debug!(
            "{} of {} contacts inside the reporting period",
            period_contacts.len(),
            contacts.contacts.len()
        );

        let calculator = KpiCalculator::new(
            &input.assignments,
            &period_contacts,
            &payments.payments,
            &output.records,
        );
        let metrics = calculator.summary_metrics();
        let top_agents = calculator.agent_ranking(TOP_AGENTS);

        Ok(WeeklyReport {
            period_start: input.period_start,
            period_end: input.period_end,
            processed: ProcessedCounts {
                assignments: input.assignments.len(),
                manageable_universe: universe.entries.len(),
                contacts: period_contacts.len(),
                payments: payments.payments.len(),
                attributions: output.records.len(),
            },
            duplication,
            universe: universe.stats,
            diagnostics: output.diagnostics,
            metrics,
            top_agents,
            attributions: output.records,
        })
    }
}

pub fn process_weekly(input: &WeeklyInput) -> Result<WeeklyReport> {
    WeeklyProcessor::process(input, &AttributionConfig::default())
}
