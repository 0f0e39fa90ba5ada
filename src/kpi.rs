use crate::schema::{AttributionRecord, Channel, ContactEvent, ContactOutcome, PaymentEvent};
use crate::universe::AssignmentRow;
use crate::utils::{percentage, round2, safe_ratio};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodTotals {
    pub total_assigned_units: usize,
    pub total_accounts: usize,
    pub total_contacts: usize,
    pub managed_units: usize,
    pub total_payments: usize,
    pub total_paid_amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KpiRates {
    /// Effective contacts over all contacts, in percent.
    pub contactability_rate: f64,
    /// Attributed payments over all payments, in percent.
    pub attribution_rate: f64,
    /// Contacts per managed unit.
    pub management_intensity: f64,
    pub average_ticket: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryMetrics {
    pub period: PeriodTotals,
    pub kpis: KpiRates,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentPerformance {
    pub agent: String,
    pub total_contacts: usize,
    pub effective_contacts: usize,
    pub no_contacts: usize,
    pub total_duration_seconds: f64,
    pub promised_amount: f64,
    pub promise_count: usize,
    pub contactability_rate: f64,
    /// Average minutes per contact.
    pub intensity: f64,
    pub attributed_amount: f64,
    pub paying_units: usize,
}

pub struct KpiCalculator<'a> {
    assignments: &'a [AssignmentRow],
    contacts: &'a [ContactEvent],
    payments: &'a [PaymentEvent],
    attributions: &'a [AttributionRecord],
}

impl<'a> KpiCalculator<'a> {
    pub fn new(
        assignments: &'a [AssignmentRow],
        contacts: &'a [ContactEvent],
        payments: &'a [PaymentEvent],
        attributions: &'a [AttributionRecord],
    ) -> Self {
        Self {
            assignments,
            contacts,
            payments,
            attributions,
        }
    }

    pub fn summary_metrics(&self) -> SummaryMetrics {
        let total_assigned_units = self
            .assignments
            .iter()
            .map(|a| a.unit_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        let total_accounts = self
            .assignments
            .iter()
            .map(|a| a.account.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let total_contacts = self.contacts.len();
        let managed_units = self
            .contacts
            .iter()
            .map(|c| c.unit_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        let effective = self
            .contacts
            .iter()
            .filter(|c| c.outcome == ContactOutcome::EffectiveContact)
            .count();

        let total_payments = self.payments.len();
        let total_paid_amount: f64 = self.payments.iter().map(|p| p.paid_amount).sum();
        let attributed = self.attributions.iter().filter(|r| r.is_attributed()).count();

        SummaryMetrics {
            period: PeriodTotals {
                total_assigned_units,
                total_accounts,
                total_contacts,
                managed_units,
                total_payments,
                total_paid_amount,
            },
            kpis: KpiRates {
                contactability_rate: percentage(effective as f64, total_contacts as f64),
                attribution_rate: percentage(attributed as f64, total_payments as f64),
                management_intensity: safe_ratio(total_contacts as f64, managed_units as f64),
                average_ticket: safe_ratio(total_paid_amount, total_payments as f64),
            },
        }
    }

    /// Human-agent ranking; automated voice contacts are left out.
    pub fn agent_ranking(&self, top_n: usize) -> Vec<AgentPerformance> {
        let mut agents: BTreeMap<&str, AgentPerformance> = BTreeMap::new();

        for contact in self
            .contacts
            .iter()
            .filter(|c| c.channel != Channel::Voicebot)
        {
            let entry = agents
                .entry(contact.agent.as_str())
                .or_insert_with(|| AgentPerformance {
                    agent: contact.agent.clone(),
                    ..Default::default()
                });

            entry.total_contacts += 1;
            match contact.outcome {
                ContactOutcome::EffectiveContact => entry.effective_contacts += 1,
                ContactOutcome::NoContact => entry.no_contacts += 1,
                ContactOutcome::IneffectiveContact => {}
            }
            entry.total_duration_seconds += contact.duration_seconds.unwrap_or(0.0);
            if let Some(amount) = contact.promised_amount {
                entry.promised_amount += amount;
                entry.promise_count += 1;
            }
        }

        let mut paid_by_agent: BTreeMap<&str, (f64, BTreeSet<&str>)> = BTreeMap::new();
        for record in self.attributions {
            if let Some(agent) = record.attributed_agent.as_deref() {
                let (amount, units) = paid_by_agent.entry(agent).or_default();
                *amount += record.paid_amount;
                units.insert(record.unit_id.as_str());
            }
        }

        let mut ranking: Vec<AgentPerformance> = agents
            .into_iter()
            .map(|(name, mut perf)| {
                let total = perf.total_contacts as f64;
                perf.contactability_rate = percentage(perf.effective_contacts as f64, total);
                perf.intensity = round2(perf.total_duration_seconds / total / 60.0);
                if let Some((amount, units)) = paid_by_agent.get(name) {
                    perf.attributed_amount = *amount;
                    perf.paying_units = units.len();
                }
                perf
            })
            .collect();

        ranking.sort_by(|a, b| {
            b.attributed_amount
                .total_cmp(&a.attributed_amount)
                .then_with(|| b.contactability_rate.total_cmp(&a.contactability_rate))
                .then_with(|| b.total_contacts.cmp(&a.total_contacts))
                .then_with(|| a.agent.cmp(&b.agent))
        });
        ranking.truncate(top_n);
        ranking
    }
}
