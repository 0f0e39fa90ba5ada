use crate::error::{AttributionError, Result};
use crate::homologation::{classify_portfolio, classify_service};
use crate::schema::{DocumentId, PortfolioType, ServiceLine, UnitId};
use crate::utils::percentage;
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One assigned account as loaded from a portfolio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub client: String,
    pub account: String,
    pub unit_id: UnitId,
    pub business: String,
    pub portfolio_file: String,
    pub loaded_on: NaiveDate,
}

impl AssignmentRow {
    pub fn portfolio_type(&self) -> PortfolioType {
        classify_portfolio(&self.portfolio_file)
    }

    pub fn service_line(&self) -> ServiceLine {
        classify_service(&self.business)
    }
}

/// One debt snapshot for a document. Several loads of the same document may exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtRow {
    pub account: String,
    pub document_id: DocumentId,
    pub due_date: Option<NaiveDate>,
    pub amount_due: f64,
    pub file: String,
    pub loaded_on: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicationSummary {
    pub assignments: usize,
    pub distinct_units: usize,
    /// Units assigned in more than one row; they stay valid in every portfolio.
    pub duplicated_units: usize,
}

pub fn summarize_duplicated_units(assignments: &[AssignmentRow]) -> DuplicationSummary {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for row in assignments {
        *occurrences.entry(row.unit_id.as_str()).or_default() += 1;
    }

    let summary = DuplicationSummary {
        assignments: assignments.len(),
        distinct_units: occurrences.len(),
        duplicated_units: occurrences.values().filter(|&&n| n > 1).count(),
    };

    info!("Processing {} assignments", summary.assignments);
    info!(
        "Distinct units: {}, units in multiple portfolios: {}",
        summary.distinct_units, summary.duplicated_units
    );

    summary
}

/// Latest load of each document as of `as_of`, keeping only positive balances.
///
/// Loads after `as_of` and non-positive balances are discarded before picking the
/// latest load. Equal load dates keep the first row seen.
pub fn current_debt(debts: &[DebtRow], as_of: NaiveDate) -> Vec<DebtRow> {
    let mut latest: BTreeMap<&str, &DebtRow> = BTreeMap::new();

    for row in debts
        .iter()
        .filter(|r| r.loaded_on <= as_of && r.amount_due > 0.0)
    {
        let newer = latest
            .get(row.document_id.as_str())
            .map_or(true, |existing| existing.loaded_on < row.loaded_on);
        if newer {
            latest.insert(row.document_id.as_str(), row);
        }
    }

    debug!(
        "Current debt as of {}: {} documents from {} rows",
        as_of,
        latest.len(),
        debts.len()
    );

    latest.into_values().cloned().collect()
}

/// Document to unit association used to place payments (and raw contacts) on a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUnitMap {
    entries: HashMap<DocumentId, UnitId>,
    conflicts: usize,
}

impl DocumentUnitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map keeping the first unit seen for each document.
    pub fn from_pairs<I, D, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, U)>,
        D: Into<DocumentId>,
        U: Into<UnitId>,
    {
        let mut map = Self::new();
        for (document, unit) in pairs {
            map.insert_first_wins(document.into(), unit.into());
        }
        if map.conflicts > 0 {
            debug!(
                "{} documents mapped to more than one unit; kept first occurrence",
                map.conflicts
            );
        }
        map
    }

    /// Builds the map, rejecting any document that maps to two different units.
    pub fn try_from_pairs<I, D, U>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (D, U)>,
        D: Into<DocumentId>,
        U: Into<UnitId>,
    {
        let mut map = Self::new();
        for (document, unit) in pairs {
            let (document, unit) = (document.into(), unit.into());
            if let Some(existing) = map.entries.get(&document) {
                if *existing != unit {
                    return Err(AttributionError::AmbiguousMapping {
                        document,
                        first_unit: existing.clone(),
                        second_unit: unit,
                    });
                }
                continue;
            }
            map.entries.insert(document, unit);
        }
        Ok(map)
    }

    /// Returns `false` when the document was already present (the existing unit is kept).
    pub fn insert_first_wins(&mut self, document: DocumentId, unit: UnitId) -> bool {
        match self.entries.get(&document) {
            Some(existing) => {
                if *existing != unit {
                    self.conflicts += 1;
                }
                false
            }
            None => {
                self.entries.insert(document, unit);
                true
            }
        }
    }

    pub fn unit_for(&self, document: &str) -> Option<&UnitId> {
        self.entries.get(document)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of documents that were offered a second, different unit.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UniverseEntry {
    pub account: String,
    pub document_id: DocumentId,
    pub unit_id: UnitId,
    pub due_date: Option<NaiveDate>,
    pub amount_due: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UniverseStats {
    pub assignments: usize,
    pub with_debt: usize,
    pub manageable_pct: f64,
}

/// Assigned accounts that still carry debt: the only cases worth managing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManageableUniverse {
    pub entries: Vec<UniverseEntry>,
    pub stats: UniverseStats,
}

impl ManageableUniverse {
    pub fn document_unit_map(&self) -> DocumentUnitMap {
        DocumentUnitMap::from_pairs(
            self.entries
                .iter()
                .map(|e| (e.document_id.clone(), e.unit_id.clone())),
        )
    }

    pub fn units(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.unit_id.as_str()).collect()
    }
}

/// Inner join of current debt with the distinct (account, unit) pairs of the assignment.
///
/// An account assigned to several units yields one universe entry per unit.
pub fn build_manageable_universe(
    assignments: &[AssignmentRow],
    debts: &[DebtRow],
) -> ManageableUniverse {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut units_by_account: HashMap<&str, Vec<&str>> = HashMap::new();

    for row in assignments {
        if seen.insert((row.account.as_str(), row.unit_id.as_str())) {
            units_by_account
                .entry(row.account.as_str())
                .or_default()
                .push(row.unit_id.as_str());
        }
    }

    let mut entries = Vec::new();
    for debt in debts {
        if let Some(units) = units_by_account.get(debt.account.as_str()) {
            for unit in units {
                entries.push(UniverseEntry {
                    account: debt.account.clone(),
                    document_id: debt.document_id.clone(),
                    unit_id: (*unit).to_string(),
                    due_date: debt.due_date,
                    amount_due: debt.amount_due,
                });
            }
        }
    }

    let stats = UniverseStats {
        assignments: assignments.len(),
        with_debt: entries.len(),
        manageable_pct: percentage(entries.len() as f64, assignments.len() as f64),
    };

    info!("Total assignments: {}", stats.assignments);
    info!("With current debt: {}", stats.with_debt);
    info!("Manageable universe: {:.1}%", stats.manageable_pct);

    ManageableUniverse { entries, stats }
}
