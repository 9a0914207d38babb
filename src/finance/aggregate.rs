use std::collections::{BTreeMap, HashMap};

use super::graph::{Edge, Entity, EntityId, EntityKind, FinanceGraph};
use super::parse::RawDisbursement;

struct CleanRow {
    committee_key: (String, String),
    payee_name: String,
    payee_kind: EntityKind,
    amount: f64,
    date: Option<String>,
    candidate: Option<(String, String, String)>,
    candidate_party: Option<String>,
}

#[derive(Default)]
struct EntityTable {
    entities: Vec<Entity>,
    index_by_name: HashMap<String, usize>,
}

impl EntityTable {
    fn upsert(&mut self, name: &str, kind: EntityKind, party: Option<String>) {
        if self.index_by_name.contains_key(name) {
            return;
        }

        let id = self.entities.len() as EntityId + 1;
        self.index_by_name.insert(name.to_owned(), self.entities.len());
        self.entities.push(Entity {
            id,
            name: name.to_owned(),
            kind,
            party_raw: party,
            total_in: 0.0,
            total_out: 0.0,
        });
    }

    fn id_of(&self, name: &str) -> Option<EntityId> {
        self.index_by_name
            .get(name)
            .map(|&index| self.entities[index].id)
    }
}

fn clean(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_owned()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    let value = clean(value);
    (!value.is_empty()).then_some(value)
}

/// Collapses a free-form party label to `D`/`R` where recognisable and keeps
/// anything else verbatim.
pub(super) fn normalize_party(raw: &str) -> String {
    let upper = raw.to_uppercase();
    if upper.contains("DEM") || upper == "D" {
        "D".to_owned()
    } else if upper.contains("REP") || upper == "R" {
        "R".to_owned()
    } else {
        raw.to_owned()
    }
}

fn payee_name(row: &RawDisbursement, is_org: bool) -> String {
    let last = clean(row.payee_last_name.as_deref());
    if is_org {
        return last;
    }

    let first = clean(row.payee_first_name.as_deref());
    let joined = format!("{first} {last}").trim().to_owned();
    if joined.is_empty() { last } else { joined }
}

fn clean_rows(rows: &[RawDisbursement]) -> Vec<CleanRow> {
    rows.iter()
        .filter_map(|row| {
            let amount = row
                .expenditure_amount
                .filter(|amount| amount.is_finite() && *amount != 0.0)?;
            let committee_name = non_blank(row.committee_name.as_deref())?;
            let is_org = row
                .entity_type
                .as_deref()
                .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("ORG"));
            let payee_name = payee_name(row, is_org);
            if payee_name.is_empty() {
                return None;
            }

            let candidate_party = non_blank(row.candidate_party.as_deref());
            let candidate = non_blank(row.candidate_name.as_deref()).map(|name| {
                (
                    clean(row.candidate_id.as_deref()),
                    name,
                    candidate_party.clone().unwrap_or_default(),
                )
            });

            Some(CleanRow {
                committee_key: (clean(row.committee_id.as_deref()), committee_name),
                payee_name,
                payee_kind: if is_org {
                    EntityKind::Company
                } else {
                    EntityKind::Person
                },
                amount,
                date: non_blank(row.expenditure_date.as_deref()),
                candidate,
                candidate_party,
            })
        })
        .collect()
}

/// Builds the entity/edge universe from raw committee disbursements.
///
/// Committees spend to payees; each (committee, payee) pair becomes one
/// `spends_to` edge carrying the summed amount and the date span.
pub(super) fn aggregate_disbursements(rows: &[RawDisbursement]) -> FinanceGraph {
    let rows = clean_rows(rows);
    let mut table = EntityTable::default();

    // A committee takes the first distinct candidate party found in its rows.
    let mut committees: BTreeMap<&(String, String), Option<&str>> = BTreeMap::new();
    for row in &rows {
        let party = committees.entry(&row.committee_key).or_default();
        if party.is_none() {
            *party = row.candidate_party.as_deref();
        }
    }
    for ((_id, name), party) in &committees {
        table.upsert(name, EntityKind::Committee, party.map(normalize_party));
    }

    let mut payees: BTreeMap<(&str, &str), ()> = BTreeMap::new();
    for row in &rows {
        payees.insert((row.payee_name.as_str(), row.payee_kind.label()), ());
    }
    for (name, kind) in payees.keys() {
        table.upsert(name, EntityKind::from_raw(Some(*kind)), None);
    }

    let mut candidates: BTreeMap<&(String, String, String), ()> = BTreeMap::new();
    for row in &rows {
        if let Some(candidate) = &row.candidate {
            candidates.insert(candidate, ());
        }
    }
    for (_id, name, party) in candidates.keys() {
        let party = (!party.is_empty()).then(|| normalize_party(party));
        table.upsert(name, EntityKind::Candidate, party);
    }

    struct Spend {
        amount: f64,
        first_date: Option<String>,
        last_date: Option<String>,
    }

    let mut spends: BTreeMap<(&str, &str), Spend> = BTreeMap::new();
    for row in &rows {
        let spend = spends
            .entry((row.committee_key.1.as_str(), row.payee_name.as_str()))
            .or_insert(Spend {
                amount: 0.0,
                first_date: None,
                last_date: None,
            });
        spend.amount += row.amount;
        if let Some(date) = &row.date {
            if spend.first_date.as_ref().is_none_or(|first| date < first) {
                spend.first_date = Some(date.clone());
            }
            if spend.last_date.as_ref().is_none_or(|last| date > last) {
                spend.last_date = Some(date.clone());
            }
        }
    }

    let mut edges = Vec::with_capacity(spends.len());
    for ((committee, payee), spend) in spends {
        let (Some(source), Some(target)) = (table.id_of(committee), table.id_of(payee)) else {
            continue;
        };

        edges.push(Edge {
            id: edges.len() as i64 + 1,
            source,
            target,
            amount: spend.amount,
            relation_type: Some("spends_to".to_owned()),
            first_date: spend.first_date,
            last_date: spend.last_date,
        });
    }

    let totals = FinanceGraph::flow_totals(&edges);
    let mut entities = table.entities;
    for entity in &mut entities {
        if let Some(&(total_in, total_out)) = totals.get(&entity.id) {
            entity.total_in = total_in;
            entity.total_out = total_out;
        }
    }

    FinanceGraph { entities, edges }
}
