use std::collections::HashMap;

use super::party::{Party, classify_party};

pub type EntityId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Candidate,
    Committee,
    Company,
    Person,
    Unknown,
}

impl EntityKind {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("candidate") => Self::Candidate,
            Some("committee" | "pac") => Self::Committee,
            Some("company" | "corp") => Self::Company,
            Some("person") => Self::Person,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Committee => "committee",
            Self::Company => "company",
            Self::Person => "person",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub party_raw: Option<String>,
    pub total_in: f64,
    pub total_out: f64,
}

impl Entity {
    pub fn party(&self) -> Option<Party> {
        self.party_raw.as_deref().and_then(classify_party)
    }

    /// Ranking weight used by extraction. Negative or NaN totals count as zero.
    pub fn flow(&self) -> f64 {
        non_negative(self.total_in) + non_negative(self.total_out)
    }

    /// Simulation mass and radius input, floored at 1.
    pub fn value(&self) -> f64 {
        self.flow().max(1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: i64,
    pub source: EntityId,
    pub target: EntityId,
    pub amount: f64,
    pub relation_type: Option<String>,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

impl Edge {
    #[cfg(test)]
    pub fn new(id: i64, source: EntityId, target: EntityId, amount: f64) -> Self {
        Self {
            id,
            source,
            target,
            amount,
            relation_type: None,
            first_date: None,
            last_date: None,
        }
    }

    pub fn weight(&self) -> f64 {
        non_negative(self.amount)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FinanceGraph {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
}

impl FinanceGraph {
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sums incoming and outgoing edge amounts per entity id.
    pub fn flow_totals(edges: &[Edge]) -> HashMap<EntityId, (f64, f64)> {
        let mut totals: HashMap<EntityId, (f64, f64)> = HashMap::new();
        for edge in edges {
            let amount = edge.weight();
            totals.entry(edge.target).or_default().0 += amount;
            totals.entry(edge.source).or_default().1 += amount;
        }
        totals
    }
}

pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
pub(crate) fn entity(id: EntityId, total_in: f64, total_out: f64) -> Entity {
    Entity {
        id,
        name: format!("entity {id}"),
        kind: EntityKind::Unknown,
        party_raw: None,
        total_in,
        total_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_accepts_aliases() {
        assert_eq!(EntityKind::from_raw(Some("PAC")), EntityKind::Committee);
        assert_eq!(EntityKind::from_raw(Some(" corp ")), EntityKind::Company);
        assert_eq!(EntityKind::from_raw(Some("Candidate")), EntityKind::Candidate);
        assert_eq!(EntityKind::from_raw(Some("trust")), EntityKind::Unknown);
        assert_eq!(EntityKind::from_raw(None), EntityKind::Unknown);
    }

    #[test]
    fn value_is_floored_at_one() {
        assert_eq!(entity(1, 0.0, 0.0).value(), 1.0);
        assert_eq!(entity(1, -40.0, f64::NAN).value(), 1.0);
        assert_eq!(entity(1, 100.0, 50.0).value(), 150.0);
    }

    #[test]
    fn flow_totals_split_in_and_out() {
        let edges = vec![Edge::new(1, 1, 2, 10.0), Edge::new(2, 3, 2, 5.0)];
        let totals = FinanceGraph::flow_totals(&edges);
        assert_eq!(totals[&2], (15.0, 0.0));
        assert_eq!(totals[&1], (0.0, 10.0));
        assert_eq!(totals[&3], (0.0, 5.0));
    }
}
