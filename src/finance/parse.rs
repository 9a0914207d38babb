use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawEntity {
    pub(super) id: i64,
    #[serde(default)]
    pub(super) name: String,
    #[serde(default, rename = "type")]
    pub(super) kind: Option<String>,
    #[serde(default)]
    pub(super) party: Option<String>,
    #[serde(default)]
    pub(super) total_in: Option<f64>,
    #[serde(default)]
    pub(super) total_out: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawEdge {
    pub(super) id: i64,
    pub(super) source: i64,
    pub(super) target: i64,
    #[serde(default, alias = "total_amount")]
    pub(super) amount: f64,
    #[serde(default)]
    pub(super) relation_type: Option<String>,
    #[serde(default)]
    pub(super) first_date: Option<String>,
    #[serde(default)]
    pub(super) last_date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(super) struct RawDisbursement {
    #[serde(default)]
    pub(super) committee_id: Option<String>,
    #[serde(default)]
    pub(super) committee_name: Option<String>,
    #[serde(default)]
    pub(super) expenditure_amount: Option<f64>,
    #[serde(default)]
    pub(super) expenditure_date: Option<String>,
    #[serde(default)]
    pub(super) payee_first_name: Option<String>,
    #[serde(default)]
    pub(super) payee_last_name: Option<String>,
    #[serde(default)]
    pub(super) entity_type: Option<String>,
    #[serde(default)]
    pub(super) candidate_id: Option<String>,
    #[serde(default)]
    pub(super) candidate_name: Option<String>,
    #[serde(default)]
    pub(super) candidate_party: Option<String>,
}

pub(super) enum RawDocument {
    Graph {
        entities: Vec<RawEntity>,
        edges: Vec<RawEdge>,
    },
    Disbursements(Vec<RawDisbursement>),
}

pub(super) fn parse_document(raw: &str) -> Result<RawDocument> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in data file")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("data file must contain a JSON object"))?;

    if let Some(rows) = object.get("disbursements") {
        let rows = Vec::<RawDisbursement>::deserialize(rows)
            .context("invalid disbursements array in data file")?;
        return Ok(RawDocument::Disbursements(rows));
    }

    let entities = match object.get("entities").or_else(|| object.get("nodes")) {
        Some(value) => {
            Vec::<RawEntity>::deserialize(value).context("invalid entities array in data file")?
        }
        None => return Err(anyhow!("data file has neither `entities` nor `disbursements`")),
    };

    let edges = match object.get("edges").or_else(|| object.get("links")) {
        Some(value) => {
            Vec::<RawEdge>::deserialize(value).context("invalid edges array in data file")?
        }
        None => Vec::new(),
    };

    Ok(RawDocument::Graph { entities, edges })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_graph_documents_with_link_aliases() {
        let raw = r#"{
            "nodes": [{"id": 1, "name": "A", "type": "pac", "total_in": null}],
            "links": [{"id": 3, "source": 1, "target": 1, "total_amount": 12.5}]
        }"#;
        let Ok(RawDocument::Graph { entities, edges }) = parse_document(raw) else {
            panic!("expected graph document");
        };
        assert_eq!(entities[0].kind.as_deref(), Some("pac"));
        assert_eq!(entities[0].total_in, None);
        assert_eq!(edges[0].amount, 12.5);
    }

    #[test]
    fn parses_disbursement_documents() {
        let raw = r#"{"disbursements": [{"committee_name": "C", "expenditure_amount": 4.0}]}"#;
        let Ok(RawDocument::Disbursements(rows)) = parse_document(raw) else {
            panic!("expected disbursement document");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].expenditure_amount, Some(4.0));
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(parse_document("[]").is_err());
        assert!(parse_document(r#"{"rows": []}"#).is_err());
        assert!(parse_document("{").is_err());
    }
}
