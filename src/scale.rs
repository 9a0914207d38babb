use eframe::egui::Color32;

use crate::finance::{EntityKind, Party, Subgraph};

pub const RADIUS_RANGE: (f32, f32) = (5.0, 40.0);
pub const STROKE_RANGE: (f32, f32) = (1.0, 6.0);

/// Square-root scale over `[1, domain_max]`, so that circle area rather than
/// radius grows linearly with the input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SqrtScale {
    domain_max: f64,
    range: (f32, f32),
}

impl SqrtScale {
    pub fn new(domain_max: f64, range: (f32, f32)) -> Self {
        let domain_max = if domain_max.is_finite() {
            domain_max.max(1.0)
        } else {
            1.0
        };
        Self { domain_max, range }
    }

    #[cfg(test)]
    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    /// Inputs outside the domain, including non-finite ones, are clamped.
    pub fn map(&self, value: f64) -> f32 {
        let (start, end) = self.range;
        let value = if value.is_finite() { value } else { 1.0 };
        if value <= 1.0 || self.domain_max <= 1.0 {
            return start;
        }
        if value >= self.domain_max {
            return end;
        }

        let t = (value.sqrt() - 1.0) / (self.domain_max.sqrt() - 1.0);
        start + ((end - start) * t as f32)
    }
}

/// Radius and stroke scales for one extracted node/edge set. Rebuilt together
/// with the subgraph; never carried over to a different one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphScales {
    pub radius: SqrtScale,
    pub amount: SqrtScale,
}

impl GraphScales {
    pub fn for_subgraph(subgraph: &Subgraph) -> Self {
        let max_value = subgraph
            .nodes
            .iter()
            .map(|node| node.value())
            .fold(1.0_f64, f64::max);
        let max_amount = subgraph
            .edges
            .iter()
            .map(|edge| edge.weight().max(1.0))
            .fold(1.0_f64, f64::max);

        Self {
            radius: SqrtScale::new(max_value, RADIUS_RANGE),
            amount: SqrtScale::new(max_amount, STROKE_RANGE),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    EntityType,
    Party,
}

impl ColorMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::EntityType => "Entity type",
            Self::Party => "Party",
        }
    }
}

const REPUBLICAN_RED: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
const DEMOCRATIC_BLUE: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
const UNAFFILIATED_GRAY: Color32 = Color32::from_rgb(0x9c, 0xa3, 0xaf);
const CANDIDATE_BLUE: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
const COMMITTEE_ORANGE: Color32 = Color32::from_rgb(0xf9, 0x73, 0x16);
const COMPANY_GREEN: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
const PERSON_PURPLE: Color32 = Color32::from_rgb(0xa8, 0x55, 0xf7);

pub fn node_color(kind: EntityKind, party: Option<Party>, mode: ColorMode) -> Color32 {
    match mode {
        ColorMode::Party => match party {
            Some(Party::Republican) => REPUBLICAN_RED,
            Some(Party::Democratic) => DEMOCRATIC_BLUE,
            None => UNAFFILIATED_GRAY,
        },
        ColorMode::EntityType => match kind {
            EntityKind::Candidate => CANDIDATE_BLUE,
            EntityKind::Committee => COMMITTEE_ORANGE,
            EntityKind::Company => COMPANY_GREEN,
            EntityKind::Person | EntityKind::Unknown => PERSON_PURPLE,
        },
    }
}
