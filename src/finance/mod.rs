mod aggregate;
mod extract;
mod graph;
mod load;
mod parse;
mod party;

pub use extract::{Subgraph, extract};
pub use graph::{Edge, Entity, EntityId, EntityKind, FinanceGraph};
pub use load::load_finance_graph;
pub use party::Party;

#[cfg(test)]
pub(crate) use graph::entity;
#[cfg(test)]
pub(crate) use load::parse_finance_graph;
