pub mod neo4j;
pub mod statements;

pub use neo4j::Neo4jStore;
