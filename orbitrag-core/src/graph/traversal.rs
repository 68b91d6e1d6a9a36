//! Breadth-first k-hop traversal.
//!
//! Edges are followed in both directions. Traversal is level-synchronous: all
//! entities at hop `d` are discovered before any at hop `d + 1`, and within a
//! level an entity reachable over several edges keeps the path with the highest
//! confidence product. Results are ordered by (hop, id), so the output does not
//! depend on the order in which entities and relations were merged.

use std::collections::{BTreeMap, HashSet};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::KnowledgeGraph;
use crate::core::{Entity, EntityId, Relation, Result};

/// One entity reached by a traversal
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    /// The reached entity
    pub entity: Entity,
    /// Number of edges from the start
    pub depth: usize,
    /// Edge through which the entity was discovered
    pub via: Relation,
    /// Product of edge confidences along the discovering path
    pub path_confidence: f32,
}

struct Discovery {
    node: NodeIndex,
    edge: EdgeIndex,
    path_confidence: f32,
}

impl KnowledgeGraph {
    /// Entities within `max_hops` of `entity_id`, following edges in both directions.
    ///
    /// The start entity is excluded and every entity appears once, ordered by
    /// (hop, id). `relation_types` restricts which edges are followed. Fails with
    /// `NotFound` if `entity_id` is absent.
    pub fn neighbors(
        &self,
        entity_id: &EntityId,
        max_hops: usize,
        relation_types: Option<&[&str]>,
    ) -> Result<Vec<Entity>> {
        Ok(self
            .traverse(entity_id, max_hops, relation_types)?
            .into_iter()
            .map(|hop| hop.entity)
            .collect())
    }

    /// Like [`neighbors`](Self::neighbors), keeping depth and path details
    pub fn traverse(
        &self,
        entity_id: &EntityId,
        max_hops: usize,
        relation_types: Option<&[&str]>,
    ) -> Result<Vec<Hop>> {
        let start = self.node(entity_id)?;
        let graph = self.graph();

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut frontier: Vec<(NodeIndex, f32)> = vec![(start, 1.0)];
        let mut hops = Vec::new();

        for depth in 1..=max_hops {
            let mut level: BTreeMap<EntityId, Discovery> = BTreeMap::new();

            for &(node, confidence) in &frontier {
                let edges = graph
                    .edges_directed(node, Direction::Outgoing)
                    .chain(graph.edges_directed(node, Direction::Incoming));

                for edge in edges {
                    let relation = edge.weight();
                    if let Some(allowed) = relation_types {
                        if !allowed.contains(&relation.relation_type.as_str()) {
                            continue;
                        }
                    }
                    let other = if edge.source() == node { edge.target() } else { edge.source() };
                    if visited.contains(&other) {
                        continue;
                    }

                    let path_confidence = confidence * relation.confidence;
                    let discovery = Discovery {
                        node: other,
                        edge: edge.id(),
                        path_confidence,
                    };
                    let id = graph[other].id.clone();
                    match level.get(&id) {
                        Some(existing) if !prefer(graph, &discovery, existing) => {},
                        _ => {
                            level.insert(id, discovery);
                        },
                    }
                }
            }

            if level.is_empty() {
                break;
            }

            frontier = Vec::with_capacity(level.len());
            for discovery in level.into_values() {
                visited.insert(discovery.node);
                frontier.push((discovery.node, discovery.path_confidence));
                hops.push(Hop {
                    entity: graph[discovery.node].clone(),
                    depth,
                    via: graph[discovery.edge].clone(),
                    path_confidence: discovery.path_confidence,
                });
            }
        }

        tracing::debug!(
            start = %entity_id,
            max_hops,
            reached = hops.len(),
            "graph traversal finished"
        );
        Ok(hops)
    }
}

/// Higher path confidence wins; ties go to the smaller relation key
fn prefer(
    graph: &petgraph::Graph<Entity, Relation>,
    candidate: &Discovery,
    existing: &Discovery,
) -> bool {
    if candidate.path_confidence != existing.path_confidence {
        return candidate.path_confidence > existing.path_confidence;
    }
    graph[candidate.edge].key() < graph[existing.edge].key()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityCandidate, EntityType, OrbitRagError, RelationCandidate, SourceRef};

    fn link(graph: &mut KnowledgeGraph, from: (&str, EntityType), rel: &str, to: (&str, EntityType), confidence: f32) {
        let doc = SourceRef::new("doc");
        graph.upsert_relation(&RelationCandidate::new(
            EntityCandidate::new(from.0, from.1, doc.clone()),
            EntityCandidate::new(to.0, to.1, doc.clone()),
            rel,
            confidence,
            doc,
        ));
    }

    fn names(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.name.as_str()).collect()
    }

    const A: (&str, EntityType) = ("OCEANSAT-2", EntityType::Satellite);
    const B: (&str, EntityType) = ("OCM", EntityType::Instrument);
    const C: (&str, EntityType) = ("Oceansat Programme", EntityType::Mission);

    #[test]
    fn two_hop_chain() {
        let mut graph = KnowledgeGraph::new();
        link(&mut graph, A, "carries", B, 0.9);
        link(&mut graph, B, "part_of", C, 0.8);
        let a = EntityId::for_entity(A.0, A.1);

        assert_eq!(names(&graph.neighbors(&a, 2, None).unwrap()), vec!["OCM", "Oceansat Programme"]);
        assert_eq!(names(&graph.neighbors(&a, 1, None).unwrap()), vec!["OCM"]);
        assert!(graph.neighbors(&a, 0, None).unwrap().is_empty());
    }

    #[test]
    fn incoming_edges_are_followed() {
        let mut graph = KnowledgeGraph::new();
        link(&mut graph, A, "carries", B, 0.9);
        link(&mut graph, B, "part_of", C, 0.8);
        let c = EntityId::for_entity(C.0, C.1);
        assert_eq!(names(&graph.neighbors(&c, 2, None).unwrap()), vec!["OCM", "OCEANSAT-2"]);
    }

    #[test]
    fn relation_filter_limits_expansion() {
        let mut graph = KnowledgeGraph::new();
        link(&mut graph, A, "carries", B, 0.9);
        link(&mut graph, B, "part_of", C, 0.8);
        let a = EntityId::for_entity(A.0, A.1);
        let only_carries = graph.neighbors(&a, 2, Some(&["carries"])).unwrap();
        assert_eq!(names(&only_carries), vec!["OCM"]);
    }

    #[test]
    fn cycles_terminate_and_exclude_start() {
        let mut graph = KnowledgeGraph::new();
        link(&mut graph, A, "carries", B, 0.9);
        link(&mut graph, B, "part_of", C, 0.8);
        link(&mut graph, C, "operates", A, 0.7);
        let a = EntityId::for_entity(A.0, A.1);
        let reached = graph.neighbors(&a, 5, None).unwrap();
        assert_eq!(reached.len(), 2);
        assert!(reached.iter().all(|e| e.id != a));
    }

    #[test]
    fn path_confidence_keeps_the_strongest_route() {
        let mut graph = KnowledgeGraph::new();
        let d = ("SST", EntityType::DataProduct);
        link(&mut graph, A, "carries", B, 0.5);
        link(&mut graph, A, "generates", C, 0.9);
        link(&mut graph, B, "measures", d, 1.0);
        link(&mut graph, C, "part_of", d, 0.9);

        let a = EntityId::for_entity(A.0, A.1);
        let hops = graph.traverse(&a, 2, None).unwrap();
        let sst = hops.iter().find(|h| h.entity.name == "SST").unwrap();
        assert_eq!(sst.depth, 2);
        assert!((sst.path_confidence - 0.81).abs() < 1e-6);
        assert_eq!(sst.via.relation_type, "part_of");
    }

    #[test]
    fn missing_start_is_not_found() {
        let graph = KnowledgeGraph::new();
        let err = graph.neighbors(&EntityId::from("satellite:none"), 2, None).unwrap_err();
        assert!(matches!(err, OrbitRagError::NotFound { .. }));
    }
}
