use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, kosaraju_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::document::ModelSet;
use crate::validation::ValidationError;

/// `subClassOf` edges across a model set, child → parent
pub struct InheritanceGraph<'a> {
    /// The directed graph of inheritance edges
    graph: DiGraph<&'a str, ()>,
    /// Map from model id to graph node index
    node_map: HashMap<&'a str, NodeIndex>,
}

impl<'a> InheritanceGraph<'a> {
    /// Build the graph. Parents outside the set get no node; the reference pass
    /// reports them.
    pub fn new(set: &ModelSet<'a>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for id in set.ids() {
            node_map.insert(id, graph.add_node(id));
        }

        for model in set.iter() {
            if let (Some(id), Some(parent)) = (model.id(), model.sub_class_of())
                && let Some(&parent_node) = node_map.get(parent)
            {
                graph.add_edge(node_map[id], parent_node, ());
            }
        }

        Self { graph, node_map }
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    pub fn parent(&self, id: &str) -> Option<&'a str> {
        let node = *self.node_map.get(id)?;
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .map(|parent| self.graph[parent])
    }

    /// Every inheritance cycle, each starting and ending at its smallest id
    pub fn find_cycles(&self) -> Vec<Vec<&'a str>> {
        let mut cycles: Vec<Vec<&'a str>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .filter_map(|scc| {
                let start = scc.iter().map(|&node| self.graph[node]).min()?;
                Some(self.cycle_from(start))
            })
            .collect();

        cycles.sort();
        cycles
    }

    // A model has a single parent, so a strongly connected component is one simple loop
    fn cycle_from(&self, start: &'a str) -> Vec<&'a str> {
        let mut path = vec![start];
        let mut current = self.parent(start);
        while let Some(id) = current {
            path.push(id);
            if id == start || path.len() > self.node_map.len() {
                break;
            }
            current = self.parent(id);
        }
        path
    }

    /// Fail with one error per cycle
    pub fn check(&self) -> Result<(), ValidationError> {
        if !self.has_cycles() {
            return Ok(());
        }

        let errors = self
            .find_cycles()
            .into_iter()
            .map(|cycle| {
                ValidationError::consistency(format!("cyclic inheritance: {}", cycle.join(" -> ")))
            })
            .collect();

        match ValidationError::from_many(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
