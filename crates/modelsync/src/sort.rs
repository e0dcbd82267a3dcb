//! Dependency-first ordering of discovered entities.
//!
//! Depth-first insertion: each entity's not-yet-placed dependencies are
//! placed first, then the entity itself. Dependency names outside the
//! discovered set are skipped. A back-edge to an entity still on the
//! recursion stack is a cycle: it is warned about once and not enforced;
//! the sort always terminates. Ties among independent entities follow
//! discovery order.

use crate::registry::EntityDescriptor;
use std::collections::HashMap;
use tracing::warn;

///
/// CycleEdge
///
/// One detected back-edge: `from` declared a dependency on `to` while `to`
/// was an ancestor in the traversal.
///

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
}

///
/// SortOutcome
///

#[derive(Debug)]
pub struct SortOutcome {
    /// All input entities, each exactly once, dependencies first where no
    /// cycle is involved.
    pub entities: Vec<EntityDescriptor>,
    /// Back-edges detected during the walk, first-seen order.
    pub cycles: Vec<CycleEdge>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Reorder entities so dependencies precede dependents.
#[must_use]
pub fn sort_by_dependency(entities: Vec<EntityDescriptor>) -> SortOutcome {
    let positions: HashMap<&str, usize> = entities
        .iter()
        .enumerate()
        .map(|(position, entity)| (entity.name.as_str(), position))
        .collect();

    let mut marks = vec![Mark::Unvisited; entities.len()];
    let mut order = Vec::with_capacity(entities.len());
    let mut cycles = Vec::new();

    for start in 0..entities.len() {
        if marks[start] == Mark::Unvisited {
            visit(start, &entities, &positions, &mut marks, &mut order, &mut cycles);
        }
    }

    let mut slots: Vec<Option<EntityDescriptor>> = entities.into_iter().map(Some).collect();
    let entities = order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect();

    SortOutcome { entities, cycles }
}

fn visit(
    current: usize,
    entities: &[EntityDescriptor],
    positions: &HashMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    cycles: &mut Vec<CycleEdge>,
) {
    marks[current] = Mark::InProgress;

    for dependency in &entities[current].config.dependencies {
        // Dependencies on entities outside the discovered set are ignored.
        let Some(&target) = positions.get(dependency.entity_name.as_str()) else {
            continue;
        };

        match marks[target] {
            Mark::Unvisited => visit(target, entities, positions, marks, order, cycles),
            Mark::InProgress => {
                warn!(
                    from = %entities[current].name,
                    to = %entities[target].name,
                    "dependency cycle detected; proceeding without enforcing this edge"
                );
                cycles.push(CycleEdge {
                    from: entities[current].name.clone(),
                    to: entities[target].name.clone(),
                });
            }
            Mark::Done => {}
        }
    }

    marks[current] = Mark::Done;
    order.push(current);
}
