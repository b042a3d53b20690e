use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::{ImportError, Netlist};

/// Orders the modules of a design by instantiation: every module appears after the modules it
/// instantiates, so the top module (the unique module never instantiated) comes last.
///
/// The graph carries an artificial sink every module points at, which keeps modules with no
/// instantiation relation ranked; the sink is removed from the returned order.
pub fn instantiation_order(netlist: &Netlist) -> Result<Vec<String>, ImportError> {
    let index: IndexMap<&str, usize> =
        netlist.modules.keys().enumerate().map(|(position, name)| (name.as_str(), position)).collect();
    let sink = netlist.modules.len();

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    graph.add_node(sink);
    for (position, (name, module)) in netlist.modules.iter().enumerate() {
        graph.add_node(position);
        graph.add_edge(position, sink, ());
        for cell in module.cells.values() {
            if let Some(&child) = index.get(cell.kind.as_str()) {
                if child == position {
                    return Err(ImportError::HierarchyCycle { module: name.clone() });
                }
                graph.add_edge(child, position, ());
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        let position = cycle.node_id();
        let module = netlist.modules.get_index(position).map(|(name, _)| name.clone()).unwrap_or_default();
        ImportError::HierarchyCycle { module }
    })?;

    Ok(order
        .into_iter()
        .filter(|&position| position != sink)
        .map(|position| netlist.modules.get_index(position).unwrap().0.clone())
        .collect())
}
