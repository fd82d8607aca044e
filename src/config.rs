use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::network::Topology;
use crate::protocol::EngineKind;
use crate::simulation::{DeliveryOrder, Simulation};
use crate::types::{Cost, NodeId};

/// A simulation run as described in a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub engine: EngineKind,
    #[serde(default)]
    pub delivery: DeliveryOrder,
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: usize,
    /// Extra nodes with no initial links. Nodes named in `links` are added automatically.
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkConfig>,
    /// Applied one at a time once the initial topology has converged.
    #[serde(default)]
    pub changes: Vec<LinkConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: NodeId,
    pub b: NodeId,
    /// Missing means the link is down.
    #[serde(default)]
    pub cost: Option<Cost>,
}

fn default_max_deliveries() -> usize {
    100_000
}

impl LinkConfig {
    pub fn cost(&self) -> Cost {
        self.cost.unwrap_or(Cost::INFINITY)
    }
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading simulation config {}", path.display()))?;
        let config: SimulationConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing simulation config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_deliveries == 0 {
            bail!("max_deliveries must be positive");
        }
        let known = self.topology()?;
        for change in &self.changes {
            if !known.contains(change.a) || !known.contains(change.b) {
                bail!("change {}-{} names a node that is not in the topology", change.a, change.b);
            }
            if change.a == change.b {
                bail!("change {}-{} is a self-loop", change.a, change.b);
            }
        }
        Ok(())
    }

    /// Initial topology: every listed node plus both ends of every link.
    pub fn topology(&self) -> Result<Topology> {
        let mut topology = Topology::with_nodes(self.nodes.iter().copied());
        for link in &self.links {
            topology.add_node(link.a);
            topology.add_node(link.b);
        }
        for link in &self.links {
            topology
                .set_link_cost(link.a, link.b, link.cost())
                .with_context(|| format!("invalid link {}-{}", link.a, link.b))?;
        }
        Ok(topology)
    }

    pub fn build(&self) -> Result<Simulation> {
        Ok(Simulation::new(self.topology()?, self.engine, self.delivery)?)
    }
}
