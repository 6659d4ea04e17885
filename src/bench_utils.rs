use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::attribute::{AttributeValue, type_names};
use crate::errors::GraphError;
use crate::graph::{ElementId, ElementKind, GraphStore};

/// One synthetic transaction: (source index, destination index, directed, weight).
pub type SyntheticTransaction = (usize, usize, bool, f64);

#[derive(Clone, Debug)]
pub struct GraphDataset {
    pub labels: Vec<String>,
    pub transactions: Vec<SyntheticTransaction>,
}

impl GraphDataset {
    pub fn vertices(&self) -> usize {
        self.labels.len()
    }

    pub fn transactions(&self) -> usize {
        self.transactions.len()
    }

    /// Vertex index with the most incident transactions.
    pub fn hub_index(&self) -> usize {
        let mut degrees = vec![0usize; self.labels.len()];
        for &(from, to, _, _) in &self.transactions {
            degrees[from] += 1;
            degrees[to] += 1;
        }
        let mut best = (0usize, 0usize);
        for (idx, deg) in degrees.into_iter().enumerate() {
            if deg > best.0 {
                best = (deg, idx);
            }
        }
        best.1
    }
}

#[derive(Clone, Debug)]
pub enum GraphShape {
    Line,
    Star,
    Grid2D { width: usize, height: usize },
    /// Uniformly random endpoints; parallel transactions allowed.
    Random { transactions: usize },
}

pub fn generate_graph(shape: GraphShape, vertex_count: usize, seed: u64) -> GraphDataset {
    assert!(vertex_count > 1, "vertex_count must exceed 1");
    let mut rng = StdRng::seed_from_u64(seed);
    let pairs: Vec<(usize, usize)> = match shape {
        GraphShape::Line => (0..vertex_count - 1).map(|idx| (idx, idx + 1)).collect(),
        GraphShape::Star => (1..vertex_count).map(|leaf| (0, leaf)).collect(),
        GraphShape::Grid2D { width, height } => grid_pairs(width, height, vertex_count),
        GraphShape::Random { transactions } => (0..transactions)
            .map(|_| {
                (
                    rng.gen_range(0..vertex_count),
                    rng.gen_range(0..vertex_count),
                )
            })
            .collect(),
    };
    let transactions = pairs
        .into_iter()
        .map(|(from, to)| (from, to, rng.gen_bool(0.7), rng.gen_range(0.0..100.0)))
        .collect();
    let labels = (0..vertex_count).map(|idx| format!("Vertex{idx}")).collect();
    GraphDataset {
        labels,
        transactions,
    }
}

fn grid_pairs(width: usize, height: usize, vertex_count: usize) -> Vec<(usize, usize)> {
    assert_eq!(
        width * height,
        vertex_count,
        "grid dimensions must match vertex count"
    );
    let mut pairs = Vec::with_capacity(width * height * 2);
    for y in 0..height {
        for x in 0..width {
            let base = y * width + x;
            if x + 1 < width {
                pairs.push((base, base + 1));
            }
            if y + 1 < height {
                pairs.push((base, base + width));
            }
        }
    }
    pairs
}

/// Load a dataset into `store` with a `Label` vertex attribute and a
/// `weight` transaction attribute. Returns the vertex ids by index.
pub fn populate_store(dataset: &GraphDataset, store: &mut GraphStore) -> Result<Vec<ElementId>, GraphError> {
    let label = store.ensure_attribute(
        ElementKind::Vertex,
        "Label",
        type_names::STRING,
        AttributeValue::Null,
    )?;
    let weight = store.ensure_attribute(ElementKind::Transaction, "weight", type_names::DOUBLE, 0.0)?;
    let mut ids = Vec::with_capacity(dataset.vertices());
    for name in &dataset.labels {
        let id = store.add_vertex();
        store.set(label, id, name.as_str())?;
        ids.push(id);
    }
    for &(from, to, directed, w) in &dataset.transactions {
        let tx = store.add_transaction(ids[from], ids[to], directed)?;
        store.set(weight, tx, w)?;
    }
    Ok(ids)
}
