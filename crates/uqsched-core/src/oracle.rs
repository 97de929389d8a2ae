//! Interpolation oracles.
//!
//! An [`Oracle`] builds a surrogate of a vector-valued function on the unit
//! hypercube by asking for values at batches of nodes. Each batch comes with
//! an integer lattice index per coordinate so callers can key on exact
//! positions instead of floats.
//!
//! [`Grid`] is the reference oracle: full tensor grids on a nested dyadic
//! lattice, refined one level at a time with multilinear interpolation. A
//! full tensor grid grows as `(2^level + 1)^inputs`, so construction refuses
//! to start when the finest level would exceed the node budget.

use crate::config::InterpolationConfig;
use crate::error::{Error, Result};

/// Builds and evaluates surrogates through a batch callback.
pub trait Oracle {
    type Surrogate;

    /// Construct a surrogate of a function with `inputs` coordinates and
    /// `outputs` values per node.
    ///
    /// `callback(nodes, indices)` receives `inputs` values per node in both
    /// arrays and must return `outputs` values per node in the same order. An
    /// error from the callback aborts the construction and is returned as is.
    fn compute<F>(&self, inputs: usize, outputs: usize, callback: F) -> Result<Self::Surrogate>
    where
        F: FnMut(&[f64], &[u64]) -> Result<Vec<f64>>;

    /// Evaluate `surrogate` at `points` (`inputs` values each) without calling
    /// back. Returns `outputs` values per point.
    fn evaluate(&self, surrogate: &Self::Surrogate, points: &[f64]) -> Vec<f64>;
}

// ---------------------------------------------------------------------------
// Nested dyadic lattice
// ---------------------------------------------------------------------------

/// Points per dimension at `level`.
fn points(level: u32) -> usize {
    if level == 0 { 1 } else { (1 << level) + 1 }
}

/// Coordinate of position `j` at `level`.
fn coordinate(j: usize, level: u32) -> f64 {
    if level == 0 {
        0.5
    } else {
        j as f64 / (1u64 << level) as f64
    }
}

/// Whether position `j` at `level` already exists at `level - 1`.
fn inherited(j: usize, level: u32) -> bool {
    match level {
        0 => false,
        1 => j == 1,
        _ => j % 2 == 0,
    }
}

/// Position at `level` of position `j` at `level - 1`.
fn refine(j: usize, level: u32) -> usize {
    if level == 1 { 1 } else { 2 * j }
}

/// Nodes in an `inputs`-dimensional tensor with `n` positions per dimension,
/// or `None` if the count does not fit a `usize`.
fn tensor_size(inputs: usize, n: usize) -> Option<usize> {
    n.checked_pow(u32::try_from(inputs).ok()?)
}

/// Iterate the `total = n^inputs` multi-indices of a tensor with `n` positions
/// per dimension, last dimension fastest.
fn multi_indices(inputs: usize, n: usize, total: usize) -> impl Iterator<Item = Vec<usize>> {
    (0..total).map(move |mut flat| {
        let mut index = vec![0; inputs];
        for slot in index.iter_mut().rev() {
            *slot = flat % n;
            flat /= n;
        }
        index
    })
}

fn flatten(index: &[usize], n: usize) -> usize {
    index.iter().fold(0, |acc, &j| acc * n + j)
}

/// Multilinear interpolant on a full tensor grid.
#[derive(Debug, Clone)]
pub struct Surface {
    inputs: usize,
    outputs: usize,
    level: u32,
    /// `points(level)^inputs` rows of `outputs` values, row-major.
    values: Vec<f64>,
}

impl Surface {
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Finest completed level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Number of grid nodes backing the surface.
    pub fn nodes(&self) -> usize {
        self.values.len() / self.outputs.max(1)
    }

    fn interpolate(&self, point: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        let n = points(self.level);
        if n == 1 {
            out.copy_from_slice(&self.values[..self.outputs]);
            return;
        }
        let mut lower = vec![0usize; self.inputs];
        let mut weight = vec![0.0; self.inputs];
        for (d, &x) in point.iter().enumerate() {
            let t = x.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = (t.floor() as usize).min(n - 2);
            lower[d] = lo;
            weight[d] = t - lo as f64;
        }
        // 2^inputs corners; fewer than the n^inputs rows of `values`.
        let corners = 1usize << self.inputs;
        let mut corner = vec![0usize; self.inputs];
        for mask in 0..corners {
            let mut w = 1.0;
            for d in 0..self.inputs {
                let upper = (mask >> d) & 1 == 1;
                corner[d] = lower[d] + upper as usize;
                w *= if upper { weight[d] } else { 1.0 - weight[d] };
            }
            if w == 0.0 {
                continue;
            }
            let row = flatten(&corner, n) * self.outputs;
            for (o, &v) in out.iter_mut().zip(&self.values[row..row + self.outputs]) {
                *o += w * v;
            }
        }
    }
}

/// Node budget of a [`Grid`] unless configured otherwise.
pub const DEFAULT_MAX_NODES: usize = 1_000_000;

/// Reference oracle on nested full tensor grids.
#[derive(Debug, Clone)]
pub struct Grid {
    min_level: u32,
    max_level: u32,
    absolute_error: f64,
    max_nodes: usize,
}

impl Grid {
    pub fn new(min_level: u32, max_level: u32, absolute_error: f64) -> Result<Self> {
        if max_level == 0 || max_level > 20 {
            return Err(Error::config("maximum level must be in 1..=20"));
        }
        if min_level > max_level {
            return Err(Error::config(format!(
                "minimum level {min_level} exceeds maximum level {max_level}"
            )));
        }
        if absolute_error.is_nan() || absolute_error < 0.0 {
            return Err(Error::config("absolute error must be non-negative"));
        }
        Ok(Self {
            min_level,
            max_level,
            absolute_error,
            max_nodes: DEFAULT_MAX_NODES,
        })
    }

    /// Limit the finest tensor grid to `max_nodes` nodes.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn from_config(config: &InterpolationConfig) -> Result<Self> {
        if config.max_nodes == 0 {
            return Err(Error::config("node budget must be at least 1"));
        }
        Ok(Self::new(config.min_level, config.max_level, config.absolute_error)?
            .with_max_nodes(config.max_nodes))
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Nodes of the finest level for `inputs` dimensions, checked against the
    /// budget. Every coarser level is smaller.
    pub fn finest_nodes(&self, inputs: usize) -> Result<usize> {
        let n = points(self.max_level);
        match tensor_size(inputs, n) {
            Some(total) if total <= self.max_nodes => Ok(total),
            Some(total) => Err(Error::config(format!(
                "level {} needs {total} nodes in {inputs} dimensions, over the budget of {}",
                self.max_level, self.max_nodes
            ))),
            None => Err(Error::config(format!(
                "level {} needs {n}^{inputs} nodes, more than can be addressed",
                self.max_level
            ))),
        }
    }

    /// Lattice numerator of position `j` at `level` on the finest lattice.
    fn index(&self, j: usize, level: u32) -> u64 {
        if level == 0 {
            1 << (self.max_level - 1)
        } else {
            (j as u64) << (self.max_level - level)
        }
    }
}

impl Oracle for Grid {
    type Surrogate = Surface;

    fn compute<F>(&self, inputs: usize, outputs: usize, mut callback: F) -> Result<Surface>
    where
        F: FnMut(&[f64], &[u64]) -> Result<Vec<f64>>,
    {
        self.finest_nodes(inputs)?;
        let mut surface: Option<Surface> = None;
        for level in 0..=self.max_level {
            let n = points(level);
            // Bounded by the finest level, which passed the budget.
            let total = tensor_size(inputs, n).unwrap_or(0);
            let fresh: Vec<Vec<usize>> = multi_indices(inputs, n, total)
                .filter(|index| level == 0 || !index.iter().all(|&j| inherited(j, level)))
                .collect();

            let mut nodes = Vec::with_capacity(fresh.len() * inputs);
            let mut indices = Vec::with_capacity(fresh.len() * inputs);
            for index in &fresh {
                nodes.extend(index.iter().map(|&j| coordinate(j, level)));
                indices.extend(index.iter().map(|&j| self.index(j, level)));
            }

            let values = callback(&nodes, &indices)?;
            if values.len() != fresh.len() * outputs {
                return Err(Error::simulation(format!(
                    "callback returned {} values for {} nodes of {outputs} outputs",
                    values.len(),
                    fresh.len()
                )));
            }

            // Largest deviation of the new values from the coarser surface.
            let error = match &surface {
                Some(previous) => {
                    let predicted = self.evaluate(previous, &nodes);
                    predicted
                        .iter()
                        .zip(&values)
                        .map(|(p, v)| (p - v).abs())
                        .fold(0.0, f64::max)
                }
                None => f64::INFINITY,
            };

            // Assemble the finer tensor from inherited and new rows.
            let mut grid = vec![0.0; total * outputs];
            let mut rows = values.chunks_exact(outputs.max(1));
            for index in multi_indices(inputs, n, total) {
                let row = flatten(&index, n) * outputs;
                let inherited_row = level > 0 && index.iter().all(|&j| inherited(j, level));
                let source = if inherited_row {
                    let previous = surface.as_ref().ok_or_else(|| {
                        Error::numeric("refined level without a coarser surface")
                    })?;
                    let coarse: Vec<usize> = index
                        .iter()
                        .map(|&j| if level == 1 { 0 } else { j / 2 })
                        .collect();
                    debug_assert!(coarse.iter().zip(&index).all(|(&c, &j)| refine(c, level) == j));
                    let from = flatten(&coarse, points(level - 1)) * outputs;
                    &previous.values[from..from + outputs]
                } else {
                    rows.next().unwrap_or(&[])
                };
                grid[row..row + outputs].copy_from_slice(source);
            }
            surface = Some(Surface {
                inputs,
                outputs,
                level,
                values: grid,
            });

            log::debug!(
                "level {level}: {} new nodes, max deviation {error:.3e}",
                fresh.len()
            );
            if level >= self.min_level.max(1) && error <= self.absolute_error {
                break;
            }
        }
        surface.ok_or_else(|| Error::numeric("no interpolation level was built"))
    }

    fn evaluate(&self, surrogate: &Surface, points: &[f64]) -> Vec<f64> {
        let inputs = surrogate.inputs.max(1);
        let count = points.len() / inputs;
        let mut out = vec![0.0; count * surrogate.outputs];
        for (point, values) in points
            .chunks_exact(inputs)
            .zip(out.chunks_exact_mut(surrogate.outputs.max(1)))
        {
            surrogate.interpolate(point, values);
        }
        out
    }
}
