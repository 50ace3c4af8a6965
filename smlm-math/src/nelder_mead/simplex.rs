//! Simplex bookkeeping: vertices, cached objective values and ranking.

/// Indices of the vertices that drive one Nelder-Mead step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Ranking {
    /// Vertex with the lowest objective value
    pub best: usize,
    /// Vertex with the highest objective value
    pub worst: usize,
    /// Highest vertex once `worst` is set aside
    pub second_worst: usize,
}

/// N+1 vertices in N-dimensional space with one cached value per vertex.
///
/// Both vectors always hold exactly N+1 entries.
#[derive(Debug, Clone)]
pub(super) struct Simplex<const N: usize> {
    vertices: Vec<[f64; N]>,
    values: Vec<f64>,
}

impl<const N: usize> Simplex<N> {
    /// Build the initial simplex: vertex 0 is `start`, vertex i+1 is `start`
    /// displaced by `steps[i]` along axis i.
    pub fn new<F>(start: [f64; N], steps: [f64; N], eval: &mut F) -> Self
    where
        F: FnMut(&[f64; N]) -> f64,
    {
        let mut vertices = Vec::with_capacity(N + 1);
        vertices.push(start);
        for (axis, step) in steps.iter().enumerate() {
            let mut vertex = start;
            vertex[axis] += step;
            vertices.push(vertex);
        }

        let values = vertices.iter().map(|v| eval(v)).collect();
        Self { vertices, values }
    }

    pub fn vertex(&self, index: usize) -> &[f64; N] {
        &self.vertices[index]
    }

    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Find best, worst and second-worst vertices.
    ///
    /// Ties go to the lowest index: the first vertex holding the extreme value wins.
    pub fn rank(&self) -> Ranking {
        let mut best = 0;
        for i in 1..self.values.len() {
            if self.values[i] < self.values[best] {
                best = i;
            }
        }

        let worst = self.highest_excluding(best);
        let second_worst = self.highest_excluding(worst);

        Ranking {
            best,
            worst,
            second_worst,
        }
    }

    fn highest_excluding(&self, excluded: usize) -> usize {
        let mut highest: Option<usize> = None;
        for i in 0..self.values.len() {
            if i == excluded {
                continue;
            }
            match highest {
                Some(h) if self.values[i] <= self.values[h] => {}
                _ => highest = Some(i),
            }
        }
        highest.unwrap_or(excluded)
    }

    /// Largest extent of the simplex along any single axis.
    pub fn max_spread(&self) -> f64 {
        (0..N)
            .map(|axis| {
                let (lo, hi) = self
                    .vertices
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v[axis]), hi.max(v[axis]))
                    });
                hi - lo
            })
            .fold(0.0, f64::max)
    }

    /// Centroid of every vertex except `excluded`.
    pub fn centroid_excluding(&self, excluded: usize) -> [f64; N] {
        let mut centroid = [0.0; N];
        for (i, vertex) in self.vertices.iter().enumerate() {
            if i == excluded {
                continue;
            }
            for axis in 0..N {
                centroid[axis] += vertex[axis];
            }
        }
        for c in centroid.iter_mut() {
            *c /= N as f64;
        }
        centroid
    }

    pub fn replace(&mut self, index: usize, vertex: [f64; N], value: f64) {
        self.vertices[index] = vertex;
        self.values[index] = value;
    }

    /// Pull every vertex halfway (by `coefficient`) towards `anchor` and re-evaluate it.
    pub fn shrink_towards<F>(&mut self, anchor: usize, coefficient: f64, eval: &mut F)
    where
        F: FnMut(&[f64; N]) -> f64,
    {
        let anchor_vertex = self.vertices[anchor];
        for i in 0..self.vertices.len() {
            if i == anchor {
                continue;
            }
            let moved = along(&anchor_vertex, &self.vertices[i], coefficient);
            self.values[i] = eval(&moved);
            self.vertices[i] = moved;
        }
    }
}

/// Point `origin + (target - origin) * coefficient`.
///
/// Negative coefficients move away from `target` through `origin`.
pub(super) fn along<const N: usize>(
    origin: &[f64; N],
    target: &[f64; N],
    coefficient: f64,
) -> [f64; N] {
    let mut point = [0.0; N];
    for axis in 0..N {
        point[axis] = origin[axis] + (target[axis] - origin[axis]) * coefficient;
    }
    point
}
