//! Iso-surface extraction.
//!
//! Every grid cube is split into six tetrahedra that share the diagonal from
//! corner 0 to corner 7. The split is the same in every cube, so faces match
//! between neighbours and the surface has no holes or ambiguous cases.

use std::collections::HashMap;

use burn::tensor::backend::Backend;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::image::{Grid, Image};

/// Corner `c` of a cube sits at `(z, y, x) + ((c >> 2) & 1, (c >> 1) & 1, c & 1)`.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 3, 2, 7],
    [0, 2, 6, 7],
    [0, 6, 4, 7],
    [0, 4, 5, 7],
    [0, 5, 1, 7],
];

/// Triangle mesh in physical (spacing-scaled) coordinates, vertices in
/// (plane, row, column) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = self.corners(f);
                norm(cross(sub(b, a), sub(c, a))) / 2.0
            })
            .sum()
    }

    /// Signed volume by the divergence theorem; positive when normals point
    /// out of the enclosed region.
    pub fn enclosed_volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = self.corners(f);
                dot(a, cross(b, c)) / 6.0
            })
            .sum()
    }

    fn corners(&self, face: &[u32; 3]) -> [[f64; 3]; 3] {
        face.map(|i| self.vertices[i as usize])
    }
}

/// Extract the surface where `image` crosses `level`.
///
/// Voxels above `level` are inside. Triangles are wound so their normals
/// point toward lower values, and vertices lying on the same grid edge are
/// shared. A level outside the data range is an error.
pub fn marching_cubes<B: Backend>(image: &Image<B, 3>, level: f64) -> Result<Mesh> {
    let values = image.to_vec()?;
    let stats = image.statistics()?;
    if !(level >= stats.min && level <= stats.max) {
        return Err(VolumeError::invalid_parameter(format!(
            "surface level {} must lie within the data range [{}, {}]",
            level, stats.min, stats.max
        )));
    }

    let grid = Grid::new(image.shape());
    let spacing = image.spacing().to_array();
    let [planes, rows, cols] = grid.shape();
    let mut builder = MeshBuilder {
        values: &values,
        grid,
        spacing,
        level,
        mesh: Mesh::default(),
        edges: HashMap::new(),
    };

    for z in 0..planes.saturating_sub(1) {
        for y in 0..rows.saturating_sub(1) {
            for x in 0..cols.saturating_sub(1) {
                let corners: [usize; 8] =
                    std::array::from_fn(|c| grid.index([z + ((c >> 2) & 1), y + ((c >> 1) & 1), x + (c & 1)]));
                for tet in &TETRAHEDRA {
                    builder.tetrahedron(tet.map(|c| corners[c]));
                }
            }
        }
    }

    let mesh = builder.mesh;
    debug!(vertices = mesh.vertices.len(), faces = mesh.faces.len(), level, "marching cubes");
    Ok(mesh)
}

struct MeshBuilder<'a> {
    values: &'a [f32],
    grid: Grid,
    spacing: [f64; 3],
    level: f64,
    mesh: Mesh,
    edges: HashMap<(usize, usize), u32>,
}

impl MeshBuilder<'_> {
    fn inside(&self, idx: usize) -> bool {
        self.values[idx] as f64 > self.level
    }

    fn position(&self, idx: usize) -> [f64; 3] {
        let c = self.grid.coords(idx);
        [
            c[0] as f64 * self.spacing[0],
            c[1] as f64 * self.spacing[1],
            c[2] as f64 * self.spacing[2],
        ]
    }

    /// Vertex where the level crosses the edge between `a` and `b`.
    fn vertex(&mut self, a: usize, b: usize) -> u32 {
        let key = (a.min(b), a.max(b));
        if let Some(&v) = self.edges.get(&key) {
            return v;
        }
        let (va, vb) = (self.values[key.0] as f64, self.values[key.1] as f64);
        let t = if (vb - va).abs() > f64::EPSILON {
            ((self.level - va) / (vb - va)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let (pa, pb) = (self.position(key.0), self.position(key.1));
        let p = [0, 1, 2].map(|k| pa[k] + t * (pb[k] - pa[k]));
        let id = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(p);
        self.edges.insert(key, id);
        id
    }

    fn tetrahedron(&mut self, tet: [usize; 4]) {
        let (inside, outside): (Vec<usize>, Vec<usize>) = tet.into_iter().partition(|&c| self.inside(c));
        let direction = sub(self.centroid(&outside), self.centroid(&inside));

        match (inside.as_slice(), outside.as_slice()) {
            ([a], [b, c, d]) | ([b, c, d], [a]) => {
                let tri = [self.vertex(*a, *b), self.vertex(*a, *c), self.vertex(*a, *d)];
                self.push(tri, direction);
            }
            ([a, b], [c, d]) => {
                let ac = self.vertex(*a, *c);
                let ad = self.vertex(*a, *d);
                let bd = self.vertex(*b, *d);
                let bc = self.vertex(*b, *c);
                self.push([ac, ad, bd], direction);
                self.push([ac, bd, bc], direction);
            }
            _ => {}
        }
    }

    fn centroid(&self, corners: &[usize]) -> [f64; 3] {
        let mut sum = [0.0; 3];
        for &c in corners {
            let p = self.position(c);
            for k in 0..3 {
                sum[k] += p[k];
            }
        }
        sum.map(|s| s / corners.len().max(1) as f64)
    }

    /// Add a triangle wound so its normal has a non-negative component along
    /// `outward`.
    fn push(&mut self, tri: [u32; 3], outward: [f64; 3]) {
        let [a, b, c] = tri.map(|i| self.mesh.vertices[i as usize]);
        let normal = cross(sub(b, a), sub(c, a));
        if dot(normal, outward) < 0.0 {
            self.mesh.faces.push([tri[0], tri[2], tri[1]]);
        } else {
            self.mesh.faces.push(tri);
        }
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
