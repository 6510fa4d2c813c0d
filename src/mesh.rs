//! # Mesh
//!
//! Indexed triangle mesh built from an STL triangle soup. Vertices closer than
//! a tolerance are welded, collapsed faces are dropped, and the edge table is
//! derived once so topology queries are cheap.

use crate::{
    geo::{is_vec3_finite, to_dvec3, winding_normal, Bounds},
    stl::RawTriangle,
};
use float_cmp::approx_eq;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use ultraviolet::DVec3;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("mesh has no usable triangles ({degenerate} of {total} parsed triangles are degenerate)")]
pub struct EmptyMeshError {
    pub total: usize,
    pub degenerate: usize,
}

/// Undirected edge stored as (smaller index, larger index)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge(pub usize, pub usize);

impl Edge {
    /// Canonical edge between two vertices
    ///
    /// # Examples
    ///
    /// ```
    /// use stl_analyzer::mesh::Edge;
    /// assert_eq!(Edge::new(7, 2), Edge::new(2, 7));
    /// assert_eq!(Edge::new(7, 2).0, 2);
    /// ```
    pub fn new(a: usize, b: usize) -> Edge {
        if a < b {
            Edge(a, b)
        } else {
            Edge(b, a)
        }
    }
}

/// Face of the mesh, three distinct vertex indices and a unit normal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub indices: [usize; 3],
    pub normal: DVec3,
}

impl Triangle {
    pub fn edges(&self) -> [Edge; 3] {
        let [a, b, c] = self.indices;
        [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)]
    }
}

/// Merges positions that agree within `epsilon` on every axis
///
/// Positions are bucketed on a grid of cell size `epsilon`, so a match can
/// only live in the 27 cells around the query. Zero epsilon keys on the exact
/// bit pattern instead.
struct VertexWelder {
    epsilon: f64,
    cells: HashMap<[i64; 3], Vec<usize>>,
    vertices: Vec<DVec3>,
}

impl VertexWelder {
    fn new(epsilon: f64, capacity: usize) -> VertexWelder {
        VertexWelder {
            epsilon,
            cells: HashMap::with_capacity(capacity),
            vertices: Vec::with_capacity(capacity),
        }
    }

    fn cell(&self, p: DVec3) -> [i64; 3] {
        if self.epsilon > 0. {
            [
                (p.x / self.epsilon).floor() as i64,
                (p.y / self.epsilon).floor() as i64,
                (p.z / self.epsilon).floor() as i64,
            ]
        } else {
            // adding zero folds -0.0 into 0.0
            [
                (p.x + 0.).to_bits() as i64,
                (p.y + 0.).to_bits() as i64,
                (p.z + 0.).to_bits() as i64,
            ]
        }
    }

    fn same(&self, a: DVec3, b: DVec3) -> bool {
        approx_eq!(f64, a.x, b.x, epsilon = self.epsilon, ulps = 0)
            && approx_eq!(f64, a.y, b.y, epsilon = self.epsilon, ulps = 0)
            && approx_eq!(f64, a.z, b.z, epsilon = self.epsilon, ulps = 0)
    }

    fn find(&self, p: DVec3, cell: [i64; 3]) -> Option<usize> {
        if self.epsilon <= 0. {
            return self.cells.get(&cell).and_then(|ids| ids.first().copied());
        }
        let mut best: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [
                        cell[0].saturating_add(dx),
                        cell[1].saturating_add(dy),
                        cell[2].saturating_add(dz),
                    ];
                    if let Some(ids) = self.cells.get(&key) {
                        for &id in ids {
                            if best.map_or(true, |b| id < b) && self.same(self.vertices[id], p) {
                                best = Some(id);
                            }
                        }
                    }
                }
            }
        }
        best
    }

    fn insert(&mut self, p: DVec3) -> usize {
        let cell = self.cell(p);
        if let Some(id) = self.find(p, cell) {
            return id;
        }
        let id = self.vertices.len();
        self.vertices.push(p);
        self.cells.entry(cell).or_default().push(id);
        id
    }
}

fn face_normal(raw: &RawTriangle, corners: [DVec3; 3]) -> DVec3 {
    let stored = to_dvec3(raw.normal);
    let mag = stored.mag();
    if is_vec3_finite(&stored) && mag > 0. {
        stored / mag
    } else {
        winding_normal(corners[0], corners[1], corners[2]).unwrap_or_else(DVec3::zero)
    }
}

/// Indexed triangle mesh, immutable once built
#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: Vec<DVec3>,
    faces: Vec<Triangle>,
    edge_uses: BTreeMap<Edge, usize>,
    degenerate_faces: usize,
}

impl Mesh {
    /// Weld a triangle soup into an indexed mesh
    ///
    /// The vertex table is ordered by first use over the kept triangles, so the
    /// same input always produces the same mesh.
    pub fn build(raw: &[RawTriangle], epsilon: f64) -> Result<Mesh, EmptyMeshError> {
        let mut welder = VertexWelder::new(epsilon, raw.len() / 2 + 3);
        let mut faces = Vec::with_capacity(raw.len());
        let mut degenerate_faces = 0;

        for (i, tri) in raw.iter().enumerate() {
            let corners = [
                to_dvec3(tri.vertices[0]),
                to_dvec3(tri.vertices[1]),
                to_dvec3(tri.vertices[2]),
            ];
            let indices = [
                welder.insert(corners[0]),
                welder.insert(corners[1]),
                welder.insert(corners[2]),
            ];
            if indices[0] == indices[1] || indices[1] == indices[2] || indices[0] == indices[2] {
                debug!("dropping degenerate triangle {} {:?}", i, tri.vertices);
                degenerate_faces += 1;
                continue;
            }
            faces.push(Triangle {
                indices,
                normal: face_normal(tri, corners),
            });
        }

        if faces.is_empty() {
            return Err(EmptyMeshError {
                total: raw.len(),
                degenerate: degenerate_faces,
            });
        }

        let vertices = compact(welder.vertices, &mut faces);
        let mut edge_uses = BTreeMap::new();
        for face in &faces {
            for edge in face.edges().iter() {
                *edge_uses.entry(*edge).or_insert(0) += 1;
            }
        }

        debug!(
            "welded {} triangles into {} vertices, {} faces, {} edges",
            raw.len(),
            vertices.len(),
            faces.len(),
            edge_uses.len()
        );

        Ok(Mesh {
            vertices,
            faces,
            edge_uses,
            degenerate_faces,
        })
    }

    pub fn vertices(&self) -> &[DVec3] { &self.vertices }

    pub fn faces(&self) -> &[Triangle] { &self.faces }

    /// Positions of a face's corners
    pub fn corners(&self, face: &Triangle) -> [DVec3; 3] {
        let [a, b, c] = face.indices;
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    pub fn vertex_count(&self) -> usize { self.vertices.len() }

    pub fn face_count(&self) -> usize { self.faces.len() }

    /// Triangles dropped because their corners welded together
    pub fn degenerate_faces(&self) -> usize { self.degenerate_faces }

    /// Distinct undirected edges in index order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ { self.edge_uses.keys().copied() }

    pub fn edge_count(&self) -> usize { self.edge_uses.len() }

    /// Number of faces sharing an edge, zero if the edge isn't in the mesh
    pub fn faces_on_edge(&self, edge: Edge) -> usize { self.edge_uses.get(&edge).copied().unwrap_or(0) }

    /// Edges used by a single face, each one borders a hole
    pub fn boundary_edge_count(&self) -> usize { self.edge_uses.values().filter(|&&n| n == 1).count() }

    /// Edges shared by more than two faces
    pub fn non_manifold_edge_count(&self) -> usize { self.edge_uses.values().filter(|&&n| n > 2).count() }

    /// Connected pieces of the vertex/edge graph
    pub fn component_count(&self) -> usize {
        let mut neighbours = vec![Vec::new(); self.vertices.len()];
        for &Edge(a, b) in self.edge_uses.keys() {
            neighbours[a].push(b);
            neighbours[b].push(a);
        }

        let mut visited = vec![false; self.vertices.len()];
        let mut components = 0;
        let mut stack = Vec::new();
        for start in 0..self.vertices.len() {
            if visited[start] {
                continue;
            }
            components += 1;
            stack.push(start);
            while let Some(node) = stack.pop() {
                if visited[node] {
                    continue;
                }
                visited[node] = true;
                stack.extend(neighbours[node].iter().filter(|&&n| !visited[n]));
            }
        }
        components
    }

    /// Closed, manifold and in one piece: every edge borders exactly two faces
    pub fn is_watertight(&self) -> bool {
        self.edge_uses.values().all(|&n| n == 2) && self.component_count() == 1
    }

    pub fn bounds(&self) -> Option<Bounds> { Bounds::from_points(&self.vertices) }
}

/// Drop vertices only referenced by discarded faces and renumber in first use order
fn compact(welded: Vec<DVec3>, faces: &mut [Triangle]) -> Vec<DVec3> {
    let mut remap = vec![usize::MAX; welded.len()];
    let mut vertices = Vec::with_capacity(welded.len());
    for face in faces.iter_mut() {
        for index in face.indices.iter_mut() {
            if remap[*index] == usize::MAX {
                remap[*index] = vertices.len();
                vertices.push(welded[*index]);
            }
            *index = remap[*index];
        }
    }
    vertices
}
