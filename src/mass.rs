//! # Mass
//!
//! Surface area, enclosed volume and rigid body properties of a mesh with
//! uniform density. Volume integrals decompose the solid into signed
//! tetrahedra with the origin as the shared apex (Mirtich 1996), so they are
//! only meaningful for closed meshes. Open or non-manifold meshes still get a
//! number, together with a [`DegenerateMeshWarning`].

use crate::{
    geo::{area_vector, serialize_mat3, serialize_vec3, triangle_area},
    mesh::Mesh,
};
use serde::Serialize;
use thiserror::Error;
use ultraviolet::{DMat3, DVec3};

/// Volumes below this fraction of the bounding box diagonal cubed count as zero
const ZERO_VOLUME_RATIO: f64 = 1e-12;

/// Result that stays usable when the mesh doesn't enclose a volume
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "mesh is not watertight ({boundary_edges} boundary edges, {non_manifold_edges} non-manifold edges, \
     {components} components), {quantity} may be incorrect"
)]
pub struct DegenerateMeshWarning {
    pub quantity: &'static str,
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
    pub components: usize,
}

impl DegenerateMeshWarning {
    fn check(mesh: &Mesh, quantity: &'static str) -> Option<DegenerateMeshWarning> {
        if mesh.is_watertight() {
            None
        } else {
            Some(DegenerateMeshWarning {
                quantity,
                boundary_edges: mesh.boundary_edge_count(),
                non_manifold_edges: mesh.non_manifold_edge_count(),
                components: mesh.component_count(),
            })
        }
    }
}

/// A computed value and the warning that came with it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Measured<T> {
    pub value: T,
    pub warning: Option<DegenerateMeshWarning>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MassProperties {
    pub density: f64,
    pub volume: f64,
    pub mass: f64,
    #[serde(serialize_with = "serialize_vec3")]
    pub center_mass: DVec3,
    /// Inertia tensor about the center of mass
    #[serde(serialize_with = "serialize_mat3")]
    pub inertia: DMat3,
}

pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.faces()
        .iter()
        .map(|f| {
            let [v0, v1, v2] = mesh.corners(f);
            triangle_area(v0, v1, v2)
        })
        .sum()
}

/// Divergence theorem volume, negative when the faces wind inwards
pub fn signed_volume(mesh: &Mesh) -> f64 {
    mesh.faces()
        .iter()
        .map(|f| {
            let [v0, v1, v2] = mesh.corners(f);
            v0.dot(v1.cross(v2)) / 6.
        })
        .sum()
}

/// Enclosed volume as a magnitude, independent of the global winding
pub fn volume(mesh: &Mesh) -> Measured<f64> {
    Measured {
        value: signed_volume(mesh).abs(),
        warning: DegenerateMeshWarning::check(mesh, "volume"),
    }
}

/// First and second volume moments about the origin
#[derive(Default)]
struct Moments {
    volume: f64,
    first: DVec3,
    xx: f64,
    yy: f64,
    zz: f64,
    xy: f64,
    xz: f64,
    yz: f64,
}

impl Moments {
    fn add_tetrahedron(&mut self, a: DVec3, b: DVec3, c: DVec3) {
        let det = a.cross(b).dot(c);
        let vol = det / 6.;
        self.volume += vol;
        self.first += (a + b + c) * (vol / 4.);

        let f60 = det / 60.;
        let f120 = det / 120.;
        self.xx += f60 * (a.x * a.x + b.x * b.x + c.x * c.x + a.x * b.x + a.x * c.x + b.x * c.x);
        self.yy += f60 * (a.y * a.y + b.y * b.y + c.y * c.y + a.y * b.y + a.y * c.y + b.y * c.y);
        self.zz += f60 * (a.z * a.z + b.z * b.z + c.z * c.z + a.z * b.z + a.z * c.z + b.z * c.z);
        self.xy += f120 * product_sum(a.x, a.y, b.x, b.y, c.x, c.y);
        self.xz += f120 * product_sum(a.x, a.z, b.x, b.z, c.x, c.z);
        self.yz += f120 * product_sum(a.y, a.z, b.y, b.z, c.y, c.z);
    }
}

/// Mixed second moment term over a tetrahedron with one corner at the origin
fn product_sum(ap: f64, aq: f64, bp: f64, bq: f64, cp: f64, cq: f64) -> f64 {
    2. * (ap * aq + bp * bq + cp * cq) + ap * bq + aq * bp + ap * cq + aq * cp + bp * cq + bq * cp
}

/// Area weighted centroid of the surface, used when there is no volume to weigh
fn surface_centroid(mesh: &Mesh) -> DVec3 {
    let mut area = 0.;
    let mut weighted = DVec3::zero();
    for face in mesh.faces() {
        let [v0, v1, v2] = mesh.corners(face);
        let a = area_vector(v0, v1, v2).mag() * 0.5;
        area += a;
        weighted += (v0 + v1 + v2) * (a / 3.);
    }
    if area > 0. {
        weighted / area
    } else {
        let vertices = mesh.vertices();
        vertices.iter().fold(DVec3::zero(), |acc, v| acc + *v) / vertices.len() as f64
    }
}

/// Volume, mass, center of mass and inertia for a uniform `density`
///
/// Inward winding flips the sign of every moment, so the results are
/// normalised to the outward orientation before scaling by density.
pub fn mass_properties(mesh: &Mesh, density: f64) -> Measured<MassProperties> {
    let mut m = Moments::default();
    for face in mesh.faces() {
        let [a, b, c] = mesh.corners(face);
        m.add_tetrahedron(a, b, c);
    }

    let scale = mesh.bounds().map_or(0., |b| b.extents().mag().powi(3));
    let volume = m.volume.abs();
    let sign = if m.volume < 0. { -1. } else { 1. };
    let com = if volume <= ZERO_VOLUME_RATIO * scale {
        surface_centroid(mesh)
    } else {
        m.first / m.volume
    };
    let (xx, yy, zz) = (m.xx * sign, m.yy * sign, m.zz * sign);
    let (xy, xz, yz) = (m.xy * sign, m.xz * sign, m.yz * sign);

    // parallel axis theorem: I_com = I_origin - V * (|d|^2 * I - d d^T)
    let d = com;
    let ixx = (yy + zz) - volume * (d.y * d.y + d.z * d.z);
    let iyy = (xx + zz) - volume * (d.x * d.x + d.z * d.z);
    let izz = (xx + yy) - volume * (d.x * d.x + d.y * d.y);
    let ixy = -xy + volume * d.x * d.y;
    let ixz = -xz + volume * d.x * d.z;
    let iyz = -yz + volume * d.y * d.z;

    let value = MassProperties {
        density,
        volume,
        mass: volume * density,
        center_mass: com,
        inertia: DMat3::new(
            DVec3::new(ixx, ixy, ixz) * density,
            DVec3::new(ixy, iyy, iyz) * density,
            DVec3::new(ixz, iyz, izz) * density,
        ),
    };

    Measured {
        value,
        warning: DegenerateMeshWarning::check(mesh, "mass properties"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEFAULT_EPSILON, stl::RawTriangle, test_shapes::*};
    use float_cmp::approx_eq;

    fn build(raw: &[RawTriangle]) -> Mesh { Mesh::build(raw, DEFAULT_EPSILON).unwrap() }

    fn assert_vec(actual: DVec3, expected: DVec3) {
        assert!((actual - expected).mag() < 1e-9, "{:?} != {:?}", actual, expected);
    }

    #[test]
    fn test_cube() {
        let mesh = build(&unit_cube());
        assert!(approx_eq!(f64, surface_area(&mesh), 6., epsilon = 1e-6));
        let volume = volume(&mesh);
        assert!(approx_eq!(f64, volume.value, 1., epsilon = 1e-6));
        assert!(volume.warning.is_none());

        let props = mass_properties(&mesh, 1.);
        assert!(props.warning.is_none());
        let props = props.value;
        assert!(approx_eq!(f64, props.mass, 1., epsilon = 1e-9));
        assert_vec(props.center_mass, DVec3::new(0.5, 0.5, 0.5));
        assert_vec(props.inertia.cols[0], DVec3::new(1. / 6., 0., 0.));
        assert_vec(props.inertia.cols[1], DVec3::new(0., 1. / 6., 0.));
        assert_vec(props.inertia.cols[2], DVec3::new(0., 0., 1. / 6.));
    }

    #[test]
    fn test_density_scales_mass_and_inertia() {
        let mesh = build(&cuboid([-1., 2., 0.], [2., 1., 4.]));
        let props = mass_properties(&mesh, 3.).value;
        assert!(approx_eq!(f64, props.volume, 8., epsilon = 1e-9));
        assert!(approx_eq!(f64, props.mass, 24., epsilon = 1e-9));
        assert_vec(props.center_mass, DVec3::new(0., 2.5, 2.));
        // solid box: I_xx = m / 12 * (b^2 + c^2)
        let (m, a, b, c) = (24., 2., 1., 4.);
        assert!(approx_eq!(f64, props.inertia.cols[0].x, m / 12. * (b * b + c * c), epsilon = 1e-9));
        assert!(approx_eq!(f64, props.inertia.cols[1].y, m / 12. * (a * a + c * c), epsilon = 1e-9));
        assert!(approx_eq!(f64, props.inertia.cols[2].z, m / 12. * (a * a + b * b), epsilon = 1e-9));
        assert!(props.inertia.cols[0].y.abs() < 1e-9);
    }

    #[test]
    fn test_small_closed_mesh_keeps_volume() {
        let size = 5e-5;
        let mesh = build(&cuboid([0., 0., 0.], [size; 3]));
        assert!(mesh.is_watertight());
        let volume = volume(&mesh).value;
        assert!(volume > 0.);
        let props = mass_properties(&mesh, 2.).value;
        assert!(approx_eq!(f64, props.volume, volume, epsilon = 1e-25));
        assert!(approx_eq!(f64, props.mass, 2. * volume, epsilon = 1e-25));
        let half = f64::from(size) / 2.;
        assert!((props.center_mass - DVec3::new(half, half, half)).mag() < 1e-10);
        assert!(props.inertia.cols[0].x > 0.);
    }

    #[test]
    fn test_tetrahedron() {
        let mesh = build(&tetrahedron());
        assert!(mesh.is_watertight());
        assert!(approx_eq!(f64, volume(&mesh).value, 0.1178511, epsilon = 1e-5));
        assert!(approx_eq!(f64, surface_area(&mesh), 1.7320508, epsilon = 1e-5));
        let com = mass_properties(&mesh, 1.).value.center_mass;
        let h = 3f64.sqrt() / 2.;
        assert!((com - DVec3::new(0.5, h / 3., (2f64 / 3.).sqrt() / 4.)).mag() < 1e-5);
    }

    #[test]
    fn test_inward_winding_reports_magnitudes() {
        let outward = build(&unit_cube());
        let inward: Vec<RawTriangle> = unit_cube().iter().map(RawTriangle::flipped).collect();
        let inward = build(&inward);
        assert!(signed_volume(&outward) > 0.);
        assert!(approx_eq!(f64, signed_volume(&inward), -signed_volume(&outward), epsilon = 1e-12));
        assert!(approx_eq!(f64, volume(&inward).value, 1., epsilon = 1e-6));

        let a = mass_properties(&outward, 2.).value;
        let b = mass_properties(&inward, 2.).value;
        assert!(approx_eq!(f64, a.mass, b.mass, epsilon = 1e-12));
        assert_vec(a.center_mass, b.center_mass);
        for i in 0..3 {
            assert_vec(a.inertia.cols[i], b.inertia.cols[i]);
        }
    }

    #[test]
    fn test_open_mesh_warns() {
        let mesh = build(&single_triangle());
        assert!(approx_eq!(f64, surface_area(&mesh), 0.5, epsilon = 1e-12));
        let volume = volume(&mesh);
        assert_eq!(volume.value, 0.);
        let warning = volume.warning.unwrap();
        assert_eq!(warning.quantity, "volume");
        assert_eq!(warning.boundary_edges, 3);
        assert_eq!(
            warning.to_string(),
            "mesh is not watertight (3 boundary edges, 0 non-manifold edges, 1 components), volume may be incorrect"
        );

        let props = mass_properties(&mesh, 1.);
        assert_eq!(props.warning.unwrap().quantity, "mass properties");
        assert_eq!(props.value.mass, 0.);
        assert_vec(props.value.center_mass, DVec3::new(1. / 3., 1. / 3., 0.));
    }

    #[test]
    fn test_reordered_input_same_metrics() {
        let forward = build(&tetrahedron());
        let mut raw = tetrahedron();
        raw.reverse();
        let reversed = build(&raw);
        assert_eq!(forward.vertex_count(), reversed.vertex_count());
        assert_eq!(forward.edge_count(), reversed.edge_count());
        assert_eq!(forward.face_count(), reversed.face_count());
        assert!(approx_eq!(f64, surface_area(&forward), surface_area(&reversed), epsilon = 1e-12));
        assert!(approx_eq!(f64, volume(&forward).value, volume(&reversed).value, epsilon = 1e-12));
    }
}
