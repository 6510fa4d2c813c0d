//! # Geo
//!
//! Small geometric helpers on top of the ultraviolet double precision types

use serde::{Serialize, Serializer};
use ultraviolet::{DMat3, DVec3};

/// Widen a stored STL point to double precision
pub fn to_dvec3(p: [f32; 3]) -> DVec3 { DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64) }

pub fn to_array(v: DVec3) -> [f64; 3] { [v.x, v.y, v.z] }

/// check if any value in point is infinite or nan
pub fn is_vec3_finite(point: &DVec3) -> bool {
    point.x.is_finite() && point.y.is_finite() && point.z.is_finite()
}

/// Cross product of two triangle edges, its length is twice the area
pub fn area_vector(v0: DVec3, v1: DVec3, v2: DVec3) -> DVec3 { (v1 - v0).cross(v2 - v0) }

/// Area of a triangle
///
/// # Examples
///
/// ```
/// use stl_analyzer::geo::triangle_area;
/// use ultraviolet::DVec3;
/// let area = triangle_area(DVec3::zero(), DVec3::new(2., 0., 0.), DVec3::new(0., 1., 0.));
/// assert_eq!(area, 1.);
/// ```
pub fn triangle_area(v0: DVec3, v1: DVec3, v2: DVec3) -> f64 { area_vector(v0, v1, v2).mag() * 0.5 }

/// Unit normal following the right hand rule, `None` for zero area triangles
pub fn winding_normal(v0: DVec3, v1: DVec3, v2: DVec3) -> Option<DVec3> {
    let n = area_vector(v0, v1, v2);
    let mag = n.mag();
    if mag > 0. && mag.is_finite() {
        Some(n / mag)
    } else {
        None
    }
}

/// Axis aligned bounds of a point set
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    #[serde(serialize_with = "serialize_vec3")]
    pub min: DVec3,
    #[serde(serialize_with = "serialize_vec3")]
    pub max: DVec3,
}

impl Bounds {
    pub fn from_points(points: &[DVec3]) -> Option<Bounds> {
        let first = *points.first()?;
        Some(points.iter().fold(Bounds { min: first, max: first }, |b, p| Bounds {
            min: DVec3::new(b.min.x.min(p.x), b.min.y.min(p.y), b.min.z.min(p.z)),
            max: DVec3::new(b.max.x.max(p.x), b.max.y.max(p.y), b.max.z.max(p.z)),
        }))
    }

    pub fn extents(&self) -> DVec3 { self.max - self.min }
}

pub fn serialize_vec3<S: Serializer>(v: &DVec3, s: S) -> Result<S::Ok, S::Error> { to_array(*v).serialize(s) }

/// Row major nested arrays, the inertia tensor is symmetric so rows equal columns
pub fn serialize_mat3<S: Serializer>(m: &DMat3, s: S) -> Result<S::Ok, S::Error> {
    let rows = [to_array(m.cols[0]), to_array(m.cols[1]), to_array(m.cols[2])];
    rows.serialize(s)
}
