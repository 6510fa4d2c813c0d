//! Triangle soups shared by the unit tests

use crate::stl::RawTriangle;

fn quad(a: [f32; 3], b: [f32; 3], c: [f32; 3], d: [f32; 3]) -> [RawTriangle; 2] {
    [RawTriangle::new(a, b, c), RawTriangle::new(a, c, d)]
}

/// Axis aligned box from `origin` with outward winding
pub fn cuboid(origin: [f32; 3], size: [f32; 3]) -> Vec<RawTriangle> {
    let [ox, oy, oz] = origin;
    let [sx, sy, sz] = size;
    let p = |i: f32, j: f32, k: f32| [ox + i * sx, oy + j * sy, oz + k * sz];
    let faces = [
        quad(p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)),
        quad(p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)),
        quad(p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)),
        quad(p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)),
        quad(p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)),
        quad(p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)),
    ];
    faces.iter().flat_map(|f| f.iter().copied()).collect()
}

pub fn unit_cube() -> Vec<RawTriangle> { cuboid([0., 0., 0.], [1., 1., 1.]) }

/// Regular tetrahedron with unit edges
pub fn tetrahedron() -> Vec<RawTriangle> {
    let h = 3f32.sqrt() / 2.;
    let a = [0., 0., 0.];
    let b = [1., 0., 0.];
    let c = [0.5, h, 0.];
    let d = [0.5, h / 3., (2f32 / 3.).sqrt()];
    vec![
        RawTriangle::new(a, c, b),
        RawTriangle::new(a, b, d),
        RawTriangle::new(b, c, d),
        RawTriangle::new(c, a, d),
    ]
}

pub fn single_triangle() -> Vec<RawTriangle> {
    vec![RawTriangle::new([0., 0., 0.], [1., 0., 0.], [0., 1., 0.])]
}
