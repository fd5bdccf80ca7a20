use glam::Vec3;
use sdf::shape::{
    cube, cuboid, cylinder, difference, dodecahedron, expand, intersection, mandelbulb, mirror,
    octahedron, plane, repeat, rotate, rotate_x, rotate_y, rotate_z, scale, sierpinski, smooth_box,
    smooth_union, sphere, tetrahedron, torus, translate, tree, tree_with, twist_y, union, unit, zero,
};
use sdf::MAX_VALUE;

fn random_point(rng: &fastrand::Rng, extent: f32) -> Vec3 {
    Vec3::new(rng.f32(), rng.f32(), rng.f32()) * 2.0 * extent - Vec3::splat(extent)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-5 * (1.0 + a.abs().max(b.abs()))
}

#[test]
fn sphere_distance_at_unit_point() {
    let s = sphere(1.0);
    let p = Vec3::new(1.0, 0.0, 0.0);
    assert!(s.distance_at(p).unwrap().abs() < 1e-6);
    assert!(close(s.distance_at(Vec3::ZERO).unwrap(), -1.0));
    assert!(close(s.distance_at(Vec3::new(0.0, 3.0, 0.0)).unwrap(), 2.0));
}

#[test]
fn empty_and_full_shapes() {
    let p = Vec3::new(0.3, -2.0, 7.0);
    assert_eq!(zero().distance_at(p).unwrap(), MAX_VALUE);
    assert_eq!(unit().distance_at(p).unwrap(), -MAX_VALUE);
}

#[test]
fn cuboid_is_signed() {
    let b = cuboid([1.0, 2.0, 3.0]);
    assert!(close(b.distance_at(Vec3::ZERO).unwrap(), -1.0));
    assert!(close(b.distance_at(Vec3::new(2.0, 0.0, 0.0)).unwrap(), 1.0));
    let corner = b.distance_at(Vec3::new(2.0, 3.0, 3.0)).unwrap();
    assert!(close(corner, 2.0_f32.sqrt()));
}

#[test]
fn plane_cylinder_and_torus() {
    let ground = plane(Vec3::Y, 1.0);
    assert!(close(ground.distance_at(Vec3::new(4.0, 2.0, -1.0)).unwrap(), 3.0));

    let pillar = cylinder(0.5);
    assert!(close(pillar.distance_at(Vec3::new(2.0, 100.0, 0.0)).unwrap(), 1.5));

    let ring = torus(1.0, 0.25);
    assert!(close(ring.distance_at(Vec3::new(1.0, 0.0, 0.0)).unwrap(), -0.25));
    assert!(close(ring.distance_at(Vec3::ZERO).unwrap(), 0.75));
}

#[test]
fn polyhedra_contain_their_centre_and_exclude_far_points() {
    for shape in [tetrahedron(), cube(), octahedron(), dodecahedron()] {
        assert!(shape.distance_at(Vec3::ZERO).unwrap() < 0.0);
        assert!(shape.distance_at(Vec3::new(0.0, 3.0, 0.0)).unwrap() > 1.0);
    }
    assert!(close(cube().distance_at(Vec3::new(1.0, 0.0, 0.0)).unwrap(), 0.5));
}

#[test]
fn union_and_intersection_match_min_and_max() {
    let a = translate([0.3, 0.0, 0.0], sphere(0.7));
    let b = cuboid([0.5, 0.4, 0.6]);
    let u = union(a.clone(), b.clone());
    let i = intersection(a.clone(), b.clone());
    let d = difference(a.clone(), b.clone());
    let rng = fastrand::Rng::with_seed(42);
    for _ in 0..200 {
        let p = random_point(&rng, 2.0);
        let da = a.distance_at(p).unwrap();
        let db = b.distance_at(p).unwrap();
        assert_eq!(u.distance_at(p).unwrap(), da.min(db));
        assert_eq!(i.distance_at(p).unwrap(), da.max(db));
        assert_eq!(d.distance_at(p).unwrap(), da.max(-db));
    }
}

#[test]
fn smooth_union_approaches_union_as_k_shrinks() {
    let a = translate([-0.4, 0.0, 0.0], sphere(0.5));
    let b = translate([0.4, 0.0, 0.0], sphere(0.5));
    let rng = fastrand::Rng::with_seed(3);
    for _ in 0..100 {
        let p = random_point(&rng, 1.5);
        let hard = a.distance_at(p).unwrap().min(b.distance_at(p).unwrap());
        let mut previous = f32::INFINITY;
        for k in [0.5, 0.25, 0.1, 0.01, 0.0001] {
            let soft = smooth_union(k, a.clone(), b.clone()).distance_at(p).unwrap();
            assert!(soft <= hard + 1e-6, "smooth union exceeds min at {p}");
            assert!(soft >= hard - k * 0.25 - 1e-6);
            assert!(soft >= previous - 1e-6 || previous == f32::INFINITY);
            previous = soft;
        }
        assert!((previous - hard).abs() < 1e-3);
    }
}

#[test]
fn translate_and_scale_move_the_surface() {
    let moved = translate([0.0, 2.0, 0.0], sphere(1.0));
    assert!(moved.distance_at(Vec3::new(0.0, 3.0, 0.0)).unwrap().abs() < 1e-6);

    let grown = scale(2.0, sphere(1.0));
    assert!(grown.distance_at(Vec3::new(2.0, 0.0, 0.0)).unwrap().abs() < 1e-6);
    assert!(close(grown.distance_at(Vec3::new(5.0, 0.0, 0.0)).unwrap(), 3.0));
}

#[test]
fn rotation_is_right_handed() {
    let s = rotate_z(std::f32::consts::FRAC_PI_2, translate([1.0, 0.0, 0.0], sphere(0.25)));
    assert!(close(s.distance_at(Vec3::new(0.0, 1.0, 0.0)).unwrap(), -0.25));
    let about_axis = rotate(Vec3::Z, std::f32::consts::FRAC_PI_2, translate([1.0, 0.0, 0.0], sphere(0.25)));
    assert!(close(about_axis.distance_at(Vec3::new(0.0, 1.0, 0.0)).unwrap(), -0.25));
}

#[test]
fn quarter_turns_carry_axes_forward() {
    use std::f32::consts::FRAC_PI_2;
    let blob = |at: Vec3| translate(at, sphere(0.25));
    let about_x = rotate_x(FRAC_PI_2, blob(Vec3::Y));
    assert!((about_x.distance_at(Vec3::Z).unwrap() + 0.25).abs() < 1e-5);
    let about_y = rotate_y(FRAC_PI_2, blob(Vec3::Z));
    assert!((about_y.distance_at(Vec3::X).unwrap() + 0.25).abs() < 1e-5);
}

#[test]
fn twist_turns_each_slice_like_rotate() {
    let post = || translate([1.0, 0.0, 0.0], cylinder(0.1));
    let twisted = twist_y(1.0, post());
    // At height pi/2 the post has swung from +x to -z.
    let p = Vec3::new(0.0, std::f32::consts::FRAC_PI_2, -1.0);
    assert!((twisted.distance_at(p).unwrap() + 0.1).abs() < 1e-5);

    let rng = fastrand::Rng::with_seed(21);
    for _ in 0..50 {
        let p = random_point(&rng, 2.0);
        let slice = rotate_y(p.y, post());
        assert!(close(twisted.distance_at(p).unwrap(), slice.distance_at(p).unwrap()));
    }
}

#[test]
fn tree_grows_from_any_leaf() {
    let leaf = || sphere(0.5);
    let seedling = tree_with(1, leaf());
    let p = Vec3::new(0.2, 0.7, -0.1);
    assert_eq!(seedling.distance_at(p).unwrap(), leaf().distance_at(p).unwrap());

    let bar = smooth_box([0.1, 1.2, 0.1], 0.1);
    let rng = fastrand::Rng::with_seed(8);
    let mut differs = false;
    for _ in 0..50 {
        let p = random_point(&rng, 2.0);
        let default = tree(3).distance_at(p).unwrap();
        assert_eq!(default, tree_with(3, bar.clone()).distance_at(p).unwrap());
        let leafy = tree_with(3, leaf()).distance_at(p).unwrap();
        assert!(leafy.is_finite());
        differs |= (leafy - default).abs() > 1e-3;
    }
    assert!(differs);
}

#[test]
fn repeat_is_periodic() {
    let field = repeat([2.0, 2.0, 2.0], sphere(0.5));
    let rng = fastrand::Rng::with_seed(11);
    for _ in 0..100 {
        let p = random_point(&rng, 1.0);
        let d = field.distance_at(p).unwrap();
        let shifted = field.distance_at(p + Vec3::new(4.0, -2.0, 6.0)).unwrap();
        assert!((d - shifted).abs() < 1e-4);
    }
    assert!(close(field.distance_at(Vec3::ZERO).unwrap(), -0.5));
}

#[test]
fn mirror_is_symmetric() {
    let s = mirror(Vec3::X, translate([1.0, 0.0, 0.0], sphere(0.5)));
    let a = s.distance_at(Vec3::new(1.2, 0.3, 0.0)).unwrap();
    let b = s.distance_at(Vec3::new(-1.2, 0.3, 0.0)).unwrap();
    assert!(close(a, b));
}

#[test]
fn expand_and_smooth_box() {
    let fat = expand(0.5, sphere(1.0));
    assert!(fat.distance_at(Vec3::new(1.5, 0.0, 0.0)).unwrap().abs() < 1e-6);

    let rounded = smooth_box([1.0, 1.0, 1.0], 0.2);
    assert!(rounded.distance_at(Vec3::ZERO).unwrap() < 0.0);
    assert!(rounded.distance_at(Vec3::new(0.5, 0.0, 0.0)).unwrap().abs() < 1e-5);
}

#[test]
fn twist_keeps_axis_points_fixed() {
    let s = twist_y(1.5, cuboid([0.5, 2.0, 0.2]));
    let base = cuboid([0.5, 2.0, 0.2]);
    for y in [-1.0, 0.0, 1.0] {
        let p = Vec3::new(0.0, y, 0.0);
        assert!(close(s.distance_at(p).unwrap(), base.distance_at(p).unwrap()));
    }
}

#[test]
fn fractals_are_finite() {
    let bulb = mandelbulb(8.0, 8);
    let gasket = sierpinski(5, tetrahedron());
    let rng = fastrand::Rng::with_seed(5);
    for _ in 0..50 {
        let p = random_point(&rng, 1.5);
        assert!(bulb.distance_at(p).unwrap().is_finite());
        assert!(gasket.distance_at(p).unwrap().is_finite());
    }
    assert!(bulb.distance_at(Vec3::new(0.0, 0.0, 3.0)).unwrap() > 0.0);
}
