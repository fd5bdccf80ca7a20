use glam::Vec3;
use sdf::shape::{sphere, translate, union};
use sdf::{Context, Op, Param, Var};

#[test]
fn identical_subexpressions_share_an_id() {
    let mut cx = Context::new();
    let p = cx.var(Var::Position);
    let offset = cx.constant(Vec3::new(1.0, 0.0, 0.0));
    let a = cx.sub(p, offset);
    let b = cx.sub(p, offset);
    assert_eq!(a, b);
    assert_eq!(cx.node(a).unwrap().name(), cx.node(b).unwrap().name());
}

#[test]
fn distinct_expressions_get_distinct_names() {
    let mut cx = Context::new();
    let p = cx.var(Var::Position);
    let one = cx.splat(1.0);
    let two = cx.splat(2.0);
    let a = cx.add(p, one);
    let b = cx.add(p, two);
    assert_ne!(cx.node(a).unwrap().name(), cx.node(b).unwrap().name());
}

#[test]
fn flatten_orders_dependencies_first_and_once() {
    let shape = union(
        translate([1.0, 0.0, 0.0], sphere(0.5)),
        translate([1.0, 0.0, 0.0], sphere(0.25)),
    );
    let mut cx = Context::new();
    let p = cx.var(Var::Position);
    let root = shape.call(&mut cx, p);
    let order = cx.flatten(&[root]).unwrap();

    let mut seen = std::collections::HashSet::new();
    for &expr in &order {
        for dep in cx.node(expr).unwrap().op.dependencies().iter() {
            assert!(seen.contains(dep), "dependency emitted after its user");
        }
        assert!(seen.insert(expr), "node emitted twice");
    }
    assert_eq!(*order.last().unwrap(), root);
}

#[test]
fn flatten_of_multiple_roots_is_a_union() {
    let mut cx = Context::new();
    let p = cx.var(Var::Position);
    let l = cx.length(p);
    let n = cx.normalize(p);
    let order = cx.flatten(&[l, n, l]).unwrap();
    assert_eq!(order, vec![p, l, n]);
}

#[test]
fn params_build_lazily_in_the_callers_context() {
    let radius = Param::new(|cx| {
        let t = cx.var(Var::Time);
        let half = cx.splat(0.5);
        cx.add(t, half)
    });
    let mut cx = Context::new();
    assert!(cx.is_empty());
    let r = radius.build(&mut cx);
    assert!(matches!(cx.node(r).unwrap().op, Op::Binary(..)));
    assert_eq!(radius.build(&mut cx), r);
}
