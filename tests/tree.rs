//! Expression tree integration tests.
//!
//! Property-based checks of structural equality, hashing and deep cloning over randomly
//! shaped arithmetic expressions, plus a few editing scenarios through the public API.

use std::collections::HashSet;

use classscope::{
    classfile::Type,
    tree::{ArithOp, Constant, Direction, NodeId, Tree, TreeVisitor},
    Result,
};
use proptest::prelude::*;
use strum::IntoEnumIterator;

/// Shape of an expression, built into a tree on demand.
#[derive(Debug, Clone)]
enum Shape {
    Local(u16),
    Int(i32),
    Arith(ArithOp, Box<Shape>, Box<Shape>),
}

impl Shape {
    fn build(&self, tree: &mut Tree) -> Result<NodeId> {
        Ok(match self {
            Shape::Local(index) => tree.new_local(*index, Type::Int),
            Shape::Int(value) => tree.new_constant(Constant::Int(*value)),
            Shape::Arith(op, left, right) => {
                let left = left.build(tree)?;
                let right = right.build(tree)?;
                tree.new_arith(*op, left, right, Type::Int)?
            }
        })
    }
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (0u16..4).prop_map(Shape::Local),
        (-8i32..8).prop_map(Shape::Int),
    ];
    let ops: Vec<ArithOp> = ArithOp::iter().collect();
    leaf.prop_recursive(4, 32, 2, move |inner| {
        (prop::sample::select(ops.clone()), inner.clone(), inner)
            .prop_map(|(op, left, right)| Shape::Arith(op, Box::new(left), Box::new(right)))
    })
}

proptest! {
    #[test]
    fn prop_equal_shapes_are_equal(shape in shape()) {
        let mut tree = Tree::new();
        let a = shape.build(&mut tree).unwrap();
        let b = shape.build(&mut tree).unwrap();

        prop_assert_ne!(a, b);
        prop_assert!(tree.equals_expr(a, b));
        prop_assert_eq!(tree.expr_hash(a), tree.expr_hash(b));

        let keys: HashSet<_> = [a, b].iter().map(|&id| tree.expr_key(id)).collect();
        prop_assert_eq!(keys.len(), 1);
    }

    #[test]
    fn prop_different_shapes_differ(left in shape(), right in shape()) {
        let mut tree = Tree::new();
        let a = left.build(&mut tree).unwrap();
        let b = right.build(&mut tree).unwrap();

        if tree.equals_expr(a, b) {
            prop_assert_eq!(tree.expr_hash(a), tree.expr_hash(b));
            prop_assert_eq!(tree.display(a).to_string(), tree.display(b).to_string());
        } else {
            prop_assert_ne!(tree.display(a).to_string(), tree.display(b).to_string());
        }
    }

    #[test]
    fn prop_clone_is_independent(shape in shape()) {
        let mut tree = Tree::new();
        let original = shape.build(&mut tree).unwrap();
        let reference = shape.build(&mut tree).unwrap();

        let copy = tree.clone_subtree(original).unwrap();
        prop_assert!(tree.equals_expr(copy, original));
        prop_assert_eq!(tree.parent(copy).unwrap(), None);

        let children = tree.children(copy).unwrap();
        for (child, source) in children.iter().zip(tree.children(original).unwrap()) {
            prop_assert_ne!(*child, source);
            prop_assert_eq!(tree.parent(*child).unwrap(), Some(copy));
        }

        if let Some(&first) = children.first() {
            let marker = tree.new_constant(Constant::String("marker".into()));
            tree.replace(first, marker).unwrap();
            prop_assert!(!tree.equals_expr(copy, original));
            prop_assert!(tree.equals_expr(original, reference));
            prop_assert!(tree.is_valid(tree.children(original).unwrap()[0]));
        }
    }
}

/// Records the display form of every expression it enters.
struct Trace {
    direction: Direction,
    seen: Vec<String>,
}

impl TreeVisitor for Trace {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn visit_expr(&mut self, tree: &Tree, id: NodeId) {
        self.seen.push(tree.display(id).to_string());
        tree.visit_children(id, self);
    }
}

#[test]
fn test_visit_directions() -> Result<()> {
    let mut tree = Tree::new();
    let x = tree.new_local(1, Type::Int);
    let y = tree.new_local(2, Type::Int);
    let product = tree.new_arith(ArithOp::Mul, x, y, Type::Int)?;
    let two = tree.new_constant(Constant::Int(2));
    let sum = tree.new_arith(ArithOp::Add, product, two, Type::Int)?;

    let mut forward = Trace {
        direction: Direction::Forward,
        seen: Vec::new(),
    };
    tree.visit(sum, &mut forward);
    assert_eq!(
        forward.seen,
        ["((l1 * l2) + 2)", "(l1 * l2)", "l1", "l2", "2"]
    );

    let mut reverse = Trace {
        direction: Direction::Reverse,
        seen: Vec::new(),
    };
    tree.visit(sum, &mut reverse);
    assert_eq!(
        reverse.seen,
        ["((l1 * l2) + 2)", "2", "(l1 * l2)", "l2", "l1"]
    );
    Ok(())
}

#[test]
fn test_replace_keeps_definition_role() -> Result<()> {
    let mut tree = Tree::new();
    let target = tree.new_local(0, Type::Int);
    let value = tree.new_constant(Constant::Int(1));
    let store = tree.new_store(target, value)?;
    assert!(tree.is_def(target)?);

    let renamed = tree.new_local(4, Type::Int);
    tree.replace(target, renamed)?;
    assert!(tree.is_def(renamed)?);
    assert!(!tree.is_valid(target));
    assert_eq!(tree.parent(renamed)?, Some(store));
    assert_eq!(tree.display(store).to_string(), "l4 := 1");
    Ok(())
}

#[test]
fn test_cleanup_invalidates_subtree() -> Result<()> {
    let mut tree = Tree::new();
    let x = tree.new_local(0, Type::Int);
    let one = tree.new_constant(Constant::Int(1));
    let sum = tree.new_arith(ArithOp::Sub, x, one, Type::Int)?;
    let stmt = tree.new_expr_stmt(sum)?;
    let live = tree.live_count();

    tree.cleanup(sum)?;
    for id in [sum, x, one] {
        assert!(!tree.is_valid(id));
    }
    assert!(tree.is_valid(stmt));
    assert_eq!(tree.live_count(), live - 3);
    assert!(tree.cleanup(sum).is_err());
    Ok(())
}
