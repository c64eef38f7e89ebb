//! Runtime evaluation of a parsed expression.
//!
//! A [`Generator`] mirrors the expression tree with one stateful node per
//! AST node. Rows go in through [`Generator::set`], results come out of
//! [`Generator::eval`], and two generators built from the same expression
//! over different rows combine with [`Generator::merge`]. The state of a
//! generator can be shipped elsewhere with [`Generator::write`] and
//! [`Generator::read`].
//!
//! Selector functions (`first`, `top`, ...) pick values from the generators
//! of child groups, supplied through [`ChildData`].

mod accumulator;
mod codec;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ast::{BinOp, Node},
    error::StateError,
    functions::{
        AggregateKind, EvalEnv, FunctionDef, Impl, ScalarFn, SelectorKind, SelectorOptions,
        math,
    },
    value::Val,
};

pub use accumulator::{AccState, Accumulator, AggregateOptions};
pub use codec::STATE_VERSION;

/// Source of the generators of a group's child groups.
///
/// Every child generator must come from the same expression as the parent.
pub trait ChildData {
    fn child_generators(&self) -> Vec<&Generator>;
}

impl ChildData for [Generator] {
    fn child_generators(&self) -> Vec<&Generator> {
        self.iter().collect()
    }
}

impl ChildData for Vec<Generator> {
    fn child_generators(&self) -> Vec<&Generator> {
        self.iter().collect()
    }
}

impl ChildData for [&Generator] {
    fn child_generators(&self) -> Vec<&Generator> {
        self.to_vec()
    }
}

impl ChildData for Vec<&Generator> {
    fn child_generators(&self) -> Vec<&Generator> {
        self.clone()
    }
}

/// Chooses a value across the generators of sibling groups.
pub trait Selector {
    /// Pure function of the supplied children; the receiver is not altered.
    fn select(&self, children: &dyn ChildData) -> Val;
}

#[derive(Debug, Clone)]
enum GenNode {
    Static(Val),
    Field {
        index: usize,
        value: Val,
    },
    Negate(Box<GenNode>),
    Binary {
        op: BinOp,
        left: Box<GenNode>,
        right: Box<GenNode>,
    },
    Scalar {
        def: &'static FunctionDef,
        imp: ScalarFn,
        args: Vec<GenNode>,
    },
    Aggregate {
        kind: AggregateKind,
        options: AggregateOptions,
        child: Option<Box<GenNode>>,
        acc: Accumulator,
    },
    Selector {
        kind: SelectorKind,
        options: SelectorOptions,
        child: Box<GenNode>,
    },
}

/// Serialized form of a node's state.
#[derive(Debug, Serialize, Deserialize)]
enum NodeState {
    Empty,
    Field(Val),
    Nested(Vec<NodeState>),
    Aggregate {
        acc: Accumulator,
        child: Option<Box<NodeState>>,
    },
}

/// Stateful evaluator for one group of rows.
///
/// Not synchronized: one thread drives a generator at a time. Independent
/// generators may run in parallel and be merged afterwards.
#[derive(Debug, Clone)]
pub struct Generator {
    root: GenNode,
    env: Arc<EvalEnv>,
}

impl Generator {
    pub(crate) fn new(node: &Node, env: Arc<EvalEnv>) -> Self {
        let root = build(node, &env);
        Generator { root, env }
    }

    /// Feed one row. `row` is ordered to match the field index the
    /// expression was parsed with; missing slots read as Null.
    pub fn set(&mut self, row: &[Val]) {
        self.root.set(row, &self.env);
    }

    /// Current result. Selectors choose from their own value only.
    pub fn eval(&self) -> Val {
        self.root.eval(None, &self.env)
    }

    /// Current result, with selectors choosing across `children`.
    pub fn eval_with<C: ChildData + ?Sized>(&self, children: &C) -> Val {
        let peers: Vec<&GenNode> = children.child_generators().into_iter().map(|g| &g.root).collect();
        self.root.eval(Some(peers.as_slice()), &self.env)
    }

    /// Whether this generator picks values from child groups.
    pub fn as_selector(&self) -> Option<&dyn Selector> {
        if self.root.has_selector() {
            Some(self)
        } else {
            None
        }
    }

    /// Fold another generator built from the same expression into this one.
    ///
    /// Aggregate results afterwards equal those of a single generator fed
    /// both row streams. Field values take the other generator's latest row
    /// unless it is Null, so partials merged in row order end on the last row.
    pub fn merge(&mut self, other: &Generator) -> Result<(), StateError> {
        debug!("merging generator state");
        self.root.merge(&other.root)
    }

    /// Append this generator's state to `out` as one versioned frame.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<(), StateError> {
        codec::encode(&self.root.state(), out)
    }

    /// Replace this generator's state with a frame read from the front of
    /// `input`, advancing it past the frame.
    ///
    /// The generator must come from the same expression as the writer.
    pub fn read(&mut self, input: &mut &[u8]) -> Result<(), StateError> {
        let state: NodeState = codec::decode(input)?;
        self.root.restore(state).inspect_err(|e| debug!(error = %e, "generator state rejected"))
    }
}

impl Selector for Generator {
    fn select(&self, children: &dyn ChildData) -> Val {
        self.eval_with(children)
    }
}

fn literal_count(args: &[Node], index: usize) -> Option<usize> {
    args.get(index)
        .and_then(Node::as_literal)
        .and_then(Val::to_long)
        .map(|n| usize::try_from(n).unwrap_or(0))
}

fn build(node: &Node, env: &EvalEnv) -> GenNode {
    match node {
        Node::Literal(val) => GenNode::Static(val.clone()),
        Node::Field { index, .. } => GenNode::Field {
            index: *index,
            value: Val::Null,
        },
        Node::Negate(inner) => GenNode::Negate(Box::new(build(inner, env))),
        Node::Brackets(inner) => build(inner, env),
        Node::Binary { op, left, right } => GenNode::Binary {
            op: *op,
            left: Box::new(build(left, env)),
            right: Box::new(build(right, env)),
        },
        Node::Call(call) => match call.signature().imp {
            Impl::Scalar(imp) => GenNode::Scalar {
                def: call.def,
                imp,
                args: call.args.iter().map(|a| build(a, env)).collect(),
            },
            Impl::Aggregate(kind) => {
                let mut options = kind.default_options();
                if let Some(delimiter) = call.args.get(1).and_then(Node::as_literal) {
                    options.delimiter = delimiter.to_text();
                }
                if let Some(limit) = literal_count(&call.args, 2) {
                    options.limit = limit;
                }
                options.limit = options.limit.min(env.context.max_string_length);
                GenNode::Aggregate {
                    kind,
                    options,
                    child: call.args.first().map(|a| Box::new(build(a, env))),
                    acc: Accumulator::new(kind),
                }
            }
            Impl::Selector(kind) => {
                let mut options = SelectorOptions::default();
                if kind == SelectorKind::Nth {
                    if let Some(position) = literal_count(&call.args, 1) {
                        options.position = position;
                    }
                } else {
                    if let Some(delimiter) = call.args.get(1).and_then(Node::as_literal) {
                        options.delimiter = delimiter.to_text();
                    }
                    if let Some(limit) = literal_count(&call.args, 2) {
                        options.limit = limit;
                    }
                }
                let child = match call.args.first() {
                    Some(arg) => build(arg, env),
                    None => GenNode::Static(Val::Null),
                };
                GenNode::Selector {
                    kind,
                    options,
                    child: Box::new(child),
                }
            }
        },
    }
}

fn shape_mismatch(what: &str) -> StateError {
    StateError::ShapeMismatch(format!("{} nodes differ", what))
}

impl GenNode {
    fn name(&self) -> &'static str {
        match self {
            GenNode::Static(_) => "static",
            GenNode::Field { .. } => "field",
            GenNode::Negate(_) => "negate",
            GenNode::Binary { .. } => "binary",
            GenNode::Scalar { .. } => "function",
            GenNode::Aggregate { .. } => "aggregate",
            GenNode::Selector { .. } => "selector",
        }
    }

    fn has_selector(&self) -> bool {
        match self {
            GenNode::Static(_) | GenNode::Field { .. } => false,
            GenNode::Negate(inner) => inner.has_selector(),
            GenNode::Binary { left, right, .. } => left.has_selector() || right.has_selector(),
            GenNode::Scalar { args, .. } => args.iter().any(GenNode::has_selector),
            GenNode::Aggregate { child, .. } => child.as_ref().is_some_and(|c| c.has_selector()),
            GenNode::Selector { .. } => true,
        }
    }

    fn set(&mut self, row: &[Val], env: &EvalEnv) {
        match self {
            GenNode::Static(_) => {}
            GenNode::Field { index, value } => {
                *value = row.get(*index).cloned().unwrap_or(Val::Null);
            }
            GenNode::Negate(inner) => inner.set(row, env),
            GenNode::Binary { left, right, .. } => {
                left.set(row, env);
                right.set(row, env);
            }
            GenNode::Scalar { args, .. } => args.iter_mut().for_each(|a| a.set(row, env)),
            GenNode::Aggregate {
                options, child, acc, ..
            } => match child {
                Some(child) => {
                    child.set(row, env);
                    acc.add(&child.eval(None, env), options);
                }
                None => acc.add(&Val::Null, options),
            },
            GenNode::Selector { child, .. } => child.set(row, env),
        }
    }

    /// `peers` are the matching nodes of the child groups' generators, when
    /// child data was supplied.
    fn eval(&self, peers: Option<&[&GenNode]>, env: &EvalEnv) -> Val {
        match self {
            GenNode::Static(val) => val.clone(),
            GenNode::Field { value, .. } => value.clone(),
            GenNode::Negate(inner) => {
                let peers = project(peers, |p| match p {
                    GenNode::Negate(inner) => Some(inner.as_ref()),
                    _ => None,
                });
                math::negate(&inner.eval(peers.as_deref(), env))
            }
            GenNode::Binary { op, left, right } => {
                let left_peers = project(peers, |p| match p {
                    GenNode::Binary { left, .. } => Some(left.as_ref()),
                    _ => None,
                });
                let right_peers = project(peers, |p| match p {
                    GenNode::Binary { right, .. } => Some(right.as_ref()),
                    _ => None,
                });
                op.apply(
                    &left.eval(left_peers.as_deref(), env),
                    &right.eval(right_peers.as_deref(), env),
                )
            }
            GenNode::Scalar { def, imp, args } => {
                let mut values = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let arg_peers = project(peers, |p| match p {
                        GenNode::Scalar { args, .. } => args.get(i),
                        _ => None,
                    });
                    let val = arg.eval(arg_peers.as_deref(), env);
                    if val.is_error() && !def.lenient {
                        return val;
                    }
                    values.push(val);
                }
                imp(&values, env)
            }
            GenNode::Aggregate {
                kind, options, acc, ..
            } => {
                if *kind == AggregateKind::CountGroups {
                    let groups = peers.map_or(0, |p| p.len());
                    return Val::Long(i64::try_from(groups).unwrap_or(i64::MAX));
                }
                acc.value(*kind, options)
            }
            GenNode::Selector {
                kind,
                options,
                child,
            } => {
                let values: Vec<Val> = match peers {
                    Some(peers) => peers
                        .iter()
                        .filter_map(|p| match p {
                            GenNode::Selector { child, .. } => Some(child.eval(None, env)),
                            _ => None,
                        })
                        .collect(),
                    None => vec![child.eval(None, env)],
                };
                kind.select(&values, options)
            }
        }
    }

    fn merge(&mut self, other: &GenNode) -> Result<(), StateError> {
        match (self, other) {
            (GenNode::Static(_), GenNode::Static(_)) => Ok(()),
            (GenNode::Field { value, .. }, GenNode::Field { value: theirs, .. }) => {
                if !theirs.is_null() {
                    *value = theirs.clone();
                }
                Ok(())
            }
            (GenNode::Negate(a), GenNode::Negate(b)) => a.merge(b),
            (
                GenNode::Binary { op, left, right },
                GenNode::Binary {
                    op: their_op,
                    left: their_left,
                    right: their_right,
                },
            ) if op == their_op => {
                left.merge(their_left)?;
                right.merge(their_right)
            }
            (GenNode::Scalar { def, args, .. }, GenNode::Scalar { def: their_def, args: theirs, .. })
                if def.name == their_def.name && args.len() == theirs.len() =>
            {
                args.iter_mut().zip(theirs).try_for_each(|(a, b)| a.merge(b))
            }
            (
                GenNode::Aggregate {
                    kind,
                    options,
                    child,
                    acc,
                },
                GenNode::Aggregate {
                    kind: their_kind,
                    child: their_child,
                    acc: their_acc,
                    ..
                },
            ) if kind == their_kind => {
                *acc = acc.merged(their_acc, options)?;
                match (child, their_child) {
                    (Some(a), Some(b)) => a.merge(b),
                    (None, None) => Ok(()),
                    _ => Err(shape_mismatch("aggregate")),
                }
            }
            (
                GenNode::Selector { kind, child, .. },
                GenNode::Selector {
                    kind: their_kind,
                    child: their_child,
                    ..
                },
            ) if kind == their_kind => child.merge(their_child),
            (mine, theirs) => Err(StateError::ShapeMismatch(format!(
                "cannot merge {} node with {} node",
                mine.name(),
                theirs.name()
            ))),
        }
    }

    fn state(&self) -> NodeState {
        match self {
            GenNode::Static(_) => NodeState::Empty,
            GenNode::Field { value, .. } => NodeState::Field(value.clone()),
            GenNode::Negate(inner) => NodeState::Nested(vec![inner.state()]),
            GenNode::Binary { left, right, .. } => NodeState::Nested(vec![left.state(), right.state()]),
            GenNode::Scalar { args, .. } => NodeState::Nested(args.iter().map(GenNode::state).collect()),
            GenNode::Aggregate { child, acc, .. } => NodeState::Aggregate {
                acc: acc.clone(),
                child: child.as_ref().map(|c| Box::new(c.state())),
            },
            GenNode::Selector { child, .. } => NodeState::Nested(vec![child.state()]),
        }
    }

    fn restore(&mut self, state: NodeState) -> Result<(), StateError> {
        match (self, state) {
            (GenNode::Static(_), NodeState::Empty) => Ok(()),
            (GenNode::Field { value, .. }, NodeState::Field(stored)) => {
                *value = stored;
                Ok(())
            }
            (GenNode::Negate(inner), NodeState::Nested(states))
            | (GenNode::Selector { child: inner, .. }, NodeState::Nested(states)) => {
                restore_all(&mut [inner.as_mut()], states)
            }
            (GenNode::Binary { left, right, .. }, NodeState::Nested(states)) => {
                restore_all(&mut [left.as_mut(), right.as_mut()], states)
            }
            (GenNode::Scalar { args, .. }, NodeState::Nested(states)) => {
                let mut nodes: Vec<&mut GenNode> = args.iter_mut().collect();
                restore_all(&mut nodes, states)
            }
            (
                GenNode::Aggregate { kind, child, acc, .. },
                NodeState::Aggregate {
                    acc: stored,
                    child: stored_child,
                },
            ) => {
                if std::mem::discriminant(acc.state()) != std::mem::discriminant(stored.state()) {
                    return Err(StateError::ShapeMismatch(format!(
                        "stored accumulator does not fit {:?}",
                        kind
                    )));
                }
                match (child, stored_child) {
                    (Some(c), Some(s)) => c.restore(*s)?,
                    (None, None) => {}
                    _ => return Err(shape_mismatch("aggregate")),
                }
                *acc = stored;
                Ok(())
            }
            (node, _) => Err(StateError::ShapeMismatch(format!(
                "stored state does not fit {} node",
                node.name()
            ))),
        }
    }
}

fn restore_all(nodes: &mut [&mut GenNode], states: Vec<NodeState>) -> Result<(), StateError> {
    if nodes.len() != states.len() {
        return Err(StateError::ShapeMismatch(format!(
            "expected {} child states, found {}",
            nodes.len(),
            states.len()
        )));
    }
    nodes
        .iter_mut()
        .zip(states)
        .try_for_each(|(node, state)| node.restore(state))
}

/// Map each peer to its matching sub-node, dropping peers of another shape.
fn project<'a>(
    peers: Option<&[&'a GenNode]>,
    pick: impl Fn(&'a GenNode) -> Option<&'a GenNode>,
) -> Option<Vec<&'a GenNode>> {
    peers.map(|peers| peers.iter().filter_map(|p| pick(*p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldIndex, Parser};

    fn generator(expr: &str) -> Generator {
        let mut fields = FieldIndex::new();
        fields.create("val1");
        fields.create("val2");
        Parser::default().parse(&fields, expr).unwrap().create_generator()
    }

    #[test]
    fn test_scalar_keeps_latest_row() {
        let mut g = generator("round(${val1}+count(), 2)");
        g.set(&[Val::Double(1.34)]);
        g.set(&[Val::Double(1.8655)]);
        assert_eq!(g.eval(), Val::Double(3.87));
    }

    #[test]
    fn test_errors_short_circuit_strict_functions() {
        let mut g = generator("concat(${val1}, 'x')");
        g.set(&[Val::error("bad")]);
        assert_eq!(g.eval(), Val::error("bad"));

        let mut g = generator("isError(${val1})");
        g.set(&[Val::error("bad")]);
        assert_eq!(g.eval(), Val::Boolean(true));
    }

    #[test]
    fn test_count_groups_uses_child_data() {
        let g = generator("countGroups()");
        let children = vec![generator("countGroups()"), generator("countGroups()")];
        assert_eq!(g.eval(), Val::Long(0));
        assert_eq!(g.eval_with(&children), Val::Long(2));
    }

    #[test]
    fn test_selector_detection() {
        assert!(generator("first(${val1})").as_selector().is_some());
        assert!(generator("sum(${val1})").as_selector().is_none());
    }

    #[test]
    fn test_field_merge_ends_on_last_row() {
        let mut first = generator("${val1}");
        first.set(&[Val::Long(1)]);
        let mut second = generator("${val1}");
        second.set(&[Val::Long(2)]);

        let mut merged = generator("${val1}");
        merged.merge(&first).unwrap();
        merged.merge(&second).unwrap();
        merged.merge(&generator("${val1}")).unwrap();
        assert_eq!(merged.eval(), Val::Long(2));
    }

    #[test]
    fn test_merge_rejects_other_expressions() {
        let mut a = generator("sum(${val1})");
        let b = generator("count()");
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_read_rejects_other_expressions() {
        let mut buf = Vec::new();
        generator("sum(${val1})").write(&mut buf).unwrap();
        let mut g = generator("max(${val1})");
        assert!(matches!(
            g.read(&mut buf.as_slice()),
            Err(StateError::ShapeMismatch(_))
        ));
    }
}
