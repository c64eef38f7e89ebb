//! Accumulator state of aggregate functions.
//!
//! An accumulator is owned by exactly one generator node. Combining two
//! partial accumulators is the pure function [`Accumulator::merged`], which
//! is associative and commutative for every kind. Where values that compare
//! equal differ in type or text, the representative kept is the lowest under
//! [`canonical_cmp`], whichever side it came from.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    compare::{OrderedVal, canonical_cmp},
    error::StateError,
    functions::AggregateKind,
    value::Val,
};

/// Options read from the constant arguments of `distinct` and `joining`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    pub delimiter: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccState {
    Count(u64),
    Unique(BTreeSet<OrderedVal>),
    Sum(Option<f64>),
    Min(Option<Val>),
    Max(Option<Val>),
    Mean { total: f64, count: u64 },
    /// Welford running moments
    Moments { count: u64, mean: f64, m2: f64 },
    /// Lowest `limit` distinct values
    Distinct(BTreeSet<OrderedVal>),
    /// Lowest `limit` values with duplicates, in canonical order
    Joined(Vec<Val>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    state: AccState,
    /// First error seen; once set the aggregate evaluates to it
    error: Option<String>,
}

impl Accumulator {
    pub fn new(kind: AggregateKind) -> Self {
        let state = match kind {
            AggregateKind::Count | AggregateKind::CountGroups => AccState::Count(0),
            AggregateKind::CountUnique => AccState::Unique(BTreeSet::new()),
            AggregateKind::Sum => AccState::Sum(None),
            AggregateKind::Min => AccState::Min(None),
            AggregateKind::Max => AccState::Max(None),
            AggregateKind::Average => AccState::Mean { total: 0.0, count: 0 },
            AggregateKind::StDev | AggregateKind::Variance => AccState::Moments {
                count: 0,
                mean: 0.0,
                m2: 0.0,
            },
            AggregateKind::Distinct => AccState::Distinct(BTreeSet::new()),
            AggregateKind::Joining => AccState::Joined(Vec::new()),
        };
        Accumulator { state, error: None }
    }

    pub fn state(&self) -> &AccState {
        &self.state
    }

    /// Fold one row's value in.
    ///
    /// Null values are skipped, as are values with no numeric view for the
    /// numeric kinds. An error sticks.
    pub fn add(&mut self, val: &Val, options: &AggregateOptions) {
        if let AccState::Count(n) = &mut self.state {
            *n += 1;
            return;
        }
        match val {
            Val::Error(m) => {
                if self.error.is_none() {
                    self.error = Some(m.clone());
                }
                return;
            }
            Val::Null => return,
            _ => {}
        }

        match &mut self.state {
            AccState::Count(_) => {}
            AccState::Unique(values) => {
                insert_canonical(values, val.clone());
            }
            AccState::Sum(total) => {
                if let Some(d) = val.to_double() {
                    *total = Some(total.unwrap_or(0.0) + d);
                }
            }
            AccState::Min(best) => {
                if best.as_ref().is_none_or(|b| canonical_cmp(val, b).is_lt()) {
                    *best = Some(val.clone());
                }
            }
            AccState::Max(best) => {
                if best.as_ref().is_none_or(|b| canonical_cmp(val, b).is_gt()) {
                    *best = Some(val.clone());
                }
            }
            AccState::Mean { total, count } => {
                if let Some(d) = val.to_double() {
                    *total += d;
                    *count += 1;
                }
            }
            AccState::Moments { count, mean, m2 } => {
                if let Some(d) = val.to_double() {
                    *count += 1;
                    let delta = d - *mean;
                    *mean += delta / *count as f64;
                    *m2 += delta * (d - *mean);
                }
            }
            AccState::Distinct(values) => {
                insert_canonical(values, val.clone());
                truncate_set(values, options.limit);
            }
            AccState::Joined(values) => {
                let at = values.partition_point(|v| canonical_cmp(v, val).is_le());
                if at < options.limit {
                    values.insert(at, val.clone());
                    values.truncate(options.limit);
                }
            }
        }
    }

    /// Combine two partial accumulators of the same kind.
    pub fn merged(&self, other: &Accumulator, options: &AggregateOptions) -> Result<Accumulator, StateError> {
        // Keep the smaller message so the result does not depend on order
        let error = match (&self.error, &other.error) {
            (Some(a), Some(b)) => Some(a.min(b).clone()),
            (a, b) => a.clone().or_else(|| b.clone()),
        };

        let state = match (&self.state, &other.state) {
            (AccState::Count(a), AccState::Count(b)) => AccState::Count(a + b),
            (AccState::Unique(a), AccState::Unique(b)) => AccState::Unique(union(a, b)),
            (AccState::Sum(a), AccState::Sum(b)) => AccState::Sum(match (a, b) {
                (Some(x), Some(y)) => Some(x + y),
                (x, y) => x.or(*y),
            }),
            (AccState::Min(a), AccState::Min(b)) => AccState::Min(pick(a, b, |x, y| canonical_cmp(x, y).is_le())),
            (AccState::Max(a), AccState::Max(b)) => AccState::Max(pick(a, b, |x, y| canonical_cmp(x, y).is_ge())),
            (
                AccState::Mean { total: ta, count: ca },
                AccState::Mean { total: tb, count: cb },
            ) => AccState::Mean {
                total: ta + tb,
                count: ca + cb,
            },
            (
                AccState::Moments { count: na, mean: ma, m2: m2a },
                AccState::Moments { count: nb, mean: mb, m2: m2b },
            ) => merge_moments((*na, *ma, *m2a), (*nb, *mb, *m2b)),
            (AccState::Distinct(a), AccState::Distinct(b)) => {
                let mut values = union(a, b);
                truncate_set(&mut values, options.limit);
                AccState::Distinct(values)
            }
            (AccState::Joined(a), AccState::Joined(b)) => {
                let mut values: Vec<Val> = a.iter().chain(b).cloned().collect();
                values.sort_by(canonical_cmp);
                values.truncate(options.limit);
                AccState::Joined(values)
            }
            (a, b) => {
                return Err(StateError::ShapeMismatch(format!(
                    "cannot merge accumulator {:?} with {:?}",
                    state_name(a),
                    state_name(b)
                )));
            }
        };
        Ok(Accumulator { state, error })
    }

    /// Current result of the aggregate.
    pub fn value(&self, kind: AggregateKind, options: &AggregateOptions) -> Val {
        if let Some(m) = &self.error {
            if !matches!(kind, AggregateKind::Count | AggregateKind::CountGroups) {
                return Val::Error(m.clone());
            }
        }
        match &self.state {
            AccState::Count(n) => Val::Long(*n as i64),
            AccState::Unique(values) => Val::Integer(i32::try_from(values.len()).unwrap_or(i32::MAX)),
            AccState::Sum(total) => total.map_or(Val::Null, Val::Double),
            AccState::Min(best) | AccState::Max(best) => best.clone().unwrap_or(Val::Null),
            AccState::Mean { total, count } => {
                if *count == 0 {
                    Val::Null
                } else {
                    Val::Double(total / *count as f64)
                }
            }
            AccState::Moments { count, m2, .. } => {
                if *count == 0 {
                    return Val::Null;
                }
                let variance = m2 / *count as f64;
                if kind == AggregateKind::StDev {
                    Val::Double(variance.sqrt())
                } else {
                    Val::Double(variance)
                }
            }
            AccState::Distinct(values) => Val::String(
                values
                    .iter()
                    .map(|v| v.0.to_text())
                    .collect::<Vec<_>>()
                    .join(&options.delimiter),
            ),
            AccState::Joined(values) => Val::String(
                values
                    .iter()
                    .map(Val::to_text)
                    .collect::<Vec<_>>()
                    .join(&options.delimiter),
            ),
        }
    }
}

fn pick(a: &Option<Val>, b: &Option<Val>, keep_left: fn(&Val, &Val) -> bool) -> Option<Val> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if keep_left(x, y) { x.clone() } else { y.clone() }),
        (x, y) => x.clone().or_else(|| y.clone()),
    }
}

/// Chan et al. parallel combination of two sets of running moments.
fn merge_moments(a: (u64, f64, f64), b: (u64, f64, f64)) -> AccState {
    let (na, ma, m2a) = a;
    let (nb, mb, m2b) = b;
    if na == 0 {
        return AccState::Moments { count: nb, mean: mb, m2: m2b };
    }
    if nb == 0 {
        return AccState::Moments { count: na, mean: ma, m2: m2a };
    }
    let n = na + nb;
    let delta = mb - ma;
    let mean = ma + delta * nb as f64 / n as f64;
    let m2 = m2a + m2b + delta * delta * na as f64 * nb as f64 / n as f64;
    AccState::Moments { count: n, mean, m2 }
}

/// Insert `val`, replacing an equal member when `val` is canonically lower.
fn insert_canonical(values: &mut BTreeSet<OrderedVal>, val: Val) {
    let replace = values
        .get(&OrderedVal(val.clone()))
        .is_none_or(|existing| canonical_cmp(&val, &existing.0).is_lt());
    if replace {
        values.replace(OrderedVal(val));
    }
}

fn union(a: &BTreeSet<OrderedVal>, b: &BTreeSet<OrderedVal>) -> BTreeSet<OrderedVal> {
    let mut values = a.clone();
    for v in b {
        insert_canonical(&mut values, v.0.clone());
    }
    values
}

fn truncate_set(values: &mut BTreeSet<OrderedVal>, limit: usize) {
    while values.len() > limit {
        values.pop_last();
    }
}

fn state_name(state: &AccState) -> &'static str {
    match state {
        AccState::Count(_) => "count",
        AccState::Unique(_) => "unique",
        AccState::Sum(_) => "sum",
        AccState::Min(_) => "min",
        AccState::Max(_) => "max",
        AccState::Mean { .. } => "mean",
        AccState::Moments { .. } => "moments",
        AccState::Distinct(_) => "distinct",
        AccState::Joined(_) => "joined",
    }
}
