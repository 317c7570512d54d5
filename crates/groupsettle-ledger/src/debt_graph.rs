//! Directed graph of bilateral debts with cycle cancellation.
//!
//! Each edge `debtor → creditor` records an outstanding IOU. When a new
//! edge closes a directed cycle (A owes B, B owes C, C owes A), every edge
//! on the cycle is reduced by the cycle's smallest amount. Net positions
//! are unaffected: each member on the cycle loses the same amount on one
//! incoming and one outgoing edge.

use std::collections::{BTreeMap, HashMap, VecDeque};

use groupsettle_types::{
    BalanceMap, GroupSettleError, Iou, MemberAddress, Result, constants::NETTING_EPSILON,
};
use rust_decimal::Decimal;

/// One outstanding bilateral debt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtEdge {
    pub debtor: MemberAddress,
    pub creditor: MemberAddress,
    pub amount: Decimal,
}

/// Per-group bilateral debt graph.
#[derive(Debug, Clone, Default)]
pub struct DebtGraph {
    edges: Vec<DebtEdge>,
}

impl DebtGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Outstanding edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[DebtEdge] {
        &self.edges
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Record an IOU edge, cancelling any cycle it closes.
    ///
    /// Returns the closed cycle path (first address repeated at the end) if
    /// a reduction took place.
    ///
    /// # Errors
    /// Returns [`GroupSettleError::InvalidIou`] for a non-positive amount, a
    /// self-debt, or an edge that would push a net position out of range;
    /// the graph is unchanged.
    pub fn add_iou(&mut self, iou: &Iou) -> Result<Option<Vec<MemberAddress>>> {
        if iou.amount <= Decimal::ZERO {
            return Err(GroupSettleError::InvalidIou {
                reason: format!("amount must be positive, got {}", iou.amount),
            });
        }
        if iou.debtor == iou.creditor {
            return Err(GroupSettleError::InvalidIou {
                reason: format!("{} cannot owe themselves", iou.debtor),
            });
        }

        let cycle = self.find_path(&iou.creditor, &iou.debtor).map(|mut path| {
            path.push(iou.creditor.clone());
            path
        });

        let previous = self.edges.clone();
        self.edges.push(DebtEdge {
            debtor: iou.debtor.clone(),
            creditor: iou.creditor.clone(),
            amount: iou.amount,
        });
        let reduced_by = cycle.as_ref().map(|path| self.reduce_cycle(path));

        if self.checked_nets().is_none() {
            self.edges = previous;
            return Err(GroupSettleError::InvalidIou {
                reason: "balance overflow".into(),
            });
        }

        if let (Some(path), Some(reduced_by)) = (&cycle, reduced_by) {
            tracing::debug!(
                cycle = %render_path(path),
                reduced_by = %reduced_by,
                "cancelled debt cycle"
            );
        }
        Ok(cycle)
    }

    /// Net positions derived from the edges: debtors positive, creditors negative.
    #[must_use]
    pub fn nets(&self) -> BalanceMap {
        // `add_iou` never admits an edge set whose nets overflow.
        self.checked_nets().unwrap_or_default()
    }

    /// Total amount `debtor` owes `creditor` directly, saturating at the
    /// `Decimal` bounds.
    #[must_use]
    pub fn owed(&self, debtor: &MemberAddress, creditor: &MemberAddress) -> Decimal {
        self.edges
            .iter()
            .filter(|e| &e.debtor == debtor && &e.creditor == creditor)
            .fold(Decimal::ZERO, |total, e| total.saturating_add(e.amount))
    }

    fn checked_nets(&self) -> Option<BalanceMap> {
        let mut nets = BTreeMap::new();
        for edge in &self.edges {
            let debit = nets.entry(edge.debtor.clone()).or_insert(Decimal::ZERO);
            *debit = debit.checked_add(edge.amount)?;
            let credit = nets.entry(edge.creditor.clone()).or_insert(Decimal::ZERO);
            *credit = credit.checked_sub(edge.amount)?;
        }
        Some(nets)
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Breadth-first search for a directed path `from → … → to`.
    fn find_path(&self, from: &MemberAddress, to: &MemberAddress) -> Option<Vec<MemberAddress>> {
        let mut adjacency: HashMap<&MemberAddress, Vec<&MemberAddress>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(&edge.debtor).or_default().push(&edge.creditor);
        }

        let mut parents: HashMap<&MemberAddress, Option<&MemberAddress>> = HashMap::new();
        parents.insert(from, None);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == to {
                break;
            }
            for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
                if parents.contains_key(next) {
                    continue;
                }
                parents.insert(next, Some(node));
                queue.push_back(next);
            }
        }

        if !parents.contains_key(to) {
            return None;
        }

        let mut path = Vec::new();
        let mut cursor = Some(to);
        while let Some(node) = cursor {
            path.push(node.clone());
            cursor = parents.get(node).copied().flatten();
        }
        path.reverse();
        Some(path)
    }

    /// Reduce each edge along `path` by the smallest amount on it.
    /// Cycle edges left at or below epsilon are dropped; edges off the
    /// cycle are never touched.
    fn reduce_cycle(&mut self, path: &[MemberAddress]) -> Decimal {
        let mut used = vec![false; self.edges.len()];
        let mut on_cycle = Vec::with_capacity(path.len().saturating_sub(1));

        for pair in path.windows(2) {
            let found = self.edges.iter().enumerate().position(|(idx, e)| {
                !used[idx] && e.debtor == pair[0] && e.creditor == pair[1]
            });
            match found {
                Some(idx) => {
                    used[idx] = true;
                    on_cycle.push(idx);
                }
                // Path came from these edges, so a miss means nothing to reduce.
                None => return Decimal::ZERO,
            }
        }

        let Some(min) = on_cycle.iter().map(|&idx| self.edges[idx].amount).min() else {
            return Decimal::ZERO;
        };

        for &idx in &on_cycle {
            self.edges[idx].amount -= min;
        }
        let mut idx = 0;
        self.edges.retain(|e| {
            let keep = !used[idx] || e.amount > NETTING_EPSILON;
            idx += 1;
            keep
        });
        min
    }
}

fn render_path(path: &[MemberAddress]) -> String {
    path.iter()
        .map(MemberAddress::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
