use std::collections::HashSet;
use log::{debug, info, warn};

use crate::core::{ColumnDefinition, EmmError, Result, TableDefinition};
use super::{PermutationKey, PermutationPolicy};

/// Past this many columns an exhaustive run creates more tables than anyone
/// wants to benchmark.
const EXHAUSTIVE_WARN_COLUMNS: usize = 8;

/// Hard ceiling for exhaustive runs: 9! orderings are still enumerable, 10! are not.
const EXHAUSTIVE_MAX_COLUMNS: usize = 9;

/// The orderings produced for one table, in generation order.
#[derive(Debug, Clone)]
pub struct PermutationSet {
    table: TableDefinition,
    policy: PermutationPolicy,
    orderings: Vec<(PermutationKey, Vec<usize>)>,
}

impl PermutationSet {
    fn new(table: TableDefinition, policy: PermutationPolicy) -> Self {
        Self {
            table,
            policy,
            orderings: Vec::new(),
        }
    }

    fn push(&mut self, indices: Vec<usize>, seen: &mut HashSet<PermutationKey>) {
        let key = PermutationKey::from_indices(&indices);
        if seen.insert(key.clone()) {
            self.orderings.push((key, indices));
        } else {
            debug!("Ordering {} already generated", key);
        }
    }

    pub fn table(&self) -> &TableDefinition {
        &self.table
    }

    pub fn policy(&self) -> PermutationPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.orderings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orderings.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PermutationKey> {
        self.orderings.iter().map(|(key, _)| key)
    }

    pub fn contains(&self, key: &PermutationKey) -> bool {
        self.orderings.iter().any(|(k, _)| k == key)
    }

    /// The columns of one ordering, in permuted order.
    pub fn columns(&self, key: &PermutationKey) -> Option<Vec<&ColumnDefinition>> {
        self.orderings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, indices)| self.resolve(indices))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PermutationKey, Vec<&ColumnDefinition>)> {
        self.orderings
            .iter()
            .map(|(key, indices)| (key, self.resolve(indices)))
    }

    fn resolve(&self, indices: &[usize]) -> Vec<&ColumnDefinition> {
        let columns = self.table.columns();
        indices.iter().filter_map(|&i| columns.get(i)).collect()
    }
}

/// Enumerate candidate orderings of `table`'s columns under `policy`.
pub fn generate(table: TableDefinition, policy: PermutationPolicy) -> Result<PermutationSet> {
    if table.columns().is_empty() {
        return Err(EmmError::ParseError(format!(
            "Table '{}' of project '{}' has no columns to permute",
            table.table_name().unwrap_or("<unnamed>"),
            table.project()
        )));
    }

    let mut set = PermutationSet::new(table, policy);
    let mut seen = HashSet::new();

    match policy {
        PermutationPolicy::Exhaustive => {
            let count = set.table.column_count();
            if count > EXHAUSTIVE_MAX_COLUMNS {
                return Err(EmmError::PolicyError(format!(
                    "Policy '{}' over {} columns exceeds the limit of {} columns, use policy '{}'",
                    policy,
                    count,
                    EXHAUSTIVE_MAX_COLUMNS,
                    PermutationPolicy::ClusterByDeclaredType
                )));
            }
            if count > EXHAUSTIVE_WARN_COLUMNS {
                warn!("Exhaustive permutations over {} columns, this produces {}! tables", count, count);
            }
            for indices in Orderings::new(count) {
                set.push(indices, &mut seen);
            }
        }
        PermutationPolicy::ClusterByDeclaredType => {
            let groups = group_by_declared_type(set.table.columns());
            debug!("Found {} distinct declared types", groups.len());
            for group_order in Orderings::new(groups.len()) {
                if is_identity(&group_order) {
                    // the original layout is the baseline, not a candidate
                    continue;
                }
                let indices = group_order
                    .iter()
                    .flat_map(|&g| groups[g].iter().copied())
                    .collect();
                set.push(indices, &mut seen);
            }
        }
        PermutationPolicy::Heuristic => {
            return Err(EmmError::NotSupported(format!(
                "Permutation policy '{}' is not implemented yet",
                policy
            )));
        }
    }

    info!(
        "Generated {} permutations for project {} with policy {}",
        set.len(),
        set.table.project(),
        policy
    );
    Ok(set)
}

/// Column indices grouped by declared type, groups in first-seen order.
fn group_by_declared_type(columns: &[ColumnDefinition]) -> Vec<Vec<usize>> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (index, column) in columns.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|(declared_type, _)| *declared_type == column.declared_type)
        {
            Some((_, members)) => members.push(index),
            None => groups.push((column.declared_type.as_str(), vec![index])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(position, &index)| position == index)
}

/// All orderings of `0..n` in lexicographic order, starting with the identity.
struct Orderings {
    next: Option<Vec<usize>>,
}

impl Orderings {
    fn new(n: usize) -> Self {
        Self {
            next: Some((0..n).collect()),
        }
    }
}

impl Iterator for Orderings {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        if advance(&mut successor) {
            self.next = Some(successor);
        }
        Some(current)
    }
}

/// Step `items` to its lexicographic successor. Returns false at the last ordering.
fn advance(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }

    let mut pivot = items.len() - 1;
    while pivot > 0 && items[pivot - 1] >= items[pivot] {
        pivot -= 1;
    }
    if pivot == 0 {
        return false;
    }

    let mut swap = items.len() - 1;
    while items[swap] <= items[pivot - 1] {
        swap -= 1;
    }
    items.swap(pivot - 1, swap);
    items[pivot..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[(&str, &str)]) -> TableDefinition {
        let mut table = TableDefinition::new("shop");
        table.set_table_name("orders");
        for (name, declared_type) in columns {
            table.add_column(ColumnDefinition::new(
                *name,
                *declared_type,
                format!("{} {}", name, declared_type),
            ));
        }
        table
    }

    fn keys(set: &PermutationSet) -> Vec<&str> {
        set.keys().map(PermutationKey::as_str).collect()
    }

    #[test]
    fn test_orderings_are_lexicographic() {
        let all: Vec<Vec<usize>> = Orderings::new(3).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert_eq!(Orderings::new(1).count(), 1);
        assert_eq!(Orderings::new(5).count(), 120);
    }

    #[test]
    fn test_exhaustive_yields_every_ordering() {
        let set = generate(
            table(&[("a", "INT"), ("b", "TEXT"), ("c", "INT")]),
            PermutationPolicy::Exhaustive,
        )
        .unwrap();

        assert_eq!(keys(&set), vec!["012", "021", "102", "120", "201", "210"]);
        let names: Vec<&str> = set
            .columns(&PermutationKey::from("201"))
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_exhaustive_count_is_factorial() {
        let set = generate(
            table(&[("a", "INT"), ("b", "INT"), ("c", "INT"), ("d", "INT"), ("e", "INT")]),
            PermutationPolicy::Exhaustive,
        )
        .unwrap();
        assert_eq!(set.len(), 120);
        let distinct: HashSet<&PermutationKey> = set.keys().collect();
        assert_eq!(distinct.len(), 120);
    }

    #[test]
    fn test_exhaustive_rejects_too_many_columns() {
        let columns: Vec<(String, &str)> = (0..10).map(|i| (format!("c{}", i), "INT")).collect();
        let borrowed: Vec<(&str, &str)> = columns.iter().map(|(n, t)| (n.as_str(), *t)).collect();

        let err = generate(table(&borrowed), PermutationPolicy::Exhaustive).unwrap_err();
        assert!(matches!(err, EmmError::PolicyError(_)));
        assert!(err.to_string().contains("10 columns"));

        let clustered = generate(table(&borrowed), PermutationPolicy::ClusterByDeclaredType).unwrap();
        assert!(clustered.is_empty());
    }

    #[test]
    fn test_group_by_declared_type_owns_its_groups() {
        let groups = {
            let t = table(&[("a", "INT"), ("b", "TEXT"), ("c", "INT"), ("d", "DATE")]);
            group_by_declared_type(t.columns())
        };
        assert_eq!(groups, vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn test_cluster_by_type_keeps_groups_together() {
        let set = generate(
            table(&[("id", "INT"), ("name", "TEXT"), ("qty", "INT"), ("ok", "BOOLEAN")]),
            PermutationPolicy::ClusterByDeclaredType,
        )
        .unwrap();

        // groups: INT [0, 2], TEXT [1], BOOLEAN [3]; the identity group order is skipped
        assert_eq!(keys(&set), vec!["0231", "1023", "1302", "3021", "3102"]);
        assert!(!set.contains(&PermutationKey::from("0213")));
    }

    #[test]
    fn test_cluster_by_type_with_single_type_is_empty() {
        let set = generate(
            table(&[("a", "TEXT"), ("b", "TEXT")]),
            PermutationPolicy::ClusterByDeclaredType,
        )
        .unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_heuristic_policy_is_not_supported() {
        let err = generate(table(&[("a", "INT")]), PermutationPolicy::Heuristic).unwrap_err();
        assert!(matches!(err, EmmError::NotSupported(_)));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let err = generate(TableDefinition::new("shop"), PermutationPolicy::Exhaustive).unwrap_err();
        assert!(matches!(err, EmmError::ParseError(_)));
    }

    #[test]
    fn test_keys_decode_to_their_column_sequence() {
        let set = generate(
            table(&[("a", "INT"), ("b", "TEXT"), ("c", "DATE"), ("d", "INT")]),
            PermutationPolicy::Exhaustive,
        )
        .unwrap();

        for (key, columns) in set.iter() {
            let decoded = key.decode(4).unwrap();
            let expected: Vec<&str> = decoded
                .iter()
                .map(|&i| set.table().columns()[i].name.as_str())
                .collect();
            let actual: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_same_ordering_gets_same_key_across_policies() {
        let columns = [("id", "INT"), ("name", "TEXT"), ("flag", "BOOLEAN")];
        let exhaustive = generate(table(&columns), PermutationPolicy::Exhaustive).unwrap();
        let clustered = generate(table(&columns), PermutationPolicy::ClusterByDeclaredType).unwrap();

        for key in clustered.keys() {
            assert!(exhaustive.contains(key));
            assert_eq!(
                exhaustive.columns(key).unwrap(),
                clustered.columns(key).unwrap()
            );
        }
    }
}
