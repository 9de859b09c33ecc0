use crate::evaluation::tree::LabelledTree;
use crate::util::format_rate;
use std::collections::BTreeMap;
use std::fmt;

/// Edit cost between a predicted and a gold tree, with both tree sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeDistance {
    pub cost: usize,
    pub predicted_size: usize,
    pub gold_size: usize,
}

impl TreeDistance {
    /// Cost normalized by the gold tree size.
    pub fn error_rate(&self) -> f64 {
        self.cost as f64 / self.gold_size.max(1) as f64
    }
}

impl fmt::Display for TreeDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cost {} predicted {} gold {} error rate {}",
            self.cost,
            self.predicted_size,
            self.gold_size,
            format_rate(self.error_rate())
        )
    }
}

/// A tree flattened in postorder.
struct Indexed<'a> {
    labels: Vec<&'a str>,
    /// Postorder index of the leftmost leaf below each node.
    leftmost: Vec<usize>,
    /// Nodes with no ancestor sharing their leftmost leaf, ascending.
    keyroots: Vec<usize>,
}

fn flatten<'a>(node: &'a LabelledTree, labels: &mut Vec<&'a str>, leftmost: &mut Vec<usize>) -> usize {
    let mut first = None;
    for child in &node.children {
        let child_first = flatten(child, labels, leftmost);
        first.get_or_insert(child_first);
    }
    let index = labels.len();
    labels.push(&node.label);
    leftmost.push(first.unwrap_or(index));
    leftmost[index]
}

impl<'a> Indexed<'a> {
    fn new(tree: &'a LabelledTree) -> Self {
        let mut labels = Vec::new();
        let mut leftmost = Vec::new();
        flatten(tree, &mut labels, &mut leftmost);

        let mut highest = BTreeMap::new();
        for (i, l) in leftmost.iter().enumerate() {
            highest.insert(*l, i);
        }
        let mut keyroots: Vec<usize> = highest.into_values().collect();
        keyroots.sort_unstable();

        Self {
            labels,
            leftmost,
            keyroots,
        }
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Ordered tree edit distance (Zhang–Shasha). Inserting or deleting a node
/// costs 1, renaming costs 1 unless the labels are equal.
pub fn distance(predicted: &LabelledTree, gold: &LabelledTree) -> TreeDistance {
    let a = Indexed::new(predicted);
    let b = Indexed::new(gold);
    let mut tree_distance = vec![vec![0u32; b.len()]; a.len()];

    for &i in &a.keyroots {
        for &j in &b.keyroots {
            forest_distance(&a, &b, i, j, &mut tree_distance);
        }
    }

    TreeDistance {
        cost: tree_distance[a.len() - 1][b.len() - 1] as usize,
        predicted_size: a.len(),
        gold_size: b.len(),
    }
}

fn forest_distance(a: &Indexed, b: &Indexed, i: usize, j: usize, tree_distance: &mut [Vec<u32>]) {
    let li = a.leftmost[i];
    let lj = b.leftmost[j];
    let rows = i - li + 2;
    let cols = j - lj + 2;
    let mut forest = vec![vec![0u32; cols]; rows];

    for x in 1..rows {
        forest[x][0] = forest[x - 1][0] + 1;
    }
    for y in 1..cols {
        forest[0][y] = forest[0][y - 1] + 1;
    }

    for x in 1..rows {
        for y in 1..cols {
            let node_a = li + x - 1;
            let node_b = lj + y - 1;
            let delete = forest[x - 1][y] + 1;
            let insert = forest[x][y - 1] + 1;
            if a.leftmost[node_a] == li && b.leftmost[node_b] == lj {
                let rename = u32::from(a.labels[node_a] != b.labels[node_b]);
                let value = delete.min(insert).min(forest[x - 1][y - 1] + rename);
                forest[x][y] = value;
                tree_distance[node_a][node_b] = value;
            } else {
                let p = a.leftmost[node_a] - li;
                let q = b.leftmost[node_b] - lj;
                forest[x][y] = delete
                    .min(insert)
                    .min(forest[p][q] + tree_distance[node_a][node_b]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Silent;
    use crate::delinearizer::delinearize_text;
    use crate::evaluation::tree::part_tree;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn leaf(label: &str) -> LabelledTree {
        LabelledTree::leaf(label)
    }

    fn node(label: &str, children: Vec<LabelledTree>) -> LabelledTree {
        LabelledTree::node(label, children)
    }

    fn tree(text: &str) -> LabelledTree {
        part_tree(&delinearize_text(text, &mut Silent))
    }

    fn random_tree(rng: &mut StdRng, depth: u32) -> LabelledTree {
        let label = ["a", "b", "c"][rng.gen_range(0..3)];
        let count = if depth == 0 { 0 } else { rng.gen_range(0..4) };
        node(label, (0..count).map(|_| random_tree(rng, depth - 1)).collect())
    }

    #[test]
    fn test_classic_example() {
        // f(d(a c(b)) e) against f(c(d(a b)) e)
        let first = node(
            "f",
            vec![
                node("d", vec![leaf("a"), node("c", vec![leaf("b")])]),
                leaf("e"),
            ],
        );
        let second = node(
            "f",
            vec![
                node("c", vec![node("d", vec![leaf("a"), leaf("b")])]),
                leaf("e"),
            ],
        );
        let result = distance(&first, &second);
        assert_eq!(result.cost, 2);
        assert_eq!(result.predicted_size, 6);
        assert_eq!(result.gold_size, 6);
    }

    #[test]
    fn test_single_nodes() {
        assert_eq!(distance(&leaf("a"), &leaf("a")).cost, 0);
        assert_eq!(distance(&leaf("a"), &leaf("b")).cost, 1);
        assert_eq!(
            distance(&leaf("a"), &node("a", vec![leaf("b"), leaf("c")])).cost,
            2
        );
    }

    #[test]
    fn test_identity_and_symmetry() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let first = random_tree(&mut rng, 3);
            let second = random_tree(&mut rng, 3);
            assert_eq!(distance(&first, &first).cost, 0);
            assert_eq!(
                distance(&first, &second).cost,
                distance(&second, &first).cost
            );
            assert!(distance(&first, &second).cost <= first.size() + second.size());
        }
    }

    #[test]
    fn test_adding_a_leaf_costs_one() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let base = random_tree(&mut rng, 3);
            let mut grown = base.clone();
            let mut cursor = &mut grown;
            while !cursor.children.is_empty() && rng.gen_bool(0.5) {
                let pick = rng.gen_range(0..cursor.children.len());
                cursor = &mut cursor.children[pick];
            }
            cursor.children.push(leaf("z"));
            assert_eq!(distance(&base, &grown).cost, 1);
            assert_eq!(distance(&grown, &base).cost, 1);
        }
    }

    #[test]
    fn test_octave_change() {
        let gold = tree("measure staff:1 voice:1 quarter C4 quarter E4");
        let predicted = tree("measure staff:1 voice:1 quarter C5 quarter E4");
        let result = distance(&predicted, &gold);
        assert_eq!(result.cost, 1);
        assert_eq!(result.gold_size, gold.size());
        assert_eq!(result.error_rate(), 1.0 / gold.size() as f64);
    }

    #[test]
    fn test_missing_note() {
        let gold = tree("measure staff:1 voice:1 quarter C4 quarter E4");
        let predicted = tree("measure staff:1 voice:1 quarter C4");
        // the note and its three attribute leaves
        assert_eq!(distance(&predicted, &gold).cost, 4);
    }

    #[test]
    fn test_display() {
        let result = TreeDistance {
            cost: 1,
            predicted_size: 4,
            gold_size: 4,
        };
        assert_eq!(result.to_string(), "cost 1 predicted 4 gold 4 error rate 0.25");
    }
}
