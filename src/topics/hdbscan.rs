// HDBSCAN density clustering.
//
// Steps: core distances, mutual reachability graph, minimum spanning tree,
// single-linkage hierarchy, condensed tree (clusters smaller than
// min_cluster_size dissolve into points "falling out"), and excess-of-mass
// selection of the most stable clusters. Points outside every selected
// cluster are noise. The root is never selected, so a result always has
// either several clusters or none.

use tracing::debug;

use super::traits::NOISE_TOPIC;

/// Closest allowed linkage distance, so lambda = 1 / distance stays finite.
const MIN_DISTANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct Hdbscan {
    pub min_cluster_size: usize,
    /// Neighbourhood size (the point itself included) for core distances.
    pub min_samples: usize,
}

impl Default for Hdbscan {
    fn default() -> Self {
        Self {
            min_cluster_size: 3,
            min_samples: 2,
        }
    }
}

/// Flat clustering: a label per point (NOISE_TOPIC for noise) and the
/// strength of each point's membership in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub labels: Vec<i32>,
    pub probabilities: Vec<f64>,
}

impl Clustering {
    fn noise(n: usize) -> Self {
        Self {
            labels: vec![NOISE_TOPIC; n],
            probabilities: vec![0.0; n],
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&l| l != NOISE_TOPIC)
            .map(|&l| l as usize + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Union-find over single-linkage nodes.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
}

/// Internal node of the single-linkage tree. Ids `0..n` are points.
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// A cluster of the condensed tree.
struct CondensedCluster {
    birth_lambda: f64,
    children: Vec<usize>,
    /// (point, lambda at which it left this cluster)
    points: Vec<(usize, f64)>,
    size: usize,
}

impl Hdbscan {
    pub fn fit(&self, data: &[Vec<f64>]) -> Clustering {
        let n = data.len();
        let min_cluster_size = self.min_cluster_size.max(2);
        if n < min_cluster_size {
            return Clustering::noise(n);
        }

        let dist = pairwise_distances(data);
        let core = core_distances(&dist, self.min_samples.max(1));
        let mst = prim_mst(&dist, &core);
        let merges = single_linkage(n, mst);
        let clusters = condense(n, &merges, min_cluster_size);
        let selected = select_eom(&clusters);

        let mut result = Clustering::noise(n);
        for (label, &c) in selected.iter().enumerate() {
            let mut members = Vec::new();
            collect_points(&clusters, c, &mut members);
            let max_lambda = members.iter().map(|m| m.1).fold(0.0, f64::max);
            for (p, lambda) in members {
                result.labels[p] = label as i32;
                result.probabilities[p] = if max_lambda > 0.0 {
                    lambda.min(max_lambda) / max_lambda
                } else {
                    1.0
                };
            }
        }

        debug!(
            points = n,
            clusters = selected.len(),
            noise = result.labels.iter().filter(|&&l| l == NOISE_TOPIC).count(),
            "HDBSCAN clustering"
        );
        result
    }
}

pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn pairwise_distances(data: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&data[i], &data[j]);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }
    dist
}

/// Distance to the k-th nearest point, counting the point itself as first.
fn core_distances(dist: &[Vec<f64>], k: usize) -> Vec<f64> {
    dist.iter()
        .map(|row| {
            let mut sorted = row.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            sorted[(k - 1).min(sorted.len() - 1)]
        })
        .collect()
}

/// Prim's algorithm over the complete mutual-reachability graph.
fn prim_mst(dist: &[Vec<f64>], core: &[f64]) -> Vec<(usize, usize, f64)> {
    let n = dist.len();
    let reach = |a: usize, b: usize| dist[a][b].max(core[a]).max(core[b]);

    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        for v in 0..n {
            if !in_tree[v] {
                let d = reach(current, v);
                if d < best[v] {
                    best[v] = d;
                    from[v] = current;
                }
            }
        }
        let mut next = None;
        for v in 0..n {
            if !in_tree[v] && next.is_none_or(|u: usize| best[v] < best[u]) {
                next = Some(v);
            }
        }
        let Some(v) = next else { break };
        in_tree[v] = true;
        edges.push((from[v], v, best[v]));
        current = v;
    }
    edges
}

/// Merge MST edges in order of distance into a single-linkage hierarchy.
/// Merge `i` has node id `n + i`; the last merge is the root.
fn single_linkage(n: usize, mut edges: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.2.total_cmp(&b.2));
    let mut sets = DisjointSet::new(2 * n);
    let mut sizes = vec![1usize; 2 * n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for (a, b, distance) in edges {
        let ra = sets.find(a);
        let rb = sets.find(b);
        if ra == rb {
            continue;
        }
        let id = n + merges.len();
        // Set roots are always the node id of the component's latest merge
        let (left, right) = (ra, rb);
        let size = sizes[left] + sizes[right];
        merges.push(Merge {
            left,
            right,
            distance,
            size,
        });
        sizes[id] = size;
        sets.parent[ra] = id;
        sets.parent[rb] = id;
    }
    merges
}

fn node_size(n: usize, merges: &[Merge], node: usize) -> usize {
    if node < n {
        1
    } else {
        merges[node - n].size
    }
}

fn leaves(n: usize, merges: &[Merge], node: usize, out: &mut Vec<usize>) {
    let mut stack = vec![node];
    while let Some(x) = stack.pop() {
        if x < n {
            out.push(x);
        } else {
            stack.push(merges[x - n].left);
            stack.push(merges[x - n].right);
        }
    }
}

/// Walk the hierarchy from the root, keeping only splits where both sides
/// have at least `min_size` points. Cluster 0 is the root; children always
/// have larger indices than their parent.
fn condense(n: usize, merges: &[Merge], min_size: usize) -> Vec<CondensedCluster> {
    let mut clusters = vec![CondensedCluster {
        birth_lambda: 0.0,
        children: Vec::new(),
        points: Vec::new(),
        size: n,
    }];
    if merges.is_empty() {
        return clusters;
    }

    let root = n + merges.len() - 1;
    let mut stack = vec![(root, 0usize)];
    while let Some((node, cluster)) = stack.pop() {
        if node < n {
            let lambda = clusters[cluster].birth_lambda;
            clusters[cluster].points.push((node, lambda));
            continue;
        }
        let merge = &merges[node - n];
        let lambda = 1.0 / merge.distance.max(MIN_DISTANCE);
        let left_size = node_size(n, merges, merge.left);
        let right_size = node_size(n, merges, merge.right);
        let left_big = left_size >= min_size;
        let right_big = right_size >= min_size;

        match (left_big, right_big) {
            (true, true) => {
                for (child, size) in [(merge.left, left_size), (merge.right, right_size)] {
                    let id = clusters.len();
                    clusters.push(CondensedCluster {
                        birth_lambda: lambda,
                        children: Vec::new(),
                        points: Vec::new(),
                        size,
                    });
                    clusters[cluster].children.push(id);
                    stack.push((child, id));
                }
            }
            _ => {
                for (child, big) in [(merge.left, left_big), (merge.right, right_big)] {
                    if big {
                        stack.push((child, cluster));
                    } else {
                        let mut pts = Vec::new();
                        leaves(n, merges, child, &mut pts);
                        clusters[cluster]
                            .points
                            .extend(pts.into_iter().map(|p| (p, lambda)));
                    }
                }
            }
        }
    }
    clusters
}

fn stability(clusters: &[CondensedCluster], c: usize) -> f64 {
    let cluster = &clusters[c];
    let from_points: f64 = cluster
        .points
        .iter()
        .map(|(_, lambda)| lambda - cluster.birth_lambda)
        .sum();
    let from_children: f64 = cluster
        .children
        .iter()
        .map(|&child| (clusters[child].birth_lambda - cluster.birth_lambda) * clusters[child].size as f64)
        .sum();
    from_points + from_children
}

/// Excess-of-mass selection. A cluster at least as stable as its selected
/// descendants combined replaces them. The root is excluded.
fn select_eom(clusters: &[CondensedCluster]) -> Vec<usize> {
    let count = clusters.len();
    let mut selected = vec![false; count];
    let mut subtree = vec![0.0; count];

    for c in (1..count).rev() {
        let own = stability(clusters, c);
        let children: f64 = clusters[c].children.iter().map(|&ch| subtree[ch]).sum();
        if clusters[c].children.is_empty() || own >= children {
            selected[c] = true;
            subtree[c] = own;
            let mut stack = clusters[c].children.clone();
            while let Some(d) = stack.pop() {
                selected[d] = false;
                stack.extend(clusters[d].children.iter().copied());
            }
        } else {
            subtree[c] = children;
        }
    }

    (1..count).filter(|&c| selected[c]).collect()
}

/// Every point in the subtree of `c` with the lambda at which it left.
fn collect_points(clusters: &[CondensedCluster], c: usize, out: &mut Vec<(usize, f64)>) {
    let mut stack = vec![c];
    while let Some(x) = stack.pop() {
        out.extend(clusters[x].points.iter().copied());
        stack.extend(clusters[x].children.iter().copied());
    }
}
