// Dimensionality reduction by principal components.
//
// Components are found one at a time by power iteration on the centered
// data, deflating after each. Start vectors come from a seeded RNG and each
// component's sign is fixed (largest loading positive), so the projection is
// reproducible for a given seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::embeddings::l2_normalize;

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-10;

/// Project `vectors` onto their first `components` principal components.
///
/// Returns one row per input vector. Fewer than two vectors, or data with no
/// variance, project to zeros.
pub fn pca(vectors: &[Vec<f64>], components: usize, seed: u64) -> Vec<Vec<f64>> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    let dim = vectors[0].len();
    let components = components.min(dim);
    if n < 2 || components == 0 {
        return vec![vec![0.0; components]; n];
    }

    let mut mean = vec![0.0; dim];
    for v in vectors {
        for (m, x) in mean.iter_mut().zip(v) {
            *m += x;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }
    let centered: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| v.iter().zip(&mean).map(|(x, m)| x - m).collect())
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut residual = centered.clone();
    let mut axes: Vec<Vec<f64>> = Vec::with_capacity(components);

    for _ in 0..components {
        let mut axis: Vec<f64> = (0..dim).map(|_| rng.random::<f64>() - 0.5).collect();
        l2_normalize(&mut axis);

        for _ in 0..MAX_ITERATIONS {
            // axis' = Xᵀ X axis
            let scores: Vec<f64> = residual.iter().map(|row| dot(row, &axis)).collect();
            let mut next = vec![0.0; dim];
            for (row, s) in residual.iter().zip(&scores) {
                for (acc, x) in next.iter_mut().zip(row) {
                    *acc += x * s;
                }
            }
            l2_normalize(&mut next);
            let delta: f64 = next.iter().zip(&axis).map(|(a, b)| (a - b).abs()).sum();
            axis = next;
            if delta < TOLERANCE {
                break;
            }
        }

        if let Some(pivot) = axis
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        {
            if pivot < 0.0 {
                axis.iter_mut().for_each(|x| *x = -*x);
            }
        }

        for row in &mut residual {
            let s = dot(row, &axis);
            for (x, a) in row.iter_mut().zip(&axis) {
                *x -= s * a;
            }
        }
        axes.push(axis);
    }

    centered
        .iter()
        .map(|row| axes.iter().map(|axis| dot(row, axis)).collect())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_component_follows_variance() {
        // Points spread along x, barely along y
        let data = vec![
            vec![-2.0, 0.1],
            vec![-1.0, -0.1],
            vec![1.0, 0.1],
            vec![2.0, -0.1],
        ];
        let proj = pca(&data, 1, 42);
        assert_eq!(proj.len(), 4);
        assert!((proj[0][0] + 2.0).abs() < 0.05, "got {:?}", proj);
        assert!((proj[3][0] - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_component_count_capped_by_dimension() {
        let data = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![0.0, 1.0]];
        let proj = pca(&data, 5, 1);
        assert!(proj.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_same_seed_same_projection() {
        let data: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, (i * i) as f64 % 7.0, 1.0])
            .collect();
        assert_eq!(pca(&data, 2, 9), pca(&data, 2, 9));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(pca(&[], 2, 0).is_empty());
        assert_eq!(pca(&[vec![1.0, 2.0]], 2, 0), vec![vec![0.0, 0.0]]);
    }
}
