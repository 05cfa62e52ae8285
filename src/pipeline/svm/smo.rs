//! Sequential minimal optimization for the C-SVC dual
//!
//! Solves
//!   min_a 0.5 * a'Qa - e'a   s.t.  0 <= a_i <= C,  y'a = 0
//! with Q_ij = y_i * y_j * K_ij. Working pairs are chosen as the maximal
//! violating `i` plus the partner `j` with the largest second-order gain,
//! the same selection rule used by LIBSVM.

use faer::Mat;

/// Lower bound for the curvature of a working pair
const TAU: f64 = 1e-12;

/// Stopping and iteration limits for the solver
#[derive(Debug, Clone)]
pub struct SmoOptions {
    /// KKT violation tolerance (LIBSVM's `eps`)
    pub tolerance: f64,
    /// Hard cap on pair updates
    pub max_iter: usize,
}

impl Default for SmoOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iter: 100_000,
        }
    }
}

/// Dual solution: multipliers and the offset `rho` (decision = w'x - rho)
#[derive(Debug, Clone)]
pub struct SmoSolution {
    pub alpha: Vec<f64>,
    pub rho: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Linear-kernel Gram matrix K = X X' of the rows
pub fn gram_matrix(rows: &[Vec<f64>]) -> Mat<f64> {
    let n = rows.len();
    let d = rows.first().map_or(0, |r| r.len());

    // Column-per-sample layout so that K = Z' Z
    let mut z = Mat::<f64>::zeros(d, n);
    for (i, row) in rows.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            z[(j, i)] = value;
        }
    }

    z.transpose() * &z
}

/// SMO solver over a precomputed kernel
pub struct SmoSolver<'a> {
    kernel: &'a Mat<f64>,
    y: &'a [f64],
    c: f64,
    options: &'a SmoOptions,
}

impl<'a> SmoSolver<'a> {
    /// `y` must hold +1.0 / -1.0 and match the kernel's dimension
    pub fn new(kernel: &'a Mat<f64>, y: &'a [f64], c: f64, options: &'a SmoOptions) -> Self {
        Self {
            kernel,
            y,
            c,
            options,
        }
    }

    #[inline]
    fn q(&self, i: usize, j: usize) -> f64 {
        self.y[i] * self.y[j] * self.kernel[(i, j)]
    }

    pub fn solve(&self) -> SmoSolution {
        let n = self.y.len();
        let mut alpha = vec![0.0; n];
        let mut grad = vec![-1.0; n];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.options.max_iter {
            let Some((i, j)) = self.select_working_set(&alpha, &grad) else {
                converged = true;
                break;
            };
            iterations += 1;

            let (old_ai, old_aj) = (alpha[i], alpha[j]);
            self.update_pair(i, j, &mut alpha, &grad);

            let delta_i = alpha[i] - old_ai;
            let delta_j = alpha[j] - old_aj;
            for (t, g) in grad.iter_mut().enumerate() {
                *g += self.q(t, i) * delta_i + self.q(t, j) * delta_j;
            }
        }

        let rho = self.compute_rho(&alpha, &grad);

        SmoSolution {
            alpha,
            rho,
            iterations,
            converged,
        }
    }

    /// Pick the maximal violating pair, or `None` once the KKT gap is below tolerance
    fn select_working_set(&self, alpha: &[f64], grad: &[f64]) -> Option<(usize, usize)> {
        let c = self.c;
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax_idx = None;

        for t in 0..self.y.len() {
            let candidate = if self.y[t] > 0.0 {
                (alpha[t] < c).then(|| -grad[t])
            } else {
                (alpha[t] > 0.0).then(|| grad[t])
            };
            if let Some(value) = candidate {
                if value > gmax {
                    gmax = value;
                    gmax_idx = Some(t);
                }
            }
        }

        let i = gmax_idx?;
        let k_ii = self.kernel[(i, i)];

        let mut gmax2 = f64::NEG_INFINITY;
        let mut best_j = None;
        let mut obj_min = f64::INFINITY;

        for t in 0..self.y.len() {
            let in_low = if self.y[t] > 0.0 {
                alpha[t] > 0.0
            } else {
                alpha[t] < c
            };
            if !in_low {
                continue;
            }

            let y_grad = self.y[t] * grad[t];
            gmax2 = gmax2.max(y_grad);

            let grad_diff = gmax + y_grad;
            if grad_diff > 0.0 {
                let quad = k_ii + self.kernel[(t, t)] - 2.0 * self.kernel[(i, t)];
                let obj = -(grad_diff * grad_diff) / quad.max(TAU);
                if obj < obj_min {
                    obj_min = obj;
                    best_j = Some(t);
                }
            }
        }

        if gmax + gmax2 < self.options.tolerance {
            return None;
        }

        best_j.map(|j| (i, j))
    }

    /// Analytic two-variable update, clipped to the box
    fn update_pair(&self, i: usize, j: usize, alpha: &mut [f64], grad: &[f64]) {
        let c = self.c;
        let quad = (self.kernel[(i, i)] + self.kernel[(j, j)] - 2.0 * self.kernel[(i, j)]).max(TAU);

        if self.y[i] != self.y[j] {
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }
    }

    /// Offset from the free multipliers, or the midpoint of the feasible
    /// interval when every multiplier sits at a bound
    fn compute_rho(&self, alpha: &[f64], grad: &[f64]) -> f64 {
        let c = self.c;
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for t in 0..self.y.len() {
            let y_grad = self.y[t] * grad[t];
            if alpha[t] >= c {
                if self.y[t] < 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else if alpha[t] <= 0.0 {
                if self.y[t] > 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else {
                free_count += 1;
                free_sum += y_grad;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            (upper + lower) / 2.0
        }
    }
}
