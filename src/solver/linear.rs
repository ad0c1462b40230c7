use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::LinearParams;
use crate::error::{Error, Result};
use crate::solver::{Problem, Solver};
use crate::vector::Term;

/// Sufficient-decrease constant of the Armijo condition
const ARMIJO_SIGMA: f64 = 1e-4;
/// Step halvings tried before a line search gives up
const MAX_BACKTRACKS: usize = 40;

/// One-vs-rest linear model
///
/// `weights[c]` holds `num_features` feature weights followed by the bias
/// weight when `bias > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub num_classes: usize,
    pub num_features: usize,
    pub bias: f64,
    pub weights: Vec<Vec<f64>>,
}

impl LinearModel {
    /// Decision value `w·x + w_b·bias` of class `class`
    pub fn decision_value(&self, class: usize, features: &[Term]) -> f64 {
        let w = &self.weights[class];
        margin(w, self.num_features, self.bias, features)
    }

    /// Check that the weight table matches the declared shape
    pub fn check_shape(&self) -> Result<()> {
        let dim = self.num_features + usize::from(self.bias > 0.0);
        if self.weights.len() != self.num_classes {
            return Err(Error::ModelFormat(format!(
                "{} weight vectors for {} classes",
                self.weights.len(),
                self.num_classes
            )));
        }
        if let Some(w) = self.weights.iter().find(|w| w.len() != dim) {
            return Err(Error::ModelFormat(format!(
                "weight vector of length {}, expected {dim}",
                w.len()
            )));
        }
        Ok(())
    }
}

/// LogisticRegression
/// L2-regularised logistic regression, one binary model per class.
///
/// Each class `c` minimises
/// ```text
/// ½‖w‖² + C Σ_i log(1 + exp(-y_i · (w·x_i + w_b·bias)))
/// ```
/// with `y_i = +1` for rows of class `c` and `-1` otherwise, by gradient
/// descent with Armijo backtracking. Iteration stops once
/// `‖∇f‖ ≤ eps · ‖∇f(0)‖` or after `max_iterations` steps.
/// Classes are fitted in parallel.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    params: LinearParams,
}

impl LogisticRegression {
    pub fn new(params: LinearParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LinearParams {
        &self.params
    }

    fn check_params(&self) -> Result<()> {
        let p = &self.params;
        if !(p.cost > 0.0 && p.cost.is_finite()) {
            return Err(Error::SolverRejected(format!(
                "cost must be positive, got {}",
                p.cost
            )));
        }
        if !(p.eps > 0.0 && p.eps.is_finite()) {
            return Err(Error::SolverRejected(format!(
                "eps must be positive, got {}",
                p.eps
            )));
        }
        if p.max_iterations == 0 {
            return Err(Error::SolverRejected("max_iterations must be at least 1".into()));
        }
        Ok(())
    }

    /// Fit the binary model separating `class` from the rest
    fn train_one(&self, problem: &Problem, class: usize) -> Vec<f64> {
        let nf = problem.num_features;
        let bias = self.params.bias;
        let dim = nf + usize::from(bias > 0.0);
        let cost = self.params.cost;
        let targets: Vec<f64> = problem
            .labels
            .iter()
            .map(|&l| if l as usize == class { 1.0 } else { -1.0 })
            .collect();

        let objective = |w: &[f64]| -> f64 {
            let reg = 0.5 * w.iter().map(|x| x * x).sum::<f64>();
            let loss: f64 = problem
                .rows
                .iter()
                .zip(&targets)
                .map(|(row, &y)| log1p_exp(-y * margin(w, nf, bias, row.as_slice())))
                .sum();
            reg + cost * loss
        };

        let gradient = |w: &[f64]| -> Vec<f64> {
            let mut g = w.to_vec();
            for (row, &y) in problem.rows.iter().zip(&targets) {
                let z = y * margin(w, nf, bias, row.as_slice());
                let coef = cost * (sigmoid(z) - 1.0) * y;
                for t in row {
                    g[t.id as usize] += coef * t.weight;
                }
                if bias > 0.0 {
                    g[nf] += coef * bias;
                }
            }
            g
        };

        let mut w = vec![0.0; dim];
        let mut f = objective(&w);
        let mut step = 1.0;
        let mut initial_norm = None;

        for iteration in 0..self.params.max_iterations {
            let g = gradient(&w);
            let g_sq: f64 = g.iter().map(|x| x * x).sum();
            let g_norm = g_sq.sqrt();
            let g0 = *initial_norm.get_or_insert(g_norm);
            if g_norm <= self.params.eps * g0 {
                debug!("class {class}: converged after {iteration} iterations, f = {f}");
                break;
            }

            let mut accepted = false;
            for _ in 0..MAX_BACKTRACKS {
                let candidate: Vec<f64> =
                    w.iter().zip(&g).map(|(wi, gi)| wi - step * gi).collect();
                let f_new = objective(&candidate);
                if f_new <= f - ARMIJO_SIGMA * step * g_sq {
                    w = candidate;
                    f = f_new;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }
            if !accepted {
                debug!("class {class}: line search stalled at iteration {iteration}");
                break;
            }
            step = (step * 2.0).min(1.0);
        }
        w
    }
}

impl Solver for LogisticRegression {
    type Model = LinearModel;

    fn train(&self, problem: &Problem) -> Result<LinearModel> {
        self.check_params()?;
        problem.validate()?;

        let weights: Vec<Vec<f64>> = (0..problem.num_classes)
            .into_par_iter()
            .map(|class| self.train_one(problem, class))
            .collect();

        info!(
            "logistic regression fitted {} classes on {} rows x {} features",
            problem.num_classes,
            problem.len(),
            problem.num_features
        );
        Ok(LinearModel {
            num_classes: problem.num_classes,
            num_features: problem.num_features,
            bias: self.params.bias,
            weights,
        })
    }

    fn predict_probabilities(&self, model: &LinearModel, features: &[Term]) -> Vec<f64> {
        let mut probs: Vec<f64> = (0..model.num_classes)
            .map(|class| sigmoid(model.decision_value(class, features)))
            .collect();
        let sum: f64 = probs.iter().sum();
        if sum > 0.0 {
            probs.iter_mut().for_each(|p| *p /= sum);
        } else if !probs.is_empty() {
            let uniform = 1.0 / probs.len() as f64;
            probs.iter_mut().for_each(|p| *p = uniform);
        }
        probs
    }

    fn num_classes(&self, model: &LinearModel) -> usize {
        model.num_classes
    }

    fn model_from_bytes(&self, bytes: &[u8]) -> Result<LinearModel> {
        let model: LinearModel = serde_cbor::from_slice(bytes)?;
        model.check_shape()?;
        Ok(model)
    }
}

/// `w·x + w_b·bias`, features at or beyond `num_features` ignored
#[inline]
fn margin(w: &[f64], num_features: usize, bias: f64, features: &[Term]) -> f64 {
    let mut z: f64 = features
        .iter()
        .filter(|t| (t.id as usize) < num_features)
        .map(|t| w[t.id as usize] * t.weight)
        .sum();
    if bias > 0.0 {
        z += w[num_features] * bias;
    }
    z
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^x)` without overflow
#[inline]
fn log1p_exp(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}
