use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2};

/// Upper bound on the width of an expanded feature row.
pub const MAX_OUTPUT_FEATURES: usize = 1 << 20;

/// Upper bound on the input indices stored across all monomials (columns × degree).
pub const MAX_MONOMIAL_ENTRIES: usize = 1 << 22;

/// A pre-fitted mapping from raw features to the representation a model expects.
pub trait FeatureTransform {
    /// Number of columns accepted by [`FeatureTransform::transform`].
    fn n_features_in(&self) -> usize;

    /// Number of columns produced for each row.
    fn n_features_out(&self) -> usize;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;
}

/// A pre-fitted regressor producing one scalar per input row.
pub trait Regressor {
    /// Number of columns the model was fitted on.
    fn n_features(&self) -> usize;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Polynomial feature expansion.
///
/// Columns are ordered as the bias term (when enabled), then every degree-1
/// term, then degree-2 monomials in combinations-with-replacement order, and
/// so on up to `degree`.
#[derive(Clone, Debug)]
pub struct PolynomialFeatures {
    n_features_in: usize,
    degree: usize,
    include_bias: bool,
    interaction_only: bool,
    combinations: Vec<Vec<usize>>, // input indices multiplied together per output column
}

impl PolynomialFeatures {
    pub fn new(
        n_features_in: usize,
        degree: usize,
        include_bias: bool,
        interaction_only: bool,
    ) -> Result<Self> {
        if n_features_in == 0 {
            return Err(ModelError::param("n_features_in", "must be at least 1"));
        }
        if degree == 0 {
            return Err(ModelError::param("degree", "must be at least 1"));
        }
        let width = output_width(n_features_in, degree, include_bias, interaction_only)
            .ok_or_else(|| {
                ModelError::param(
                    "degree",
                    format!(
                        "expanding {n_features_in} features to degree {degree} exceeds \
                         {MAX_OUTPUT_FEATURES} columns or {MAX_MONOMIAL_ENTRIES} monomial factors"
                    ),
                )
            })?;

        let mut combinations = Vec::with_capacity(width);
        if include_bias {
            combinations.push(Vec::new());
        }
        let max_degree = if interaction_only { degree.min(n_features_in) } else { degree };
        for d in 1..=max_degree {
            push_combinations(n_features_in, d, interaction_only, &mut combinations);
        }
        debug_assert_eq!(combinations.len(), width);

        Ok(Self { n_features_in, degree, include_bias, interaction_only, combinations })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn include_bias(&self) -> bool {
        self.include_bias
    }

    pub fn interaction_only(&self) -> bool {
        self.interaction_only
    }

    /// Output column names using `x0`, `x1`, ... for the inputs, e.g. `x0 x1` or `x2^2`.
    pub fn feature_names(&self) -> Vec<String> {
        self.combinations
            .iter()
            .map(|combo| {
                if combo.is_empty() {
                    return "1".to_string();
                }
                let mut parts: Vec<String> = Vec::new();
                let mut i = 0;
                while i < combo.len() {
                    let idx = combo[i];
                    let power = combo[i..].iter().take_while(|&&j| j == idx).count();
                    if power == 1 {
                        parts.push(format!("x{idx}"));
                    } else {
                        parts.push(format!("x{idx}^{power}"));
                    }
                    i += power;
                }
                parts.join(" ")
            })
            .collect()
    }
}

impl FeatureTransform for PolynomialFeatures {
    fn n_features_in(&self) -> usize {
        self.n_features_in
    }

    fn n_features_out(&self) -> usize {
        self.combinations.len()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features_in {
            return Err(ModelError::shape(
                format!("{} input features", self.n_features_in),
                format!("{} features", x.ncols()),
            ));
        }
        let out = Array2::from_shape_fn((x.nrows(), self.combinations.len()), |(i, j)| {
            // the empty bias combination yields the multiplicative identity
            self.combinations[j].iter().map(|&k| x[[i, k]]).product::<f64>()
        });
        Ok(out)
    }
}

/// Append every index combination of length `len` in lexicographic order.
///
/// Indices are non-decreasing, or strictly increasing when `interaction_only`.
fn push_combinations(n_features: usize, len: usize, interaction_only: bool, out: &mut Vec<Vec<usize>>) {
    let step = usize::from(interaction_only);
    if interaction_only && len > n_features {
        return;
    }
    let mut current: Vec<usize> = (0..len).map(|i| i * step).collect();
    loop {
        out.push(current.clone());
        // rightmost position that can still advance
        let limit = |i: usize| if interaction_only { n_features - len + i } else { n_features - 1 };
        let Some(i) = (0..len).rev().find(|&i| current[i] < limit(i)) else {
            return;
        };
        current[i] += 1;
        for j in i + 1..len {
            current[j] = current[j - 1] + step;
        }
    }
}

/// Number of output columns, or `None` past [`MAX_OUTPUT_FEATURES`] columns
/// or [`MAX_MONOMIAL_ENTRIES`] stored indices.
fn output_width(
    n_features: usize,
    degree: usize,
    include_bias: bool,
    interaction_only: bool,
) -> Option<usize> {
    let mut total = u128::from(include_bias);
    let mut entries: u128 = 0;
    let max_degree = if interaction_only { degree.min(n_features) } else { degree };
    for d in 1..=max_degree {
        let terms = if interaction_only {
            binomial(n_features, d)?
        } else {
            binomial(n_features + d - 1, d)?
        };
        total = total.checked_add(terms)?;
        entries = entries.checked_add(terms.checked_mul(d as u128)?)?;
        if total > MAX_OUTPUT_FEATURES as u128 || entries > MAX_MONOMIAL_ENTRIES as u128 {
            return None;
        }
    }
    usize::try_from(total).ok()
}

fn binomial(n: usize, k: usize) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc.checked_mul((n - i) as u128)? / (i as u128 + 1);
    }
    Some(acc)
}

/// Linear model: `predict(x) = x · coefficients + intercept`.
#[derive(Clone, Debug)]
pub struct LinearRegression {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(ModelError::param("coefficients", "must not be empty"));
        }
        if let Some(pos) = coefficients.iter().position(|c| !c.is_finite()) {
            return Err(ModelError::param("coefficients", format!("entry {pos} is not finite")));
        }
        if !intercept.is_finite() {
            return Err(ModelError::param("intercept", "is not finite"));
        }
        Ok(Self { coefficients: Array1::from(coefficients), intercept })
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(ModelError::shape(
                format!("{} model features", self.coefficients.len()),
                format!("{} features", x.ncols()),
            ));
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}
