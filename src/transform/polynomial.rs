//! 2-D polynomial tile transform.
//!
//! ```text
//! x' = Σ A_pq · x^p · y^q     (0 ≤ p+q ≤ order)
//! y' = Σ B_pq · x^p · y^q
//! ```
//!
//! Coefficients are stored flat, ordered by increasing total degree and,
//! within a degree, by decreasing power of x:
//!
//! ```text
//! 1, x, y, x², xy, y², x³, x²y, xy², y³, ...
//! ```
//!
//! This is the same layout used for polynomial tile specs in montage
//! pipelines, so coefficient vectors can be passed through unchanged.

/// Built only through [`new`](Self::new) or [`identity`](Self::identity),
/// so both coefficient vectors always match the order.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialModel {
    order: u32,
    /// x' coefficients, `num_coeffs(order)` long.
    a_coeffs: Vec<f64>,
    /// y' coefficients, `num_coeffs(order)` long.
    b_coeffs: Vec<f64>,
}

impl PolynomialModel {
    /// Create a polynomial model.
    ///
    /// Returns `None` unless both coefficient vectors have exactly
    /// `num_coeffs(order)` elements.
    pub fn new(order: u32, a_coeffs: Vec<f64>, b_coeffs: Vec<f64>) -> Option<Self> {
        let n = num_coeffs(order);
        if a_coeffs.len() != n || b_coeffs.len() != n {
            return None;
        }
        Some(Self {
            order,
            a_coeffs,
            b_coeffs,
        })
    }

    /// Polynomial that maps every point to itself.
    pub fn identity(order: u32) -> Self {
        let n = num_coeffs(order);
        let mut a_coeffs = vec![0.0; n];
        let mut b_coeffs = vec![0.0; n];
        if order >= 1 {
            a_coeffs[coeff_index(1, 0)] = 1.0;
            b_coeffs[coeff_index(0, 1)] = 1.0;
        }
        Self {
            order,
            a_coeffs,
            b_coeffs,
        }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// x' coefficients in term order.
    pub fn a_coeffs(&self) -> &[f64] {
        &self.a_coeffs
    }

    /// y' coefficients in term order.
    pub fn b_coeffs(&self) -> &[f64] {
        &self.b_coeffs
    }

    pub fn apply_point(&self, p: &crate::Point2) -> crate::Point2 {
        crate::Point2::new(
            eval_poly(&self.a_coeffs, self.order, p.x, p.y),
            eval_poly(&self.b_coeffs, self.order, p.x, p.y),
        )
    }
}

/// Number of coefficients for a polynomial of the given order.
pub fn num_coeffs(order: u32) -> usize {
    let n = order as usize + 1;
    n * (n + 1) / 2
}

/// Flat index of the `x^p · y^q` term.
pub fn coeff_index(p: u32, q: u32) -> usize {
    let s = (p + q) as usize;
    // terms of lower degree come first
    s * (s + 1) / 2 + q as usize
}

fn eval_poly(coeffs: &[f64], order: u32, x: f64, y: f64) -> f64 {
    let mut sum = 0.0;
    let mut idx = 0;
    for s in 0..=order {
        for q in 0..=s {
            let p = s - q;
            sum += coeffs[idx] * x.powi(p as i32) * y.powi(q as i32);
            idx += 1;
        }
    }
    sum
}
