//! Pixel-bin synthesis for interval selections.
//!
//! A [`BinExpr`] discretizes a domain value into an integer pixel index under
//! a visual scale: apply the scale transform, shift by the transformed domain
//! minimum, stretch by screen-pixels-per-domain-unit over the pixel size, and
//! snap with the clause's rounding mode. The same mapping is available both
//! as SQL (for the cube's active columns) and numerically (for predicate
//! range endpoints).

use serde::{Deserialize, Serialize};
use trellis_core::clause::BinMethod;
use trellis_core::scale::{ScaleDescriptor, ScaleTransform};
use trellis_sql::expr::Expr;

/// A synthesized pixel-bin function, stored as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinExpr {
    transform: ScaleTransform,
    method: BinMethod,
    /// Transformed domain minimum; subtracted before stretching.
    lo: f64,
    /// Screen pixels per transformed domain unit, divided by the pixel size.
    factor: f64,
}

impl BinExpr {
    /// Synthesizes the bin function for a scale, or `None` when the scale
    /// family is unsupported or the domain/range are degenerate.
    pub fn synthesize(scale: &ScaleDescriptor, pixel_size: f64, method: BinMethod) -> Option<Self> {
        let transform = scale.transform()?;
        if scale.domain.is_empty() || pixel_size <= 0.0 {
            return None;
        }

        let dmin = scale.domain.iter().copied().fold(f64::INFINITY, f64::min);
        let dmax = scale
            .domain
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let lo = transform.apply(dmin);
        let hi = transform.apply(dmax);

        let a = if transform.is_identity() {
            1.0
        } else {
            if scale.range.len() < 2 {
                return None;
            }
            (scale.range[1] - scale.range[0]).abs() / (hi - lo)
        };
        let factor = a / pixel_size;
        if !lo.is_finite() || !factor.is_finite() || factor == 0.0 {
            return None;
        }

        Some(Self {
            transform,
            method,
            lo,
            factor,
        })
    }

    /// The bin index of a domain value.
    pub fn apply(&self, v: f64) -> f64 {
        self.method
            .apply(self.factor * (self.transform.apply(v) - self.lo))
    }

    /// The SQL expression computing the bin index of `value`.
    ///
    /// The stretch term is omitted when the factor is 1 and the shift term
    /// when the transformed minimum is 0, keeping the common cases compact:
    /// `FLOOR(5::DOUBLE * ("x"))::INTEGER`.
    pub fn sql(&self, value: &Expr) -> Expr {
        let applied = self.transform.sql_apply(value.clone());
        let columns = applied.columns();
        let stretch = if self.factor == 1.0 {
            String::new()
        } else {
            format!("{}::DOUBLE * ", self.factor)
        };
        let shift = if self.lo == 0.0 {
            String::new()
        } else {
            format!(" - {}::DOUBLE", self.lo)
        };
        Expr::raw(
            format!(
                "{}({stretch}({applied}{shift}))::INTEGER",
                self.method.sql_name()
            ),
            columns,
        )
    }
}
