//! Visual scale descriptors and their numeric / SQL transforms.
//!
//! A [`ScaleDescriptor`] is metadata shipped by a visual client: the scale
//! family, its data domain, and its screen range. [`ScaleDescriptor::transform`]
//! resolves the family into a [`ScaleTransform`] that can evaluate the scale
//! numerically and emit the equivalent SQL expression. Families this module
//! does not understand resolve to `None` -- that is data, not an error.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use trellis_sql::expr::{BinaryOp, Expr, binary, call, literal};

// ---------------------------------------------------------------------------
// Scale families
// ---------------------------------------------------------------------------

/// The scale family of a visual axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScaleType {
    Identity,
    Linear,
    Log,
    Symlog,
    Sqrt,
    Pow,
    Time,
    Utc,
    /// A family this crate does not know how to transform (e.g. `band`).
    Other(String),
}

impl ScaleType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Identity => "identity",
            Self::Linear => "linear",
            Self::Log => "log",
            Self::Symlog => "symlog",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Time => "time",
            Self::Utc => "utc",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for ScaleType {
    fn from(s: &str) -> Self {
        match s {
            "identity" => Self::Identity,
            "linear" => Self::Linear,
            "log" => Self::Log,
            "symlog" => Self::Symlog,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "time" => Self::Time,
            "utc" => Self::Utc,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for ScaleType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "identity" | "linear" | "log" | "symlog" | "sqrt" | "pow" | "time" | "utc" => {
                Self::from(s.as_str())
            }
            _ => Self::Other(s),
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ScaleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScaleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Scale metadata as declared by a visual client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleDescriptor {
    /// The scale family.
    #[serde(rename = "type")]
    pub scale_type: ScaleType,
    /// The data-space domain endpoints.
    #[serde(default)]
    pub domain: Vec<f64>,
    /// The screen-space range endpoints.
    #[serde(default)]
    pub range: Vec<f64>,
    /// Exponent for `pow` scales.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exponent: Option<f64>,
}

impl ScaleDescriptor {
    /// A descriptor with the given family and domain/range endpoints.
    pub fn new(scale_type: ScaleType, domain: Vec<f64>, range: Vec<f64>) -> Self {
        Self {
            scale_type,
            domain,
            range,
            exponent: None,
        }
    }

    /// Resolves this descriptor into a transform, or `None` when the family
    /// is unsupported.
    pub fn transform(&self) -> Option<ScaleTransform> {
        if matches!(self.scale_type, ScaleType::Other(_)) {
            return None;
        }
        Some(ScaleTransform {
            kind: self.scale_type.clone(),
            exponent: self.exponent.unwrap_or(1.0),
        })
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// A resolved scale transform: evaluates the scale numerically and emits its
/// in-SQL equivalent. Stored as data so downstream structures stay
/// serializable and inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTransform {
    kind: ScaleType,
    exponent: f64,
}

impl ScaleTransform {
    /// Whether this is the identity family (which keeps a unit bin factor).
    pub fn is_identity(&self) -> bool {
        self.kind == ScaleType::Identity
    }

    /// Applies the scale transform to a domain value.
    pub fn apply(&self, v: f64) -> f64 {
        match self.kind {
            ScaleType::Identity | ScaleType::Linear | ScaleType::Time | ScaleType::Utc => v,
            ScaleType::Log => v.ln(),
            ScaleType::Symlog => v.signum() * v.abs().ln_1p(),
            ScaleType::Sqrt => v.signum() * v.abs().sqrt(),
            ScaleType::Pow => v.signum() * v.abs().powf(self.exponent),
            ScaleType::Other(_) => f64::NAN,
        }
    }

    /// The SQL expression equivalent to [`apply`](Self::apply) over `expr`.
    /// Time scales operate on epoch milliseconds.
    pub fn sql_apply(&self, expr: Expr) -> Expr {
        match self.kind {
            ScaleType::Identity | ScaleType::Linear => expr,
            ScaleType::Time | ScaleType::Utc => call("epoch_ms", vec![expr]),
            ScaleType::Log => call("LN", vec![expr]),
            ScaleType::Symlog => binary(
                BinaryOp::Mul,
                call("SIGN", vec![expr.clone()]),
                call(
                    "LN",
                    vec![binary(
                        BinaryOp::Add,
                        literal(1.0),
                        call("ABS", vec![expr]),
                    )],
                ),
            ),
            ScaleType::Sqrt => binary(
                BinaryOp::Mul,
                call("SIGN", vec![expr.clone()]),
                call("SQRT", vec![call("ABS", vec![expr])]),
            ),
            ScaleType::Pow => binary(
                BinaryOp::Mul,
                call("SIGN", vec![expr.clone()]),
                call(
                    "POW",
                    vec![call("ABS", vec![expr]), literal(self.exponent)],
                ),
            ),
            ScaleType::Other(_) => expr,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_sql::expr::column;

    use super::*;

    #[test]
    fn parses_from_json() {
        let s: ScaleDescriptor =
            serde_json::from_str(r#"{"type":"linear","domain":[0,100],"range":[0,500]}"#).unwrap();
        assert_eq!(s.scale_type, ScaleType::Linear);
        assert_eq!(s.domain, vec![0.0, 100.0]);
        assert_eq!(s.range, vec![0.0, 500.0]);
    }

    #[test]
    fn unknown_families_round_trip_and_do_not_transform() {
        let s: ScaleDescriptor =
            serde_json::from_str(r#"{"type":"band","domain":[0,1],"range":[0,1]}"#).unwrap();
        assert_eq!(s.scale_type, ScaleType::Other("band".into()));
        assert!(s.transform().is_none());
        assert_eq!(serde_json::to_value(&s.scale_type).unwrap(), "band");
    }

    #[test]
    fn linear_and_identity_pass_through() {
        let t = ScaleDescriptor::new(ScaleType::Linear, vec![0.0, 1.0], vec![0.0, 1.0])
            .transform()
            .unwrap();
        assert_eq!(t.apply(42.0), 42.0);
        assert_eq!(t.sql_apply(column("x")).to_string(), "\"x\"");
        assert!(!t.is_identity());

        let t = ScaleDescriptor::new(ScaleType::Identity, vec![0.0, 1.0], vec![0.0, 1.0])
            .transform()
            .unwrap();
        assert!(t.is_identity());
    }

    #[test]
    fn log_symlog_sqrt_transforms() {
        let log = ScaleDescriptor::new(ScaleType::Log, vec![1.0, 100.0], vec![0.0, 1.0])
            .transform()
            .unwrap();
        assert!((log.apply(std::f64::consts::E) - 1.0).abs() < 1e-12);
        assert_eq!(log.sql_apply(column("x")).to_string(), "LN(\"x\")");

        let symlog = ScaleDescriptor::new(ScaleType::Symlog, vec![-10.0, 10.0], vec![0.0, 1.0])
            .transform()
            .unwrap();
        assert!(symlog.apply(-1.0) < 0.0);
        assert_eq!(
            symlog.sql_apply(column("x")).to_string(),
            "(SIGN(\"x\") * LN((1 + ABS(\"x\"))))"
        );

        let sqrt = ScaleDescriptor::new(ScaleType::Sqrt, vec![0.0, 100.0], vec![0.0, 1.0])
            .transform()
            .unwrap();
        assert_eq!(sqrt.apply(9.0), 3.0);
        assert_eq!(
            sqrt.sql_apply(column("x")).to_string(),
            "(SIGN(\"x\") * SQRT(ABS(\"x\")))"
        );
    }

    #[test]
    fn time_scales_use_epoch_milliseconds() {
        let t = ScaleDescriptor::new(ScaleType::Utc, vec![0.0, 1.0], vec![0.0, 1.0])
            .transform()
            .unwrap();
        assert_eq!(t.apply(1_700_000_000_000.0), 1_700_000_000_000.0);
        assert_eq!(t.sql_apply(column("ts")).to_string(), "epoch_ms(\"ts\")");
    }

    #[test]
    fn pow_uses_descriptor_exponent() {
        let mut s = ScaleDescriptor::new(ScaleType::Pow, vec![0.0, 10.0], vec![0.0, 1.0]);
        s.exponent = Some(2.0);
        let t = s.transform().unwrap();
        assert_eq!(t.apply(-3.0), -9.0);
        assert_eq!(
            t.sql_apply(column("x")).to_string(),
            "(SIGN(\"x\") * POW(ABS(\"x\"), 2))"
        );
    }
}
