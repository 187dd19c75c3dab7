//! User-marked spans and points over a series.
//!
//! Selections are owned by the interactive layer and read by the analysis
//! crates on every recompute. A span is either unset or a validated `[a, b)`
//! with `b > a`; a point is either unset or a single sample index.

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Half-open index range `[a, b)`.
///
/// Serialized as `[a, b]` or `null`; deserializing goes through [`Span::set`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Option<(usize, usize)>", into = "Option<(usize, usize)>")
)]
pub struct Span {
    bounds: Option<(usize, usize)>,
}

impl Span {
    pub fn new(a: usize, b: usize) -> CoreResult<Self> {
        let mut span = Self::default();
        span.set(a, b)?;
        Ok(span)
    }

    /// Set both bounds; rejects `b <= a` and leaves the span untouched.
    pub fn set(&mut self, a: usize, b: usize) -> CoreResult<()> {
        if b <= a {
            return Err(CoreError::Validation {
                what: format!("span requires b > a (a={a}, b={b})"),
            });
        }
        self.bounds = Some((a, b));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.bounds = None;
    }

    pub fn is_valid(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn as_tuple(&self) -> Option<(usize, usize)> {
        self.bounds
    }
}

impl TryFrom<Option<(usize, usize)>> for Span {
    type Error = CoreError;

    fn try_from(bounds: Option<(usize, usize)>) -> CoreResult<Self> {
        match bounds {
            Some((a, b)) => Self::new(a, b),
            None => Ok(Self::default()),
        }
    }
}

impl From<Span> for Option<(usize, usize)> {
    fn from(span: Span) -> Self {
        span.bounds
    }
}

/// Single sample index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    index: Option<usize>,
}

impl Point {
    pub fn set(&mut self, i: usize) {
        self.index = Some(i);
    }

    pub fn clear(&mut self) {
        self.index = None;
    }

    pub fn is_valid(&self) -> bool {
        self.index.is_some()
    }

    pub fn get(&self) -> Option<usize> {
        self.index
    }

    /// Index checked against the length of the series it points into.
    pub fn checked(&self, len: usize, what: &'static str) -> CoreResult<Option<usize>> {
        match self.index {
            Some(index) if index >= len => Err(CoreError::IndexOob { what, index, len }),
            other => Ok(other),
        }
    }
}

/// Spans marked for filter tuning.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpanSelections {
    /// Flat region used for measurement noise.
    pub steady: Span,
    /// Constant-rate region used for process noise.
    pub ramp: Span,
}

impl SpanSelections {
    pub fn clear(&mut self) {
        self.steady.clear();
        self.ramp.clear();
    }

    /// Set a span by name (`steady|rx|r_x` or `ramp|q|q_x_dot|qx`).
    pub fn set_span(&mut self, span_type: &str, a: usize, b: usize) -> CoreResult<()> {
        match span_type.trim().to_ascii_lowercase().as_str() {
            "steady" | "rx" | "r_x" => self.steady.set(a, b),
            "ramp" | "q" | "q_x_dot" | "qx" => self.ramp.set(a, b),
            _ => Err(CoreError::Validation {
                what: format!("unknown span type: {span_type:?}"),
            }),
        }
    }
}

/// Spans marked on a step experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanName {
    Baseline,
    Final,
    Fit,
    Slope,
}

impl FromStr for SpanName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "base" => Ok(Self::Baseline),
            "final" | "settle" | "post" => Ok(Self::Final),
            "fit" | "fitspan" => Ok(Self::Fit),
            "slope" | "ramp" | "slope_span" => Ok(Self::Slope),
            _ => Err(CoreError::Validation {
                what: format!("unknown span name: {s:?}"),
            }),
        }
    }
}

impl fmt::Display for SpanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Baseline => "baseline",
            Self::Final => "final",
            Self::Fit => "fit",
            Self::Slope => "slope",
        };
        f.write_str(name)
    }
}

/// Points marked on a step experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointName {
    TStep,
    /// Legacy dead-time marker, superseded by `Theta`.
    TDead,
    Theta,
    T63,
    Peak,
}

impl FromStr for PointName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t_step" | "step" => Ok(Self::TStep),
            "t_dead" | "dead" | "deadtime" => Ok(Self::TDead),
            "theta" | "t_theta" => Ok(Self::Theta),
            "t63" | "63" | "tau63" => Ok(Self::T63),
            "peak" | "t_peak" => Ok(Self::Peak),
            _ => Err(CoreError::Validation {
                what: format!("unknown point name: {s:?}"),
            }),
        }
    }
}

impl fmt::Display for PointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TStep => "t_step",
            Self::TDead => "t_dead",
            Self::Theta => "theta",
            Self::T63 => "t63",
            Self::Peak => "peak",
        };
        f.write_str(name)
    }
}

/// All features marked on a step experiment for identification.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepTuneSelections {
    pub baseline: Span,
    pub final_span: Span,
    pub fit: Span,
    pub slope: Span,

    pub t_step: Point,
    pub t_dead: Point,
    pub theta: Point,
    pub t63: Point,
    pub peak: Point,
}

impl StepTuneSelections {
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    pub fn span(&self, name: SpanName) -> &Span {
        match name {
            SpanName::Baseline => &self.baseline,
            SpanName::Final => &self.final_span,
            SpanName::Fit => &self.fit,
            SpanName::Slope => &self.slope,
        }
    }

    pub fn span_mut(&mut self, name: SpanName) -> &mut Span {
        match name {
            SpanName::Baseline => &mut self.baseline,
            SpanName::Final => &mut self.final_span,
            SpanName::Fit => &mut self.fit,
            SpanName::Slope => &mut self.slope,
        }
    }

    pub fn point(&self, name: PointName) -> &Point {
        match name {
            PointName::TStep => &self.t_step,
            PointName::TDead => &self.t_dead,
            PointName::Theta => &self.theta,
            PointName::T63 => &self.t63,
            PointName::Peak => &self.peak,
        }
    }

    pub fn point_mut(&mut self, name: PointName) -> &mut Point {
        match name {
            PointName::TStep => &mut self.t_step,
            PointName::TDead => &mut self.t_dead,
            PointName::Theta => &mut self.theta,
            PointName::T63 => &mut self.t63,
            PointName::Peak => &mut self.peak,
        }
    }

    pub fn set_span(&mut self, span_name: &str, a: usize, b: usize) -> CoreResult<()> {
        let name: SpanName = span_name.parse()?;
        self.span_mut(name).set(a, b)
    }

    /// Set a point by name. Marking `theta` drops the legacy `t_dead` point.
    pub fn set_point(&mut self, point_name: &str, i: usize) -> CoreResult<()> {
        let name: PointName = point_name.parse()?;
        self.point_mut(name).set(i);
        if name == PointName::Theta {
            self.t_dead.clear();
        }
        Ok(())
    }
}
