//! Validated cone search requests.

use super::error::{FieldViolation, ValidationError};
use super::params::QueryParams;
use crate::catalog::{CatalogDescriptor, MAX_VERBOSITY, MIN_VERBOSITY, PROTOCOL_MAX_RADIUS};

pub const DEFAULT_VERB: u8 = 2;

/// Sky position and radius of a search, all in decimal degrees (ICRS).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    pub ra: f64,
    pub dec: f64,
    pub sr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    VoTable,
}

impl OutputFormat {
    fn parse(raw: &str) -> Option<OutputFormat> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "votable" | "xml" | "text/xml" | "application/x-votable+xml" => {
                Some(OutputFormat::VoTable)
            }
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::VoTable => "text/xml",
        }
    }
}

/// A request that passed protocol validation. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub catalog: String,
    pub cone: Cone,
    pub verb: u8,
    pub format: OutputFormat,
}

impl SearchRequest {
    /// Validates the protocol-wide parameters.
    ///
    /// All violations are collected and reported together.
    pub fn from_params(catalog: &str, params: &QueryParams) -> Result<Self, ValidationError> {
        let mut check = FieldCheck::new(params);

        let ra = check.required_float("ra", 0.0, 360.0);
        let dec = check.required_float("dec", -90.0, 90.0);
        let sr = check.required_float("sr", 0.0, PROTOCOL_MAX_RADIUS);
        let verb = check.optional_int(
            "verb",
            DEFAULT_VERB as i64,
            MIN_VERBOSITY as i64,
            MAX_VERBOSITY as i64,
        );
        let format = check.format("format");

        match (ra, dec, sr, verb, format) {
            (Some(ra), Some(dec), Some(sr), Some(verb), Some(format))
                if check.violations.is_empty() =>
            {
                Ok(SearchRequest {
                    catalog: catalog.to_string(),
                    cone: Cone { ra, dec, sr },
                    verb: verb as u8,
                    format,
                })
            }
            _ => Err(ValidationError::Fields(check.violations)),
        }
    }

    /// Applies the catalog's own radius ceiling.
    pub fn check_catalog_limits(&self, descriptor: &CatalogDescriptor) -> Result<(), ValidationError> {
        if self.cone.sr > descriptor.max_radius {
            return Err(ValidationError::RadiusExceedsCatalog {
                sr: self.cone.sr,
                max_radius: descriptor.max_radius,
            });
        }
        Ok(())
    }
}

/// Renders a range bound the way clients expect to read it: `360`, not `360.0`.
fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.is_finite() {
        format!("{}", bound as i64)
    } else {
        format!("{}", bound)
    }
}

struct FieldCheck<'a> {
    params: &'a QueryParams,
    violations: Vec<FieldViolation>,
}

impl<'a> FieldCheck<'a> {
    fn new(params: &'a QueryParams) -> Self {
        FieldCheck {
            params,
            violations: Vec::new(),
        }
    }

    fn violation(&mut self, field: &str, message: String) {
        self.violations.push(FieldViolation::query(field, message));
    }

    fn check_range<T>(&mut self, field: &str, value: T, as_f64: f64, min: f64, max: f64) -> Option<T>
    where
        T: std::fmt::Debug,
    {
        if as_f64 >= min && as_f64 <= max {
            return Some(value);
        }
        let message = if !as_f64.is_finite() {
            format!("Input should be a finite number (got {:?})", value)
        } else if as_f64 < min {
            format!(
                "Input should be greater than or equal to {} (got {:?})",
                format_bound(min),
                value
            )
        } else {
            format!(
                "Input should be less than or equal to {} (got {:?})",
                format_bound(max),
                value
            )
        };
        self.violation(field, message);
        None
    }

    fn required_float(&mut self, field: &str, min: f64, max: f64) -> Option<f64> {
        let raw = match self.params.get(field) {
            Some(raw) => raw,
            None => {
                self.violation(field, "Field required".to_string());
                return None;
            }
        };
        match raw.trim().parse::<f64>() {
            Ok(value) => self.check_range(field, value, value, min, max),
            Err(_) => {
                self.violation(
                    field,
                    format!(
                        "Input should be a valid number, unable to parse string as a number (got '{}')",
                        raw
                    ),
                );
                None
            }
        }
    }

    fn optional_int(&mut self, field: &str, default: i64, min: i64, max: i64) -> Option<i64> {
        let raw = match self.params.get(field) {
            Some(raw) => raw,
            None => return Some(default),
        };
        match raw.trim().parse::<i64>() {
            Ok(value) => self.check_range(field, value, value as f64, min as f64, max as f64),
            Err(_) => {
                self.violation(
                    field,
                    format!(
                        "Input should be a valid integer, unable to parse string as an integer (got '{}')",
                        raw
                    ),
                );
                None
            }
        }
    }

    fn format(&mut self, field: &str) -> Option<OutputFormat> {
        let raw = match self.params.get(field) {
            Some(raw) => raw,
            None => return Some(OutputFormat::VoTable),
        };
        match OutputFormat::parse(raw) {
            Some(format) => Some(format),
            None => {
                self.violation(
                    field,
                    format!("Unsupported output format '{}', only VOTable is available", raw),
                );
                None
            }
        }
    }
}
