use glam::DVec2;

use crate::error::{GeorefError, Result};

/// Parses a user-typed number, accepting `,` as decimal separator.
pub fn parse_decimal(text: &str, what: &str) -> Result<f64> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| GeorefError::input(format!("{what}: '{trimmed}' is not a number")))?;
    if !value.is_finite() {
        return Err(GeorefError::input(format!("{what}: '{trimmed}' is not finite")));
    }
    Ok(value)
}

/// Target of a coordinate jump: a world center and an optional new span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateJump {
    pub center: DVec2,
    pub span: Option<DVec2>,
}

impl CoordinateJump {
    pub fn parse(x_text: &str, y_text: &str, span_text: &str) -> Result<Self> {
        let center = DVec2::new(parse_decimal(x_text, "x")?, parse_decimal(y_text, "y")?);

        let parts: Vec<&str> = span_text
            .split(|c: char| c.is_whitespace() || c == ';')
            .filter(|s| !s.is_empty())
            .collect();
        let span = match parts.as_slice() {
            [] => None,
            [sx, sy] => {
                let span = DVec2::new(
                    parse_decimal(sx, "span x")?,
                    parse_decimal(sy, "span y")?,
                );
                if span.x <= 0.0 || span.y <= 0.0 {
                    return Err(GeorefError::input(format!("span {span} must be positive")));
                }
                Some(span)
            }
            _ => {
                return Err(GeorefError::input(format!(
                    "span '{}' needs two values",
                    span_text.trim()
                )))
            }
        };

        Ok(Self { center, span })
    }
}
