//! Typed, path-addressed access to a hierarchical configuration document.
//!
//! Paths are absolute and slash separated. Each step names a child element
//! and may carry a 1-based position, e.g.
//! `/cpacs/vehicles/aircraft/model/wings/wing[2]/name`. A step without a
//! position addresses the first child of that name.

use thiserror::Error;

use crate::geom::Point3;

/// Result type for document access.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Failures while reading or writing the document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("missing element `{path}`")]
    MissingElement { path: String },
    #[error("missing attribute `{name}` on `{path}`")]
    MissingAttribute { path: String, name: String },
    #[error("invalid number `{value}` at `{path}`")]
    InvalidNumber { path: String, value: String },
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML deserialization error: {0}")]
    Deserialize(#[from] quick_xml::DeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend boundary used by every component to read and write its subtree.
///
/// Implementors provide the raw element/attribute primitives; numeric and
/// vector accessors are layered on top.
pub trait DocumentBackend {
    fn check_element(&self, path: &str) -> bool;

    /// Trimmed text content of the element at `path`.
    fn text(&self, path: &str) -> DocumentResult<String>;

    fn attribute(&self, path: &str, name: &str) -> DocumentResult<String>;

    /// Number of direct children of `path` called `name`. Zero when `path`
    /// does not exist.
    fn named_child_count(&self, path: &str, name: &str) -> usize;

    /// Sets the text of the element at `path`, creating missing elements.
    fn set_text(&mut self, path: &str, value: &str) -> DocumentResult<()>;

    /// Sets an attribute, creating the element at `path` if missing.
    fn set_attribute(&mut self, path: &str, name: &str, value: &str) -> DocumentResult<()>;

    fn double(&self, path: &str) -> DocumentResult<f64> {
        let text = self.text(path)?;
        parse_number(path, &text)
    }

    /// Reads `x`, `y` and `z` children.
    fn point(&self, path: &str) -> DocumentResult<Point3> {
        Ok(Point3::new(
            self.double(&format!("{path}/x"))?,
            self.double(&format!("{path}/y"))?,
            self.double(&format!("{path}/z"))?,
        ))
    }

    /// Reads a `;`-separated list of numbers.
    fn vector(&self, path: &str) -> DocumentResult<Vec<f64>> {
        let text = self.text(path)?;
        text.split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| parse_number(path, item))
            .collect()
    }

    /// Text of an optional element. Absent elements yield `None`.
    fn optional_text(&self, path: &str) -> Option<String> {
        if !self.check_element(path) {
            return None;
        }
        self.text(path).ok().filter(|t| !t.is_empty())
    }

    /// Number of an optional element. Malformed values are logged and
    /// treated as absent.
    fn optional_double(&self, path: &str) -> Option<f64> {
        if !self.check_element(path) {
            return None;
        }
        match self.double(path) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("ignoring optional value: {err}");
                None
            }
        }
    }

    fn set_double(&mut self, path: &str, value: f64) -> DocumentResult<()> {
        self.set_text(path, &format_number(value))
    }

    fn set_point(&mut self, path: &str, point: Point3) -> DocumentResult<()> {
        self.set_double(&format!("{path}/x"), point.x)?;
        self.set_double(&format!("{path}/y"), point.y)?;
        self.set_double(&format!("{path}/z"), point.z)
    }

    fn set_vector(&mut self, path: &str, values: &[f64]) -> DocumentResult<()> {
        let joined = values
            .iter()
            .map(|v| format_number(*v))
            .collect::<Vec<_>>()
            .join(";");
        self.set_text(path, &joined)
    }
}

fn parse_number(path: &str, text: &str) -> DocumentResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| DocumentError::InvalidNumber {
            path: path.to_owned(),
            value: text.to_owned(),
        })
}

/// Shortest representation that reads back to the same value.
#[must_use]
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

/// One step of a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep<'a> {
    pub name: &'a str,
    /// 1-based position among same-named siblings.
    pub position: usize,
}

/// Splits an absolute path into its steps.
pub fn split_path(path: &str) -> DocumentResult<Vec<PathStep<'_>>> {
    let invalid = |reason: &str| DocumentError::InvalidPath {
        path: path.to_owned(),
        reason: reason.to_owned(),
    };

    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| invalid("path must be absolute"))?;
    if rest.is_empty() {
        return Err(invalid("empty path"));
    }

    rest.split('/')
        .map(|step| {
            if step.is_empty() {
                return Err(invalid("empty step"));
            }
            match step.split_once('[') {
                None => Ok(PathStep {
                    name: step,
                    position: 1,
                }),
                Some((name, index)) => {
                    let position = index
                        .strip_suffix(']')
                        .and_then(|i| i.parse::<usize>().ok())
                        .filter(|i| *i >= 1)
                        .ok_or_else(|| invalid("positions are 1-based integers"))?;
                    Ok(PathStep { name, position })
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_reads_positions() {
        let steps = split_path("/cpacs/wings/wing[3]/name").unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[2], PathStep { name: "wing", position: 3 });
        assert_eq!(steps[3].position, 1);
    }

    #[test]
    fn split_path_rejects_relative_and_zero_positions() {
        assert!(split_path("cpacs/wings").is_err());
        assert!(split_path("/cpacs/wing[0]").is_err());
        assert!(split_path("/cpacs//wing").is_err());
        assert!(split_path("/").is_err());
    }

    #[test]
    fn format_number_roundtrips() {
        for value in [0.0, 1.5, -2.25e-7, 12345.678] {
            assert_eq!(format_number(value).parse::<f64>().unwrap(), value);
        }
    }
}
