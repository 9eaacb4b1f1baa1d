// src/validate/mod.rs

use crate::table::{Header, Table, DELIMITER};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required headers {missing:?}. {description}")]
    MissingRequiredHeaders {
        missing: Vec<String>,
        description: String,
    },
}

/// The headers an input file must carry, plus the text shown to a user
/// whose file is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    description: String,
    headers: Vec<Header>,
}

impl Requirements {
    /// Duplicate headers (ignoring case) are kept once, first spelling wins.
    pub fn new<I, S>(description: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut uniq: Vec<Header> = Vec::new();
        for h in headers.into_iter().map(Header::new) {
            if !uniq.contains(&h) {
                uniq.push(h);
            }
        }
        Self {
            description: description.into(),
            headers: uniq,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn header_names(&self) -> Vec<&str> {
        self.headers.iter().map(Header::as_str).collect()
    }

    /// Check a parsed table's header set. Row content is not inspected.
    pub fn validate(&self, table: &Table) -> Result<(), ValidationError> {
        self.check(|h| table.has_header(h.as_str()))
    }

    /// Check the header line of raw comma-separated text.
    pub fn validate_text(&self, text: &str) -> Result<(), ValidationError> {
        let present: Vec<&str> = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.split(DELIMITER).map(str::trim).collect())
            .unwrap_or_default();
        self.check(|h| present.iter().any(|p| h.matches(p)))
    }

    fn check(&self, has: impl Fn(&Header) -> bool) -> Result<(), ValidationError> {
        let missing: Vec<String> = self
            .headers
            .iter()
            .filter(|h| !has(h))
            .map(|h| h.as_str().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingRequiredHeaders {
                missing,
                description: self.description.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn reqs() -> Requirements {
        Requirements::new(
            "Input file should contain requestor ID and requisition number",
            ["requestor ID", "requisition number"],
        )
    }

    #[test]
    fn test_accepts_any_order_and_case() -> Result<()> {
        let t = Table::parse("REQUISITION NUMBER,notes,Requestor Id\n001,x,ABC\n")?;
        reqs().validate(&t)?;
        reqs().validate_text("REQUISITION NUMBER,notes,Requestor Id\n001,x,ABC\n")?;
        Ok(())
    }

    #[test]
    fn test_reports_every_missing_header() {
        let r = Requirements::new("need a and c", ["a", "c", "d"]);
        let err = r.validate_text("a,b\n1,2\n").unwrap_err();
        let ValidationError::MissingRequiredHeaders {
            missing,
            description,
        } = err;
        assert_eq!(missing, vec!["c", "d"]);
        assert_eq!(description, "need a and c");
    }

    #[test]
    fn test_empty_input_misses_everything() {
        let err = reqs().validate_text("").unwrap_err();
        assert!(err.to_string().contains("requestor ID"));
    }

    #[test]
    fn test_duplicate_requirements_collapse() {
        let r = Requirements::new("", ["BPO ID", "bpo id"]);
        assert_eq!(r.header_names(), vec!["BPO ID"]);
    }
}
