// src/driver/mod.rs
//
// The capability surface the query loop needs from a browser-like session:
// navigate, locate elements, type, click, read the location, quit.

pub mod http;
#[cfg(test)]
pub(crate) mod stub;
pub mod wait;

pub use http::HttpDriver;
pub use wait::{WaitPolicy, Waiter};

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How to find an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// `name` attribute.
    Name(String),
    /// `id` attribute.
    Id(String),
    /// Any CSS selector.
    Css(String),
}

impl Locator {
    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// The equivalent CSS selector.
    pub fn to_css(&self) -> String {
        match self {
            Locator::Name(n) => format!(r#"[name="{}"]"#, escape_attr(n)),
            Locator::Id(i) => format!(r#"[id="{}"]"#, escape_attr(i)),
            Locator::Css(s) => s.clone(),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Name(n) => write!(f, "name={}", n),
            Locator::Id(i) => write!(f, "id={}", i),
            Locator::Css(s) => write!(f, "css={}", s),
        }
    }
}

/// Identifies an element within one loaded page. `generation` changes every
/// time the driver loads a page, which makes older handles stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub generation: u64,
    pub index: usize,
}

/// Snapshot of a located element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub handle: ElementHandle,
    pub tag: String,
    pub text: String,
    /// Outer HTML.
    pub html: String,
    pub attrs: BTreeMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("timed out after {waited:?} waiting for {locator}")]
    Timeout { locator: String, waited: Duration },

    #[error("no element matches {0}")]
    NotFound(String),

    #[error("invalid locator {locator}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("stale element: the page changed since it was located")]
    StaleElement,

    #[error("cannot {action} a <{tag}> element")]
    Unsupported { action: &'static str, tag: String },

    #[error("clicked control is not inside a <form>")]
    NoForm,

    #[error("no page loaded")]
    NoPage,

    #[error("bad url `{url}`: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("driver session is closed")]
    SessionClosed,
}

/// A browser-like session. Element lookups do not wait; see [`Waiter`] for
/// bounded waiting.
pub trait Driver: Send {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    fn current_url(&self) -> Result<String, DriverError>;

    /// Every element currently matching `locator`, in document order.
    fn find_elements(&mut self, locator: &Locator) -> Result<Vec<Element>, DriverError>;

    fn find_element(&mut self, locator: &Locator) -> Result<Element, DriverError> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(locator.to_string()))
    }

    /// Type `text` into a form control, appending to what it already holds.
    fn send_input(&mut self, element: &Element, text: &str) -> Result<(), DriverError>;

    fn click(&mut self, element: &Element) -> Result<(), DriverError>;

    /// End the session and release whatever it holds.
    fn quit(&mut self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_css() {
        assert_eq!(Locator::name("REQ_NO").to_css(), r#"[name="REQ_NO"]"#);
        assert_eq!(Locator::id(r#"a"b"#).to_css(), r#"[id="a\"b"]"#);
        assert_eq!(
            Locator::css(r#"table[border="1"]"#).to_css(),
            r#"table[border="1"]"#
        );
        assert_eq!(Locator::name("B1").to_string(), "name=B1");
    }
}
