// src/driver/stub.rs
//
// Scripted in-memory driver for tests. The "portal" has one query page with a
// text field `q` and a button `go`; clicking `go` renders a one-row result
// table for whatever was typed.

use super::{Driver, DriverError, Element, ElementHandle, Locator};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// Shared record of every call made on a [`StubDriver`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

pub(crate) struct StubDriver {
    journal: Journal,
    url: String,
    generation: u64,
    typed: String,
    submitted: bool,
    delay: usize,
    polls: usize,
    never_render: HashSet<String>,
    odd_headers: HashSet<String>,
    quit: bool,
}

impl StubDriver {
    pub(crate) fn new() -> (Self, Journal) {
        let journal = Journal::default();
        let driver = Self {
            journal: journal.clone(),
            url: "about:blank".to_string(),
            generation: 0,
            typed: String::new(),
            submitted: false,
            delay: 0,
            polls: 0,
            never_render: HashSet::new(),
            odd_headers: HashSet::new(),
            quit: false,
        };
        (driver, journal)
    }

    /// The result table only shows up after `polls` lookups.
    pub(crate) fn delay_results(&mut self, polls: usize) {
        self.delay = polls;
    }

    /// Queries for `value` never render a result table.
    pub(crate) fn never_render(mut self, value: &str) -> Self {
        self.never_render.insert(value.to_string());
        self
    }

    /// Queries for `value` render a table with different columns.
    pub(crate) fn odd_headers(mut self, value: &str) -> Self {
        self.odd_headers.insert(value.to_string());
        self
    }

    fn element(&self, index: usize, tag: &str, attrs: &[(&str, &str)], html: String) -> Element {
        Element {
            handle: ElementHandle {
                generation: self.generation,
                index,
            },
            tag: tag.to_string(),
            text: String::new(),
            html,
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn result_html(&self) -> String {
        if self.odd_headers.contains(&self.typed) {
            format!(
                "<table><tr><th>id</th><th>balance</th></tr><tr><td>{}</td><td>0</td></tr></table>",
                self.typed
            )
        } else {
            format!(
                "<table><tr><th>id</th><th>status</th></tr><tr><td>{}</td><td>found</td></tr></table>",
                self.typed
            )
        }
    }

    fn check(&self, element: &Element) -> Result<(), DriverError> {
        if self.quit {
            return Err(DriverError::SessionClosed);
        }
        if element.handle.generation != self.generation {
            return Err(DriverError::StaleElement);
        }
        Ok(())
    }
}

impl Driver for StubDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        if self.quit {
            return Err(DriverError::SessionClosed);
        }
        self.journal.push(format!("navigate {}", url));
        self.url = url.to_string();
        self.generation += 1;
        self.typed.clear();
        self.submitted = false;
        self.polls = 0;
        Ok(())
    }

    fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.clone())
    }

    fn find_elements(&mut self, locator: &Locator) -> Result<Vec<Element>, DriverError> {
        if self.quit {
            return Err(DriverError::SessionClosed);
        }
        self.journal.push(format!("find {}", locator));
        let found = match locator {
            Locator::Name(n) if n == "q" && !self.submitted => vec![self.element(
                1,
                "input",
                &[("name", "q"), ("type", "text")],
                r#"<input name="q" type="text">"#.to_string(),
            )],
            Locator::Name(n) if n == "go" && !self.submitted => vec![self.element(
                2,
                "input",
                &[("name", "go"), ("type", "submit")],
                r#"<input name="go" type="submit">"#.to_string(),
            )],
            Locator::Css(s) if s == "table" && self.submitted => {
                self.polls += 1;
                if self.polls <= self.delay || self.never_render.contains(&self.typed) {
                    Vec::new()
                } else {
                    vec![self.element(3, "table", &[], self.result_html())]
                }
            }
            _ => Vec::new(),
        };
        Ok(found)
    }

    fn send_input(&mut self, element: &Element, text: &str) -> Result<(), DriverError> {
        self.check(element)?;
        self.journal.push(format!("type {}", text));
        self.typed.push_str(text);
        Ok(())
    }

    fn click(&mut self, element: &Element) -> Result<(), DriverError> {
        self.check(element)?;
        self.journal.push(format!("click {}", element.attr("name").unwrap_or("?")));
        self.submitted = true;
        self.generation += 1;
        self.url = format!("stub://portal/result?q={}", self.typed);
        Ok(())
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        self.journal.push("quit".to_string());
        self.quit = true;
        Ok(())
    }
}
