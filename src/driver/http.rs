// src/driver/http.rs
//
// A non-scripting driver for server-rendered portals: pages are fetched with a
// cookie-keeping HTTP client, elements are located with CSS selectors, and
// clicking a submit control posts its enclosing form.

use super::{Driver, DriverError, Element, ElementHandle, Locator};
use reqwest::blocking::{Client, RequestBuilder};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use url::Url;

struct Page {
    url: Url,
    html: String,
    generation: u64,
    /// Typed values keyed by element index.
    typed: HashMap<usize, String>,
}

pub struct HttpDriver {
    client: Client,
    page: Option<Page>,
    generation: u64,
    closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

/// What submitting a form sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormSubmission {
    pub method: Method,
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

fn transport(e: reqwest::Error) -> DriverError {
    DriverError::Transport(e.to_string())
}

fn parse_url(raw: &str) -> Result<Url, DriverError> {
    Url::parse(raw).map_err(|e| DriverError::BadUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn join_url(base: &Url, href: &str) -> Result<Url, DriverError> {
    base.join(href).map_err(|e| DriverError::BadUrl {
        url: href.to_string(),
        reason: e.to_string(),
    })
}

/// Every element of the document in document order.
fn all_elements(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn snapshot(el: ElementRef<'_>, generation: u64, index: usize) -> Element {
    Element {
        handle: ElementHandle { generation, index },
        tag: el.value().name().to_string(),
        text: el.text().collect::<String>().trim().to_string(),
        html: el.html(),
        attrs: el
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn attr_is(el: &ElementRef<'_>, name: &str, value: &str) -> bool {
    el.value()
        .attr(name)
        .map(|v| v.eq_ignore_ascii_case(value))
        .unwrap_or(false)
}

pub(crate) fn is_submit(tag: &str, kind: Option<&str>) -> bool {
    match tag {
        "button" => kind.map_or(true, |k| k.eq_ignore_ascii_case("submit")),
        "input" => kind.map_or(false, |k| {
            k.eq_ignore_ascii_case("submit") || k.eq_ignore_ascii_case("image")
        }),
        _ => false,
    }
}

/// Build the submission for clicking the element at `clicked` in `html`.
pub(crate) fn form_submission(
    html: &str,
    base: &Url,
    clicked: usize,
    typed: &HashMap<usize, String>,
) -> Result<FormSubmission, DriverError> {
    let doc = Html::parse_document(html);
    let elements = all_elements(&doc);
    let index: HashMap<_, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id(), i))
        .collect();

    let button = elements.get(clicked).ok_or(DriverError::StaleElement)?;
    let form = button
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "form")
        .ok_or(DriverError::NoForm)?;

    let method = if attr_is(&form, "method", "post") {
        Method::Post
    } else {
        Method::Get
    };
    let action = match form.value().attr("action").map(str::trim) {
        Some(a) if !a.is_empty() => join_url(base, a)?,
        _ => base.clone(),
    };

    let mut fields = Vec::new();
    for control in form.descendants().filter_map(ElementRef::wrap) {
        let el = control.value();
        let Some(name) = el.attr("name") else {
            continue;
        };
        if el.attr("disabled").is_some() {
            continue;
        }
        let idx = index.get(&control.id()).copied();
        let is_clicked = idx == Some(clicked);
        let typed_value = idx.and_then(|i| typed.get(&i)).cloned();

        let value = match el.name() {
            "input" => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "image" | "button" | "reset" => {
                        if !is_clicked {
                            continue;
                        }
                        el.attr("value").unwrap_or_default().to_string()
                    }
                    "checkbox" | "radio" => {
                        if el.attr("checked").is_none() {
                            continue;
                        }
                        el.attr("value").unwrap_or("on").to_string()
                    }
                    "file" => continue,
                    _ => typed_value
                        .unwrap_or_else(|| el.attr("value").unwrap_or_default().to_string()),
                }
            }
            "button" => {
                if !is_clicked {
                    continue;
                }
                el.attr("value").unwrap_or_default().to_string()
            }
            "textarea" => typed_value.unwrap_or_else(|| control.text().collect()),
            "select" => match typed_value {
                Some(v) => v,
                None => selected_option(control).unwrap_or_default(),
            },
            _ => continue,
        };
        fields.push((name.to_string(), value));
    }

    Ok(FormSubmission {
        method,
        action,
        fields,
    })
}

fn selected_option(select: ElementRef<'_>) -> Option<String> {
    let options: Vec<ElementRef<'_>> = select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "option")
        .collect();
    let chosen = options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.first())?;
    Some(
        chosen
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string()),
    )
}

impl HttpDriver {
    pub fn new(user_agent: &str) -> Result<Self, DriverError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .build()
            .map_err(transport)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            page: None,
            generation: 0,
            closed: false,
        }
    }

    /// Install an already-fetched page as the current one.
    pub fn load_html(&mut self, url: &str, html: impl Into<String>) -> Result<(), DriverError> {
        self.ensure_open()?;
        let url = parse_url(url)?;
        self.install(url, html.into());
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn page(&self) -> Result<&Page, DriverError> {
        self.ensure_open()?;
        self.page.as_ref().ok_or(DriverError::NoPage)
    }

    /// The current page, provided `element` was located on it.
    fn page_for(&self, element: &Element) -> Result<&Page, DriverError> {
        let page = self.page()?;
        if element.handle.generation != page.generation {
            return Err(DriverError::StaleElement);
        }
        Ok(page)
    }

    fn install(&mut self, url: Url, html: String) {
        self.generation += 1;
        self.page = Some(Page {
            url,
            html,
            generation: self.generation,
            typed: HashMap::new(),
        });
    }

    #[instrument(level = "debug", skip(self, request))]
    fn load(&mut self, request: RequestBuilder) -> Result<(), DriverError> {
        self.ensure_open()?;
        let resp = request
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let url = resp.url().clone();
        let html = resp.text().map_err(transport)?;
        info!(%url, bytes = html.len(), "loaded page");
        self.install(url, html);
        Ok(())
    }

    fn submit(&mut self, form: FormSubmission) -> Result<(), DriverError> {
        debug!(action = %form.action, method = ?form.method, fields = form.fields.len(), "submitting form");
        let request = match form.method {
            Method::Get => {
                let mut url = form.action;
                if form.fields.is_empty() {
                    url.set_query(None);
                } else {
                    url.query_pairs_mut().clear().extend_pairs(&form.fields);
                }
                self.client.get(url)
            }
            Method::Post => self.client.post(form.action).form(&form.fields),
        };
        self.load(request)
    }
}

impl Driver for HttpDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let url = parse_url(url)?;
        let request = self.client.get(url);
        self.load(request)
    }

    fn current_url(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self
            .page
            .as_ref()
            .map(|p| p.url.to_string())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    fn find_elements(&mut self, locator: &Locator) -> Result<Vec<Element>, DriverError> {
        let page = self.page()?;
        let css = locator.to_css();
        let selector = Selector::parse(&css).map_err(|e| DriverError::InvalidLocator {
            locator: locator.to_string(),
            reason: format!("{:?}", e),
        })?;

        let doc = Html::parse_document(&page.html);
        let index: HashMap<_, usize> = all_elements(&doc)
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id(), i))
            .collect();

        Ok(doc
            .select(&selector)
            .filter_map(|el| index.get(&el.id()).map(|&i| snapshot(el, page.generation, i)))
            .collect())
    }

    fn send_input(&mut self, element: &Element, text: &str) -> Result<(), DriverError> {
        self.page_for(element)?;
        if !matches!(element.tag.as_str(), "input" | "textarea" | "select") {
            return Err(DriverError::Unsupported {
                action: "type into",
                tag: element.tag.clone(),
            });
        }
        let page = self.page.as_mut().ok_or(DriverError::NoPage)?;
        page.typed
            .entry(element.handle.index)
            .or_insert_with(|| element.attr("value").unwrap_or_default().to_string())
            .push_str(text);
        Ok(())
    }

    fn click(&mut self, element: &Element) -> Result<(), DriverError> {
        let page = self.page_for(element)?;
        match element.tag.as_str() {
            "a" => {
                let href = element.attr("href").ok_or_else(|| DriverError::Unsupported {
                    action: "follow",
                    tag: "a (no href)".to_string(),
                })?;
                let url = join_url(&page.url, href)?;
                let request = self.client.get(url);
                self.load(request)
            }
            tag if is_submit(tag, element.attr("type")) => {
                let form = form_submission(&page.html, &page.url, element.handle.index, &page.typed)?;
                self.submit(form)
            }
            other => Err(DriverError::Unsupported {
                action: "click",
                tag: other.to_string(),
            }),
        }
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.closed = true;
            self.page = None;
            info!("driver session closed");
        }
        Ok(())
    }
}
