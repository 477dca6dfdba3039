use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::{Browser, BrowserError, ElementHandle, Locator, Page};

#[derive(Debug, Clone, Default)]
struct FixtureSite {
    html: String,
    scripted: HashMap<String, String>,
}

/// In-memory browser serving canned HTML per URL.
///
/// Scripts registered with [`FixtureBrowser::with_script_result`] swap the document
/// the way a page's own JavaScript would re-render it; any other script is a no-op.
#[derive(Debug, Clone, Default)]
pub struct FixtureBrowser {
    sites: Arc<HashMap<String, FixtureSite>>,
    unavailable: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    scripts: Arc<Mutex<Vec<String>>>,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A browser whose sessions can never be started.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        let sites = Arc::make_mut(&mut self.sites);
        sites.entry(url.into()).or_default().html = html.into();
        self
    }

    pub fn with_script_result(
        mut self,
        url: impl Into<String>,
        script: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        let sites = Arc::make_mut(&mut self.sites);
        sites
            .entry(url.into())
            .or_default()
            .scripted
            .insert(script.into(), html.into());
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn executed_scripts(&self) -> Vec<String> {
        self.scripts
            .lock()
            .map(|scripts| scripts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        if self.unavailable {
            return Err(BrowserError::Session("fixture browser unavailable".to_string()));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixturePage {
            sites: Arc::clone(&self.sites),
            state: Mutex::new(PageState::default()),
            closed: Arc::clone(&self.closed),
            scripts: Arc::clone(&self.scripts),
        }))
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: Option<String>,
    html: Option<String>,
    closed: bool,
}

/// One fixture session. Text is rendered as one line per non-blank text node.
#[derive(Debug)]
pub struct FixturePage {
    sites: Arc<HashMap<String, FixtureSite>>,
    state: Mutex<PageState>,
    closed: Arc<AtomicUsize>,
    scripts: Arc<Mutex<Vec<String>>>,
}

impl FixturePage {
    /// A standalone page already showing `html`, for extraction tests.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            sites: Arc::new(HashMap::new()),
            state: Mutex::new(PageState {
                url: None,
                html: Some(html.into()),
                closed: false,
            }),
            closed: Arc::new(AtomicUsize::new(0)),
            scripts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_state<T>(
        &self,
        apply: impl FnOnce(&mut PageState) -> Result<T, BrowserError>,
    ) -> Result<T, BrowserError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BrowserError::Session("fixture state poisoned".to_string()))?;
        if state.closed {
            return Err(BrowserError::Session("session already closed".to_string()));
        }
        apply(&mut state)
    }

    fn document(&self) -> Result<String, BrowserError> {
        self.with_state(|state| {
            state
                .html
                .clone()
                .ok_or_else(|| BrowserError::Navigation {
                    url: "about:blank".to_string(),
                    reason: "no document loaded".to_string(),
                })
        })
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let html = self
            .sites
            .get(url)
            .map(|site| site.html.clone())
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                reason: "no fixture registered for url".to_string(),
            })?;
        self.with_state(|state| {
            state.url = Some(url.to_string());
            state.html = Some(html);
            Ok(())
        })
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError> {
        let html = self.document()?;
        if select(&html, None, locator)?.is_empty() {
            return Err(BrowserError::Timeout {
                locator: locator.to_string(),
                waited: timeout,
            });
        }
        Ok(())
    }

    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let html = self.document()?;
        select(&html, scope, locator)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let html = self.document()?;
        let document = Html::parse_document(&html);
        let element = resolve(&document, element)?;
        Ok(attribute_of(element, name))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        let html = self.document()?;
        let document = Html::parse_document(&html);
        let element = resolve(&document, element)?;
        Ok(rendered_text(element))
    }

    async fn execute(&self, script: &str) -> Result<(), BrowserError> {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push(script.to_string());
        }

        let sites = Arc::clone(&self.sites);
        self.with_state(|state| {
            let replacement = state
                .url
                .as_ref()
                .and_then(|url| sites.get(url))
                .and_then(|site| site.scripted.get(script));
            if let Some(html) = replacement {
                state.html = Some(html.clone());
            }
            Ok(())
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.with_state(|state| {
            state.closed = true;
            Ok(())
        })?;
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn select(
    html: &str,
    scope: Option<&ElementHandle>,
    locator: &Locator,
) -> Result<Vec<ElementHandle>, BrowserError> {
    let css = locator.to_css();
    let selector = Selector::parse(&css)
        .map_err(|err| BrowserError::Protocol(format!("invalid selector {css}: {err:?}")))?;
    let document = Html::parse_document(html);

    let handles = match scope {
        Some(handle) => resolve(&document, handle)?
            .select(&selector)
            .map(handle_for)
            .collect(),
        None => document.select(&selector).map(handle_for).collect(),
    };
    Ok(handles)
}

/// Encodes an element as its child-index path from the document root. Every
/// call reparses the same markup, so paths stay valid until the document changes.
fn handle_for(element: ElementRef<'_>) -> ElementHandle {
    let mut path = Vec::new();
    let mut node = Some(*element);
    while let Some(current) = node {
        let Some(parent) = current.parent() else {
            break;
        };
        path.push(current.prev_siblings().count().to_string());
        node = Some(parent);
    }
    path.reverse();
    ElementHandle(path.join("."))
}

fn resolve<'a>(document: &'a Html, handle: &ElementHandle) -> Result<ElementRef<'a>, BrowserError> {
    let stale = || BrowserError::StaleElement(handle.as_str().to_string());
    let mut node = document.tree.root();
    for step in handle.as_str().split('.').filter(|step| !step.is_empty()) {
        let index: usize = step.parse().map_err(|_| stale())?;
        node = node.children().nth(index).ok_or_else(stale)?;
    }
    ElementRef::wrap(node).ok_or_else(stale)
}

fn attribute_of(element: ElementRef<'_>, name: &str) -> Option<String> {
    let value = element.value();
    if name == "value" && value.name() == "select" {
        let selected = Selector::parse("option[selected]").ok()?;
        let any = Selector::parse("option").ok()?;
        let option = element
            .select(&selected)
            .next()
            .or_else(|| element.select(&any).next())?;
        return option
            .value()
            .attr("value")
            .map(str::to_string)
            .or_else(|| Some(option.text().collect::<String>().trim().to_string()));
    }
    value.attr(name).map(str::to_string)
}

fn rendered_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
