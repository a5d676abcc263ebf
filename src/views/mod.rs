//! Site pages
//!
//! Server-rendered marketing pages, built with Tera from templates embedded
//! in the binary. Every page extends `layout.html`, which pulls in the
//! shared header and footer partials.
//!
//! Templates can call `current_year()` and use the `scream` filter, which
//! uppercases its input.

mod error;

pub use error::ViewError;

use chrono::{Datelike, Utc};
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as _;
use tera::{Context as TeraContext, Tera, Value};

/// Embedded page templates
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// Page-level variables shared by every template
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub title: &'static str,
    pub page_title: &'static str,
    pub meta_desc: &'static str,
    pub welcome_message: &'static str,
    pub canonical: &'static str,
}

/// The pages the site serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    About,
    Contact,
}

impl Page {
    /// Template file backing this page
    pub fn template(self) -> &'static str {
        match self {
            Page::Home => "home.html",
            Page::About => "about.html",
            Page::Contact => "contact.html",
        }
    }

    pub fn meta(self) -> PageMeta {
        match self {
            Page::Home => PageMeta {
                title: "Slackers Guide to Charleston",
                page_title: "Slackers Guide to Charleston",
                meta_desc: "Your locals guide to Charleston",
                welcome_message: "Welcome to the Slackers Guide",
                canonical: "",
            },
            Page::About => PageMeta {
                title: "About Me",
                page_title: "Web Developer, SEO Specialist, and Web Analyst experience",
                meta_desc: "Learn about the Slackers Guide.",
                welcome_message: "About The Slackers Guide",
                canonical: "",
            },
            Page::Contact => PageMeta {
                title: "Contact Us",
                page_title: "Contact Slackers Guide",
                meta_desc: "Reach out to Slackers Guide to add additional parks, restaurants, or any other local hole in the wall.",
                welcome_message: "Contact The Slacker Group",
                canonical: "",
            },
        }
    }
}

/// Compiled page templates
pub struct Views {
    tera: Tera,
}

impl Views {
    /// Compile every embedded template
    pub fn load() -> Result<Self, ViewError> {
        let mut templates = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name).ok_or_else(|| ViewError::NotLoaded(name.to_string()))?;
            let content = std::str::from_utf8(&file.data)
                .map_err(|e| ViewError::NotLoaded(format!("{}: {}", name, e)))?
                .to_string();
            templates.push((name.to_string(), content));
        }
        Self::from_templates(templates)
    }

    /// Compile templates given as `(name, source)` pairs
    pub fn from_templates<I>(templates: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tera = Tera::default();
        tera.register_function("current_year", current_year);
        tera.register_filter("scream", scream);

        tera.add_raw_templates(templates)
            .map_err(|e| ViewError::TemplateError(error_chain(&e)))?;

        tracing::debug!("Loaded {} page templates", tera.get_template_names().count());
        Ok(Self { tera })
    }

    /// Render one of the site pages
    pub fn render_page(&self, page: Page) -> Result<String, ViewError> {
        let context = TeraContext::from_serialize(page.meta())
            .map_err(|e| ViewError::TemplateError(error_chain(&e)))?;
        self.render(page.template(), &context)
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ViewError> {
        self.tera
            .render(template, context)
            .map_err(|e| ViewError::TemplateError(format!("Failed to render '{}': {}", template, error_chain(&e))))
    }
}

/// Flatten a Tera error and its causes into one message
fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn current_year(_args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::from(Utc::now().year()))
}

fn scream(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(s.to_uppercase())),
        other => Err(tera::Error::msg(format!("scream expects a string, got {}", other))),
    }
}
