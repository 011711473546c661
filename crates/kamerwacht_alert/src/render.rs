//! Digest rendering from embedded templates.
//!
//! Two templates are rendered from the same payload: a plain-text body and
//! an HTML body. The HTML template is auto-escaped by the engine (selected
//! by the `.html` name), so payload content never lands in markup raw.

use minijinja::Environment;
use thiserror::Error;

use crate::digest::DigestPayload;

const TEXT_TEMPLATE: &str = include_str!("../templates/email.txt");
const HTML_TEMPLATE: &str = include_str!("../templates/email.html");

#[derive(Error, Debug)]
#[error("Template error: {0}")]
pub struct RenderError(#[from] minijinja::Error);

pub struct DigestRenderer {
    env: Environment<'static>,
}

impl DigestRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template("email.txt", TEXT_TEMPLATE)?;
        env.add_template("email.html", HTML_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render_text(&self, payload: &DigestPayload) -> Result<String, RenderError> {
        Ok(self.env.get_template("email.txt")?.render(payload)?)
    }

    pub fn render_html(&self, payload: &DigestPayload) -> Result<String, RenderError> {
        Ok(self.env.get_template("email.html")?.render(payload)?)
    }
}
