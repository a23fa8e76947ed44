//! Template merge engine
//!
//! Resolves compiled templates against a prepared data tree: scalar fields
//! are looked up innermost-scope-first and XML-escaped, sections repeat
//! their body once per collection element.

use crate::bindings::BindingRules;
use crate::context::RenderContext;
use crate::error::{MergeError, Result};
use crate::template::{Node, Template};
use crate::value::{Scope, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Options controlling a render
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Fail on tokens with no matching data instead of rendering them empty
    pub strict: bool,
    /// Derived-field rules applied to the data root
    pub bindings: BindingRules,
    /// Render timestamp for the `generated_*` fields; current time when unset
    #[serde(skip)]
    pub now: Option<DateTime<Utc>>,
}

impl RenderOptions {
    pub fn strict() -> Self {
        Self { strict: true, ..Default::default() }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_bindings(mut self, bindings: BindingRules) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Renders template text against a data tree
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: RenderOptions,
}

impl MergeEngine {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Build the root scope for a render: convert the caller's JSON and
    /// inject derived and generated fields.
    pub fn prepare(&self, data: &serde_json::Value) -> Scope {
        let mut root = Value::root_scope(data);
        let now = self.options.now.unwrap_or_else(Utc::now);
        self.options.bindings.apply(&mut root, now);
        root
    }

    /// Render one text. Text without tokens is returned borrowed.
    pub fn render_text<'t>(&self, text: &'t str, root: &Scope) -> Result<Cow<'t, str>> {
        let template = Template::compile(text)?;
        if !template.has_tokens() {
            return Ok(Cow::Borrowed(text));
        }
        let mut ctx = RenderContext::new(root);
        let mut out = String::with_capacity(text.len());
        self.render_nodes(&template.nodes, &mut ctx, &mut out)?;
        Ok(Cow::Owned(out))
    }

    fn render_nodes<'a>(
        &self,
        nodes: &[Node<'_>],
        ctx: &mut RenderContext<'a>,
        out: &mut String,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field(name) => match ctx.lookup(name) {
                    Some(Value::Scalar(scalar)) => {
                        out.push_str(&escape_xml(&scalar.to_string_value()))
                    }
                    Some(Value::Object(_)) | Some(Value::Collection(_)) => {
                        tracing::debug!(field = %name, "structured value used as scalar, rendered empty");
                    }
                    None => self.missing(name)?,
                },
                Node::Section { name, children } => match ctx.lookup(name) {
                    Some(Value::Collection(items)) => {
                        for item in items {
                            ctx.push(item);
                            let rendered = self.render_nodes(children, ctx, out);
                            ctx.pop();
                            rendered?;
                        }
                    }
                    Some(value @ Value::Object(_)) => {
                        ctx.push(value);
                        let rendered = self.render_nodes(children, ctx, out);
                        ctx.pop();
                        rendered?;
                    }
                    Some(value @ Value::Scalar(_)) => {
                        if value.is_truthy() {
                            self.render_nodes(children, ctx, out)?;
                        }
                    }
                    None => self.missing(name)?,
                },
            }
        }
        Ok(())
    }

    fn missing(&self, name: &str) -> Result<()> {
        if self.options.strict {
            return Err(MergeError::UnknownTag { name: name.to_string() });
        }
        Ok(())
    }
}

/// Escape the XML reserved characters in substituted text
pub fn escape_xml(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}
