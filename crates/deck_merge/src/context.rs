//! Scoped name resolution for nested loop regions

use crate::value::{Scope, Value};

static EMPTY_SCOPE: Scope = Scope::new();

#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    scope: &'a Scope,
    /// The collection element this frame was entered for, if any
    item: Option<&'a Value>,
}

/// A stack of scopes. The root frame is never popped.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> RenderContext<'a> {
    pub fn new(root: &'a Scope) -> Self {
        Self { frames: vec![Frame { scope: root, item: None }] }
    }

    /// Enter the scope of one collection element or object
    pub fn push(&mut self, item: &'a Value) {
        let scope = item.as_object().unwrap_or(&EMPTY_SCOPE);
        self.frames.push(Frame { scope, item: Some(item) });
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Resolve a name, innermost scope first.
    ///
    /// `.` is the current element; dotted names descend into objects when
    /// no binding matches the full name.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        if name == "." {
            return self.frames.iter().rev().find_map(|f| f.item);
        }
        if let Some(value) = self.lookup_plain(name) {
            return Some(value);
        }
        let mut segments = name.split('.').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut current = self.lookup_plain(first)?;
        let mut descended = false;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
            descended = true;
        }
        descended.then_some(current)
    }

    fn lookup_plain(&self, name: &str) -> Option<&'a Value> {
        self.frames.iter().rev().find_map(|f| f.scope.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_innermost_first() {
        let root = Value::root_scope(&json!({
            "name": "Project",
            "customer": "ACME",
            "stations": [{"name": "WS-01"}]
        }));
        let mut ctx = RenderContext::new(&root);
        assert_eq!(ctx.lookup("name").unwrap().as_text(), Some("Project"));

        let station = &root["stations"].as_collection().unwrap()[0];
        ctx.push(station);
        assert_eq!(ctx.lookup("name").unwrap().as_text(), Some("WS-01"));
        // Falls back outward
        assert_eq!(ctx.lookup("customer").unwrap().as_text(), Some("ACME"));
        ctx.pop();
        assert_eq!(ctx.lookup("name").unwrap().as_text(), Some("Project"));
    }

    #[test]
    fn test_root_never_popped() {
        let root = Value::root_scope(&json!({"a": 1}));
        let mut ctx = RenderContext::new(&root);
        ctx.pop();
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.lookup("a").is_some());
    }

    #[test]
    fn test_dotted_path_and_current_item() {
        let root = Value::root_scope(&json!({
            "camera": {"model": "acA1920"},
            "tags": ["inspection", "ocr"]
        }));
        let mut ctx = RenderContext::new(&root);
        assert_eq!(ctx.lookup("camera.model").unwrap().as_text(), Some("acA1920"));
        assert!(ctx.lookup("camera.missing").is_none());
        assert!(ctx.lookup(".").is_none());

        let tag = &root["tags"].as_collection().unwrap()[1];
        ctx.push(tag);
        assert_eq!(ctx.lookup(".").unwrap().as_text(), Some("ocr"));
    }

    #[test]
    fn test_missing_name() {
        let root = Value::root_scope(&json!({}));
        let ctx = RenderContext::new(&root);
        assert!(ctx.lookup("nothing").is_none());
    }
}
