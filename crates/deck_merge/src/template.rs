//! Compiling part text into a tree of text, fields and repeated sections

use crate::error::{MergeError, Result, TemplateIssue};
use crate::token::{scan, Token};

/// One node of a compiled template
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'t> {
    Text(&'t str),
    Field(String),
    Section { name: String, children: Vec<Node<'t>> },
}

/// A compiled template borrowing its literal text from the source
#[derive(Debug, Clone, PartialEq)]
pub struct Template<'t> {
    pub nodes: Vec<Node<'t>>,
    pub token_count: usize,
}

struct OpenSection<'t> {
    name: String,
    children: Vec<Node<'t>>,
}

impl<'t> Template<'t> {
    /// Compile `text`, checking loop balance.
    ///
    /// All problems are collected before failing so the caller can report
    /// every offending tag at once.
    pub fn compile(text: &'t str) -> Result<Self> {
        let tokens = scan(text);
        let token_count = tokens.len();
        let mut issues = Vec::new();
        let mut stack: Vec<OpenSection<'t>> = Vec::new();
        let mut current: Vec<Node<'t>> = Vec::new();
        let mut cursor = 0;

        for located in tokens {
            if located.start > cursor {
                current.push(Node::Text(&text[cursor..located.start]));
            }
            cursor = located.end;

            match located.token {
                Token::Scalar(name) => current.push(Node::Field(name)),
                Token::LoopOpen(name) => {
                    let parent = std::mem::take(&mut current);
                    stack.push(OpenSection { name, children: parent });
                }
                Token::LoopClose(name) => {
                    let Some(depth) = stack.iter().rposition(|open| open.name == name) else {
                        issues.push(TemplateIssue::new(
                            "unopened_tag",
                            format!("Closing tag {{{{/{}}}}} has no matching opening tag", name),
                        ));
                        continue;
                    };

                    if depth != stack.len() - 1 {
                        let innermost = &stack[stack.len() - 1].name;
                        issues.push(TemplateIssue::new(
                            "closing_tag_does_not_match_opening_tag",
                            format!(
                                "Closing tag {{{{/{}}}}} does not match opening tag {{{{#{}}}}}",
                                name, innermost
                            ),
                        ));
                    }

                    // Close every section down to the matching one
                    while stack.len() > depth {
                        let Some(open) = stack.pop() else { break };
                        let section = Node::Section {
                            name: open.name,
                            children: std::mem::replace(&mut current, open.children),
                        };
                        current.push(section);
                    }
                }
            }
        }

        if cursor < text.len() {
            current.push(Node::Text(&text[cursor..]));
        }

        for open in &stack {
            issues.push(TemplateIssue::new(
                "unclosed_tag",
                format!("Opening tag {{{{#{}}}}} is never closed", open.name),
            ));
        }

        if !issues.is_empty() {
            return Err(MergeError::TemplateSyntax(issues));
        }

        Ok(Self { nodes: current, token_count })
    }

    pub fn has_tokens(&self) -> bool {
        self.token_count > 0
    }
}
