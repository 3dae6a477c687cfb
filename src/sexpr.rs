use std::{borrow::Cow, fmt::Display};

use crate::error::ParseError;

mod lexer;
mod parser;

pub use parser::parse_document;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SExpr<'a> {
    /// A labeled list, `(label child...)`
    SExpr(&'a str, Box<[SExpr<'a>]>),
    /// A bare token such as `smd` or `1.27`
    Atom(Cow<'a, str>),
    /// A quoted string with escapes resolved
    String(Cow<'a, str>),
}

impl<'a> Display for SExpr<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::SExpr(label, children) => {
                write!(f, "({}", label)?;
                for child in children.iter() {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
            SExpr::Atom(s) => write!(f, "{}", s),
            SExpr::String(s) => write!(f, "\"{}\"", escape(s)),
        }
    }
}

impl<'a> SExpr<'a> {
    pub fn list(label: &'a str, children: impl IntoIterator<Item = SExpr<'a>>) -> Self {
        SExpr::SExpr(label, children.into_iter().collect())
    }

    pub fn atom(s: impl Into<Cow<'a, str>>) -> Self {
        SExpr::Atom(s.into())
    }

    pub fn string(s: impl Into<Cow<'a, str>>) -> Self {
        SExpr::String(s.into())
    }

    pub fn label(&self) -> Option<&'a str> {
        match self {
            SExpr::SExpr(label, _) => Some(*label),
            _ => None,
        }
    }

    /// Text of an atom or a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) | SExpr::String(s) => Some(s.as_ref()),
            SExpr::SExpr(_, _) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|s| s.parse().ok())
    }

    /// Positional scalar children, skipping nested lists
    pub fn args<'b>(&'b self) -> ArgIterator<'a, 'b> {
        let iter = match self {
            SExpr::SExpr(_, children) => Some(children.iter()),
            _ => None,
        };
        ArgIterator { iter }
    }

    /// First scalar of the first child labeled `label`
    pub fn value(&self, label: &str) -> Result<&str, ParseError> {
        let child = self.child(label)?;
        child
            .args()
            .next()
            .ok_or_else(|| ParseError::MissingValue(label.to_owned()))
    }

    /// Like [`SExpr::value`] but `None` when the child is absent
    pub fn opt_value(&self, label: &str) -> Result<Option<&str>, ParseError> {
        match self.children(label).next() {
            None => Ok(None),
            Some(_) => self.value(label).map(Some),
        }
    }

    pub fn children<'b, 'c>(&'b self, label: &'c str) -> LabeledChildIterator<'a, 'b, 'c> {
        let iter = match self {
            SExpr::SExpr(_, children) => Some(children.iter()),
            _ => None,
        };
        LabeledChildIterator { iter, label }
    }

    pub fn child<'b>(&self, label: &'b str) -> Result<&SExpr<'a>, ParseError> {
        let mut iter = self.children(label);
        iter.next()
            .ok_or(ParseError::MissingChild(label.to_owned()))
    }

    /// All lists labeled `label` anywhere below and including `self`.
    /// Matching lists are not searched further.
    pub fn find_all<'b>(&'b self, label: &str, out: &mut Vec<&'b SExpr<'a>>) {
        if let SExpr::SExpr(l, children) = self {
            if *l == label {
                out.push(self);
                return;
            }
            for child in children.iter() {
                child.find_all(label, out);
            }
        }
    }

    /// Multi-line rendering, one nested list per line
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        let SExpr::SExpr(label, children) = self else {
            out.push_str(&self.to_string());
            return;
        };
        let is_list = |c: &SExpr| matches!(c, SExpr::SExpr(_, _));
        let flat = children.iter().all(|c| match c {
            SExpr::SExpr(_, inner) => !inner.iter().any(is_list),
            _ => true,
        });
        if flat {
            out.push_str(&self.to_string());
            return;
        }
        out.push('(');
        out.push_str(label);
        for child in children.iter() {
            match child {
                SExpr::SExpr(_, _) => {
                    out.push('\n');
                    out.push_str(&"  ".repeat(indent + 1));
                    child.write_pretty(out, indent + 1);
                }
                scalar => {
                    out.push(' ');
                    out.push_str(&scalar.to_string());
                }
            }
        }
        out.push('\n');
        out.push_str(&"  ".repeat(indent));
        out.push(')');
    }
}

#[derive(Debug)]
pub struct LabeledChildIterator<'a, 'b, 'c> {
    iter: Option<std::slice::Iter<'b, SExpr<'a>>>,
    label: &'c str,
}

impl<'a, 'b, 'c> Iterator for LabeledChildIterator<'a, 'b, 'c> {
    type Item = &'b SExpr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.iter.as_mut()?;
        loop {
            let item = iter.next();
            match &item {
                None => return None,
                Some(SExpr::SExpr(label, _)) => {
                    if *label == self.label {
                        return item;
                    }
                }
                Some(_) => continue,
            }
        }
    }
}

#[derive(Debug)]
pub struct ArgIterator<'a, 'b> {
    iter: Option<std::slice::Iter<'b, SExpr<'a>>>,
}

impl<'a, 'b> Iterator for ArgIterator<'a, 'b> {
    type Item = &'b str;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.as_mut()?.find_map(|c| c.as_str())
    }
}

impl<'a> TryFrom<&'a str> for SExpr<'a> {
    type Error = ParseError;

    /// Parses input holding exactly one top-level list
    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        let mut roots = parse_document(input)?;
        if roots.len() > 1 {
            return Err(ParseError::UnexpectedToken {
                expected: "end of input".to_owned(),
                found: format!("({}", roots[1].label().unwrap_or_default()),
                at: 0..input.len(),
            });
        }
        roots.pop().ok_or(ParseError::EmptyDocument)
    }
}

impl<'a> TryFrom<&'a String> for SExpr<'a> {
    type Error = ParseError;

    fn try_from(input: &'a String) -> Result<Self, Self::Error> {
        SExpr::try_from(input.as_str())
    }
}

pub(crate) fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['"', '\\', '\n', '\t', '\r']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
