//! Icinga 1.x / Nagios object definition blocks

use std::fmt::Write;

/// Column the values are aligned to, in tab stops of eight
const VALUE_COLUMN: usize = 24;

/// One `define <kind> { ... }` block
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBlock {
    kind: &'static str,
    comment: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl ObjectBlock {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            comment: None,
            fields: Vec::new(),
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((key, value.into()));
        self
    }

    pub fn optional_field(self, key: &'static str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    pub fn render_into(&self, out: &mut String) {
        if let Some(comment) = &self.comment {
            let _ = writeln!(out, "# {}", comment);
        }
        let _ = writeln!(out, "define {} {{", self.kind);
        for (key, value) in &self.fields {
            let _ = writeln!(out, "\t{}{}{}", key, padding(key), value);
        }
        out.push_str("\t}\n\n");
    }
}

fn padding(key: &str) -> String {
    let tabs = ((VALUE_COLUMN + 7).saturating_sub(key.len()) / 8).max(1);
    "\t".repeat(tabs)
}
