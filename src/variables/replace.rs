// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Replacing Fleet variables with resolved values.
//!
//! Shell scripts receive shell-quoted values. XML profiles receive
//! XML-escaped values. CA-name-suffixed variables are matched on a word
//! boundary so that a CA named `corp` never consumes the placeholder of a CA
//! named `corp2`.

use std::borrow::Cow;

use regex::{NoExpand, Regex};

use super::FLEET_VAR_PREFIX;
use crate::error::Result;

/// Kind of content being substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A shell script delivered to `fleetd`.
    ShellScript,
    /// An XML configuration profile (Apple plist or Windows SyncML).
    XmlProfile,
    /// Free text such as a CA certificate template field; values are inserted verbatim.
    PlainText,
}

impl ContentKind {
    /// Escape a resolved value for this content kind.
    pub fn escape<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Self::ShellScript => shell_escape::unix::escape(Cow::Borrowed(value)),
            Self::XmlProfile => quick_xml::escape::escape(value),
            Self::PlainText => Cow::Borrowed(value),
        }
    }
}

fn variable_pattern(name: &str) -> String {
    let full = regex::escape(&format!("{FLEET_VAR_PREFIX}{name}"));
    format!(r"\$\{{{full}\}}|\${full}\b")
}

/// Replace every occurrence of `$FLEET_VAR_<name>` and `${FLEET_VAR_<name>}`.
///
/// The value is escaped for `kind` before insertion.
///
/// # Errors
///
/// Returns an error if the generated pattern fails to compile.
pub fn replace_variable(kind: ContentKind, contents: &str, name: &str, value: &str) -> Result<String> {
    let re = Regex::new(&variable_pattern(name))?;
    let escaped = kind.escape(value);
    Ok(re.replace_all(contents, NoExpand(&escaped)).into_owned())
}

/// Replace a CA-name-suffixed variable.
///
/// In XML profiles the variable must be the whole text of an element;
/// whitespace between the tags and the placeholder is dropped. Other content
/// kinds behave like [`replace_variable`].
///
/// # Errors
///
/// Returns an error if the generated pattern fails to compile.
pub fn replace_exact_prefix_variable(
    kind: ContentKind,
    contents: &str,
    name: &str,
    value: &str,
) -> Result<String> {
    match kind {
        ContentKind::ShellScript | ContentKind::PlainText => {
            replace_variable(kind, contents, name, value)
        }
        ContentKind::XmlProfile => {
            let re = Regex::new(&format!(r">\s*(?:{})\s*<", variable_pattern(name)))?;
            let replacement = format!(">{}<", kind.escape(value));
            Ok(re.replace_all(contents, NoExpand(&replacement)).into_owned())
        }
    }
}
