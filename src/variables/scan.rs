// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Scanning content for Fleet variables.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FleetVarError, Result};

static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$FLEET_VAR_(?P<bare>\w+)|\$\{FLEET_VAR_(?P<braced>\w+)\}")
        .expect("variable pattern is valid")
});

/// Return every Fleet variable name in `contents`, in occurrence order.
///
/// Names are returned without the `FLEET_VAR_` prefix. Repeated occurrences
/// are kept so callers can detect a variable declared twice.
pub fn find_keep_duplicates(contents: &str) -> Vec<String> {
    VARIABLE_REGEX
        .captures_iter(contents)
        .filter_map(|caps| caps.name("bare").or_else(|| caps.name("braced")))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Return the distinct Fleet variable names in `contents`.
pub fn find(contents: &str) -> BTreeSet<String> {
    find_keep_duplicates(contents).into_iter().collect()
}

/// Whether `contents` contains at least one Fleet variable.
pub fn contains_fleet_variables(contents: &str) -> bool {
    VARIABLE_REGEX.is_match(contents)
}

/// Reject Fleet variables in declarative device management profiles.
///
/// # Errors
///
/// Returns a bad request error when any variable is present.
pub fn validate_declaration_variables(contents: &str) -> Result<()> {
    if contains_fleet_variables(contents) {
        return Err(FleetVarError::bad_request(
            "Fleet variables ($FLEET_VAR_*) are not currently supported in DDM profiles",
        ));
    }
    Ok(())
}
