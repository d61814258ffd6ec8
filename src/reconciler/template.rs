//! # Accessor Template Resolution
//!
//! Specification strings may reference another backend's accessor id
//! before that id is known, using tokens of the shape
//! `__accessor__<mount-path>` (path without trailing separator). During a
//! pass each token is replaced with the accessor the server assigned to
//! that mount.
//!
//! Candidate mounts are matched longest-path-first, so a token for
//! `github-mount` can never be clobbered by a mount named `github`.
//! Tokens with no matching mount are left in place and logged.

use tracing::{debug, info};

/// Item fields that may contain accessor templates.
const TEMPLATED_FIELDS: &[&str] = &["allowed_domains"];

const TOKEN_PREFIX: &str = "__accessor__";

/// Replace accessor tokens in the templatable fields of a decoded item.
/// `accessors` must be sorted longest path first.
pub(crate) fn resolve_accessor_templates(
    data: &mut serde_json::Map<String, serde_json::Value>,
    accessors: &[(String, String)],
) {
    for field in TEMPLATED_FIELDS {
        let Some(serde_json::Value::Array(values)) = data.get_mut(*field) else {
            continue;
        };

        for value in values {
            if let serde_json::Value::String(s) = value {
                *s = replace_accessor(s, accessors);
            }
        }
    }
}

fn replace_accessor(input: &str, accessors: &[(String, String)]) -> String {
    let mut output = input.to_string();

    for (path, accessor) in accessors {
        let token = format!("{TOKEN_PREFIX}{path}");
        if output.contains(&token) {
            info!("{TOKEN_PREFIX} field replaced in string {input} by accessor {accessor}");
            output = output.replace(&token, accessor);
        }
    }

    if output.contains(TOKEN_PREFIX) {
        debug!("no mount matched remaining accessor token in {output}");
    }

    output
}
