//! Post-login redirect target resolution.

use url::{ParseError, Url};

// Resolving a relative target against a fixed base exposes whether a browser
// would leave the origin (`//host`, `/\host`, embedded tabs and newlines).
const PROBE_BASE: &str = "http://redirect.invalid/";

/// Pick where to send a freshly authenticated caller.
///
/// `requested` is returned unchanged only when it is a same-origin relative
/// reference. Empty values, absolute URLs of any scheme, and references with
/// a network location yield `default_target`.
#[must_use]
pub fn resolve_post_login_target(requested: Option<&str>, default_target: &str) -> String {
    match requested {
        Some(target) if is_same_origin_path(target) => target.to_string(),
        _ => default_target.to_string(),
    }
}

fn is_same_origin_path(target: &str) -> bool {
    if target.trim().is_empty() {
        return false;
    }

    // Anything that parses on its own carries a scheme.
    match Url::parse(target) {
        Err(ParseError::RelativeUrlWithoutBase) => {}
        Ok(_) | Err(_) => return false,
    }

    let Ok(base) = Url::parse(PROBE_BASE) else {
        return false;
    };

    base.join(target)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}
