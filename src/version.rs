//! Build metadata stamped in by `build.rs`.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version plus git metadata, e.g. `0.1.0+main.1a2b3c4`.
///
/// Branch and sha fall back to `unknown` outside a git checkout; a dirty
/// tree adds `.dirty`. Printed by `genkit --version` and sent in the user
/// agent.
pub fn version_string() -> String {
    let branch = option_env!("VERGEN_GIT_BRANCH").unwrap_or("unknown");
    let sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown");
    let short_sha = sha.get(..7).unwrap_or(sha);
    let dirty = match option_env!("VERGEN_GIT_DIRTY") {
        Some("true") => ".dirty",
        _ => "",
    };
    format!("{PKG_VERSION}+{branch}.{short_sha}{dirty}")
}

pub(crate) fn user_agent() -> String {
    format!("genkit-gateway/{}", version_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_has_build_suffix() {
        let version = version_string();
        let suffix = version
            .strip_prefix(PKG_VERSION)
            .and_then(|rest| rest.strip_prefix('+'))
            .expect("version carries a +build suffix");
        assert!(suffix.contains('.'));
    }

    #[test]
    fn user_agent_names_crate() {
        assert!(user_agent().starts_with("genkit-gateway/"));
    }
}
