pub const APP_NAME: &str = "Mandi Arbitrage";
pub const APP_REPO_URL: &str = "https://github.com/skynatbs/mandi_arbitrage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// User agent sent to routing and price providers.
pub fn user_agent() -> String {
    format!("mandi-arbitrage/{} (+{})", version_label(), APP_REPO_URL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_version() {
        let agent = user_agent();
        assert!(agent.starts_with("mandi-arbitrage/"));
        assert!(agent.contains(&version_label()));
    }
}
