use anyhow::Context;

pub const FEED_LIMIT_VAR: &str = "MICRO_FEED_LIMIT";
pub const SEARCH_LIMIT_VAR: &str = "MICRO_SEARCH_LIMIT";

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size of the recent / top-liked / top-visited course feeds
    pub feed_limit: usize,

    /// Cap on server-side search results
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            feed_limit: 10,
            search_limit: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let mut res = Config::default();
        if let Some(v) = read_var(FEED_LIMIT_VAR)? {
            res.feed_limit = v;
        }
        if let Some(v) = read_var(SEARCH_LIMIT_VAR)? {
            res.search_limit = v;
        }
        tracing::debug!(config=?res, "loaded configuration");
        Ok(res)
    }
}

fn read_var(name: &str) -> anyhow::Result<Option<usize>> {
    match std::env::var(name) {
        Ok(v) => Ok(Some(
            v.trim()
                .parse()
                .with_context(|| format!("parsing {name}={v:?} as a positive integer"))?,
        )),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {name}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "feed_limit": 3 }"#).unwrap();
        assert_eq!(
            cfg,
            Config {
                feed_limit: 3,
                search_limit: 50
            }
        );
    }

    #[test]
    fn env_overrides() {
        // the only test touching these variables
        std::env::set_var(FEED_LIMIT_VAR, "4");
        std::env::remove_var(SEARCH_LIMIT_VAR);
        assert_eq!(Config::from_env().unwrap().feed_limit, 4);
        std::env::set_var(FEED_LIMIT_VAR, "many");
        let err = Config::from_env().unwrap_err();
        assert!(format!("{err:#}").contains(FEED_LIMIT_VAR));
        std::env::remove_var(FEED_LIMIT_VAR);
        assert_eq!(Config::from_env().unwrap(), Config::default());
    }
}
