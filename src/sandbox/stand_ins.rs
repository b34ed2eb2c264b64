//! Browser stand-ins installed into the evaluation context
//!
//! Player code probes a handful of browser globals before doing real work.
//! The stand-ins below are defined on the global object only where the host
//! does not already provide the identifier.

use crate::core::DEFAULT_USER_AGENT;
use crate::error::SigtractError;
use serde::{Deserialize, Serialize};

/// How the stand-ins are bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandInMode {
    /// Full set, each defined when `typeof` reports `undefined`
    Full,
    /// Reduced set, each defined only when the name is absent from the
    /// global object
    Relaxed,
}

/// Values the stand-in objects report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandIns {
    pub user_agent: String,
    pub platform: String,
    pub language: String,
    pub origin: String,
    pub hostname: String,
    pub protocol: String,
}

impl Default for StandIns {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            platform: "Win32".to_string(),
            language: "en-US".to_string(),
            origin: "https://www.youtube.com".to_string(),
            hostname: "www.youtube.com".to_string(),
            protocol: "https:".to_string(),
        }
    }
}

impl StandIns {
    /// Override the reported user agent
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Script that installs the stand-ins for `mode`
    pub fn prelude(&self, mode: StandInMode) -> Result<String, SigtractError> {
        let body = match mode {
            StandInMode::Full => FULL_PRELUDE,
            StandInMode::Relaxed => RELAXED_PRELUDE,
        };
        Ok(format!("({})(globalThis, {});", body, serde_json::to_string(self)?))
    }
}

const FULL_PRELUDE: &str = r#"function (g, cfg) {
  function standIn(name, value) {
    if (typeof g[name] === 'undefined') {
      g[name] = value;
    }
  }
  function storage() {
    return {
      getItem: function () { return null; },
      setItem: function () {},
      removeItem: function () {}
    };
  }
  var location = {
    href: cfg.origin,
    hostname: cfg.hostname,
    protocol: cfg.protocol,
    origin: cfg.origin
  };
  var navigator = {
    userAgent: cfg.userAgent,
    platform: cfg.platform,
    language: cfg.language
  };
  standIn('window', { location: location, navigator: navigator });
  standIn('self', g.window);
  standIn('globalThis', g.window);
  standIn('document', {
    createElement: function () {
      return {
        style: {},
        appendChild: function () {},
        setAttribute: function () {},
        getElementsByTagName: function () { return []; }
      };
    },
    getElementsByTagName: function () { return []; },
    getElementById: function () { return null; },
    body: { appendChild: function () {} },
    head: { appendChild: function () {} }
  });
  standIn('navigator', navigator);
  standIn('location', location);
  standIn('performance', {
    now: function () { return Date.now(); },
    timing: { navigationStart: Date.now() }
  });
  standIn('localStorage', storage());
  standIn('sessionStorage', storage());
  standIn('crypto', {
    getRandomValues: function (arr) {
      for (var i = 0; i < arr.length; i++) {
        arr[i] = Math.floor(Math.random() * 256);
      }
      return arr;
    }
  });
}"#;

const RELAXED_PRELUDE: &str = r#"function (g, cfg) {
  function standIn(name, value) {
    if (!(name in g)) {
      g[name] = value;
    }
  }
  standIn('window', {});
  standIn('self', g.window);
  standIn('globalThis', g.window);
  standIn('document', { createElement: function () { return {}; } });
  standIn('navigator', { userAgent: cfg.userAgent });
  standIn('location', { href: cfg.origin });
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stand_ins() {
        let stand_ins = StandIns::default();
        assert!(stand_ins.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(stand_ins.hostname, "www.youtube.com");
    }

    #[test]
    fn test_prelude_embeds_config_as_json() {
        let stand_ins = StandIns::default().with_user_agent("Agent \"quoted\"");
        let prelude = stand_ins.prelude(StandInMode::Full).unwrap();
        assert!(prelude.starts_with("(function (g, cfg) {"));
        assert!(prelude.contains(r#""userAgent":"Agent \"quoted\"""#));
        assert!(prelude.ends_with("})(globalThis, {\"userAgent\":\"Agent \\\"quoted\\\"\",\"platform\":\"Win32\",\"language\":\"en-US\",\"origin\":\"https://www.youtube.com\",\"hostname\":\"www.youtube.com\",\"protocol\":\"https:\"});"));
    }

    #[test]
    fn test_relaxed_prelude_is_reduced() {
        let prelude = StandIns::default().prelude(StandInMode::Relaxed).unwrap();
        assert!(prelude.contains("!(name in g)"));
        assert!(!prelude.contains("crypto"));
        assert!(!prelude.contains("localStorage"));
    }
}
