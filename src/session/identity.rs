// src/session/identity.rs

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A browser fingerprint presented to a site for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_agent: String,
    pub locale: String,
    pub timezone: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Identity {
    /// "pt-BR,pt;q=0.9,en;q=0.7"
    pub fn accept_language(&self) -> String {
        let lang = self.locale.split('-').next().unwrap_or("pt");
        format!("{},{lang};q=0.9,en;q=0.7", self.locale)
    }

    /// Script run on each document to hide automation markers and align the
    /// JS-visible locale/timezone with the identity.
    pub fn stealth_script(&self) -> String {
        let lang = self.locale.split('-').next().unwrap_or("pt");
        format!(
            r#"(() => {{
  try {{ Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }}); }} catch (e) {{}}
  try {{ Object.defineProperty(navigator, 'languages', {{ get: () => ['{locale}', '{lang}'] }}); }} catch (e) {{}}
  try {{ Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }}); }} catch (e) {{}}
  try {{ window.chrome = window.chrome || {{ runtime: {{}} }}; }} catch (e) {{}}
  try {{
    const resolved = Intl.DateTimeFormat.prototype.resolvedOptions;
    Intl.DateTimeFormat.prototype.resolvedOptions = function () {{
      const opts = resolved.call(this);
      opts.timeZone = '{tz}';
      return opts;
    }};
  }} catch (e) {{}}
}})();"#,
            locale = self.locale,
            lang = lang,
            tz = self.timezone,
        )
    }
}

fn identity(ua: &str, locale: &str, tz: &str, w: u32, h: u32) -> Identity {
    Identity {
        user_agent: ua.to_string(),
        locale: locale.to_string(),
        timezone: tz.to_string(),
        viewport_width: w,
        viewport_height: h,
    }
}

/// Rotation pool an adapter draws one identity from per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPool {
    identities: Vec<Identity>,
}

impl IdentityPool {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// Random member of the pool; the built-in default when the pool is empty.
    pub fn pick(&self) -> Identity {
        self.identities
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| Self::default().identities[0].clone())
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new(vec![
            identity(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
                "pt-BR",
                "America/Sao_Paulo",
                1920,
                1080,
            ),
            identity(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
                "pt-BR",
                "America/Sao_Paulo",
                1440,
                900,
            ),
            identity(
                "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
                "pt-BR",
                "America/Recife",
                1366,
                768,
            ),
            identity(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
                "pt-BR",
                "America/Manaus",
                1536,
                864,
            ),
        ])
    }
}
