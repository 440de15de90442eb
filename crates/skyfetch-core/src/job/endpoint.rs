//! Cutout service URL template.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::format_coord;

/// Run-wide constants of the cutout service; `ra`, `dec` and `size` vary per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoutEndpoint {
    pub base_url: String,
    pub layer: String,
    pub pixscale: f64,
    pub bands: String,
}

impl Default for CutoutEndpoint {
    fn default() -> Self {
        Self {
            base_url: "https://www.legacysurvey.org/viewer/jpeg-cutout".to_string(),
            layer: "ls-dr9".to_string(),
            pixscale: 0.262,
            bands: "grz".to_string(),
        }
    }
}

impl CutoutEndpoint {
    /// Check that `base_url` is an absolute http(s) URL without a query.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid cutout base URL: {}", self.base_url))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!("unsupported cutout URL scheme: {}", other),
        }
        if parsed.query().is_some() {
            anyhow::bail!("cutout base URL must not carry a query: {}", self.base_url);
        }
        Ok(())
    }

    pub fn url_for(&self, ra: f64, dec: f64, size: u32) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("ra", &format_coord(ra))
            .append_pair("dec", &format_coord(dec))
            .append_pair("size", &size.to_string())
            .append_pair("layer", &self.layer)
            .append_pair("pixscale", &self.pixscale.to_string())
            .append_pair("bands", &self.bands)
            .finish();
        format!("{}?{}", self.base_url, query)
    }
}
