use reqwest::Url;

use crate::error::CoreError;

/// Validate an Esplora base URL and return it without a trailing slash so
/// paths can be appended with `format!("{base}/address/...")`.
pub(super) fn parse_base_url(base_url: &str) -> Result<String, CoreError> {
    let parsed = Url::parse(base_url).map_err(|e| {
        CoreError::InvalidConfig(format!(
            "invalid esplora url `{base_url}`: expected HTTP(S) URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(base_url.trim_end_matches('/').to_owned()),
        other => Err(CoreError::InvalidConfig(format!(
            "unsupported esplora url scheme `{other}`; expected http or https"
        ))),
    }
}
