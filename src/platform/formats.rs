//! Format descriptors and download URL resolution

use crate::error::SigtractError;
use crate::extract::{ExtractedFunctions, DECIPHER_ARGUMENT, N_ARGUMENT};
use crate::sandbox::{Bindings, Sandbox, ScriptValue};
use crate::utils::{decode_component, get_query_param, set_query_param, CipherParams};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};
use url::Url;

/// A streaming format as listed in a player response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Direct download URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// URL-encoded `s`, `sp` and `url` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_cipher: Option<String>,
    /// Older name of `signature_cipher`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// Every other field, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Format {
    pub fn with_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn with_signature_cipher(cipher: &str) -> Self {
        Self {
            signature_cipher: Some(cipher.to_string()),
            ..Self::default()
        }
    }

    /// Whether the URL has to be recovered from a cipher field
    pub fn is_ciphered(&self) -> bool {
        non_empty(&self.url).is_none()
            && (non_empty(&self.signature_cipher).is_some() || non_empty(&self.cipher).is_some())
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Suspicious n-transform outcomes. Both are reported, neither is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NAnomaly {
    /// Output equals input, a short-circuit guard probably survived
    Unchanged,
    /// Output carries the error tag the transform emits when it throws
    Exception,
}

/// Classify an n-transform result
pub fn detect_n_anomaly(input: &str, output: &str) -> Option<NAnomaly> {
    if input == output {
        Some(NAnomaly::Unchanged)
    } else if output.starts_with("enhanced_except_") || output.contains("_w8_") {
        Some(NAnomaly::Exception)
    } else {
        None
    }
}

/// Log an anomaly of an applied n-transform result
pub fn warn_n_anomaly(input: &str, output: &str) {
    match detect_n_anomaly(input, output) {
        Some(NAnomaly::Unchanged) => warn!(
            "Transformed n parameter is the same as input, n function possibly short-circuited"
        ),
        Some(NAnomaly::Exception) => warn!("N function did not complete due to exception"),
        None => {}
    }
}

/// Run the n-transform program on `n`. Non-empty strings and truthy
/// non-string results are returned.
pub fn run_n_transform(program: &str, n: &str, sandbox: &Sandbox) -> Option<String> {
    match sandbox.execute(program, &Bindings::new().bind(N_ARGUMENT, n))? {
        ScriptValue::String(transformed) if transformed.is_empty() => None,
        ScriptValue::String(transformed) => {
            warn_n_anomaly(n, &transformed);
            Some(transformed)
        }
        other => other.into_coerced().filter(|value| !value.is_empty()),
    }
}

/// Run the decipher program on the scrambled signature `s`
pub fn run_decipher(program: &str, s: &str, sandbox: &Sandbox) -> Option<String> {
    sandbox
        .execute(program, &Bindings::new().bind(DECIPHER_ARGUMENT, s))
        .and_then(ScriptValue::into_coerced)
}

fn try_decipher(
    params: &CipherParams,
    url: &str,
    s: &str,
    program: &str,
    sandbox: &Sandbox,
) -> Result<String, SigtractError> {
    let mut components = Url::parse(&decode_component(url)?)?;
    let signature = decode_component(s)?;

    let deciphered = run_decipher(program, &signature, sandbox)
        .ok_or_else(|| SigtractError::ScriptError("decipher returned no value".to_string()))?;

    set_query_param(&mut components, params.signature_param(), &deciphered);
    Ok(components.to_string())
}

/// URL embedded in a cipher query, with the deciphered signature applied.
/// Falls back to the embedded URL whenever deciphering is impossible.
fn decipher_url(cipher: &str, program: Option<&str>, sandbox: &Sandbox) -> Option<String> {
    let params = CipherParams::parse(cipher);
    let url = params.url.clone()?;

    let (s, program) = match (params.signature(), program) {
        (Some(s), Some(program)) => (s, program),
        _ => return Some(url),
    };

    match try_decipher(&params, &url, s, program, sandbox) {
        Ok(deciphered) => Some(deciphered),
        Err(e) => {
            error!("Error applying decipher: {}", e);
            Some(url)
        }
    }
}

fn try_transform_n(url: &str, program: &str, sandbox: &Sandbox) -> Result<String, SigtractError> {
    let mut components = Url::parse(&decode_component(url)?)?;

    let n = match get_query_param(&components, "n").filter(|n| !n.is_empty()) {
        Some(n) => n,
        None => return Ok(url.to_string()),
    };

    if let Some(transformed) = run_n_transform(program, &n, sandbox) {
        set_query_param(&mut components, "n", &transformed);
    } else {
        debug!("N transform produced no value, keeping n");
    }

    Ok(components.to_string())
}

/// `url` with its `n` parameter transformed. Returns `url` unchanged when
/// there is nothing to transform or the URL is malformed.
fn transform_n_url(url: &str, program: Option<&str>, sandbox: &Sandbox) -> String {
    let program = match program {
        Some(program) => program,
        None => return url.to_string(),
    };

    match try_transform_n(url, program, sandbox) {
        Ok(transformed) => transformed,
        Err(e) => {
            error!("Error applying n transform: {}", e);
            url.to_string()
        }
    }
}

/// Resolve the playable URL of `format` in place.
///
/// A present `url` takes precedence and only gets the n transform. Otherwise
/// the URL comes from the cipher field: signature first, then n. The cipher
/// fields are cleared afterwards.
pub fn set_download_url(format: &mut Format, functions: &ExtractedFunctions, sandbox: &Sandbox) {
    let ciphered = format.is_ciphered();
    let source = match non_empty(&format.url)
        .or_else(|| non_empty(&format.signature_cipher))
        .or_else(|| non_empty(&format.cipher))
    {
        Some(source) => source.to_string(),
        None => return,
    };

    let url = if ciphered {
        decipher_url(&source, functions.decipher.as_deref(), sandbox)
    } else {
        Some(source)
    };

    format.url = url.map(|url| transform_n_url(&url, functions.n_transform.as_deref(), sandbox));
    format.signature_cipher = None;
    format.cipher = None;
}
