//! Wire formats accepted by the gateway and their mapping onto
//! [`TranslationRequest`].
//!
//! Three client ecosystems share one call contract:
//! - the native API (`/api/v1/translate`, `/api/v1/models/:route`)
//! - the hcfy browser extension (`/api/hcfy`)
//! - DeepL-compatible clients (`/api/deeplx/:route`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{BackendSelector, TranslationRequest, AUTO_LANG};

fn require<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(TranslationError::invalid(format!("{} is required", field)));
    }
    Ok(value)
}

/// Source language, falling back to auto-detection when blank
fn source_or_auto(source: Option<&str>) -> String {
    match source.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => AUTO_LANG.to_string(),
    }
}

/// `POST /api/v1/translate`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NamedTranslateRequest {
    pub text: String,
    pub from: String,
    pub to: String,
    pub model_name: String,
    pub force_refresh: bool,
}

impl NamedTranslateRequest {
    pub fn into_request(self) -> Result<TranslationRequest> {
        require(&self.model_name, "model_name")?;
        require(&self.from, "from")?;
        require(&self.to, "to")?;
        require(&self.text, "text")?;

        Ok(
            TranslationRequest::new(BackendSelector::Name(self.model_name), self.text, self.to)
                .with_source_lang(self.from)
                .with_force_refresh(self.force_refresh),
        )
    }
}

/// `POST /api/v1/models/:route`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoutedTranslateRequest {
    pub text: String,
    pub from: String,
    pub to: String,
    pub force_refresh: bool,
}

impl RoutedTranslateRequest {
    pub fn into_request(self, route: &str) -> Result<TranslationRequest> {
        require(&self.from, "from")?;
        require(&self.to, "to")?;
        require(&self.text, "text")?;

        Ok(
            TranslationRequest::new(BackendSelector::Route(route.to_string()), self.text, self.to)
                .with_source_lang(self.from)
                .with_force_refresh(self.force_refresh),
        )
    }
}

/// Native response for both by-name and by-route calls
#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub model_name: String,
    pub translated_text: String,
}

/// `GET /api/v1/models`
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models_by_name: BTreeSet<String>,
    pub models_by_endpoint: BTreeSet<String>,
}

/// hcfy browser-extension request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HcfyRequest {
    pub name: String,
    pub text: String,
    /// Requested target languages, e.g. `["中文(简体)", "英语"]`; only the first is used
    pub destination: Vec<String>,
    pub source: Option<String>,
}

impl HcfyRequest {
    pub fn into_request(self) -> Result<TranslationRequest> {
        require(&self.name, "name")?;
        require(&self.text, "text")?;
        let to = self
            .destination
            .into_iter()
            .next()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| TranslationError::invalid("destination is required"))?;

        Ok(TranslationRequest::new(BackendSelector::Name(self.name), self.text, to)
            .with_source_lang(source_or_auto(self.source.as_deref())))
    }
}

#[derive(Debug, Serialize)]
pub struct HcfyResponse {
    pub text: String,
    pub from: String,
    pub to: String,
    pub result: Vec<String>,
}

impl HcfyResponse {
    pub fn new(request: &TranslationRequest, translated: String) -> Self {
        let result = translated.split('\n').map(str::to_string).collect();
        Self {
            text: translated,
            from: request.from.clone(),
            to: request.to.clone(),
            result,
        }
    }
}

/// DeepL-compatible request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeepLxRequest {
    pub text: String,
    pub source_lang: Option<String>,
    pub target_lang: String,
}

/// A DeepL request after language-code resolution
#[derive(Debug)]
pub struct DeepLxCall {
    /// Codes exactly as the client sent them, echoed in the response
    pub source_code: String,
    pub target_code: String,
    /// Request carrying full language names for the prompt
    pub request: TranslationRequest,
}

impl DeepLxRequest {
    pub fn into_call(self, route: &str) -> Result<DeepLxCall> {
        require(&self.text, "text")?;
        require(&self.target_lang, "target_lang")?;
        let source_code = source_or_auto(self.source_lang.as_deref());
        let target_code = self.target_lang.trim().to_string();

        let from = deepl_language_name(&source_code).ok_or_else(|| {
            TranslationError::invalid(format!("unsupported source_lang {:?}", source_code))
        })?;
        let to = deepl_language_name(&target_code).ok_or_else(|| {
            TranslationError::invalid(format!("unsupported target_lang {:?}", target_code))
        })?;

        let request =
            TranslationRequest::new(BackendSelector::Route(route.to_string()), self.text, to)
                .with_source_lang(from);

        Ok(DeepLxCall {
            source_code,
            target_code,
            request,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeepLxResponse {
    pub code: u16,
    pub msg: String,
    pub data: String,
    pub source_lang: String,
    pub target_lang: String,
    pub alternatives: Vec<String>,
}

impl DeepLxResponse {
    pub fn success(call: DeepLxCall, data: String) -> Self {
        Self {
            code: 200,
            msg: "success".to_string(),
            data,
            source_lang: call.source_code,
            target_lang: call.target_code,
            alternatives: Vec::new(),
        }
    }
}

/// Language name substituted into the prompt for a DeepL code.
///
/// Codes are case-insensitive and a regional suffix resolves by its primary
/// subtag (`EN-US` → English). Unknown codes yield `None`.
pub fn deepl_language_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    if code.eq_ignore_ascii_case(AUTO_LANG) {
        return Some("Auto Detect");
    }

    let primary = code.split(|c: char| c == '-' || c == '_').next().unwrap_or_default();
    let name = match primary.to_ascii_uppercase().as_str() {
        "ZH" => "Chinese(Simplified)",
        "DE" => "German",
        "EN" => "English",
        "ES" => "Spanish",
        "FR" => "French",
        "IT" => "Italian",
        "JA" => "Japanese",
        "NL" => "Dutch",
        "PL" => "Polish",
        "PT" => "Portuguese",
        "RU" => "Russian",
        "BG" => "Bulgarian",
        "CS" => "Czech",
        "DA" => "Danish",
        "EL" => "Greek",
        "ET" => "Estonian",
        "FI" => "Finnish",
        "HU" => "Hungarian",
        "LT" => "Lithuanian",
        "LV" => "Latvian",
        "RO" => "Romanian",
        "SK" => "Slovak",
        "SL" => "Slovenian",
        "SV" => "Swedish",
        _ => return None,
    };
    Some(name)
}
