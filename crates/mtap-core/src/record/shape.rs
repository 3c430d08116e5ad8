//! Turn an accepted [`Observation`] into a [`ResourceRecord`].

use super::headers::{percent_decode, RequestContext, ResponseSummary};
use super::{now_millis, ContextId, Observation, ResourceRecord};

/// Splits a file name into `(name, extension)`.
///
/// The extension is whatever follows the last `.`, lowercased; a name without
/// a dot has no extension.
pub fn split_file_name(file_name: &str) -> (String, Option<String>) {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty());
    (file_name.to_string(), ext)
}

/// File name and extension from the last path segment of `url`.
///
/// Unparseable URLs yield an empty name and no extension.
pub fn file_name_from_url(url: &str) -> (String, Option<String>) {
    let Ok(parsed) = url::Url::parse(url) else {
        return (String::new(), None);
    };
    let segment = parsed.path().rsplit('/').next().unwrap_or("");
    split_file_name(&percent_decode(segment))
}

/// Builds the stored record for an accepted observation.
///
/// `context` is the context the record will be filed under (the caller
/// resolves the unknown-context sentinel later, at admission).
pub fn shape_record(obs: &Observation, summary: &ResponseSummary, context: ContextId) -> ResourceRecord {
    let (mut name, mut ext) = file_name_from_url(&obs.url);
    if ext.is_none() {
        if let Some(attached) = summary.attachment_filename() {
            (name, ext) = split_file_name(&attached);
        }
    }

    let mime_type = obs.mime_type.clone().or_else(|| summary.mime_type.clone());
    if ext.is_none() {
        ext = mime_type
            .as_deref()
            .and_then(|m| m.split_once('/'))
            .map(|(_, sub)| sub.to_string())
            .filter(|s| !s.is_empty());
    }
    if let Some(extra) = obs.extra_extension.as_ref().filter(|e| !e.is_empty()) {
        ext = Some(extra.clone());
    }

    let req = RequestContext::from_headers(&obs.request_headers);
    let referer = req
        .referer
        .clone()
        .or_else(|| obs.initiator.clone().filter(|i| i != "null"));

    ResourceRecord {
        url: obs.url.clone(),
        context_id: context,
        name,
        size_bytes: summary.size,
        extension: ext,
        mime_type,
        detected_at: now_millis(),
        page_title: None,
        page_url: None,
        page_icon_url: None,
        referer,
        origin: req.origin,
        request_id: obs
            .request_id
            .clone()
            .or_else(|| Some(now_millis().to_string())),
        is_heuristic: obs.is_heuristic,
        request_headers: req.headers,
        cookie: req.cookie,
    }
}
