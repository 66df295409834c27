//! Classification of non-2xx responses into `ApiError` values.
//!
//! `DESCRIPTORS` is an ordered table, most specific first; the first
//! descriptor whose status range and matcher both accept the response
//! decides the `ApiErrorKind`. Anything unmatched is `Generic`.
//!
//! Matchers must tolerate any body (JSON, plain text, empty). A matcher that
//! returns `None`, or panics, counts as "no match".

use std::ops::RangeInclusive;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

use crate::error::{ApiError, ApiErrorKind};
use crate::http::{HttpResponse, RequestContext};

pub type Matcher = fn(&HttpResponse, &RequestContext) -> Option<ApiErrorKind>;

/// A known error pattern.
pub struct Descriptor {
    pub name: &'static str,
    pub statuses: RangeInclusive<u16>,
    pub matcher: Matcher,
}

impl Descriptor {
    fn try_match(&self, response: &HttpResponse, context: &RequestContext) -> Option<ApiErrorKind> {
        if !self.statuses.contains(&response.status) {
            return None;
        }
        catch_unwind(AssertUnwindSafe(|| (self.matcher)(response, context)))
            .ok()
            .flatten()
    }
}

pub static DESCRIPTORS: &[Descriptor] = &[
    Descriptor {
        name: "players_never_met",
        statuses: 404..=404,
        matcher: players_never_met,
    },
    Descriptor {
        name: "not_found",
        statuses: 404..=404,
        matcher: not_found,
    },
    Descriptor {
        name: "unauthorized",
        statuses: 401..=403,
        matcher: unauthorized,
    },
    Descriptor {
        name: "rate_limited",
        statuses: 429..=429,
        matcher: rate_limited,
    },
];

/// Classify a failed response. Status, body and context are kept verbatim.
pub fn classify(response: HttpResponse, context: RequestContext) -> ApiError {
    classify_with(DESCRIPTORS, response, context)
}

/// Classify against an explicit descriptor table.
pub fn classify_with(
    descriptors: &[Descriptor],
    response: HttpResponse,
    context: RequestContext,
) -> ApiError {
    let kind = descriptors
        .iter()
        .find_map(|d| d.try_match(&response, &context))
        .unwrap_or(ApiErrorKind::Generic);
    ApiError {
        status: response.status,
        body: response.body,
        context,
        kind,
    }
}

/// Best-effort human message from an error body.
///
/// JSON objects are searched for `error` then `message`; any other body is
/// returned trimmed.
pub fn body_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.trim().to_string();
            }
        }
    }
    body.trim().to_string()
}

/// All candidate messages in a body, lowercased.
fn body_texts(body: &str) -> Vec<String> {
    let mut texts = Vec::new();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(text)) = map.get(key) {
                texts.push(text.to_lowercase());
            }
        }
    }
    if texts.is_empty() {
        texts.push(body.trim().to_lowercase());
    }
    texts
}

fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn players_never_met(response: &HttpResponse, context: &RequestContext) -> Option<ApiErrorKind> {
    let mentions = body_texts(&response.body)
        .iter()
        .any(|t| t.contains("never met") || t.contains("never played") || t.contains("not played"));
    if !mentions {
        return None;
    }
    match path_segments(&context.path).as_slice() {
        ["player", player_id, "pvp", opponent_id] => Some(ApiErrorKind::PlayersNeverMet {
            player_id: player_id.parse().ok()?,
            opponent_id: opponent_id.parse().ok()?,
        }),
        _ => None,
    }
}

fn not_found(response: &HttpResponse, context: &RequestContext) -> Option<ApiErrorKind> {
    let empty = response.body.trim().is_empty();
    if !empty && !body_texts(&response.body).iter().any(|t| t.contains("not found")) {
        return None;
    }
    let segments = path_segments(&context.path);
    let resource = segments.first().copied().unwrap_or("resource").to_string();
    let id = segments.get(1).and_then(|s| s.parse().ok());
    Some(ApiErrorKind::NotFound { resource, id })
}

fn unauthorized(response: &HttpResponse, _context: &RequestContext) -> Option<ApiErrorKind> {
    Some(ApiErrorKind::Unauthorized {
        message: body_message(&response.body),
    })
}

fn rate_limited(response: &HttpResponse, _context: &RequestContext) -> Option<ApiErrorKind> {
    let retry_after = response
        .header("retry-after")
        .and_then(|v| v.trim().parse().ok());
    Some(ApiErrorKind::RateLimited { retry_after })
}
