use std::borrow::Cow;

use async_trait::async_trait;
use quick_xml::events::Event;
use reqwest::{StatusCode, header};
use tracing::debug;

use super::{CaptionError, CaptionProvider, CaptionTrack, TimedText, TrackSet};
use crate::source::VideoId;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?key=";
const CONSENT_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const API_KEY_MARKER: &str = "\"INNERTUBE_API_KEY\":\"";
const BOT_CHECK_REASON: &str = "Sign in to confirm you";

/// Caption provider backed by YouTube's public player endpoints.
pub struct YoutubeCaptions {
    client: reqwest::Client,
}

impl YoutubeCaptions {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn watch_page(&self, video_id: &VideoId, consent: bool) -> Result<String, CaptionError> {
        let mut request = self
            .client
            .get(format!("{WATCH_URL}{video_id}"))
            .header(header::ACCEPT_LANGUAGE, "en-US");
        if consent {
            request = request.header(header::COOKIE, "CONSENT=YES+cb");
        }
        let response = request.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(CaptionError::Blocked);
        }
        Ok(response.error_for_status()?.text().await?)
    }

    async fn player_response(
        &self,
        video_id: &VideoId,
        api_key: &str,
    ) -> Result<serde_json::Value, CaptionError> {
        let response = self
            .client
            .post(format!("{PLAYER_URL}{api_key}"))
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .json(&serde_json::json!({
                "context": {
                    "client": {
                        "clientName": "ANDROID",
                        "clientVersion": "20.10.38",
                    }
                },
                "videoId": video_id.as_str(),
            }))
            .send()
            .await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(CaptionError::Blocked);
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl CaptionProvider for YoutubeCaptions {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackSet, CaptionError> {
        let mut html = self.watch_page(video_id, false).await?;
        if html.contains(CONSENT_MARKER) {
            debug!(video_id = %video_id, "consent page served, retrying with consent cookie");
            html = self.watch_page(video_id, true).await?;
        }

        let api_key = extract_api_key(&html)?;
        let player = self.player_response(video_id, &api_key).await?;
        parse_track_list(&player)
    }

    async fn fetch_segments(&self, track: &CaptionTrack) -> Result<Vec<TimedText>, CaptionError> {
        let url = match &track.translated_to {
            Some(language) => format!("{}&tlang={}", track.base_url, language),
            None => track.base_url.clone(),
        };
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(CaptionError::Blocked);
        }
        let xml = response.error_for_status()?.text().await?;
        parse_timed_text(&xml)
    }
}

fn extract_api_key(html: &str) -> Result<String, CaptionError> {
    if let Some(start) = html.find(API_KEY_MARKER).map(|i| i + API_KEY_MARKER.len()) {
        if let Some(len) = html[start..].find('"') {
            return Ok(html[start..start + len].to_string());
        }
    }
    if html.contains(RECAPTCHA_MARKER) {
        return Err(CaptionError::Blocked);
    }
    Err(CaptionError::Unexpected {
        reason: "watch page has no player API key".to_string(),
    })
}

fn parse_track_list(player: &serde_json::Value) -> Result<TrackSet, CaptionError> {
    let playability = &player["playabilityStatus"];
    let status = playability["status"].as_str().unwrap_or("OK");
    if status != "OK" {
        let reason = playability["reason"].as_str().unwrap_or(status).to_string();
        if status == "LOGIN_REQUIRED" && reason.starts_with(BOT_CHECK_REASON) {
            return Err(CaptionError::Blocked);
        }
        return Err(CaptionError::VideoUnavailable { reason });
    }

    let renderer = &player["captions"]["playerCaptionsTracklistRenderer"];
    let Some(caption_tracks) = renderer["captionTracks"].as_array() else {
        return Err(CaptionError::CaptionsDisabled);
    };

    let translation_languages: Vec<String> = renderer["translationLanguages"]
        .as_array()
        .map(|langs| {
            langs
                .iter()
                .filter_map(|l| l["languageCode"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let tracks = caption_tracks
        .iter()
        .filter_map(|t| {
            let base_url = t["baseUrl"].as_str()?.replace("&fmt=srv3", "");
            let language_code = t["languageCode"].as_str()?.to_string();
            let language_name = t["name"]["runs"][0]["text"]
                .as_str()
                .or_else(|| t["name"]["simpleText"].as_str())
                .unwrap_or(&language_code)
                .to_string();
            let translatable = t["isTranslatable"].as_bool().unwrap_or(false);
            Some(CaptionTrack {
                language_code,
                language_name,
                generated: t["kind"].as_str() == Some("asr"),
                base_url,
                translation_languages: if translatable {
                    translation_languages.clone()
                } else {
                    Vec::new()
                },
                translated_to: None,
            })
        })
        .collect::<Vec<_>>();

    if tracks.is_empty() {
        return Err(CaptionError::CaptionsDisabled);
    }
    Ok(TrackSet::new(tracks))
}

/// Parse timed-text XML: `<transcript><text start=".." dur="..">..</text></transcript>`.
fn parse_timed_text(xml: &str) -> Result<Vec<TimedText>, CaptionError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut current: Option<TimedText> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"text" => {
                let mut entry = TimedText {
                    start: 0.0,
                    duration: 0.0,
                    text: String::new(),
                };
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().unwrap_or_default();
                    match attr.key.as_ref() {
                        b"start" => entry.start = value.parse().unwrap_or(0.0),
                        b"dur" => entry.duration = value.parse().unwrap_or(0.0),
                        _ => {}
                    }
                }
                current = Some(entry);
            }
            Ok(Event::Text(te)) => {
                if let Some(entry) = current.as_mut() {
                    let raw = te.unescape().unwrap_or_default();
                    entry.text.push_str(&clean_caption_text(&raw));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"text" => {
                if let Some(entry) = current.take() {
                    if !entry.text.is_empty() {
                        out.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CaptionError::Unexpected {
                    reason: format!("malformed timed text: {e}"),
                });
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Caption bodies are HTML escaped inside XML, and may carry `<i>`/`<b>` tags.
fn clean_caption_text(raw: &str) -> String {
    let unescaped: Cow<str> = quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw));
    let mut out = String::with_capacity(unescaped.len());
    let mut in_tag = false;
    for c in unescaped.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
