//! Caption track resolution.
//!
//! A video usually exposes several caption tracks (human-authored,
//! auto-generated, per language). [`CaptionResolver`] lists them through a
//! [`CaptionProvider`], walks an ordered fallback chain to pick one English
//! track, and turns its timed text into a [`ContentRecord`].

mod youtube;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    source::VideoId,
    types::{CaptionSegment, CaptionTrackMetadata, ContentRecord, SourceMetadata},
};

pub use youtube::YoutubeCaptions;

pub const ENGLISH: &str = "en";
const ENGLISH_LABEL: &str = "english";

#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("caption provider blocked the request")]
    Blocked,

    #[error("captions are disabled for this video")]
    CaptionsDisabled,

    #[error("video is unavailable: {reason}")]
    VideoUnavailable { reason: String },

    #[error("no caption track found")]
    NoTrackFound,

    #[error("translation to {language} is unavailable")]
    TranslationUnavailable { language: String },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("unexpected provider response: {reason}")]
    Unexpected { reason: String },
}

impl CaptionError {
    /// Log category; every category collapses to the same absent result.
    pub fn category(&self) -> &'static str {
        match self {
            CaptionError::Blocked => "blocked",
            CaptionError::CaptionsDisabled | CaptionError::VideoUnavailable { .. } => {
                "track_list_unavailable"
            }
            CaptionError::NoTrackFound => "no_track_found",
            CaptionError::TranslationUnavailable { .. } => "translation_unavailable",
            CaptionError::HttpError(_) | CaptionError::Unexpected { .. } => "unexpected",
        }
    }
}

/// One entry of a caption track's timed text.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedText {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language_name: String,
    pub generated: bool,
    pub base_url: String,
    /// Language codes this track can be machine-translated into.
    pub translation_languages: Vec<String>,
    pub translated_to: Option<String>,
}

impl CaptionTrack {
    pub fn translate(&self, language: &str) -> Result<CaptionTrack, CaptionError> {
        if !self.translation_languages.iter().any(|l| l == language) {
            return Err(CaptionError::TranslationUnavailable {
                language: language.to_string(),
            });
        }

        Ok(CaptionTrack {
            language_code: language.to_string(),
            language_name: format!("{} (translated)", self.language_name),
            generated: self.generated,
            base_url: self.base_url.clone(),
            translation_languages: Vec::new(),
            translated_to: Some(language.to_string()),
        })
    }

    fn speaks(&self, language: &str) -> bool {
        let primary = self
            .language_code
            .split(['-', '_'])
            .next()
            .unwrap_or_default();
        primary.eq_ignore_ascii_case(language)
            || (language == ENGLISH && self.language_name.to_lowercase().starts_with(ENGLISH_LABEL))
    }
}

/// Tracks available for one video, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSet {
    tracks: Vec<CaptionTrack>,
}

impl TrackSet {
    pub fn new(tracks: Vec<CaptionTrack>) -> Self {
        Self { tracks }
    }

    pub fn find_manual(&self, language: &str) -> Result<CaptionTrack, CaptionError> {
        self.find(|t| !t.generated && t.language_code == language)
    }

    pub fn find_generated(&self, language: &str) -> Result<CaptionTrack, CaptionError> {
        self.find(|t| t.generated && t.language_code == language)
    }

    /// Any track, human or generated, whose code or label resolves to `language`.
    pub fn find_any(&self, language: &str) -> Result<CaptionTrack, CaptionError> {
        self.find(|t| t.speaks(language))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.tracks.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn find(&self, pred: impl Fn(&CaptionTrack) -> bool) -> Result<CaptionTrack, CaptionError> {
        self.tracks
            .iter()
            .find(|t| pred(t))
            .cloned()
            .ok_or(CaptionError::NoTrackFound)
    }
}

#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackSet, CaptionError>;
    async fn fetch_segments(&self, track: &CaptionTrack) -> Result<Vec<TimedText>, CaptionError>;
}

type TrackAttempt = fn(&TrackSet) -> Result<CaptionTrack, CaptionError>;

const TRACK_CHAIN: [(&str, TrackAttempt); 4] = [
    ("manual English", manual_english),
    ("generated English", generated_english),
    ("English-labelled", any_english),
    ("translated to English", first_translated),
];

fn manual_english(set: &TrackSet) -> Result<CaptionTrack, CaptionError> {
    set.find_manual(ENGLISH)
}

fn generated_english(set: &TrackSet) -> Result<CaptionTrack, CaptionError> {
    set.find_generated(ENGLISH)
}

fn any_english(set: &TrackSet) -> Result<CaptionTrack, CaptionError> {
    set.find_any(ENGLISH)
}

fn first_translated(set: &TrackSet) -> Result<CaptionTrack, CaptionError> {
    set.iter()
        .next()
        .ok_or(CaptionError::NoTrackFound)?
        .translate(ENGLISH)
}

/// Walk [`TRACK_CHAIN`] and return the first track any step yields.
pub fn select_track(set: &TrackSet) -> Result<CaptionTrack, CaptionError> {
    let mut last_error = CaptionError::NoTrackFound;
    for (label, attempt) in TRACK_CHAIN {
        match attempt(set) {
            Ok(track) => {
                info!(step = label, language = %track.language_code, "caption track selected");
                return Ok(track);
            }
            Err(err) => {
                debug!(step = label, error = %err, "caption step found nothing");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

pub struct CaptionResolver {
    provider: Arc<dyn CaptionProvider>,
}

impl CaptionResolver {
    pub fn new(provider: Arc<dyn CaptionProvider>) -> Self {
        Self { provider }
    }

    /// Fetch an English caption track for `video_id`, or `None` on any failure.
    pub async fn fetch_track(&self, video_id: &VideoId) -> Option<ContentRecord> {
        match self.resolve(video_id).await {
            Ok(record) => {
                info!(video_id = %video_id, chars = record.char_count(), "caption track fetched");
                Some(record)
            }
            Err(err @ CaptionError::Blocked) => {
                error!(
                    video_id = %video_id,
                    category = err.category(),
                    "caption provider blocked the request; cloud provider IPs are commonly blocked"
                );
                None
            }
            Err(err @ (CaptionError::HttpError(_) | CaptionError::Unexpected { .. })) => {
                error!(
                    video_id = %video_id,
                    category = err.category(),
                    error = %err,
                    "caption fetch failed"
                );
                None
            }
            Err(err) => {
                warn!(
                    video_id = %video_id,
                    category = err.category(),
                    error = %err,
                    "no usable caption track"
                );
                None
            }
        }
    }

    async fn resolve(&self, video_id: &VideoId) -> Result<ContentRecord, CaptionError> {
        // A failed listing invalidates every later step.
        let tracks = self.provider.list_tracks(video_id).await?;
        debug!(video_id = %video_id, tracks = tracks.iter().count(), "caption tracks listed");

        let track = select_track(&tracks)?;
        let timed = self.provider.fetch_segments(&track).await?;
        Ok(build_record(video_id, &track, timed))
    }
}

fn build_record(
    video_id: &VideoId,
    track: &CaptionTrack,
    mut timed: Vec<TimedText>,
) -> ContentRecord {
    timed.sort_by(|a, b| a.start.total_cmp(&b.start));

    let text = timed
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let total_duration_seconds = timed.last().map(|t| t.start + t.duration).unwrap_or(0.0);
    let segments: Vec<CaptionSegment> = timed
        .into_iter()
        .map(|t| CaptionSegment {
            start_offset_seconds: t.start,
            text: t.text,
        })
        .collect();

    ContentRecord::new(
        text,
        SourceMetadata::Caption {
            video_id: video_id.to_string(),
            language_code: track.language_code.clone(),
            translated: track.translated_to.is_some(),
            track: CaptionTrackMetadata {
                total_duration_seconds,
                segment_count: segments.len(),
            },
            segments,
        },
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::source::identify;

    fn track(code: &str, name: &str, generated: bool, translatable: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            language_name: name.to_string(),
            generated,
            base_url: format!("https://captions.test/{code}"),
            translation_languages: if translatable {
                vec!["en".to_string(), "fr".to_string()]
            } else {
                Vec::new()
            },
            translated_to: None,
        }
    }

    fn timed(start: f64, duration: f64, text: &str) -> TimedText {
        TimedText {
            start,
            duration,
            text: text.to_string(),
        }
    }

    struct FakeProvider {
        listing: Mutex<Option<Result<TrackSet, CaptionError>>>,
        segments_error: Mutex<Option<CaptionError>>,
        fetched: Mutex<Vec<CaptionTrack>>,
        calls: Mutex<usize>,
    }

    impl FakeProvider {
        fn new(listing: Result<TrackSet, CaptionError>) -> Self {
            Self {
                listing: Mutex::new(Some(listing)),
                segments_error: Mutex::new(None),
                fetched: Mutex::new(Vec::new()),
                calls: Mutex::new(0),
            }
        }

        fn failing_segments(listing: Result<TrackSet, CaptionError>, err: CaptionError) -> Self {
            let provider = Self::new(listing);
            *provider.segments_error.lock().unwrap() = Some(err);
            provider
        }
    }

    #[async_trait]
    impl CaptionProvider for FakeProvider {
        async fn list_tracks(&self, _video_id: &VideoId) -> Result<TrackSet, CaptionError> {
            *self.calls.lock().unwrap() += 1;
            self.listing.lock().unwrap().take().unwrap()
        }

        async fn fetch_segments(
            &self,
            track: &CaptionTrack,
        ) -> Result<Vec<TimedText>, CaptionError> {
            *self.calls.lock().unwrap() += 1;
            self.fetched.lock().unwrap().push(track.clone());
            if let Some(err) = self.segments_error.lock().unwrap().take() {
                return Err(err);
            }
            Ok(vec![
                timed(0.0, 2.5, "hello there"),
                timed(2.5, 4.0, "general kenobi"),
            ])
        }
    }

    fn video() -> VideoId {
        identify("https://youtu.be/dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn manual_english_wins_over_generated() {
        let set = TrackSet::new(vec![
            track("en", "English (auto-generated)", true, true),
            track("en", "English", false, true),
        ]);
        let chosen = select_track(&set).unwrap();
        assert!(!chosen.generated);
    }

    #[test]
    fn generated_english_is_selected_when_it_is_the_only_track() {
        let set = TrackSet::new(vec![track("en", "English (auto-generated)", true, false)]);
        assert!(matches!(set.find_manual(ENGLISH), Err(CaptionError::NoTrackFound)));
        let chosen = select_track(&set).unwrap();
        assert!(chosen.generated);
        assert_eq!(chosen.translated_to, None);
    }

    #[test]
    fn regional_english_is_found_by_label() {
        let set = TrackSet::new(vec![
            track("de", "German", false, true),
            track("en-GB", "English (United Kingdom)", false, true),
        ]);
        let chosen = select_track(&set).unwrap();
        assert_eq!(chosen.language_code, "en-GB");
    }

    #[test]
    fn non_english_track_is_translated() {
        let set = TrackSet::new(vec![track("es", "Spanish", false, true)]);
        let chosen = select_track(&set).unwrap();
        assert_eq!(chosen.translated_to.as_deref(), Some("en"));
        assert_eq!(chosen.language_code, "en");
    }

    #[test]
    fn untranslatable_track_reports_translation_unavailable() {
        let set = TrackSet::new(vec![track("es", "Spanish", false, false)]);
        assert!(matches!(
            select_track(&set),
            Err(CaptionError::TranslationUnavailable { .. })
        ));
    }

    #[test]
    fn empty_set_reports_no_track() {
        assert!(matches!(
            select_track(&TrackSet::default()),
            Err(CaptionError::NoTrackFound)
        ));
    }

    #[tokio::test]
    async fn translated_track_is_fetched_and_returned() {
        let tracks = TrackSet::new(vec![track("ja", "Japanese", false, true)]);
        let provider = Arc::new(FakeProvider::new(Ok(tracks)));
        let resolver = CaptionResolver::new(provider.clone());

        let record = resolver.fetch_track(&video()).await.unwrap();
        assert_eq!(record.text(), "hello there general kenobi");
        let fetched = provider.fetched.lock().unwrap();
        assert_eq!(fetched[0].translated_to.as_deref(), Some("en"));
        match record.metadata() {
            SourceMetadata::Caption {
                translated,
                track,
                segments,
                ..
            } => {
                assert!(*translated);
                assert_eq!(track.segment_count, 2);
                assert_eq!(track.total_duration_seconds, 6.5);
                assert_eq!(segments[1].start_offset_seconds, 2.5);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocked_listing_stops_the_chain() {
        let provider = Arc::new(FakeProvider::new(Err(CaptionError::Blocked)));
        let resolver = CaptionResolver::new(provider.clone());

        assert!(resolver.fetch_track(&video()).await.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), 1);
        assert!(provider.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_captions_yield_none() {
        let provider = Arc::new(FakeProvider::new(Err(CaptionError::CaptionsDisabled)));
        let resolver = CaptionResolver::new(provider);
        assert!(resolver.fetch_track(&video()).await.is_none());
    }

    #[tokio::test]
    async fn failed_segment_fetch_after_selection_yields_none() {
        let provider = Arc::new(FakeProvider::failing_segments(
            Ok(TrackSet::new(vec![track("en", "English", false, false)])),
            CaptionError::Unexpected {
                reason: "timed text body was empty".to_string(),
            },
        ));
        let resolver = CaptionResolver::new(provider.clone());

        assert!(resolver.fetch_track(&video()).await.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), 2);
        assert_eq!(provider.fetched.lock().unwrap()[0].language_code, "en");
    }

    #[test]
    fn empty_segment_list_has_zero_duration() {
        let record = build_record(&video(), &track("en", "English", false, false), Vec::new());
        match record.metadata() {
            SourceMetadata::Caption { track, .. } => {
                assert_eq!(track.total_duration_seconds, 0.0);
                assert_eq!(track.segment_count, 0);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
        assert_eq!(record.text(), "");
    }

    #[test]
    fn segments_are_ordered_by_start() {
        let timed = vec![
            timed(5.0, 1.0, "second"),
            timed(1.0, 1.0, "first"),
        ];
        let record = build_record(&video(), &track("en", "English", false, false), timed);
        assert_eq!(record.text(), "first second");
    }
}
