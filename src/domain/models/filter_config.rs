//! Filter configuration: sparse per-room overrides layered over a global
//! default, merged field-by-field into a fully populated effective view.

use serde::{Deserialize, Serialize};

/// Account data event type carrying the default and per-room filter
/// configuration blobs.
pub const FILTER_CONFIG_EVENT_TYPE: &str = "dev.roomwarden.filter_configuration";

/// Account data event type carrying the agent environment (log/control
/// room pointers).
pub const ENVIRONMENT_EVENT_TYPE: &str = "dev.roomwarden.environment";

/// Content categories the agent can police.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Image,
    Video,
    Audio,
    File,
    Url,
}

impl ContentCategory {
    pub const ALL: [Self; 5] = [Self::Image, Self::Video, Self::Audio, Self::File, Self::Url];

    /// Media categories carried by a message `msgtype`. `Url` matches on
    /// body content instead and has no msgtype.
    pub fn msgtype(self) -> Option<&'static str> {
        match self {
            Self::Image => Some("m.image"),
            Self::Video => Some("m.video"),
            Self::Audio => Some("m.audio"),
            Self::File => Some("m.file"),
            Self::Url => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
            Self::Url => "url",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category settings. Unset fields mean "inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_users: Option<Vec<String>>,
}

/// A filter configuration blob as stored in account data.
///
/// The same shape serves as the global default and as a sparse per-room
/// override; resolution happens in the configuration overlay resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filter: Option<FilterSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_filter: Option<FilterSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_filter: Option<FilterSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_filter: Option<FilterSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_filter: Option<FilterSection>,

    /// Users exempt from every filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_users: Option<Vec<String>>,
}

impl FilterConfig {
    pub fn section(&self, category: ContentCategory) -> Option<&FilterSection> {
        match category {
            ContentCategory::Image => self.image_filter.as_ref(),
            ContentCategory::Video => self.video_filter.as_ref(),
            ContentCategory::Audio => self.audio_filter.as_ref(),
            ContentCategory::File => self.file_filter.as_ref(),
            ContentCategory::Url => self.url_filter.as_ref(),
        }
    }

    fn section_mut(&mut self, category: ContentCategory) -> &mut Option<FilterSection> {
        match category {
            ContentCategory::Image => &mut self.image_filter,
            ContentCategory::Video => &mut self.video_filter,
            ContentCategory::Audio => &mut self.audio_filter,
            ContentCategory::File => &mut self.file_filter,
            ContentCategory::Url => &mut self.url_filter,
        }
    }

    /// Fill unset fields of a *default* configuration with deny-by-default
    /// values, seeding the global ignore list with the given users.
    ///
    /// Returns the list of `(field, value)` changes so the caller can audit
    /// what was provisioned.
    pub fn fill_defaults(&mut self, seed_ignored: &[String]) -> Vec<(String, String)> {
        let mut changes = Vec::new();

        if self.ignored_users.is_none() {
            self.ignored_users = Some(seed_ignored.to_vec());
            changes.push(("ignored_users".to_string(), seed_ignored.join(", ")));
        }

        for category in ContentCategory::ALL {
            let slot = self.section_mut(category);
            let section = slot.get_or_insert_with(FilterSection::default);
            if section.allowed.is_none() {
                section.allowed = Some(false);
                changes.push((format!("{category}_filter->allowed"), "false".to_string()));
            }
            if section.ignored_users.is_none() {
                section.ignored_users = Some(Vec::new());
                changes.push((format!("{category}_filter->ignored_users"), String::new()));
            }
        }

        changes
    }
}

/// Fully populated per-category settings after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveSection {
    pub allowed: bool,
    pub ignored_users: Vec<String>,
}

/// The merged configuration for one room. Every field is populated;
/// anything unset in both layers resolves to deny.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveConfig {
    image: EffectiveSection,
    video: EffectiveSection,
    audio: EffectiveSection,
    file: EffectiveSection,
    url: EffectiveSection,
    pub ignored_users: Vec<String>,
}

impl EffectiveConfig {
    /// Field-level additive merge: an override field that is explicitly set
    /// wins; an unset field inherits the default. The global ignore list is
    /// the union of both layers.
    pub fn merge(default: &FilterConfig, overrides: Option<&FilterConfig>) -> Self {
        let merge_section = |category: ContentCategory| -> EffectiveSection {
            let base = default.section(category);
            let over = overrides.and_then(|o| o.section(category));
            EffectiveSection {
                allowed: over
                    .and_then(|s| s.allowed)
                    .or_else(|| base.and_then(|s| s.allowed))
                    .unwrap_or(false),
                ignored_users: over
                    .and_then(|s| s.ignored_users.clone())
                    .or_else(|| base.and_then(|s| s.ignored_users.clone()))
                    .unwrap_or_default(),
            }
        };

        let mut ignored_users: Vec<String> = Vec::new();
        let layers = default
            .ignored_users
            .iter()
            .flatten()
            .chain(overrides.and_then(|o| o.ignored_users.as_ref()).into_iter().flatten());
        for user in layers {
            if !ignored_users.contains(user) {
                ignored_users.push(user.clone());
            }
        }

        Self {
            image: merge_section(ContentCategory::Image),
            video: merge_section(ContentCategory::Video),
            audio: merge_section(ContentCategory::Audio),
            file: merge_section(ContentCategory::File),
            url: merge_section(ContentCategory::Url),
            ignored_users,
        }
    }

    pub fn section(&self, category: ContentCategory) -> &EffectiveSection {
        match category {
            ContentCategory::Image => &self.image,
            ContentCategory::Video => &self.video,
            ContentCategory::Audio => &self.audio,
            ContentCategory::File => &self.file,
            ContentCategory::Url => &self.url,
        }
    }

    /// Whether the user is exempt from the given category, either globally
    /// or per-section.
    pub fn is_exempt(&self, category: ContentCategory, user_id: &str) -> bool {
        self.ignored_users.iter().any(|u| u == user_id)
            || self
                .section(category)
                .ignored_users
                .iter()
                .any(|u| u == user_id)
    }
}

/// Pointers to the agent's own rooms, stored as account data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_room_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_room_id: Option<String>,
}
