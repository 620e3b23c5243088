//! Filename template resolution.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::TemplateError;
use super::placeholder::Placeholder;
use super::sanitize::{safe_filename, ILLEGAL_CHARS};
use crate::metadata::{format_rounded, FileInfo, VideoInfo};
use crate::metrics::TEMPLATE_RESOLUTIONS;

/// Matches a `{token}` reference.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("failed to compile token regex"));

/// Sequential counter shared by clones, starting at 1.
///
/// Each engine owns one; pass the same counter to several engines to make
/// them share a sequence.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    value: Arc<AtomicU64>,
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceCounter {
    /// A counter whose first value is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A counter whose first value is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(start)),
        }
    }

    /// The value the next resolution will use.
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Returns the current value and advances by one.
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst)
    }
}

/// Placeholder values for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: HashMap<Placeholder, String>,
}

impl TemplateContext {
    /// Value for a placeholder, if set.
    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    /// Sets the value for a placeholder.
    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.values.insert(placeholder, value.into());
    }

    /// Substitutes every known `{token}` in a single left-to-right pass.
    ///
    /// Substituted values are not scanned again and unknown tokens are kept verbatim.
    pub fn substitute(&self, template: &str) -> String {
        TOKEN_RE
            .replace_all(template, |caps: &Captures<'_>| {
                Placeholder::from_name(&caps[1])
                    .and_then(|p| self.get(p))
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Checks a template, reporting the first problem found.
pub fn check_template(template: &str) -> Result<(), TemplateError> {
    if template.trim().is_empty() {
        return Err(TemplateError::Empty);
    }

    if let Some(ch) = template.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
        return Err(TemplateError::IllegalCharacter(ch));
    }

    for caps in TOKEN_RE.captures_iter(template) {
        if Placeholder::from_name(&caps[1]).is_none() {
            return Err(TemplateError::UnknownPlaceholder(caps[1].to_string()));
        }
    }

    Ok(())
}

/// Whether a template is usable.
pub fn validate_template(template: &str) -> bool {
    check_template(template).is_ok()
}

/// Resolves filename templates against files and their metadata.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    counter: SequenceCounter,
}

impl TemplateEngine {
    /// Creates an engine with its own counter starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine using an existing counter.
    pub fn with_counter(counter: SequenceCounter) -> Self {
        Self { counter }
    }

    /// The engine's counter.
    pub fn counter(&self) -> &SequenceCounter {
        &self.counter
    }

    /// Whether a template is usable.
    pub fn validate(&self, template: &str) -> bool {
        validate_template(template)
    }

    /// Resolves `template` into a safe file name (without extension).
    ///
    /// Never fails: when resolution is impossible the safe form of the file
    /// stem is returned. The counter advances by one on every call.
    pub fn resolve(
        &self,
        template: &str,
        file_path: &Path,
        video_info: Option<&VideoInfo>,
        quality: &str,
    ) -> String {
        self.resolve_at(template, file_path, video_info, quality, Local::now())
    }

    /// Like [`resolve`](Self::resolve) but surfaces the failure instead of falling back.
    ///
    /// The counter advances by one whether or not resolution succeeds.
    pub fn try_resolve(
        &self,
        template: &str,
        file_path: &Path,
        video_info: Option<&VideoInfo>,
        quality: &str,
    ) -> Result<String, TemplateError> {
        let counter = self.counter.next();
        self.render(template, file_path, video_info, quality, counter, Local::now())
    }

    fn resolve_at(
        &self,
        template: &str,
        file_path: &Path,
        video_info: Option<&VideoInfo>,
        quality: &str,
        now: DateTime<Local>,
    ) -> String {
        let counter = self.counter.next();
        match self.render(template, file_path, video_info, quality, counter, now) {
            Ok(name) => {
                TEMPLATE_RESOLUTIONS.with_label_values(&["resolved"]).inc();
                debug!(template = %template, name = %name, "Resolved filename template");
                name
            }
            Err(e) => {
                TEMPLATE_RESOLUTIONS.with_label_values(&["fallback"]).inc();
                warn!(
                    template = %template,
                    path = %file_path.display(),
                    error = %e,
                    "Template resolution failed, using file stem"
                );
                let stem = file_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                safe_filename(&stem)
            }
        }
    }

    /// Builds the placeholder values for one file.
    pub fn build_context(
        &self,
        file_path: &Path,
        video_info: Option<&VideoInfo>,
        quality: &str,
        counter: u64,
        now: DateTime<Local>,
    ) -> TemplateContext {
        let info = FileInfo::read_at(file_path, now);
        let mut context = TemplateContext::default();

        context.set(Placeholder::Filename, info.filename);
        context.set(Placeholder::Ext, info.ext);
        context.set(Placeholder::Date, info.date);
        context.set(Placeholder::Time, info.time);
        context.set(Placeholder::Datetime, info.datetime);
        context.set(Placeholder::CreateDate, info.create_date);
        context.set(Placeholder::Size, info.size);
        context.set(Placeholder::Source, info.source);
        context.set(Placeholder::SourceFull, info.source_full);
        context.set(Placeholder::Counter, counter.to_string());
        context.set(Placeholder::Quality, quality);

        match video_info {
            Some(video) => {
                context.set(Placeholder::Resolution, video.resolution());
                context.set(Placeholder::Codec, video.codec.clone());
                context.set(Placeholder::Duration, format_rounded(video.duration_secs, 1));
            }
            None => {
                context.set(Placeholder::Resolution, "");
                context.set(Placeholder::Codec, "");
                context.set(Placeholder::Duration, "");
            }
        }

        context
    }

    fn render(
        &self,
        template: &str,
        file_path: &Path,
        video_info: Option<&VideoInfo>,
        quality: &str,
        counter: u64,
        now: DateTime<Local>,
    ) -> Result<String, TemplateError> {
        if let Some(stem) = file_path.file_stem() {
            if stem.to_str().is_none() {
                return Err(TemplateError::NonUtf8Path {
                    path: file_path.to_path_buf(),
                });
            }
        }

        let context = self.build_context(file_path, video_info, quality, counter, now);
        Ok(safe_filename(&context.substitute(template)))
    }
}
