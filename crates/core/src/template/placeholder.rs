//! The placeholders a filename template may reference.

use std::fmt;

/// A `{name}` token understood by the template engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    Filename,
    Ext,
    Date,
    Time,
    Datetime,
    CreateDate,
    Size,
    Resolution,
    Codec,
    Duration,
    Counter,
    Quality,
    Source,
    SourceFull,
}

impl Placeholder {
    /// Every placeholder, in documentation order.
    pub const ALL: [Placeholder; 14] = [
        Self::Filename,
        Self::Ext,
        Self::Date,
        Self::Time,
        Self::Datetime,
        Self::CreateDate,
        Self::Size,
        Self::Resolution,
        Self::Codec,
        Self::Duration,
        Self::Counter,
        Self::Quality,
        Self::Source,
        Self::SourceFull,
    ];

    /// Name as written between braces.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::Ext => "ext",
            Self::Date => "date",
            Self::Time => "time",
            Self::Datetime => "datetime",
            Self::CreateDate => "create_date",
            Self::Size => "size",
            Self::Resolution => "resolution",
            Self::Codec => "codec",
            Self::Duration => "duration",
            Self::Counter => "counter",
            Self::Quality => "quality",
            Self::Source => "source",
            Self::SourceFull => "source_full",
        }
    }

    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Filename => "Original filename without extension",
            Self::Ext => "Original file extension",
            Self::Date => "Current date (YYYY-MM-DD)",
            Self::Time => "Current time (HH-MM-SS)",
            Self::Datetime => "Current date and time (YYYY-MM-DD_HH-MM-SS)",
            Self::CreateDate => "File creation date (YYYY-MM-DD)",
            Self::Size => "Original file size in MB",
            Self::Resolution => "Video resolution (WIDTHxHEIGHT)",
            Self::Codec => "Original video codec",
            Self::Duration => "Video duration in seconds",
            Self::Counter => "Sequential counter (1, 2, 3...)",
            Self::Quality => "Selected quality preset",
            Self::Source => "Source directory name",
            Self::SourceFull => "Full source directory path",
        }
    }

    /// Looks up a placeholder by its name (without braces).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// The token as it appears in a template, e.g. `{filename}`.
    pub fn token(&self) -> String {
        format!("{{{}}}", self.name())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lists every placeholder with its description.
pub fn placeholders() -> Vec<(String, &'static str)> {
    Placeholder::ALL
        .iter()
        .map(|p| (p.token(), p.description()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_roundtrip() {
        for placeholder in Placeholder::ALL {
            assert_eq!(Placeholder::from_name(placeholder.name()), Some(placeholder));
        }
        assert_eq!(Placeholder::from_name("bogus"), None);
        assert_eq!(Placeholder::from_name("Filename"), None);
    }

    #[test]
    fn test_placeholders_listing() {
        let listed = placeholders();
        assert_eq!(listed.len(), 14);
        assert_eq!(listed[0].0, "{filename}");
        assert_eq!(listed[13].0, "{source_full}");
        assert!(listed.iter().all(|(_, desc)| !desc.is_empty()));
    }
}
