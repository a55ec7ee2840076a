use std::{fmt, str::FromStr};

/// Radio protocol generation that produced a reading.
///
/// The decoder names the protocol in a top-level `Type` tag; anything it
/// does not name (or names in a way we don't know) is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeterType {
    #[default]
    Unknown,
    Scm,
    ScmPlus,
}

impl MeterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "<unknown>",
            Self::Scm => "SCM",
            Self::ScmPlus => "SCM+",
        }
    }

    /// Lenient mapping used by the line parser: an unrecognised tag is not an error.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown meter type tag '{0}'")]
pub struct UnknownMeterType(pub String);

impl FromStr for MeterType {
    type Err = UnknownMeterType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCM" => Ok(Self::Scm),
            "SCM+" => Ok(Self::ScmPlus),
            other => Err(UnknownMeterType(other.to_string())),
        }
    }
}
