//! Image references as written after `FROM`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageRefError {
    #[error("image reference is empty")]
    Empty,
    #[error("image reference '{0}' contains whitespace")]
    Whitespace(String),
    #[error("image reference '{0}' has an empty {1}")]
    EmptyComponent(String, &'static str),
}

/// `[registry/]name[:tag][@digest]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef {
    pub registry: Option<String>,
    pub name: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, tag: Option<&str>) -> Self {
        Self {
            registry: None,
            name: name.into(),
            tag: tag.map(str::to_string),
            digest: None,
        }
    }

    /// Tag used when none is written
    pub fn effective_tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("latest")
    }

    /// True when the reference floats: no digest and no tag, or `latest`
    pub fn is_floating(&self) -> bool {
        self.digest.is_none() && self.effective_tag() == "latest"
    }

    /// `scratch` is a reserved empty base, not a pullable image
    pub fn is_scratch(&self) -> bool {
        self.registry.is_none() && self.name == "scratch"
    }

    /// True for references built from a variable, e.g. `${BASE}`
    pub fn is_templated(&self) -> bool {
        self.to_string().contains('$')
    }
}

impl FromStr for ImageRef {
    type Err = ImageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ImageRefError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ImageRefError::Whitespace(s.to_string()));
        }

        let (rest, digest) = match s.split_once('@') {
            Some((_, "")) => return Err(ImageRefError::EmptyComponent(s.to_string(), "digest")),
            Some((rest, digest)) => (rest, Some(digest.to_string())),
            None => (s, None),
        };

        let (registry, remainder) = match rest.split_once('/') {
            Some((first, remainder))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), remainder)
            }
            _ => (None, rest),
        };

        // A colon before the last slash belongs to a registry port, not a tag
        let last_slash = remainder.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match remainder[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let tag = &remainder[split + 1..];
                if tag.is_empty() {
                    return Err(ImageRefError::EmptyComponent(s.to_string(), "tag"));
                }
                (&remainder[..split], Some(tag.to_string()))
            }
            None => (remainder, None),
        };

        if name.is_empty() {
            return Err(ImageRefError::EmptyComponent(s.to_string(), "name"));
        }

        Ok(Self {
            registry,
            name: name.to_string(),
            tag,
            digest,
        })
    }
}

impl TryFrom<String> for ImageRef {
    type Error = ImageRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageRef> for String {
    fn from(image: ImageRef) -> Self {
        image.to_string()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_tag() {
        let image: ImageRef = "openjdk:17".parse().unwrap();
        assert_eq!(image.name, "openjdk");
        assert_eq!(image.tag.as_deref(), Some("17"));
        assert!(image.registry.is_none());
        assert!(!image.is_floating());
    }

    #[test]
    fn test_parse_untagged_is_floating() {
        let image: ImageRef = "ubuntu".parse().unwrap();
        assert_eq!(image.effective_tag(), "latest");
        assert!(image.is_floating());

        let latest: ImageRef = "gcc:latest".parse().unwrap();
        assert!(latest.is_floating());
    }

    #[test]
    fn test_parse_registry_with_port() {
        let image: ImageRef = "localhost:5000/team/app:1.2".parse().unwrap();
        assert_eq!(image.registry.as_deref(), Some("localhost:5000"));
        assert_eq!(image.name, "team/app");
        assert_eq!(image.tag.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_parse_namespaced_without_registry() {
        let image: ImageRef = "rocker/r-ver:4.1.0".parse().unwrap();
        assert!(image.registry.is_none());
        assert_eq!(image.name, "rocker/r-ver");
        assert_eq!(image.to_string(), "rocker/r-ver:4.1.0");
    }

    #[test]
    fn test_parse_digest_pins_latest() {
        let image: ImageRef = "alpine@sha256:abc123".parse().unwrap();
        assert_eq!(image.digest.as_deref(), Some("sha256:abc123"));
        assert!(!image.is_floating());
        assert_eq!(image.to_string(), "alpine@sha256:abc123");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ImageRef>(), Err(ImageRefError::Empty));
        assert!("java:".parse::<ImageRef>().is_err());
        assert!("java@".parse::<ImageRef>().is_err());
        assert!(":17".parse::<ImageRef>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let image: ImageRef = "ghcr.io/org/tool:2".parse().unwrap();
        let json = serde_json::to_string(&image).unwrap();
        assert_eq!(json, "\"ghcr.io/org/tool:2\"");
        let back: ImageRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_scratch_and_templated() {
        assert!("scratch".parse::<ImageRef>().unwrap().is_scratch());
        assert!("${BASE}".parse::<ImageRef>().unwrap().is_templated());
    }
}
