//! Container naming
//!
//! Runtime names must be 2-128 characters, start with an ASCII alphanumeric
//! and continue with alphanumerics, `_`, `.` or `-`.

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 128;

/// Maximum length of the template-derived prefix
const MAX_PREFIX_LEN: usize = 50;

/// Characters of the user id kept in the suffix
const USER_SUFFIX_LEN: usize = 8;

/// Prefix used when the template name has no usable characters
const FALLBACK_PREFIX: &str = "resource";

/// Suffix used when the user id has no usable characters
const FALLBACK_USER: &str = "user";

/// A validated container identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerName(String);

impl ContainerName {
    /// Validate an externally supplied name
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_container_name(&name) {
            Ok(Self(name))
        } else {
            Err(ProvisionError::InvalidContainerName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContainerName {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<ContainerName> for String {
    fn from(name: ContainerName) -> Self {
        name.0
    }
}

impl AsRef<str> for ContainerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a name against the runtime naming rules
pub fn is_valid_container_name(name: &str) -> bool {
    let len = name.len();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Derive a deterministic container name from a template name and user id
///
/// The template name is lowercased, every run of non-alphanumeric characters
/// becomes a single `-`, leading/trailing hyphens are stripped and the result
/// is cut to 50 characters. The first 8 characters of the user id, with
/// hyphens removed, are appended after a `-`.
pub fn generate_container_name(template_name: &str, user_id: &str) -> Result<ContainerName> {
    if template_name.is_empty() {
        return Err(ProvisionError::EmptyTemplateName);
    }
    if user_id.is_empty() {
        return Err(ProvisionError::EmptyUserId);
    }

    let mut prefix = slugify(template_name);
    truncate_slug(&mut prefix, MAX_PREFIX_LEN);
    if prefix.is_empty() {
        prefix = FALLBACK_PREFIX.to_string();
    }

    let suffix: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'))
        .take(USER_SUFFIX_LEN)
        .collect();
    let suffix = if suffix.is_empty() {
        FALLBACK_USER.to_string()
    } else {
        suffix
    };

    ContainerName::parse(format!("{}-{}", prefix, suffix))
}

/// Lowercase and collapse every non-alphanumeric run into one hyphen
fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// Cut to `max` bytes; a hyphen at the cut is kept
fn truncate_slug(slug: &mut String, max: usize) {
    // Slugs are pure ASCII, so byte and char boundaries agree
    slug.truncate(max);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_container_name("ab"));
        assert!(is_valid_container_name("pytorch-2-1-a1b2c3d4"));
        assert!(is_valid_container_name("my_app.v2-x"));
        assert!(is_valid_container_name(&"a".repeat(128)));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_container_name(""));
        assert!(!is_valid_container_name("a"));
        assert!(!is_valid_container_name("-abc"));
        assert!(!is_valid_container_name("_abc"));
        assert!(!is_valid_container_name("has space"));
        assert!(!is_valid_container_name("ümlaut"));
        assert!(!is_valid_container_name(&"a".repeat(129)));
    }

    #[test]
    fn test_generate_basic() {
        let name =
            generate_container_name("PyTorch 2.1 + CUDA", "a1b2-c3d4-e5f6-7890").unwrap();
        assert_eq!(name.as_str(), "pytorch-2-1-cuda-a1b2c3d4");
    }

    #[test]
    fn test_generate_trims_hyphens() {
        let name = generate_container_name("--Jupyter Lab!!", "user42").unwrap();
        assert_eq!(name.as_str(), "jupyter-lab-user42");
    }

    #[test]
    fn test_generate_truncates_prefix() {
        let long = "x".repeat(80);
        let name = generate_container_name(&long, "abcdefghijkl").unwrap();
        assert_eq!(name.as_str(), format!("{}-abcdefgh", "x".repeat(50)));
    }

    #[test]
    fn test_truncation_happens_after_hyphen_trim() {
        let template = format!("{} tail", "y".repeat(49));
        let name = generate_container_name(&template, "u1").unwrap();
        assert_eq!(name.as_str(), format!("{}--u1", "y".repeat(49)));
        assert!(is_valid_container_name(name.as_str()));
    }

    #[test]
    fn test_degenerate_template_uses_fallback() {
        let name = generate_container_name("!!!---???", "abc").unwrap();
        assert_eq!(name.as_str(), "resource-abc");
    }

    #[test]
    fn test_degenerate_user_id_uses_fallback() {
        let name = generate_container_name("redis", "----").unwrap();
        assert_eq!(name.as_str(), "redis-user");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(
            generate_container_name("", "u"),
            Err(ProvisionError::EmptyTemplateName)
        ));
        assert!(matches!(
            generate_container_name("t", ""),
            Err(ProvisionError::EmptyUserId)
        ));
    }

    #[test]
    fn test_generated_names_always_valid() {
        let long = "z-".repeat(100);
        let templates = [
            "a",
            "Stable Diffusion XL",
            "!!!",
            "日本語テンプレート",
            "Ünïcödé ML",
            "   ",
            "...",
            "__init__",
            "a.b.c",
            "emoji 🚀 rocket",
            long.as_str(),
        ];
        let users = [
            "u",
            "-",
            "a1b2c3d4-e5f6",
            "ÄÖÜ",
            "user with spaces",
            "🚀🚀🚀",
            "12345678901234567890",
        ];

        for template in templates {
            for user in users {
                let name = generate_container_name(template, user).unwrap();
                assert!(
                    is_valid_container_name(name.as_str()),
                    "invalid name {:?} from ({:?}, {:?})",
                    name,
                    template,
                    user
                );
            }
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_container_name("Ollama", "f00d-beef-cafe").unwrap();
        let b = generate_container_name("Ollama", "f00d-beef-cafe").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_roundtrip_serde() {
        let name: ContainerName = serde_json::from_str("\"web-01\"").unwrap();
        assert_eq!(name.as_str(), "web-01");
        assert!(serde_json::from_str::<ContainerName>("\"-bad\"").is_err());
    }
}
