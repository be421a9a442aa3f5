//! Signature placement rules
//!
//! A rule is a rectangle in PDF user space plus an applicability predicate
//! deciding which pages of a document the rectangle is drawn on.

use crate::types::{Result, SignError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decides whether a rule applies to `page_index` (0-based) of `total_pages`
pub trait PagePredicate: Send + Sync {
    fn applies(&self, page_index: usize, total_pages: usize) -> bool;
}

impl<F> PagePredicate for F
where
    F: Fn(usize, usize) -> bool + Send + Sync,
{
    fn applies(&self, page_index: usize, total_pages: usize) -> bool {
        self(page_index, total_pages)
    }
}

/// Which pages a signature rule is placed on
#[derive(Clone, Default)]
pub enum Applicability {
    #[default]
    AllPages,
    FirstPageOnly,
    LastPageOnly,
    AllButFirstPage,
    AllButLastPage,
    /// 0-based even indices: the 1st, 3rd, 5th... page
    OnlyEvenPages,
    OnlyOddPages,
    AllButFirstAndLastPages,
    /// Caller-supplied placement logic
    Custom(Arc<dyn PagePredicate>),
}

impl Applicability {
    /// All predicates that can be named in configuration
    pub const STANDARD: [Applicability; 8] = [
        Applicability::AllPages,
        Applicability::FirstPageOnly,
        Applicability::LastPageOnly,
        Applicability::AllButFirstPage,
        Applicability::AllButLastPage,
        Applicability::OnlyEvenPages,
        Applicability::OnlyOddPages,
        Applicability::AllButFirstAndLastPages,
    ];

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        Applicability::Custom(Arc::new(predicate))
    }

    /// Configuration name, `None` for custom predicates
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Applicability::AllPages => Some("AllPages"),
            Applicability::FirstPageOnly => Some("FirstPageOnly"),
            Applicability::LastPageOnly => Some("LastPageOnly"),
            Applicability::AllButFirstPage => Some("AllButFirstPage"),
            Applicability::AllButLastPage => Some("AllButLastPage"),
            Applicability::OnlyEvenPages => Some("OnlyEvenPages"),
            Applicability::OnlyOddPages => Some("OnlyOddPages"),
            Applicability::AllButFirstAndLastPages => Some("AllButFirstAndLastPages"),
            Applicability::Custom(_) => None,
        }
    }
}

impl PagePredicate for Applicability {
    fn applies(&self, page_index: usize, total_pages: usize) -> bool {
        let is_first = page_index == 0;
        let is_last = page_index + 1 == total_pages;
        match self {
            Applicability::AllPages => true,
            Applicability::FirstPageOnly => is_first,
            Applicability::LastPageOnly => is_last,
            Applicability::AllButFirstPage => !is_first,
            Applicability::AllButLastPage => !is_last,
            Applicability::OnlyEvenPages => page_index % 2 == 0,
            Applicability::OnlyOddPages => page_index % 2 != 0,
            Applicability::AllButFirstAndLastPages => !is_first && !is_last,
            Applicability::Custom(predicate) => predicate.applies(page_index, total_pages),
        }
    }
}

impl fmt::Debug for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Applicability {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Applicability::Custom(a), Applicability::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => a.name().is_some() && a.name() == b.name(),
        }
    }
}

impl FromStr for Applicability {
    type Err = SignError;

    /// Accepts configuration names (`LastPageOnly`) and short kebab-case
    /// forms (`last-page`)
    fn from_str(s: &str) -> Result<Self> {
        let parsed = match s.trim() {
            "AllPages" | "all" | "all-pages" => Applicability::AllPages,
            "FirstPageOnly" | "first" | "first-page" => Applicability::FirstPageOnly,
            "LastPageOnly" | "last" | "last-page" => Applicability::LastPageOnly,
            "AllButFirstPage" | "all-but-first" => Applicability::AllButFirstPage,
            "AllButLastPage" | "all-but-last" => Applicability::AllButLastPage,
            "OnlyEvenPages" | "even" => Applicability::OnlyEvenPages,
            "OnlyOddPages" | "odd" => Applicability::OnlyOddPages,
            "AllButFirstAndLastPages" | "middle" | "all-but-first-and-last" => {
                Applicability::AllButFirstAndLastPages
            }
            other => {
                return Err(SignError::Config(format!(
                    "Unknown page applicability '{}'",
                    other
                )));
            }
        };
        Ok(parsed)
    }
}

/// Where a signature goes and on which pages
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignatureRule {
    /// Left edge in points from the page origin
    pub position_x: f32,
    /// Bottom edge in points from the page origin
    pub position_y: f32,
    pub width: f32,
    pub height: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub applicability: Applicability,
}

impl SignatureRule {
    pub fn new(
        position_x: f32,
        position_y: f32,
        width: f32,
        height: f32,
        applicability: Applicability,
    ) -> Result<Self> {
        let rule = Self {
            position_x,
            position_y,
            width,
            height,
            applicability,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn applies_to(&self, page_index: usize, total_pages: usize) -> bool {
        self.applicability.applies(page_index, total_pages)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.position_x, self.position_y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(SignError::Config(
                "Signature rule geometry must be finite".to_string(),
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(SignError::Config(format!(
                "Signature box must have a positive size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl FromStr for SignatureRule {
    type Err = SignError;

    /// `x,y,width,height[,applicability]`, applicability defaults to all pages
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(SignError::Config(format!(
                "Expected x,y,width,height[,pages] but got '{}'",
                s
            )));
        }

        let mut numbers = [0.0f32; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| SignError::Config(format!("'{}' is not a number", part)))?;
        }

        let applicability = match parts.get(4) {
            Some(name) => name.parse()?,
            None => Applicability::AllPages,
        };

        SignatureRule::new(numbers[0], numbers[1], numbers[2], numbers[3], applicability)
    }
}

/// Signature rules for one document as signed by one user
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DocumentProfile {
    pub document_key: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<SignatureRule>,
}

impl DocumentProfile {
    pub fn new(document_key: impl Into<String>, rules: Vec<SignatureRule>) -> Self {
        Self {
            document_key: document_key.into(),
            rules,
        }
    }

    /// Rules that apply to the given page, in profile order
    pub fn required_rules(&self, page_index: usize, total_pages: usize) -> Vec<SignatureRule> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(page_index, total_pages))
            .cloned()
            .collect()
    }

    /// Whether any page of a `total_pages` document needs a signature
    pub fn needs_signature(&self, total_pages: usize) -> bool {
        (0..total_pages).any(|page| self.rules.iter().any(|rule| rule.applies_to(page, total_pages)))
    }

    /// Load a profile from a JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let profile: Self = serde_json::from_slice(&bytes)
            .map_err(|e| SignError::Config(format!("Failed to parse profile: {}", e)))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Save the profile to a JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SignError::Config(format!("Failed to serialize profile: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.document_key.trim().is_empty() {
            return Err(SignError::Config(
                "Document profile has no document key".to_string(),
            ));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            rule.validate().map_err(|e| match e {
                SignError::Config(msg) => SignError::Config(format!(
                    "{} rule {}: {}",
                    self.document_key, idx, msg
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserializer, Serializer};

    // Only the named predicates round-trip through configuration
    impl Serialize for Applicability {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match self.name() {
                Some(name) => serializer.serialize_str(name),
                None => Err(serde::ser::Error::custom(
                    "custom page applicability cannot be serialized",
                )),
            }
        }
    }

    impl<'de> Deserialize<'de> for Applicability {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        }
    }
}
