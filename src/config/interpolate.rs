//! `${name}` placeholder expansion against the `[properties]` table.

use super::error::{ConfigError, Result};
use std::collections::BTreeMap;

/// Expands `${name}` placeholders from a fixed property table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpolator {
    properties: BTreeMap<String, String>,
}

impl Interpolator {
    /// Build an interpolator from file properties overlaid by overrides.
    ///
    /// Later overrides win over earlier ones and over file properties.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an override without `=`.
    pub fn new(file: &BTreeMap<String, String>, overrides: &[String]) -> Result<Self> {
        let mut properties = file.clone();
        for raw in overrides {
            let (name, value) = raw
                .split_once('=')
                .filter(|(name, _)| !name.trim().is_empty())
                .ok_or_else(|| ConfigError::InvalidOverride { value: raw.clone() })?;
            properties.insert(name.trim().to_owned(), value.to_owned());
        }
        Ok(Self { properties })
    }

    /// The merged property table.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Expand every placeholder in `value`; `field` names the source in
    /// errors.
    ///
    /// Expansion is single-pass: a property value is inserted verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UndefinedProperty`] or
    /// [`ConfigError::UnterminatedPlaceholder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use trellis::config::Interpolator;
    ///
    /// let file = BTreeMap::from([("mc".to_owned(), "1.21.1".to_owned())]);
    /// let props = Interpolator::new(&file, &["mod=0.13".to_owned()]).expect("valid");
    /// assert_eq!(props.expand("${mod}+${mc}", "version").expect("defined"), "0.13+1.21.1");
    /// ```
    pub fn expand(&self, value: &str, field: &str) -> Result<String> {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some((before, after)) = rest.split_once("${") {
            out.push_str(before);
            let (name, tail) =
                after
                    .split_once('}')
                    .ok_or_else(|| ConfigError::UnterminatedPlaceholder {
                        field: field.to_owned(),
                        value: value.to_owned(),
                    })?;
            let replacement =
                self.properties
                    .get(name.trim())
                    .ok_or_else(|| ConfigError::UndefinedProperty {
                        name: name.trim().to_owned(),
                        field: field.to_owned(),
                    })?;
            out.push_str(replacement);
            rest = tail;
        }
        out.push_str(rest);
        Ok(out)
    }
}
