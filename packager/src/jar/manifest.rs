//! `META-INF/MANIFEST.MF` rendering.
//!
//! Manifests use CRLF line endings and wrap lines at 72 bytes, continuing
//! with a single leading space.

const MAX_LINE_BYTES: usize = 72;

/// Main attributes written to every bundle manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    attributes: Vec<(String, String)>,
}

impl Manifest {
    /// A manifest carrying `Manifest-Version: 1.0` plus the implementation
    /// title and version.
    #[must_use]
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            attributes: vec![
                ("Manifest-Version".to_owned(), "1.0".to_owned()),
                ("Implementation-Title".to_owned(), title.to_owned()),
                ("Implementation-Version".to_owned(), version.to_owned()),
            ],
        }
    }

    /// Append an attribute. Empty values are skipped.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.attributes.push((name.to_owned(), value.to_owned()));
        }
        self
    }

    /// Add `MixinConfigs` when any configuration names are given.
    #[must_use]
    pub fn with_mixin_configs(self, configs: &[String]) -> Self {
        let joined = configs.join(",");
        self.with("MixinConfigs", &joined)
    }

    /// Value of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The manifest as bytes ready to store in a jar.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_packager::jar::manifest::Manifest;
    ///
    /// let bytes = Manifest::new("fallingtrees", "0.13.0").render();
    /// let text = String::from_utf8(bytes).expect("utf-8");
    /// assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
    /// assert!(text.ends_with("\r\n\r\n"));
    /// ```
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        for (name, value) in &self.attributes {
            push_wrapped(&mut out, &format!("{name}: {value}"));
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

fn push_wrapped(out: &mut String, line: &str) {
    let mut limit = MAX_LINE_BYTES;
    let mut current = 0;
    for ch in line.chars() {
        if current + ch.len_utf8() > limit {
            out.push_str("\r\n ");
            // The continuation space counts towards the next line.
            limit = MAX_LINE_BYTES - 1;
            current = 0;
        }
        out.push(ch);
        current += ch.len_utf8();
    }
    out.push_str("\r\n");
}
