//! Dependency inclusion policies.

use serde::Deserialize;
use std::fmt;

/// How a declared dependency participates in compilation and packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyScope {
    /// Needed to compile; provided by the host at load time. Never bundled
    /// and never listed as a runtime dependency.
    CompileOnly,
    /// Needed only at runtime; listed in the POM, not on the compile
    /// classpath.
    RuntimeOnly,
    /// Needed to compile and at runtime; listed in the POM, not bundled.
    Implementation,
    /// Physically copied into the final jar.
    #[serde(alias = "shadow")]
    Embedded,
}

impl DependencyScope {
    /// Whether the dependency's classes are copied into the bundle.
    #[must_use]
    pub const fn is_bundled(self) -> bool {
        matches!(self, Self::Embedded)
    }

    /// Whether the dependency is visible to the compiler.
    #[must_use]
    pub const fn on_compile_classpath(self) -> bool {
        !matches!(self, Self::RuntimeOnly)
    }

    /// Whether consumers must provide the dependency at runtime.
    #[must_use]
    pub const fn is_runtime_requirement(self) -> bool {
        matches!(self, Self::RuntimeOnly | Self::Implementation)
    }

    /// The configuration-file spelling of the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompileOnly => "compile-only",
            Self::RuntimeOnly => "runtime-only",
            Self::Implementation => "implementation",
            Self::Embedded => "embedded",
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DependencyScope::CompileOnly, false, true, false)]
    #[case(DependencyScope::RuntimeOnly, false, false, true)]
    #[case(DependencyScope::Implementation, false, true, true)]
    #[case(DependencyScope::Embedded, true, true, false)]
    fn scope_policies(
        #[case] scope: DependencyScope,
        #[case] bundled: bool,
        #[case] compile: bool,
        #[case] runtime: bool,
    ) {
        assert_eq!(scope.is_bundled(), bundled);
        assert_eq!(scope.on_compile_classpath(), compile);
        assert_eq!(scope.is_runtime_requirement(), runtime);
    }
}
