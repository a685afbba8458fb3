//! Reading and writing Fabric access widener files.
//!
//! ```text
//! accessWidener v2 named
//! accessible class net/minecraft/world/level/block/Block
//! transitive-mutable field net/minecraft/world/level/Level random Lnet/minecraft/util/RandomSource;
//! ```

use super::error::{AccessRuleError, Result};
use super::rule::{AccessChange, AccessRule, AccessRuleSet, AccessTarget};

/// Parse an access widener document.
///
/// Comments start with `#` and run to the end of the line. Transitive
/// directives require the v2 header.
///
/// # Errors
///
/// Returns [`AccessRuleError`] for a missing header, unsupported version, or
/// a malformed rule.
///
/// # Examples
///
/// ```
/// use trellis_common::access::widener;
///
/// let text = "accessWidener v1 named\naccessible class a/Tree # why\n";
/// let rules = widener::parse(text).expect("valid widener");
/// assert_eq!(rules.namespace(), "named");
/// assert_eq!(rules.len(), 1);
/// ```
pub fn parse(text: &str) -> Result<AccessRuleSet> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, strip_comment(line)))
        .filter(|(_, line)| !line.is_empty());

    let (_, header) = lines.next().ok_or(AccessRuleError::MissingHeader)?;
    let (version, namespace) = parse_header(header)?;
    let mut rules = AccessRuleSet::new(namespace);

    for (line, content) in lines {
        let rule = parse_rule(content).map_err(|reason| AccessRuleError::Syntax { line, reason })?;
        if rule.is_transitive() && version < 2 {
            return Err(AccessRuleError::Syntax {
                line,
                reason: "transitive directives require accessWidener v2".to_owned(),
            });
        }
        rules.push(rule);
    }
    Ok(rules)
}

/// Render a rule set as an access widener document.
///
/// The v2 header is emitted only when a transitive rule needs it.
#[must_use]
pub fn format(rules: &AccessRuleSet) -> String {
    let version = if rules.has_transitive_rules() { 2 } else { 1 };
    let mut out = format!("accessWidener\tv{version}\t{}\n", rules.namespace());
    for rule in rules.rules() {
        out.push_str(&rule.to_string());
        out.push('\n');
    }
    out
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(content, _)| content).trim()
}

fn parse_header(header: &str) -> Result<(u8, String)> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    match tokens.as_slice() {
        ["accessWidener", version, namespace] => {
            let version = match *version {
                "v1" => 1,
                "v2" => 2,
                other => {
                    return Err(AccessRuleError::UnsupportedVersion {
                        found: other.to_owned(),
                    });
                }
            };
            Ok((version, (*namespace).to_owned()))
        }
        _ => Err(AccessRuleError::MissingHeader),
    }
}

fn parse_rule(line: &str) -> std::result::Result<AccessRule, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (keyword, kind) = match tokens.as_slice() {
        [keyword, kind, ..] => (*keyword, *kind),
        _ => return Err(format!("expected a directive and a target kind in \"{line}\"")),
    };
    let (change, transitive) =
        AccessChange::parse(keyword).ok_or_else(|| format!("unknown directive \"{keyword}\""))?;

    let (class, target) = match (kind, tokens.as_slice()) {
        ("class", [_, _, class]) => (*class, AccessTarget::Class),
        ("method", [_, _, class, name, descriptor]) => (
            *class,
            AccessTarget::Method {
                name: (*name).to_owned(),
                descriptor: (*descriptor).to_owned(),
            },
        ),
        ("field", [_, _, class, name, descriptor]) => (
            *class,
            AccessTarget::Field {
                name: (*name).to_owned(),
                descriptor: Some((*descriptor).to_owned()),
            },
        ),
        ("class" | "method" | "field", _) => {
            return Err(format!("wrong number of tokens for a {kind} rule"));
        }
        _ => return Err(format!("unknown target kind \"{kind}\"")),
    };

    AccessRule::new(change, transitive, class, target).map_err(|err| match err {
        AccessRuleError::InvalidRule { reason, .. } => reason,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CANONICAL: &str = "\
accessWidener v2 named

# blocks
accessible class net/minecraft/world/level/block/Block
extendable method net/minecraft/world/level/block/Block onRemove (Lnet/minecraft/world/level/Level;)V
accessible\tfield\tnet/minecraft/world/level/Level\trandom\tLnet/minecraft/util/RandomSource;
transitive-mutable field net/minecraft/world/level/Level random Lnet/minecraft/util/RandomSource;
accessible class net/minecraft/world/level/block/Block
";

    #[rstest]
    fn parses_canonical_widener() {
        let rules = parse(CANONICAL).expect("valid");
        assert_eq!(rules.namespace(), "named");
        assert_eq!(rules.len(), 4, "duplicate class rule collapses");
        assert!(rules.has_transitive_rules());
    }

    #[rstest]
    fn format_then_parse_preserves_rules() {
        let rules = parse(CANONICAL).expect("valid");
        let text = format(&rules);
        assert!(text.starts_with("accessWidener\tv2\tnamed\n"));
        assert_eq!(parse(&text).expect("reparse"), rules);
    }

    #[rstest]
    fn plain_rules_emit_v1_header() {
        let rules = parse("accessWidener v2 named\naccessible class a/B\n").expect("valid");
        assert_eq!(format(&rules), "accessWidener\tv1\tnamed\naccessible\tclass\ta/B\n");
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_header("accessible class a/B\n")]
    fn rejects_missing_header(#[case] text: &str) {
        assert_eq!(parse(text), Err(AccessRuleError::MissingHeader));
    }

    #[rstest]
    fn rejects_unknown_version() {
        assert!(matches!(
            parse("accessWidener v3 named\n"),
            Err(AccessRuleError::UnsupportedVersion { .. })
        ));
    }

    #[rstest]
    #[case::unknown_directive("widen class a/B", 2)]
    #[case::missing_descriptor("accessible method a/B run", 2)]
    #[case::mutable_method("mutable method a/B run ()V", 2)]
    #[case::unknown_kind("accessible package a/B", 2)]
    fn reports_line_of_bad_rule(#[case] rule: &str, #[case] expected_line: usize) {
        let text = format!("accessWidener v1 named\n{rule}\n");
        let err = parse(&text).expect_err("malformed rule");
        assert!(
            matches!(err, AccessRuleError::Syntax { line, .. } if line == expected_line),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn transitive_requires_v2() {
        let err = parse("accessWidener v1 named\ntransitive-accessible class a/B\n")
            .expect_err("v1 forbids transitive");
        assert!(err.to_string().contains("v2"));
    }
}
