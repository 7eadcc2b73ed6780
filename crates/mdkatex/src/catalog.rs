//! Delimiter styles recognized in Markdown source.
//!
//! Rules are grouped by [`Scope`] and kept in the order they must be tried:
//! when one opener is a prefix of another, the longer one comes first.

/// Where a formula lives in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Inside a line of running text.
    Inline,
    /// A standalone display formula.
    Block,
}

/// How the opening and closing delimiters are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A literal open token followed later by a literal close token.
    Pair,
    /// A line based fence (backticks or tildes plus the `math` info string).
    Fence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterRule {
    pub name: &'static str,
    pub scope: Scope,
    pub kind: RuleKind,
    /// Opening token. For fences this is the backtick form; tildes are accepted too.
    pub open: &'static str,
    pub close: &'static str,
    /// Interior is copied byte for byte, with no nested delimiter handling.
    pub verbatim: bool,
}

pub static GITLAB_INLINE_DOUBLE: DelimiterRule = DelimiterRule {
    name: "gitlab-inline-double",
    scope: Scope::Inline,
    kind: RuleKind::Pair,
    open: "$``",
    close: "``$",
    verbatim: true,
};

pub static GITLAB_INLINE: DelimiterRule = DelimiterRule {
    name: "gitlab-inline",
    scope: Scope::Inline,
    kind: RuleKind::Pair,
    open: "$`",
    close: "`$",
    verbatim: true,
};

pub static BRACKET_INLINE: DelimiterRule = DelimiterRule {
    name: "bracket-inline",
    scope: Scope::Inline,
    kind: RuleKind::Pair,
    open: r"\(",
    close: r"\)",
    verbatim: true,
};

pub static GITLAB_BLOCK: DelimiterRule = DelimiterRule {
    name: "gitlab-block",
    scope: Scope::Block,
    kind: RuleKind::Fence,
    open: "```math",
    close: "```",
    verbatim: true,
};

pub static BRACKET_BLOCK: DelimiterRule = DelimiterRule {
    name: "bracket-block",
    scope: Scope::Block,
    kind: RuleKind::Pair,
    open: r"\[",
    close: r"\]",
    verbatim: true,
};

static INLINE_RULES: [&DelimiterRule; 3] = [&GITLAB_INLINE_DOUBLE, &GITLAB_INLINE, &BRACKET_INLINE];
static BLOCK_RULES: [&DelimiterRule; 2] = [&GITLAB_BLOCK, &BRACKET_BLOCK];

/// Rules applicable at `scope`, in match priority order.
pub fn rules(scope: Scope) -> &'static [&'static DelimiterRule] {
    match scope {
        Scope::Inline => &INLINE_RULES,
        Scope::Block => &BLOCK_RULES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_carry_their_own_scope() {
        for scope in [Scope::Inline, Scope::Block] {
            assert!(rules(scope).iter().all(|rule| rule.scope == scope));
        }
    }

    #[test]
    fn longer_openers_are_tried_first() {
        for scope in [Scope::Inline, Scope::Block] {
            let rules = rules(scope);
            for (i, earlier) in rules.iter().enumerate() {
                for later in &rules[i + 1..] {
                    assert!(
                        !later.open.starts_with(earlier.open),
                        "{} shadows {}",
                        earlier.name,
                        later.name
                    );
                }
            }
        }
    }

    #[test]
    fn gitlab_double_precedes_single() {
        let names: Vec<_> = rules(Scope::Inline).iter().map(|r| r.name).collect();
        assert_eq!(names, ["gitlab-inline-double", "gitlab-inline", "bracket-inline"]);
    }

    #[test]
    fn all_rules_are_verbatim() {
        assert!(
            rules(Scope::Inline)
                .iter()
                .chain(rules(Scope::Block))
                .all(|rule| rule.verbatim)
        );
    }
}
