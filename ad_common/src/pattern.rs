//! Minimal "simple pattern" matcher for the host/chart skip-list options.
//!
//! The config defaults (`!*`, `!system.cpu *`) come from a space-separated
//! list of shell-style glob terms, each optionally negated with a leading
//! `!`. This is not a general glob engine — only `*` as a wildcard is
//! supported, which is all the host/chart skip-list options need.

#[derive(Debug, Clone)]
struct Term {
    negate: bool,
    glob: String,
}

/// A space-separated list of `[!]glob` terms, matched first-match-wins in
/// declaration order (mirroring how the agent's "simple patterns" work).
#[derive(Debug, Clone)]
pub struct SimplePattern {
    terms: Vec<Term>,
}

impl SimplePattern {
    pub fn parse(spec: &str) -> Self {
        let terms = spec
            .split_whitespace()
            .map(|tok| {
                if let Some(rest) = tok.strip_prefix('!') {
                    Term {
                        negate: true,
                        glob: rest.to_string(),
                    }
                } else {
                    Term {
                        negate: false,
                        glob: tok.to_string(),
                    }
                }
            })
            .collect();
        Self { terms }
    }

    /// True if `name` matches the pattern (i.e. should be skipped).
    pub fn matches(&self, name: &str) -> bool {
        for term in &self.terms {
            if glob_match(&term.glob, name) {
                return !term.negate;
            }
        }
        false
    }
}

impl Default for SimplePattern {
    fn default() -> Self {
        Self::parse("!*")
    }
}

fn glob_match(glob: &str, name: &str) -> bool {
    fn rec(g: &[u8], n: &[u8]) -> bool {
        match g.first() {
            None => n.is_empty(),
            Some(b'*') => rec(&g[1..], n) || (!n.is_empty() && rec(g, &n[1..])),
            Some(c) => n.first().is_some_and(|nc| nc == c) && rec(&g[1..], &n[1..]),
        }
    }
    rec(glob.as_bytes(), name.as_bytes())
}
