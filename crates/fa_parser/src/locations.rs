//! Removal and detection of source-location metadata.
//!
//! Downstream consumers look nodes up by location and treat two nodes with the
//! same range as an ambiguous match. Synthesized code must therefore carry no
//! location at all.

use swc_common::{Span, DUMMY_SP};
use swc_ecma_visit::{Visit, VisitMut, VisitMutWith, VisitWith};

/// Visitor that replaces every span with `DUMMY_SP`.
pub struct StripLocations;

impl VisitMut for StripLocations {
    fn visit_mut_span(&mut self, span: &mut Span) {
        *span = DUMMY_SP;
    }
}

/// Clone `node` with every span, at every nesting level, reset to `DUMMY_SP`.
pub fn strip_locations<N>(node: &N) -> N
where
    N: Clone + VisitMutWith<StripLocations>,
{
    let mut stripped = node.clone();
    stripped.visit_mut_with(&mut StripLocations);
    stripped
}

/// Visitor that records whether any non-dummy span is reachable.
#[derive(Default)]
pub struct LocationFinder {
    found: bool,
}

impl Visit for LocationFinder {
    fn visit_span(&mut self, span: &Span) {
        if !span.is_dummy() {
            self.found = true;
        }
    }
}

/// Whether any node reachable from `node` still carries a source location.
pub fn has_locations<N>(node: &N) -> bool
where
    N: VisitWith<LocationFinder>,
{
    let mut finder = LocationFinder::default();
    node.visit_with(&mut finder);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_program;
    use fa_ast::{ParserConfig, ParserOptions};

    #[test]
    fn parsed_program_has_locations_until_stripped() {
        let parsed =
            parse_program("var a = { b: [1, 2] };", "a.js", &ParserConfig::default()).unwrap();
        assert!(has_locations(&parsed.program));

        let stripped = strip_locations(&parsed.program);
        assert!(!has_locations(&stripped));
        // the original is left as it was
        assert!(has_locations(&parsed.program));
    }

    #[test]
    fn ranges_off_parses_without_locations() {
        let config = ParserConfig {
            options: ParserOptions {
                ranges: false,
                locations: false,
            },
            ..Default::default()
        };
        let parsed = parse_program("f(function () { return x; });", "a.js", &config).unwrap();
        assert!(!has_locations(&parsed.program));
        assert!(parsed.comments.is_none());
    }
}
