use super::model::{Section, SectionAbsent, SectionKind, SECTION_SENTINEL};
use tracing::warn;

/// Split a completion on the literal sentinel, keeping at most three blocks.
///
/// Blocks are returned verbatim. Text after a third sentinel is discarded.
pub fn split(raw: &str) -> Vec<String> {
    let mut blocks: Vec<String> = raw.split(SECTION_SENTINEL).map(str::to_string).collect();
    if blocks.len() > SectionKind::ALL.len() {
        warn!(
            blocks = blocks.len(),
            "completion has more sections than expected; extra blocks discarded"
        );
        blocks.truncate(SectionKind::ALL.len());
    }
    blocks
}

/// Positional view over a split completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitCompletion {
    sections: [Option<Section>; 3],
}

impl SplitCompletion {
    pub fn from_completion(raw: &str) -> Self {
        let mut sections: [Option<Section>; 3] = [None, None, None];
        for (idx, text) in split(raw).into_iter().enumerate() {
            if let Some(kind) = SectionKind::from_position(idx) {
                sections[idx] = Some(Section { kind, text });
            }
        }
        for kind in SectionKind::ALL {
            if sections[kind.position()].is_none() {
                warn!(section = %kind, "section absent from completion");
            }
        }
        Self { sections }
    }

    pub fn get(&self, kind: SectionKind) -> Option<&Section> {
        self.sections[kind.position()].as_ref()
    }

    pub fn require(&self, kind: SectionKind) -> Result<&Section, SectionAbsent> {
        self.get(kind).ok_or(SectionAbsent(kind))
    }

    pub fn present_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionKind, Option<&Section>)> {
        SectionKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}
