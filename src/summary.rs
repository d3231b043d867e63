use crate::extract::Extraction;
use std::collections::HashMap;

/// Order of the keywords in a [`CountSummary`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SummaryOrder {
    /// Order in which the keywords first appear in the result rows
    #[default]
    FirstAppearance,
    /// Order in which the keywords first appear in the source table
    SourceOrder,
    /// Keyword ascending by code point
    Alphabetical,
    /// Count descending, ties by first appearance in the result rows
    Frequency,
}

/// Number of result rows contributed by each keyword.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountSummary {
    entries: Vec<(String, usize)>,
}

impl CountSummary {
    pub fn from_extraction(extraction: &Extraction, order: SummaryOrder) -> Self {
        let mut entries = Vec::<(String, usize)>::new();
        let mut positions = HashMap::<String, usize>::new();
        for group in extraction.groups() {
            match positions.get(&group) {
                Some(position) => entries[*position].1 += 1,
                None => {
                    positions.insert(group.clone(), entries.len());
                    entries.push((group, 1));
                }
            }
        }
        match order {
            SummaryOrder::FirstAppearance => (),
            SummaryOrder::SourceOrder => {
                let rank = |keyword: &str| extraction.first_seen.iter().position(|seen| seen == keyword);
                entries.sort_by_key(|(keyword, _)| rank(keyword));
            }
            SummaryOrder::Alphabetical => entries.sort_by(|left, right| left.0.cmp(&right.0)),
            // Stable sort keeps first appearance among equal counts
            SummaryOrder::Frequency => entries.sort_by(|left, right| right.1.cmp(&left.1)),
        }
        CountSummary { entries }
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn get(&self, keyword: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(name, _)| name == keyword)
            .map(|(_, count)| *count)
    }

    /// Sum of all counts, equal to the number of result rows.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
