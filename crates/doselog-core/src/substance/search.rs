//! Substance search and category filtering.

use serde::{Deserialize, Serialize};

use super::{Substance, SubstanceLookup};

/// Queries shorter than this only match on prefixes.
const MIN_CONTAINS_QUERY_LEN: usize = 3;

/// Chip name that toggles "only substances you used".
pub const USED_FILTER: &str = "you-used";

/// Category chip that is active when a search starts.
pub const COMMON_CATEGORY: &str = "common";

fn names_of(substance: &Substance) -> impl Iterator<Item = String> + '_ {
    std::iter::once(&substance.name)
        .chain(substance.common_names.iter())
        .map(|name| name.to_lowercase())
}

fn has_prefix(substance: &Substance, query: &str) -> bool {
    names_of(substance).any(|name| name.starts_with(query))
}

fn contains(substance: &Substance, query: &str) -> bool {
    names_of(substance).any(|name| name.contains(query))
}

/// Substances whose name or a common name matches `query`.
///
/// Short queries match prefixes only; longer ones match anywhere, with prefix
/// matches ordered first. Relative order is otherwise preserved.
pub fn matching_substances<'a>(query: &str, substances: &[&'a Substance]) -> Vec<&'a Substance> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return substances.to_vec();
    }
    if query.chars().count() < MIN_CONTAINS_QUERY_LEN {
        return substances
            .iter()
            .copied()
            .filter(|s| has_prefix(s, &query))
            .collect();
    }
    let (prefix, rest): (Vec<&Substance>, Vec<&Substance>) = substances
        .iter()
        .copied()
        .filter(|s| contains(s, &query))
        .partition(|s| has_prefix(s, &query));
    prefix.into_iter().chain(rest).collect()
}

/// Active search filters.
///
/// A fresh filter has the [`COMMON_CATEGORY`] chip active; [`SearchFilter::none`]
/// starts without any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Categories a substance must all carry.
    pub categories: Vec<String>,
    /// Restrict results to substances from the journal.
    pub only_used: bool,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            categories: vec![COMMON_CATEGORY.to_string()],
            only_used: false,
        }
    }
}

impl SearchFilter {
    pub fn none() -> Self {
        Self {
            categories: Vec::new(),
            only_used: false,
        }
    }

    /// Activate a category chip, leaving it on if it already is.
    pub fn require(&mut self, category: &str) {
        let category = category.to_lowercase();
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
    }

    /// Toggle a chip: [`USED_FILTER`] flips `only_used`, anything else
    /// adds or removes a category.
    pub fn toggle(&mut self, chip: &str) {
        if chip == USED_FILTER {
            self.only_used = !self.only_used;
            return;
        }
        let chip = chip.to_lowercase();
        match self.categories.iter().position(|c| *c == chip) {
            Some(index) => {
                self.categories.remove(index);
            }
            None => self.categories.push(chip),
        }
    }

    fn accepts(&self, substance: &Substance) -> bool {
        self.categories.iter().all(|c| substance.has_category(c))
    }
}

/// Run a search against the lookup.
///
/// `recently_used` holds substance names most recent first; it is only
/// consulted when the filter restricts to used substances.
pub fn search<'a, L: SubstanceLookup + ?Sized>(
    lookup: &'a L,
    filter: &SearchFilter,
    query: &str,
    recently_used: &[String],
) -> Vec<&'a Substance> {
    let candidates: Vec<&Substance> = if filter.only_used {
        let mut seen: Vec<&Substance> = Vec::new();
        for name in recently_used {
            if let Some(substance) = lookup.get_substance(name) {
                if !seen.iter().any(|s| std::ptr::eq(*s, substance)) {
                    seen.push(substance);
                }
            }
        }
        seen
    } else {
        lookup.all_substances().iter().collect()
    };
    let filtered: Vec<&Substance> = candidates
        .into_iter()
        .filter(|s| filter.accepts(s))
        .collect();
    matching_substances(query, &filtered)
}
