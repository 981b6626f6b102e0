//! Merging of per-field hits into one ranked result.
//!
//! The backend scores one field at a time, so a record matching through
//! several fields shows up once per field. [`MatchList`] keeps only the
//! best-scoring match per record id and ranks on read.

use std::collections::HashMap;

/// One record matched by a single field query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<R> {
    pub id: String,
    pub record: R,
    pub score: f32,
    /// Search field that produced the score
    pub field: String,
}

impl<R> Match<R> {
    pub fn new(id: impl Into<String>, record: R, score: f32, field: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record,
            score,
            field: field.into(),
        }
    }

    /// Convert the record while keeping id, score and field.
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> Match<T> {
        Match {
            id: self.id,
            record: f(self.record),
            score: self.score,
            field: self.field,
        }
    }
}

/// Best match per record id, in first-seen order.
#[derive(Debug, Clone)]
pub struct MatchList<R> {
    positions: HashMap<String, usize>,
    matches: Vec<Match<R>>,
}

impl<R> Default for MatchList<R> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            matches: Vec::new(),
        }
    }
}

impl<R> MatchList<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a match, keeping the higher score for an id already seen.
    ///
    /// A replaced entry keeps its original position so ties stay in
    /// first-seen order.
    pub fn insert(&mut self, m: Match<R>) {
        match self.positions.get(&m.id) {
            Some(&pos) => {
                if m.score > self.matches[pos].score {
                    self.matches[pos] = m;
                }
            }
            None => {
                self.positions.insert(m.id.clone(), self.matches.len());
                self.matches.push(m);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Match<R>> {
        self.positions.get(id).map(|&pos| &self.matches[pos])
    }

    /// Number of distinct ids
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The `n` best matches, highest score first.
    pub fn into_top(self, n: usize) -> Vec<Match<R>> {
        let mut ranked = self.matches;
        // Stable: equal scores keep first-seen order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(n);
        ranked
    }
}

impl<R> Extend<Match<R>> for MatchList<R> {
    fn extend<I: IntoIterator<Item = Match<R>>>(&mut self, iter: I) {
        for m in iter {
            self.insert(m);
        }
    }
}

impl<R> FromIterator<Match<R>> for MatchList<R> {
    fn from_iter<I: IntoIterator<Item = Match<R>>>(iter: I) -> Self {
        let mut list = MatchList::new();
        list.extend(iter);
        list
    }
}
