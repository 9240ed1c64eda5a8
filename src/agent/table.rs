use std::collections::{BTreeMap, HashMap};

use crate::types::{State, ACTION_COUNT};

/// Persisted form of a per-state table: `{"x,y": [a0, a1, a2, a3]}`.
pub type TableDump = BTreeMap<String, Vec<f64>>;

/// Scalar types that can live in an [`ActionTable`].
pub trait TableValue: Copy + PartialEq {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl TableValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

impl TableValue for u32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            value.round() as u32
        } else {
            0
        }
    }
}

/// Sparse map from state to one value per action.
///
/// Entries are created lazily: the first access to a state synthesizes a
/// vector filled with the table's `fill` value, so a lookup never observes a
/// missing entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionTable<T> {
    entries: HashMap<State, [T; ACTION_COUNT]>,
    fill: T,
}

impl<T: TableValue> ActionTable<T> {
    pub fn new(fill: T) -> Self {
        ActionTable {
            entries: HashMap::new(),
            fill,
        }
    }

    pub fn fill(&self) -> T {
        self.fill
    }

    /// Values for `state`, creating the entry if needed.
    pub fn get(&mut self, state: State) -> [T; ACTION_COUNT] {
        *self.get_mut(state)
    }

    pub fn get_mut(&mut self, state: State) -> &mut [T; ACTION_COUNT] {
        let fill = self.fill;
        self.entries.entry(state).or_insert([fill; ACTION_COUNT])
    }

    /// Values for `state` without creating an entry.
    pub fn peek(&self, state: State) -> [T; ACTION_COUNT] {
        self.entries
            .get(&state)
            .copied()
            .unwrap_or([self.fill; ACTION_COUNT])
    }

    pub fn contains(&self, state: State) -> bool {
        self.entries.contains_key(&state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&State, &mut [T; ACTION_COUNT])> {
        self.entries.iter_mut()
    }

    pub fn to_dump(&self) -> TableDump {
        self.entries
            .iter()
            .map(|(state, values)| (state.key(), values.iter().map(|v| v.to_f64()).collect()))
            .collect()
    }

    /// Rebuild a table from its persisted form. Malformed keys are skipped;
    /// short vectors are padded with `fill`, long ones truncated.
    pub fn from_dump(dump: &TableDump, fill: T) -> Self {
        let mut table = ActionTable::new(fill);
        for (key, values) in dump {
            let state = match State::from_key(key) {
                Some(state) => state,
                None => {
                    log::warn!("skipping table entry with malformed key '{}'", key);
                    continue;
                }
            };
            let mut row = [fill; ACTION_COUNT];
            for (slot, value) in row.iter_mut().zip(values.iter()) {
                *slot = T::from_f64(*value);
            }
            table.entries.insert(state, row);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation_uses_fill() {
        let mut table = ActionTable::new(2.5);
        assert!(!table.contains(State::new(1, 1)));
        assert_eq!(table.peek(State::new(1, 1)), [2.5; 4]);
        assert!(table.is_empty());
        assert_eq!(table.get(State::new(1, 1)), [2.5; 4]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_dump_round_trip() {
        let mut table = ActionTable::new(0.0);
        table.get_mut(State::new(0, 0))[2] = 1.5;
        let dump = table.to_dump();
        assert_eq!(dump.get("0,0"), Some(&vec![0.0, 0.0, 1.5, 0.0]));
        assert_eq!(ActionTable::from_dump(&dump, 0.0), table);
    }

    #[test]
    fn test_from_dump_tolerates_bad_rows() {
        let mut dump = TableDump::new();
        dump.insert("nope".to_string(), vec![1.0; 4]);
        dump.insert("2,1".to_string(), vec![1.0]);
        let table: ActionTable<u32> = ActionTable::from_dump(&dump, 0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.peek(State::new(2, 1)), [1, 0, 0, 0]);
    }
}
