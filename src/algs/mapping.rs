//! Index correspondence tables used when meshes are split, merged or
//! extracted.
//!
//! [`GenericMapping`] is one-to-many in both directions: an input may map to
//! several outputs (an element duplicated along a cut) and an output may
//! receive several inputs (elements merged together). Consumers must treat
//! the outputs of one input as an unordered collection.

use std::hash::Hash;

use hashbrown::HashMap;

use crate::topology::index::Index;

/// Many-to-many correspondence between inputs and outputs.
#[derive(Debug, Clone)]
pub struct GenericMapping<I, O = I> {
    in2out: HashMap<I, Vec<O>>,
    out2in: HashMap<O, Vec<I>>,
}

/// Index-to-index mapping, the form consumed by attribute extract/import.
pub type IndexMapping = GenericMapping<Index, Index>;

impl<I, O> Default for GenericMapping<I, O> {
    fn default() -> Self {
        Self {
            in2out: HashMap::new(),
            out2in: HashMap::new(),
        }
    }
}

impl<I, O> GenericMapping<I, O>
where
    I: Copy + Eq + Hash,
    O: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one more output for `input`. Duplicates are kept.
    pub fn map(&mut self, input: I, output: O) {
        self.in2out.entry(input).or_default().push(output);
        self.out2in.entry(output).or_default().push(input);
    }

    /// Outputs declared for `input` (empty if none).
    pub fn in2out(&self, input: &I) -> &[O] {
        self.in2out.get(input).map_or(&[], Vec::as_slice)
    }

    /// Inputs declared for `output` (empty if none).
    pub fn out2in(&self, output: &O) -> &[I] {
        self.out2in.get(output).map_or(&[], Vec::as_slice)
    }

    pub fn in2out_map(&self) -> &HashMap<I, Vec<O>> {
        &self.in2out
    }

    pub fn out2in_map(&self) -> &HashMap<O, Vec<I>> {
        &self.out2in
    }

    pub fn has_mapping_input(&self, input: &I) -> bool {
        self.in2out.contains_key(input)
    }

    pub fn has_mapping_output(&self, output: &O) -> bool {
        self.out2in.contains_key(output)
    }

    /// Number of distinct inputs.
    pub fn size_in(&self) -> usize {
        self.in2out.len()
    }

    /// Number of distinct outputs.
    pub fn size_out(&self) -> usize {
        self.out2in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in2out.is_empty()
    }

    /// Remove `input` and every pairing it takes part in.
    ///
    /// Outputs left without any input are dropped as well.
    pub fn erase_in(&mut self, input: &I) {
        let Some(outputs) = self.in2out.remove(input) else {
            return;
        };
        for output in outputs {
            if let Some(inputs) = self.out2in.get_mut(&output) {
                inputs.retain(|i| i != input);
                if inputs.is_empty() {
                    self.out2in.remove(&output);
                }
            }
        }
    }

    /// Remove `output` and every pairing it takes part in.
    ///
    /// Inputs left without any output are dropped as well.
    pub fn erase_out(&mut self, output: &O) {
        let Some(inputs) = self.out2in.remove(output) else {
            return;
        };
        for input in inputs {
            if let Some(outputs) = self.in2out.get_mut(&input) {
                outputs.retain(|o| o != output);
                if outputs.is_empty() {
                    self.in2out.remove(&input);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.in2out.clear();
        self.out2in.clear();
    }
}

impl IndexMapping {
    /// Largest output index, if any.
    pub fn max_output(&self) -> Option<Index> {
        self.out2in.keys().copied().max()
    }
}

/// One-to-one correspondence: mapping a new pair evicts any previous pair
/// sharing its input or its output.
#[derive(Debug, Clone)]
pub struct BijectiveMapping<I, O = I> {
    in2out: HashMap<I, O>,
    out2in: HashMap<O, I>,
}

impl<I, O> Default for BijectiveMapping<I, O> {
    fn default() -> Self {
        Self {
            in2out: HashMap::new(),
            out2in: HashMap::new(),
        }
    }
}

impl<I, O> BijectiveMapping<I, O>
where
    I: Copy + Eq + Hash,
    O: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, input: I, output: O) {
        if let Some(previous_out) = self.in2out.remove(&input) {
            self.out2in.remove(&previous_out);
        }
        if let Some(previous_in) = self.out2in.remove(&output) {
            self.in2out.remove(&previous_in);
        }
        self.in2out.insert(input, output);
        self.out2in.insert(output, input);
    }

    pub fn in2out(&self, input: &I) -> Option<O> {
        self.in2out.get(input).copied()
    }

    pub fn out2in(&self, output: &O) -> Option<I> {
        self.out2in.get(output).copied()
    }

    pub fn has_mapping_input(&self, input: &I) -> bool {
        self.in2out.contains_key(input)
    }

    pub fn has_mapping_output(&self, output: &O) -> bool {
        self.out2in.contains_key(output)
    }

    pub fn erase_in(&mut self, input: &I) {
        if let Some(output) = self.in2out.remove(input) {
            self.out2in.remove(&output);
        }
    }

    pub fn erase_out(&mut self, output: &O) {
        if let Some(input) = self.out2in.remove(output) {
            self.in2out.remove(&input);
        }
    }

    pub fn size(&self) -> usize {
        self.in2out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in2out.is_empty()
    }

    pub fn in2out_map(&self) -> &HashMap<I, O> {
        &self.in2out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_evicts_previous_pairs() {
        let mut bijective = BijectiveMapping::<u32, i64>::new();
        bijective.map(0, 42);
        bijective.map(1, -22);
        assert_eq!(bijective.size(), 2);
        bijective.map(3, -22);
        assert_eq!(bijective.size(), 2);
        assert!(bijective.has_mapping_input(&3));
        assert!(!bijective.has_mapping_input(&1));
        bijective.erase_out(&42);
        assert!(!bijective.has_mapping_input(&0));
        assert_eq!(bijective.size(), 1);
        bijective.map(3, 11);
        assert_eq!(bijective.size(), 1);
        assert!(!bijective.has_mapping_output(&-22));
        assert_eq!(bijective.out2in(&11), Some(3));
    }

    #[test]
    fn generic_erase_out_drops_orphan_inputs() {
        let mut generic = GenericMapping::<u32, i64>::new();
        generic.map(0, 42);
        generic.map(1, -22);
        generic.map(7, 42);
        assert_eq!(generic.size_in(), 3);
        assert_eq!(generic.size_out(), 2);
        generic.erase_out(&42);
        assert!(!generic.has_mapping_output(&42));
        assert!(!generic.has_mapping_input(&0));
        assert!(!generic.has_mapping_input(&7));
        assert_eq!(generic.size_in(), 1);
        assert_eq!(generic.size_out(), 1);
    }

    #[test]
    fn generic_keeps_duplicates() {
        let mut generic = GenericMapping::<u32, i64>::new();
        for _ in 0..4 {
            generic.map(0, -8);
        }
        generic.map(5, -8);
        assert_eq!(generic.out2in(&-8).len(), 5);
        generic.erase_in(&0);
        assert_eq!(generic.out2in(&-8), &[5]);
    }

    #[test]
    fn fan_out_of_one_input() {
        let mut mapping = IndexMapping::new();
        mapping.map(2, 5);
        mapping.map(2, 7);
        let mut outs = mapping.in2out(&2).to_vec();
        outs.sort_unstable();
        assert_eq!(outs, vec![5, 7]);
        assert_eq!(mapping.max_output(), Some(7));
        assert!(mapping.in2out(&3).is_empty());
    }
}
