//! IndicatorSeries — a named numeric series aligned index-for-index with bars.
//!
//! Warmup slots hold `f64::NAN` internally; every accessor maps them to
//! `None`, so callers never see an undefined value masquerading as a number.

/// A named series of indicator values, one per bar.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    name: String,
    values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, or `None` when out of range or still in warmup.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| !v.is_nan())
    }

    /// The newest defined value.
    pub fn last(&self) -> Option<f64> {
        self.values.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// `(previous, current)` values for bars `index - 1` and `index`.
    ///
    /// `None` at index 0, past the end, or if either value is undefined.
    pub fn pair(&self, index: usize) -> Option<(f64, f64)> {
        let prev = self.get(index.checked_sub(1)?)?;
        let cur = self.get(index)?;
        Some((prev, cur))
    }

    /// Pair ending at the newest bar.
    pub fn last_pair(&self) -> Option<(f64, f64)> {
        self.pair(self.values.len().checked_sub(1)?)
    }

    /// Index of the first defined value.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(|v| !v.is_nan())
    }

    /// Raw storage, `NaN` marking undefined slots.
    pub fn raw(&self) -> &[f64] {
        &self.values
    }

    /// Mark every slot before `len` as undefined.
    pub(crate) fn mask_before(mut self, len: usize) -> Self {
        let end = len.min(self.values.len());
        for v in &mut self.values[..end] {
            *v = f64::NAN;
        }
        self
    }
}
