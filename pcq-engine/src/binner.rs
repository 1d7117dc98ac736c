use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: u64,
}

/// Streaming per-bin, per-classification elevation aggregator.
///
/// Memory is bounded by the number of distinct (bin, classification) pairs
/// actually observed, not by point count. Bins are created lazily; absent
/// bins are never emitted.
#[derive(Debug)]
pub struct DistanceBinner {
    step: f64,
    bins: BTreeMap<(u32, u8), Accumulator>,
    admitted: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinSummary {
    pub bin_index: u32,
    pub arc_length: f64,
    pub classification: u8,
    pub count: u64,
    pub mean_elevation: f64,
}

impl DistanceBinner {
    /// `step` must be positive; profile validation guarantees it.
    pub fn new(step: f64) -> Self {
        Self {
            step,
            bins: BTreeMap::new(),
            admitted: 0,
        }
    }

    pub fn admit(&mut self, arc_length: f64, classification: u8, elevation: f64) {
        let bin_index = (arc_length.max(0.0) / self.step).floor() as u32;
        let accumulator = self.bins.entry((bin_index, classification)).or_default();
        accumulator.sum += elevation;
        accumulator.count += 1;
        self.admitted += 1;
    }

    /// Total number of admitted points across all bins.
    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Materializes the sparse map, ordered by bin index then classification.
    pub fn emit(&self) -> Vec<BinSummary> {
        self.bins
            .iter()
            .map(|(&(bin_index, classification), accumulator)| BinSummary {
                bin_index,
                arc_length: bin_index as f64 * self.step,
                classification,
                count: accumulator.count,
                mean_elevation: accumulator.sum / accumulator.count as f64,
            })
            .collect()
    }
}
