//! Reporting utilities: branch spans and formatted terminal output.

mod format;

pub use format::*;

use crate::domain::{Branch, TitrationRecord};

/// A contiguous run of records produced by the same branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchSpan {
    pub branch: Branch,
    pub start_ml: f64,
    pub end_ml: f64,
    pub count: usize,
}

/// Group consecutive records by branch.
pub fn branch_spans(records: &[TitrationRecord]) -> Vec<BranchSpan> {
    let mut spans: Vec<BranchSpan> = Vec::new();
    for r in records {
        match spans.last_mut() {
            Some(span) if span.branch == r.branch => {
                span.end_ml = r.volume_ml;
                span.count += 1;
            }
            _ => spans.push(BranchSpan {
                branch: r.branch,
                start_ml: r.volume_ml,
                end_ml: r.volume_ml,
                count: 1,
            }),
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::simulate;
    use crate::domain::{Chemistry, TitrationParameters};

    #[test]
    fn weak_acid_spans_follow_the_regions() {
        let params = TitrationParameters::preset(Chemistry::WeakAcid);
        let sim = simulate(&params, Chemistry::WeakAcid).unwrap();
        let spans = branch_spans(&sim.records);
        let branches: Vec<Branch> = spans.iter().map(|s| s.branch).collect();
        assert_eq!(
            branches,
            [
                Branch::InitialWeakAcid,
                Branch::Buffer,
                Branch::ConjugateBaseHydrolysis,
                Branch::ExcessHydroxide
            ]
        );
        assert_eq!(spans[1].start_ml, 1.0);
        assert_eq!(spans[1].end_ml, 24.0);
        assert_eq!(spans.iter().map(|s| s.count).sum::<usize>(), sim.records.len());
    }
}
