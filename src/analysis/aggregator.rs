//! Site-level statistics over normalized page reviews.
//!
//! Everything here is a pure function of its inputs: no I/O, no remote calls.

use crate::models::{Narrative, PageReview, ReviewMode, ScoreDistribution, SiteAnalysis};

/// Narrative list cap when deriving a fallback narrative.
pub fn fallback_cap(mode: ReviewMode) -> usize {
    match mode {
        ReviewMode::Exhaustive => 10,
        _ => 5,
    }
}

/// Mean of the present overall scores, rounded to two decimals.
/// Unscored pages are excluded, not counted as zero.
pub fn average_score(pages: &[PageReview]) -> Option<f64> {
    let scores: Vec<f64> = pages
        .iter()
        .filter_map(PageReview::overall)
        .map(f64::from)
        .collect();

    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// Bucket every scored page into its band.
pub fn score_distribution(pages: &[PageReview]) -> ScoreDistribution {
    let mut dist = ScoreDistribution::default();
    for score in pages.iter().filter_map(PageReview::overall) {
        dist.record(score);
    }
    dist
}

/// Distinct items across pages in first-occurrence order, at most `cap`.
pub fn unique_items<'a, F>(pages: &'a [PageReview], cap: usize, select: F) -> Vec<String>
where
    F: Fn(&'a PageReview) -> &'a [String],
{
    let mut out: Vec<String> = Vec::new();
    for item in pages.iter().flat_map(|page| select(page).iter()) {
        if out.len() >= cap {
            break;
        }
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Compute `site_analysis` for a finished run.
///
/// A supplied narrative is used as-is for its non-empty parts; missing parts
/// are derived from the page records.
pub fn aggregate(
    pages: &[PageReview],
    discovered: usize,
    narrative: Option<&Narrative>,
    mode: ReviewMode,
) -> SiteAnalysis {
    let average = average_score(pages);
    let distribution = score_distribution(pages);
    let pages_scored = distribution.total();
    let pages_degraded = pages.iter().filter(|page| page.degraded).count();
    let cap = fallback_cap(mode);

    let given = narrative.cloned().unwrap_or_default();

    let strengths = non_empty_or(given.strengths, || {
        unique_items(pages, cap, |p| p.positive_aspects.as_slice())
    });
    let critical_issues = non_empty_or(given.critical_issues, || {
        unique_items(pages, cap, |p| p.critical_issues.as_slice())
    });
    let recommendations = non_empty_or(given.recommendations, || {
        unique_items(pages, cap, |p| p.recommendations.as_slice())
    });
    let overall_assessment = given
        .overall_assessment
        .filter(|text| !text.trim().is_empty())
        .or_else(|| Some(fallback_assessment(pages.len(), discovered, average)));

    SiteAnalysis {
        average_score: average,
        score_distribution: distribution,
        pages_scored,
        pages_degraded,
        strengths,
        critical_issues,
        recommendations,
        overall_assessment,
        extra: given.extra,
    }
}

fn non_empty_or<F: FnOnce() -> Vec<String>>(given: Vec<String>, derive: F) -> Vec<String> {
    if given.is_empty() {
        derive()
    } else {
        given
    }
}

fn fallback_assessment(reviewed: usize, discovered: usize, average: Option<f64>) -> String {
    let mut text = match average {
        Some(avg) => format!(
            "Analyzed {} pages with an average score of {:.1}/10",
            reviewed, avg
        ),
        None => format!("Analyzed {} pages; no scored pages", reviewed),
    };
    if discovered > reviewed {
        text.push_str(&format!(" ({} pages discovered)", discovered));
    }
    text
}
