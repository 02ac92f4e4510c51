//! Natural-language instructions for each kind of remote task.
//!
//! Each builder asks for a single JSON object in a fixed shape; the
//! normalizer copes with whatever actually comes back.

use crate::analysis::aggregator::{average_score, score_distribution, unique_items};
use crate::models::{PageReview, ReviewMode, ScoreDistribution};
use serde::Serialize;

const SCORING_CRITERIA: &str = "\
Score each dimension from 0 to 10:
- content_quality: clarity, completeness, correctness of examples
- structure_organization: logical flow, heading hierarchy, findability
- user_experience: navigation, search, readability, accessibility
- technical_accuracy: code samples, API details, version correctness
- overall: your overall judgement of the page";

const PAGE_SHAPE: &str = r#"{
  "url": "<page url>",
  "title": "<page title>",
  "scores": {
    "overall": <0-10>,
    "content_quality": <0-10>,
    "structure_organization": <0-10>,
    "user_experience": <0-10>,
    "technical_accuracy": <0-10>
  },
  "feedback": {
    "content_quality": "<specific feedback>",
    "structure_organization": "<specific feedback>",
    "user_experience": "<specific feedback>",
    "technical_accuracy": "<specific feedback>"
  },
  "critical_issues": ["<issue>"],
  "recommendations": ["<recommendation>"],
  "positive_aspects": ["<what works well>"]
}"#;

/// Discover and review everything in a single task.
pub fn one_shot(start_url: &str, domain: &str, max_pages: usize) -> String {
    format!(
        "You are reviewing the documentation site that starts at {start_url}.

1. Open {start_url} and find documentation pages on {domain} through the main \
navigation, the sidebar (expand collapsed sections), the footer and any tables of contents.
2. Review at most {max_pages} distinct documentation pages, starting with {start_url}. \
Skip images, downloads and other static assets.
3. For every reviewed page, evaluate it as follows.

{SCORING_CRITERIA}

Reply with one JSON object and nothing else:
{{
  \"total_pages_discovered\": <number of documentation pages you found>,
  \"page_reviews\": [{PAGE_SHAPE}],
  \"site_analysis\": {{
    \"site_strengths\": [\"<strength>\"],
    \"critical_site_issues\": [\"<issue>\"],
    \"priority_recommendations\": [\"<recommendation>\"],
    \"overall_assessment\": \"<summary of the whole site>\"
  }}
}}"
    )
}

/// List documentation links reachable from the start page.
pub fn discovery(start_url: &str, domain: &str, max_pages: usize) -> String {
    format!(
        "Open {start_url} and collect the links to documentation pages on {domain}.

Look in the main navigation, the sidebar (expand every collapsed section and dropdown), \
breadcrumbs, tables of contents, \"see also\" sections and the footer. \
Leave out images, downloads, static assets and links to other domains. \
Around {max_pages} pages is enough; list the most important pages first.

Reply with one JSON object and nothing else:
{{\"links\": [\"https://{domain}/...\"]}}"
    )
}

/// Breadth-first in-domain crawl, bounded by `cap`.
pub fn crawl(start_url: &str, domain: &str, cap: usize) -> String {
    format!(
        "Crawl the documentation site that starts at {start_url}.

Visit pages breadth-first: collect every documentation link on {start_url}, then visit \
each of those pages and collect their new links, and so on. Stay on {domain}, expand \
collapsed navigation to reveal hidden links, and ignore images, downloads and static assets. \
Stop when no new pages turn up or when you have found {cap} pages.

Reply with one JSON object and nothing else, listing pages in the order you found them:
{{\"links\": [\"https://{domain}/...\"]}}"
    )
}

/// Review one page.
pub fn page_review(url: &str) -> String {
    format!(
        "You are an expert documentation reviewer. Open {url} and review that page only.

{SCORING_CRITERIA}

Be specific and actionable. Reply with one JSON object and nothing else:
{PAGE_SHAPE}"
    )
}

/// Per-page line in the synthesis input.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
    pub score: Option<u8>,
}

/// Aggregated review data handed to the synthesis task.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInput {
    pub start_url: String,
    pub total_pages_discovered: usize,
    pub total_pages_reviewed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_percentage: Option<f64>,
    pub average_score: Option<f64>,
    pub score_distribution: ScoreDistribution,
    pub common_issues: Vec<String>,
    pub common_recommendations: Vec<String>,
    pub positive_aspects: Vec<String>,
    pub pages: Vec<PageSummary>,
}

impl SynthesisInput {
    pub fn from_pages(
        start_url: &str,
        pages: &[PageReview],
        discovered: usize,
        mode: ReviewMode,
    ) -> Self {
        let (item_cap, page_cap) = match mode {
            ReviewMode::Exhaustive => (30, 20),
            _ => (20, 10),
        };

        let coverage_percentage = (mode == ReviewMode::Exhaustive && discovered > 0).then(|| {
            let pct = pages.len() as f64 / discovered as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        });

        Self {
            start_url: start_url.to_string(),
            total_pages_discovered: discovered,
            total_pages_reviewed: pages.len(),
            coverage_percentage,
            average_score: average_score(pages),
            score_distribution: score_distribution(pages),
            common_issues: unique_items(pages, item_cap, |p| p.critical_issues.as_slice()),
            common_recommendations: unique_items(pages, item_cap, |p| p.recommendations.as_slice()),
            positive_aspects: unique_items(pages, item_cap, |p| p.positive_aspects.as_slice()),
            pages: pages
                .iter()
                .take(page_cap)
                .map(|p| PageSummary {
                    url: p.url.clone(),
                    title: p.title.clone(),
                    score: p.overall(),
                })
                .collect(),
        }
    }
}

/// Turn the per-page results into a site-level narrative.
pub fn synthesis(input: &SynthesisInput) -> String {
    let data = serde_json::to_string_pretty(input).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are a documentation strategist. Below is review data for the documentation \
site at {start_url}. Pages with a null score could not be reviewed. You do not need to \
browse; work from the data.

{data}

Identify site-wide patterns rather than page-specific details. \
Reply with one JSON object and nothing else:
{{
  \"site_strengths\": [\"<strength>\"],
  \"critical_site_issues\": [\"<issue>\"],
  \"priority_recommendations\": [\"<recommendation>\"],
  \"overall_assessment\": \"<strategic assessment and next steps>\"
}}",
        start_url = input.start_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageScores;

    fn page(url: &str, score: Option<u8>, issues: &[&str]) -> PageReview {
        PageReview {
            url: url.into(),
            scores: PageScores {
                overall: score,
                ..Default::default()
            },
            critical_issues: issues.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_instructions_mention_targets() {
        let text = one_shot("https://docs.example.com/intro", "docs.example.com", 5);
        assert!(text.contains("at most 5"));
        assert!(text.contains("page_reviews"));

        let text = crawl("https://docs.example.com/intro", "docs.example.com", 100);
        assert!(text.contains("found 100 pages"));

        let text = page_review("https://docs.example.com/b");
        assert!(text.contains("https://docs.example.com/b"));
        assert!(text.contains("\"technical_accuracy\""));
    }

    #[test]
    fn test_synthesis_input_caps_and_coverage() {
        let pages: Vec<PageReview> = (0..25)
            .map(|i| page(&format!("https://d/{}", i), Some(7), &["shared issue"]))
            .collect();

        let input = SynthesisInput::from_pages("https://d/0", &pages, 50, ReviewMode::Exhaustive);
        assert_eq!(input.pages.len(), 20);
        assert_eq!(input.coverage_percentage, Some(50.0));
        assert_eq!(input.common_issues, vec!["shared issue"]);

        let input = SynthesisInput::from_pages("https://d/0", &pages, 50, ReviewMode::MultiStep);
        assert_eq!(input.pages.len(), 10);
        assert_eq!(input.coverage_percentage, None);
    }

    #[test]
    fn test_synthesis_prompt_embeds_data() {
        let pages = vec![page("https://d/a", None, &[])];
        let input = SynthesisInput::from_pages("https://d/a", &pages, 1, ReviewMode::MultiStep);
        let text = synthesis(&input);
        assert!(text.contains("\"total_pages_reviewed\": 1"));
        assert!(text.contains("\"score\": null"));
    }
}
