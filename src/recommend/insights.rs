use crate::catalog::model::{Catalog, Category};
use crate::config::settings::AppConfig;
use crate::progress::model::Progress;
use crate::progress::unlock::{category_completion, overall_completion};

/// Knobs for the insight rules.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRules {
    pub recall_category: String,
    pub calm_focus_category: String,
    /// Views minus completions a category must exceed to count as skipped
    pub skipped_gap_threshold: i64,
    pub max_insights: usize,
}

impl Default for InsightRules {
    fn default() -> Self {
        InsightRules::from_config(&AppConfig::default())
    }
}

impl InsightRules {
    pub fn from_config(config: &AppConfig) -> Self {
        InsightRules {
            recall_category: config.recall_category.clone(),
            calm_focus_category: config.calm_focus_category.clone(),
            skipped_gap_threshold: config.skipped_gap_threshold,
            max_insights: config.max_insights,
        }
    }
}

pub fn progress_insights(progress: &Progress, catalog: &Catalog) -> Vec<String> {
    progress_insights_with(progress, catalog, &InsightRules::default())
}

/// Premium-only progress messages, highest priority first, capped at
/// `rules.max_insights`. Nothing is cached; every call reads current state.
pub fn progress_insights_with(progress: &Progress, catalog: &Catalog, rules: &InsightRules) -> Vec<String> {
    if !progress.is_premium {
        return Vec::new();
    }

    let mut insights = Vec::new();

    if progress.current_streak >= 7 {
        insights.push(format!(
            "{} days in a row! Consistency like this is what makes training stick.",
            progress.current_streak
        ));
    } else if progress.current_streak >= 3 {
        insights.push(format!(
            "You're building momentum with a {}-day streak. Keep it going!",
            progress.current_streak
        ));
    }

    if let Some(recall) = catalog.category(&rules.recall_category) {
        let ratio = category_completion(recall, progress);
        if ratio >= 1.0 {
            insights.push("Recall mastered! Your dog comes when called.".to_string());
        } else if ratio > 0.5 {
            insights.push("Recall is improving. Keep practicing around new distractions.".to_string());
        }
    }

    if let Some(calm) = catalog.category(&rules.calm_focus_category) {
        let ratio = category_completion(calm, progress);
        if ratio >= 1.0 {
            insights.push("Calm & focus mastered. Your dog knows how to settle.".to_string());
        } else if ratio > 0.5 {
            insights.push("Focus is trending up. Calm moments are getting easier.".to_string());
        }
    }

    if let Some(category) = most_skipped_category(progress, catalog, rules.skipped_gap_threshold) {
        insights.push(format!(
            "You've opened {} lessons often without finishing them. Worth a revisit?",
            category.title
        ));
    }

    let overall = overall_completion(catalog, progress);
    if overall > 0.75 {
        insights.push("Almost there! You've completed over three quarters of the program.".to_string());
    } else if overall > 0.5 {
        insights.push("Halfway through the program. Great progress!".to_string());
    }

    insights.truncate(rules.max_insights);
    insights
}

/// Category whose lessons were viewed most often without being completed.
/// Earlier categories win ties; nothing is returned unless the gap exceeds
/// `threshold`.
pub fn most_skipped_category<'a>(progress: &Progress, catalog: &'a Catalog, threshold: i64) -> Option<&'a Category> {
    let mut best: Option<(&Category, i64)> = None;

    for category in &catalog.categories {
        let gap = skip_gap(category, progress);
        let best_gap = best.map(|(_, g)| g).unwrap_or(0);
        if gap > best_gap {
            best = Some((category, gap));
        }
    }

    best.filter(|(_, gap)| *gap > threshold).map(|(c, _)| c)
}

fn skip_gap(category: &Category, progress: &Progress) -> i64 {
    let views: i64 = category.lessons.iter().map(|l| progress.views_of(&l.id) as i64).sum();
    let completions: i64 = category.lessons.iter().map(|l| progress.completions_of(&l.id) as i64).sum();
    views - completions
}
