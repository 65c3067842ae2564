use std::path::Path;

use chrono::Local;
use maud::{html, Markup, DOCTYPE};

use crate::error::Result;
use crate::search::{CandidateScore, SearchResult};

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
tr.best{background:#e6f4ea}\
td.failed{color:#b00020}";

fn format_score(score: f64) -> String {
    if score.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.4}", score)
    }
}

fn candidate_row(candidate: &CandidateScore, is_best: bool) -> Markup {
    let folds = candidate
        .fold_scores
        .iter()
        .map(|s| format!("{:.3}", s))
        .collect::<Vec<_>>()
        .join(" / ");
    html! {
        tr class=[is_best.then_some("best")] {
            td { (candidate.rank) }
            td { code { (candidate.params.to_string()) } }
            td { (format_score(candidate.mean_score)) }
            td { (format_score(candidate.std_score)) }
            @if let Some(error) = &candidate.error {
                td.failed { (error) }
            } @else {
                td { (folds) }
            }
            td { (format!("{:.2}s", candidate.fit_seconds)) }
        }
    }
}

/// Render a standalone HTML page describing a finished search.
pub fn render_search_report<M>(result: &SearchResult<M>, test_accuracy: Option<f64>) -> String {
    let mut ranked = result.candidates.iter().enumerate().collect::<Vec<_>>();
    ranked.sort_by_key(|(_, c)| c.rank);

    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "tunekit " (result.estimator_name) " search report" }
                style { (STYLE) }
            }
            body {
                h1 { (result.estimator_name) " hyperparameter search" }
                p { "Generated " (Local::now().format("%Y-%m-%d %H:%M:%S").to_string()) }
                ul {
                    li { "Strategy: " (result.strategy) }
                    li { "Scoring: " (result.scoring.name()) }
                    li { "Samples: " (result.n_samples) " x " (result.n_features) " features" }
                    li { "Folds: " (result.n_folds) }
                    li { "Candidates: " (result.candidates.len()) }
                }
                h2 { "Selected configuration" }
                p {
                    code { (result.best_params.to_string()) }
                    " with mean CV " (result.scoring.name()) " " (format_score(result.best_score))
                }
                @if let Some(accuracy) = test_accuracy {
                    p { "Test accuracy: " strong { (format!("{:.4}", accuracy)) } }
                }
                h2 { "Candidates" }
                table {
                    thead {
                        tr {
                            th { "Rank" }
                            th { "Parameters" }
                            th { "Mean" }
                            th { "Std" }
                            th { "Fold scores" }
                            th { "Time" }
                        }
                    }
                    tbody {
                        @for (idx, candidate) in ranked {
                            (candidate_row(candidate, idx == result.best_index))
                        }
                    }
                }
            }
        }
    };
    page.into_string()
}

/// Write the HTML report for `result` to `path`.
pub fn write_search_report<M, P: AsRef<Path>>(result: &SearchResult<M>, test_accuracy: Option<f64>, path: P) -> Result<()> {
    std::fs::write(path.as_ref(), render_search_report(result, test_accuracy))?;
    log::info!("Wrote search report to {}", path.as_ref().display());
    Ok(())
}
