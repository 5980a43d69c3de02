//! Scoring of candidate routes and selection of the three route variants.
//!
//! Durations and average signals are normalized onto [0, 1] across the
//! candidate set (higher is better for both) and combined into a balanced
//! score. The variants are then picked in a fixed order, fastest first, and a
//! later pick never reuses a candidate an earlier pick already took unless no
//! other candidate is left.

use std::fmt::Display;

use cellway_core::{route::RouteAlternative, tower::CellTower};
use cellway_towers::{CoverageProfile, associate_towers};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScoringWeights;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    Fastest,
    CellCoverage,
    Balanced,
}

impl OptimizationType {
    pub const ALL: [OptimizationType; 3] = [
        OptimizationType::Fastest,
        OptimizationType::CellCoverage,
        OptimizationType::Balanced,
    ];
}

impl Display for OptimizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                OptimizationType::Fastest => "fastest",
                OptimizationType::CellCoverage => "cell_coverage",
                OptimizationType::Balanced => "balanced",
            }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRoute {
    /// Position of the candidate in the provider response.
    pub index: usize,
    pub route: RouteAlternative,
    pub coverage: CoverageProfile,
    pub norm_duration: f64,
    pub norm_signal: f64,
    pub balanced_score: f64,
}

impl ScoredRoute {
    pub fn average_signal(&self) -> f64 {
        self.coverage.stats.average_signal
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizedSelection {
    pub fastest: Option<ScoredRoute>,
    pub cell_coverage: Option<ScoredRoute>,
    pub balanced: Option<ScoredRoute>,
}

impl OptimizedSelection {
    pub fn get(&self, optimization: OptimizationType) -> Option<&ScoredRoute> {
        match optimization {
            OptimizationType::Fastest => self.fastest.as_ref(),
            OptimizationType::CellCoverage => self.cell_coverage.as_ref(),
            OptimizationType::Balanced => self.balanced.as_ref(),
        }
    }

    pub fn set(&mut self, optimization: OptimizationType, route: ScoredRoute) {
        let slot = match optimization {
            OptimizationType::Fastest => &mut self.fastest,
            OptimizationType::CellCoverage => &mut self.cell_coverage,
            OptimizationType::Balanced => &mut self.balanced,
        };
        *slot = Some(route);
    }

    pub fn is_empty(&self) -> bool {
        self.fastest.is_none() && self.cell_coverage.is_none() && self.balanced.is_none()
    }

    /// The requested variant, or the fastest route when that variant is
    /// missing, along with the variant actually returned.
    pub fn take(mut self, optimization: OptimizationType) -> Option<(OptimizationType, ScoredRoute)> {
        let requested = match optimization {
            OptimizationType::Fastest => self.fastest.take(),
            OptimizationType::CellCoverage => self.cell_coverage.take(),
            OptimizationType::Balanced => self.balanced.take(),
        };

        requested
            .map(|route| (optimization, route))
            .or_else(|| {
                self.fastest
                    .take()
                    .map(|route| (OptimizationType::Fastest, route))
            })
    }
}

/// Annotates every route with the towers around it, then selects the variants.
pub fn select_optimized(
    routes: Vec<RouteAlternative>,
    towers: &[CellTower],
    weights: &ScoringWeights,
    max_tower_distance: f64,
) -> OptimizedSelection {
    let profiles: Vec<CoverageProfile> = routes
        .par_iter()
        .map(|route| associate_towers(&route.geometry, towers, max_tower_distance))
        .collect();

    select_from_profiles(routes.into_iter().zip(profiles).collect(), weights)
}

/// Normalized and balanced scores of routes already annotated with coverage.
/// The output keeps the input order and `index` is the input position.
pub fn score_candidates(
    candidates: Vec<(RouteAlternative, CoverageProfile)>,
    weights: &ScoringWeights,
) -> Vec<ScoredRoute> {
    let (min_duration, max_duration) = min_max(candidates.iter().map(|(route, _)| route.duration));
    let (min_signal, max_signal) = min_max(
        candidates
            .iter()
            .map(|(_, coverage)| coverage.stats.average_signal),
    );
    let duration_range = (max_duration - min_duration).max(1.0);
    let signal_range = (max_signal - min_signal).max(1.0);

    candidates
        .into_iter()
        .enumerate()
        .map(|(index, (route, coverage))| {
            let norm_duration = 1.0 - (route.duration - min_duration) / duration_range;
            let norm_signal = (coverage.stats.average_signal - min_signal) / signal_range;
            let balanced_score = weights.duration * norm_duration + weights.signal * norm_signal;

            debug!(
                "Selection: candidate {} duration {:.0}s signal {:.1} dBm towers {} -> duration {:.3} signal {:.3} balanced {:.3}",
                index,
                route.duration,
                coverage.stats.average_signal,
                coverage.tower_count(),
                norm_duration,
                norm_signal,
                balanced_score
            );

            ScoredRoute {
                index,
                route,
                coverage,
                norm_duration,
                norm_signal,
                balanced_score,
            }
        })
        .collect()
}

pub fn select_from_profiles(
    candidates: Vec<(RouteAlternative, CoverageProfile)>,
    weights: &ScoringWeights,
) -> OptimizedSelection {
    if candidates.is_empty() {
        return OptimizedSelection::default();
    }

    let scored = score_candidates(candidates, weights);

    let mut by_duration: Vec<&ScoredRoute> = scored.iter().collect();
    by_duration.sort_by(|a, b| {
        a.route
            .duration
            .total_cmp(&b.route.duration)
            .then(a.index.cmp(&b.index))
    });

    let mut by_signal: Vec<&ScoredRoute> = scored.iter().collect();
    by_signal.sort_by(|a, b| {
        b.average_signal()
            .total_cmp(&a.average_signal())
            .then(b.coverage.tower_count().cmp(&a.coverage.tower_count()))
            .then(a.index.cmp(&b.index))
    });

    let mut by_balanced: Vec<&ScoredRoute> = scored.iter().collect();
    by_balanced.sort_by(|a, b| {
        b.balanced_score
            .total_cmp(&a.balanced_score)
            .then(a.index.cmp(&b.index))
    });

    let mut taken: Vec<usize> = Vec::with_capacity(3);
    let fastest = pick_distinct(&by_duration, &mut taken);
    let cell_coverage = pick_distinct(&by_signal, &mut taken);
    let balanced = pick_distinct(&by_balanced, &mut taken);

    debug!(
        "Selection: fastest {}, cell coverage {}, balanced {}",
        fastest, cell_coverage, balanced
    );

    OptimizedSelection {
        fastest: Some(scored[fastest].clone()),
        cell_coverage: Some(scored[cell_coverage].clone()),
        balanced: Some(scored[balanced].clone()),
    }
}

/// Best ranked candidate not taken yet, or the best one when all are taken.
fn pick_distinct(ranking: &[&ScoredRoute], taken: &mut Vec<usize>) -> usize {
    let index = ranking
        .iter()
        .find(|route| !taken.contains(&route.index))
        .unwrap_or(&ranking[0])
        .index;
    taken.push(index);
    index
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
        (min.min(value), max.max(value))
    })
}
