use crate::config::EvolutionConfig;
use crate::types::GenerationRecord;

/// Windowed relative-change test over the best and average fitness history
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceTest {
    pub window: usize,
    pub tolerance: f64,
}

impl From<&EvolutionConfig> for ConvergenceTest {
    fn from(config: &EvolutionConfig) -> Self {
        Self {
            window: config.convergence_window,
            tolerance: config.tolerance,
        }
    }
}

/// `|latest - earlier| / |latest|`; with a zero denominator the absolute
/// difference is returned instead.
pub fn relative_change(latest: f64, earlier: f64) -> f64 {
    let diff = (latest - earlier).abs();
    if latest == 0.0 {
        diff
    } else {
        diff / latest.abs()
    }
}

impl ConvergenceTest {
    /// Converged when both best and average fitness moved by less than the
    /// tolerance across the window. Never true while the latest generation
    /// index is still within the window, or for an empty window.
    pub fn is_converged(&self, history: &[GenerationRecord]) -> bool {
        let Some(latest) = history.last() else {
            return false;
        };
        if self.window == 0 {
            return false;
        }
        if latest.generation <= self.window || history.len() < self.window {
            return false;
        }
        let earlier = &history[history.len() - self.window];

        let rel_best = relative_change(latest.best_fitness, earlier.best_fitness);
        let rel_avg = relative_change(latest.average_fitness, earlier.average_fitness);
        log::debug!(
            "Convergence: rel_best={:.3e} rel_avg={:.3e} tolerance={:.3e}",
            rel_best,
            rel_avg,
            self.tolerance
        );
        rel_best < self.tolerance && rel_avg < self.tolerance
    }
}
