//! Terminal progress reporting for long solves.

use indicatif::{ProgressBar, ProgressStyle};

use crate::{Event, Id, Snapshot, Solver, SolverError, Step};

/// Progress bar tracking collapsed cells and backtracks.
pub struct SolveProgress {
    progress_bar: ProgressBar,
    collapsed: usize,
    backtrack_count: usize,
}

impl SolveProgress {
    /// Creates a progress bar over `cells` cells, `collapsed` of which are
    /// already done.
    pub fn new(cells: usize, collapsed: usize) -> Self {
        Self::with_bar(ProgressBar::new(cells as u64), collapsed)
    }

    /// Tracks progress without drawing anything.
    pub fn hidden(cells: usize, collapsed: usize) -> Self {
        let pb = ProgressBar::hidden();
        pb.set_length(cells as u64);
        Self::with_bar(pb, collapsed)
    }

    fn with_bar(pb: ProgressBar, collapsed: usize) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} cells (Backtracked: {msg})",
        )
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("##-"));
        pb.set_style(style);
        pb.set_position(collapsed as u64);
        pb.set_message("0");

        Self {
            progress_bar: pb,
            collapsed,
            backtrack_count: 0,
        }
    }

    /// Advances the bar according to what a step did.
    pub fn update<C: Id, Sl: Id>(&mut self, snapshot: &Snapshot<C, Sl>) {
        match &snapshot.event {
            Event::Collapsed { .. } => self.collapsed += 1,
            Event::Updated { cell, .. } => {
                if snapshot.field.get(cell).is_some_and(|cell| cell.is_collapsed()) {
                    self.collapsed += 1;
                }
            }
            Event::RolledBack { .. } => {
                self.collapsed = snapshot.field.len() - snapshot.field.uncollapsed();
                self.record_backtrack();
            }
            Event::Inspected { .. } | Event::Finished => {}
        }
        self.progress_bar.set_position(self.collapsed as u64);
    }

    /// Cells collapsed so far.
    pub fn collapsed(&self) -> usize {
        self.collapsed
    }

    /// Record a backtrack event
    pub fn record_backtrack(&mut self) {
        self.backtrack_count += 1;
        self.progress_bar
            .set_message(self.backtrack_count.to_string());
    }

    /// Get current backtrack count
    pub fn backtrack_count(&self) -> usize {
        self.backtrack_count
    }

    /// Print a message through the progress bar
    pub fn println(&self, message: impl AsRef<str>) {
        self.progress_bar.println(message);
    }

    /// Finish and clear progress display
    pub fn finish(self) {
        self.progress_bar.finish_and_clear();

        if self.backtrack_count > 0 {
            println!(
                "Completed with {} backtracking attempts",
                self.backtrack_count
            );
        }
    }
}

/// Runs `solver` to completion behind a progress bar.
///
/// # Errors
///
/// Returns the first error the solver reports.
pub fn solve_with_progress<C: Id, T: Id, Sl: Id, So: Id>(
    solver: &mut Solver<'_, C, T, Sl, So>,
) -> Result<Snapshot<C, Sl>, SolverError> {
    let field = solver.field();
    let mut progress = SolveProgress::new(field.len(), field.len() - field.uncollapsed());
    loop {
        match solver.step() {
            Ok(Step::Progress(snapshot)) => progress.update(&snapshot),
            Ok(Step::Done(snapshot)) => {
                progress.finish();
                return Ok(snapshot);
            }
            Err(error) => {
                progress.println(format!("Solve failed: {error}"));
                progress.finish();
                return Err(error);
            }
        }
    }
}
