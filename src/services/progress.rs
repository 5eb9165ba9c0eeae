//! Progress reporting for generation runs

use crate::processor::{BatchUpdate, GenerationPlan, RunSummary};
use std::io::Write;
use std::time::Duration;

/// Trait for reporting progress during a generation run
pub trait ProgressReporter: Send + Sync {
    /// Report the plan computed from the prompts file and the images on disk
    fn report_plan(&self, plan: &GenerationPlan);

    /// Report an API call about to be made
    fn report_batch_start(&self, update: &BatchUpdate);

    /// Report that an API call finished and `saved` images were written
    fn report_batch_done(&self, update: &BatchUpdate, saved: u32);

    /// Report the pause before the next API call
    fn report_sleep(&self, _duration: Duration) {}

    /// Report the end of the run
    fn report_summary(&self, summary: &RunSummary);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_plan(&self, _plan: &GenerationPlan) {}

    fn report_batch_start(&self, _update: &BatchUpdate) {}

    fn report_batch_done(&self, _update: &BatchUpdate, _saved: u32) {}

    fn report_summary(&self, _summary: &RunSummary) {}
}

/// Console progress reporter printing one line per API call to stdout
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Also list every pending row of the plan
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

/// Line printed before an API call
#[must_use]
pub fn batch_start_line(update: &BatchUpdate) -> String {
    format!(
        "Generating {} images for category: {} with prompt ID: {} ...",
        update.requested, update.category, update.id
    )
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_plan(&self, plan: &GenerationPlan) {
        if plan.is_empty() {
            println!(
                "All {} prompt(s) already have their images. Nothing to generate.",
                plan.rows_total
            );
            return;
        }

        println!(
            "{} of {} prompt(s) need images: {} image(s) in {} request(s)",
            plan.items.len(),
            plan.rows_total,
            plan.total_images(),
            plan.total_requests()
        );

        if self.verbose {
            for item in &plan.items {
                println!(
                    "  • {}/{}: {}/{} on disk, batches {:?}",
                    item.category, item.id, item.generated_count, item.target_count, item.batches
                );
            }
        }
    }

    fn report_batch_start(&self, update: &BatchUpdate) {
        print!("{}", batch_start_line(update));
        let _ = std::io::stdout().flush();
    }

    fn report_batch_done(&self, update: &BatchUpdate, saved: u32) {
        if saved == update.requested {
            println!(" Done.");
        } else {
            println!(" Done ({} of {} saved).", saved, update.requested);
        }
    }

    fn report_sleep(&self, duration: Duration) {
        if self.verbose {
            println!("Waiting {}s before the next request", duration.as_secs());
        }
    }

    fn report_summary(&self, summary: &RunSummary) {
        if summary.dry_run {
            println!("Dry run: no images were requested.");
            return;
        }
        println!(
            "Saved {} image(s) in {} request(s); {}/{} pending prompt(s) completed in {:.1}s",
            summary.images_saved,
            summary.api_calls,
            summary.rows_completed,
            summary.rows_pending,
            summary.elapsed.as_secs_f64()
        );
    }
}

/// Create the progress reporter used by the CLI
#[must_use]
pub fn create_cli_progress_reporter(verbose: bool) -> Box<dyn ProgressReporter> {
    Box::new(ConsoleProgressReporter::new(verbose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use crate::config::GeneratorConfig;
    use crate::processor::BatchGenerator;
    use crate::prompts::PromptRow;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Plan(usize),
        Start(String, u32),
        Done(String, u32),
        Sleep(Duration),
        Summary(u32),
    }

    /// Test progress reporter that captures reports for verification
    #[derive(Default, Clone)]
    struct TestProgressReporter {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl TestProgressReporter {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for TestProgressReporter {
        fn report_plan(&self, plan: &GenerationPlan) {
            self.events.lock().unwrap().push(Event::Plan(plan.items.len()));
        }

        fn report_batch_start(&self, update: &BatchUpdate) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Start(update.id.clone(), update.requested));
        }

        fn report_batch_done(&self, update: &BatchUpdate, saved: u32) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Done(update.id.clone(), saved));
        }

        fn report_sleep(&self, duration: Duration) {
            self.events.lock().unwrap().push(Event::Sleep(duration));
        }

        fn report_summary(&self, summary: &RunSummary) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Summary(summary.images_saved));
        }
    }

    fn row(category: &str, id: &str, target: u32) -> PromptRow {
        PromptRow {
            category: category.to_string(),
            prompt: "p".to_string(),
            id: id.to_string(),
            target_count: target,
            generated_count: 0,
            line: 2,
        }
    }

    #[test]
    fn test_batch_start_line_matches_console_format() {
        let update = BatchUpdate {
            category: "animals".to_string(),
            id: "P7".to_string(),
            requested: 5,
            generated_count: 0,
            target_count: 10,
        };
        assert_eq!(
            batch_start_line(&update),
            "Generating 5 images for category: animals with prompt ID: P7 ..."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_sees_events_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = GeneratorConfig::builder()
            .images_dir(temp_dir.path().join("images"))
            .sleep_interval(Duration::from_secs(30))
            .build()
            .unwrap();
        let reporter = TestProgressReporter::default();
        let generator = BatchGenerator::new(config, MockBackend::new())
            .unwrap()
            .with_reporter(Box::new(reporter.clone()));

        generator
            .run_rows(vec![row("a", "P1", 6), row("b", "P2", 1)])
            .await
            .unwrap();

        assert_eq!(
            reporter.events(),
            vec![
                Event::Plan(2),
                Event::Start("P1".to_string(), 5),
                Event::Done("P1".to_string(), 5),
                Event::Sleep(Duration::from_secs(30)),
                Event::Start("P1".to_string(), 1),
                Event::Done("P1".to_string(), 1),
                Event::Start("P2".to_string(), 1),
                Event::Done("P2".to_string(), 1),
                Event::Summary(7),
            ]
        );
    }

    #[test]
    fn test_default_report_sleep_is_a_no_op() {
        struct PlanOnly;
        impl ProgressReporter for PlanOnly {
            fn report_plan(&self, _plan: &GenerationPlan) {}
            fn report_batch_start(&self, _update: &BatchUpdate) {}
            fn report_batch_done(&self, _update: &BatchUpdate, _saved: u32) {}
            fn report_summary(&self, _summary: &RunSummary) {}
        }

        PlanOnly.report_sleep(Duration::from_secs(60));
    }

    #[test]
    fn test_no_op_and_console_reporters_accept_all_events() {
        let plan = GenerationPlan::from_rows(&[row("a", "P1", 3)], 5);
        let update = BatchUpdate {
            category: "a".to_string(),
            id: "P1".to_string(),
            requested: 3,
            generated_count: 0,
            target_count: 3,
        };
        let summary = RunSummary::default();

        for reporter in [
            Box::new(NoOpProgressReporter) as Box<dyn ProgressReporter>,
            create_cli_progress_reporter(true),
        ] {
            reporter.report_plan(&plan);
            reporter.report_batch_start(&update);
            reporter.report_batch_done(&update, 3);
            reporter.report_sleep(Duration::from_secs(1));
            reporter.report_summary(&summary);
        }
    }
}
