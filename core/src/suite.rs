use crate::{
    corpus, evaluate, CaseOutcome, Error, Launcher, Reporter, Result, RunConfig, SuiteSummary,
    TestCase,
};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};
use std::sync::mpsc;

/// Discovers, evaluates and reports every case for every configured architecture.
///
/// Stops at the first fatal error. An architecture without any cases is fatal too.
pub fn run_suite<W: Write>(
    config: &RunConfig,
    launcher: &dyn Launcher,
    reporter: &mut Reporter<W>,
) -> Result<Vec<SuiteSummary>> {
    let mut summaries = Vec::with_capacity(config.archs.len());

    for arch in &config.archs {
        reporter.arch_header(arch)?;

        let cases = corpus::discover(config, arch)?;
        if cases.is_empty() {
            reporter.empty_corpus()?;
            return Err(Error::EmptyCorpus { arch: arch.clone() });
        }

        let mut summary = SuiteSummary::new(arch.as_str());
        evaluate_all(&cases, config, launcher, |case, outcome| {
            reporter.case(case, &outcome)?;
            summary.record(&outcome);
            Ok(())
        })?;

        log::info!(
            "{arch}: {} of {} cases passed",
            summary.passed,
            summary.total
        );
        reporter.summary(&summary)?;
        summaries.push(summary);
    }

    Ok(summaries)
}

/// 0 if every architecture came out clean, 1 otherwise
pub fn exit_status(summaries: &[SuiteSummary]) -> u8 {
    if !summaries.is_empty() && summaries.iter().all(SuiteSummary::is_clean) {
        0
    } else {
        1
    }
}

// Feeds each outcome to `record` on the calling thread. With more than one job a bounded pool
// of workers evaluates cases and funnels outcomes back through a channel.
fn evaluate_all<'c>(
    cases: &'c [TestCase],
    config: &RunConfig,
    launcher: &dyn Launcher,
    mut record: impl FnMut(&'c TestCase, CaseOutcome) -> Result<()>,
) -> Result<()> {
    let workers = config.jobs.min(cases.len());
    if workers <= 1 {
        for case in cases {
            let outcome = evaluate(case, config, launcher)?;
            record(case, outcome)?;
        }
        return Ok(());
    }

    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (next, stop) = (&next, &stop);
            scope.spawn(move || {
                while !stop.load(SeqCst) {
                    let case = match cases.get(next.fetch_add(1, SeqCst)) {
                        Some(case) => case,
                        None => break,
                    };
                    let outcome = evaluate(case, config, launcher);
                    if tx.send((case, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for (case, outcome) in rx {
            if let Err(err) = outcome.and_then(|outcome| record(case, outcome)) {
                stop.store(true, SeqCst);
                return Err(err);
            }
        }
        Ok(())
    })
}
