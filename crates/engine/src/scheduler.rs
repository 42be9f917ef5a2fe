//! Debounce/run scheduler.
//!
//! An explicit state object: transitions take the current time as an
//! argument and [`RunScheduler::poll`] reports what became due, so the
//! whole thing is testable without sleeping.
//!
//! Two independent timers:
//! - **run**: with auto-run on, every edit restarts it; on expiry the settled
//!   buffers are committed (clear console, next run id, commit).
//! - **autosave**: every edit restarts it; on expiry the buffers are written
//!   to the last-active slot.

use std::time::{Duration, Instant};

use playground_core::{ExternalLibrary, RunCommit, RunId, SourceTriple};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Discard console entries of the previous run. Always directly
    /// precedes the `Commit` it belongs to.
    ClearConsole,
    Commit(RunCommit),
    Autosave(SourceTriple),
}

#[derive(Debug)]
pub struct RunScheduler {
    auto_run: bool,
    debounce: Duration,
    autosave_delay: Duration,
    run_deadline: Option<Instant>,
    autosave_deadline: Option<Instant>,
    run: RunId,
    /// Content the sandbox is known to run, as reported by `committed`
    last_commit: Option<(SourceTriple, Vec<ExternalLibrary>)>,
}

impl RunScheduler {
    pub fn new(auto_run: bool, debounce: Duration, autosave_delay: Duration) -> Self {
        Self {
            auto_run,
            debounce,
            autosave_delay,
            run_deadline: None,
            autosave_deadline: None,
            run: RunId::default(),
            last_commit: None,
        }
    }

    pub fn auto_run(&self) -> bool {
        self.auto_run
    }

    /// Id of the most recent commit (0 before the first one).
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Queue the initial render, due immediately regardless of auto-run.
    pub fn on_start(&mut self, now: Instant) {
        self.run_deadline = Some(now);
    }

    /// A buffer changed.
    pub fn on_edit(&mut self, now: Instant) {
        if self.auto_run {
            self.run_deadline = Some(now + self.debounce);
        }
        self.autosave_deadline = Some(now + self.autosave_delay);
    }

    /// The library list changed. Restarts the run timer only; libraries are
    /// not part of the autosaved triple.
    pub fn on_libraries_changed(&mut self, now: Instant) {
        if self.auto_run {
            self.run_deadline = Some(now + self.debounce);
        }
    }

    /// Explicit Run: commit immediately, bypassing the execution guard.
    pub fn on_manual_run(&mut self, triple: SourceTriple, libraries: &[ExternalLibrary]) -> Vec<SchedulerAction> {
        self.run_deadline = None;
        self.commit(triple, libraries, true)
    }

    pub fn on_auto_run_toggle(&mut self, enabled: bool, now: Instant) {
        if enabled == self.auto_run {
            return;
        }
        self.auto_run = enabled;
        self.run_deadline = if enabled { Some(now + self.debounce) } else { None };
        log::debug!("Auto-run {}", if enabled { "enabled" } else { "disabled" });
    }

    /// The sandbox runs `commit`'s content. Until this is called a debounce
    /// with the same content commits again, so a failed rebuild is retried.
    pub fn committed(&mut self, commit: &RunCommit) {
        self.last_commit = Some((commit.triple.clone(), commit.libraries.clone()));
    }

    /// Earliest pending deadline, for sizing the caller's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.run_deadline, self.autosave_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire whatever is due at `now`, given the settled buffers.
    pub fn poll(&mut self, now: Instant, triple: &SourceTriple, libraries: &[ExternalLibrary]) -> Vec<SchedulerAction> {
        let mut actions = Vec::new();

        if self.autosave_deadline.is_some_and(|d| d <= now) {
            self.autosave_deadline = None;
            actions.push(SchedulerAction::Autosave(triple.clone()));
        }

        if self.run_deadline.is_some_and(|d| d <= now) {
            self.run_deadline = None;
            let unchanged = self
                .last_commit
                .as_ref()
                .is_some_and(|(t, l)| t == triple && l.as_slice() == libraries);
            if unchanged {
                log::debug!("Debounce expired with nothing new to run");
            } else {
                actions.extend(self.commit(triple.clone(), libraries, false));
            }
        }

        actions
    }

    fn commit(&mut self, triple: SourceTriple, libraries: &[ExternalLibrary], forced: bool) -> Vec<SchedulerAction> {
        self.run = self.run.next();
        vec![
            SchedulerAction::ClearConsole,
            SchedulerAction::Commit(RunCommit {
                run: self.run,
                triple,
                libraries: libraries.to_vec(),
                forced,
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(800);
    const AUTOSAVE: Duration = Duration::from_millis(1000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn commits(actions: &[SchedulerAction]) -> Vec<&RunCommit> {
        actions
            .iter()
            .filter_map(|a| match a {
                SchedulerAction::Commit(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rapid_edits_settle_into_one_commit() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        let mut triple = SourceTriple::default();

        for i in 0..5u64 {
            triple.script = format!("step({i})");
            sched.on_edit(t0 + ms(i * 100));
            assert!(commits(&sched.poll(t0 + ms(i * 100), &triple, &[])).is_empty());
        }

        // Last edit at 400ms; nothing until 1200ms.
        assert!(commits(&sched.poll(t0 + ms(1199), &triple, &[])).is_empty());
        let actions = sched.poll(t0 + ms(1200), &triple, &[]);
        let fired = commits(&actions);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].triple.script, "step(4)");
        assert_eq!(fired[0].run, RunId(1));
        assert!(!fired[0].forced);
        assert_eq!(actions[0], SchedulerAction::ClearConsole);
    }

    #[test]
    fn test_auto_run_off_waits_for_manual_run() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(false, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("<p/>", "", "");
        sched.on_edit(t0);
        assert!(commits(&sched.poll(t0 + ms(5000), &triple, &[])).is_empty());

        let actions = sched.on_manual_run(triple.clone(), &[]);
        assert_eq!(actions[0], SchedulerAction::ClearConsole);
        let fired = commits(&actions);
        assert_eq!(fired[0].run, RunId(1));
        assert!(fired[0].forced);
    }

    #[test]
    fn test_manual_run_cancels_pending_debounce() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("", "", "x()");
        sched.on_edit(t0);
        sched.on_manual_run(triple.clone(), &[]);
        assert!(commits(&sched.poll(t0 + ms(900), &triple, &[])).is_empty());
        assert_eq!(sched.run(), RunId(1));
    }

    #[test]
    fn test_autosave_independent_of_auto_run() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(false, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("", "", "saved()");
        sched.on_edit(t0);
        assert!(sched.poll(t0 + ms(999), &triple, &[]).is_empty());
        assert_eq!(sched.poll(t0 + ms(1000), &triple, &[]), vec![SchedulerAction::Autosave(triple.clone())]);
        // Fires once per idle period.
        assert!(sched.poll(t0 + ms(3000), &triple, &[]).is_empty());
    }

    #[test]
    fn test_unchanged_content_emits_nothing() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("", "", "same()");
        sched.on_start(t0);
        let actions = sched.poll(t0, &triple, &[]);
        let fired = commits(&actions);
        assert_eq!(fired.len(), 1);
        sched.committed(fired[0]);

        // Edit and revert within the debounce window.
        sched.on_edit(t0 + ms(10));
        let actions = sched.poll(t0 + ms(900), &triple, &[]);
        assert!(commits(&actions).is_empty());
        assert!(!actions.contains(&SchedulerAction::ClearConsole));
        assert_eq!(sched.run(), RunId(1));
    }

    #[test]
    fn test_unconfirmed_commit_is_retried() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("", "", "same()");
        sched.on_start(t0);
        assert_eq!(commits(&sched.poll(t0, &triple, &[])).len(), 1);

        // Never confirmed, e.g. the sandbox was unavailable.
        sched.on_edit(t0 + ms(10));
        let actions = sched.poll(t0 + ms(900), &triple, &[]);
        assert_eq!(commits(&actions)[0].run, RunId(2));
    }

    #[test]
    fn test_toggle_arms_and_cancels() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("", "", "a()");

        sched.on_edit(t0);
        sched.on_auto_run_toggle(false, t0 + ms(100));
        assert!(commits(&sched.poll(t0 + ms(2000), &triple, &[])).is_empty());

        sched.on_auto_run_toggle(true, t0 + ms(2000));
        assert!(commits(&sched.poll(t0 + ms(2799), &triple, &[])).is_empty());
        assert_eq!(commits(&sched.poll(t0 + ms(2800), &triple, &[])).len(), 1);
    }

    #[test]
    fn test_next_deadline_is_earliest() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        assert_eq!(sched.next_deadline(), None);
        sched.on_edit(t0);
        assert_eq!(sched.next_deadline(), Some(t0 + DEBOUNCE));
        sched.on_auto_run_toggle(false, t0);
        assert_eq!(sched.next_deadline(), Some(t0 + AUTOSAVE));
    }

    #[test]
    fn test_library_change_rearms_run_timer() {
        let t0 = Instant::now();
        let mut sched = RunScheduler::new(true, DEBOUNCE, AUTOSAVE);
        let triple = SourceTriple::new("", "", "a()");
        sched.on_start(t0);
        sched.poll(t0, &triple, &[]);

        let libs = vec![ExternalLibrary::parse("https://cdn.example.com/l.js").unwrap()];
        sched.on_libraries_changed(t0 + ms(10));
        let fired = sched.poll(t0 + ms(810), &triple, &libs);
        assert_eq!(commits(&fired)[0].libraries, libs);
        assert_eq!(sched.run(), RunId(2));
    }
}
