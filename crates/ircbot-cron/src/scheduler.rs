//! Cron scheduler: matches registered intervals against the wall clock.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use ircbot_types::{Session, run_isolated};

use crate::{CronError, CronTask, IntervalSpec};

/// A registered job.
pub struct CronJob {
    pub name: String,
    pub interval: IntervalSpec,
    task: Arc<dyn CronTask>,
}

/// Registry of named jobs, ticked once per poll-loop iteration.
pub struct CronScheduler {
    jobs: Vec<CronJob>,
    isolate: bool,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            isolate: true,
        }
    }

    /// Choose whether a panicking task is caught and logged or unwinds.
    pub fn with_isolation(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    /// Register a job under a unique name.
    ///
    /// A name collision is rejected and the existing job stays active.
    pub fn register(
        &mut self,
        name: &str,
        interval: IntervalSpec,
        task: Arc<dyn CronTask>,
    ) -> Result<(), CronError> {
        if self.contains(name) {
            return Err(CronError::DuplicateJob(name.to_string()));
        }
        info!(job = name, "Registered cron job");
        self.jobs.push(CronJob {
            name: name.to_string(),
            interval,
            task,
        });
        Ok(())
    }

    /// Register a closure as a job.
    pub fn schedule<F>(&mut self, name: &str, interval: IntervalSpec, f: F) -> Result<(), CronError>
    where
        F: Fn(&mut Session) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(name, interval, Arc::new(f))
    }

    /// Deregister a job. Returns false if no job had that name.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.name != name);
        let removed = self.jobs.len() != before;
        if removed {
            debug!(job = name, "Removed cron job");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.iter().any(|j| j.name == name)
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run every job whose interval matches the current local time.
    pub fn tick(&self, session: &mut Session) -> usize {
        self.tick_at(&Local::now().naive_local(), session)
    }

    /// Run every job whose interval matches `now`. Returns how many fired.
    ///
    /// Calling this twice within the same matching second fires the job
    /// twice.
    pub fn tick_at(&self, now: &NaiveDateTime, session: &mut Session) -> usize {
        let mut fired = 0;
        for job in &self.jobs {
            if !job.interval.matches_at(now) {
                continue;
            }
            fired += 1;
            debug!(job = %job.name, "Running cron job");
            match run_isolated(self.isolate, || job.task.run(session)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(job = %job.name, "Cron job failed: {e:#}"),
                Err(panic) => warn!(job = %job.name, "Cron job panicked: {panic}"),
            }
        }
        fired
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeField;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 0, s)
            .unwrap()
    }

    fn counting(counter: &Arc<AtomicU32>) -> Arc<dyn CronTask> {
        let c = counter.clone();
        Arc::new(move |_: &mut Session| -> anyhow::Result<()> {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_wildcard_job_fires_every_tick() {
        let mut cron = CronScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        cron.register("every", IntervalSpec::every_second(), counting(&counter))
            .unwrap();

        let mut session = Session::new("bot");
        for _ in 0..3 {
            cron.tick(&mut session);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_non_matching_second_never_fires() {
        let mut cron = CronScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let spec = IntervalSpec::every_second().with(TimeField::Second, "30").unwrap();
        cron.register("half", spec, counting(&counter)).unwrap();

        let mut session = Session::new("bot");
        for s in (0..60).filter(|s| *s != 30) {
            assert_eq!(cron.tick_at(&at(s), &mut session), 0);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fires_once_per_tick_within_matching_second() {
        let mut cron = CronScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let spec = IntervalSpec::from_pairs([("second", "00,30")]).unwrap();
        cron.register("clock", spec, counting(&counter)).unwrap();

        let mut session = Session::new("bot");
        cron.tick_at(&at(30), &mut session);
        cron.tick_at(&at(30), &mut session);
        cron.tick_at(&at(0), &mut session);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_duplicate_name_rejected_first_stays_active() {
        let mut cron = CronScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        cron.register("job", IntervalSpec::every_second(), counting(&first))
            .unwrap();

        let err = cron
            .register("job", IntervalSpec::every_second(), counting(&second))
            .unwrap_err();
        assert_eq!(err, CronError::DuplicateJob("job".into()));
        assert_eq!(cron.len(), 1);

        let mut session = Session::new("bot");
        cron.tick_at(&at(0), &mut session);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove() {
        let mut cron = CronScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        cron.register("job", IntervalSpec::every_second(), counting(&counter))
            .unwrap();
        assert!(cron.remove("job"));
        assert!(!cron.remove("job"));
        assert!(cron.is_empty());

        let mut session = Session::new("bot");
        assert_eq!(cron.tick_at(&at(0), &mut session), 0);
    }

    #[test]
    fn test_failing_job_does_not_block_others() {
        let mut cron = CronScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        cron.schedule("bad", IntervalSpec::every_second(), |_| {
            anyhow::bail!("nope")
        })
        .unwrap();
        cron.schedule("worse", IntervalSpec::every_second(), |_| panic!("oops"))
            .unwrap();
        cron.register("good", IntervalSpec::every_second(), counting(&counter))
            .unwrap();

        let mut session = Session::new("bot");
        assert_eq!(cron.tick_at(&at(5), &mut session), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cron.job_names(), vec!["bad", "worse", "good"]);
    }

    #[test]
    fn test_job_writes_to_session() {
        let mut cron = CronScheduler::new();
        cron.schedule("announce", IntervalSpec::every_second(), |session| {
            session.send_channel_message("room", "tick");
            Ok(())
        })
        .unwrap();

        let mut session = Session::new("bot");
        session.mark_joined("room");
        cron.tick_at(&at(0), &mut session);
        assert_eq!(session.take_outbound(), vec!["PRIVMSG #room :tick\n"]);
    }
}
