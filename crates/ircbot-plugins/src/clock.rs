//! Announces the local time in every configured channel twice a minute.

use chrono::{DateTime, Local, TimeZone};
use ircbot_cron::{IntervalSpec, TimeField};
use ircbot_engine::{Plugin, Registrar};
use ircbot_types::Session;

pub const NAME: &str = "clock";
pub const JOB_NAME: &str = "clock.time-announcer";

pub struct ClockPlugin {
    channels: Vec<String>,
}

impl ClockPlugin {
    pub fn new(channels: Vec<String>) -> Self {
        Self { channels }
    }

    fn announce(&self, session: &mut Session) -> anyhow::Result<()> {
        let text = announcement(&Local::now());
        for channel in &self.channels {
            // Channels not joined yet are skipped by the session.
            session.send_channel_message(channel, &text);
        }
        Ok(())
    }
}

/// `The time is now: 3:04:05pm on Friday, October 16, 2026 (+02:00)`
pub fn announcement<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "The time is now: {} on {} ({})",
        now.format("%-I:%M:%S%P"),
        now.format("%A, %B %-d, %Y"),
        now.format("%:z"),
    )
}

impl Plugin for ClockPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn register(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
        let interval = IntervalSpec::every_second().with(TimeField::Second, "0,30")?;
        let plugin = ClockPlugin::new(self.channels.clone());
        registrar.schedule(JOB_NAME, interval, move |session| plugin.announce(session))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};
    use ircbot_cron::CronScheduler;
    use ircbot_hooks::HookBus;

    #[test]
    fn test_announcement_format() {
        let now = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 16, 15, 4, 5)
            .unwrap();
        assert_eq!(
            announcement(&now),
            "The time is now: 3:04:05pm on Friday, October 16, 2026 (+02:00)"
        );
    }

    #[test]
    fn test_job_fires_on_half_minutes_in_joined_channels() {
        let mut hooks = HookBus::new();
        let mut cron = CronScheduler::new();
        let plugin = ClockPlugin::new(vec!["#room".into(), "lobby".into()]);
        plugin
            .register(&mut Registrar::new(&mut hooks, &mut cron))
            .unwrap();
        assert_eq!(cron.job_names(), vec![JOB_NAME]);

        let mut session = Session::new("bot");
        session.mark_joined("room");
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        assert_eq!(cron.tick_at(&day.and_hms_opt(12, 0, 15).unwrap(), &mut session), 0);
        assert_eq!(cron.tick_at(&day.and_hms_opt(12, 0, 30).unwrap(), &mut session), 1);

        let sent = session.take_outbound();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("PRIVMSG #room :The time is now: "));
    }

    #[test]
    fn test_registering_twice_fails() {
        let mut hooks = HookBus::new();
        let mut cron = CronScheduler::new();
        let plugin = ClockPlugin::new(Vec::new());
        let mut registrar = Registrar::new(&mut hooks, &mut cron);
        plugin.register(&mut registrar).unwrap();
        assert!(plugin.register(&mut registrar).is_err());
    }
}
