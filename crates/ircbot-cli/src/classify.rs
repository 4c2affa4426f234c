use std::io::BufRead;

use ircbot_channel_irc::Classifier;
use serde_json::{Value, json};

/// Read protocol lines from stdin and print one JSON object per line.
pub fn run_classify(nick: &str) -> anyhow::Result<()> {
    let classifier = Classifier::new(nick)?;
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        println!("{}", classify_line(&classifier, line));
    }
    Ok(())
}

fn classify_line(classifier: &Classifier, line: &str) -> Value {
    let event = classifier.classify(line);
    json!({
        "line": line,
        "action": event.as_ref().and_then(|e| e.action_name()),
        "event": event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classified_line() {
        let classifier = Classifier::new("bot").unwrap();
        let out = classify_line(&classifier, ":alice!u@h PRIVMSG #room :hi");
        assert_eq!(out["action"], "channel-message");
        assert_eq!(out["event"]["type"], "channel_message");
        assert_eq!(out["event"]["channel"], "room");
    }

    #[test]
    fn test_unclassified_line() {
        let classifier = Classifier::new("bot").unwrap();
        let out = classify_line(&classifier, ":srv 001 bot :Welcome");
        assert!(out["event"].is_null());
        assert!(out["action"].is_null());
    }
}
