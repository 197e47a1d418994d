//! Fuzz target: `BrokerCommand::parse`
//!
//! The first byte picks the topic, the rest is the payload.  Parsing must
//! never panic, and a status must always fit the stored slot.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use fieldnode::app::commands::BrokerCommand;
use fieldnode::app::ports::BrokerMessage;
use fieldnode::config::SystemConfig;
use fieldnode::store::record::STATUS_LEN;
use libfuzzer_sys::fuzz_target;

const TOPICS: [&str; 3] = ["ESP32/cmd", "ESP32/reset", "ESP32/other"];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let topic = TOPICS[usize::from(selector) % TOPICS.len()];
    let cfg = SystemConfig::default();

    if let Some(BrokerCommand::SetStatus(status)) =
        BrokerCommand::parse(&BrokerMessage::new(topic, payload), &cfg)
    {
        assert!(status.len() <= STATUS_LEN);
    }
});
