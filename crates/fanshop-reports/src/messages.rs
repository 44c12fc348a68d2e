use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::calendar::Calendar;
use crate::period::DateRange;
use fanshop_types::{ChatMessage, MessageDirection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatsResponse {
    pub count: usize,
    pub rows: Vec<MessageStatsRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatsRow {
    pub date: NaiveDate,
    /// `None` collects messages without attribution
    pub ad_group_id: Option<String>,
    pub inbound: u64,
    pub outbound: u64,
    pub unique_senders: usize,
}

#[derive(Default)]
struct Bucket<'a> {
    inbound: u64,
    outbound: u64,
    /// PSIDs are only unique within a fanpage
    senders: HashSet<(&'a str, &'a str)>,
}

/// Message volume per day and ad group, days ascending.
pub fn build_message_stats(
    range: DateRange,
    calendar: &Calendar,
    messages: &[ChatMessage],
) -> MessageStatsResponse {
    let mut buckets: BTreeMap<(NaiveDate, Option<&str>), Bucket<'_>> = BTreeMap::new();

    for message in messages {
        let date = calendar.local_date(message.received_at);
        if !range.contains(date) {
            continue;
        }
        let bucket = buckets
            .entry((date, message.ad_group_id.as_deref()))
            .or_default();
        match message.direction {
            MessageDirection::In => bucket.inbound += 1,
            MessageDirection::Out => bucket.outbound += 1,
        }
        bucket
            .senders
            .insert((message.fanpage_id.as_str(), message.sender_psid.as_str()));
    }

    let rows: Vec<MessageStatsRow> = buckets
        .into_iter()
        .map(|((date, ad_group_id), bucket)| MessageStatsRow {
            date,
            ad_group_id: ad_group_id.map(str::to_string),
            inbound: bucket.inbound,
            outbound: bucket.outbound,
            unique_senders: bucket.senders.len(),
        })
        .collect();

    MessageStatsResponse {
        count: rows.len(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(psid: &str, direction: MessageDirection, group: Option<&str>, day: u32) -> ChatMessage {
        ChatMessage {
            id: format!("{}-{}", psid, day),
            fanpage_id: "fp1".to_string(),
            sender_psid: psid.to_string(),
            direction,
            content: "xin chào".to_string(),
            ad_group_id: group.map(str::to_string),
            awaiting_human: false,
            provider_message_id: None,
            received_at: Utc.with_ymd_and_hms(2026, 10, day, 2, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_counts_per_day_and_group() {
        let messages = vec![
            message("u1", MessageDirection::In, Some("g1"), 10),
            message("u1", MessageDirection::In, Some("g1"), 10),
            message("u1", MessageDirection::Out, Some("g1"), 10),
            message("u2", MessageDirection::In, Some("g1"), 10),
            message("u3", MessageDirection::In, None, 10),
            message("u1", MessageDirection::In, Some("g1"), 11),
            message("u9", MessageDirection::In, Some("g1"), 20),
        ];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 10, 10).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 11).unwrap(),
        )
        .unwrap();

        let stats = build_message_stats(range, &Calendar::default(), &messages);

        assert_eq!(stats.count, 3);
        assert_eq!(stats.rows[0].ad_group_id, None);
        assert_eq!(stats.rows[0].unique_senders, 1);

        let g1 = &stats.rows[1];
        assert_eq!(g1.ad_group_id.as_deref(), Some("g1"));
        assert_eq!(g1.inbound, 3);
        assert_eq!(g1.outbound, 1);
        assert_eq!(g1.unique_senders, 2);

        assert_eq!(stats.rows[2].date.to_string(), "2026-10-11");
    }

    #[test]
    fn test_same_psid_on_two_fanpages_counts_twice() {
        let mut other_page = message("u1", MessageDirection::In, Some("g1"), 10);
        other_page.fanpage_id = "fp2".to_string();
        let messages = vec![message("u1", MessageDirection::In, Some("g1"), 10), other_page];
        let day = NaiveDate::from_ymd_opt(2026, 10, 10).unwrap();

        let stats = build_message_stats(
            DateRange::new(day, day).unwrap(),
            &Calendar::default(),
            &messages,
        );

        assert_eq!(stats.count, 1);
        assert_eq!(stats.rows[0].inbound, 2);
        assert_eq!(stats.rows[0].unique_senders, 2);
    }
}
