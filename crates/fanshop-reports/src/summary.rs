use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::Calendar;
use crate::period::DateRange;
use fanshop_types::Order;

/// Agent id used for orders nobody claimed
pub const UNASSIGNED_AGENT: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummaryResponse {
    pub count: usize,
    pub rows: Vec<AgentSummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummaryRow {
    pub date: NaiveDate,
    pub agent_id: String,
    pub orders: u64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

/// Daily order totals per sales agent, sorted by date then agent.
pub fn build_agent_summary(
    range: DateRange,
    calendar: &Calendar,
    agent_id: Option<&str>,
    orders: &[Order],
) -> AgentSummaryResponse {
    let mut buckets: BTreeMap<(NaiveDate, &str), AgentSummaryRow> = BTreeMap::new();

    for order in orders.iter().filter(|o| o.status.is_billable()) {
        let agent = order.agent_id.as_deref().unwrap_or(UNASSIGNED_AGENT);
        if agent_id.is_some_and(|wanted| wanted != agent) {
            continue;
        }
        let date = calendar.local_date(order.order_date);
        if !range.contains(date) {
            continue;
        }

        let row = buckets.entry((date, agent)).or_insert_with(|| AgentSummaryRow {
            date,
            agent_id: agent.to_string(),
            orders: 0,
            revenue: 0.0,
            cost: 0.0,
            profit: 0.0,
        });
        row.orders += 1;
        row.revenue += order.revenue;
        row.cost += order.total_cost();
        row.profit = row.revenue - row.cost;
    }

    let rows: Vec<AgentSummaryRow> = buckets.into_values().collect();
    AgentSummaryResponse {
        count: rows.len(),
        rows,
    }
}
