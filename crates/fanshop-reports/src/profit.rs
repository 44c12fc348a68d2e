//! Per-ad-group profit report.
//!
//! Orders and ad-spend costs are bucketed by calendar day and ad group.
//! Every returned ad group carries a dense day series covering the whole
//! range, so charts never have to fill gaps themselves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::calendar::Calendar;
use crate::period::DateRange;
use fanshop_types::{AdGroup, Order, OtherCost};

/// Label for ad-group ids that have no AdGroup document
pub const UNKNOWN_AD_GROUP: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfitFilter {
    pub ad_group_id: Option<String>,
    pub product_id: Option<String>,
    pub agent_id: Option<String>,
}

/// Documents the report is computed from. Orders and costs should cover
/// both the requested range and the previous range of equal length.
#[derive(Debug, Clone, Copy)]
pub struct ProfitInputs<'a> {
    pub orders: &'a [Order],
    pub costs: &'a [OtherCost],
    pub ad_groups: &'a [AdGroup],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupProfitReportResponse {
    pub period: ReportWindow,
    pub summary: ProfitSummary,
    pub ad_groups: Vec<AdGroupProfitData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub days: i64,
    pub previous_from_date: NaiveDate,
    pub previous_to_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSummary {
    pub total_profit: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_orders: u64,
    pub total_ad_groups: usize,
    pub avg_profit_per_ad_group: f64,
    pub profit_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupProfitData {
    pub ad_group_id: String,
    pub ad_group_name: String,
    pub product_id: Option<String>,
    pub agent_id: Option<String>,
    pub total_profit: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_orders: u64,
    pub daily_profits: Vec<DailyProfit>,
    pub avg_daily_profit: f64,
    /// Percent change against the previous period; 0 when that period had no profit
    pub profit_growth_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProfit {
    pub date: NaiveDate,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub orders: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct DayTotals {
    revenue: f64,
    cost: f64,
    orders: u64,
}

#[derive(Debug, Default)]
struct GroupBuckets {
    days: BTreeMap<NaiveDate, DayTotals>,
    previous_profit: f64,
    active: bool,
}

/// Percent change from `previous` to `current`, rounded to two decimals.
///
/// A zero previous value reports 0 rather than an infinite change. A negative
/// previous value divides by its magnitude so that improvement stays positive.
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let rate = (current - previous) / previous.abs() * 100.0;
    (rate * 100.0).round() / 100.0
}

pub fn build_profit_report(
    range: DateRange,
    calendar: &Calendar,
    filter: &ProfitFilter,
    inputs: ProfitInputs<'_>,
) -> AdGroupProfitReportResponse {
    let previous = range.previous();
    let mut groups: HashMap<&str, GroupBuckets> = HashMap::new();

    for order in inputs.orders.iter().filter(|o| o.status.is_billable()) {
        let Some(group_id) = order.ad_group_id.as_deref() else {
            continue;
        };
        let date = calendar.local_date(order.order_date);
        if range.contains(date) {
            let bucket = groups.entry(group_id).or_default();
            bucket.active = true;
            let day = bucket.days.entry(date).or_default();
            day.revenue += order.revenue;
            day.cost += order.total_cost();
            day.orders += 1;
        } else if previous.contains(date) {
            groups.entry(group_id).or_default().previous_profit += order.profit();
        }
    }

    for cost in inputs.costs {
        let Some(group_id) = cost.ad_group_id.as_deref() else {
            continue;
        };
        if range.contains(cost.date) {
            let bucket = groups.entry(group_id).or_default();
            bucket.active = true;
            bucket.days.entry(cost.date).or_default().cost += cost.amount;
        } else if previous.contains(cost.date) {
            groups.entry(group_id).or_default().previous_profit -= cost.amount;
        }
    }

    let meta: HashMap<&str, &AdGroup> = inputs
        .ad_groups
        .iter()
        .map(|g| (g.id.as_str(), g))
        .collect();

    let mut rows: Vec<AdGroupProfitData> = groups
        .into_iter()
        .filter(|(_, bucket)| bucket.active)
        .filter(|(id, _)| matches_filter(id, meta.get(id).copied(), filter))
        .map(|(id, bucket)| build_row(id, meta.get(id).copied(), &bucket, &range))
        .collect();

    rows.sort_by(|a, b| {
        b.total_profit
            .total_cmp(&a.total_profit)
            .then_with(|| a.ad_group_id.cmp(&b.ad_group_id))
    });

    let summary = summarize(&rows);
    tracing::debug!(
        ad_groups = rows.len(),
        from = %range.start,
        to = %range.end,
        "Built ad group profit report"
    );

    AdGroupProfitReportResponse {
        period: ReportWindow {
            from_date: range.start,
            to_date: range.end,
            days: range.days(),
            previous_from_date: previous.start,
            previous_to_date: previous.end,
        },
        summary,
        ad_groups: rows,
    }
}

fn matches_filter(id: &str, group: Option<&AdGroup>, filter: &ProfitFilter) -> bool {
    if filter.ad_group_id.as_deref().is_some_and(|wanted| wanted != id) {
        return false;
    }
    let attribute_matches = |wanted: &Option<String>, actual: Option<&String>| match wanted {
        Some(wanted) => actual.is_some_and(|actual| actual == wanted),
        None => true,
    };
    attribute_matches(&filter.product_id, group.and_then(|g| g.product_id.as_ref()))
        && attribute_matches(&filter.agent_id, group.and_then(|g| g.agent_id.as_ref()))
}

fn build_row(
    id: &str,
    group: Option<&AdGroup>,
    bucket: &GroupBuckets,
    range: &DateRange,
) -> AdGroupProfitData {
    let daily_profits: Vec<DailyProfit> = range
        .dates()
        .map(|date| {
            let totals = bucket.days.get(&date).copied().unwrap_or_default();
            DailyProfit {
                date,
                revenue: totals.revenue,
                cost: totals.cost,
                profit: totals.revenue - totals.cost,
                orders: totals.orders,
            }
        })
        .collect();

    let total_revenue: f64 = daily_profits.iter().map(|d| d.revenue).sum();
    let total_cost: f64 = daily_profits.iter().map(|d| d.cost).sum();
    let total_profit: f64 = daily_profits.iter().map(|d| d.profit).sum();
    let total_orders: u64 = daily_profits.iter().map(|d| d.orders).sum();

    AdGroupProfitData {
        ad_group_id: id.to_string(),
        ad_group_name: group
            .map(|g| g.name.clone())
            .unwrap_or_else(|| UNKNOWN_AD_GROUP.to_string()),
        product_id: group.and_then(|g| g.product_id.clone()),
        agent_id: group.and_then(|g| g.agent_id.clone()),
        total_profit,
        total_revenue,
        total_cost,
        total_orders,
        avg_daily_profit: total_profit / range.days() as f64,
        profit_growth_rate: growth_rate(total_profit, bucket.previous_profit),
        daily_profits,
    }
}

fn summarize(rows: &[AdGroupProfitData]) -> ProfitSummary {
    let total_profit: f64 = rows.iter().map(|r| r.total_profit).sum();
    let total_revenue: f64 = rows.iter().map(|r| r.total_revenue).sum();
    let total_cost: f64 = rows.iter().map(|r| r.total_cost).sum();
    let total_orders: u64 = rows.iter().map(|r| r.total_orders).sum();

    ProfitSummary {
        total_profit,
        total_revenue,
        total_cost,
        total_orders,
        total_ad_groups: rows.len(),
        avg_profit_per_ad_group: if rows.is_empty() {
            0.0
        } else {
            total_profit / rows.len() as f64
        },
        profit_margin: if total_revenue == 0.0 {
            0.0
        } else {
            total_profit / total_revenue
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use fanshop_types::{AdGroupStatus, CostCategory, OrderStatus};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(date(start), date(end)).unwrap()
    }

    /// Noon in Hanoi on `day`
    fn at(day: &str) -> DateTime<Utc> {
        let d = date(day);
        Utc.from_utc_datetime(&d.and_hms_opt(5, 0, 0).unwrap())
    }

    fn order(id: &str, group: Option<&str>, day: &str, revenue: f64, cost: f64) -> Order {
        Order {
            id: id.to_string(),
            customer_id: None,
            product_id: "p1".to_string(),
            agent_id: Some("agent-1".to_string()),
            ad_group_id: group.map(str::to_string),
            quantity: 1,
            unit_price: revenue,
            revenue,
            cost,
            shipping_fee: 0.0,
            status: OrderStatus::Completed,
            order_date: at(day),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ad_cost(group: &str, day: &str, amount: f64) -> OtherCost {
        OtherCost {
            id: format!("c-{}-{}", group, day),
            date: date(day),
            amount,
            category: CostCategory::Ads,
            ad_group_id: Some(group.to_string()),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn group(id: &str, name: &str, product: &str, agent: &str) -> AdGroup {
        AdGroup {
            id: id.to_string(),
            name: name.to_string(),
            fanpage_id: None,
            product_id: Some(product.to_string()),
            agent_id: Some(agent.to_string()),
            status: AdGroupStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> (Vec<Order>, Vec<OtherCost>, Vec<AdGroup>) {
        let orders = vec![
            order("o1", Some("g1"), "2026-10-10", 500_000.0, 200_000.0),
            order("o2", Some("g1"), "2026-10-12", 300_000.0, 100_000.0),
            order("o3", Some("g2"), "2026-10-11", 1_000_000.0, 400_000.0),
            order("o4", None, "2026-10-11", 999_000.0, 0.0),
            // previous period for g1: 2026-10-06 .. 2026-10-09
            order("o5", Some("g1"), "2026-10-07", 250_000.0, 50_000.0),
        ];
        let costs = vec![
            ad_cost("g1", "2026-10-10", 100_000.0),
            ad_cost("g2", "2026-10-13", 50_000.0),
        ];
        let groups = vec![
            group("g1", "Áo khoác - lookalike", "p1", "agent-1"),
            group("g2", "Váy - retarget", "p2", "agent-2"),
        ];
        (orders, costs, groups)
    }

    fn report(filter: &ProfitFilter) -> AdGroupProfitReportResponse {
        let (orders, costs, groups) = fixture();
        build_profit_report(
            range("2026-10-10", "2026-10-13"),
            &Calendar::default(),
            filter,
            ProfitInputs {
                orders: &orders,
                costs: &costs,
                ad_groups: &groups,
            },
        )
    }

    #[test]
    fn test_dense_daily_series() {
        let report = report(&ProfitFilter::default());

        assert_eq!(report.period.days, 4);
        for row in &report.ad_groups {
            assert_eq!(row.daily_profits.len(), 4);
            let dates: Vec<NaiveDate> = row.daily_profits.iter().map(|d| d.date).collect();
            let expected: Vec<NaiveDate> = range("2026-10-10", "2026-10-13").dates().collect();
            assert_eq!(dates, expected);
        }

        let g1 = report.ad_groups.iter().find(|r| r.ad_group_id == "g1").unwrap();
        assert_eq!(g1.daily_profits[1], DailyProfit {
            date: date("2026-10-11"),
            ..DailyProfit::default()
        });
    }

    #[test]
    fn test_totals_and_ordering() {
        let report = report(&ProfitFilter::default());

        // g2: 1_000_000 - 400_000 - 50_000; g1: 800_000 - 300_000 - 100_000
        let ids: Vec<&str> = report.ad_groups.iter().map(|r| r.ad_group_id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g1"]);
        assert_eq!(report.ad_groups[0].total_profit, 550_000.0);
        assert_eq!(report.ad_groups[1].total_profit, 400_000.0);
        assert_eq!(report.ad_groups[1].total_orders, 2);
        assert_eq!(report.ad_groups[1].avg_daily_profit, 100_000.0);

        let summary = &report.summary;
        let profit_sum: f64 = report.ad_groups.iter().map(|r| r.total_profit).sum();
        let revenue_sum: f64 = report.ad_groups.iter().map(|r| r.total_revenue).sum();
        assert_eq!(summary.total_profit, profit_sum);
        assert_eq!(summary.total_revenue, revenue_sum);
        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_ad_groups, 2);
        assert_eq!(summary.avg_profit_per_ad_group, 475_000.0);
        assert_eq!(summary.profit_margin, 950_000.0 / 1_800_000.0);
    }

    #[test]
    fn test_growth_rate_against_previous_period() {
        let report = report(&ProfitFilter::default());

        let g1 = report.ad_groups.iter().find(|r| r.ad_group_id == "g1").unwrap();
        // previous profit 200_000, current 400_000
        assert_eq!(g1.profit_growth_rate, 100.0);

        let g2 = report.ad_groups.iter().find(|r| r.ad_group_id == "g2").unwrap();
        assert_eq!(g2.profit_growth_rate, 0.0);
    }

    #[test]
    fn test_growth_rate_rules() {
        assert_eq!(growth_rate(150.0, 100.0), 50.0);
        assert_eq!(growth_rate(50.0, 100.0), -50.0);
        assert_eq!(growth_rate(100.0, 0.0), 0.0);
        assert_eq!(growth_rate(-50.0, -100.0), 50.0);
        assert_eq!(growth_rate(1.0, 3.0), -66.67);
    }

    #[test]
    fn test_filters() {
        let by_agent = report(&ProfitFilter {
            agent_id: Some("agent-2".to_string()),
            ..ProfitFilter::default()
        });
        assert_eq!(by_agent.ad_groups.len(), 1);
        assert_eq!(by_agent.ad_groups[0].ad_group_id, "g2");

        let by_group = report(&ProfitFilter {
            ad_group_id: Some("g1".to_string()),
            ..ProfitFilter::default()
        });
        assert_eq!(by_group.ad_groups.len(), 1);
        assert_eq!(by_group.summary.total_profit, 400_000.0);
    }

    #[test]
    fn test_unknown_group_is_labeled() {
        let orders = vec![order("o1", Some("ghost"), "2026-10-10", 100.0, 40.0)];
        let report = build_profit_report(
            range("2026-10-10", "2026-10-10"),
            &Calendar::default(),
            &ProfitFilter::default(),
            ProfitInputs {
                orders: &orders,
                costs: &[],
                ad_groups: &[],
            },
        );
        assert_eq!(report.ad_groups[0].ad_group_name, UNKNOWN_AD_GROUP);
        assert_eq!(report.ad_groups[0].product_id, None);

        let filtered = build_profit_report(
            range("2026-10-10", "2026-10-10"),
            &Calendar::default(),
            &ProfitFilter {
                product_id: Some("p1".to_string()),
                ..ProfitFilter::default()
            },
            ProfitInputs {
                orders: &orders,
                costs: &[],
                ad_groups: &[],
            },
        );
        assert!(filtered.ad_groups.is_empty());
    }

    #[test]
    fn test_cancelled_orders_are_ignored() {
        let mut cancelled = order("o1", Some("g1"), "2026-10-10", 100.0, 10.0);
        cancelled.status = OrderStatus::Cancelled;
        let report = build_profit_report(
            range("2026-10-10", "2026-10-10"),
            &Calendar::default(),
            &ProfitFilter::default(),
            ProfitInputs {
                orders: &[cancelled],
                costs: &[],
                ad_groups: &[],
            },
        );
        assert!(report.ad_groups.is_empty());
    }

    #[test]
    fn test_empty_report_is_zero_filled() {
        let report = build_profit_report(
            range("2026-10-01", "2026-10-31"),
            &Calendar::default(),
            &ProfitFilter::default(),
            ProfitInputs {
                orders: &[],
                costs: &[],
                ad_groups: &[],
            },
        );
        assert!(report.ad_groups.is_empty());
        assert_eq!(report.summary, ProfitSummary::default());
        assert_eq!(report.period.days, 31);
    }

    #[test]
    fn test_report_is_repeatable() {
        let first = report(&ProfitFilter::default());
        let second = report(&ProfitFilter::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(report(&ProfitFilter::default())).unwrap();
        assert!(json["summary"]["profitMargin"].is_number());
        assert_eq!(json["adGroups"][0]["dailyProfits"][0]["date"], "2026-10-10");
        assert_eq!(json["period"]["fromDate"], "2026-10-10");
    }
}
