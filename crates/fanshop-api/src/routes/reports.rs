use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};
use fanshop_reports::period::{FROM_FIELD, TO_FIELD};
use fanshop_reports::{
    build_agent_summary, build_message_stats, build_profit_report, parse_date, resolve_range,
    AdGroupProfitReportResponse, AgentSummaryResponse, DateRange, MessageStatsResponse,
    ProfitFilter, ProfitInputs, ReportPeriod,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReportQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub period: Option<String>,
    pub ad_group_id: Option<String>,
    pub product_id: Option<String>,
    pub agent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummaryQuery {
    pub agent_id: Option<String>,
    #[serde(alias = "fromDate")]
    pub from: Option<String>,
    #[serde(alias = "toDate")]
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatsQuery {
    pub fanpage_id: Option<String>,
    #[serde(alias = "fromDate")]
    pub from: Option<String>,
    #[serde(alias = "toDate")]
    pub to: Option<String>,
}

/// Empty query parameters count as absent
fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn report_range(
    state: &AppState,
    period: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> ApiResult<DateRange> {
    let period = present(period).map(|p| p.parse::<ReportPeriod>()).transpose()?;
    let from = present(from).map(|v| parse_date(FROM_FIELD, &v)).transpose()?;
    let to = present(to).map(|v| parse_date(TO_FIELD, &v)).transpose()?;

    Ok(resolve_range(
        period,
        from,
        to,
        state.calendar.today(),
        state.config.reporting.max_range_days,
    )?)
}

/// Profit per ad group with daily breakdown and growth against the previous period
#[utoipa::path(
    get,
    path = "/ad-group-profit-report",
    params(
        ("fromDate" = Option<String>, Query, description = "YYYY-MM-DD, with period custom or absent"),
        ("toDate" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("period" = Option<String>, Query, description = "week, 10days, 30days, lastMonth, thisMonth or custom"),
        ("adGroupId" = Option<String>, Query, description = "Only this ad group"),
        ("productId" = Option<String>, Query, description = "Only ad groups selling this product"),
        ("agentId" = Option<String>, Query, description = "Only ad groups handled by this agent")
    ),
    responses(
        (status = 200, description = "Profit report"),
        (status = 400, description = "Invalid dates or period")
    ),
    tag = "reports"
)]
pub async fn ad_group_profit_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfitReportQuery>,
) -> ApiResult<Json<AdGroupProfitReportResponse>> {
    let range = report_range(&state, query.period, query.from_date, query.to_date)?;
    let filter = ProfitFilter {
        ad_group_id: present(query.ad_group_id),
        product_id: present(query.product_id),
        agent_id: present(query.agent_id),
    };

    // Growth needs the preceding window too
    let previous = range.previous();
    let (start, _) = state.calendar.utc_bounds(&previous);
    let (_, end) = state.calendar.utc_bounds(&range);

    let orders = state.persist.orders().find_in_range(start, end).await?;
    let costs = state
        .persist
        .other_costs()
        .find_in_range(previous.start, range.end)
        .await?;

    let mut ids: Vec<String> = orders
        .iter()
        .filter_map(|o| o.ad_group_id.clone())
        .chain(costs.iter().filter_map(|c| c.ad_group_id.clone()))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let ad_groups = state.persist.ad_groups().get_many(&ids).await?;

    let report = build_profit_report(
        range,
        &state.calendar,
        &filter,
        ProfitInputs {
            orders: &orders,
            costs: &costs,
            ad_groups: &ad_groups,
        },
    );
    Ok(Json(report))
}

/// Orders, revenue, cost and profit per day and sales agent
#[utoipa::path(
    get,
    path = "/summary2",
    params(
        ("agentId" = Option<String>, Query, description = "Only this agent"),
        ("from" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("to" = Option<String>, Query, description = "YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Rows sorted by date then agent"),
        (status = 400, description = "Invalid dates")
    ),
    tag = "reports"
)]
pub async fn agent_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentSummaryQuery>,
) -> ApiResult<Json<AgentSummaryResponse>> {
    let range = report_range(&state, None, query.from, query.to)?;
    let (start, end) = state.calendar.utc_bounds(&range);
    let orders = state.persist.orders().find_in_range(start, end).await?;

    let agent_id = present(query.agent_id);
    Ok(Json(build_agent_summary(
        range,
        &state.calendar,
        agent_id.as_deref(),
        &orders,
    )))
}

/// Inbound, outbound and unique senders per day and ad group
#[utoipa::path(
    get,
    path = "/message-stats",
    params(
        ("fanpageId" = Option<String>, Query, description = "Only this fanpage"),
        ("from" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("to" = Option<String>, Query, description = "YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Rows with days ascending"),
        (status = 400, description = "Invalid dates")
    ),
    tag = "reports"
)]
pub async fn message_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageStatsQuery>,
) -> ApiResult<Json<MessageStatsResponse>> {
    let range = report_range(&state, None, query.from, query.to)?;
    let (start, end) = state.calendar.utc_bounds(&range);

    let fanpage_id = present(query.fanpage_id);
    let messages = state
        .persist
        .messages()
        .list_in_range(fanpage_id.as_deref(), start, end)
        .await?;

    Ok(Json(build_message_stats(range, &state.calendar, &messages)))
}
