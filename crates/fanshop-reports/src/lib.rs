pub mod calendar;
pub mod error;
pub mod messages;
pub mod period;
pub mod profit;
pub mod summary;

pub use calendar::Calendar;
pub use error::{ReportError, Result};
pub use messages::{build_message_stats, MessageStatsResponse, MessageStatsRow};
pub use period::{parse_date, period_range, resolve_range, DateRange, ReportPeriod};
pub use profit::{
    build_profit_report, growth_rate, AdGroupProfitData, AdGroupProfitReportResponse, DailyProfit,
    ProfitFilter, ProfitInputs, ProfitSummary, ReportWindow,
};
pub use summary::{build_agent_summary, AgentSummaryResponse, AgentSummaryRow};
