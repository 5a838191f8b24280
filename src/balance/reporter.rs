//! Balance report formatting

use crate::types::{BalanceMessage, BalanceReport, Delivery, ReportOutcome, SideTotal};
use crate::utils::{percentage, round_half_up};

/// Turns two side totals into the chat message for a rule
pub struct BalanceReporter;

impl BalanceReporter {
    /// Format the report for `name`
    ///
    /// An unknown side always wins and is only told to the requester. Two
    /// zero totals are reported as unknown balance. Otherwise both
    /// percentages are rounded half-up independently and may not add up
    /// to 100. The combined hours always close the first line; `show_total`
    /// repeats them on a line of their own.
    pub fn report(
        team_one: SideTotal,
        team_two: SideTotal,
        name: &str,
        show_total: bool,
    ) -> BalanceMessage {
        let (a, b) = match (team_one, team_two) {
            (SideTotal::Known(a), SideTotal::Known(b)) => (a, b),
            _ => {
                return BalanceMessage {
                    delivery: Delivery::Requester,
                    outcome: ReportOutcome::Unavailable,
                    text: format!("Balance for {} is unavailable, calculation failed", name),
                }
            }
        };

        let sum = a + b;
        if sum == 0.0 {
            return BalanceMessage {
                delivery: Delivery::Broadcast,
                outcome: ReportOutcome::Unknown,
                text: format!("Balance for {} is unknown", name),
            };
        }

        let mut text = format!(
            "Balance for {}: {}% VS {}%  │  {} VS {} hours ({} total)",
            name,
            percentage(a, sum),
            percentage(b, sum),
            round_half_up(a),
            round_half_up(b),
            round_half_up(sum)
        );
        if show_total {
            text.push_str(&format!("\nTotal {} hours", round_half_up(sum)));
        }

        BalanceMessage {
            delivery: Delivery::Broadcast,
            outcome: ReportOutcome::Balance,
            text,
        }
    }

    /// Format a full [`BalanceReport`]
    pub fn report_for(report: &BalanceReport, show_total: bool) -> BalanceMessage {
        Self::report(report.team_one, report.team_two, &report.name, show_total)
    }
}
