//! Render a query plan as readable text for logging.
//!
//! This is purely cosmetic: nothing here feeds back into execution.

use std::fmt::Write;

use super::plan::QueryPlan;
use super::string::Param;

/// Render the parameter bindings followed by the command text.
///
/// Each parameter is shown as a `SET <placeholder> = <value>;` line so the
/// output can be pasted into a console session.
pub fn render(plan: &QueryPlan, pretty: bool) -> String {
    let mut out = String::new();

    for (index, param) in plan.params().iter().enumerate() {
        let Param::Value(value) = param;
        // writing into a String cannot fail
        let _ = writeln!(out, "SET {} = {};", plan.sql.placeholder(index), value);
    }
    if !plan.params().is_empty() {
        out.push('\n');
    }

    if pretty {
        out.push_str(&sqlformat::format(
            plan.text(),
            &sqlformat::QueryParams::None,
            sqlformat::FormatOptions::default(),
        ));
    } else {
        out.push_str(plan.text());
    }
    out
}
