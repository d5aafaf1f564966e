//! Finance-stage artifacts: capital expenses, annual cash flow and price
//! breakdown as JSON chart data, plus the full cash-flow table as CSV.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::breakeven::{BreakevenProblem, BreakevenSolution, CashFlowTable};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactOptions {
    pub save_plots: bool,
    pub show_plots: bool,
    pub output_dir: PathBuf,
    pub design_scenario_id: u32,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        Self {
            save_plots: false,
            show_plots: false,
            output_dir: PathBuf::from("./output/"),
            design_scenario_id: 0,
        }
    }
}

impl ArtifactOptions {
    pub fn enabled(&self) -> bool {
        self.save_plots || self.show_plots
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub capital_expense: PathBuf,
    pub cash_flow_chart: PathBuf,
    pub cost_breakdown: PathBuf,
    pub cash_flow_csv: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: &Path, stem: &str, id: u32) -> Self {
        Self {
            capital_expense: output_dir
                .join("figures/capex")
                .join(format!("{}_capital_expense_{}.json", stem, id)),
            cash_flow_chart: output_dir
                .join("figures/annual_cash_flow")
                .join(format!("{}_cash_flow_{}.json", stem, id)),
            cost_breakdown: output_dir
                .join("figures/lcos_breakdown")
                .join(format!("{}_lcos_{}.json", stem, id)),
            cash_flow_csv: output_dir
                .join("data")
                .join(format!("{}_cash_flow_{}.csv", stem, id)),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            self.capital_expense.as_path(),
            self.cash_flow_chart.as_path(),
            self.cost_breakdown.as_path(),
            self.cash_flow_csv.as_path(),
        ]
    }
}

/// Write every artifact of one breakeven solve, creating directories as
/// needed.
pub fn write_finance_artifacts(
    options: &ArtifactOptions,
    stem: &str,
    problem: &BreakevenProblem,
    solution: &BreakevenSolution,
) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::new(&options.output_dir, stem, options.design_scenario_id);
    for path in paths.all() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
    }
    let generated_at = Utc::now().to_rfc3339();

    let total_capex: f64 = problem.capital_items.iter().map(|i| i.cost).sum();
    let items: Vec<_> = problem
        .capital_items
        .iter()
        .map(|item| {
            let share = if total_capex > 0.0 {
                item.cost / total_capex
            } else {
                0.0
            };
            json!({ "name": item.name, "cost": item.cost, "share": share })
        })
        .collect();
    write_json(
        &paths.capital_expense,
        &json!({
            "generated_at": generated_at,
            "commodity": problem.params.commodity.name,
            "total": total_capex,
            "items": items,
        }),
    )?;

    let table = &solution.cash_flow;
    write_json(
        &paths.cash_flow_chart,
        &json!({
            "generated_at": generated_at,
            "years": table.years,
            "equity_cash_flow": table.equity_cash_flow,
            "cumulative_cash_flow": table.cumulative_cash_flow(),
        }),
    )?;

    write_json(
        &paths.cost_breakdown,
        &json!({
            "generated_at": generated_at,
            "price": solution.price(),
            "unit": format!("$/{}", problem.params.commodity.unit),
            "breakdown": solution.price_breakdown,
        }),
    )?;

    fs::write(&paths.cash_flow_csv, cash_flow_csv(table))?;

    if options.show_plots {
        for path in paths.all() {
            info!(path = %path.display(), "artifact written");
        }
    }
    Ok(paths)
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// One row per period: year, units sold, every ledger line, equity and
/// cumulative cash flow.
pub fn cash_flow_csv(table: &CashFlowTable) -> String {
    let header = ["Year", "Units sold"]
        .into_iter()
        .map(str::to_string)
        .chain(table.lines.iter().map(|line| escape(&line.name)))
        .chain(["Equity cash flow".to_string(), "Cumulative cash flow".to_string()])
        .join(",");

    let mut csv = header;
    csv.push('\n');
    let cumulative = table.cumulative_cash_flow();
    for (p, year) in table.years.iter().enumerate() {
        let row = [year.to_string(), table.units_sold[p].to_string()]
            .into_iter()
            .chain(table.lines.iter().map(|line| line.values[p].to_string()))
            .chain([table.equity_cash_flow[p].to_string(), cumulative[p].to_string()])
            .join(",");
        csv.push_str(&row);
        csv.push('\n');
    }
    csv
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakeven::{BreakevenSolver, CapitalItem, CashFlowSolver, FinancialParameters};

    fn solved() -> (BreakevenProblem, BreakevenSolution) {
        let params = FinancialParameters {
            capacity_per_day: 10.0,
            operating_life: 5,
            installation_months: 12,
            ..Default::default()
        };
        let mut problem = BreakevenProblem::new(params);
        problem.add_capital_item(CapitalItem::new("Buildings, Storage, Water Service", 1.0e5));
        let solution = CashFlowSolver::default().solve(&problem).unwrap();
        (problem, solution)
    }

    #[test]
    fn test_paths_carry_scenario_suffix() {
        let paths = ArtifactPaths::new(Path::new("out"), "iron_ore", 7);
        assert_eq!(
            paths.cash_flow_csv,
            Path::new("out/data/iron_ore_cash_flow_7.csv")
        );
        assert!(paths.capital_expense.ends_with("figures/capex/iron_ore_capital_expense_7.json"));
    }

    #[test]
    fn test_csv_layout() {
        let (_, solution) = solved();
        let csv = cash_flow_csv(&solution.cash_flow);
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Year,Units sold,Commodity sales"));
        assert!(header.contains("\"Buildings, Storage, Water Service\""));
        assert_eq!(lines.count(), solution.cash_flow.years.len());
    }

    #[test]
    fn test_write_finance_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let options = ArtifactOptions {
            save_plots: true,
            output_dir: dir.path().to_path_buf(),
            design_scenario_id: 3,
            ..Default::default()
        };
        let (problem, solution) = solved();
        let paths = write_finance_artifacts(&options, "iron_win", &problem, &solution).unwrap();

        for path in paths.all() {
            assert!(path.exists(), "{}", path.display());
        }
        let breakdown: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.cost_breakdown).unwrap()).unwrap();
        assert!(breakdown["price"].as_f64().unwrap() > 0.0);
    }
}
