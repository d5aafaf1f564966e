//! Annual equity cash flows of a plant for a given commodity price.
//!
//! Period 0 is the analysis start year. Construction occupies the first
//! `ceil(installation months / 12)` periods, followed by the operating life.
//! Everything except sales, sales-proportional fees and income taxes is
//! independent of the price and computed once in [`CashFlowModel::new`].

use serde::{Deserialize, Serialize};
use strum::Display;

use super::{BreakevenProblem, DebtType, SolverError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum LineCategory {
    Revenue,
    Coproduct,
    Capital,
    #[strum(to_string = "Fixed cost")]
    FixedCost,
    Feedstock,
    Financing,
    Taxes,
    Other,
}

/// One named row of the cash-flow table. Inflows to equity are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub name: String,
    pub category: LineCategory,
    pub values: Vec<f64>,
}

impl LedgerLine {
    fn new(name: impl Into<String>, category: LineCategory, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            category,
            values,
        }
    }

    fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Present value at the given discount factors.
    pub fn present_value(&self, discount: &[f64]) -> f64 {
        self.values.iter().zip(discount).map(|(v, d)| v * d).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowTable {
    pub years: Vec<i32>,
    pub units_sold: Vec<f64>,
    pub lines: Vec<LedgerLine>,
    pub equity_cash_flow: Vec<f64>,
}

impl CashFlowTable {
    pub fn net_present_value(&self, rate: f64) -> f64 {
        npv(&self.equity_cash_flow, rate)
    }

    pub fn cumulative_cash_flow(&self) -> Vec<f64> {
        self.equity_cash_flow
            .iter()
            .scan(0.0, |acc, v| {
                *acc += v;
                Some(*acc)
            })
            .collect()
    }

    pub fn line(&self, name: &str) -> Option<&LedgerLine> {
        self.lines.iter().find(|l| l.name == name)
    }
}

pub(crate) const SALES_LINE: &str = "Commodity sales";

pub(crate) fn npv(flows: &[f64], rate: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(p, v)| v / (1.0 + rate).powi(p as i32))
        .sum()
}

/// Price-independent part of a breakeven problem, ready to be priced.
#[derive(Debug, Clone)]
pub struct CashFlowModel {
    years: Vec<i32>,
    units: Vec<f64>,
    /// Commodity price escalation per period
    price_escalator: Vec<f64>,
    discount: Vec<f64>,
    fixed_lines: Vec<LedgerLine>,
    /// Taxable income excluding commodity sales and sales fees
    taxable_base: Vec<f64>,
    sales_fee_rate: f64,
    income_tax_rate: f64,
    tax_losses_monetized: bool,
    pub(crate) depreciable_capital: f64,
    pub(crate) total_depreciation: f64,
    pub(crate) first_year_opex: f64,
}

impl CashFlowModel {
    pub fn new(problem: &BreakevenProblem) -> Result<Self, SolverError> {
        problem.validate()?;
        let params = &problem.params;

        let construction = params.construction_years();
        let life = params.operating_life as usize;
        let n = construction + life;
        let first_op = construction;
        let last = n - 1;
        let years: Vec<i32> = (0..n)
            .map(|p| params.analysis_start_year + p as i32)
            .collect();

        let escalator =
            |rate: f64| -> Vec<f64> { (0..n).map(|p| (1.0 + rate).powi(p as i32)).collect() };
        let operating = |p: usize| p >= first_op;

        // Construction spending profile; without a construction period
        // everything is spent in period 0.
        let spend_profile: Vec<f64> = (0..n)
            .map(|p| match construction {
                0 if p == 0 => 1.0,
                c if p < c => 1.0 / c as f64,
                _ => 0.0,
            })
            .collect();

        let mut units = vec![0.0; n];
        for p in first_op..n {
            let op_year = p - first_op;
            let utilization = params
                .long_term_utilization
                .value_for(years[p])
                .ok_or_else(|| {
                    SolverError::InvalidParameter("long term utilization is empty".to_string())
                })?;
            units[p] = params.capacity_per_day
                * 365.0
                * utilization
                * ramp_up(params.demand_rampup, op_year);
        }

        let rate = params.leverage_after_tax_nominal_discount_rate;
        let discount = (0..n).map(|p| 1.0 / (1.0 + rate).powi(p as i32)).collect();

        let mut fixed_lines = Vec::new();
        let mut taxable_base = vec![0.0; n];
        let mut depreciation = vec![0.0; n];
        let mut book_value = vec![0.0; n];
        let mut financed_spend = vec![0.0; n];

        // Capital items, refurbishment and their depreciation
        let mut depreciable_capital = 0.0;
        for item in &problem.capital_items {
            let schedule = item.depreciation.schedule(item.depreciation_period)?;
            let mut spend = vec![0.0; n];
            for p in 0..n {
                spend[p] += item.cost * spend_profile[p];
                financed_spend[p] += item.cost * spend_profile[p];
            }
            place_in_service(&mut depreciation, &schedule, item.cost, first_op);
            for p in first_op..n {
                let refurb = item.cost * item.refurbishment_at(p - first_op);
                if refurb != 0.0 {
                    spend[p] += refurb;
                    place_in_service(&mut depreciation, &schedule, refurb, p);
                }
            }
            accumulate(&mut book_value, &spend);
            depreciable_capital += item.cost;
            fixed_lines.push(LedgerLine::new(
                item.name.clone(),
                LineCategory::Capital,
                spend.iter().map(|s| -s).collect(),
            ));
        }

        let installation = &params.installation_cost;
        if installation.value != 0.0 {
            let spend: Vec<f64> = spend_profile.iter().map(|f| installation.value * f).collect();
            for p in 0..n {
                financed_spend[p] += spend[p];
            }
            if installation.depreciable {
                let schedule = installation
                    .depreciation
                    .schedule(installation.depreciation_period)?;
                place_in_service(&mut depreciation, &schedule, installation.value, first_op);
                accumulate(&mut book_value, &spend);
                depreciable_capital += installation.value;
            }
            fixed_lines.push(LedgerLine::new(
                "Installation cost",
                LineCategory::Capital,
                spend.iter().map(|s| -s).collect(),
            ));
        }

        // Book value net of depreciation written off to date
        let mut written_off = 0.0;
        for p in 0..n {
            written_off += depreciation[p];
            book_value[p] -= written_off;
        }
        let total_depreciation = written_off;

        // Depreciation past the end of the life is never taken
        for p in 0..n {
            taxable_base[p] -= depreciation[p];
        }

        if params.sell_undepreciated_cap {
            let mut sale = vec![0.0; n];
            sale[last] = book_value[last].max(0.0);
            fixed_lines.push(LedgerLine::new(
                "Sale of undepreciated capital",
                LineCategory::Capital,
                sale,
            ));
        }

        // Land
        if params.non_depr_assets != 0.0 || params.end_of_proj_sale_non_depr_assets != 0.0 {
            let mut land = vec![0.0; n];
            land[0] -= params.non_depr_assets;
            land[last] += params.end_of_proj_sale_non_depr_assets;
            fixed_lines.push(LedgerLine::new(
                "Non-depreciable assets",
                LineCategory::Capital,
                land,
            ));

            let gain = params.end_of_proj_sale_non_depr_assets - params.non_depr_assets;
            let mut gains_tax = vec![0.0; n];
            gains_tax[last] = -params.capital_gains_tax_rate * gain;
            fixed_lines.push(LedgerLine::new(
                "Capital gains taxes",
                LineCategory::Taxes,
                gains_tax,
            ));
        }

        // Operating costs and revenues other than commodity sales
        let mut opex = vec![0.0; n];
        let mut push_operating = |lines: &mut Vec<LedgerLine>,
                                  name: &str,
                                  category: LineCategory,
                                  amounts: Vec<f64>,
                                  is_cost: bool| {
            let sign = if is_cost { -1.0 } else { 1.0 };
            let values: Vec<f64> = amounts.iter().map(|a| sign * a).collect();
            for p in 0..n {
                taxable_base[p] += values[p];
                if is_cost {
                    opex[p] += amounts[p];
                }
            }
            let line = LedgerLine::new(name, category, values);
            if !line.is_zero() {
                lines.push(line);
            }
        };

        for cost in &problem.fixed_costs {
            let esc = escalator(cost.escalation);
            let amounts = (0..n)
                .map(|p| if operating(p) { cost.usage * cost.cost * esc[p] } else { 0.0 })
                .collect();
            push_operating(&mut fixed_lines, &cost.name, LineCategory::FixedCost, amounts, true);
        }

        let escalating = [
            ("Maintenance", params.maintenance, true),
            ("License and permit", params.license_and_permit, true),
            ("Rent", params.rent, true),
            ("Incidental revenue", params.incidental_revenue, false),
        ];
        for (name, value, is_cost) in escalating {
            let esc = escalator(value.escalation);
            let amounts = (0..n)
                .map(|p| if operating(p) { value.value * esc[p] } else { 0.0 })
                .collect();
            let category = if is_cost {
                LineCategory::FixedCost
            } else {
                LineCategory::Other
            };
            push_operating(&mut fixed_lines, name, category, amounts, is_cost);
        }

        let inflation = escalator(params.general_inflation_rate);
        let property_tax = (0..n)
            .map(|p| {
                if operating(p) {
                    params.property_tax_and_insurance * depreciable_capital * inflation[p]
                } else {
                    0.0
                }
            })
            .collect();
        push_operating(
            &mut fixed_lines,
            "Property tax and insurance",
            LineCategory::FixedCost,
            property_tax,
            true,
        );

        for (items, category, is_cost) in [
            (&problem.feedstocks, LineCategory::Feedstock, true),
            (&problem.coproducts, LineCategory::Coproduct, false),
        ] {
            for item in items {
                let esc = escalator(item.escalation);
                let mut amounts = vec![0.0; n];
                for p in first_op..n {
                    amounts[p] = item.usage * units[p] * item.unit_cost(years[p])? * esc[p];
                }
                push_operating(&mut fixed_lines, &item.name, category, amounts, is_cost);
            }
        }

        // Working capital: months of first-year operating expenses held
        // from the first operating period and released at the end
        let first_year_opex = opex.get(first_op).copied().unwrap_or(0.0);
        let working_capital = params.cash_onhand_months / 12.0 * first_year_opex;
        if working_capital != 0.0 {
            let mut values = vec![0.0; n];
            values[first_op] -= working_capital;
            values[last] += working_capital;
            fixed_lines.push(LedgerLine::new(
                "Working capital",
                LineCategory::Other,
                values,
            ));
        }

        // Debt
        let debt_fraction = params.debt_fraction();
        let rate = params.debt_interest_rate;
        let mut balance = 0.0;
        let mut interest = vec![0.0; n];
        let mut principal = vec![0.0; n];
        match params.debt_type {
            DebtType::RevolvingDebt => {
                for p in 0..n {
                    interest[p] = rate * balance;
                    let target = if p == last {
                        0.0
                    } else {
                        debt_fraction * book_value[p].max(0.0)
                    };
                    principal[p] = target - balance;
                    balance = target;
                }
            }
            DebtType::OneTimeLoan => {
                let draws: Vec<f64> = financed_spend.iter().map(|s| debt_fraction * s).collect();
                let amort_start = construction.max(1);
                let loan = draws.iter().sum::<f64>();
                let periods = params.loan_period_if_used as usize;
                let payment = annuity_payment(loan, rate, periods);
                for p in 0..n {
                    interest[p] = rate * balance;
                    let mut flow = draws[p];
                    balance += draws[p];
                    if p >= amort_start && p - amort_start < periods.max(1) {
                        let repaid = if periods == 0 {
                            balance
                        } else {
                            (payment - interest[p]).min(balance)
                        };
                        flow -= repaid;
                        balance -= repaid;
                    }
                    if p == last {
                        flow -= balance;
                        balance = 0.0;
                    }
                    principal[p] = flow;
                }
            }
        }
        for p in 0..n {
            taxable_base[p] -= interest[p];
        }
        fixed_lines.push(LedgerLine::new(
            "Debt interest",
            LineCategory::Financing,
            interest.iter().map(|i| -i).collect(),
        ));
        fixed_lines.push(LedgerLine::new(
            "Debt principal",
            LineCategory::Financing,
            principal,
        ));

        Ok(Self {
            years,
            units,
            price_escalator: escalator(params.commodity.escalation),
            discount,
            fixed_lines,
            taxable_base,
            sales_fee_rate: params.credit_card_fees + params.sales_tax + params.admin_expense,
            income_tax_rate: params.total_income_tax_rate,
            tax_losses_monetized: params.tax_losses_monetized,
            depreciable_capital,
            total_depreciation,
            first_year_opex,
        })
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn discount_factors(&self) -> &[f64] {
        &self.discount
    }

    /// Commodity units sold per period.
    pub fn units(&self) -> &[f64] {
        &self.units
    }

    /// Discounted, escalated units sold: the NPV of one dollar of price.
    pub fn discounted_units(&self) -> f64 {
        self.units
            .iter()
            .zip(&self.price_escalator)
            .zip(&self.discount)
            .map(|((u, e), d)| u * e * d)
            .sum()
    }

    /// Full cash-flow table at `price`.
    pub fn evaluate(&self, price: f64) -> CashFlowTable {
        let n = self.years.len();
        let sales: Vec<f64> = (0..n)
            .map(|p| price * self.price_escalator[p] * self.units[p])
            .collect();
        let fees: Vec<f64> = sales.iter().map(|s| -self.sales_fee_rate * s).collect();

        let mut carried_loss = 0.0;
        let taxes: Vec<f64> = (0..n)
            .map(|p| {
                let taxable = self.taxable_base[p] + sales[p] + fees[p];
                if self.tax_losses_monetized {
                    -self.income_tax_rate * taxable
                } else if taxable < 0.0 {
                    carried_loss -= taxable;
                    0.0
                } else {
                    let used = carried_loss.min(taxable);
                    carried_loss -= used;
                    -self.income_tax_rate * (taxable - used)
                }
            })
            .collect();

        let mut lines = Vec::with_capacity(self.fixed_lines.len() + 3);
        lines.push(LedgerLine::new(SALES_LINE, LineCategory::Revenue, sales));
        lines.extend(self.fixed_lines.iter().cloned());
        if self.sales_fee_rate != 0.0 {
            lines.push(LedgerLine::new(
                "Sales fees and admin",
                LineCategory::Other,
                fees,
            ));
        }
        lines.push(LedgerLine::new("Income taxes", LineCategory::Taxes, taxes));

        let equity_cash_flow = (0..n)
            .map(|p| lines.iter().map(|l| l.values[p]).sum())
            .collect();

        CashFlowTable {
            years: self.years.clone(),
            units_sold: self.units.clone(),
            lines,
            equity_cash_flow,
        }
    }

    /// Sum of the absolute present values of every line at `price`; the
    /// scale against which an NPV residual is judged.
    pub fn magnitude_at(&self, price: f64) -> f64 {
        self.evaluate(price)
            .lines
            .iter()
            .map(|line| line.present_value(&self.discount).abs())
            .sum()
    }

    /// Equity NPV at `price`.
    pub fn npv_at(&self, price: f64) -> f64 {
        let table = self.evaluate(price);
        table
            .equity_cash_flow
            .iter()
            .zip(&self.discount)
            .map(|(v, d)| v * d)
            .sum()
    }
}

/// Share of long-term demand reached in operating year `op_year` (0-based).
fn ramp_up(rampup_years: f64, op_year: usize) -> f64 {
    if rampup_years <= 0.0 {
        1.0
    } else {
        ((op_year + 1) as f64 / rampup_years).min(1.0)
    }
}

fn place_in_service(depreciation: &mut [f64], schedule: &[f64], basis: f64, start: usize) {
    for (offset, fraction) in schedule.iter().enumerate() {
        if let Some(slot) = depreciation.get_mut(start + offset) {
            *slot += basis * fraction;
        }
    }
}

fn accumulate(book_value: &mut [f64], spend: &[f64]) {
    let mut total = 0.0;
    for (slot, s) in book_value.iter_mut().zip(spend) {
        total += s;
        *slot += total;
    }
}

fn annuity_payment(principal: f64, rate: f64, periods: usize) -> f64 {
    if periods == 0 {
        principal
    } else if rate == 0.0 {
        principal / periods as f64
    } else {
        principal * rate / (1.0 - (1.0 + rate).powi(-(periods as i32)))
    }
}
