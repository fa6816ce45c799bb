use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOption {
    pub claim_age: u32,
    pub monthly: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitRow {
    pub age: u32,
    pub monthly: f64,
}

impl From<BenefitRow> for ClaimOption {
    fn from(row: BenefitRow) -> Self {
        Self {
            claim_age: row.age,
            monthly: row.monthly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRow {
    pub claim_age: u32,
    pub monthly: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSeries {
    pub ages: Vec<f64>,
    pub balances: Vec<f64>,
}

impl BalanceSeries {
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            ages: Vec::with_capacity(samples),
            balances: Vec::with_capacity(samples),
        }
    }

    pub fn push(&mut self, age: f64, balance: f64) {
        self.ages.push(age);
        self.balances.push(balance);
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    pub fn last_balance(&self) -> Option<f64> {
        self.balances.last().copied()
    }

    pub fn sampled(&self, step_months: usize) -> Self {
        let step = step_months.max(1);
        let mut out = Self::with_capacity(self.len() / step + 1);
        for (age, balance) in self
            .ages
            .iter()
            .zip(self.balances.iter())
            .step_by(step)
        {
            out.push(*age, *balance);
        }
        out
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BenefitFormula {
    MultiplierTable,
    FlatGrowth { annual_rate: f64 },
}

pub const DEFAULT_FLAT_GROWTH_RATE: f64 = 0.08;

impl BenefitFormula {
    pub fn flat_growth() -> Self {
        BenefitFormula::FlatGrowth {
            annual_rate: DEFAULT_FLAT_GROWTH_RATE,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationModel {
    pub include_growth_tax: bool,
    pub taxable_benefit_fraction: f64,
}

pub const FULL_TAXABLE_BENEFIT_FRACTION: f64 = 1.0;
pub const HIGH_INCOME_TAXABLE_BENEFIT_FRACTION: f64 = 0.85;

impl SimulationModel {
    pub const BASELINE: SimulationModel = SimulationModel {
        include_growth_tax: false,
        taxable_benefit_fraction: FULL_TAXABLE_BENEFIT_FRACTION,
    };

    pub const FULL: SimulationModel = SimulationModel {
        include_growth_tax: true,
        taxable_benefit_fraction: HIGH_INCOME_TAXABLE_BENEFIT_FRACTION,
    };
}

impl Default for SimulationModel {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub cola_annual: f64,
    pub interest_annual: f64,
    pub tax_rate: f64,
    pub model: SimulationModel,
}

impl Assumptions {
    pub fn new(cola_annual: f64, interest_annual: f64, tax_rate: f64) -> Self {
        Self {
            cola_annual,
            interest_annual,
            tax_rate,
            model: SimulationModel::default(),
        }
    }

    pub fn with_model(self, model: SimulationModel) -> Self {
        Self { model, ..self }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Crossover {
    pub age: f64,
    pub balance: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub break_even_age: Option<f64>,
    pub best: Option<TotalRow>,
    pub max_gap: Option<f64>,
}
