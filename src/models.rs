//! Core data models for the extraction pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    Monthly,
    Annual,
    Unknown,
}

/// Currency of an amount.
///
/// `Unknown` is what [`Currency::from_marker`] reports for a token that is
/// neither a local nor a foreign marker. The resolver never lets it reach a
/// `ResolvedAmount`: an amount without a foreign marker is taken as local.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Local,
    Foreign,
    Unknown,
}

/// The six tax-relevant categories, in record field order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    EmploymentIncome,
    InvestmentIncome,
    BusinessIncome,
    RentalIncome,
    SolarLoanPayments,
    OtherQualifyingPayments,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::EmploymentIncome,
        Category::InvestmentIncome,
        Category::BusinessIncome,
        Category::RentalIncome,
        Category::SolarLoanPayments,
        Category::OtherQualifyingPayments,
    ];

    /// Field name used in the output record
    pub fn field_name(&self) -> &'static str {
        match self {
            Category::EmploymentIncome => "employment_income",
            Category::InvestmentIncome => "investment_income",
            Category::BusinessIncome => "business_income",
            Category::RentalIncome => "rental_income",
            Category::SolarLoanPayments => "solar_loan_payments",
            Category::OtherQualifyingPayments => "other_qualifying_payments",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.field_name() == name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    ForeignCurrency,
    NoCategoryCue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "value")]
pub enum Classification {
    Category(Category),
    Discard(DiscardReason),
}

//
// ================= Pipeline values =================
//

/// A clause of the input that carries a candidate monetary figure.
///
/// `cues` holds the normalised words of the clause itself; `context` holds
/// the normalised words of numeral-free clauses adjacent to it in the same
/// sentence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mention {
    pub span: Range<usize>,
    pub text: String,
    pub numeral: String,
    pub scale: Option<String>,
    pub period: Option<String>,
    pub currency: Option<String>,
    pub cues: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResolvedAmount {
    pub value: f64,
    pub period: Period,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedAmount {
    pub amount: ResolvedAmount,
    pub classification: Classification,
}

impl ClassifiedAmount {
    pub fn category(&self) -> Option<Category> {
        match self.classification {
            Classification::Category(c) => Some(c),
            Classification::Discard(_) => None,
        }
    }
}

//
// ================= Output record =================
//

/// Annual LKR figures per category. Every field is always present and >= 0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TaxIncomeRecord {
    #[serde(default)]
    pub employment_income: f64,
    #[serde(default)]
    pub investment_income: f64,
    #[serde(default)]
    pub business_income: f64,
    #[serde(default)]
    pub rental_income: f64,
    #[serde(default)]
    pub solar_loan_payments: f64,
    #[serde(default)]
    pub other_qualifying_payments: f64,
}

impl TaxIncomeRecord {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::EmploymentIncome => self.employment_income,
            Category::InvestmentIncome => self.investment_income,
            Category::BusinessIncome => self.business_income,
            Category::RentalIncome => self.rental_income,
            Category::SolarLoanPayments => self.solar_loan_payments,
            Category::OtherQualifyingPayments => self.other_qualifying_payments,
        }
    }

    fn slot(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::EmploymentIncome => &mut self.employment_income,
            Category::InvestmentIncome => &mut self.investment_income,
            Category::BusinessIncome => &mut self.business_income,
            Category::RentalIncome => &mut self.rental_income,
            Category::SolarLoanPayments => &mut self.solar_loan_payments,
            Category::OtherQualifyingPayments => &mut self.other_qualifying_payments,
        }
    }

    /// Add to a category; negative or non-finite input is ignored
    pub fn add(&mut self, category: Category, value: f64) {
        if value.is_finite() && value > 0.0 {
            *self.slot(category) += value;
        }
    }

    /// Overwrite a category, clamping to zero
    pub fn set(&mut self, category: Category, value: f64) {
        *self.slot(category) = if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        };
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0.0)
    }
}

impl fmt::Display for TaxIncomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (category, value) in self.iter() {
            writeln!(f, "{:<27} {:>16.2}", category.field_name(), value)?;
        }
        Ok(())
    }
}

//
// ================= Report =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub extraction_id: Uuid,
    pub input_digest: String,
    pub record: TaxIncomeRecord,
    pub classified: Vec<ClassifiedAmount>,
    pub dropped_mentions: usize,
    pub created_at: DateTime<Utc>,
}

impl ExtractionReport {
    pub fn discarded(&self) -> impl Iterator<Item = &ClassifiedAmount> {
        self.classified.iter().filter(|c| c.category().is_none())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Monthly => "monthly",
            Period::Annual => "annual",
            Period::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}
