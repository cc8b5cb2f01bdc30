//! Category Classifier
//!
//! Assigns each annualized amount to one of the six categories:
//! - foreign-currency amounts are always discarded, before any keyword lookup
//! - keywords are whole words unless marked as stems
//! - clause cues are matched first, then context cues
//! - the first category in priority order wins when cues overlap
//! - no matching cue means the amount is discarded rather than guessed

use crate::models::{
    Category, ClassifiedAmount, Classification, Currency, DiscardReason, Mention, ResolvedAmount,
};
use tracing::debug;

/// Static keyword lists, matched as whole words on normalised text.
/// A trailing `*` marks a stem that matches any word starting with it.
const EMPLOYMENT_KEYWORDS: &[&str] = &[
    "job", "jobs", "salary", "salaries", "employment", "employer", "employed", "wage",
    "wages", "payroll",
];

const RENTAL_KEYWORDS: &[&str] = &[
    "rent", "rents", "rented", "renting", "rental", "rentals", "apartment", "apartments",
    "tenant", "tenants", "lease", "leased", "annex", "boarding house",
];

const SOLAR_LOAN_KEYWORDS: &[&str] = &[
    "solar loan", "solar panel loan", "solar panel", "solar",
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "business", "businesses", "shop", "shops", "store", "stores", "trading",
    "freelanc*", "consult*", "sole proprietor",
];

const INVESTMENT_KEYWORDS: &[&str] = &[
    "invest*", "treasury bill", "treasury bills", "t bill", "t bills", "interest",
    "dividend", "dividends", "fixed deposit", "fixed deposits", "bond", "bonds",
    "shares", "stock", "stocks", "capital gain", "capital gains", "unit trust",
    "unit trusts",
];

const OTHER_QUALIFYING_KEYWORDS: &[&str] = &[
    "qualifying", "relief", "donation", "donations", "donated", "charit*", "education",
    "tuition", "medical", "insurance",
];

/// Priority order: first match wins
const CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (Category::EmploymentIncome, EMPLOYMENT_KEYWORDS),
    (Category::RentalIncome, RENTAL_KEYWORDS),
    (Category::SolarLoanPayments, SOLAR_LOAN_KEYWORDS),
    (Category::BusinessIncome, BUSINESS_KEYWORDS),
    (Category::InvestmentIncome, INVESTMENT_KEYWORDS),
    (Category::OtherQualifyingPayments, OTHER_QUALIFYING_KEYWORDS),
];

/// Category classifier
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryClassifier;

impl CategoryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Tag an annualized amount with a category or a discard reason
    pub fn classify(&self, amount: ResolvedAmount, mention: &Mention) -> ClassifiedAmount {
        let classification = if amount.currency == Currency::Foreign {
            Classification::Discard(DiscardReason::ForeignCurrency)
        } else {
            match_category(&mention.cues)
                .or_else(|| match_category(&mention.context))
                .map(Classification::Category)
                .unwrap_or(Classification::Discard(DiscardReason::NoCategoryCue))
        };

        debug!(?classification, value = amount.value, "Amount classified");

        ClassifiedAmount {
            amount,
            classification,
        }
    }
}

/// First category whose keywords appear in the normalised cue text
pub fn match_category(cues: &str) -> Option<Category> {
    if cues.is_empty() {
        return None;
    }
    let padded = format!(" {} ", cues);

    CATEGORY_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| keyword_matches(&padded, kw)))
        .map(|(category, _)| *category)
}

/// `padded` is the cue text with one space on each side
fn keyword_matches(padded: &str, keyword: &str) -> bool {
    match keyword.strip_suffix('*') {
        Some(stem) => padded.contains(&format!(" {}", stem)),
        None => padded.contains(&format!(" {} ", keyword)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;

    fn mention(cues: &str, context: &str) -> Mention {
        Mention {
            span: 0..0,
            text: cues.to_string(),
            numeral: "1".to_string(),
            scale: None,
            period: None,
            currency: None,
            cues: cues.to_string(),
            context: context.to_string(),
        }
    }

    fn amount(currency: Currency) -> ResolvedAmount {
        ResolvedAmount {
            value: 100_000.0,
            period: Period::Annual,
            currency,
        }
    }

    #[test]
    fn test_keyword_categories() {
        let cases = vec![
            ("i earn 150 000 rupees per month from my job", Category::EmploymentIncome),
            ("rent brings me 40 thousand per month", Category::RentalIncome),
            ("receive rs 30 000 per month from an apartment i rent", Category::RentalIncome),
            ("paid 1 5 lakhs on a solar panel loan this year", Category::SolarLoanPayments),
            ("get 0 4 million from my shop", Category::BusinessIncome),
            ("my investments bring in another 50 000", Category::InvestmentIncome),
            ("i paid 100 000 as other qualifying payments", Category::OtherQualifyingPayments),
            ("spent 10 000 on qualifying education", Category::OtherQualifyingPayments),
        ];

        let classifier = CategoryClassifier::new();
        for (cues, expected) in cases {
            let out = classifier.classify(amount(Currency::Local), &mention(cues, ""));
            assert_eq!(out.category(), Some(expected), "{}", cues);
        }
    }

    #[test]
    fn test_priority_order_breaks_ties() {
        // employment outranks rental, rental outranks business
        assert_eq!(match_category("salary and rent"), Some(Category::EmploymentIncome));
        assert_eq!(match_category("rent from my shop"), Some(Category::RentalIncome));
        assert_eq!(match_category("solar loan interest"), Some(Category::SolarLoanPayments));
    }

    #[test]
    fn test_keywords_match_word_starts_only() {
        assert_eq!(match_category("my current account"), None);
        assert_eq!(match_category("a rental unit"), Some(Category::RentalIncome));
    }

    #[test]
    fn test_keywords_match_whole_words() {
        assert_eq!(match_category("i spent 20 000 on shopping"), None);
        assert_eq!(match_category("paid for storage"), None);
        assert_eq!(match_category("bought stockings"), None);
        assert_eq!(match_category("a bonding session"), None);
        assert_eq!(match_category("my shop"), Some(Category::BusinessIncome));
    }

    #[test]
    fn test_stems_match_word_prefixes() {
        assert_eq!(match_category("from investments"), Some(Category::InvestmentIncome));
        assert_eq!(match_category("freelancing gigs"), Some(Category::BusinessIncome));
        assert_eq!(match_category("consultancy fees"), Some(Category::BusinessIncome));
        assert_eq!(match_category("a charitable gift"), Some(Category::OtherQualifyingPayments));
        assert_eq!(match_category("treasury bills"), Some(Category::InvestmentIncome));
    }

    #[test]
    fn test_foreign_is_discarded_before_matching() {
        let classifier = CategoryClassifier::new();
        let out = classifier.classify(amount(Currency::Foreign), &mention("my job abroad", ""));
        assert_eq!(
            out.classification,
            Classification::Discard(DiscardReason::ForeignCurrency)
        );
    }

    #[test]
    fn test_context_used_when_clause_has_no_cue() {
        let classifier = CategoryClassifier::new();
        let out = classifier.classify(
            amount(Currency::Local),
            &mention("got around 25 thousand for the year", "i invested in treasury bills"),
        );
        assert_eq!(out.category(), Some(Category::InvestmentIncome));
    }

    #[test]
    fn test_no_cue_is_discarded() {
        let classifier = CategoryClassifier::new();
        let out = classifier.classify(amount(Currency::Local), &mention("i got 5 000", ""));
        assert_eq!(
            out.classification,
            Classification::Discard(DiscardReason::NoCategoryCue)
        );
        assert_eq!(out.category(), None);
    }
}
