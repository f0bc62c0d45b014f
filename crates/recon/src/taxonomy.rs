use std::collections::HashMap;

use serde::Serialize;

use crate::error::ReconError;

/// Name reported for the embedded catalog.
pub const BUILTIN_NAME: &str = "transaction-evaluations";

/// Embedded catalog of transaction-evaluation labels, in output row order.
pub const BUILTIN_LABELS: &[&str] = &[
    "{INCOME_CHILD_BENEFIT}", "{INCOME_NET}", "{INCOME_OTHER}", "{INCOME_PENSION}",
    "{INCOME_RENT}", "{INCOME_SUPPORT}", "{EXPENSE_CAR_INSURANCE}",
    "{EXPENSE_CONSTRUCTION_LOAN}", "{EXPENSE_HOUSE_SAVING}", "{EXPENSE_INSURANCE}",
    "{EXPENSE_INSURANCE_BU}", "{EXPENSE_INSURANCE_BUNDLE}", "{EXPENSE_INSURANCE_BUSINESS}",
    "{EXPENSE_INSURANCE_HAFTPFLICHT}", "{EXPENSE_INSURANCE_HAUSRAT}",
    "{EXPENSE_INSURANCE_HEALTH}", "{EXPENSE_INSURANCE_HEALTH_ADD}", "{EXPENSE_INSURANCE_LIFE}",
    "{EXPENSE_INSURANCE_RECHT}", "{EXPENSE_INSURANCE_RENTE}", "{EXPENSE_INSURANCE_UNFALL}",
    "{EXPENSE_INSURANCE_WOHNGEBAEUDE}", "{EXPENSE_LEASING}", "{EXPENSE_LOAN}",
    "{EXPENSE_LOAN_INTEREST}", "{EXPENSE_MICRO_LOAN}", "{EXPENSE_NON_LOAN_FINANCING}",
    "{EXPENSE_OTHER}", "{EXPENSE_OTHER_CHARGEBACK}", "{EXPENSE_PHONE}", "{EXPENSE_PROPERTY}",
    "{EXPENSE_PROPERTY_TAX}", "{EXPENSE_RENT}", "{EXPENSE_RENT_ADDITIONAL}",
    "{EXPENSE_SUPPORT}", "{CREDIT_BANK_MESSAGE}", "{CREDIT_CARRYOVER}", "{CREDIT_CASHDEPOSIT}",
    "{CREDIT_CHARGEBACK}", "{CREDIT_CHARGEBACK_CREDITCARD}", "{CREDIT_CHARGEBACK_INDIRECT}",
    "{CREDIT_CHARGEBACK_LOAN}", "{CREDIT_CHARGEBACK_OBJECTION}",
    "{CREDIT_CHARGEBACK_OBJECTION_CREDITCARD}", "{CREDIT_CHARGEBACK_OBJECTION_LOAN}",
    "{CREDIT_CHARGEBACK_OBJECTION_RENT}", "{CREDIT_CHARGEBACK_RENT}", "{CREDIT_CRYPTO}",
    "{CREDIT_DEPOSIT}", "{CREDIT_ECASH}", "{CREDIT_GAMBLING}", "{CREDIT_GAMBLING_LOTTO}",
    "{CREDIT_HEALTH_SUPPORT}", "{CREDIT_HOUSING_SUPPORT}", "{CREDIT_IDENT}",
    "{CREDIT_INKASSO}", "{CREDIT_INKASSO_MESSAGE}", "{CREDIT_INSURANCE}", "{CREDIT_INVOICE}",
    "{CREDIT_LEGAL}", "{CREDIT_LOAN}", "{CREDIT_MICRO_LOAN}", "{CREDIT_PARENTAL_SUPPORT}",
    "{CREDIT_PRIVATE_DRAWING}", "{CREDIT_PUBLIC_SECTOR}", "{CREDIT_REFUND}",
    "{CREDIT_RENT_ADDITIONAL}", "{CREDIT_SHOPPING}", "{CREDIT_STOCKTRADING}",
    "{CREDIT_TERMINAL}", "{CREDIT_UNEMPLOYMENT_SUPPORT}", "{CREDIT_VAT}", "{DEBIT_ATM}",
    "{DEBIT_CAR}", "{DEBIT_CAR_TAX}", "{DEBIT_CARRYOVER}", "{DEBIT_CHAMBER}",
    "{DEBIT_CHARGEBACK_FEE}", "{DEBIT_CREDITCARD}", "{DEBIT_CRYPTO}", "{DEBIT_CULTURE}",
    "{DEBIT_DEBITCARD}", "{DEBIT_DEPOSIT}", "{DEBIT_DIGITAL_SUBSCRIPTION}", "{DEBIT_DISPO}",
    "{DEBIT_DONATION}", "{DEBIT_ECASH}", "{DEBIT_EDUCATION}", "{DEBIT_EMPLOYEE_SALARY}",
    "{DEBIT_ENTERTAIN}", "{DEBIT_FEE}", "{DEBIT_FOOD_DRINK}", "{DEBIT_GAMBLING}",
    "{DEBIT_GAMBLING_LOTTO}", "{DEBIT_HEALTH}", "{DEBIT_INKASSO}", "{DEBIT_LEGAL}",
    "{DEBIT_LOAN_REPAY}", "{DEBIT_MEMBERSHIP_FEE}", "{DEBIT_OTHER_STANDING_ORDER}",
    "{DEBIT_PUBLIC_SECTOR}", "{DEBIT_RESTAURANT}", "{DEBIT_SAVING}", "{DEBIT_SCHUFA}",
    "{DEBIT_SEIZURE}", "{DEBIT_SHOPPING}", "{DEBIT_STOCKTRADING}", "{DEBIT_TAX_BUSINESS}",
    "{DEBIT_TAX_INCOME}", "{DEBIT_TAX_VAT}", "{DEBIT_TRANSPORT}", "{DEBIT_TRAVEL}",
    "{DEBIT_VIDEOGAMES}", "{INFO_BANKINFORMATION}", "{INFO_DENIED_TRANSACTIONS}",
    "{INFO_OTHER}", "{INFO_RESERVATION}",
];

/// Ordered, immutable set of canonical labels.
///
/// The order defines output row order; membership defines which raw records
/// are matched.
#[derive(Debug, Clone, Serialize)]
pub struct Taxonomy {
    name: String,
    labels: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build a taxonomy, rejecting empty lists, blank labels and duplicates.
    pub fn new(name: impl Into<String>, labels: Vec<String>) -> Result<Self, ReconError> {
        if labels.is_empty() {
            return Err(ReconError::ConfigValidation("taxonomy has no labels".into()));
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "label #{} is blank",
                    i + 1
                )));
            }
            if let Some(first) = index.insert(label.clone(), i) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate label '{label}' at positions {} and {}",
                    first + 1,
                    i + 1
                )));
            }
        }

        Ok(Self { name: name.into(), labels, index })
    }

    /// The embedded catalog.
    pub fn builtin() -> Self {
        let labels: Vec<String> = BUILTIN_LABELS.iter().map(|l| l.to_string()).collect();
        let index = labels.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();
        Self { name: BUILTIN_NAME.to_string(), labels, index }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Position in canonical order, `None` for unknown labels.
    pub fn order_index(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// All labels in canonical order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
