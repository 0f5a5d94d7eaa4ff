//! Payer plan registry: the fixed, ordered field list each plan's documents are read against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod handlers;

const QLM_FIELDS: &[&str] = &[
    "Patient Name",
    "Date of Birth",
    "Member ID",
    "Policy No",
    "Group Number",
    "Plan Name",
    "Effective Date",
    "Termination Date",
    "Subscriber Name",
    "Relationship to Subscriber",
    "Primary Care Physician",
    "Deductible (Individual)",
    "Deductible (Family)",
    "Out-of-Pocket Maximum",
    "Coinsurance",
    "Office Visit Copay",
    "Specialist Copay",
    "Emergency Room Copay",
    "Prescription Drug Coverage",
    "Claims Address",
];

const MCH_FIELDS: &[&str] = &[
    "Insured Name",
    "Policy No",
    "Certificate Number",
    "Employer",
    "Coverage Type",
    "Coverage Start Date",
    "Coverage End Date",
    "Annual Benefit Limit",
    "Room and Board Limit",
    "Pre-Authorization Required",
    "Network",
    "Copayment",
    "Exclusions",
    "Issuing Office",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown payer plan '{0}'")]
pub struct UnknownPlan(pub String);

/// Selects which document schema applies to an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayerPlan {
    Qlm,
    Mch,
}

impl PayerPlan {
    pub const ALL: [PayerPlan; 2] = [PayerPlan::Qlm, PayerPlan::Mch];

    pub fn id(self) -> &'static str {
        match self {
            PayerPlan::Qlm => "QLM",
            PayerPlan::Mch => "MCH",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PayerPlan::Qlm => "QLM member benefits summary",
            PayerPlan::Mch => "MCH group policy certificate",
        }
    }

    /// Ordered field names. The order is the canonical order of records and diffs.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            PayerPlan::Qlm => QLM_FIELDS,
            PayerPlan::Mch => MCH_FIELDS,
        }
    }
}

impl fmt::Display for PayerPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PayerPlan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PayerPlan::ALL
            .into_iter()
            .find(|plan| plan.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPlan(wanted.to_string()))
    }
}

/// Public description of a plan, as listed by the plans endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PlanDescriptor {
    pub id: PayerPlan,
    pub display_name: &'static str,
    pub fields: &'static [&'static str],
}

impl From<PayerPlan> for PlanDescriptor {
    fn from(plan: PayerPlan) -> Self {
        Self {
            id: plan,
            display_name: plan.display_name(),
            fields: plan.fields(),
        }
    }
}
