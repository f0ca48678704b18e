//! Supplier categories and the per-category onboarding form payloads.
//!
//! Form payloads differ by supplier category, so they are modelled as a
//! closed tagged union keyed by `supplierType`. Validation dispatches on the
//! tag instead of probing for fields.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// JSON key carrying the form discriminant.
pub const SUPPLIER_TYPE_KEY: &str = "supplierType";

/// Supplier category, stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierType {
    Contractor,
    Designer,
    Material,
    Basic,
}

impl SupplierType {
    /// Database / wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Contractor => "contractor",
            Self::Designer => "designer",
            Self::Material => "material",
            Self::Basic => "basic",
        }
    }

    /// Parse the database / wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "contractor" => Ok(Self::Contractor),
            "designer" => Ok(Self::Designer),
            "material" => Ok(Self::Material),
            "basic" => Ok(Self::Basic),
            other => Err(CoreError::Validation(format!(
                "Unknown supplier type '{other}'. Must be one of: contractor, designer, material, basic"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Form payloads
// ---------------------------------------------------------------------------

/// Fields every supplier category fills in.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    #[validate(length(min = 1, max = 200, message = "company name is required"))]
    pub company_name: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(min = 6, max = 32))]
    pub contact_phone: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContractorForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub company: CompanyInfo,
    pub license_number: Option<String>,
    #[serde(default)]
    pub service_regions: Vec<String>,
    #[validate(range(min = 1, max = 100_000))]
    pub team_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DesignerForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub company: CompanyInfo,
    #[serde(default)]
    pub disciplines: Vec<String>,
    #[validate(url)]
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MaterialForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub company: CompanyInfo,
    #[validate(length(min = 1, message = "at least one product category is required"))]
    #[serde(default)]
    pub product_categories: Vec<String>,
    #[validate(range(max = 365))]
    pub lead_time_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BasicForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub company: CompanyInfo,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Onboarding form payload, discriminated by `supplierType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "supplierType", rename_all = "lowercase")]
pub enum SupplierForm {
    Contractor(ContractorForm),
    Designer(DesignerForm),
    Material(MaterialForm),
    Basic(BasicForm),
}

impl SupplierForm {
    pub fn supplier_type(&self) -> SupplierType {
        match self {
            Self::Contractor(_) => SupplierType::Contractor,
            Self::Designer(_) => SupplierType::Designer,
            Self::Material(_) => SupplierType::Material,
            Self::Basic(_) => SupplierType::Basic,
        }
    }

    pub fn company(&self) -> &CompanyInfo {
        match self {
            Self::Contractor(f) => &f.company,
            Self::Designer(f) => &f.company,
            Self::Material(f) => &f.company,
            Self::Basic(f) => &f.company,
        }
    }

    /// Run the variant's field rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        let result = match self {
            Self::Contractor(f) => f.validate(),
            Self::Designer(f) => f.validate(),
            Self::Material(f) => f.validate(),
            Self::Basic(f) => f.validate(),
        };
        result.map_err(|errors| {
            CoreError::Validation(format!(
                "Invalid {} form: {errors}",
                self.supplier_type().name()
            ))
        })
    }

    /// Parse and validate a raw JSON payload.
    pub fn parse(value: &serde_json::Value) -> Result<Self, CoreError> {
        let form: Self = serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Malformed supplier form: {e}")))?;
        form.validate()?;
        Ok(form)
    }
}
