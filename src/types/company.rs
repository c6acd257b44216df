// src/types/company.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient::{self, Fields};
use crate::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: String,
    pub linkedin_url: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub industries: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub specialties: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub employee_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub employee_range: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_year")]
    pub year_founded: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub follower_count: Option<i64>,
    #[serde(default)]
    pub funding: Option<FundingInfo>,
    #[serde(default, deserialize_with = "lenient::lenient_vec")]
    pub locations: Vec<CompanyLocation>,
    #[serde(default, deserialize_with = "lenient::lenient_vec")]
    pub affiliated_companies: Vec<AffiliatedCompany>,
    #[serde(with = "timestamp::micros")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::micros")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FundingInfo {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_round_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_round_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_round_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub number_of_rounds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub crunchbase_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompanyLocation {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub line1: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_headquarters: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AffiliatedCompany {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub industry: Option<String>,
}

impl Company {
    pub fn new(linkedin_url: String) -> Self {
        let now = timestamp::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            linkedin_url,
            name: None,
            tagline: None,
            description: None,
            website: None,
            industries: Vec::new(),
            specialties: Vec::new(),
            employee_count: None,
            employee_range: None,
            year_founded: None,
            follower_count: None,
            funding: None,
            locations: Vec::new(),
            affiliated_companies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a company from a Cassidy workflow payload.
    pub fn from_cassidy(payload: &Value, linkedin_url: String) -> Option<Self> {
        let fields = Fields::from_value(payload)?;
        let mut company = Self::new(linkedin_url);

        company.name = fields.string(&["company_name", "name", "companyName"]);
        company.tagline = fields.string(&["tagline", "slogan"]);
        company.description = fields.string(&["description", "about", "overview"]);
        company.website = fields.string(&["website", "website_url", "company_website"]);
        company.industries = fields.list(&["industries", "industry"]);
        company.specialties = fields.list(&["specialties", "specialities"]);
        company.employee_count = fields.int(&[
            "employee_count",
            "employees_count",
            "staff_count",
            "employees",
        ]);
        company.employee_range =
            fields.string(&["employee_range", "company_size", "staff_count_range"]);
        company.year_founded = fields.year(&["year_founded", "founded", "founded_year"]);
        company.follower_count = fields.int(&["follower_count", "followers", "followers_count"]);
        company.funding = fields
            .object(&["funding_info", "funding", "funding_data"])
            .as_ref()
            .and_then(FundingInfo::from_cassidy);

        let mut locations: Vec<CompanyLocation> = fields
            .objects(&["locations", "addresses", "office_locations"])
            .iter()
            .filter_map(|raw| CompanyLocation::from_cassidy(raw, false))
            .collect();
        if let Some(hq) = fields
            .object(&["hq", "headquarters", "headquarter"])
            .as_ref()
            .and_then(|raw| CompanyLocation::from_cassidy(raw, true))
        {
            if !locations.iter().any(|l| l.is_headquarters) {
                locations.insert(0, hq);
            }
        }
        company.locations = locations;

        company.affiliated_companies = fields
            .objects(&["affiliated_companies", "affiliatedCompanies", "similar_companies"])
            .iter()
            .filter_map(AffiliatedCompany::from_cassidy)
            .collect();

        Some(company)
    }

    pub fn apply_enrichment(&mut self, fresh: Company) {
        let id = std::mem::take(&mut self.id);
        let linkedin_url = std::mem::take(&mut self.linkedin_url);
        let created_at = self.created_at;
        *self = Company {
            id,
            linkedin_url,
            created_at,
            updated_at: timestamp::now(),
            ..fresh
        };
    }

    pub fn headquarters(&self) -> Option<&CompanyLocation> {
        self.locations
            .iter()
            .find(|l| l.is_headquarters)
            .or_else(|| self.locations.first())
    }

    /// Short description used as context for enhanced scoring.
    pub fn summary_text(&self) -> String {
        let mut out = format!("Company: {}\n", self.name.as_deref().unwrap_or("Unknown"));
        if let Some(tagline) = &self.tagline {
            out.push_str(&format!("Tagline: {}\n", tagline));
        }
        if !self.industries.is_empty() {
            out.push_str(&format!("Industries: {}\n", self.industries.join(", ")));
        }
        match (self.employee_count, &self.employee_range) {
            (Some(count), _) => out.push_str(&format!("Employees: {}\n", count)),
            (None, Some(range)) => out.push_str(&format!("Employees: {}\n", range)),
            (None, None) => {}
        }
        if let Some(year) = self.year_founded {
            out.push_str(&format!("Founded: {}\n", year));
        }
        if let Some(hq) = self.headquarters() {
            let place: Vec<&str> = [hq.city.as_deref(), hq.country.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !place.is_empty() {
                out.push_str(&format!("Headquarters: {}\n", place.join(", ")));
            }
        }
        if let Some(funding) = &self.funding {
            if let Some(round) = &funding.last_round_type {
                out.push_str(&format!("Last funding round: {}\n", round));
            }
        }
        if let Some(description) = &self.description {
            out.push_str(&format!("Description: {}\n", description));
        }
        out
    }
}

impl FundingInfo {
    pub fn from_cassidy(raw: &Value) -> Option<Self> {
        let fields = Fields::from_value(raw)?;
        let funding = Self {
            last_round_type: fields.string(&["last_round_type", "lastFundingRoundType"]),
            last_round_date: fields.string(&["last_round_date", "lastFundingRoundDate"]),
            last_round_amount: fields.string(&[
                "last_round_amount",
                "last_round_money_raised",
                "lastFundingRoundAmount",
            ]),
            number_of_rounds: fields.int(&["number_of_rounds", "num_funding_rounds"]),
            crunchbase_url: fields.string(&["crunchbase_url", "crunchbase_link"]),
        };
        (funding != FundingInfo::default()).then_some(funding)
    }
}

impl CompanyLocation {
    pub fn from_cassidy(raw: &Value, headquarters: bool) -> Option<Self> {
        let fields = Fields::from_value(raw)?;
        let location = Self {
            line1: fields.string(&["line1", "line_1", "street", "address"]),
            city: fields.string(&["city"]),
            region: fields.string(&["region", "state", "geographic_area"]),
            country: fields.string(&["country", "country_code"]),
            postal_code: fields.string(&["postal_code", "postalCode", "zip"]),
            is_headquarters: headquarters
                || fields
                    .bool(&["is_hq", "is_headquarters", "headquarter"])
                    .unwrap_or(false),
        };
        (location.city.is_some() || location.country.is_some() || location.line1.is_some())
            .then_some(location)
    }
}

impl AffiliatedCompany {
    pub fn from_cassidy(raw: &Value) -> Option<Self> {
        let fields = Fields::from_value(raw)?;
        let affiliated = Self {
            name: fields.string(&["name", "company_name"]),
            linkedin_url: fields.string(&["linkedin_url", "url", "link"]),
            industry: fields.string(&["industry"]),
        };
        affiliated.name.is_some().then_some(affiliated)
    }
}
