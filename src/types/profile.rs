// src/types/profile.rs
//! Canonical profile records and their construction from Cassidy payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient::{self, Fields};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    Enriched,
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentStatus::Pending => "pending",
            EnrichmentStatus::Enriched => "enriched",
            EnrichmentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub linkedin_url: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub headline: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub about: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub current_company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub current_company_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub follower_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub connection_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub profile_image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::lenient_vec")]
    pub experiences: Vec<Experience>,
    #[serde(default, deserialize_with = "lenient::lenient_vec")]
    pub educations: Vec<Education>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub enrichment_status: EnrichmentStatus,
    #[serde(with = "timestamp::micros")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::micros")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Experience {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub company_linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_month")]
    pub start_month: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_year")]
    pub start_year: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_month")]
    pub end_month: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_year")]
    pub end_year: Option<i64>,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Education {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub school: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub field_of_study: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_year")]
    pub start_year: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_year")]
    pub end_year: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
}

impl Profile {
    /// Placeholder row for a profile whose scrape has not finished yet.
    pub fn pending(linkedin_url: String) -> Self {
        let now = timestamp::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            linkedin_url,
            full_name: None,
            first_name: None,
            last_name: None,
            headline: None,
            about: None,
            location: None,
            city: None,
            country: None,
            current_company: None,
            current_company_url: None,
            job_title: None,
            follower_count: None,
            connection_count: None,
            profile_image_url: None,
            experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
            enrichment_status: EnrichmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds an enriched profile from a Cassidy workflow payload.
    ///
    /// Returns `None` when the payload is not a JSON object.
    pub fn from_cassidy(payload: &Value, linkedin_url: String) -> Option<Self> {
        let fields = Fields::from_value(payload)?;
        let mut profile = Self::pending(linkedin_url);

        profile.first_name = fields.string(&["first_name", "firstName"]);
        profile.last_name = fields.string(&["last_name", "lastName"]);
        profile.full_name = fields
            .string(&["full_name", "fullName", "name"])
            .or_else(|| join_name(&profile.first_name, &profile.last_name));
        profile.headline = fields.string(&["headline", "tagline", "sub_title"]);
        profile.about = fields.string(&["about", "summary", "description"]);
        profile.city = fields.string(&["city"]);
        profile.country = fields.string(&["country", "country_name", "country_full_name"]);
        profile.location = fields
            .string(&["location", "location_name", "geo_location"])
            .or_else(|| join_location(&profile.city, &profile.country));
        profile.current_company = fields.string(&["company", "current_company", "company_name"]);
        profile.current_company_url = fields.string(&[
            "company_linkedin_url",
            "company_url",
            "current_company_url",
        ]);
        profile.job_title = fields.string(&["job_title", "position", "current_position", "title"]);
        profile.follower_count =
            fields.int(&["follower_count", "followers", "followers_count", "num_followers"]);
        profile.connection_count =
            fields.int(&["connection_count", "connections", "connections_count"]);
        profile.profile_image_url = fields.string(&[
            "profile_image_url",
            "profile_picture",
            "profile_pic_url",
            "avatar",
        ]);
        profile.experiences = fields
            .objects(&["experiences", "experience", "positions"])
            .iter()
            .filter_map(Experience::from_cassidy)
            .collect();
        profile.educations = fields
            .objects(&["educations", "education", "schools"])
            .iter()
            .filter_map(Education::from_cassidy)
            .collect();
        profile.skills = fields.list(&["skills", "top_skills"]);

        if profile.current_company.is_none() || profile.job_title.is_none() {
            if let Some(current) = profile.experiences.iter().find(|e| e.is_current) {
                if profile.current_company.is_none() {
                    profile.current_company = current.company.clone();
                }
                if profile.job_title.is_none() {
                    profile.job_title = current.title.clone();
                }
                if profile.current_company_url.is_none() {
                    profile.current_company_url = current.company_linkedin_url.clone();
                }
            }
        }

        profile.enrichment_status = EnrichmentStatus::Enriched;
        Some(profile)
    }

    /// Replaces the scraped fields with `fresh`, keeping identity and creation time.
    pub fn apply_enrichment(&mut self, fresh: Profile) {
        let id = std::mem::take(&mut self.id);
        let linkedin_url = std::mem::take(&mut self.linkedin_url);
        let created_at = self.created_at;
        *self = Profile {
            id,
            linkedin_url,
            created_at,
            updated_at: timestamp::now(),
            ..fresh
        };
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("Unknown")
    }

    /// Plain-text rendering used for prompts and embeddings.
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Name: {}\n", self.display_name()));
        if let Some(headline) = &self.headline {
            out.push_str(&format!("Headline: {}\n", headline));
        }
        if let Some(location) = &self.location {
            out.push_str(&format!("Location: {}\n", location));
        }
        match (&self.job_title, &self.current_company) {
            (Some(title), Some(company)) => {
                out.push_str(&format!("Current role: {} at {}\n", title, company))
            }
            (Some(title), None) => out.push_str(&format!("Current role: {}\n", title)),
            (None, Some(company)) => out.push_str(&format!("Current company: {}\n", company)),
            (None, None) => {}
        }
        if let Some(about) = &self.about {
            out.push_str(&format!("About: {}\n", about));
        }
        if !self.experiences.is_empty() {
            out.push_str("Experience:\n");
            for exp in &self.experiences {
                out.push_str(&format!("- {}\n", exp.summary_line()));
            }
        }
        if !self.educations.is_empty() {
            out.push_str("Education:\n");
            for edu in &self.educations {
                out.push_str(&format!("- {}\n", edu.summary_line()));
            }
        }
        if !self.skills.is_empty() {
            out.push_str(&format!("Skills: {}\n", self.skills.join(", ")));
        }
        out
    }
}

impl Experience {
    pub fn from_cassidy(raw: &Value) -> Option<Self> {
        let fields = Fields::from_value(raw)?;
        let end_year = fields.year(&["end_year", "endYear", "ends_at_year"]);
        let is_current = fields
            .bool(&["is_current", "isCurrent", "current"])
            .unwrap_or(false)
            || (end_year.is_none()
                && fields
                    .string(&["end_date", "date_range", "duration"])
                    .map(|s| s.to_lowercase().contains("present"))
                    .unwrap_or(false));

        let exp = Self {
            title: fields.string(&["title", "position", "job_title"]),
            company: fields.string(&["company", "company_name", "companyName"]),
            company_linkedin_url: fields.string(&[
                "company_linkedin_url",
                "company_url",
                "companyUrl",
            ]),
            location: fields.string(&["location"]),
            description: fields.string(&["description", "summary"]),
            start_month: fields.month(&["start_month", "startMonth", "starts_at_month"]),
            start_year: fields.year(&["start_year", "startYear", "starts_at_year"]),
            end_month: fields.month(&["end_month", "endMonth", "ends_at_month"]),
            end_year,
            is_current,
        };

        (exp.title.is_some() || exp.company.is_some()).then_some(exp)
    }

    pub fn summary_line(&self) -> String {
        let role = match (&self.title, &self.company) {
            (Some(t), Some(c)) => format!("{} at {}", t, c),
            (Some(t), None) => t.clone(),
            (None, Some(c)) => c.clone(),
            (None, None) => "Unknown role".to_string(),
        };
        let end = if self.is_current {
            "present".to_string()
        } else {
            self.end_year.map(|y| y.to_string()).unwrap_or_default()
        };
        match self.start_year {
            Some(start) => format!("{} ({}-{})", role, start, end),
            None if self.is_current => format!("{} (current)", role),
            None => role,
        }
    }
}

impl Education {
    pub fn from_cassidy(raw: &Value) -> Option<Self> {
        let fields = Fields::from_value(raw)?;
        let edu = Self {
            school: fields.string(&["school", "school_name", "institution", "name"]),
            degree: fields.string(&["degree", "degree_name"]),
            field_of_study: fields.string(&["field_of_study", "fieldOfStudy", "field", "major"]),
            start_year: fields.year(&["start_year", "startYear", "starts_at_year"]),
            end_year: fields.year(&["end_year", "endYear", "ends_at_year"]),
            description: fields.string(&["description", "activities"]),
        };
        edu.school.is_some().then_some(edu)
    }

    pub fn summary_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(degree) = &self.degree {
            parts.push(degree.clone());
        }
        if let Some(field) = &self.field_of_study {
            parts.push(field.clone());
        }
        let school = self.school.as_deref().unwrap_or("Unknown school");
        let years = match (self.start_year, self.end_year) {
            (Some(s), Some(e)) => format!(" ({}-{})", s, e),
            (None, Some(e)) => format!(" ({})", e),
            _ => String::new(),
        };
        if parts.is_empty() {
            format!("{}{}", school, years)
        } else {
            format!("{}, {}{}", parts.join(", "), school, years)
        }
    }
}

fn join_name(first: &Option<String>, last: &Option<String>) -> Option<String> {
    match (first, last) {
        (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
        (Some(f), None) => Some(f.clone()),
        (None, Some(l)) => Some(l.clone()),
        (None, None) => None,
    }
}

fn join_location(city: &Option<String>, country: &Option<String>) -> Option<String> {
    match (city, country) {
        (Some(c), Some(k)) => Some(format!("{}, {}", c, k)),
        (Some(c), None) => Some(c.clone()),
        (None, Some(k)) => Some(k.clone()),
        (None, None) => None,
    }
}
